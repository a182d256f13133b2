use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{EntityKind, Field, Schema, Selector};

/// A comment on a post or page. `author` is 0 for guest comments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Option<u64>,
    pub author: Option<u64>,
    pub author_email: Option<String>,
    pub author_ip: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub author_user_agent: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
    pub date_gmt: Option<String>,
    pub link: Option<String>,
    pub parent: Option<u64>,
    pub post: Option<u64>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub comment_type: Option<String>,
    pub author_avatar_urls: Option<Value>,
    pub meta: Option<Value>,
}

impl Schema for Comment {
    const KIND: EntityKind = EntityKind::Comment;

    const FIELDS: &'static [Field] = &[
        Field::embed("id"),
        Field::embed("author").writable(),
        Field::edit("author_email").writable(),
        Field::edit("author_ip").writable(),
        Field::embed("author_name").writable(),
        Field::embed("author_url").writable(),
        Field::edit("author_user_agent").writable(),
        Field::embed("content").writable(),
        Field::embed("date").writable(),
        Field::view("date_gmt").writable(),
        Field::embed("link"),
        Field::embed("parent").writable(),
        Field::view("post").writable(),
        Field::view("status").writable(),
        Field::embed("type"),
        Field::embed("author_avatar_urls"),
        Field::view("meta").writable(),
    ];

    const PARAMETERS: &'static [&'static str] = &[
        "context",
        "page",
        "per_page",
        "search",
        "after",
        "before",
        "author",
        "author_exclude",
        "author_email",
        "exclude",
        "include",
        "offset",
        "order",
        "orderby",
        "parent",
        "parent_exclude",
        "post",
        "status",
        "type",
        "password",
    ];

    const ORDERBY: &'static [&'static str] = &[
        "date", "date_gmt", "id", "include", "post", "parent", "type",
    ];

    const STATUSES: &'static [&'static str] = &["approve", "hold", "spam", "trash", "all"];

    const SELECTORS: &'static [Selector] = &[Selector::Id];

    fn remote_id(&self) -> Option<u64> {
        self.id
    }

    fn slug(&self) -> Option<&str> {
        None
    }
}
