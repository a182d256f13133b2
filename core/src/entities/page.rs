use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{EntityKind, Field, Schema};

/// A static page. Pages nest through `parent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Option<u64>,
    pub date: Option<String>,
    pub date_gmt: Option<String>,
    pub guid: Option<String>,
    pub link: Option<String>,
    pub modified: Option<String>,
    pub modified_gmt: Option<String>,
    pub slug: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub page_type: Option<String>,
    pub password: Option<String>,
    pub parent: Option<u64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<u64>,
    pub excerpt: Option<String>,
    pub featured_media: Option<u64>,
    pub comment_status: Option<String>,
    pub ping_status: Option<String>,
    pub menu_order: Option<i64>,
    pub meta: Option<Value>,
    pub template: Option<String>,
}

impl Schema for Page {
    const KIND: EntityKind = EntityKind::Page;

    const FIELDS: &'static [Field] = &[
        Field::embed("id"),
        Field::embed("date").writable(),
        Field::view("date_gmt").writable(),
        Field::view("guid"),
        Field::embed("link"),
        Field::view("modified"),
        Field::view("modified_gmt"),
        Field::embed("slug").writable(),
        Field::view("status").writable(),
        Field::embed("type"),
        Field::edit("password").writable(),
        Field::embed("parent").writable(),
        Field::embed("title").writable(),
        Field::view("content").writable(),
        Field::embed("author").writable(),
        Field::embed("excerpt").writable(),
        Field::embed("featured_media").writable(),
        Field::view("comment_status").writable(),
        Field::view("ping_status").writable(),
        Field::view("menu_order").writable(),
        Field::view("meta").writable(),
        Field::view("template").writable(),
    ];

    const PARAMETERS: &'static [&'static str] = collection_parameters!(
        "offset",
        "after",
        "before",
        "author",
        "author_exclude",
        "menu_order",
        "parent",
        "parent_exclude",
        "status",
    );

    const ORDERBY: &'static [&'static str] = &[
        "author", "date", "id", "include", "modified", "parent", "relevance", "slug", "title", "menu_order",
    ];

    const STATUSES: &'static [&'static str] = &["publish", "future", "draft", "pending", "private"];

    fn remote_id(&self) -> Option<u64> {
        self.id
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}
