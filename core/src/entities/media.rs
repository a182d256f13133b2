use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{EntityKind, Field, Schema};

/// An attachment from the media library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
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
    pub media_kind: Option<String>,
    pub title: Option<String>,
    pub author: Option<u64>,
    pub comment_status: Option<String>,
    pub ping_status: Option<String>,
    pub meta: Option<Value>,
    pub template: Option<String>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub media_type: Option<String>,
    pub mime_type: Option<String>,
    pub media_details: Option<Value>,
    pub post: Option<u64>,
    pub source_url: Option<String>,
}

impl Schema for Media {
    const KIND: EntityKind = EntityKind::Media;

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
        Field::embed("title").writable(),
        Field::embed("author").writable(),
        Field::view("comment_status").writable(),
        Field::view("ping_status").writable(),
        Field::view("meta").writable(),
        Field::view("template").writable(),
        Field::embed("alt_text").writable(),
        Field::embed("caption").writable(),
        Field::view("description").writable(),
        Field::embed("media_type"),
        Field::embed("mime_type"),
        Field::embed("media_details"),
        Field::view("post").writable(),
        Field::embed("source_url"),
    ];

    const PARAMETERS: &'static [&'static str] = collection_parameters!(
        "offset",
        "after",
        "before",
        "author",
        "author_exclude",
        "parent",
        "parent_exclude",
        "status",
        "media_type",
        "mime_type",
    );

    const ORDERBY: &'static [&'static str] = &[
        "author", "date", "id", "include", "modified", "parent", "relevance", "slug", "title",
    ];

    const STATUSES: &'static [&'static str] = &["inherit", "private", "trash"];

    fn remote_id(&self) -> Option<u64> {
        self.id
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}
