use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{EntityKind, Field, Schema};

/// A flat post taxonomy term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<u64>,
    pub count: Option<u64>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub taxonomy: Option<String>,
    pub meta: Option<Value>,
}

impl Schema for Tag {
    const KIND: EntityKind = EntityKind::Tag;

    const FIELDS: &'static [Field] = &[
        Field::embed("id"),
        Field::view("count"),
        Field::view("description").writable(),
        Field::embed("link"),
        Field::embed("name").writable(),
        Field::embed("slug").writable(),
        Field::embed("taxonomy"),
        Field::view("meta").writable(),
    ];

    const PARAMETERS: &'static [&'static str] = collection_parameters!("offset", "hide_empty", "post");

    const ORDERBY: &'static [&'static str] = &[
        "id", "include", "name", "slug", "term_group", "description", "count",
    ];

    const REQUIRED_FOR_CREATE: &'static [&'static str] = &["name"];

    fn remote_id(&self) -> Option<u64> {
        self.id
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}
