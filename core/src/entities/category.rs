use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{EntityKind, Field, Schema, Selector};

/// A hierarchical post taxonomy term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<u64>,
    pub count: Option<u64>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub taxonomy: Option<String>,
    pub parent: Option<u64>,
    pub meta: Option<Value>,
}

impl Schema for Category {
    const KIND: EntityKind = EntityKind::Category;

    const FIELDS: &'static [Field] = &[
        Field::embed("id"),
        Field::view("count"),
        Field::view("description").writable(),
        Field::embed("link"),
        Field::embed("name").writable(),
        Field::embed("slug").writable(),
        Field::embed("taxonomy"),
        Field::view("parent").writable(),
        Field::view("meta").writable(),
    ];

    const PARAMETERS: &'static [&'static str] = collection_parameters!("hide_empty", "parent", "post");

    const ORDERBY: &'static [&'static str] = &[
        "id", "include", "name", "slug", "term_group", "description", "count",
    ];

    const REQUIRED_FOR_CREATE: &'static [&'static str] = &["name"];

    const SELECTORS: &'static [Selector] = &[Selector::Id, Selector::Slug, Selector::Name];

    fn remote_id(&self) -> Option<u64> {
        self.id
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}
