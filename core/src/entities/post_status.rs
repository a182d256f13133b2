use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{normalize_collection, EntityKind, Field, Schema, Selector};

/// A registered post status such as `publish` or `draft`. Read-only and
/// addressed by slug.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostStatus {
    pub name: Option<String>,
    pub private: Option<bool>,
    pub protected: Option<bool>,
    pub public: Option<bool>,
    pub queryable: Option<bool>,
    pub show_in_list: Option<bool>,
    pub slug: Option<String>,
    pub date_floating: Option<bool>,
}

impl Schema for PostStatus {
    const KIND: EntityKind = EntityKind::PostStatus;

    const FIELDS: &'static [Field] = &[
        Field::embed("name"),
        Field::edit("private"),
        Field::edit("protected"),
        Field::embed("public"),
        Field::embed("queryable"),
        Field::edit("show_in_list"),
        Field::embed("slug"),
        Field::embed("date_floating"),
    ];

    const PARAMETERS: &'static [&'static str] = &["context"];

    const SELECTORS: &'static [Selector] = &[Selector::Slug];

    const SLUG_ADDRESSED: bool = true;

    fn remote_id(&self) -> Option<u64> {
        None
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    /// The collection is an object keyed by slug; a single status is an
    /// object carrying its own `slug`.
    fn normalize_collection(body: Value) -> Vec<Value> {
        match body {
            Value::Object(map) if !map.contains_key("slug") => map.into_iter().map(|(_, v)| v).collect(),
            other => normalize_collection(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keyed_collection_becomes_a_list() {
        let body = json!({
            "publish": {"name": "Published", "slug": "publish"},
            "draft": {"name": "Draft", "slug": "draft"}
        });
        let items = PostStatus::normalize_collection(body);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.get("slug").is_some()));
    }

    #[test]
    fn single_status_stays_whole() {
        let items = PostStatus::normalize_collection(json!({"name": "Draft", "slug": "draft"}));
        assert_eq!(items, vec![json!({"name": "Draft", "slug": "draft"})]);
    }

    #[test]
    fn nothing_is_writable() {
        assert!(PostStatus::post_fields().is_empty());
    }
}
