use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{EntityKind, Field, Schema};

/// A blog post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
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
    pub post_type: Option<String>,
    pub password: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<u64>,
    pub excerpt: Option<String>,
    pub featured_media: Option<u64>,
    pub comment_status: Option<String>,
    pub ping_status: Option<String>,
    pub format: Option<String>,
    pub meta: Option<Value>,
    pub sticky: Option<bool>,
    pub template: Option<String>,
    pub categories: Option<Vec<u64>>,
    pub tags: Option<Vec<u64>>,
}

impl Schema for Post {
    const KIND: EntityKind = EntityKind::Post;

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
        Field::embed("title").writable(),
        Field::view("content").writable(),
        Field::embed("author").writable(),
        Field::embed("excerpt").writable(),
        Field::embed("featured_media").writable(),
        Field::view("comment_status").writable(),
        Field::view("ping_status").writable(),
        Field::view("format").writable(),
        Field::view("meta").writable(),
        Field::view("sticky").writable(),
        Field::view("template").writable(),
        Field::view("categories").writable(),
        Field::view("tags").writable(),
    ];

    const PARAMETERS: &'static [&'static str] = collection_parameters!(
        "offset",
        "after",
        "before",
        "author",
        "author_exclude",
        "status",
        "categories",
        "categories_exclude",
        "tags",
        "tags_exclude",
        "sticky",
    );

    const ORDERBY: &'static [&'static str] = &[
        "author", "date", "id", "include", "modified", "parent", "relevance", "slug", "title",
    ];

    const STATUSES: &'static [&'static str] = &["publish", "future", "draft", "pending", "private"];

    fn remote_id(&self) -> Option<u64> {
        self.id
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    /// Fill term lists from `_embedded["wp:term"]` when the payload itself
    /// did not carry them (e.g. an `embed`-context response).
    fn postprocess_response(&mut self, raw: &Map<String, Value>) {
        let Some(groups) = raw
            .get("_embedded")
            .and_then(|embedded| embedded.get("wp:term"))
            .and_then(Value::as_array)
        else {
            return;
        };
        if self.categories.is_none() {
            self.categories = embedded_term_ids(groups, "category");
        }
        if self.tags.is_none() {
            self.tags = embedded_term_ids(groups, "post_tag");
        }
    }
}

/// IDs of every embedded term belonging to `taxonomy`, `None` if there are none.
fn embedded_term_ids(groups: &[Value], taxonomy: &str) -> Option<Vec<u64>> {
    let ids: Vec<u64> = groups
        .iter()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|term| term.get("taxonomy").and_then(Value::as_str) == Some(taxonomy))
        .filter_map(|term| term.get("id").and_then(Value::as_u64))
        .collect();
    (!ids.is_empty()).then_some(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terms_are_taken_from_embedded_groups() {
        let raw = json!({
            "id": 7,
            "_embedded": {
                "wp:term": [
                    [{"id": 1, "taxonomy": "category"}, {"id": 5, "taxonomy": "category"}],
                    [{"id": 20, "taxonomy": "post_tag"}]
                ]
            }
        });
        let mut post = Post::default();
        post.postprocess_response(raw.as_object().unwrap());
        assert_eq!(post.categories, Some(vec![1, 5]));
        assert_eq!(post.tags, Some(vec![20]));
    }

    #[test]
    fn explicit_terms_are_kept() {
        let raw = json!({"_embedded": {"wp:term": [[{"id": 1, "taxonomy": "category"}]]}});
        let mut post = Post {
            categories: Some(vec![9]),
            ..Post::default()
        };
        post.postprocess_response(raw.as_object().unwrap());
        assert_eq!(post.categories, Some(vec![9]));
        assert_eq!(post.tags, None);
    }

    #[test]
    fn password_is_writable_but_edit_only() {
        let password = Post::FIELDS.iter().find(|f| f.name == "password").unwrap();
        assert!(password.writable);
        assert!(!password.visibility.admits(crate::schema::Context::View));
        assert!(!Post::post_fields().contains(&"id"));
    }
}
