//! Entity schemas: which fields a type has, when the server returns them,
//! and which of them may be written back.
//!
//! # Design
//! Each concrete entity is a plain struct of `Option` fields deriving serde.
//! The `FIELDS` table is the only place where a wire field name is tied to a
//! visibility tier and to writability; the JSON boundary in `entity.rs` uses
//! it to filter a payload before handing it to serde. Everything past that
//! boundary works with the typed struct.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Type tag for every entity the mapper knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Post,
    Page,
    Media,
    User,
    Category,
    Tag,
    Comment,
    PostStatus,
}

impl EntityKind {
    /// Collection path segment under the API root.
    pub const fn collection(self) -> &'static str {
        match self {
            EntityKind::Post => "posts",
            EntityKind::Page => "pages",
            EntityKind::Media => "media",
            EntityKind::User => "users",
            EntityKind::Category => "categories",
            EntityKind::Tag => "tags",
            EntityKind::Comment => "comments",
            EntityKind::PostStatus => "statuses",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            EntityKind::Post => "post",
            EntityKind::Page => "page",
            EntityKind::Media => "media",
            EntityKind::User => "user",
            EntityKind::Category => "category",
            EntityKind::Tag => "tag",
            EntityKind::Comment => "comment",
            EntityKind::PostStatus => "post status",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Server-side response shaping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Context {
    #[default]
    View,
    Embed,
    Edit,
}

impl Context {
    pub const ALL: [Context; 3] = [Context::View, Context::Embed, Context::Edit];

    pub const fn as_str(self) -> &'static str {
        match self {
            Context::View => "view",
            Context::Embed => "embed",
            Context::Edit => "edit",
        }
    }
}

impl AsRef<str> for Context {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "view" => Ok(Context::View),
            "embed" => Ok(Context::Embed),
            "edit" => Ok(Context::Edit),
            _ => Err(ApiError::validation(
                "context",
                format!("must be one of view, embed, edit ('{s}' given)"),
            )),
        }
    }
}

/// The loosest context in which the server includes a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Present in every context.
    Embed,
    /// Present in `view` and `edit`.
    View,
    /// Present only in `edit`.
    Edit,
}

impl Visibility {
    pub fn admits(self, context: Context) -> bool {
        match self {
            Visibility::Embed => true,
            Visibility::View => context != Context::Embed,
            Visibility::Edit => context == Context::Edit,
        }
    }
}

/// One row of a schema table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub visibility: Visibility,
    pub writable: bool,
}

impl Field {
    pub const fn embed(name: &'static str) -> Self {
        Self {
            name,
            visibility: Visibility::Embed,
            writable: false,
        }
    }

    pub const fn view(name: &'static str) -> Self {
        Self {
            name,
            visibility: Visibility::View,
            writable: false,
        }
    }

    pub const fn edit(name: &'static str) -> Self {
        Self {
            name,
            visibility: Visibility::Edit,
            writable: false,
        }
    }

    pub const fn writable(self) -> Self {
        Self {
            writable: true,
            ..self
        }
    }
}

/// Ways a singular accessor can identify an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Id,
    Slug,
    Username,
    Name,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Selector::Id => "id",
            Selector::Slug => "slug",
            Selector::Username => "username",
            Selector::Name => "name",
        })
    }
}

/// Capability interface implemented by every entity schema.
///
/// Implement it on your own struct to map a custom post type or a type with
/// plugin-provided fields; such types get their own cache namespace.
pub trait Schema:
    Serialize + DeserializeOwned + Default + Clone + fmt::Debug + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Wire field names with their visibility and writability.
    const FIELDS: &'static [Field];

    /// Query parameters the collection endpoint accepts.
    const PARAMETERS: &'static [&'static str];

    const ORDERBY: &'static [&'static str] = &[];

    const STATUSES: &'static [&'static str] = &[];

    /// Fields that must be set on a draft passed to `Api::create`.
    const REQUIRED_FOR_CREATE: &'static [&'static str] = &[];

    /// Selectors accepted by the singular accessor.
    const SELECTORS: &'static [Selector] = &[Selector::Id, Selector::Slug];

    /// Singular resources are addressed by slug instead of numeric ID.
    const SLUG_ADDRESSED: bool = false;

    fn remote_id(&self) -> Option<u64>;

    fn slug(&self) -> Option<&str>;

    fn schema_fields() -> Vec<&'static str> {
        Self::FIELDS.iter().map(|f| f.name).collect()
    }

    fn post_fields() -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .filter(|f| f.writable)
            .map(|f| f.name)
            .collect()
    }

    /// Hook run after base-field population with the full raw payload.
    fn postprocess_response(&mut self, _raw: &Map<String, Value>) {}

    /// Turn a response body into the list of objects to materialize.
    fn normalize_collection(body: Value) -> Vec<Value> {
        normalize_collection(body)
    }
}

/// A bare object is treated as a one-element list.
pub fn normalize_collection(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// `{"rendered": ...}` wrappers collapse to the rendered value.
pub fn unwrap_rendered(value: &Value) -> Value {
    match value {
        Value::Object(map) => map.get("rendered").cloned().unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_parses_case_insensitively() {
        assert_eq!("EDIT".parse::<Context>().unwrap(), Context::Edit);
        assert_eq!("view".parse::<Context>().unwrap(), Context::View);
        let err = "preview".parse::<Context>().unwrap_err();
        assert!(matches!(err, ApiError::Validation { ref parameter, .. } if parameter == "context"));
    }

    #[test]
    fn visibility_tiers() {
        assert!(Visibility::Embed.admits(Context::Embed));
        assert!(!Visibility::View.admits(Context::Embed));
        assert!(Visibility::View.admits(Context::Edit));
        assert!(!Visibility::Edit.admits(Context::View));
        assert!(Visibility::Edit.admits(Context::Edit));
    }

    #[test]
    fn rendered_wrappers_are_unwrapped() {
        assert_eq!(unwrap_rendered(&json!({"rendered": "Hello"})), json!("Hello"));
        assert_eq!(
            unwrap_rendered(&json!({"raw": "Hi", "rendered": "<p>Hi</p>"})),
            json!("<p>Hi</p>")
        );
        assert_eq!(unwrap_rendered(&json!({"24": "a.png"})), json!({"24": "a.png"}));
        assert_eq!(unwrap_rendered(&json!(3)), json!(3));
    }

    #[test]
    fn bare_objects_become_single_element_lists() {
        assert_eq!(normalize_collection(json!({"id": 1})).len(), 1);
        assert_eq!(normalize_collection(json!([{"id": 1}, {"id": 2}])).len(), 2);
        assert!(normalize_collection(Value::Null).is_empty());
    }

    #[test]
    fn collections_are_plural_paths() {
        assert_eq!(EntityKind::Category.collection(), "categories");
        assert_eq!(EntityKind::PostStatus.collection(), "statuses");
        assert_eq!(EntityKind::PostStatus.to_string(), "post status");
    }
}
