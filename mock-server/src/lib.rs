//! In-memory stand-in for the WordPress REST API under `/wp-json/wp/v2`.
//!
//! Serves the core collections from a seeded `Site`, shaping every response
//! the way WordPress does: `context=view|embed|edit` selects fields,
//! `{raw, rendered}` wrappers lose `raw` outside `edit`, `_embed` inlines
//! linked resources under `_embedded`, and list responses carry `X-WP-Total`
//! and `X-WP-TotalPages`. Writes and `context=edit` need the admin
//! credentials in `ADMIN_AUTHORIZATION`.
//!
//! Lists are ordered by ID ascending unless `order=desc` is given.

mod fixtures;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_ROOT: &str = "/wp-json/wp/v2";

/// `Basic` + base64 of `admin:secret`.
pub const ADMIN_AUTHORIZATION: &str = "Basic YWRtaW46c2VjcmV0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    View,
    Embed,
    Edit,
}

/// How one collection is addressed and which fields each context shows.
struct Shape {
    collection: &'static str,
    embed: &'static [&'static str],
    edit_only: &'static [&'static str],
    required: &'static [&'static str],
    invalid_id: &'static str,
    keyed_by_slug: bool,
}

const SHAPES: &[Shape] = &[
    Shape {
        collection: "posts",
        embed: &["id", "date", "link", "slug", "type", "title", "author", "excerpt", "featured_media"],
        edit_only: &["password"],
        required: &[],
        invalid_id: "rest_post_invalid_id",
        keyed_by_slug: false,
    },
    Shape {
        collection: "pages",
        embed: &[
            "id", "date", "link", "slug", "type", "parent", "title", "author", "excerpt", "featured_media",
        ],
        edit_only: &["password"],
        required: &[],
        invalid_id: "rest_post_invalid_id",
        keyed_by_slug: false,
    },
    Shape {
        collection: "media",
        embed: &[
            "id", "date", "slug", "type", "link", "title", "author", "caption", "alt_text", "media_type",
            "mime_type", "media_details", "source_url",
        ],
        edit_only: &[],
        required: &[],
        invalid_id: "rest_post_invalid_id",
        keyed_by_slug: false,
    },
    Shape {
        collection: "users",
        embed: &["id", "name", "url", "description", "link", "slug", "avatar_urls"],
        edit_only: &[
            "username", "first_name", "last_name", "email", "locale", "nickname", "registered_date", "roles",
            "capabilities", "extra_capabilities",
        ],
        required: &["username", "email", "password"],
        invalid_id: "rest_user_invalid_id",
        keyed_by_slug: false,
    },
    Shape {
        collection: "categories",
        embed: &["id", "link", "name", "slug", "taxonomy"],
        edit_only: &[],
        required: &["name"],
        invalid_id: "rest_term_invalid",
        keyed_by_slug: false,
    },
    Shape {
        collection: "tags",
        embed: &["id", "link", "name", "slug", "taxonomy"],
        edit_only: &[],
        required: &["name"],
        invalid_id: "rest_term_invalid",
        keyed_by_slug: false,
    },
    Shape {
        collection: "comments",
        embed: &[
            "id", "author", "author_name", "author_url", "content", "date", "link", "parent", "type",
            "author_avatar_urls",
        ],
        edit_only: &["author_email", "author_ip", "author_user_agent"],
        required: &[],
        invalid_id: "rest_comment_invalid_id",
        keyed_by_slug: false,
    },
    Shape {
        collection: "statuses",
        embed: &["name", "slug", "public", "queryable", "date_floating"],
        edit_only: &["private", "protected", "show_in_list"],
        required: &[],
        invalid_id: "rest_status_invalid",
        keyed_by_slug: true,
    },
];

/// Fields holding `{raw, rendered}` HTML on post-like collections.
const RENDERED_FIELDS: &[&str] = &["title", "content", "excerpt", "caption", "description", "guid"];

fn shape_of(collection: &str) -> Option<&'static Shape> {
    SHAPES.iter().find(|shape| shape.collection == collection)
}

/// The whole data set, one list of objects per collection.
#[derive(Debug, Clone, Default)]
pub struct Site {
    collections: HashMap<&'static str, Vec<Value>>,
}

impl Site {
    pub fn empty() -> Self {
        Self {
            collections: SHAPES.iter().map(|shape| (shape.collection, Vec::new())).collect(),
        }
    }

    /// Two users, posts, pages, media, terms, comments and statuses that
    /// reference each other.
    pub fn seeded() -> Self {
        fixtures::seeded()
    }

    pub fn insert(&mut self, collection: &'static str, item: Value) {
        self.collections.entry(collection).or_default().push(item);
    }

    pub fn items(&self, collection: &str) -> &[Value] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn find(&self, shape: &Shape, key: &str) -> Option<&Value> {
        self.items(shape.collection).iter().find(|item| matches_key(shape, item, key))
    }

    fn find_mut(&mut self, shape: &Shape, key: &str) -> Option<&mut Value> {
        self.collections
            .get_mut(shape.collection)?
            .iter_mut()
            .find(|item| matches_key(shape, item, key))
    }
}

fn matches_key(shape: &Shape, item: &Value, key: &str) -> bool {
    if shape.keyed_by_slug {
        item["slug"] == key
    } else {
        key.parse::<u64>().is_ok_and(|id| id_of(item) == id)
    }
}

pub type Db = Arc<RwLock<Site>>;

pub fn app() -> Router {
    app_with(Site::seeded())
}

pub fn app_with(site: Site) -> Router {
    let db: Db = Arc::new(RwLock::new(site));
    let api = Router::new()
        .route("/{collection}", get(list_items).post(create_item))
        .route("/{collection}/{key}", get(get_item).post(update_item))
        .with_state(db);
    Router::new().nest(API_ROOT, api).fallback(no_route)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A WordPress-style error body.
#[derive(Debug)]
pub struct RestError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl RestError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn no_route() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "rest_no_route",
            "No route was found matching the URL and request method.",
        )
    }

    fn invalid_param(name: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "rest_invalid_param",
            format!("Invalid parameter(s): {name}"),
        )
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, code = self.code, "rest error");
        let body = json!({
            "code": self.code,
            "message": self.message,
            "data": {"status": self.status.as_u16()}
        });
        (self.status, Json(body)).into_response()
    }
}

async fn no_route() -> RestError {
    RestError::no_route()
}

type Params = Query<HashMap<String, String>>;

async fn list_items(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Query(query): Params,
    headers: HeaderMap,
) -> Result<Response, RestError> {
    let shape = shape_of(&collection).ok_or_else(RestError::no_route)?;
    let context = read_context(&query, Context::View)?;
    if context == Context::Edit {
        require_admin(&headers, "rest_forbidden_context")?;
    }
    let embed = query.contains_key("_embed");
    let site = db.read().await;

    if shape.keyed_by_slug {
        let body: Map<String, Value> = site
            .items(shape.collection)
            .iter()
            .map(|item| {
                let slug = item["slug"].as_str().unwrap_or_default().to_string();
                (slug, render(&site, shape, item, context, embed))
            })
            .collect();
        return Ok(Json(Value::Object(body)).into_response());
    }

    let descending = match query.get("order").map(String::as_str) {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(_) => return Err(RestError::invalid_param("order")),
    };
    let per_page = number_param(&query, "per_page", 10, 1..=100)?;
    let page = number_param(&query, "page", 1, 1..=usize::MAX)?;

    let mut matches: Vec<&Value> = site
        .items(shape.collection)
        .iter()
        .filter(|item| matches_filters(item, &query))
        .collect();
    matches.sort_by_key(|item| id_of(item));
    if descending {
        matches.reverse();
    }

    let total = matches.len();
    let total_pages = total.div_ceil(per_page);
    if page > 1 && page > total_pages {
        return Err(RestError::new(
            StatusCode::BAD_REQUEST,
            "rest_post_invalid_page_number",
            "The page number requested is larger than the number of pages available.",
        ));
    }

    let body: Vec<Value> = matches
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .map(|item| render(&site, shape, item, context, embed))
        .collect();
    let mut response = Json(Value::Array(body)).into_response();
    let headers = response.headers_mut();
    headers.insert("x-wp-total", HeaderValue::from(total));
    headers.insert("x-wp-totalpages", HeaderValue::from(total_pages));
    Ok(response)
}

async fn get_item(
    State(db): State<Db>,
    Path((collection, key)): Path<(String, String)>,
    Query(query): Params,
    headers: HeaderMap,
) -> Result<Response, RestError> {
    let shape = shape_of(&collection).ok_or_else(RestError::no_route)?;
    if !shape.keyed_by_slug && key.parse::<u64>().is_err() {
        return Err(RestError::no_route());
    }
    let context = read_context(&query, Context::View)?;
    if context == Context::Edit {
        require_admin(&headers, "rest_forbidden_context")?;
    }
    let site = db.read().await;
    let item = site.find(shape, &key).ok_or_else(|| invalid_id(shape))?;
    let body = render(&site, shape, item, context, query.contains_key("_embed"));
    Ok(Json(body).into_response())
}

async fn create_item(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Query(query): Params,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, RestError> {
    let shape = shape_of(&collection)
        .filter(|shape| !shape.keyed_by_slug)
        .ok_or_else(RestError::no_route)?;
    require_admin(&headers, "rest_cannot_create")?;
    let context = read_context(&query, Context::Edit)?;
    let Value::Object(fields) = body else {
        return Err(RestError::new(StatusCode::BAD_REQUEST, "rest_invalid_json", "Invalid JSON body passed."));
    };
    if let Some(missing) = shape.required.iter().find(|name| !fields.contains_key(**name)) {
        return Err(RestError::new(
            StatusCode::BAD_REQUEST,
            "rest_missing_callback_param",
            format!("Missing parameter(s): {missing}"),
        ));
    }

    let mut site = db.write().await;
    let id = site.items(shape.collection).iter().map(id_of).max().unwrap_or(0) + 1;
    let mut item = Map::new();
    item.insert("id".to_string(), json!(id));
    apply_fields(shape, &mut item, fields);
    fill_defaults(shape, &mut item, id);
    let item = Value::Object(item);
    site.insert(shape.collection, item.clone());
    tracing::info!(collection = shape.collection, id, "created");

    let body = render(&site, shape, &item, context, false);
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn update_item(
    State(db): State<Db>,
    Path((collection, key)): Path<(String, String)>,
    Query(query): Params,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, RestError> {
    let shape = shape_of(&collection)
        .filter(|shape| !shape.keyed_by_slug)
        .ok_or_else(RestError::no_route)?;
    require_admin(&headers, "rest_cannot_edit")?;
    let context = read_context(&query, Context::Edit)?;
    let Value::Object(fields) = body else {
        return Err(RestError::new(StatusCode::BAD_REQUEST, "rest_invalid_json", "Invalid JSON body passed."));
    };

    let mut site = db.write().await;
    let item = site
        .find_mut(shape, &key)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| invalid_id(shape))?;
    apply_fields(shape, item, fields);
    let item = Value::Object(item.clone());
    tracing::info!(collection = shape.collection, %key, "updated");

    let body = render(&site, shape, &item, context, false);
    Ok(Json(body).into_response())
}

fn invalid_id(shape: &Shape) -> RestError {
    RestError::new(StatusCode::NOT_FOUND, shape.invalid_id, "Invalid ID.")
}

fn require_admin(headers: &HeaderMap, code: &'static str) -> Result<(), RestError> {
    match headers.get(header::AUTHORIZATION) {
        Some(value) if value == ADMIN_AUTHORIZATION => Ok(()),
        _ => Err(RestError::new(
            StatusCode::UNAUTHORIZED,
            code,
            "Sorry, you are not allowed to do that.",
        )),
    }
}

fn read_context(query: &HashMap<String, String>, default: Context) -> Result<Context, RestError> {
    match query.get("context").map(String::as_str) {
        None => Ok(default),
        Some("view") => Ok(Context::View),
        Some("embed") => Ok(Context::Embed),
        Some("edit") => Ok(Context::Edit),
        Some(_) => Err(RestError::invalid_param("context")),
    }
}

fn number_param(
    query: &HashMap<String, String>,
    name: &str,
    default: usize,
    range: std::ops::RangeInclusive<usize>,
) -> Result<usize, RestError> {
    match query.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .ok()
            .filter(|value| range.contains(value))
            .ok_or_else(|| RestError::invalid_param(name)),
    }
}

fn id_of(item: &Value) -> u64 {
    item["id"].as_u64().unwrap_or(0)
}

fn id_list(raw: &str) -> Vec<u64> {
    raw.split(',').filter_map(|id| id.trim().parse().ok()).collect()
}

/// A single ID or a list of IDs, as stored on an item.
fn ids_of(value: &Value) -> Vec<u64> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_u64).collect(),
        other => other.as_u64().into_iter().collect(),
    }
}

fn matches_filters(item: &Value, query: &HashMap<String, String>) -> bool {
    query.iter().all(|(name, value)| match name.as_str() {
        "include" => id_list(value).contains(&id_of(item)),
        "exclude" => !id_list(value).contains(&id_of(item)),
        "slug" => value.split(',').any(|slug| item["slug"] == slug),
        "status" => value.split(',').any(|status| item["status"] == status),
        "search" => matches_search(item, value),
        "author" | "post" | "parent" => {
            let wanted = id_list(value);
            ids_of(&item[name.as_str()]).iter().any(|id| wanted.contains(id))
        }
        "categories" | "tags" => {
            let wanted = id_list(value);
            ids_of(&item[name.as_str()]).iter().any(|id| wanted.contains(id))
        }
        "roles" => item["roles"]
            .as_array()
            .is_some_and(|roles| value.split(',').any(|role| roles.iter().any(|r| r == role))),
        _ => true,
    })
}

fn matches_search(item: &Value, term: &str) -> bool {
    let term = term.to_lowercase();
    ["name", "slug", "username", "title", "content"].iter().any(|field| {
        let text = match &item[*field] {
            Value::String(text) => Some(text.as_str()),
            Value::Object(wrapped) => wrapped.get("rendered").and_then(Value::as_str),
            _ => None,
        };
        text.is_some_and(|text| text.to_lowercase().contains(&term))
    })
}

/// Shape `item` for `context`, optionally with `_embedded`.
fn render(site: &Site, shape: &Shape, item: &Value, context: Context, embed: bool) -> Value {
    let Some(object) = item.as_object() else {
        return item.clone();
    };
    let mut out = Map::new();
    for (key, value) in object {
        let visible = match context {
            Context::Edit => true,
            Context::View => !shape.edit_only.contains(&key.as_str()),
            Context::Embed => shape.embed.contains(&key.as_str()),
        };
        if !visible {
            continue;
        }
        let value = match (context, value) {
            (Context::Edit, _) => value.clone(),
            (_, Value::Object(wrapped)) if wrapped.contains_key("rendered") => Value::Object(
                wrapped
                    .iter()
                    .filter(|(k, _)| k.as_str() != "raw")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => value.clone(),
        };
        out.insert(key.clone(), value);
    }
    if embed {
        let embedded = embedded_for(site, shape, object);
        if !embedded.is_empty() {
            out.insert("_embedded".to_string(), Value::Object(embedded));
        }
    }
    Value::Object(out)
}

fn embed_one(site: &Site, collection: &str, id: u64) -> Option<Value> {
    let shape = shape_of(collection)?;
    let item = site.find(shape, &id.to_string())?;
    Some(render(site, shape, item, Context::Embed, false))
}

fn embedded_for(site: &Site, shape: &Shape, object: &Map<String, Value>) -> Map<String, Value> {
    let related = |field: &str| object.get(field).and_then(Value::as_u64).filter(|id| *id != 0);
    let mut embedded = Map::new();

    if let Some(user) = related("author").and_then(|id| embed_one(site, "users", id)) {
        embedded.insert("author".to_string(), json!([user]));
    }
    if let Some(media) = related("featured_media").and_then(|id| embed_one(site, "media", id)) {
        embedded.insert("wp:featuredmedia".to_string(), json!([media]));
    }
    if shape.collection == "posts" {
        let terms = |field: &str, collection: &str| -> Vec<Value> {
            object
                .get(field)
                .map(ids_of)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|id| embed_one(site, collection, id))
                .collect()
        };
        embedded.insert(
            "wp:term".to_string(),
            json!([terms("categories", "categories"), terms("tags", "tags")]),
        );
    }

    let parent = match shape.collection {
        "pages" => related("parent").and_then(|id| embed_one(site, "pages", id)),
        "comments" => related("post")
            .and_then(|id| embed_one(site, "posts", id).or_else(|| embed_one(site, "pages", id))),
        _ => None,
    };
    if let Some(parent) = parent {
        embedded.insert("up".to_string(), json!([parent]));
    }

    if matches!(shape.collection, "posts" | "pages") {
        let id = object.get("id").and_then(Value::as_u64).unwrap_or(0);
        let replies: Vec<Value> = site
            .items("comments")
            .iter()
            .filter(|comment| comment["post"].as_u64() == Some(id))
            .filter_map(|comment| embed_one(site, "comments", id_of(comment)))
            .collect();
        if !replies.is_empty() {
            embedded.insert("replies".to_string(), json!([replies]));
        }
    }
    embedded
}

/// Merge request fields into a stored item. HTML fields are stored as
/// `{raw, rendered}`; user passwords are never stored.
fn apply_fields(shape: &Shape, item: &mut Map<String, Value>, fields: Map<String, Value>) {
    let post_like = matches!(shape.collection, "posts" | "pages" | "media");
    for (name, value) in fields {
        if name == "id" || (shape.collection == "users" && name == "password") {
            continue;
        }
        let value = match value {
            Value::String(raw) if post_like && RENDERED_FIELDS.contains(&name.as_str()) => {
                let rendered = if name == "content" {
                    format!("<p>{raw}</p>\n")
                } else {
                    raw.clone()
                };
                json!({"raw": raw, "rendered": rendered})
            }
            other => other,
        };
        item.insert(name, value);
    }
}

fn fill_defaults(shape: &Shape, item: &mut Map<String, Value>, id: u64) {
    if !item.contains_key("slug") {
        let source = ["title", "name", "username"]
            .iter()
            .find_map(|field| match item.get(*field) {
                Some(Value::String(text)) => Some(text.clone()),
                Some(Value::Object(wrapped)) => wrapped.get("raw").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .unwrap_or_else(|| id.to_string());
        item.insert("slug".to_string(), json!(slugify(&source)));
    }
    let defaults = match shape.collection {
        "posts" => json!({"status": "draft", "type": "post", "author": 1, "password": ""}),
        "pages" => json!({"status": "draft", "type": "page", "author": 1, "parent": 0, "password": ""}),
        "categories" => json!({"taxonomy": "category", "count": 0, "parent": 0, "description": ""}),
        "tags" => json!({"taxonomy": "post_tag", "count": 0, "description": ""}),
        "comments" => json!({"status": "hold", "type": "comment", "parent": 0}),
        _ => json!({}),
    };
    if let Value::Object(defaults) = defaults {
        for (name, value) in defaults {
            item.entry(name).or_insert(value);
        }
    }
    let slug = item["slug"].as_str().unwrap_or_default().to_string();
    item.entry("link")
        .or_insert_with(|| json!(format!("http://wp.test/{}/{slug}/", shape.collection)));
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust  News "), "rust-news");
    }

    #[test]
    fn view_context_hides_edit_fields_and_raw() {
        let site = Site::seeded();
        let shape = shape_of("posts").unwrap();
        let post = site.find(shape, "7").unwrap();
        let view = render(&site, shape, post, Context::View, false);
        assert!(view.get("password").is_none());
        assert_eq!(view["title"], json!({"rendered": "Hi"}));

        let edit = render(&site, shape, post, Context::Edit, false);
        assert_eq!(edit["title"]["raw"], "Hi");
        assert!(edit.get("password").is_some());
    }

    #[test]
    fn embed_context_keeps_only_embed_fields() {
        let site = Site::seeded();
        let shape = shape_of("users").unwrap();
        let jane = site.find(shape, "3").unwrap();
        let embed = render(&site, shape, jane, Context::Embed, false);
        assert_eq!(embed["slug"], "jane");
        assert!(embed.get("email").is_none());
    }

    #[test]
    fn filters_combine() {
        let query: HashMap<String, String> = [("categories", "5"), ("author", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let site = Site::seeded();
        let ids: Vec<u64> = site
            .items("posts")
            .iter()
            .filter(|item| matches_filters(item, &query))
            .map(id_of)
            .collect();
        assert_eq!(ids, vec![7]);
    }

    #[test]
    fn apply_fields_wraps_html_and_drops_user_passwords() {
        let mut post = Map::new();
        let fields = json!({"title": "New", "content": "Body"});
        apply_fields(shape_of("posts").unwrap(), &mut post, fields.as_object().unwrap().clone());
        assert_eq!(post["content"], json!({"raw": "Body", "rendered": "<p>Body</p>\n"}));

        let mut user = Map::new();
        let fields = json!({"username": "bob", "password": "pw"});
        apply_fields(shape_of("users").unwrap(), &mut user, fields.as_object().unwrap().clone());
        assert!(user.get("password").is_none());
    }
}
