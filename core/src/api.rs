//! The API facade: connection settings, the identity cache, and accessors.
//!
//! # Design
//! `Api` is a cheap handle around shared state (`Arc<ApiInner>`), so it can
//! be cloned into threads and held by requests. Entities only keep a weak
//! reference back, which lets the whole graph go away with the last handle.
//!
//! Singular accessors (`post`, `user`, ...) take a `Lookup` naming exactly
//! one selector, answer from the identity cache when they can, and otherwise
//! run a request and insist on exactly one result.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::auth::Authenticator;
use crate::cache::IdentityCache;
use crate::config::ApiBuilder;
use crate::entities::{Category, Comment, Media, Page, Post, PostStatus, Tag, User};
use crate::entity::{writable_payload, Entity};
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::params::NumericArg;
use crate::request::{
    decode_response, materialize, CategoryRequest, CommentRequest, MediaRequest, PageRequest,
    PostRequest, PostStatusRequest, Request, TagRequest, UserRequest,
};
use crate::schema::{Context, EntityKind, Schema, Selector};

/// Largest `include=` list sent in one request.
const INCLUDE_CHUNK: usize = 100;

/// Selectors for a singular accessor. Exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
}

impl Lookup {
    /// By remote ID; integers and numeric strings are equivalent.
    pub fn by_id(id: impl fmt::Display) -> Self {
        Self::default().and_id(id)
    }

    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self::default().and_slug(slug)
    }

    pub fn by_username(username: impl Into<String>) -> Self {
        Self::default().and_username(username)
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self::default().and_name(name)
    }

    pub fn and_id(mut self, id: impl fmt::Display) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn and_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn and_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn and_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The single selector set, checked against what `S` accepts.
    fn selection<S: Schema>(&self) -> Result<Selection> {
        let mut given = Vec::new();
        if let Some(id) = &self.id {
            given.push((Selector::Id, id));
        }
        if let Some(slug) = &self.slug {
            given.push((Selector::Slug, slug));
        }
        if let Some(username) = &self.username {
            given.push((Selector::Username, username));
        }
        if let Some(name) = &self.name {
            given.push((Selector::Name, name));
        }

        let accepted = S::SELECTORS
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let (selector, value) = match given.as_slice() {
            [single] => *single,
            [] => {
                return Err(ApiError::validation(
                    "selector",
                    format!("a {} lookup needs one of: {accepted}", S::KIND),
                ))
            }
            many => {
                let names: Vec<String> = many.iter().map(|(s, _)| s.to_string()).collect();
                return Err(ApiError::validation(
                    "selector",
                    format!("give exactly one selector, not {}", names.join(" and ")),
                ));
            }
        };
        if value.trim().is_empty() {
            return Err(ApiError::validation(
                "selector",
                format!("the {selector} of a {} lookup cannot be empty", S::KIND),
            ));
        }
        if !S::SELECTORS.contains(&selector) {
            return Err(ApiError::validation(
                "selector",
                format!("a {} cannot be looked up by {selector} (use {accepted})", S::KIND),
            ));
        }
        Ok(match selector {
            Selector::Id => Selection::Id(value.as_str().to_id("id")?),
            Selector::Slug => Selection::Slug(value.clone()),
            Selector::Username => Selection::Username(value.clone()),
            Selector::Name => Selection::Name(value.clone()),
        })
    }
}

macro_rules! lookup_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Lookup {
            fn from(id: $t) -> Self {
                Lookup::by_id(id)
            }
        }
    )*};
}

lookup_from_int!(i32, i64, u32, u64, usize);

enum Selection {
    Id(u64),
    Slug(String),
    Username(String),
    Name(String),
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Id(id) => write!(f, "id {id}"),
            Selection::Slug(slug) => write!(f, "slug '{slug}'"),
            Selection::Username(username) => write!(f, "username '{username}'"),
            Selection::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

pub(crate) struct ApiInner {
    base_url: String,
    authenticator: Option<Box<dyn Authenticator>>,
    transport: Box<dyn Transport>,
    session: Mutex<Option<Arc<dyn Transport>>>,
    cache: IdentityCache,
    registry: RwLock<HashMap<EntityKind, Vec<String>>>,
}

impl ApiInner {
    pub(crate) fn registered_fields(&self, kind: EntityKind) -> Vec<String> {
        self.registry.read().get(&kind).cloned().unwrap_or_default()
    }
}

/// Entry point to a WordPress REST API.
#[derive(Clone)]
pub struct Api {
    inner: Arc<ApiInner>,
}

impl Api {
    /// An API at `base_url` using the default transport and no credentials.
    pub fn new(base_url: &str) -> Result<Self> {
        ApiBuilder::new(base_url).build()
    }

    pub fn builder(base_url: &str) -> ApiBuilder {
        ApiBuilder::new(base_url)
    }

    pub(crate) fn from_parts(
        base_url: String,
        authenticator: Option<Box<dyn Authenticator>>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(ApiInner {
                base_url,
                authenticator,
                transport,
                session: Mutex::new(None),
                cache: IdentityCache::new(),
                registry: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ApiInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ApiInner> {
        Arc::downgrade(&self.inner)
    }

    /// API root, always ending with `/`.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.inner.cache
    }

    /// Capture an extra payload field (e.g. one added by a plugin) on every
    /// entity of `kind` fetched from now on; read it with `Entity::extra_field`.
    pub fn register_field(&self, kind: EntityKind, name: &str) {
        let name = name.to_ascii_lowercase();
        let mut registry = self.inner.registry.write();
        let fields = registry.entry(kind).or_default();
        if !fields.contains(&name) {
            tracing::debug!(%kind, field = %name, "registered extra field");
            fields.push(name);
        }
    }

    pub fn registered_fields(&self, kind: EntityKind) -> Vec<String> {
        self.inner.registered_fields(kind)
    }

    /// A fresh request for any schema, including caller-defined ones.
    pub fn request<S: Schema>(&self) -> Request<S> {
        Request::new(self.clone())
    }

    pub fn post_request(&self) -> PostRequest {
        self.request()
    }

    pub fn page_request(&self) -> PageRequest {
        self.request()
    }

    pub fn media_request(&self) -> MediaRequest {
        self.request()
    }

    pub fn user_request(&self) -> UserRequest {
        self.request()
    }

    pub fn category_request(&self) -> CategoryRequest {
        self.request()
    }

    pub fn tag_request(&self) -> TagRequest {
        self.request()
    }

    pub fn comment_request(&self) -> CommentRequest {
        self.request()
    }

    pub fn post_status_request(&self) -> PostStatusRequest {
        self.request()
    }

    /// Exactly one entity for `lookup`.
    ///
    /// Fails with `Validation` (before any request) unless exactly one
    /// selector accepted by `S` is given, with `NoEntityFound` when nothing
    /// matches, and with `MultipleEntitiesFound` when the server answers a
    /// unique filter with several objects.
    pub fn get_one<S: Schema>(&self, lookup: impl Into<Lookup>) -> Result<Arc<Entity<S>>> {
        let selection = lookup.into().selection::<S>()?;

        let cached = match &selection {
            Selection::Id(id) => self.cache().get_by_id::<S>(*id).ok(),
            Selection::Slug(slug) => self.cache().get_by_slug::<S>(slug).ok(),
            Selection::Username(_) | Selection::Name(_) => None,
        };
        if let Some(entity) = cached {
            tracing::trace!(kind = %S::KIND, %selection, "served from identity cache");
            return Ok(entity);
        }

        let mut request = self.request::<S>();
        match &selection {
            Selection::Id(id) => {
                request.id(*id)?;
            }
            Selection::Slug(slug) if S::SLUG_ADDRESSED => {
                request.resource_slug(slug)?;
            }
            Selection::Slug(slug) => {
                request.slug(slug)?;
            }
            Selection::Username(term) | Selection::Name(term) => {
                request.search(term.as_str())?;
            }
        }
        let mut found = request.get()?;

        match &selection {
            Selection::Username(username) => {
                found.retain(|entity| matches_any(entity, &["username", "slug", "name"], username))
            }
            Selection::Name(name) => found.retain(|entity| matches_any(entity, &["name"], name)),
            Selection::Id(_) | Selection::Slug(_) => {}
        }

        match found.len() {
            0 => Err(ApiError::NoEntityFound {
                kind: S::KIND,
                selector: selection.to_string(),
            }),
            1 => Ok(found.remove(0)),
            count => {
                tracing::error!(kind = %S::KIND, %selection, count, "unique lookup matched several entities");
                Err(ApiError::MultipleEntitiesFound {
                    kind: S::KIND,
                    selector: selection.to_string(),
                    count,
                })
            }
        }
    }

    pub fn post(&self, lookup: impl Into<Lookup>) -> Result<Arc<Entity<Post>>> {
        self.get_one(lookup)
    }

    pub fn page(&self, lookup: impl Into<Lookup>) -> Result<Arc<Entity<Page>>> {
        self.get_one(lookup)
    }

    pub fn media(&self, lookup: impl Into<Lookup>) -> Result<Arc<Entity<Media>>> {
        self.get_one(lookup)
    }

    /// By id, username or slug.
    pub fn user(&self, lookup: impl Into<Lookup>) -> Result<Arc<Entity<User>>> {
        self.get_one(lookup)
    }

    /// By id, slug or name.
    pub fn category(&self, lookup: impl Into<Lookup>) -> Result<Arc<Entity<Category>>> {
        self.get_one(lookup)
    }

    pub fn tag(&self, lookup: impl Into<Lookup>) -> Result<Arc<Entity<Tag>>> {
        self.get_one(lookup)
    }

    /// By id only.
    pub fn comment(&self, lookup: impl Into<Lookup>) -> Result<Arc<Entity<Comment>>> {
        self.get_one(lookup)
    }

    pub fn post_status(&self, slug: &str) -> Result<Arc<Entity<PostStatus>>> {
        self.get_one(Lookup::by_slug(slug))
    }

    /// Entities for `ids` in the order given, skipping IDs the server does
    /// not know. Cached entities are returned as they are; the rest are
    /// fetched with `include=` in batches.
    pub fn get_many<S, I>(&self, ids: I) -> Result<Vec<Arc<Entity<S>>>>
    where
        S: Schema,
        I: IntoIterator,
        I::Item: NumericArg,
    {
        let ids = ids
            .into_iter()
            .map(|id| id.to_id("include"))
            .collect::<Result<Vec<u64>>>()?;

        let mut missing: Vec<u64> = ids
            .iter()
            .copied()
            .filter(|id| self.cache().get_by_id::<S>(*id).is_err())
            .collect();
        missing.sort_unstable();
        missing.dedup();

        for chunk in missing.chunks(INCLUDE_CHUNK) {
            let mut request = self.request::<S>();
            request.include(chunk.iter().copied())?.per_page(chunk.len())?;
            request.get()?;
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.cache().get_by_id::<S>(*id).ok())
            .collect())
    }

    /// Create a new remote entity from `draft`'s writable fields.
    ///
    /// The server's answer is materialized in `edit` context and registered
    /// in the cache under its new ID and slug.
    pub fn create<S: Schema>(&self, draft: &S) -> Result<Arc<Entity<S>>> {
        ensure_writable::<S>()?;
        let body = writable_payload(draft)?;
        if let Some(missing) = S::REQUIRED_FOR_CREATE
            .iter()
            .find(|field| !body.contains_key(**field))
        {
            return Err(ApiError::MissingRequiredParameter(missing.to_string()));
        }

        let url = format!("{}{}", self.base_url(), S::KIND.collection());
        tracing::debug!(kind = %S::KIND, %url, "creating entity");
        self.post_and_materialize::<S>(url, &Value::Object(body), "new")
    }

    /// Send the writable fields changed on `entity` since it was last
    /// refreshed, then refresh it in place from the server's answer.
    pub fn update<S: Schema>(&self, entity: &Arc<Entity<S>>) -> Result<Arc<Entity<S>>> {
        ensure_writable::<S>()?;
        let id = entity
            .remote_id()
            .ok_or_else(|| ApiError::MissingRequiredParameter("id".to_string()))?;
        let body = entity.changed_payload()?;
        if body.is_empty() {
            tracing::debug!(kind = %S::KIND, id, "update carries no local changes");
        }

        let url = format!("{}{}/{id}", self.base_url(), S::KIND.collection());
        tracing::debug!(kind = %S::KIND, %url, "updating entity");
        self.post_and_materialize::<S>(url, &Value::Object(body), &format!("id {id}"))
    }

    fn post_and_materialize<S: Schema>(&self, url: String, body: &Value, selector: &str) -> Result<Arc<Entity<S>>> {
        let mut request = HttpRequest::post_json(url, body.to_string());
        request
            .query
            .push(("context".to_string(), Context::Edit.as_str().to_string()));
        match decode_response(self.execute(request)?)? {
            Some((_, body)) => materialize::<S>(self, body, Context::Edit),
            None => Err(ApiError::NoEntityFound {
                kind: S::KIND,
                selector: selector.to_string(),
            }),
        }
    }

    /// Reuse one connection for every request until the guard is dropped.
    ///
    /// Sessions nest: only the outermost guard opens and closes the
    /// connection.
    pub fn session(&self) -> Session<'_> {
        let mut slot = self.inner.session.lock();
        let owned = slot.is_none();
        if owned {
            *slot = self.inner.transport.open_session();
            if slot.is_some() {
                tracing::debug!(base_url = %self.inner.base_url, "opened HTTP session");
            }
        }
        Session { api: self, owned }
    }

    /// Run `f` inside a session; the session is closed when `f` returns or
    /// unwinds.
    pub fn with_session<R>(&self, f: impl FnOnce(&Api) -> R) -> R {
        let _session = self.session();
        f(self)
    }

    pub fn in_session(&self) -> bool {
        self.inner.session.lock().is_some()
    }

    /// Authorize and send one request through the open session, or through
    /// a one-shot connection when there is none.
    pub(crate) fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        if let Some(authenticator) = &self.inner.authenticator {
            authenticator.authorize(&mut request);
        }
        let session = self.inner.session.lock().clone();
        let response = match session {
            Some(session) => session.execute(&request)?,
            None => self.inner.transport.execute(&request)?,
        };
        tracing::debug!(status = response.status, url = %request.url, "received response");
        Ok(response)
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("base_url", &self.inner.base_url)
            .field("authenticated", &self.inner.authenticator.is_some())
            .field("cache", &self.inner.cache)
            .finish()
    }
}

/// Scope guard returned by `Api::session`.
#[must_use = "the session closes as soon as the guard is dropped"]
pub struct Session<'a> {
    api: &'a Api,
    owned: bool,
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.owned && self.api.inner.session.lock().take().is_some() {
            tracing::debug!(base_url = %self.api.inner.base_url, "closed HTTP session");
        }
    }
}

fn ensure_writable<S: Schema>() -> Result<()> {
    if S::post_fields().is_empty() {
        return Err(ApiError::validation(
            "fields",
            format!("{} entities are read-only", S::KIND),
        ));
    }
    Ok(())
}

/// Case-insensitive equality on any of `fields`.
fn matches_any<S: Schema>(entity: &Entity<S>, fields: &[&str], wanted: &str) -> bool {
    fields.iter().any(|field| {
        entity
            .field_value(field)
            .as_ref()
            .and_then(Value::as_str)
            .is_some_and(|value| value.eq_ignore_ascii_case(wanted))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use serde_json::json;

    fn scripted() -> (Api, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let api = ApiBuilder::new("http://wp.test/wp-json/wp/v2")
            .transport(transport.clone())
            .build()
            .unwrap();
        (api, transport)
    }

    #[test]
    fn lookup_requires_exactly_one_selector() {
        let err = Lookup::default().selection::<Post>().err().unwrap();
        assert!(matches!(err, ApiError::Validation { ref parameter, .. } if parameter == "selector"));

        let err = Lookup::by_id(7).and_slug("hello").selection::<Post>().err().unwrap();
        assert!(err.to_string().contains("id and slug"));
    }

    #[test]
    fn lookup_rejects_empty_selector_values() {
        for lookup in [Lookup::by_slug(""), Lookup::by_username(" "), Lookup::by_name("")] {
            let err = lookup.selection::<User>().err().unwrap();
            assert!(err.to_string().contains("cannot be empty"), "{err}");
        }
        assert!(Lookup::by_id("").selection::<Post>().is_err());
    }

    #[test]
    fn lookup_rejects_selectors_the_type_does_not_accept() {
        assert!(Lookup::by_slug("x").selection::<Comment>().is_err());
        assert!(Lookup::by_username("jane").selection::<Post>().is_err());
        assert!(Lookup::by_name("News").selection::<Category>().is_ok());
        assert!(Lookup::by_id(-3).selection::<Post>().is_err());
    }

    #[test]
    fn sessions_nest_and_close() {
        let (api, _) = scripted();
        // Scripted transports have no pooled sessions.
        {
            let _outer = api.session();
            let _inner = api.session();
            assert!(!api.in_session());
        }
        assert!(!api.in_session());
    }

    #[test]
    fn register_field_lowercases_and_dedups() {
        let (api, _) = scripted();
        api.register_field(EntityKind::Post, "ACF");
        api.register_field(EntityKind::Post, "acf");
        assert_eq!(api.registered_fields(EntityKind::Post), vec!["acf".to_string()]);
        assert!(api.registered_fields(EntityKind::Page).is_empty());
    }

    #[test]
    fn create_checks_required_fields_before_sending() {
        let (api, transport) = scripted();
        let draft = User {
            username: Some("newbie".to_string()),
            email: Some("new@example.com".to_string()),
            ..User::default()
        };
        let err = api.create(&draft).unwrap_err();
        assert!(matches!(err, ApiError::MissingRequiredParameter(ref field) if field == "password"));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn post_statuses_are_read_only() {
        let (api, transport) = scripted();
        let err = api.create(&PostStatus::default()).unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn create_registers_the_new_entity() {
        let (api, transport) = scripted();
        transport.on_post(
            "posts",
            HttpResponse::json(
                201,
                &json!({
                    "id": 99,
                    "slug": "fresh",
                    "title": {"raw": "Fresh", "rendered": "Fresh"},
                    "status": "draft",
                    "password": ""
                }),
            ),
        );
        let draft = Post {
            title: Some("Fresh".to_string()),
            ..Post::default()
        };
        let created = api.create(&draft).unwrap();
        assert_eq!(created.remote_id(), Some(99));
        assert_eq!(created.read().password.as_deref(), Some(""));
        assert!(Arc::ptr_eq(&api.post(99).unwrap(), &created));

        let sent = &transport.requests()[0];
        assert_eq!(sent.query_value("context"), Some("edit"));
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Fresh"}));
    }

    #[test]
    fn update_refreshes_the_same_instance() {
        let (api, transport) = scripted();
        transport
            .on_get("posts/7", HttpResponse::json(200, &json!({"id": 7, "slug": "hello", "title": {"rendered": "Hi"}})))
            .on_post("posts/7", HttpResponse::json(200, &json!({"id": 7, "slug": "hello", "title": {"rendered": "Hello again"}})));

        let post = api.post(7).unwrap();
        post.edit(|fields| fields.title = Some("Hello again".to_string()));
        let updated = api.update(&post).unwrap();
        assert!(Arc::ptr_eq(&post, &updated));
        assert_eq!(post.read().title.as_deref(), Some("Hello again"));

        let sent = &transport.requests()[1];
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Hello again"}));
    }

    #[test]
    fn update_without_id_is_rejected() {
        let (api, _) = scripted();
        let detached = Arc::new(Entity::<Post>::new(api.downgrade()));
        let err = api.update(&detached).unwrap_err();
        assert!(matches!(err, ApiError::MissingRequiredParameter(ref field) if field == "id"));
    }
}
