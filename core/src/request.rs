//! Query building, response interpretation and entity materialization.
//!
//! # Design
//! A `Request<S>` moves through `Configured -> Sent -> Parsed` exactly once.
//! Sending builds one `HttpRequest`, hands it to the facade's transport and
//! maps the status:
//!
//! | status      | outcome                           |
//! |-------------|-----------------------------------|
//! | 2xx         | parse body and headers            |
//! | 404         | empty result, not an error        |
//! | 400         | `BadRequest` with the JSON payload |
//! | 401, 403    | `AuthenticationRequired`          |
//! | anything else | `HttpError`                     |
//!
//! Every object in a successful body goes through `materialize`, which
//! consults the identity cache (ID first, then slug) so that one remote
//! object maps to one shared `Entity` for the life of the facade. Embedded
//! resources under `_embedded` take the same path, registered under their
//! own types.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::api::Api;
use crate::cache::IdentityKeys;
use crate::entities::{Category, Comment, Media, Page, Post, PostStatus, Tag, User};
use crate::entity::Entity;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::params::{NumericArg, Order, QueryParameters};
use crate::schema::{Context, EntityKind, Schema};

pub type PostRequest = Request<Post>;
pub type PageRequest = Request<Page>;
pub type MediaRequest = Request<Media>;
pub type UserRequest = Request<User>;
pub type CategoryRequest = Request<Category>;
pub type TagRequest = Request<Tag>;
pub type CommentRequest = Request<Comment>;
pub type PostStatusRequest = Request<PostStatus>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Configured,
    Sent,
    Parsed,
}

/// Pagination headers from the last successful response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    /// `X-WP-Total`
    pub total: Option<u64>,
    /// `X-WP-TotalPages`
    pub total_pages: Option<u64>,
}

impl ResponseMetadata {
    fn from_response(response: &HttpResponse) -> Self {
        let number = |name: &str| response.header(name).and_then(|v| v.trim().parse().ok());
        Self {
            total: number("X-WP-Total"),
            total_pages: number("X-WP-TotalPages"),
        }
    }
}

/// One query against a collection, bound to the facade that created it.
pub struct Request<S: Schema> {
    api: Api,
    resource: Option<String>,
    params: QueryParameters,
    embed: bool,
    state: RequestState,
    metadata: ResponseMetadata,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> Request<S> {
    pub(crate) fn new(api: Api) -> Self {
        Self {
            api,
            resource: None,
            params: QueryParameters::for_schema::<S>(),
            embed: true,
            state: RequestState::Configured,
            metadata: ResponseMetadata::default(),
            _schema: PhantomData,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn metadata(&self) -> ResponseMetadata {
        self.metadata
    }

    /// `X-WP-Total` of the last response.
    pub fn total(&self) -> Option<u64> {
        self.metadata.total
    }

    /// `X-WP-TotalPages` of the last response.
    pub fn total_pages(&self) -> Option<u64> {
        self.metadata.total_pages
    }

    pub fn params(&self) -> &QueryParameters {
        &self.params
    }

    /// Full access to the filters this type accepts.
    pub fn params_mut(&mut self) -> &mut QueryParameters {
        &mut self.params
    }

    /// Fetch `collection/{id}` instead of the collection.
    pub fn id(&mut self, id: impl NumericArg) -> Result<&mut Self> {
        if S::SLUG_ADDRESSED {
            return Err(ApiError::validation(
                "id",
                format!("{} resources are addressed by slug", S::KIND),
            ));
        }
        self.resource = Some(id.to_id("id")?.to_string());
        Ok(self)
    }

    /// Fetch `collection/{slug}` for types addressed by slug.
    pub fn resource_slug(&mut self, slug: &str) -> Result<&mut Self> {
        if !S::SLUG_ADDRESSED {
            return Err(ApiError::validation(
                "slug",
                format!("{} resources are addressed by id", S::KIND),
            ));
        }
        if slug.is_empty() || slug.contains('/') {
            return Err(ApiError::validation("slug", format!("'{slug}' is not a valid slug")));
        }
        self.resource = Some(slug.to_string());
        Ok(self)
    }

    /// Ask the server to inline linked resources (`_embed`). On by default.
    pub fn embed(&mut self, embed: bool) -> &mut Self {
        self.embed = embed;
        self
    }

    pub fn context(&mut self, context: Context) -> Result<&mut Self> {
        self.params.set_context(context)?;
        Ok(self)
    }

    pub fn page(&mut self, page: impl NumericArg) -> Result<&mut Self> {
        self.params.set_page(page)?;
        Ok(self)
    }

    pub fn per_page(&mut self, per_page: impl NumericArg) -> Result<&mut Self> {
        self.params.set_per_page(per_page)?;
        Ok(self)
    }

    pub fn search(&mut self, search: impl Into<String>) -> Result<&mut Self> {
        self.params.set_search(search)?;
        Ok(self)
    }

    pub fn slug(&mut self, slug: &str) -> Result<&mut Self> {
        self.params.set_slug([slug])?;
        Ok(self)
    }

    pub fn include<I>(&mut self, ids: I) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.params.set_include(ids)?;
        Ok(self)
    }

    pub fn exclude<I>(&mut self, ids: I) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.params.set_exclude(ids)?;
        Ok(self)
    }

    pub fn order(&mut self, order: Order) -> Result<&mut Self> {
        self.params.set_order(order)?;
        Ok(self)
    }

    pub fn orderby(&mut self, orderby: &str) -> Result<&mut Self> {
        self.params.set_orderby(orderby)?;
        Ok(self)
    }

    pub fn status<I>(&mut self, statuses: I) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.params.set_status(statuses)?;
        Ok(self)
    }

    /// Collection URL, or `collection/{resource}` when one is set.
    pub fn url(&self) -> String {
        let collection = format!("{}{}", self.api.base_url(), S::KIND.collection());
        match &self.resource {
            Some(resource) => format!("{collection}/{resource}"),
            None => collection,
        }
    }

    /// Send the request and return the entities in server order.
    pub fn get(&mut self) -> Result<Vec<Arc<Entity<S>>>> {
        let body = self.send(false)?;
        let context = self.params.context().unwrap_or_default();
        let entities = match body {
            Some(body) => S::normalize_collection(body)
                .into_iter()
                .map(|item| materialize::<S>(&self.api, item, context))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        self.state = RequestState::Parsed;
        tracing::debug!(kind = %S::KIND, count = entities.len(), "materialized entities");
        Ok(entities)
    }

    /// Send the request and return `X-WP-Total` without building entities.
    ///
    /// Without an explicit context the shortest (`embed`) response is
    /// requested, and nothing is embedded.
    pub fn count(&mut self) -> Result<u64> {
        let body = self.send(true)?;
        self.state = RequestState::Parsed;
        let Some(body) = body else {
            return Ok(0);
        };
        Ok(self
            .metadata
            .total
            .unwrap_or_else(|| S::normalize_collection(body).len() as u64))
    }

    fn build(&self, counting: bool) -> HttpRequest {
        let mut query = self.params.to_query();
        if counting && !self.params.is_set("context") {
            query.push(("context".to_string(), Context::Embed.as_str().to_string()));
        }
        if self.embed && !counting {
            query.push(("_embed".to_string(), "true".to_string()));
        }
        HttpRequest::get(self.url(), query)
    }

    fn send(&mut self, counting: bool) -> Result<Option<Value>> {
        if self.state != RequestState::Configured {
            return Err(ApiError::RequestAlreadySent);
        }
        let request = self.build(counting);
        self.state = RequestState::Sent;

        tracing::debug!(kind = %S::KIND, url = %request.url, "sending request");
        let response = self.api.execute(request)?;
        match decode_response(response)? {
            Some((metadata, body)) => {
                self.metadata = metadata;
                Ok(Some(body))
            }
            None => Ok(None),
        }
    }
}

impl<S: Schema> std::fmt::Debug for Request<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &S::KIND)
            .field("url", &self.url())
            .field("params", &self.params.to_query())
            .field("embed", &self.embed)
            .field("state", &self.state)
            .finish()
    }
}

/// Map a response to its body and pagination headers. `None` means 404.
pub(crate) fn decode_response(response: HttpResponse) -> Result<Option<(ResponseMetadata, Value)>> {
    match response.status {
        200..=299 => {}
        404 => {
            tracing::debug!(body = %response.body, "server returned 404, treating as empty");
            return Ok(None);
        }
        400 => {
            let payload =
                serde_json::from_str(&response.body).unwrap_or(Value::String(response.body));
            return Err(ApiError::BadRequest { payload });
        }
        401 | 403 => {
            return Err(ApiError::AuthenticationRequired {
                status: response.status,
                body: response.body,
            });
        }
        status => {
            tracing::warn!(status, "request failed");
            return Err(ApiError::HttpError {
                status,
                body: response.body,
            });
        }
    }

    let metadata = ResponseMetadata::from_response(&response);
    if response.body.trim().is_empty() {
        return Ok(Some((metadata, Value::Null)));
    }
    let body = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::DeserializationError(format!("response body: {e}")))?;
    Ok(Some((metadata, body)))
}

/// Turn one response object into the cached entity for it.
///
/// The cache is consulted by remote ID, or by slug when the payload has no
/// ID. A hit is refreshed in place with the fields this payload carries; a
/// miss builds, populates and registers a new instance, taking over the
/// slug if another object held it before.
pub(crate) fn materialize<S: Schema>(api: &Api, item: Value, context: Context) -> Result<Arc<Entity<S>>> {
    let payload = match item {
        Value::Object(payload) => payload,
        other => {
            return Err(ApiError::DeserializationError(format!(
                "expected a {} object, got {other}",
                S::KIND
            )))
        }
    };
    let keys = IdentityKeys::from_payload(&payload);
    if keys.is_empty() {
        return Err(ApiError::DeserializationError(format!(
            "{} payload carries neither id nor slug",
            S::KIND
        )));
    }

    let cache = api.cache();
    if let Some(existing) = cache.lookup::<S>(&keys) {
        tracing::trace!(kind = %S::KIND, %keys, "identity cache hit");
        refresh(api, &existing, &payload, context)?;
        let (existing, _) = cache.register(existing, &keys);
        return Ok(existing);
    }

    let entity = Arc::new(Entity::new(api.downgrade()));
    refresh(api, &entity, &payload, context)?;
    let (winner, inserted) = cache.register(entity, &keys);
    if !inserted {
        // Another caller registered the same object first.
        refresh(api, &winner, &payload, context)?;
    }
    Ok(winner)
}

fn refresh<S: Schema>(
    api: &Api,
    entity: &Entity<S>,
    payload: &Map<String, Value>,
    context: Context,
) -> Result<()> {
    entity.populate_from_payload(payload, context)?;
    process_embedded(api, S::KIND, payload)?;
    entity.postprocess_response(payload)?;
    Ok(())
}

/// Materialize the resources the server inlined under `_embedded`.
fn process_embedded(api: &Api, owner: EntityKind, payload: &Map<String, Value>) -> Result<()> {
    let Some(Value::Object(embedded)) = payload.get("_embedded") else {
        return Ok(());
    };
    for (relation, value) in embedded {
        match relation.as_str() {
            "author" => embed_each::<User>(api, value)?,
            "wp:featuredmedia" => embed_each::<Media>(api, value)?,
            "replies" => embed_each::<Comment>(api, value)?,
            "wp:term" => {
                for term in flatten(value) {
                    match term.get("taxonomy").and_then(Value::as_str) {
                        Some("category") => embed_one::<Category>(api, term)?,
                        Some("post_tag") => embed_one::<Tag>(api, term)?,
                        taxonomy => tracing::debug!(?taxonomy, "skipping embedded term"),
                    }
                }
            }
            "up" => {
                for parent in flatten(value) {
                    match (owner, parent.get("type").and_then(Value::as_str)) {
                        (EntityKind::Page, _) | (_, Some("page")) => embed_one::<Page>(api, parent)?,
                        (EntityKind::Comment | EntityKind::Media, _) => embed_one::<Post>(api, parent)?,
                        _ => tracing::debug!(%owner, "skipping embedded parent"),
                    }
                }
            }
            other => tracing::debug!(relation = other, %owner, "skipping embedded relation"),
        }
    }
    Ok(())
}

fn embed_each<T: Schema>(api: &Api, value: &Value) -> Result<()> {
    for item in flatten(value) {
        embed_one::<T>(api, item)?;
    }
    Ok(())
}

fn embed_one<T: Schema>(api: &Api, item: &Value) -> Result<()> {
    let Some(object) = item.as_object() else {
        tracing::warn!(kind = %T::KIND, "embedded value is not an object");
        return Ok(());
    };
    // The server embeds error objects (e.g. `rest_user_invalid_id`) in place
    // of resources the caller may not see.
    if object.contains_key("code") || IdentityKeys::from_payload(object).is_empty() {
        tracing::warn!(kind = %T::KIND, code = ?object.get("code"), "skipping unusable embedded object");
        return Ok(());
    }
    materialize::<T>(api, item.clone(), Context::Embed)?;
    Ok(())
}

/// Embedded relations are lists, sometimes lists of lists.
fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten).collect(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_mapping() {
        assert!(decode_response(HttpResponse::json(404, &json!({"code": "rest_no_route"})))
            .unwrap()
            .is_none());

        let err = decode_response(HttpResponse::json(400, &json!({"code": "rest_invalid_param"})))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { ref payload } if payload["code"] == "rest_invalid_param"));

        let err = decode_response(HttpResponse::json(401, &json!({}))).unwrap_err();
        assert!(matches!(err, ApiError::AuthenticationRequired { status: 401, .. }));

        let err = decode_response(HttpResponse::json(500, &json!({}))).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }

    #[test]
    fn bad_request_keeps_non_json_bodies() {
        let response = HttpResponse {
            status: 400,
            headers: Vec::new(),
            body: "nope".to_string(),
        };
        let err = decode_response(response).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { payload: Value::String(ref s) } if s == "nope"));
    }

    #[test]
    fn pagination_headers_are_read() {
        let response = HttpResponse::json(200, &json!([]))
            .with_header("X-WP-Total", "42")
            .with_header("x-wp-totalpages", "5");
        let (metadata, _) = decode_response(response).unwrap().unwrap();
        assert_eq!(metadata.total, Some(42));
        assert_eq!(metadata.total_pages, Some(5));
    }

    #[test]
    fn malformed_bodies_are_reported() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "<html>".to_string(),
        };
        assert!(matches!(
            decode_response(response).unwrap_err(),
            ApiError::DeserializationError(_)
        ));
    }

    #[test]
    fn nested_lists_flatten() {
        let value = json!([[{"id": 1}], [{"id": 2}, {"id": 3}]]);
        assert_eq!(flatten(&value).len(), 3);
        assert_eq!(flatten(&json!({"id": 1})).len(), 1);
    }
}
