//! The shared, in-place-updatable wrapper around a schema struct.
//!
//! # Design
//! An `Entity<S>` is only ever created by the mapper while materializing a
//! response, so every instance is registered in its facade's identity cache.
//! It keeps a weak back-reference to that facade: relation resolvers use it
//! to issue follow-up requests, and a facade that has been dropped turns
//! those into a configuration error instead of a dangling call.
//!
//! Interior locks let one shared instance be refreshed by later fetches and
//! memoize resolved relations without handing out `&mut`.
//!
//! After every refresh the entity keeps the wire form of its fields as last
//! seen from the server. `Api::update` sends only the writable fields that
//! differ from it, so values the server rendered (titles, content) are never
//! written back unless the caller changed them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde_json::{Map, Value};

use crate::api::{Api, ApiInner};
use crate::cache::CachedEntity;
use crate::error::{ApiError, Result};
use crate::schema::{unwrap_rendered, Context, EntityKind, Schema};

/// One remote resource instance.
pub struct Entity<S: Schema> {
    fields: RwLock<S>,
    extra: RwLock<Map<String, Value>>,
    raw: RwLock<Value>,
    synced: RwLock<Map<String, Value>>,
    relations: Mutex<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
    api: Weak<ApiInner>,
}

impl<S: Schema> Entity<S> {
    pub(crate) fn new(api: Weak<ApiInner>) -> Self {
        Self {
            fields: RwLock::new(S::default()),
            extra: RwLock::new(Map::new()),
            raw: RwLock::new(Value::Null),
            synced: RwLock::new(Map::new()),
            relations: Mutex::new(HashMap::new()),
            api,
        }
    }

    pub fn kind(&self) -> EntityKind {
        S::KIND
    }

    pub fn remote_id(&self) -> Option<u64> {
        self.fields.read().remote_id()
    }

    pub fn slug(&self) -> Option<String> {
        self.fields.read().slug().map(str::to_string)
    }

    /// Snapshot of the typed fields.
    pub fn fields(&self) -> S {
        self.fields.read().clone()
    }

    /// Borrow the typed fields without cloning. Do not hold the guard across
    /// calls that may refresh this entity.
    pub fn read(&self) -> RwLockReadGuard<'_, S> {
        self.fields.read()
    }

    /// Change fields locally; `Api::update` sends the writable ones that differ
    /// from what the server last returned.
    pub fn edit<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.fields.write())
    }

    /// The last JSON object used to populate this entity.
    pub fn raw_payload(&self) -> Value {
        self.raw.read().clone()
    }

    /// A field registered with `Api::register_field`.
    pub fn extra_field(&self, name: &str) -> Option<Value> {
        self.extra.read().get(&name.to_ascii_lowercase()).cloned()
    }

    /// A schema field by its wire name, `None` when unset.
    pub fn field_value(&self, name: &str) -> Option<Value> {
        let fields = serde_json::to_value(&*self.fields.read()).ok()?;
        match fields.get(name) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        }
    }

    pub fn schema_fields() -> Vec<&'static str> {
        S::schema_fields()
    }

    pub fn post_fields() -> Vec<&'static str> {
        S::post_fields()
    }

    /// Merge the schema fields found in `payload` that are visible in
    /// `context`. Fields the payload does not carry keep their current value
    /// (unset on a fresh entity). `{"rendered": ..}` wrappers are unwrapped.
    pub fn populate_from_payload(&self, payload: &Map<String, Value>, context: Context) -> Result<()> {
        let mut visible = Map::new();
        for field in S::FIELDS {
            if !field.visibility.admits(context) {
                continue;
            }
            if let Some(value) = payload.get(field.name) {
                visible.insert(field.name.to_string(), unwrap_rendered(value));
            }
        }

        {
            let mut fields = self.fields.write();
            let merged = merge_fields(&*fields, visible)?;
            *fields = merged;
        }

        let registered = self
            .api
            .upgrade()
            .map(|api| api.registered_fields(S::KIND))
            .unwrap_or_default();
        if !registered.is_empty() {
            let mut extra = self.extra.write();
            for name in registered {
                if let Some(value) = payload.get(&name) {
                    extra.insert(name, unwrap_rendered(value));
                }
            }
        }

        *self.raw.write() = Value::Object(payload.clone());
        self.mark_synced()
    }

    pub fn postprocess_response(&self, raw: &Map<String, Value>) -> Result<()> {
        self.fields.write().postprocess_response(raw);
        self.mark_synced()
    }

    /// Writable fields changed locally since the last refresh.
    pub(crate) fn changed_payload(&self) -> Result<Map<String, Value>> {
        let writable = writable_payload(&*self.fields.read())?;
        let synced = self.synced.read();
        Ok(writable
            .into_iter()
            .filter(|(name, value)| synced.get(name) != Some(value))
            .collect())
    }

    fn mark_synced(&self) -> Result<()> {
        let snapshot = wire_fields(&*self.fields.read())?;
        *self.synced.write() = snapshot;
        Ok(())
    }

    /// Drop every memoized relation; the next `resolve_*` call fetches again.
    pub fn forget_relations(&self) {
        self.relations.lock().clear();
    }

    /// The facade this entity was materialized by.
    pub fn api(&self) -> Result<Api> {
        self.api.upgrade().map(Api::from_inner).ok_or_else(|| {
            ApiError::Configuration(format!(
                "the API that created this {} has been dropped",
                S::KIND
            ))
        })
    }

    /// Return the memoized value for `relation`, resolving it on first use.
    /// The relation lock is not held while resolving.
    pub(crate) fn memoized<T, F>(&self, relation: &'static str, resolve: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&Api) -> Result<T>,
    {
        if let Some(value) = self.cached_relation::<T>(relation) {
            return Ok(value);
        }
        let api = self.api()?;
        let value = resolve(&api)?;
        let mut relations = self.relations.lock();
        let stored = relations
            .entry(relation)
            .or_insert_with(|| Arc::new(value.clone()));
        Ok(stored.downcast_ref::<T>().cloned().unwrap_or(value))
    }

    fn cached_relation<T: Clone + 'static>(&self, relation: &str) -> Option<T> {
        self.relations
            .lock()
            .get(relation)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }
}

impl<S: Schema> CachedEntity for Entity<S> {
    fn forget_relations(&self) {
        Entity::forget_relations(self);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<S: Schema> fmt::Debug for Entity<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &S::KIND)
            .field("id", &self.remote_id())
            .field("slug", &self.slug())
            .finish()
    }
}

/// Overlay `updates` on the serialized form of `current` and decode the result.
fn merge_fields<S: Schema>(current: &S, updates: Map<String, Value>) -> Result<S> {
    let mut base = wire_fields(current)?;
    base.extend(updates);
    serde_json::from_value(Value::Object(base))
        .map_err(|e| ApiError::DeserializationError(format!("{} payload: {e}", S::KIND)))
}

/// The writable, non-null fields of `fields`, keyed by wire name.
pub(crate) fn writable_payload<S: Schema>(fields: &S) -> Result<Map<String, Value>> {
    let writable = S::post_fields();
    Ok(wire_fields(fields)?
        .into_iter()
        .filter(|(name, value)| !value.is_null() && writable.contains(&name.as_str()))
        .collect())
}

fn wire_fields<S: Schema>(fields: &S) -> Result<Map<String, Value>> {
    match serde_json::to_value(fields) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(ApiError::SerializationError(e.to_string())),
    }
}
