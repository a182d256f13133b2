//! Identity cache: one shared entity instance per (schema type, remote key).
//!
//! # Design
//! Buckets are keyed by the schema's `TypeId`, so a lookup is checked at
//! compile time through the generic parameter and a custom schema for the
//! same collection never collides with the built-in one.
//!
//! Each bucket keeps remote IDs and slugs in separate maps. The ID is the
//! identity of an object; the slug is only an alias that follows whichever
//! object last carried it, so a numeric slug never shadows another object's
//! ID and a reused slug never merges two objects.
//!
//! Registration re-checks the ID under the same lock that inserts, which
//! keeps the one-instance-per-ID invariant when several threads materialize
//! the same remote object. There is no eviction.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::entity::Entity;
use crate::schema::{EntityKind, Schema};

/// Returned by `IdentityCache::get` when nothing is stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} with key '{key}' not found in cache")]
pub struct CacheMiss {
    pub kind: EntityKind,
    pub key: String,
}

/// Type-erased view of a cached entity.
pub(crate) trait CachedEntity: Any + Send + Sync {
    fn forget_relations(&self);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// The ID and slug an object is registered under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IdentityKeys {
    pub id: Option<u64>,
    pub slug: Option<String>,
}

impl IdentityKeys {
    /// Reads `id` (number or numeric string) and a non-empty `slug`.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let id = match payload.get("id") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        let slug = match payload.get("slug") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        Self { id, slug }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.slug.is_none()
    }
}

impl fmt::Display for IdentityKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.id, &self.slug) {
            (Some(id), Some(slug)) => write!(f, "id={id} slug={slug}"),
            (Some(id), None) => write!(f, "id={id}"),
            (None, Some(slug)) => write!(f, "slug={slug}"),
            (None, None) => f.write_str("<no key>"),
        }
    }
}

struct Bucket {
    kind: EntityKind,
    ids: HashMap<u64, Arc<dyn CachedEntity>>,
    slugs: HashMap<String, Arc<dyn CachedEntity>>,
}

impl Bucket {
    fn instances(&self) -> impl Iterator<Item = &Arc<dyn CachedEntity>> {
        self.ids.values().chain(self.slugs.values())
    }

    fn distinct(&self) -> usize {
        self.instances().map(address).collect::<HashSet<_>>().len()
    }
}

fn address(entity: &Arc<dyn CachedEntity>) -> usize {
    Arc::as_ptr(entity) as *const () as usize
}

/// Process-lifetime store of materialized entities.
#[derive(Default)]
pub struct IdentityCache {
    buckets: Mutex<HashMap<TypeId, Bucket>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the instance stored under `key`. A key that reads as an
    /// integer is tried as a remote ID first, then as a slug.
    pub fn get<S: Schema>(&self, key: impl fmt::Display) -> Result<Arc<Entity<S>>, CacheMiss> {
        let key = key.to_string();
        let by_id = key.trim().parse().ok().and_then(|id| self.find_id::<S>(id));
        by_id
            .or_else(|| self.find_slug::<S>(&key))
            .ok_or(CacheMiss { kind: S::KIND, key })
    }

    pub fn get_by_id<S: Schema>(&self, id: u64) -> Result<Arc<Entity<S>>, CacheMiss> {
        self.find_id::<S>(id).ok_or(CacheMiss {
            kind: S::KIND,
            key: id.to_string(),
        })
    }

    pub fn get_by_slug<S: Schema>(&self, slug: &str) -> Result<Arc<Entity<S>>, CacheMiss> {
        self.find_slug::<S>(slug).ok_or_else(|| CacheMiss {
            kind: S::KIND,
            key: slug.to_string(),
        })
    }

    pub fn contains<S: Schema>(&self, key: impl fmt::Display) -> bool {
        self.get::<S>(key).is_ok()
    }

    /// Register `entity` under its current ID and slug, replacing whatever
    /// those keys pointed at.
    pub fn set<S: Schema>(&self, entity: &Arc<Entity<S>>) {
        let (id, slug) = (entity.remote_id(), entity.slug());
        let mut buckets = self.buckets.lock();
        let bucket = bucket_for::<S>(&mut buckets);
        let erased: Arc<dyn CachedEntity> = entity.clone();
        if let Some(id) = id {
            bucket.ids.insert(id, erased.clone());
        }
        if let Some(slug) = slug {
            bucket.slugs.insert(slug, erased);
        }
    }

    /// Drop every entry. Memoized relations are released first so that
    /// entities referring to each other do not keep one another alive.
    pub fn clear(&self) {
        let buckets = std::mem::take(&mut *self.buckets.lock());
        for bucket in buckets.into_values() {
            tracing::debug!(kind = %bucket.kind, instances = bucket.distinct(), "clearing cache bucket");
            for entity in bucket.instances() {
                entity.forget_relations();
            }
        }
    }

    /// Number of distinct instances held, across all types.
    pub fn len(&self) -> usize {
        let buckets = self.buckets.lock();
        buckets
            .values()
            .flat_map(Bucket::instances)
            .map(address)
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets
            .lock()
            .values()
            .all(|b| b.ids.is_empty() && b.slugs.is_empty())
    }

    /// The instance for a response object: by ID when the object has one,
    /// by slug only when it does not.
    pub(crate) fn lookup<S: Schema>(&self, keys: &IdentityKeys) -> Option<Arc<Entity<S>>> {
        match (keys.id, &keys.slug) {
            (Some(id), _) => self.find_id::<S>(id),
            (None, Some(slug)) => self.find_slug::<S>(slug),
            (None, None) => None,
        }
    }

    /// Insert `entity` unless its identity is already taken, in which case
    /// the existing instance wins. The slug is pointed at the winner.
    /// Returns the instance now registered and whether it is the one passed in.
    pub(crate) fn register<S: Schema>(
        &self,
        entity: Arc<Entity<S>>,
        keys: &IdentityKeys,
    ) -> (Arc<Entity<S>>, bool) {
        let mut buckets = self.buckets.lock();
        let bucket = bucket_for::<S>(&mut buckets);

        let existing = match (keys.id, &keys.slug) {
            (Some(id), _) => bucket.ids.get(&id).cloned(),
            (None, Some(slug)) => bucket.slugs.get(slug).cloned(),
            (None, None) => None,
        }
        .and_then(|found| found.into_any().downcast::<Entity<S>>().ok());

        let (winner, inserted) = match existing {
            Some(existing) => (existing, false),
            None => (entity, true),
        };
        let erased: Arc<dyn CachedEntity> = winner.clone();
        if let Some(id) = keys.id {
            bucket.ids.entry(id).or_insert_with(|| erased.clone());
        }
        if let Some(slug) = &keys.slug {
            let previous = bucket.slugs.insert(slug.clone(), erased.clone());
            if previous.is_some_and(|previous| address(&previous) != address(&erased)) {
                tracing::debug!(kind = %bucket.kind, %slug, "slug moved to another instance");
            }
        }
        (winner, inserted)
    }

    fn find_id<S: Schema>(&self, id: u64) -> Option<Arc<Entity<S>>> {
        let buckets = self.buckets.lock();
        let entry = buckets.get(&TypeId::of::<S>())?.ids.get(&id)?.clone();
        drop(buckets);
        entry.into_any().downcast::<Entity<S>>().ok()
    }

    fn find_slug<S: Schema>(&self, slug: &str) -> Option<Arc<Entity<S>>> {
        let buckets = self.buckets.lock();
        let entry = buckets.get(&TypeId::of::<S>())?.slugs.get(slug)?.clone();
        drop(buckets);
        entry.into_any().downcast::<Entity<S>>().ok()
    }
}

fn bucket_for<S: Schema>(buckets: &mut HashMap<TypeId, Bucket>) -> &mut Bucket {
    buckets.entry(TypeId::of::<S>()).or_insert_with(|| Bucket {
        kind: S::KIND,
        ids: HashMap::new(),
        slugs: HashMap::new(),
    })
}

impl fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buckets = self.buckets.lock();
        let mut map = f.debug_map();
        for bucket in buckets.values() {
            map.entry(&bucket.kind, &bucket.distinct());
        }
        map.finish()
    }
}
