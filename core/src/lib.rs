//! Object mapper for the WordPress REST API.
//!
//! # Overview
//! Turns JSON responses from `/wp-json/wp/v2/` into typed, shared entities
//! (posts, pages, media, users, categories, tags, comments, post statuses)
//! and back. An identity cache keyed by remote ID and slug guarantees one
//! in-memory instance per remote object, and entities resolve their
//! relations (author, featured media, terms, comments) lazily through the
//! same facade.
//!
//! # Design
//! - `Api` is the single entry point: configuration, the identity cache, an
//!   optional scoped HTTP session, and singular/plural accessors.
//! - `Request<S>` validates query parameters at assignment time, sends one
//!   GET and materializes the response through the cache.
//! - Network I/O sits behind the `Transport` trait. `UreqTransport` is the
//!   default; `ScriptedTransport` replays canned responses for tests.
//! - Schemas are plain serde structs; a per-type field table decides which
//!   fields each response context populates.
//!
//! ```no_run
//! use wp_orm::{Api, Lookup};
//!
//! let api = Api::new("https://example.com/wp-json/wp/v2/")?;
//! let post = api.post(Lookup::by_slug("hello-world"))?;
//! if let Some(author) = post.resolve_author()? {
//!     println!("{} by {:?}", post.read().title.as_deref().unwrap_or(""), author.read().name);
//! }
//! # Ok::<(), wp_orm::ApiError>(())
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod entities;
pub mod entity;
pub mod error;
pub mod http;
pub mod params;
pub mod relations;
pub mod request;
pub mod schema;
pub mod transport;

pub use api::{Api, Lookup, Session};
pub use auth::{Authenticator, BasicAuth};
pub use cache::{CacheMiss, IdentityCache};
pub use config::ApiBuilder;
pub use entities::{
    Category, Comment, GravatarDefault, GravatarRating, Media, Page, Post, PostStatus, Tag, User,
};
pub use entity::Entity;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use params::{NumericArg, Order, QueryParameters};
pub use relations::{Authored, Categorized, Discussable, Featured, Hierarchical, Tagged};
pub use request::{
    CategoryRequest, CommentRequest, MediaRequest, PageRequest, PostRequest, PostStatusRequest,
    Request, RequestState, ResponseMetadata, TagRequest, UserRequest,
};
pub use schema::{Context, EntityKind, Field, Schema, Selector, Visibility};
pub use transport::{ScriptedTransport, UreqTransport};
