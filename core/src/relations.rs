//! Lazy relations between entities.
//!
//! Each `resolve_*` method issues its request on the first call only and
//! memoizes the result on the entity; later calls return the memoized value
//! even if the server changed since. `Entity::forget_relations` (or clearing
//! the cache) drops the memo. Singular relations go through `Api::get_one`,
//! so anything already in the identity cache, embedded resources included,
//! resolves without a request.
//!
//! The traits below say which schema field holds the related ID. Implement
//! them on a custom schema to get the same resolvers.

use std::sync::Arc;

use crate::api::Lookup;
use crate::entities::{Category, Comment, Media, Page, Post, Tag, User};
use crate::entity::Entity;
use crate::error::{ApiError, Result};
use crate::request::Request;
use crate::schema::Schema;

/// Schemas with an `author` user ID.
pub trait Authored: Schema {
    fn author_id(&self) -> Option<u64>;
}

/// Schemas with a `featured_media` ID.
pub trait Featured: Schema {
    fn featured_media_id(&self) -> Option<u64>;
}

/// Schemas with a `categories` ID list.
pub trait Categorized: Schema {
    fn category_ids(&self) -> Vec<u64>;
}

/// Schemas with a `tags` ID list.
pub trait Tagged: Schema {
    fn tag_ids(&self) -> Vec<u64>;
}

/// Schemas whose `parent` is another entity of the same type.
pub trait Hierarchical: Schema {
    fn parent_id(&self) -> Option<u64>;
}

/// Schemas that can receive comments.
pub trait Discussable: Schema {}

/// WordPress uses 0 for "none".
fn non_zero(id: Option<u64>) -> Option<u64> {
    id.filter(|id| *id != 0)
}

fn require_id<S: Schema>(entity: &Entity<S>) -> Result<u64> {
    entity
        .remote_id()
        .ok_or_else(|| ApiError::MissingRequiredParameter("id".to_string()))
}

impl<S: Authored> Entity<S> {
    /// The author; `None` for guest content.
    pub fn resolve_author(&self) -> Result<Option<Arc<Entity<User>>>> {
        let author = non_zero(self.read().author_id());
        self.memoized("author", |api| {
            author
                .map(|id| api.get_one::<User>(Lookup::by_id(id)))
                .transpose()
        })
    }
}

impl<S: Featured> Entity<S> {
    pub fn resolve_featured_media(&self) -> Result<Option<Arc<Entity<Media>>>> {
        let media = non_zero(self.read().featured_media_id());
        self.memoized("featured_media", |api| {
            media
                .map(|id| api.get_one::<Media>(Lookup::by_id(id)))
                .transpose()
        })
    }
}

impl<S: Categorized> Entity<S> {
    /// Categories in the order the entity lists them.
    pub fn resolve_categories(&self) -> Result<Vec<Arc<Entity<Category>>>> {
        let ids = self.read().category_ids();
        self.memoized("categories", |api| api.get_many::<Category, _>(ids))
    }
}

impl<S: Tagged> Entity<S> {
    pub fn resolve_tags(&self) -> Result<Vec<Arc<Entity<Tag>>>> {
        let ids = self.read().tag_ids();
        self.memoized("tags", |api| api.get_many::<Tag, _>(ids))
    }
}

impl<S: Hierarchical> Entity<S> {
    /// The parent entity; `None` at the top level.
    pub fn resolve_parent(&self) -> Result<Option<Arc<Entity<S>>>> {
        let parent = non_zero(self.read().parent_id());
        self.memoized("parent", |api| {
            parent
                .map(|id| api.get_one::<S>(Lookup::by_id(id)))
                .transpose()
        })
    }
}

impl<S: Discussable> Entity<S> {
    /// The first 100 comments on this entity.
    pub fn resolve_comments(&self) -> Result<Vec<Arc<Entity<Comment>>>> {
        let id = require_id(self)?;
        self.memoized("comments", |api| {
            let mut request: Request<Comment> = api.request();
            request.params_mut().set_post([id])?;
            request.per_page(100)?;
            request.get()
        })
    }
}

impl Entity<Comment> {
    /// The post this comment belongs to.
    pub fn resolve_post(&self) -> Result<Option<Arc<Entity<Post>>>> {
        let post = non_zero(self.read().post);
        self.memoized("post", |api| {
            post.map(|id| api.get_one::<Post>(Lookup::by_id(id))).transpose()
        })
    }
}

impl Entity<User> {
    /// The first 100 posts written by this user.
    pub fn resolve_posts(&self) -> Result<Vec<Arc<Entity<Post>>>> {
        let id = require_id(self)?;
        self.memoized("posts", |api| {
            let mut request: Request<Post> = api.request();
            request.params_mut().set_author([id])?;
            request.per_page(100)?;
            request.get()
        })
    }
}

impl Entity<Category> {
    /// The first 100 posts filed under this category.
    pub fn resolve_posts(&self) -> Result<Vec<Arc<Entity<Post>>>> {
        let id = require_id(self)?;
        self.memoized("posts", |api| {
            let mut request: Request<Post> = api.request();
            request.params_mut().set_categories([id])?;
            request.per_page(100)?;
            request.get()
        })
    }
}

impl Entity<Tag> {
    /// The first 100 posts carrying this tag.
    pub fn resolve_posts(&self) -> Result<Vec<Arc<Entity<Post>>>> {
        let id = require_id(self)?;
        self.memoized("posts", |api| {
            let mut request: Request<Post> = api.request();
            request.params_mut().set_tags([id])?;
            request.per_page(100)?;
            request.get()
        })
    }
}

impl Authored for Post {
    fn author_id(&self) -> Option<u64> {
        self.author
    }
}

impl Authored for Page {
    fn author_id(&self) -> Option<u64> {
        self.author
    }
}

impl Authored for Media {
    fn author_id(&self) -> Option<u64> {
        self.author
    }
}

impl Authored for Comment {
    fn author_id(&self) -> Option<u64> {
        self.author
    }
}

impl Featured for Post {
    fn featured_media_id(&self) -> Option<u64> {
        self.featured_media
    }
}

impl Featured for Page {
    fn featured_media_id(&self) -> Option<u64> {
        self.featured_media
    }
}

impl Categorized for Post {
    fn category_ids(&self) -> Vec<u64> {
        self.categories.clone().unwrap_or_default()
    }
}

impl Tagged for Post {
    fn tag_ids(&self) -> Vec<u64> {
        self.tags.clone().unwrap_or_default()
    }
}

impl Hierarchical for Page {
    fn parent_id(&self) -> Option<u64> {
        self.parent
    }
}

impl Hierarchical for Category {
    fn parent_id(&self) -> Option<u64> {
        self.parent
    }
}

impl Hierarchical for Comment {
    fn parent_id(&self) -> Option<u64> {
        self.parent
    }
}

impl Discussable for Post {}

impl Discussable for Page {}
