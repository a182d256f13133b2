//! Concrete entity schemas for the core WordPress collections.
//!
//! Every struct here holds `Option` fields only: a field the server did not
//! send in the requested context stays `None` rather than taking a default.
//! Relations are not stored on the structs; see `relations.rs`.

/// Parameters every listable collection accepts.
macro_rules! collection_parameters {
    ($($extra:literal),* $(,)?) => {
        &["context", "page", "per_page", "search", "exclude", "include", "order", "orderby", "slug" $(, $extra)*]
    };
}

mod category;
mod comment;
mod media;
mod page;
mod post;
mod post_status;
mod tag;
mod user;

pub use category::Category;
pub use comment::Comment;
pub use media::Media;
pub use page::Page;
pub use post::Post;
pub use post_status::PostStatus;
pub use tag::Tag;
pub use user::{GravatarDefault, GravatarRating, User};
