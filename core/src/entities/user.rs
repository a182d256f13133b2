use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{ApiError, Result};
use crate::schema::{EntityKind, Field, Schema, Selector};

/// A site user. Most personal fields are only returned in `edit` context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<u64>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub locale: Option<String>,
    pub nickname: Option<String>,
    pub slug: Option<String>,
    pub registered_date: Option<String>,
    pub roles: Option<Vec<String>>,
    /// Write-only; the server never returns it.
    pub password: Option<String>,
    pub capabilities: Option<Value>,
    pub extra_capabilities: Option<Value>,
    pub avatar_urls: Option<BTreeMap<String, String>>,
    pub meta: Option<Value>,
}

impl Schema for User {
    const KIND: EntityKind = EntityKind::User;

    const FIELDS: &'static [Field] = &[
        Field::embed("id"),
        Field::edit("username").writable(),
        Field::embed("name").writable(),
        Field::edit("first_name").writable(),
        Field::edit("last_name").writable(),
        Field::edit("email").writable(),
        Field::embed("url").writable(),
        Field::embed("description").writable(),
        Field::embed("link"),
        Field::edit("locale").writable(),
        Field::edit("nickname").writable(),
        Field::embed("slug").writable(),
        Field::edit("registered_date"),
        Field::edit("roles").writable(),
        Field::edit("password").writable(),
        Field::edit("capabilities"),
        Field::edit("extra_capabilities"),
        Field::embed("avatar_urls"),
        Field::view("meta").writable(),
    ];

    const PARAMETERS: &'static [&'static str] = collection_parameters!("offset", "roles");

    const ORDERBY: &'static [&'static str] = &[
        "id", "include", "name", "registered_date", "slug", "email", "url",
    ];

    const REQUIRED_FOR_CREATE: &'static [&'static str] = &["username", "email", "password"];

    const SELECTORS: &'static [Selector] = &[Selector::Id, Selector::Username, Selector::Slug];

    fn remote_id(&self) -> Option<u64> {
        self.id
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

impl User {
    /// "First Last", from whichever parts are known. Needs `edit` context.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// Gravatar image URL for this user at `size` pixels (1 to 2048).
    ///
    /// Built from any of the `avatar_urls` the server returned; `None` when
    /// the payload carried none.
    pub fn gravatar_url(
        &self,
        size: u32,
        rating: GravatarRating,
        default_style: GravatarDefault,
    ) -> Result<Option<String>> {
        if !(1..=2048).contains(&size) {
            return Err(ApiError::validation(
                "size",
                format!("must be between 1 and 2048 ({size} given)"),
            ));
        }
        let Some(avatar) = self.avatar_urls.as_ref().and_then(|urls| urls.values().next()) else {
            return Ok(None);
        };
        let mut url = Url::parse(avatar)
            .map_err(|e| ApiError::DeserializationError(format!("avatar url '{avatar}': {e}")))?;
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("d", default_style.as_str())
            .append_pair("r", rating.as_str())
            .append_pair("s", &size.to_string());
        Ok(Some(url.into()))
    }
}

/// Highest image rating Gravatar may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GravatarRating {
    #[default]
    G,
    Pg,
    R,
    X,
}

impl GravatarRating {
    pub const fn as_str(self) -> &'static str {
        match self {
            GravatarRating::G => "g",
            GravatarRating::Pg => "pg",
            GravatarRating::R => "r",
            GravatarRating::X => "x",
        }
    }
}

impl FromStr for GravatarRating {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "g" => Ok(GravatarRating::G),
            "pg" => Ok(GravatarRating::Pg),
            "r" => Ok(GravatarRating::R),
            "x" => Ok(GravatarRating::X),
            _ => Err(ApiError::validation("rating", format!("must be one of g, pg, r, x ('{s}' given)"))),
        }
    }
}

/// Image Gravatar serves when the address has no avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GravatarDefault {
    NotFound,
    #[default]
    MysteryPerson,
    Identicon,
    MonsterId,
    Wavatar,
    Retro,
    Robohash,
    Blank,
}

impl GravatarDefault {
    const ALL: [GravatarDefault; 8] = [
        GravatarDefault::NotFound,
        GravatarDefault::MysteryPerson,
        GravatarDefault::Identicon,
        GravatarDefault::MonsterId,
        GravatarDefault::Wavatar,
        GravatarDefault::Retro,
        GravatarDefault::Robohash,
        GravatarDefault::Blank,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            GravatarDefault::NotFound => "404",
            GravatarDefault::MysteryPerson => "mm",
            GravatarDefault::Identicon => "identicon",
            GravatarDefault::MonsterId => "monsterid",
            GravatarDefault::Wavatar => "wavatar",
            GravatarDefault::Retro => "retro",
            GravatarDefault::Robohash => "robohash",
            GravatarDefault::Blank => "blank",
        }
    }
}

impl fmt::Display for GravatarDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GravatarDefault {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| {
                ApiError::validation(
                    "default_style",
                    format!("must be one of 404, mm, identicon, monsterid, wavatar, retro, robohash, blank ('{s}' given)"),
                )
            })
    }
}
