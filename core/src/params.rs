//! Validated query parameters for collection requests.
//!
//! # Design
//! Every setter validates its input immediately and fails with
//! `ApiError::Validation` before anything is sent. Values are stored already
//! rendered in their wire form, so serializing is a plain copy. Setting a
//! parameter again replaces the previous value; list parameters are sent as
//! comma-separated strings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{ApiError, Result};
use crate::schema::{Context, EntityKind, Schema};

const MEDIA_TYPES: &[&str] = &["image", "video", "text", "application", "audio"];

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A numeric argument given either as an integer or as a numeric string.
pub trait NumericArg {
    fn to_id(&self, parameter: &str) -> Result<u64>;
}

macro_rules! unsigned_arg {
    ($($t:ty),*) => {$(
        impl NumericArg for $t {
            fn to_id(&self, _parameter: &str) -> Result<u64> {
                Ok(u64::from(*self))
            }
        }
    )*};
}

unsigned_arg!(u8, u16, u32, u64);

macro_rules! signed_arg {
    ($($t:ty),*) => {$(
        impl NumericArg for $t {
            fn to_id(&self, parameter: &str) -> Result<u64> {
                u64::try_from(*self).map_err(|_| {
                    ApiError::validation(parameter, format!("must not be negative ({self} given)"))
                })
            }
        }
    )*};
}

signed_arg!(i32, i64, usize);

impl NumericArg for str {
    fn to_id(&self, parameter: &str) -> Result<u64> {
        self.trim().parse().map_err(|_| {
            ApiError::validation(
                parameter,
                format!("must be a non-negative integer ('{self}' given)"),
            )
        })
    }
}

impl NumericArg for &str {
    fn to_id(&self, parameter: &str) -> Result<u64> {
        (**self).to_id(parameter)
    }
}

impl NumericArg for String {
    fn to_id(&self, parameter: &str) -> Result<u64> {
        self.as_str().to_id(parameter)
    }
}

/// Query parameters for one entity type.
#[derive(Debug, Clone)]
pub struct QueryParameters {
    kind: EntityKind,
    allowed: &'static [&'static str],
    orderby: &'static [&'static str],
    statuses: &'static [&'static str],
    values: BTreeMap<&'static str, String>,
}

impl QueryParameters {
    pub fn for_schema<S: Schema>() -> Self {
        Self {
            kind: S::KIND,
            allowed: S::PARAMETERS,
            orderby: S::ORDERBY,
            statuses: S::STATUSES,
            values: BTreeMap::new(),
        }
    }

    /// The value set for `name`, in wire form.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn context(&self) -> Option<Context> {
        self.get("context").and_then(|value| value.parse().ok())
    }

    /// Wire parameters in a stable order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn put(&mut self, name: &'static str, value: String) -> Result<()> {
        if !self.allowed.contains(&name) {
            return Err(ApiError::validation(
                name,
                format!("not supported by {} requests", self.kind),
            ));
        }
        self.values.insert(name, value);
        Ok(())
    }

    fn put_id(&mut self, name: &'static str, value: impl NumericArg) -> Result<()> {
        let id = value.to_id(name)?;
        self.put(name, id.to_string())
    }

    fn put_ids<I>(&mut self, name: &'static str, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        let ids = values
            .into_iter()
            .map(|value| value.to_id(name).map(|id| id.to_string()))
            .collect::<Result<Vec<_>>>()?;
        self.put(name, ids.join(","))
    }

    fn put_choices<I>(&mut self, name: &'static str, values: I, accepted: &[&str]) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut chosen = Vec::new();
        for value in values {
            let value = value.as_ref().to_ascii_lowercase();
            if !accepted.is_empty() && !accepted.contains(&value.as_str()) {
                return Err(ApiError::validation(
                    name,
                    format!("'{value}' is not one of {}", accepted.join(", ")),
                ));
            }
            chosen.push(value);
        }
        self.put(name, chosen.join(","))
    }

    fn put_bool(&mut self, name: &'static str, value: bool) -> Result<()> {
        self.put(name, value.to_string())
    }

    fn put_date(&mut self, name: &'static str, value: DateTime<Utc>) -> Result<()> {
        self.put(name, value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn set_context(&mut self, context: Context) -> Result<()> {
        self.put("context", context.as_str().to_string())
    }

    pub fn set_page(&mut self, page: impl NumericArg) -> Result<()> {
        let page = page.to_id("page")?;
        if page == 0 {
            return Err(ApiError::validation("page", "must be 1 or greater"));
        }
        self.put("page", page.to_string())
    }

    pub fn set_per_page(&mut self, per_page: impl NumericArg) -> Result<()> {
        let per_page = per_page.to_id("per_page")?;
        if !(1..=100).contains(&per_page) {
            return Err(ApiError::validation(
                "per_page",
                format!("must be between 1 and 100 ({per_page} given)"),
            ));
        }
        self.put("per_page", per_page.to_string())
    }

    pub fn set_offset(&mut self, offset: impl NumericArg) -> Result<()> {
        self.put_id("offset", offset)
    }

    pub fn set_search(&mut self, search: impl Into<String>) -> Result<()> {
        self.put("search", search.into())
    }

    pub fn set_after(&mut self, after: DateTime<Utc>) -> Result<()> {
        self.put_date("after", after)
    }

    pub fn set_before(&mut self, before: DateTime<Utc>) -> Result<()> {
        self.put_date("before", before)
    }

    pub fn set_author<I>(&mut self, authors: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("author", authors)
    }

    pub fn set_author_exclude<I>(&mut self, authors: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("author_exclude", authors)
    }

    pub fn set_include<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("include", ids)
    }

    pub fn set_exclude<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("exclude", ids)
    }

    pub fn set_order(&mut self, order: Order) -> Result<()> {
        self.put("order", order.as_ref().to_string())
    }

    pub fn set_orderby(&mut self, orderby: &str) -> Result<()> {
        let accepted = self.orderby;
        self.put_choices("orderby", [orderby], accepted)
    }

    pub fn set_slug<I>(&mut self, slugs: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.put_choices("slug", slugs, &[])
    }

    pub fn set_status<I>(&mut self, statuses: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let accepted = self.statuses;
        self.put_choices("status", statuses, accepted)
    }

    pub fn set_categories<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("categories", ids)
    }

    pub fn set_categories_exclude<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("categories_exclude", ids)
    }

    pub fn set_tags<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("tags", ids)
    }

    pub fn set_tags_exclude<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("tags_exclude", ids)
    }

    pub fn set_sticky(&mut self, sticky: bool) -> Result<()> {
        self.put_bool("sticky", sticky)
    }

    pub fn set_parent<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("parent", ids)
    }

    pub fn set_parent_exclude<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("parent_exclude", ids)
    }

    pub fn set_menu_order(&mut self, menu_order: impl NumericArg) -> Result<()> {
        self.put_id("menu_order", menu_order)
    }

    pub fn set_hide_empty(&mut self, hide_empty: bool) -> Result<()> {
        self.put_bool("hide_empty", hide_empty)
    }

    pub fn set_post<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: NumericArg,
    {
        self.put_ids("post", ids)
    }

    pub fn set_roles<I>(&mut self, roles: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.put_choices("roles", roles, &[])
    }

    pub fn set_media_type(&mut self, media_type: &str) -> Result<()> {
        self.put_choices("media_type", [media_type], MEDIA_TYPES)
    }

    pub fn set_mime_type(&mut self, mime_type: &str) -> Result<()> {
        if !mime_type.contains('/') {
            return Err(ApiError::validation(
                "mime_type",
                format!("expected type/subtype ('{mime_type}' given)"),
            ));
        }
        self.put("mime_type", mime_type.to_string())
    }

    pub fn set_author_email(&mut self, email: impl Into<String>) -> Result<()> {
        self.put("author_email", email.into())
    }

    pub fn set_comment_type(&mut self, comment_type: impl Into<String>) -> Result<()> {
        self.put("type", comment_type.into())
    }

    /// Password for comments on a protected post.
    pub fn set_password(&mut self, password: impl Into<String>) -> Result<()> {
        self.put("password", password.into())
    }
}
