//! Listing sort policy.
//!
//! [`SortOption`] is the closed set of orderings a listing page offers, and
//! [`SortSelection`] decides which one applies to a request: an explicit `sort`
//! query parameter wins and is remembered, otherwise the remembered value is used.

use std::cmp::Ordering;

use crate::path::base_name;
use crate::store::ObjectRecord;

/// Ordering applied to the objects of a listing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOption {
    /// Keep backend order.
    #[default]
    None,
    /// Final path component, ascending.
    Name,
    /// Newest first; objects without a timestamp last.
    LastModified,
    /// Largest first.
    Size,
}

impl SortOption {
    /// Every option, in the order the selector displays them.
    pub const ALL: [Self; 4] = [Self::None, Self::Name, Self::LastModified, Self::Size];

    /// Parse a query or cookie value. Unrecognised values mean [`SortOption::None`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "name" => Self::Name,
            "lastModified" => Self::LastModified,
            "size" => Self::Size,
            _ => Self::None,
        }
    }

    /// Wire value used in the query string and the cookie.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Name => "name",
            Self::LastModified => "lastModified",
            Self::Size => "size",
        }
    }

    /// Label shown in the selector.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Name => "Name",
            Self::LastModified => "Last Modified",
            Self::Size => "Size",
        }
    }

    /// Compare two objects under this option.
    #[must_use]
    pub fn compare(self, a: &ObjectRecord, b: &ObjectRecord) -> Ordering {
        match self {
            Self::None => Ordering::Equal,
            Self::Name => base_name(&a.key).cmp(base_name(&b.key)),
            Self::Size => b.size.cmp(&a.size),
            Self::LastModified => match (&a.last_modified, &b.last_modified) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => b.cmp(a),
            },
        }
    }
}

impl std::fmt::Display for SortOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order `objects` in place. The sort is stable, so ties keep backend order.
pub fn sort_objects(objects: &mut [ObjectRecord], option: SortOption) {
    if option == SortOption::None {
        return;
    }
    objects.sort_by(|a, b| option.compare(a, b));
}

/// The sort chosen for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSelection {
    /// Selected ordering.
    pub option: SortOption,
    /// Whether the selection came from the query string and must be remembered.
    pub persist: bool,
}

impl SortSelection {
    /// Resolve the selection from the `sort` query parameter and cookie.
    ///
    /// `query` is `Some` whenever the parameter is present, even with an empty
    /// value; only a wholly absent parameter falls back to the cookie.
    #[must_use]
    pub fn resolve(query: Option<&str>, cookie: Option<&str>) -> Self {
        match query {
            Some(value) => Self {
                option: SortOption::parse(value),
                persist: true,
            },
            None => Self {
                option: cookie.map(SortOption::parse).unwrap_or_default(),
                persist: false,
            },
        }
    }
}
