//! Paginated listing walker.
//!
//! A [`ListingWalker`] drives [`ObjectStore::list_page`] with the continuation
//! token of the previous page until the backend reports the listing exhausted.
//! It can be consumed page by page ([`ListingWalker::next_page`]) when the caller
//! wants bounded memory, or drained into a [`Listing`] in one go.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::error::ListingError;
use crate::store::{ListPage, ListRequest, ObjectRecord, ObjectStore};

/// All objects and common prefixes of a finished walk.
#[derive(Debug, Default, Clone)]
pub struct Listing {
    /// Objects in backend order.
    pub objects: Vec<ObjectRecord>,
    /// Percent-decoded common prefixes, deduplicated, in first-seen order.
    pub prefixes: Vec<String>,
    seen: HashSet<String>,
}

impl Listing {
    /// Fold one page into the listing.
    pub fn push_page(&mut self, page: ListPage) {
        self.objects.extend(page.objects);

        for prefix in page.common_prefixes {
            let decoded = percent_decode_str(&prefix).decode_utf8_lossy().into_owned();
            if self.seen.insert(decoded.clone()) {
                self.prefixes.push(decoded);
            }
        }
    }
}

/// Walks a prefix listing page by page.
pub struct ListingWalker<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    request: ListRequest,
    exhausted: bool,
    pages: usize,
}

impl<S: ObjectStore + ?Sized> std::fmt::Debug for ListingWalker<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingWalker")
            .field("request", &self.request)
            .field("exhausted", &self.exhausted)
            .field("pages", &self.pages)
            .finish_non_exhaustive()
    }
}

impl<'a, S: ObjectStore + ?Sized> ListingWalker<'a, S> {
    /// Create a walker over `bucket` under `prefix`.
    ///
    /// With a delimiter, keys sharing a prefix up to the next delimiter are
    /// folded into a single common prefix. Without one the walk is recursive.
    #[must_use]
    pub fn new(store: &'a S, bucket: &str, prefix: &str, delimiter: Option<&str>) -> Self {
        Self {
            store,
            request: ListRequest {
                bucket: bucket.to_owned(),
                prefix: prefix.to_owned(),
                delimiter: delimiter.map(ToOwned::to_owned),
                continuation_token: None,
            },
            exhausted: false,
            pages: 0,
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<ListPage>, ListingError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .list_page(&self.request)
            .await
            .map_err(|source| ListingError {
                bucket: self.request.bucket.clone(),
                prefix: self.request.prefix.clone(),
                source,
            })?;

        self.pages += 1;
        debug!(
            bucket = %self.request.bucket,
            prefix = %self.request.prefix,
            page = self.pages,
            objects = page.objects.len(),
            common_prefixes = page.common_prefixes.len(),
            "listed page"
        );

        match &page.next_continuation_token {
            Some(token) => self.request.continuation_token = Some(token.clone()),
            None => self.exhausted = true,
        }

        Ok(Some(page))
    }

    /// Walk every remaining page and accumulate them into a [`Listing`].
    ///
    /// A failing page aborts the walk; no partial listing is returned.
    pub async fn collect(mut self) -> Result<Listing, ListingError> {
        let mut listing = Listing::default();
        while let Some(page) = self.next_page().await? {
            listing.push_page(page);
        }
        Ok(listing)
    }
}
