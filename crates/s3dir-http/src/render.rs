//! HTML page rendering.
//!
//! The [`Renderer`] is built once at startup and shared read-only by every
//! request. Templates are compiled into the binary by askama.

use askama::Template;

use crate::view::{BucketsView, ErrorView, ObjectView, ObjectsView};

/// Title shown in the header and the document title when none is configured.
pub const DEFAULT_TITLE: &str = "s3dir";

#[derive(Template)]
#[template(path = "buckets.html")]
struct BucketsPage<'a> {
    title: &'a str,
    view: &'a BucketsView,
}

#[derive(Template)]
#[template(path = "objects.html")]
struct ObjectsPage<'a> {
    title: &'a str,
    view: &'a ObjectsView,
}

#[derive(Template)]
#[template(path = "object.html")]
struct ObjectPage<'a> {
    title: &'a str,
    view: &'a ObjectView,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    title: &'a str,
    view: &'a ErrorView,
}

/// Renders the gateway's HTML pages.
#[derive(Debug, Clone)]
pub struct Renderer {
    title: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

impl Renderer {
    /// Create a renderer with the given site title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render the bucket listing.
    pub fn buckets(&self, view: &BucketsView) -> askama::Result<String> {
        BucketsPage {
            title: &self.title,
            view,
        }
        .render()
    }

    /// Render an object listing.
    pub fn objects(&self, view: &ObjectsView) -> askama::Result<String> {
        ObjectsPage {
            title: &self.title,
            view,
        }
        .render()
    }

    /// Render an object detail page.
    pub fn object(&self, view: &ObjectView) -> askama::Result<String> {
        ObjectPage {
            title: &self.title,
            view,
        }
        .render()
    }

    /// Render the error page.
    pub fn error(&self, view: &ErrorView) -> askama::Result<String> {
        ErrorPage {
            title: &self.title,
            view,
        }
        .render()
    }
}

#[cfg(test)]
mod tests {
    use s3dir_core::{BucketRecord, Listing, ObjectMetadata, SortOption};

    use super::*;

    #[test]
    fn test_should_render_buckets_page() {
        let view = BucketsView::new(&[BucketRecord {
            name: "photos".to_owned(),
            creation_date: None,
        }]);
        let html = Renderer::default().buckets(&view).expect("render");
        assert!(html.contains("<title>s3dir</title>"));
        assert!(html.contains("href=\"/photos/\""));
    }

    #[test]
    fn test_should_mark_selected_sort_option() {
        let view = ObjectsView::new("photos", &[], &Listing::default(), SortOption::Size);
        let html = Renderer::new("archive").objects(&view).expect("render");
        assert!(html.contains("<option value=\"size\" selected>Size</option>"));
        assert!(html.contains("<option value=\"name\">Name</option>"));
        assert!(html.contains("href=\"/photos/?archive\""));
        assert!(html.contains("This prefix is empty."));
    }

    #[test]
    fn test_should_escape_untrusted_values() {
        let view = ErrorView::new(&["b".to_owned()], "Error", "<script>alert(1)</script>");
        let html = Renderer::default().error(&view).expect("render");
        assert!(!html.contains("<script>"));
        assert!(html.contains("alert(1)"));
    }

    #[test]
    fn test_should_render_object_page() {
        let view = ObjectView::new(
            "photos",
            &["cat.jpg".to_owned()],
            ObjectMetadata {
                size: 2048,
                ..ObjectMetadata::default()
            },
        );
        let html = Renderer::default().object(&view).expect("render");
        assert!(html.contains("<h1>cat.jpg</h1>"));
        assert!(html.contains("2.00 KB"));
        assert!(html.contains("href=\"/photos/cat.jpg?location\""));
    }
}
