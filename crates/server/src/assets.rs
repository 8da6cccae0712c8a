//! Embedded web UI.
//!
//! The landing page template and its assets are compiled into the binary so
//! the service runs from a single file.

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;

use crate::files::ASSET_CACHE_CONTROL;

/// Landing page template; `{{ title }}` is replaced at render time
pub const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Placeholder substituted by [`render_index`]
const TITLE_PLACEHOLDER: &str = "{{ title }}";

/// An asset served under `/static/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub content: &'static str,
    pub content_type: &'static str,
}

const ASSETS: &[(&str, Asset)] = &[
    (
        "index.html",
        Asset {
            content: INDEX_TEMPLATE,
            content_type: "text/html; charset=utf-8",
        },
    ),
    (
        "app.js",
        Asset {
            content: include_str!("../static/app.js"),
            content_type: "text/javascript; charset=utf-8",
        },
    ),
    (
        "style.css",
        Asset {
            content: include_str!("../static/style.css"),
            content_type: "text/css; charset=utf-8",
        },
    ),
];

/// Look up an embedded asset by its path below `/static/`
pub fn lookup(path: &str) -> Option<Asset> {
    let path = path.trim_start_matches('/');
    ASSETS
        .iter()
        .find(|(name, _)| *name == path)
        .map(|(_, asset)| *asset)
}

/// Render the landing page with the configured title, HTML-escaped
pub fn render_index(title: &str) -> String {
    INDEX_TEMPLATE.replace(TITLE_PLACEHOLDER, &html_escape::encode_text(title))
}

impl Asset {
    pub fn to_response(self) -> Result<Response<Full<Bytes>>, http::Error> {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, self.content_type)
            .header(header::CACHE_CONTROL, ASSET_CACHE_CONTROL)
            .body(Full::new(Bytes::from_static(self.content.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_every_placeholder() {
        let page = render_index("Dev CA");
        assert!(!page.contains(TITLE_PLACEHOLDER));
        assert!(page.contains("<title>Dev CA</title>"));
        assert!(page.contains("<h1>Dev CA</h1>"));
    }

    #[test]
    fn test_render_escapes_title() {
        let page = render_index("<script>alert(1)</script> & co");
        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; co"));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("app.js").unwrap().content_type, "text/javascript; charset=utf-8");
        assert!(lookup("/style.css").unwrap().content.contains(":root"));
        assert_eq!(lookup("index.html").unwrap().content, INDEX_TEMPLATE);
        assert!(lookup("favicon.ico").is_none());
        assert!(lookup("../Cargo.toml").is_none());
    }
}
