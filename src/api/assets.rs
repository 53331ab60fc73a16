//! Static single-page UI bundle
//!
//! The bundle is a read-only file tree handed to the server at construction.
//! Production builds embed `web/` into the binary via `rust-embed`.

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use super::ApiState;

const INDEX_FILE: &str = "index.html";

/// Characters escaped when a path segment is echoed into a Location header
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Read-only virtual file tree, paths relative and `/`-separated
pub trait AssetBundle: Send + Sync {
    fn get(&self, path: &str) -> Option<Cow<'static, [u8]>>;
}

/// UI bundle baked into the binary
#[derive(RustEmbed)]
#[folder = "web/"]
pub struct WebAssets;

impl AssetBundle for WebAssets {
    fn get(&self, path: &str) -> Option<Cow<'static, [u8]>> {
        <WebAssets as RustEmbed>::get(path).map(|file| file.data)
    }
}

/// Bundle held in memory, for hosts that build their UI at runtime
#[derive(Debug, Default, Clone)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl AssetBundle for MemoryAssets {
    fn get(&self, path: &str) -> Option<Cow<'static, [u8]>> {
        self.files.get(path).map(|data| Cow::Owned(data.clone()))
    }
}

/// Fallback handler: serve the request path from the bundle
pub async fn serve_static(State(state): State<Arc<ApiState>>, uri: Uri) -> Response {
    serve_path(state.assets.as_ref(), uri.path())
}

/// File-server semantics over a bundle: percent-decoding, directory index,
/// content type by extension, relative canonical redirects and 404 for
/// anything missing
pub fn serve_path(bundle: &dyn AssetBundle, request_path: &str) -> Response {
    let Ok(decoded) = percent_decode_str(request_path).decode_utf8() else {
        return not_found();
    };

    // Empty and "." segments collapse, so "//host/x" is just "host/x"
    let segments: Vec<&str> = decoded
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.contains(&"..") {
        return (StatusCode::BAD_REQUEST, "invalid URL path").into_response();
    }

    let is_dir = segments.is_empty() || decoded.ends_with('/') || decoded.ends_with("/.");
    let relative = segments.join("/");

    // ".../index.html" is always addressed through its directory
    if !is_dir && segments.last() == Some(&INDEX_FILE) {
        return redirect("./".to_string());
    }

    let file = if relative.is_empty() {
        INDEX_FILE.to_string()
    } else if is_dir {
        format!("{}/{}", relative, INDEX_FILE)
    } else {
        relative.clone()
    };

    if let Some(data) = bundle.get(&file) {
        return ([(header::CONTENT_TYPE, content_type(&file))], data).into_response();
    }

    if let (false, Some(last)) = (is_dir, segments.last()) {
        if bundle.get(&format!("{}/{}", relative, INDEX_FILE)).is_some() {
            // Relative to the parent directory of the request
            return redirect(format!("./{}/", utf8_percent_encode(last, SEGMENT)));
        }
    }

    not_found()
}

fn content_type(path: &str) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT || mime.subtype() == mime_guess::mime::JAVASCRIPT {
        format!("{}; charset=utf-8", mime)
    } else {
        mime.to_string()
    }
}

fn redirect(location: String) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found").into_response()
}
