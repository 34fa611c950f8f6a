//! Endpoint label resolution.
//!
//! The `endpoint` label must stay bounded: a route *template* such as
//! `/user/{id}`, never a raw path with interpolated identifiers. Resolution
//! is abstracted behind a trait so the metrics layers do not depend on any
//! particular router.

use axum::extract::MatchedPath;
use http::{Extensions, Uri};

/// Maps a request to its bounded-cardinality endpoint label.
pub trait EndpointResolver: Send + Sync {
    /// The matched route template, or the raw path when no route matched.
    fn endpoint(&self, extensions: &Extensions, uri: &Uri) -> String;
}

/// Default resolver backed by axum's [`MatchedPath`] request extension.
///
/// The extension is populated by the router during dispatch, so layers using
/// this resolver must be applied with `Router::layer` (after routing). The
/// raw-path fallback only fires for unmatched requests (404s), where the
/// cardinality cost is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchedPathResolver;

impl EndpointResolver for MatchedPathResolver {
    fn endpoint(&self, extensions: &Extensions, uri: &Uri) -> String {
        extensions
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_owned())
            .unwrap_or_else(|| uri.path().to_owned())
    }
}
