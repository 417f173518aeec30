//! Path segment helpers shared by the gate and the route table.
//!
//! # Design Decisions
//! - Only the first path segment selects a module
//! - Matching is case-sensitive and exact; no regex
//! - Prefix stripping keeps the query string intact

use axum::http::Uri;

/// First segment of `path` with leading slashes removed. `"/"` yields `""`.
pub fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}

/// Rewrite `uri` with its leading `/{segment}` removed.
///
/// Leading slashes are collapsed the same way `first_segment` skips them.
/// Returns `None` when the path does not start with that exact segment.
pub fn strip_segment(uri: &Uri, segment: &str) -> Option<Uri> {
    let rest = uri.path().trim_start_matches('/').strip_prefix(segment)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let rest = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match uri.query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}
