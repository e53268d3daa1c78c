//! Longest-prefix dispatch over mounted services.
//!
//! A mount map binds path prefixes to nested services. Selection prefers
//! the longest matching prefix; prefixes match only at path-segment
//! boundaries, so a mount at `/users` serves `/users` and `/users/5` but
//! not `/usersX`. The matched prefix is stripped from the path the mounted
//! service sees (an empty remainder becomes `/`), leaving the mounted app
//! to route relative to its mount point.

use std::sync::Arc;

use crate::http::{Request, Response, StatusCode};

use super::{Service, service};

/// Builds the path dispatcher over `entries`.
///
/// Sorting is by prefix length, longest first; entries of equal length keep
/// their registration order, so an explicitly mounted `/` takes precedence
/// over the implicitly appended terminal.
pub(crate) fn prefix_map(mut entries: Vec<(String, Service)>) -> Service {
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    let fallback = service(|_request: Request| async { Ok(Response::new(StatusCode::NotFound)) });

    Arc::new(move |request: Request| {
        let selected = entries
            .iter()
            .find(|(prefix, _)| prefix_matches(prefix, request.path()));

        match selected {
            Some((prefix, nested)) => {
                let remainder = strip_prefix(prefix, request.path());
                nested(request.rebase(remainder))
            }
            None => fallback(request),
        }
    })
}

// `/` matches everything; other prefixes match exactly or at a `/` boundary.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

// The path as the mounted service should see it.
fn strip_prefix(prefix: &str, path: &str) -> String {
    if prefix == "/" {
        return path.to_owned();
    }
    let rest = path.strip_prefix(prefix).unwrap_or(path);
    if rest.is_empty() {
        "/".to_owned()
    } else {
        rest.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::service;

    // A service that answers with its tag and the path it was asked for.
    fn echo(tag: &'static str) -> Service {
        service(move |request: Request| async move {
            Ok(Response::new(StatusCode::Ok).text(format!("{tag}:{}", request.path())))
        })
    }

    async fn body_of(app: &Service, target: &str) -> String {
        let response = app(Request::get(target)).await.unwrap();
        String::from_utf8(response.into_body().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn selects_by_prefix_and_strips_it() {
        let app = prefix_map(vec![
            ("/users".to_owned(), echo("users")),
            ("/".to_owned(), echo("default")),
        ]);
        assert_eq!(body_of(&app, "/users/5").await, "users:/5");
        assert_eq!(body_of(&app, "/other").await, "default:/other");
    }

    #[tokio::test]
    async fn exact_prefix_hit_becomes_root() {
        let app = prefix_map(vec![
            ("/users".to_owned(), echo("users")),
            ("/".to_owned(), echo("default")),
        ]);
        assert_eq!(body_of(&app, "/users").await, "users:/");
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let app = prefix_map(vec![
            ("/api".to_owned(), echo("api")),
            ("/api/v2".to_owned(), echo("v2")),
            ("/".to_owned(), echo("default")),
        ]);
        assert_eq!(body_of(&app, "/api/v2/users").await, "v2:/users");
        assert_eq!(body_of(&app, "/api/v1/users").await, "api:/v1/users");
    }

    #[tokio::test]
    async fn prefixes_match_only_at_segment_boundaries() {
        let app = prefix_map(vec![
            ("/users".to_owned(), echo("users")),
            ("/".to_owned(), echo("default")),
        ]);
        assert_eq!(body_of(&app, "/usersX").await, "default:/usersX");
    }

    #[tokio::test]
    async fn no_default_and_no_match_is_404() {
        let app = prefix_map(vec![("/users".to_owned(), echo("users"))]);
        let response = app(Request::get("/other")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn query_survives_rebasing() {
        let app = prefix_map(vec![("/users".to_owned(), echo("users"))]);
        let response = app(Request::get("/users/5?full=1")).await.unwrap();
        // the mounted service still sees the original query parameters
        assert_eq!(
            String::from_utf8(response.into_body().to_vec()).unwrap(),
            "users:/5"
        );
    }
}
