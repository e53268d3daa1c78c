//! Route storage and candidate recognition.
//!
//! The [`RouteTable`] maps each verb to its routes in registration order —
//! that order is the candidate-trial order and is preserved for the life of
//! the app. [`RouteTable::recognize`] returns *every* route matching a
//! verb+path, in order, because a route may later signal
//! [`Continue`](crate::handler::Outcome::Continue) and dispatch must know
//! what comes next.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::context::{Params, RequestContext};
use crate::handler::Respond;
use crate::http::{Method, Response, StatusCode};
use crate::route::Route;

/// No registered route matched the request's verb+path.
///
/// This is the one failure the core always renders itself: as a
/// [`Respond`] implementor it produces a 404 with an empty body.
#[derive(Debug, Error)]
#[error("no route matches {method} {path}")]
pub struct RouteNotFound {
    method: Method,
    path: String,
}

impl RouteNotFound {
    /// Creates the not-found value for a verb+path pair.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl Respond for RouteNotFound {
    fn respond(&self, _ctx: &RequestContext) -> Response {
        Response::new(StatusCode::NotFound)
    }
}

/// A recognized candidate: the route plus the captures its pattern
/// extracted from the path.
#[derive(Debug)]
pub struct RouteMatch {
    /// The matched route.
    pub route: Arc<Route>,
    /// Captures extracted by the route's pattern.
    pub params: Params,
}

/// Verb-indexed route storage, ordered per verb.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<Arc<Route>>>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route under its verb, preserving registration order.
    pub fn insert(&mut self, route: Route) {
        self.routes
            .entry(route.method().clone())
            .or_default()
            .push(Arc::new(route));
    }

    /// Total number of registered routes across all verbs.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Returns `true` if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.values().all(Vec::is_empty)
    }

    /// Returns every route matching `method` + `path`, in registration
    /// order, each paired with its captures.
    ///
    /// The empty path is normalized to `/`. Verb normalization happens
    /// where strings become [`Method`]s — the table compares verbs
    /// structurally.
    ///
    /// # Errors
    ///
    /// Returns [`RouteNotFound`] when no route matches.
    pub fn recognize(&self, method: &Method, path: &str) -> Result<Vec<RouteMatch>, RouteNotFound> {
        let path = if path.is_empty() { "/" } else { path };

        let matches: Vec<RouteMatch> = self
            .routes
            .get(method)
            .into_iter()
            .flatten()
            .filter_map(|route| {
                route.matches(path).map(|params| RouteMatch {
                    route: Arc::clone(route),
                    params,
                })
            })
            .collect();

        if matches.is_empty() {
            Err(RouteNotFound::new(method.clone(), path))
        } else {
            Ok(matches)
        }
    }
}
