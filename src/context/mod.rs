//! Per-request execution context.
//!
//! A [`RequestContext`] is allocated at the start of every dispatch and is
//! the one mutable thing a request owns: filters and the handler share its
//! state bag, while the request, route table, and configuration it points at
//! are immutable and shared across all in-flight requests. Cloning a context
//! copies a reference set, not the underlying data, so the dispatcher can
//! hand each candidate route its own view cheaply.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::config::ConfigStore;
use crate::http::Request;

/// Named captures extracted by a route pattern, in capture order.
///
/// Backed by a vector so capture order is preserved and repeated names
/// (multiple `*` wildcards) keep every value.
///
/// # Examples
///
/// ```
/// use sendero::context::Params;
///
/// let mut params = Params::new();
/// params.push("id", "42");
/// params.push("wildcard", "/a");
/// params.push("wildcard", "/b");
///
/// assert_eq!(params.get("id"), Some("42"));
/// let all: Vec<_> = params.get_all("wildcard").collect();
/// assert_eq!(all, vec!["/a", "/b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    /// Creates an empty capture map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a capture.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the first capture named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every capture named `name`, in capture order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of captures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no captures were extracted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Type-erased per-request state shared by a request's filters and handler.
///
/// The bag plays the role of handler-visible "instance variables": a before
/// filter can stash an authenticated principal, the handler reads it back by
/// type. Each dispatch gets a fresh bag; two requests never share one.
#[derive(Default)]
pub struct StateBag {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl StateBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a reference to the stored `T`, if present.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns a mutable reference to the stored `T`, if present.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut::<T>())
    }

    /// Removes and returns the stored `T`, if present.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

/// The execution context for one dispatched request.
///
/// Holds the immutable request and configuration behind `Arc`s, the captures
/// of the route currently executing, and the request's shared mutable
/// [`StateBag`]. Filters and the handler all receive clones of the same
/// context, so writes to the bag are visible across them — and invisible to
/// every other request.
#[derive(Clone)]
pub struct RequestContext {
    request: Arc<Request>,
    params: Params,
    state: Arc<Mutex<StateBag>>,
    config: Arc<ConfigStore>,
}

impl RequestContext {
    /// Creates the base context for a dispatch, with a fresh state bag and
    /// no captures.
    pub fn new(request: Arc<Request>, config: Arc<ConfigStore>) -> Self {
        Self {
            request,
            params: Params::new(),
            state: Arc::new(Mutex::new(StateBag::new())),
            config,
        }
    }

    // A view of this context for one candidate route: same request, same
    // bag, that route's captures.
    pub(crate) fn for_route(&self, params: Params) -> Self {
        Self {
            request: Arc::clone(&self.request),
            params,
            state: Arc::clone(&self.state),
            config: Arc::clone(&self.config),
        }
    }

    /// Returns the request being dispatched.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the captures of the route currently executing.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the app's configuration.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Runs `f` with exclusive access to the request's state bag.
    ///
    /// The lock is released when `f` returns; it is never held across an
    /// await point by the framework itself.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut StateBag) -> R) -> R {
        let mut bag = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut bag)
    }

    /// Stores a value in the state bag.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.with_state(|bag| bag.insert(value));
    }

    /// Clones a value out of the state bag, if present.
    pub fn fetch<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.with_state(|bag| bag.get::<T>().cloned())
    }

    /// Removes and returns a value from the state bag, if present.
    pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
        self.with_state(|bag| bag.remove::<T>())
    }

    /// Deserializes the request body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.request.body_bytes())
    }
}
