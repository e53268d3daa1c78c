//! App definitions: the registration phase and its sealed result.
//!
//! An [`App`] is the mutable definition of an application — routes,
//! filters, middleware, mounts, configuration, and the handler registry all
//! accumulate here. [`App::build`] consumes the definition and produces an
//! immutable [`BuiltApp`]; there is no way to register anything once
//! serving begins, because the definition no longer exists.
//!
//! Deriving ([`App::derive`]) creates a child definition that copies the
//! parent's middleware stack and a merged snapshot of its configuration at
//! that moment. Parent and child share nothing mutable afterwards: changes
//! to one never reach the other.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConfigStore;
use crate::dispatch::Dispatcher;
use crate::handler::registry::{Actions, DescriptorError, HandlerRegistry};
use crate::handler::{BoxError, BoxedFilter, BoxedHandler, Filter, Handler};
use crate::http::{Method, Request, Response};
use crate::middleware::{Middleware, MiddlewareStack, Service};
use crate::pattern::{IntoPattern, RoutePattern};
use crate::route::Route;
use crate::router::RouteTable;

// A route as registered, before filters are materialized onto it.
struct RouteDraft {
    method: Method,
    pattern: RoutePattern,
    name: Option<String>,
    handler: BoxedHandler,
}

// Filters registered so far: the global "all" bucket plus name-scoped
// buckets, each in registration order.
#[derive(Default)]
struct FilterTable {
    all: Vec<BoxedFilter>,
    named: HashMap<String, Vec<BoxedFilter>>,
}

impl FilterTable {
    fn add_all(&mut self, filter: BoxedFilter) {
        self.all.push(filter);
    }

    fn add_named(&mut self, name: String, filter: BoxedFilter) {
        self.named.entry(name).or_default().push(filter);
    }

    // The execution-ordered filter list for a route: all-bucket first, then
    // the route's own bucket.
    fn materialize(&self, name: Option<&str>) -> Vec<BoxedFilter> {
        let scoped = name
            .and_then(|n| self.named.get(n))
            .into_iter()
            .flatten()
            .cloned();
        self.all.iter().cloned().chain(scoped).collect()
    }
}

/// A mutable application definition.
///
/// # Examples
///
/// ```
/// use sendero::app::App;
/// use sendero::context::RequestContext;
/// use sendero::http::{Request, Response, StatusCode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut app = App::new();
/// app.get("/cats/:id", |ctx: RequestContext| async move {
///     let id = ctx.params().get("id").unwrap_or("?").to_owned();
///     Response::new(StatusCode::Ok).text(id)
/// });
///
/// let app = app.build();
/// let response = app.call(Request::get("/cats/bob")).await.unwrap();
/// assert_eq!(response.into_body().as_ref(), b"bob");
/// # }
/// ```
pub struct App {
    routes: Vec<RouteDraft>,
    before: FilterTable,
    after: FilterTable,
    stack: MiddlewareStack,
    config: ConfigStore,
    registry: HandlerRegistry,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates an empty definition.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            before: FilterTable::default(),
            after: FilterTable::default(),
            stack: MiddlewareStack::new(),
            config: ConfigStore::new(),
            registry: HandlerRegistry::new(),
        }
    }

    // ── routes ────────────────────────────────────────────────────────────

    /// Registers a route for any verb — the uniform entry point the verb
    /// helpers call through to.
    pub fn add(
        &mut self,
        method: Method,
        pattern: impl IntoPattern,
        handler: impl Handler,
    ) -> &mut Self {
        self.push_route(method, pattern, None, Arc::new(handler))
    }

    /// Like [`add`](Self::add), also naming the route so name-scoped
    /// filters apply to it.
    pub fn add_named(
        &mut self,
        method: Method,
        pattern: impl IntoPattern,
        name: impl Into<String>,
        handler: impl Handler,
    ) -> &mut Self {
        self.push_route(method, pattern, Some(name.into()), Arc::new(handler))
    }

    /// Registers a route whose handler is a `"target#action"` descriptor,
    /// resolved against the registry now.
    ///
    /// # Errors
    ///
    /// Unresolvable descriptors fail here, at registration — never at
    /// dispatch.
    pub fn add_action(
        &mut self,
        method: Method,
        pattern: impl IntoPattern,
        descriptor: &str,
    ) -> Result<&mut Self, DescriptorError> {
        let handler = self.registry.resolve(descriptor)?;
        Ok(self.push_route(method, pattern, None, handler))
    }

    /// Like [`add_action`](Self::add_action) with a route name attached.
    ///
    /// # Errors
    ///
    /// Unresolvable descriptors fail here, at registration.
    pub fn add_named_action(
        &mut self,
        method: Method,
        pattern: impl IntoPattern,
        name: impl Into<String>,
        descriptor: &str,
    ) -> Result<&mut Self, DescriptorError> {
        let handler = self.registry.resolve(descriptor)?;
        Ok(self.push_route(method, pattern, Some(name.into()), handler))
    }

    fn push_route(
        &mut self,
        method: Method,
        pattern: impl IntoPattern,
        name: Option<String>,
        handler: BoxedHandler,
    ) -> &mut Self {
        self.routes.push(RouteDraft {
            method,
            pattern: pattern.into_pattern(),
            name,
            handler,
        });
        self
    }

    /// Registers a `GET` route.
    pub fn get(&mut self, pattern: impl IntoPattern, handler: impl Handler) -> &mut Self {
        self.add(Method::Get, pattern, handler)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, pattern: impl IntoPattern, handler: impl Handler) -> &mut Self {
        self.add(Method::Post, pattern, handler)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, pattern: impl IntoPattern, handler: impl Handler) -> &mut Self {
        self.add(Method::Put, pattern, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, pattern: impl IntoPattern, handler: impl Handler) -> &mut Self {
        self.add(Method::Delete, pattern, handler)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&mut self, pattern: impl IntoPattern, handler: impl Handler) -> &mut Self {
        self.add(Method::Patch, pattern, handler)
    }

    /// Registers an `OPTIONS` route.
    pub fn options(&mut self, pattern: impl IntoPattern, handler: impl Handler) -> &mut Self {
        self.add(Method::Options, pattern, handler)
    }

    /// Registers a `HEAD` route.
    pub fn head(&mut self, pattern: impl IntoPattern, handler: impl Handler) -> &mut Self {
        self.add(Method::Head, pattern, handler)
    }

    // ── filters ───────────────────────────────────────────────────────────

    /// Adds a before-filter to the global bucket — it runs ahead of every
    /// route's handler.
    pub fn before(&mut self, filter: impl Filter) -> &mut Self {
        self.before.add_all(Arc::new(filter));
        self
    }

    /// Adds a before-filter scoped to the given route names.
    pub fn before_named<I, S>(&mut self, names: I, filter: impl Filter) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter: BoxedFilter = Arc::new(filter);
        for name in names {
            self.before.add_named(name.into(), Arc::clone(&filter));
        }
        self
    }

    /// Adds an after-filter to the global bucket.
    pub fn after(&mut self, filter: impl Filter) -> &mut Self {
        self.after.add_all(Arc::new(filter));
        self
    }

    /// Adds an after-filter scoped to the given route names.
    pub fn after_named<I, S>(&mut self, names: I, filter: impl Filter) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter: BoxedFilter = Arc::new(filter);
        for name in names {
            self.after.add_named(name.into(), Arc::clone(&filter));
        }
        self
    }

    // ── middleware, mounts, config, registry ──────────────────────────────

    /// Appends a middleware to the stack.
    pub fn with(&mut self, middleware: impl Middleware) -> &mut Self {
        self.stack.push(middleware);
        self
    }

    /// Mounts a built sub-app under a path prefix. The sub-app sees paths
    /// relative to its mount point.
    pub fn mount(&mut self, prefix: impl Into<String>, sub_app: BuiltApp) -> &mut Self {
        self.stack.mount(prefix, sub_app.into_service());
        self
    }

    /// Mounts a raw [`Service`] under a path prefix.
    pub fn mount_service(&mut self, prefix: impl Into<String>, service: Service) -> &mut Self {
        self.stack.mount(prefix, service);
        self
    }

    /// Sets a configuration value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> &mut Self {
        self.config.set(key, value);
        self
    }

    /// Read access to the configuration accumulated so far.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Read access to the middleware stack accumulated so far.
    pub fn middleware(&self) -> &MiddlewareStack {
        &self.stack
    }

    /// Registers a named group of actions for `"target#action"` handler
    /// descriptors. Must precede the routes that reference it.
    pub fn actions(&mut self, target: impl Into<String>, actions: impl Actions) -> &mut Self {
        self.registry.register(target, actions);
        self
    }

    // ── derivation and sealing ────────────────────────────────────────────

    /// Derives a child definition from this one.
    ///
    /// The child receives a copy of the current middleware stack (entries
    /// and mounts) and a merged copy of the current configuration. Later
    /// changes to either definition do not affect the other. Routes,
    /// filters, and the handler registry are not inherited.
    pub fn derive(&self) -> App {
        let mut child = App::new();
        child.stack = self.stack.clone();
        child.config.merge_from(&self.config);
        child
    }

    /// Seals the definition into an immutable, dispatchable [`BuiltApp`].
    ///
    /// Filters are materialized onto their routes here — the global bucket
    /// ahead of name-scoped entries, each in registration order — and the
    /// middleware stack is assembled around the dispatcher with
    /// first-registered outermost.
    pub fn build(self) -> BuiltApp {
        let App {
            routes,
            before,
            after,
            stack,
            config,
            registry: _,
        } = self;

        let mut table = RouteTable::new();
        for draft in routes {
            let before_filters = before.materialize(draft.name.as_deref());
            let after_filters = after.materialize(draft.name.as_deref());
            table.insert(Route::new(
                draft.method,
                draft.pattern,
                draft.name,
                draft.handler,
                before_filters,
                after_filters,
            ));
        }

        let dispatcher = Dispatcher::new(Arc::new(table), Arc::new(config));
        let terminal: Service = Arc::new(move |request| {
            let dispatcher = dispatcher.clone();
            Box::pin(async move { dispatcher.dispatch(request).await })
        });

        BuiltApp {
            service: stack.assemble(terminal),
        }
    }
}

/// A sealed, immutable application.
///
/// Cheap to clone (all clones dispatch through the same sealed state) and
/// safe to call from any number of tasks concurrently.
#[derive(Clone)]
pub struct BuiltApp {
    service: Service,
}

impl BuiltApp {
    /// Dispatches one request through middleware, mounts, and routes.
    ///
    /// # Errors
    ///
    /// Propagates faults the dispatcher did not recover — the hosting
    /// server decides what to do with them.
    pub async fn call(&self, request: Request) -> Result<Response, BoxError> {
        (self.service)(request).await
    }

    /// Returns the underlying service, e.g. to mount this app inside
    /// another.
    pub fn into_service(self) -> Service {
        self.service
    }
}
