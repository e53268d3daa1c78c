//! Middleware composition with deterministic wrap ordering.
//!
//! A middleware is a wrap function: it receives the next [`Service`] and
//! returns a new one adding pre/post behavior. The [`MiddlewareStack`]
//! composes an ordered list of them around a terminal app so that the
//! **first-registered middleware is the outermost wrapper** — it sees the
//! request first and the response last. For a stack `[M1, M2]` the
//! assembled service behaves as `M1(M2(terminal))`.
//!
//! Stacks may also carry path-prefix mounts; see [`MiddlewareStack::mount`]
//! and the [`mount`] module for the longest-prefix selection rules.

pub mod mount;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::time::Instant;

use crate::handler::BoxError;
use crate::http::{Request, Response};

/// A type-erased, shareable request service: the unit middleware wraps and
/// the shape of a fully assembled app.
///
/// Errors flow through the service type so middleware can observe them on
/// the way out; the core never converts them to responses here.
pub type Service = Arc<
    dyn Fn(Request) -> Pin<Box<dyn Future<Output = Result<Response, BoxError>> + Send>>
        + Send
        + Sync
        + 'static,
>;

/// Builds a [`Service`] from an async closure.
///
/// # Examples
///
/// ```
/// use sendero::middleware::service;
/// use sendero::http::{Request, Response, StatusCode};
///
/// let terminal = service(|_request: Request| async {
///     Ok(Response::new(StatusCode::Ok).text("terminal"))
/// });
/// ```
pub fn service<H, F>(handler: H) -> Service
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(handler(request)))
}

/// A request-wrapping middleware.
///
/// Implementors receive the next service in the chain and return a new
/// service. Any `Fn(Service) -> Service` closure implements this trait, so
/// quick middleware need no named type.
pub trait Middleware: Send + Sync + 'static {
    /// Wrap `next`, returning the new outer service.
    fn wrap(&self, next: Service) -> Service;
}

impl<F> Middleware for F
where
    F: Fn(Service) -> Service + Send + Sync + 'static,
{
    fn wrap(&self, next: Service) -> Service {
        (self)(next)
    }
}

/// An ordered middleware list plus optional path-prefix mounts.
///
/// Registration happens during the app-definition phase;
/// [`assemble`](Self::assemble) is pure — it borrows the stack, mutates
/// nothing, and can be called repeatedly with the same result.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    entries: Vec<Arc<dyn Middleware>>,
    mounts: Vec<(String, Service)>,
}

impl MiddlewareStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one middleware.
    pub fn push(&mut self, middleware: impl Middleware) {
        self.entries.push(Arc::new(middleware));
    }

    /// Bulk-appends middleware entries — the path by which a derived app
    /// copies its parent's list without re-deriving each entry.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = Arc<dyn Middleware>>) {
        self.entries.extend(entries);
    }

    /// The registered middleware entries, in registration order.
    pub fn entries(&self) -> &[Arc<dyn Middleware>] {
        &self.entries
    }

    /// Registers a nested service under a path prefix.
    pub fn mount(&mut self, prefix: impl Into<String>, service: Service) {
        self.mounts.push((prefix.into(), service));
    }

    /// Number of registered middleware entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no middleware is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Composes the final service around `terminal`.
    ///
    /// With mounts present, a longest-prefix path dispatcher becomes the
    /// innermost service, with `terminal` registered under `/` so unmatched
    /// paths fall through to it. The middleware list then wraps that,
    /// folded so the first-registered entry is outermost.
    pub fn assemble(&self, terminal: Service) -> Service {
        let inner = if self.mounts.is_empty() {
            terminal
        } else {
            let mut map = self.mounts.clone();
            map.push(("/".to_owned(), terminal));
            mount::prefix_map(map)
        };

        self.entries
            .iter()
            .rev()
            .fold(inner, |next, middleware| middleware.wrap(next))
    }
}

impl std::fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareStack")
            .field("middleware", &self.entries.len())
            .field("mounts", &self.mounts.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .finish()
    }
}

/// Built-in middleware logging one line per request: method, path, status,
/// and duration, via `tracing`.
///
/// `Logger` never short-circuits; it delegates and reports what came back,
/// errors included.
pub struct Logger;

impl Middleware for Logger {
    fn wrap(&self, next: Service) -> Service {
        Arc::new(move |request: Request| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let start = Instant::now();
                let method = request.method().to_string();
                let path = request.path().to_string();

                let result = next(request).await;
                let elapsed = start.elapsed();

                match &result {
                    Ok(response) => tracing::info!(
                        "{} {} - {} ({:?})",
                        method,
                        path,
                        response.status().as_u16(),
                        elapsed
                    ),
                    Err(error) => {
                        tracing::error!("{} {} - failed: {} ({:?})", method, path, error, elapsed);
                    }
                }
                result
            })
        })
    }
}
