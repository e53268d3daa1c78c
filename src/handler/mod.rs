//! Handlers, filters, and the typed results they produce.
//!
//! ## Core types
//!
//! - [`Outcome`] — what a route produces: a finished [`Response`], or
//!   [`Continue`](Outcome::Continue) to defer to the next candidate route.
//!   Continue is a control signal, not an error, and travels on its own
//!   channel.
//! - [`Fault`] — an error raised inside a filter or handler. A fault may
//!   carry a responder; the dispatcher recovers such faults in-core by
//!   invoking it, and propagates all others to the hosting server.
//! - [`Handler`] / [`Filter`] — the async callable traits. Blanket impls
//!   cover any `Fn(RequestContext) -> Future` whose output converts via
//!   [`IntoOutcome`] / [`IntoFilterOutcome`], so plain async closures work
//!   without ceremony.

pub mod registry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::context::RequestContext;
use crate::http::{Response, StatusCode};

/// A type-erased error suitable for crossing the framework boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a filter or handler decided about the current request.
#[derive(Debug)]
pub enum Outcome {
    /// A finished response; dispatch ends with it.
    Response(Response),
    /// Defer to the next candidate route.
    Continue,
}

/// A value that can render a [`Response`] for the request that raised it.
///
/// Implemented by [`RouteNotFound`](crate::router::RouteNotFound) and by the
/// responder a [`Fault`] may carry. This is the capability the dispatcher
/// probes for when deciding whether an error recovers in-core.
pub trait Respond: Send + Sync {
    /// Produce the response for the dispatching request.
    fn respond(&self, ctx: &RequestContext) -> Response;
}

impl std::fmt::Debug for dyn Respond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<respond>")
    }
}

/// An error raised inside a filter or handler during dispatch.
///
/// Any `std::error::Error` converts into a fault with `?`, producing a
/// plain propagating fault. Constructors like [`halt`](Self::halt) attach a
/// responder so the dispatcher turns the fault into a response instead —
/// the typed-HTTP-error path (an authorization filter failing with
/// `Fault::halt(StatusCode::Forbidden)` renders as a 403).
///
/// # Examples
///
/// ```
/// use sendero::handler::Fault;
/// use sendero::http::StatusCode;
///
/// let fault = Fault::halt(StatusCode::Unauthorized);
/// assert!(fault.is_recoverable());
///
/// let fault: Fault = std::io::Error::other("disk gone").into();
/// assert!(!fault.is_recoverable());
/// ```
pub struct Fault {
    source: BoxError,
    responder: Option<Box<dyn Respond>>,
}

// The error behind halt-style faults.
#[derive(Debug, Clone, Error)]
#[error("dispatch halted with {status}")]
struct Halted {
    status: StatusCode,
    body: Option<String>,
}

impl Respond for Halted {
    fn respond(&self, _ctx: &RequestContext) -> Response {
        match &self.body {
            Some(body) => Response::new(self.status).text(body.clone()),
            None => Response::new(self.status),
        }
    }
}

impl Fault {
    /// Wraps an error as a plain propagating fault.
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
            responder: None,
        }
    }

    /// Attaches a responder to an error, making the fault recoverable.
    pub fn with_responder(
        source: impl Into<BoxError>,
        responder: impl Respond + 'static,
    ) -> Self {
        Self {
            source: source.into(),
            responder: Some(Box::new(responder)),
        }
    }

    /// A recoverable fault rendering as `status` with an empty body.
    pub fn halt(status: StatusCode) -> Self {
        let halted = Halted { status, body: None };
        Self::with_responder(halted.clone(), halted)
    }

    /// A recoverable fault rendering as `status` with the given body.
    pub fn halt_with(status: StatusCode, body: impl Into<String>) -> Self {
        let halted = Halted {
            status,
            body: Some(body.into()),
        };
        Self::with_responder(halted.clone(), halted)
    }

    /// Returns `true` when the dispatcher will turn this fault into a
    /// response instead of propagating it.
    pub fn is_recoverable(&self) -> bool {
        self.responder.is_some()
    }

    /// Splits the fault into its recovery responder, or the source error to
    /// propagate when no responder is attached.
    pub fn into_recovery(self) -> Result<Box<dyn Respond>, BoxError> {
        match self.responder {
            Some(responder) => Ok(responder),
            None => Err(self.source),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("source", &self.source)
            .field("recoverable", &self.responder.is_some())
            .finish()
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Fault {
    fn from(source: E) -> Self {
        Self::new(source)
    }
}

/// Conversion from handler return values into the dispatch result channel.
pub trait IntoOutcome {
    /// Convert into `Result<Outcome, Fault>`.
    fn into_outcome(self) -> Result<Outcome, Fault>;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Result<Outcome, Fault> {
        Ok(self)
    }
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Result<Outcome, Fault> {
        Ok(Outcome::Response(self))
    }
}

impl IntoOutcome for StatusCode {
    fn into_outcome(self) -> Result<Outcome, Fault> {
        Ok(Outcome::Response(Response::new(self)))
    }
}

impl<T: IntoOutcome> IntoOutcome for Result<T, Fault> {
    fn into_outcome(self) -> Result<Outcome, Fault> {
        self.and_then(IntoOutcome::into_outcome)
    }
}

/// Conversion from filter return values.
///
/// `None` means "proceed with this route"; `Some(Outcome)` short-circuits
/// it — `Continue` defers to the next candidate, a `Response` halts.
pub trait IntoFilterOutcome {
    /// Convert into `Result<Option<Outcome>, Fault>`.
    fn into_filter_outcome(self) -> Result<Option<Outcome>, Fault>;
}

impl IntoFilterOutcome for () {
    fn into_filter_outcome(self) -> Result<Option<Outcome>, Fault> {
        Ok(None)
    }
}

impl IntoFilterOutcome for Outcome {
    fn into_filter_outcome(self) -> Result<Option<Outcome>, Fault> {
        Ok(Some(self))
    }
}

impl IntoFilterOutcome for Response {
    fn into_filter_outcome(self) -> Result<Option<Outcome>, Fault> {
        Ok(Some(Outcome::Response(self)))
    }
}

impl<T: IntoFilterOutcome> IntoFilterOutcome for Result<T, Fault> {
    fn into_filter_outcome(self) -> Result<Option<Outcome>, Fault> {
        self.and_then(IntoFilterOutcome::into_filter_outcome)
    }
}

/// Boxed future returned by handler invocations.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Outcome, Fault>> + Send>>;

/// Boxed future returned by filter invocations.
pub type FilterFuture = Pin<Box<dyn Future<Output = Result<Option<Outcome>, Fault>> + Send>>;

/// An async route handler.
///
/// Implemented for any `Fn(RequestContext) -> Future` whose output converts
/// via [`IntoOutcome`], so the usual form is a closure:
///
/// ```
/// use sendero::context::RequestContext;
/// use sendero::handler::Handler;
/// use sendero::http::{Response, StatusCode};
///
/// fn takes_handler(_h: impl Handler) {}
///
/// takes_handler(|_ctx: RequestContext| async {
///     Response::new(StatusCode::Ok).text("hello")
/// });
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Invoke the handler, boxing the returned future.
    fn call(&self, ctx: RequestContext) -> HandlerFuture;
}

impl<T, F, O> Handler for T
where
    T: Fn(RequestContext) -> F + Send + Sync + 'static,
    F: Future<Output = O> + Send + 'static,
    O: IntoOutcome,
{
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        let fut = (self)(ctx);
        Box::pin(async move { fut.await.into_outcome() })
    }
}

/// A type-erased, shareable handler.
pub type BoxedHandler = Arc<dyn Handler>;

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<handler>")
    }
}

/// An async before/after filter.
///
/// Filters returning `()` simply proceed; see [`IntoFilterOutcome`].
pub trait Filter: Send + Sync + 'static {
    /// Invoke the filter, boxing the returned future.
    fn call(&self, ctx: RequestContext) -> FilterFuture;
}

impl<T, F, O> Filter for T
where
    T: Fn(RequestContext) -> F + Send + Sync + 'static,
    F: Future<Output = O> + Send + 'static,
    O: IntoFilterOutcome,
{
    fn call(&self, ctx: RequestContext) -> FilterFuture {
        let fut = (self)(ctx);
        Box::pin(async move { fut.await.into_filter_outcome() })
    }
}

/// A type-erased, shareable filter.
pub type BoxedFilter = Arc<dyn Filter>;
