//! # sendero
//!
//! A minimal async HTTP request-dispatch framework core: route patterns
//! compiled at registration, candidate recognition in registration order,
//! before/after filters sharing an isolated per-request context, a
//! middleware stack with deterministic wrap ordering and path-prefix
//! mounts, and configuration/middleware propagation across app derivation.
//!
//! The core owns no sockets. A hosting server parses the wire format,
//! constructs a [`Request`], and calls the built app; whatever comes back —
//! a [`Response`] or a propagated error — is the host's to encode and log.
//!
//! ## Quick Start
//!
//! ```rust
//! use sendero::{App, Request, RequestContext, Response, StatusCode};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut app = App::new();
//! app.get("/cats/:id", |ctx: RequestContext| async move {
//!     let id = ctx.params().get("id").unwrap_or("?").to_owned();
//!     Response::new(StatusCode::Ok).text(format!("cat {id}"))
//! });
//!
//! let app = app.build();
//! let response = app.call(Request::get("/cats/bob")).await.unwrap();
//! assert_eq!(response.into_body().as_ref(), b"cat bob");
//! # }
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod pattern;
pub mod route;
pub mod router;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use app::{App, BuiltApp};
pub use config::ConfigStore;
pub use context::{Params, RequestContext, StateBag};
pub use dispatch::Dispatcher;
pub use handler::{BoxError, Fault, Outcome, Respond};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use middleware::{Logger, Middleware, MiddlewareStack, Service};
pub use pattern::RoutePattern;
pub use router::RouteNotFound;
