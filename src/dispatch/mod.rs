//! Per-request orchestration.
//!
//! The [`Dispatcher`] owns the app's immutable route table and
//! configuration and runs one request at a time through them: it allocates
//! the isolated [`RequestContext`], asks the route table for candidates,
//! trials them in order honoring [`Continue`](Outcome::Continue), and
//! applies the single in-core recovery rule — a [`Fault`](crate::handler::Fault)
//! carrying a responder becomes that responder's response, everything else
//! propagates to the hosting server untouched.

use std::sync::Arc;

use crate::config::ConfigStore;
use crate::context::RequestContext;
use crate::handler::{BoxError, Outcome, Respond};
use crate::http::{Request, Response};
use crate::router::{RouteNotFound, RouteTable};

/// Executes dispatches against a sealed route table and configuration.
///
/// Cloning a dispatcher clones reference handles; all clones share the same
/// immutable table. When the `lock` configuration key was `true` at
/// construction, dispatches through this dispatcher (and its clones) are
/// serialized by an async mutex.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    config: Arc<ConfigStore>,
    lock: Option<Arc<tokio::sync::Mutex<()>>>,
}

impl Dispatcher {
    /// Creates a dispatcher over a sealed route table and configuration.
    pub fn new(routes: Arc<RouteTable>, config: Arc<ConfigStore>) -> Self {
        let lock = config
            .get_bool("lock")
            .unwrap_or(false)
            .then(|| Arc::new(tokio::sync::Mutex::new(())));
        Self {
            routes,
            config,
            lock,
        }
    }

    /// Dispatches one request to a response.
    ///
    /// A fresh, isolated context is allocated before any filter or handler
    /// runs; nothing mutable is shared with any other dispatch. Candidate
    /// routes are trialed in registration order: the first response ends
    /// the dispatch, a Continue advances to the next candidate, and
    /// exhaustion renders the same 404 as having no candidates at all.
    ///
    /// # Errors
    ///
    /// Faults without a responder propagate as the boxed source error;
    /// the core performs no blanket catch-all.
    pub async fn dispatch(&self, request: Request) -> Result<Response, BoxError> {
        let _serial = match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let request = Arc::new(request);
        let ctx = RequestContext::new(Arc::clone(&request), Arc::clone(&self.config));

        tracing::debug!(method = %request.method(), path = %request.path(), "dispatching");

        let candidates = match self.routes.recognize(request.method(), request.path()) {
            Ok(candidates) => candidates,
            Err(not_found) => {
                tracing::debug!(%not_found, "no matching route");
                return Ok(not_found.respond(&ctx));
            }
        };

        for candidate in candidates {
            let view = ctx.for_route(candidate.params);
            match candidate.route.execute(view).await {
                Ok(Outcome::Response(response)) => return Ok(response),
                Ok(Outcome::Continue) => continue,
                Err(fault) => {
                    return match fault.into_recovery() {
                        Ok(responder) => Ok(responder.respond(&ctx)),
                        Err(source) => Err(source),
                    };
                }
            }
        }

        let not_found = RouteNotFound::new(request.method().clone(), request.path());
        tracing::debug!(%not_found, "candidates exhausted");
        Ok(not_found.respond(&ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxedHandler, Fault};
    use crate::http::{Method, StatusCode};
    use crate::pattern::RoutePattern;
    use crate::route::Route;

    fn plain_route(spec: &str, handler: BoxedHandler) -> Route {
        Route::new(
            Method::Get,
            RoutePattern::compile(spec),
            None,
            handler,
            vec![],
            vec![],
        )
    }

    fn dispatcher(routes: Vec<Route>) -> Dispatcher {
        let mut table = RouteTable::new();
        for route in routes {
            table.insert(route);
        }
        Dispatcher::new(Arc::new(table), Arc::new(ConfigStore::new()))
    }

    #[tokio::test]
    async fn first_response_wins() {
        let d = dispatcher(vec![
            plain_route(
                "/a",
                Arc::new(|_ctx: RequestContext| async {
                    Response::new(StatusCode::Ok).text("first")
                }),
            ),
            plain_route(
                "/a",
                Arc::new(|_ctx: RequestContext| async {
                    Response::new(StatusCode::Ok).text("second")
                }),
            ),
        ]);
        let response = d.dispatch(Request::get("/a")).await.unwrap();
        assert_eq!(response.into_body().as_ref(), b"first");
    }

    #[tokio::test]
    async fn continue_advances_to_next_candidate() {
        let d = dispatcher(vec![
            plain_route(
                "/a",
                Arc::new(|_ctx: RequestContext| async { Outcome::Continue }),
            ),
            plain_route(
                "/a",
                Arc::new(|_ctx: RequestContext| async {
                    Response::new(StatusCode::Ok).text("second")
                }),
            ),
        ]);
        let response = d.dispatch(Request::get("/a")).await.unwrap();
        assert_eq!(response.into_body().as_ref(), b"second");
    }

    #[tokio::test]
    async fn no_route_renders_empty_404() {
        let d = dispatcher(vec![]);
        let response = d.dispatch(Request::get("/does-not-exist")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(response.content_length(), 0);
    }

    #[tokio::test]
    async fn exhausted_candidates_render_404() {
        let d = dispatcher(vec![plain_route(
            "/a",
            Arc::new(|_ctx: RequestContext| async { Outcome::Continue }),
        )]);
        let response = d.dispatch(Request::get("/a")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn recoverable_fault_renders_its_response() {
        let d = dispatcher(vec![plain_route(
            "/private",
            Arc::new(|_ctx: RequestContext| async {
                Err::<Response, Fault>(Fault::halt(StatusCode::Forbidden))
            }),
        )]);
        let response = d.dispatch(Request::get("/private")).await.unwrap();
        assert_eq!(response.status(), StatusCode::Forbidden);
    }

    #[tokio::test]
    async fn unrecoverable_fault_propagates() {
        let d = dispatcher(vec![plain_route(
            "/broken",
            Arc::new(|_ctx: RequestContext| async {
                Err::<Response, Fault>(Fault::new(std::io::Error::other("backend down")))
            }),
        )]);
        let err = d.dispatch(Request::get("/broken")).await.unwrap_err();
        assert_eq!(err.to_string(), "backend down");
    }

    #[tokio::test]
    async fn dispatches_do_not_share_state() {
        // a handler that counts how many markers this *request* has seen
        let handler: BoxedHandler = Arc::new(|ctx: RequestContext| async move {
            let count = ctx.fetch::<u32>().unwrap_or(0) + 1;
            ctx.insert(count);
            Response::new(StatusCode::Ok).text(count.to_string())
        });
        let d = dispatcher(vec![plain_route("/counted", handler)]);

        let first = d.dispatch(Request::get("/counted")).await.unwrap();
        let second = d.dispatch(Request::get("/counted")).await.unwrap();
        assert_eq!(first.into_body().as_ref(), b"1");
        assert_eq!(second.into_body().as_ref(), b"1");
    }

    #[tokio::test]
    async fn lock_setting_serializes_but_still_dispatches() {
        let mut table = RouteTable::new();
        table.insert(plain_route(
            "/",
            Arc::new(|_ctx: RequestContext| async { Response::new(StatusCode::Ok) }),
        ));
        let mut config = ConfigStore::new();
        config.set("lock", true);
        let d = Dispatcher::new(Arc::new(table), Arc::new(config));

        let (a, b) = tokio::join!(d.dispatch(Request::get("/")), d.dispatch(Request::get("/")));
        assert_eq!(a.unwrap().status(), StatusCode::Ok);
        assert_eq!(b.unwrap().status(), StatusCode::Ok);
    }
}
