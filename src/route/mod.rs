//! A registered route and its execution sequence.
//!
//! A [`Route`] binds a verb, a compiled pattern, a handler, and the ordered
//! before/after filters that apply to it. Routes are built when the app
//! definition is sealed and never change afterwards; execution works on a
//! per-request [`RequestContext`] clone, so routes themselves carry no
//! request state.

use crate::context::{Params, RequestContext};
use crate::handler::{BoxedFilter, BoxedHandler, Fault, Outcome};
use crate::http::Method;
use crate::pattern::RoutePattern;

/// One dispatchable route.
pub struct Route {
    method: Method,
    pattern: RoutePattern,
    name: Option<String>,
    handler: BoxedHandler,
    before: Vec<BoxedFilter>,
    after: Vec<BoxedFilter>,
}

impl Route {
    /// Creates a route with its filters already materialized in execution
    /// order (all-bucket entries first, then name-scoped ones).
    pub fn new(
        method: Method,
        pattern: RoutePattern,
        name: Option<String>,
        handler: BoxedHandler,
        before: Vec<BoxedFilter>,
        after: Vec<BoxedFilter>,
    ) -> Self {
        Self {
            method,
            pattern,
            name,
            handler,
            before,
            after,
        }
    }

    /// The verb this route answers to.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// The route's name, when registered with one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Matches `path` against this route's pattern.
    pub fn matches(&self, path: &str) -> Option<Params> {
        self.pattern.matches(path)
    }

    /// Runs this route against a request context.
    ///
    /// The sequence: before-filters in order, then the handler, then
    /// after-filters in order. A filter signaling
    /// [`Continue`](Outcome::Continue) aborts the route immediately — the
    /// handler and after-filters are skipped and Continue is reported to
    /// the dispatcher. A filter producing a response halts: the handler is
    /// skipped but after-filters still run. A handler-signaled Continue
    /// also runs after-filters before reporting. An after-filter producing
    /// a response replaces the pending one; faults propagate from any step.
    pub async fn execute(&self, ctx: RequestContext) -> Result<Outcome, Fault> {
        let mut halted = None;
        for filter in &self.before {
            match filter.call(ctx.clone()).await? {
                Some(Outcome::Continue) => return Ok(Outcome::Continue),
                Some(Outcome::Response(response)) => {
                    halted = Some(response);
                    break;
                }
                None => {}
            }
        }

        let mut outcome = match halted {
            Some(response) => Outcome::Response(response),
            None => self.handler.call(ctx.clone()).await?,
        };

        for filter in &self.after {
            if let Some(Outcome::Response(response)) = filter.call(ctx.clone()).await? {
                if matches!(outcome, Outcome::Response(_)) {
                    outcome = Outcome::Response(response);
                }
            }
        }

        Ok(outcome)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.spec())
            .field("name", &self.name)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::ConfigStore;
    use crate::http::{Request, Response, StatusCode};

    fn ctx() -> RequestContext {
        RequestContext::new(
            Arc::new(Request::get("/cats/bob")),
            Arc::new(ConfigStore::new()),
        )
    }

    fn ok_handler() -> BoxedHandler {
        Arc::new(|_ctx: RequestContext| async { Response::new(StatusCode::Ok).text("handled") })
    }

    fn route(handler: BoxedHandler, before: Vec<BoxedFilter>, after: Vec<BoxedFilter>) -> Route {
        Route::new(
            Method::Get,
            RoutePattern::compile("/cats/:id"),
            None,
            handler,
            before,
            after,
        )
    }

    // Filter that appends its tag to a shared trace in the state bag.
    fn tracing_filter(tag: &'static str) -> BoxedFilter {
        Arc::new(move |ctx: RequestContext| async move {
            ctx.with_state(|bag| {
                if bag.get::<Vec<&'static str>>().is_none() {
                    bag.insert(Vec::<&'static str>::new());
                }
                if let Some(trace) = bag.get_mut::<Vec<&'static str>>() {
                    trace.push(tag);
                }
            });
        })
    }

    #[tokio::test]
    async fn runs_filters_then_handler_then_after() {
        let handler: BoxedHandler = Arc::new(|ctx: RequestContext| async move {
            ctx.with_state(|bag| {
                if let Some(trace) = bag.get_mut::<Vec<&'static str>>() {
                    trace.push("handler");
                }
            });
            Response::new(StatusCode::Ok)
        });
        let r = route(
            handler,
            vec![tracing_filter("b1"), tracing_filter("b2")],
            vec![tracing_filter("a1")],
        );
        let c = ctx();
        let outcome = r.execute(c.clone()).await.unwrap();
        assert!(matches!(outcome, Outcome::Response(_)));
        assert_eq!(
            c.fetch::<Vec<&'static str>>().unwrap(),
            vec!["b1", "b2", "handler", "a1"]
        );
    }

    #[tokio::test]
    async fn before_filter_continue_skips_everything() {
        let handler_ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&handler_ran);
        let handler: BoxedHandler = Arc::new(move |_ctx: RequestContext| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Response::new(StatusCode::Ok)
            }
        });

        let pass: BoxedFilter = Arc::new(|_ctx: RequestContext| async { Outcome::Continue });
        let r = route(handler, vec![pass], vec![tracing_filter("after")]);

        let c = ctx();
        let outcome = r.execute(c.clone()).await.unwrap();
        assert!(matches!(outcome, Outcome::Continue));
        assert_eq!(handler_ran.load(Ordering::SeqCst), 0);
        // after-filters are skipped when Continue precedes the handler
        assert!(c.fetch::<Vec<&'static str>>().is_none());
    }

    #[tokio::test]
    async fn before_filter_halt_skips_handler_but_runs_after() {
        let halt: BoxedFilter = Arc::new(|_ctx: RequestContext| async {
            Response::new(StatusCode::Unauthorized).text("no")
        });
        let r = route(ok_handler(), vec![halt], vec![tracing_filter("after")]);

        let c = ctx();
        let outcome = r.execute(c.clone()).await.unwrap();
        let Outcome::Response(response) = outcome else {
            panic!("expected halt response");
        };
        assert_eq!(response.status(), StatusCode::Unauthorized);
        assert_eq!(c.fetch::<Vec<&'static str>>().unwrap(), vec!["after"]);
    }

    #[tokio::test]
    async fn handler_continue_still_runs_after_filters() {
        let handler: BoxedHandler = Arc::new(|_ctx: RequestContext| async { Outcome::Continue });
        let r = route(handler, vec![], vec![tracing_filter("after")]);

        let c = ctx();
        let outcome = r.execute(c.clone()).await.unwrap();
        assert!(matches!(outcome, Outcome::Continue));
        assert_eq!(c.fetch::<Vec<&'static str>>().unwrap(), vec!["after"]);
    }

    #[tokio::test]
    async fn after_filter_replaces_response() {
        let decorate: BoxedFilter = Arc::new(|_ctx: RequestContext| async {
            Response::new(StatusCode::Ok).text("decorated")
        });
        let r = route(ok_handler(), vec![], vec![decorate]);

        let outcome = r.execute(ctx()).await.unwrap();
        let Outcome::Response(response) = outcome else {
            panic!("expected a response");
        };
        assert_eq!(response.into_body().as_ref(), b"decorated");
    }

    #[tokio::test]
    async fn filter_fault_propagates() {
        let failing: BoxedFilter = Arc::new(|_ctx: RequestContext| async {
            Err::<(), Fault>(Fault::new(std::io::Error::other("backend down")))
        });
        let r = route(ok_handler(), vec![failing], vec![]);
        let fault = r.execute(ctx()).await.unwrap_err();
        assert!(!fault.is_recoverable());
    }
}
