//! Named handler targets and `"target#action"` descriptor resolution.
//!
//! Routes can point at a handler indirectly with a descriptor string such
//! as `"cats#show"`. Descriptors resolve against an explicit registry when
//! the route is registered — an unresolvable descriptor is an immediate
//! [`DescriptorError`], never a per-request lookup.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::{BoxedHandler, Handler};

/// Error resolving a `"target#action"` descriptor at registration time.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor is not of the form `target#action`.
    #[error("malformed handler descriptor `{0}` — expected `target#action`")]
    Malformed(String),

    /// No actions were registered under the target name.
    #[error("unknown handler target `{target}` in descriptor `{descriptor}`")]
    UnknownTarget {
        /// The target half of the descriptor.
        target: String,
        /// The full descriptor as written.
        descriptor: String,
    },

    /// The target exists but does not provide the action.
    #[error("target `{target}` has no action `{action}`")]
    UnknownAction {
        /// The target half of the descriptor.
        target: String,
        /// The action half of the descriptor.
        action: String,
    },
}

/// A named group of handlers a descriptor's `action` half resolves against.
pub trait Actions: Send + Sync + 'static {
    /// Returns the handler for `action`, or `None` when the action is
    /// unknown.
    fn resolve(&self, action: &str) -> Option<BoxedHandler>;
}

/// A map-backed [`Actions`] implementation.
///
/// # Examples
///
/// ```
/// use sendero::context::RequestContext;
/// use sendero::handler::registry::{ActionMap, Actions};
/// use sendero::http::{Response, StatusCode};
///
/// let cats = ActionMap::new()
///     .on("index", |_ctx: RequestContext| async {
///         Response::new(StatusCode::Ok).text("all cats")
///     })
///     .on("show", |ctx: RequestContext| async move {
///         let id = ctx.params().get("id").unwrap_or("?").to_owned();
///         Response::new(StatusCode::Ok).text(id)
///     });
///
/// assert!(cats.resolve("index").is_some());
/// assert!(cats.resolve("feed").is_none());
/// ```
#[derive(Default)]
pub struct ActionMap {
    actions: HashMap<String, BoxedHandler>,
}

impl ActionMap {
    /// Creates an empty action map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action, builder-style.
    #[must_use]
    pub fn on(mut self, action: impl Into<String>, handler: impl Handler) -> Self {
        self.actions.insert(action.into(), Arc::new(handler));
        self
    }
}

impl Actions for ActionMap {
    fn resolve(&self, action: &str) -> Option<BoxedHandler> {
        self.actions.get(action).map(Arc::clone)
    }
}

/// The app's name→actions registry for descriptor handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    targets: HashMap<String, Arc<dyn Actions>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a group of actions under `target`.
    pub fn register(&mut self, target: impl Into<String>, actions: impl Actions) {
        self.targets.insert(target.into(), Arc::new(actions));
    }

    /// Resolves a `"target#action"` descriptor to its handler.
    ///
    /// # Errors
    ///
    /// Fails fast with a [`DescriptorError`] when the descriptor is
    /// malformed, the target is unknown, or the action is missing.
    pub fn resolve(&self, descriptor: &str) -> Result<BoxedHandler, DescriptorError> {
        let (target, action) = descriptor
            .split_once('#')
            .filter(|(t, a)| !t.is_empty() && !a.is_empty())
            .ok_or_else(|| DescriptorError::Malformed(descriptor.to_owned()))?;

        let actions = self
            .targets
            .get(target)
            .ok_or_else(|| DescriptorError::UnknownTarget {
                target: target.to_owned(),
                descriptor: descriptor.to_owned(),
            })?;

        actions
            .resolve(action)
            .ok_or_else(|| DescriptorError::UnknownAction {
                target: target.to_owned(),
                action: action.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::context::RequestContext;
    use crate::handler::Outcome;
    use crate::http::{Request, Response, StatusCode};

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(
            "cats",
            ActionMap::new().on("show", |_ctx: RequestContext| async {
                Response::new(StatusCode::Ok).text("a cat")
            }),
        );
        registry
    }

    #[tokio::test]
    async fn resolves_and_invokes() {
        let handler = registry().resolve("cats#show").unwrap();
        let ctx = RequestContext::new(
            Arc::new(Request::get("/cats/1")),
            Arc::new(ConfigStore::new()),
        );
        let outcome = handler.call(ctx).await.unwrap();
        let Outcome::Response(response) = outcome else {
            panic!("expected a response");
        };
        assert_eq!(response.into_body().as_ref(), b"a cat");
    }

    #[test]
    fn unknown_target_fails_fast() {
        let err = registry().resolve("dogs#show").unwrap_err();
        assert!(matches!(err, DescriptorError::UnknownTarget { .. }));
    }

    #[test]
    fn unknown_action_fails_fast() {
        let err = registry().resolve("cats#feed").unwrap_err();
        assert!(matches!(err, DescriptorError::UnknownAction { .. }));
    }

    #[test]
    fn malformed_descriptors_are_rejected() {
        for bad in ["cats", "#show", "cats#", "#"] {
            let err = registry().resolve(bad).unwrap_err();
            assert!(matches!(err, DescriptorError::Malformed(_)), "{bad}");
        }
    }
}
