//! Ambient actor/origin context for audit capture

use tracing::debug;

/// Actor recorded when no request-scoped identity is available
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Origin recorded when no request origin can be resolved
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Source of the actor identity and origin address attributed to a unit of work.
///
/// Implementations must not perform I/O: context capture runs on the write path
/// before the enclosing transaction commits. When nothing is known, return the
/// anonymous/unknown defaults instead of failing.
pub trait ContextProvider: Send + Sync {
    fn current_actor(&self) -> String;
    fn current_origin(&self) -> String;
}

/// Fixed actor/origin, for batch jobs and schedulers
#[derive(Debug, Clone)]
pub struct StaticContext {
    actor: String,
    origin: String,
}

impl StaticContext {
    pub fn new(actor: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            origin: origin.into(),
        }
    }
}

impl ContextProvider for StaticContext {
    fn current_actor(&self) -> String {
        self.actor.clone()
    }

    fn current_origin(&self) -> String {
        self.origin.clone()
    }
}

/// Always resolves to the anonymous/unknown defaults
#[derive(Debug, Clone, Default)]
pub struct AnonymousContext;

impl ContextProvider for AnonymousContext {
    fn current_actor(&self) -> String {
        ANONYMOUS_ACTOR.to_string()
    }

    fn current_origin(&self) -> String {
        UNKNOWN_ORIGIN.to_string()
    }
}

// Task-local storage for the request identity set by the hosting layer
tokio::task_local! {
    static REQUEST_CONTEXT: (String, String);
}

/// Task-scoped provider: the hosting request layer wraps each request in
/// [`ScopedContext::scope`] and every unit of work opened inside the scope is
/// attributed to that actor/origin. Reads outside a scope degrade to the
/// anonymous/unknown defaults, so background execution never fails on capture.
#[derive(Debug, Clone, Default)]
pub struct ScopedContext;

impl ScopedContext {
    /// Run `future` with the given actor/origin visible to audit capture
    pub async fn scope<F>(
        actor: impl Into<String>,
        origin: impl Into<String>,
        future: F,
    ) -> F::Output
    where
        F: std::future::Future,
    {
        REQUEST_CONTEXT
            .scope((actor.into(), origin.into()), future)
            .await
    }
}

impl ContextProvider for ScopedContext {
    fn current_actor(&self) -> String {
        REQUEST_CONTEXT
            .try_with(|(actor, _)| actor.clone())
            .unwrap_or_else(|_| {
                debug!("No request context available, attributing to {}", ANONYMOUS_ACTOR);
                ANONYMOUS_ACTOR.to_string()
            })
    }

    fn current_origin(&self) -> String {
        REQUEST_CONTEXT
            .try_with(|(_, origin)| origin.clone())
            .unwrap_or_else(|_| UNKNOWN_ORIGIN.to_string())
    }
}

/// Resolve the request origin from a prioritized list of candidate sources
/// (forwarding headers first, then the socket address). The first non-empty
/// candidate that is not "unknown" wins; a comma-separated hop list yields its
/// first hop, trimmed.
pub fn resolve_origin<'a, I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    for candidate in candidates.into_iter().flatten() {
        let value = candidate.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(UNKNOWN_ORIGIN) {
            continue;
        }
        let first_hop = value.split(',').next().unwrap_or(value).trim();
        if first_hop.is_empty() {
            continue;
        }
        return first_hop.to_string();
    }
    UNKNOWN_ORIGIN.to_string()
}
