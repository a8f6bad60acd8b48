/// Moves the client to another route; used to force re-authentication.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator for headless front ends: records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: &str) {
        tracing::warn!(route = %route, "Session ended, redirecting to login");
    }
}
