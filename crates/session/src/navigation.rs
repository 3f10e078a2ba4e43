//! Navigation boundary (routing lives outside this crate).

/// Moves the UI to another route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for headless embeddings: only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigation requested");
    }
}
