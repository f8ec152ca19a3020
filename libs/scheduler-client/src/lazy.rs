//! Deferred construction of collaborators.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::ClientError;

type FactoryFuture<T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send>>;
type Factory<T> = Box<dyn Fn() -> FactoryFuture<T> + Send + Sync>;

/// Owns at most one `T`, built by its factory on first use.
///
/// Concurrent first callers wait on a single construction. A failed
/// construction leaves the handle empty so the next caller tries again.
pub struct LazyHandle<T> {
    service: &'static str,
    factory: Factory<T>,
    cell: OnceCell<T>,
}

impl<T> LazyHandle<T> {
    /// Create an uninitialized handle. The factory is not called here.
    pub fn new<F, Fut>(service: &'static str, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        Self {
            service,
            factory: Box::new(move || Box::pin(factory())),
            cell: OnceCell::new(),
        }
    }

    /// Return the collaborator, constructing it if this is the first use.
    pub async fn instance(&self) -> Result<&T, ClientError> {
        self.cell
            .get_or_try_init(|| async {
                debug!(service = self.service, "Constructing client on first use");
                match (self.factory)().await {
                    Ok(instance) => {
                        debug!(service = self.service, "Client constructed");
                        Ok(instance)
                    }
                    Err(e) => {
                        warn!(service = self.service, error = %e, "Client construction failed");
                        Err(e)
                    }
                }
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub fn service(&self) -> &'static str {
        self.service
    }
}

impl<T> fmt::Debug for LazyHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyHandle")
            .field("service", &self.service)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
