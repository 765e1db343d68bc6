//! Task spawning abstraction for runtime independence.
//!
//! The core spawns background work in two places: draining coalesced outbound
//! publishes, and clearing the echo-suppression window after its delay. The
//! [`TaskSpawner`] trait keeps both off any specific runtime so a desktop
//! shell can route them through its own runtime handle.

use std::future::Future;
use std::pin::Pin;

/// A boxed future suitable for dynamic dispatch.
pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Abstraction for spawning background tasks.
///
/// Allows core services to spawn asynchronous work without knowing the
/// underlying runtime. Implementations should ensure tasks run to completion
/// even if the spawner is dropped.
///
/// Only [`spawn_boxed`](Self::spawn_boxed) is required; it keeps the trait
/// usable behind `Arc<dyn TaskSpawner>`, which is how the coordinator holds
/// its spawner.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a boxed future as a background task.
    ///
    /// The task runs independently of the caller; there is no way to cancel
    /// or join it through the spawner.
    fn spawn_boxed(&self, future: BoxedTask);

    /// Spawns a future as a background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
        Self: Sized,
    {
        self.spawn_boxed(Box::pin(future));
    }
}

/// Tokio-based spawner for standalone and general use.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn_boxed(&self, future: BoxedTask) {
        self.handle.spawn(future);
    }
}
