//! Ambient actor identity for the current logical request.
//!
//! Backed by a tokio task-local, so each request's task tree carries its own
//! slot and concurrent requests never see each other's actor. The slot is
//! shared (not copied) with tasks started through [`ActorContext::spawn`],
//! which means a `set` from any of them is visible to the rest of the
//! request.

use std::future::Future;
use std::sync::{Arc, RwLock};

use tokio::task::JoinHandle;

/// Zero-argument accessor the interceptor calls to attribute a delete.
pub type ActorSupplier = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Clone)]
struct ActorSlot(Arc<RwLock<Option<String>>>);

impl ActorSlot {
    fn new(actor: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(actor)))
    }

    fn get(&self) -> Option<String> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, actor: Option<String>) {
        match self.0.write() {
            Ok(mut guard) => *guard = actor,
            Err(poisoned) => *poisoned.into_inner() = actor,
        }
    }
}

tokio::task_local! {
    static ACTOR: ActorSlot;
}

/// Entry points for establishing and reading the ambient actor.
pub struct ActorContext;

impl ActorContext {
    /// Run `fut` with `actor` as the ambient actor for its whole extent.
    pub async fn run<F: Future>(actor: Option<String>, fut: F) -> F::Output {
        ACTOR.scope(ActorSlot::new(actor), fut).await
    }

    /// Run `fut` in a fresh scope with no actor yet; fill it later with
    /// [`set`](Self::set), typically once authentication has resolved.
    pub async fn scope<F: Future>(fut: F) -> F::Output {
        Self::run(None, fut).await
    }

    /// The ambient actor, or `None` outside any scope.
    #[must_use]
    pub fn current() -> Option<String> {
        ACTOR.try_with(ActorSlot::get).ok().flatten()
    }

    /// Overwrite the ambient actor for the rest of the current scope.
    ///
    /// Returns `false` (and does nothing) outside any scope.
    pub fn set(actor: impl Into<String>) -> bool {
        let actor = actor.into();
        ACTOR.try_with(|slot| slot.set(Some(actor))).is_ok()
    }

    /// Whether the caller runs inside an actor scope.
    #[must_use]
    pub fn is_active() -> bool {
        ACTOR.try_with(|_| ()).is_ok()
    }

    /// Spawn a task that shares the caller's actor slot.
    ///
    /// Outside any scope this is plain `tokio::spawn`.
    pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match ACTOR.try_with(Clone::clone) {
            Ok(slot) => tokio::spawn(ACTOR.scope(slot, fut)),
            Err(_) => tokio::spawn(fut),
        }
    }

    /// Supplier reading [`current`](Self::current) at call time.
    #[must_use]
    pub fn supplier() -> ActorSupplier {
        Arc::new(Self::current)
    }
}
