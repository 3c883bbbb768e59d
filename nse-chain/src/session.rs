use crate::{error::FetchError, transport::Transport};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Shared handle to the current warmed session.
///
/// The generation tags which build of the session the holder observed, so a
/// stale holder cannot tear down a session that a concurrent recovery already
/// replaced.
#[derive(Debug)]
pub struct SessionRef<S> {
    session: Arc<S>,
    generation: u64,
}

impl<S> Clone for SessionRef<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            generation: self.generation,
        }
    }
}

impl<S> SessionRef<S> {
    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the single process-wide session: lazily built on first acquire and
/// replaced only by an explicit invalidate-and-reacquire cycle.
///
/// The slot lock is held across session creation, so concurrent callers never
/// observe a half-warmed session; they wait and share the finished one. A
/// failed build leaves the slot empty and the next acquire starts from
/// scratch.
pub struct SessionManager<T: Transport> {
    transport: Arc<T>,
    slot: Mutex<Slot<T::Session>>,
}

struct Slot<S> {
    current: Option<Arc<S>>,
    generation: u64,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            slot: Mutex::new(Slot {
                current: None,
                generation: 0,
            }),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Return the current shared session, building and warming one if absent.
    pub async fn acquire(&self) -> Result<SessionRef<T::Session>, FetchError> {
        let mut slot = self.slot.lock().await;

        let session = match &slot.current {
            Some(session) => Arc::clone(session),
            None => {
                let generation = slot.generation + 1;
                debug!(generation, "building fresh upstream session");
                let session = Arc::new(self.transport.connect().await?);
                slot.current = Some(Arc::clone(&session));
                slot.generation = generation;
                session
            }
        };

        Ok(SessionRef {
            session,
            generation: slot.generation,
        })
    }

    /// Discard the session the caller observed as blocked, forcing the next
    /// [`acquire`](Self::acquire) to rebuild with a fresh cookie warm-up.
    ///
    /// No-op when the observed session was already replaced.
    pub async fn invalidate(&self, stale: &SessionRef<T::Session>) {
        let mut slot = self.slot.lock().await;
        if slot.generation == stale.generation && slot.current.is_some() {
            info!(generation = stale.generation, "invalidating upstream session");
            slot.current = None;
        }
    }
}
