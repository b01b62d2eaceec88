//! Load-once provider script loader.
//!
//! A `ResourceLoader` owns the single `LoadState` for its page. Every
//! `get()` made while a load is pending receives a clone of the same shared
//! future, so the script element is inserted and the global callback
//! claimed at most once.
//!
//! ```text
//! Unstarted ──get()──► Loading(shared) ──callback──► Ready(api)
//!                          │
//!                          └──error event──► Failed(err) ──retry()──► Unstarted
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture, Shared};

use crate::config::{LoaderConfig, ScriptRequest};
use crate::error::{ConfigError, LoadError};
use crate::host::{Completion, ScriptHost};

/// Shared handle to the eventual provider namespace.
pub type LoadFuture<A> = Shared<LocalBoxFuture<'static, Result<A, LoadError>>>;

/// Load state of the provider script.
pub enum LoadState<A> {
    Unstarted,
    Loading(LoadFuture<A>),
    Ready(A),
    Failed(LoadError),
}

/// Discriminant of [`LoadState`], for inspection without cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unstarted,
    Loading,
    Ready,
    Failed,
}

impl<A> LoadState<A> {
    pub fn status(&self) -> LoadStatus {
        match self {
            LoadState::Unstarted => LoadStatus::Unstarted,
            LoadState::Loading(_) => LoadStatus::Loading,
            LoadState::Ready(_) => LoadStatus::Ready,
            LoadState::Failed(_) => LoadStatus::Failed,
        }
    }
}

struct Slot<A> {
    state: RefCell<LoadState<A>>,
    /// Bumped on every `retry()`; completions from older attempts are ignored.
    generation: Cell<u32>,
}

/// Loads the provider script at most once and shares the result.
pub struct ResourceLoader<H: ScriptHost> {
    host: H,
    request: ScriptRequest,
    slot: Rc<Slot<H::Api>>,
}

impl<H: ScriptHost> ResourceLoader<H> {
    pub fn new(host: H, config: LoaderConfig) -> Result<Self, ConfigError> {
        let request = config.script_request()?;
        Ok(Self {
            host,
            request,
            slot: Rc::new(Slot {
                state: RefCell::new(LoadState::Unstarted),
                generation: Cell::new(0),
            }),
        })
    }

    pub fn script_request(&self) -> &ScriptRequest {
        &self.request
    }

    pub fn status(&self) -> LoadStatus {
        self.slot.state.borrow().status()
    }

    /// Get the provider namespace, starting the load on first use.
    pub fn get(&self) -> LoadFuture<H::Api> {
        match &*self.slot.state.borrow() {
            LoadState::Ready(api) => return resolved(Ok(api.clone())),
            LoadState::Failed(err) => return resolved(Err(err.clone())),
            LoadState::Loading(pending) => return pending.clone(),
            LoadState::Unstarted => {}
        }
        self.start()
    }

    /// Start over after a failed load. Outside `Failed` this is `get()`.
    pub fn retry(&self) -> LoadFuture<H::Api> {
        if self.status() == LoadStatus::Failed {
            tracing::info!(script_id = %self.request.id, "Retrying provider script load");
            self.host.remove_script(&self.request.id);
            self.slot.generation.set(self.slot.generation.get().wrapping_add(1));
            *self.slot.state.borrow_mut() = LoadState::Unstarted;
        }
        self.get()
    }

    fn start(&self) -> LoadFuture<H::Api> {
        if self.host.script_exists(&self.request.id) {
            if let Some(api) = self.host.provider_api() {
                tracing::debug!(
                    script_id = %self.request.id,
                    "Provider already loaded by existing script"
                );
                *self.slot.state.borrow_mut() = LoadState::Ready(api.clone());
                return resolved(Ok(api));
            }
            tracing::debug!(script_id = %self.request.id, "Attaching to existing provider script");
            return self.begin(|done| self.host.attach_existing(&self.request, done));
        }

        tracing::info!(script_id = %self.request.id, "Inserting provider script");
        self.begin(|done| self.host.insert_script(&self.request, done))
    }

    /// Record `Loading` and only then hand the completion to the host, so a
    /// `get()` issued while the host is inserting shares this load.
    fn begin(
        &self,
        launch: impl FnOnce(Completion<H::Api>) -> Result<(), LoadError>,
    ) -> LoadFuture<H::Api> {
        let (tx, rx) = oneshot::channel();
        let generation = self.slot.generation.get();

        let weak = Rc::downgrade(&self.slot);
        let done: Completion<H::Api> = Box::new(move |outcome| {
            if let Some(slot) = weak.upgrade() {
                if slot.generation.get() != generation {
                    tracing::debug!("Ignoring completion from a superseded script load");
                    return;
                }
                settle(&slot, &outcome);
            }
            let _ = tx.send(outcome);
        });

        let weak = Rc::downgrade(&self.slot);
        let pending = async move {
            match rx.await {
                Ok(outcome) => outcome,
                // The host dropped the completion; report whatever failure it left behind.
                Err(_) => Err(failure_of(&weak)),
            }
        }
        .boxed_local()
        .shared();

        *self.slot.state.borrow_mut() = LoadState::Loading(pending.clone());

        if let Err(err) = launch(done) {
            tracing::warn!(error = %err, "Provider script could not be started");
            *self.slot.state.borrow_mut() = LoadState::Failed(err);
        }
        pending
    }
}

fn settle<A: Clone>(slot: &Slot<A>, outcome: &Result<A, LoadError>) {
    let next = match outcome {
        Ok(api) => {
            tracing::info!("Provider script ready");
            LoadState::Ready(api.clone())
        }
        Err(err) => {
            tracing::warn!(error = %err, "Provider script failed");
            LoadState::Failed(err.clone())
        }
    };
    *slot.state.borrow_mut() = next;
}

fn failure_of<A>(slot: &Weak<Slot<A>>) -> LoadError {
    slot.upgrade()
        .and_then(|slot| match &*slot.state.borrow() {
            LoadState::Failed(err) => Some(err.clone()),
            _ => None,
        })
        .unwrap_or(LoadError::Abandoned)
}

fn resolved<A: Clone + 'static>(outcome: Result<A, LoadError>) -> LoadFuture<A> {
    future::ready(outcome).boxed_local().shared()
}
