//! The action-dispatch and reconciliation engine.
//!
//! ```text
//! UI ── Request ──▶ Store ──▶ Orchestrator ──▶ services
//!                     ▲                           │
//!                     └──────── Outcome ◀─────────┘
//!                     │
//!                  reduce ──▶ watch<Arc<AppState>> ──▶ UI
//! ```
//!
//! A single task owns the state. It takes requests and outcomes off two
//! queues one at a time; requests go to the [`Orchestrator`], outcomes go
//! through [`reduce`] and the resulting snapshot is published to subscribers.

mod action;
mod error;
mod orchestrator;
mod reducer;
pub mod selectors;
mod state;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub use action::{Operation, Outcome, Request};
pub use error::{EngineError, ErrorScope, StoreClosed};
pub use orchestrator::Orchestrator;
pub use reducer::reduce;
pub use state::{AppState, Page, Panel};

use crate::services::Services;

/// Handle to a running engine. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    requests: mpsc::UnboundedSender<Request>,
    snapshots: watch::Receiver<Arc<AppState>>,
}

impl Store {
    /// Start the engine with an empty state. Must be called inside a tokio runtime.
    pub fn start(services: Services) -> Self {
        Self::start_with(services, AppState::default()).0
    }

    /// Start the engine from `initial`, also returning the processing task.
    ///
    /// The task ends once every `Store` handle is dropped.
    pub fn start_with(services: Services, initial: AppState) -> (Self, JoinHandle<()>) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(initial));

        let orchestrator = Orchestrator::new(services, outcome_tx);
        let task = tokio::spawn(run(orchestrator, request_rx, outcome_rx, snapshot_tx));

        (
            Self {
                requests: request_tx,
                snapshots: snapshot_rx,
            },
            task,
        )
    }

    /// Queue a request. Never waits for it to be handled.
    pub fn dispatch(&self, request: Request) -> Result<(), StoreClosed> {
        self.requests.send(request).map_err(|_| StoreClosed)
    }

    /// The latest fully reduced snapshot.
    pub fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.snapshots.clone()
    }

    /// Wait for the first snapshot, current one included, that satisfies `ready`.
    pub async fn wait_until(
        &self,
        mut ready: impl FnMut(&AppState) -> bool,
    ) -> Result<Arc<AppState>, StoreClosed> {
        let mut snapshots = self.snapshots.clone();
        let state = snapshots
            .wait_for(|state| ready(state))
            .await
            .map_err(|_| StoreClosed)?;
        Ok(Arc::clone(&state))
    }
}

async fn run(
    mut orchestrator: Orchestrator,
    mut requests: mpsc::UnboundedReceiver<Request>,
    mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    snapshots: watch::Sender<Arc<AppState>>,
) {
    tracing::info!("Store started");
    let mut state = Arc::clone(&snapshots.borrow());

    loop {
        tokio::select! {
            // Drain outcomes first so requests see the freshest state.
            biased;

            Some(outcome) = outcomes.recv() => {
                tracing::debug!(outcome = outcome.name(), "Reducing outcome");
                orchestrator.observe(&outcome);
                let next = reduce(&state, outcome);
                if !Arc::ptr_eq(&next, &state) {
                    state = next;
                    snapshots.send_replace(Arc::clone(&state));
                }
            }
            request = requests.recv() => match request {
                Some(request) => orchestrator.handle(request, &state),
                None => break,
            },
        }
    }

    tracing::info!("Store stopped");
}
