//! Coordination engine for lightlink
//!
//! One [`Coordinator`] runs per declared relationship and enforces it: it
//! resolves which entities to observe, reacts to state-change notifications,
//! propagates updates to the related entities, and suppresses the echo
//! notifications its own commands produce. The [`CoordinatorManager`] owns
//! all live coordinators, mediates their lifecycle, and routes notifications
//! from the host's event loop.
//!
//! # Architecture
//!
//! ```text
//! host event loop ──► CoordinatorManager::dispatch
//!                          │ (watched-set routing)
//!                          ▼
//!                     Coordinator ──► host command transport
//!                      │      ▲
//!             classifier      fan-out window
//! ```

mod classifier;
mod command;
mod conflict;
mod coordinator;
mod fanout;
mod lifecycle;
mod manager;
mod observation;

pub use classifier::{classify, Classified};
pub use conflict::Conflict;
pub use coordinator::{Coordinator, SetupError};
pub use fanout::{FanOutWindow, QUIESCENCE_WINDOW_SECS};
pub use lifecycle::CoordinatorState;
pub use manager::{CoordinatorManager, ManagerError, ManagerResult};
pub use observation::ObservationSet;
