//! Discrete-event scheduler for the oxmsx emulator.
//!
//! Every emulated device that needs to act at a future moment registers a
//! [`SyncPoint`] with the [`Scheduler`]. The processor model, acting as the
//! [`ClockDriver`], runs ahead until the earliest pending sync point and then
//! calls [`Scheduler::run_until`], which advances the virtual clock and calls
//! each due device's [`Schedulable::execute_until`] in strict time order.
//!
//! # Architecture
//!
//! ```text
//!  ClockDriver (CPU) ──run_until(limit)──▶ Scheduler ──execute_until(t)──▶ Schedulable
//!        ▲                                   │  ▲                              │
//!        └──── set_next_sync_point(next) ────┘  └──── SyncContext::set_sync_point
//! ```
//!
//! Units are owned by the scheduler and addressed by
//! [`UnitId`]; queue entries never hold references to units. Dispatch is
//! single-threaded and non-reentrant: units only see a [`SyncContext`], which
//! can register and cancel sync points but cannot start another dispatch.
//!
//! # Persistence
//!
//! The scheduler saves only its current time. Each unit saves the times it
//! still had pending and re-registers them when loaded, so a restored machine
//! dispatches exactly what the saved one would have.

#![warn(missing_docs)]

pub mod driver;
pub mod ids;
mod registry;
pub mod schedulable;
pub mod scheduler;
pub mod sync_point;

pub use driver::{ClockDriver, NextSyncPoint};
pub use ids::UnitId;
pub use schedulable::{Schedulable, SyncContext, SyncPointsState};
pub use scheduler::{DispatchReport, DispatchState, Scheduler, SchedulerState};
pub use sync_point::{SyncPoint, SyncQueue};
