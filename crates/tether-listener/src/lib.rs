//! Coalescing change-notification listener.
//!
//! Host notifications arrive on arbitrary threads. This crate funnels them
//! onto one cooperative [`RunLoop`], merges bursts that fall inside a
//! granularity window, and delivers at most one notification per watched
//! event per flush.

pub mod clock;
pub mod coalesce;
mod error;
pub mod listener;
pub mod run_loop;

pub use clock::{seconds_to_ticks, Clock, HostClock, ManualClock};
pub use coalesce::take_coalesced_run;
pub use error::{ListenerError, Result};
pub use listener::{Delivery, EventListener};
pub use run_loop::{LoopHandle, RunLoop, SourceId, TimerId};
