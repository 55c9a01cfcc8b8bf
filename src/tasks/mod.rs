//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Reaper: Removes expired cache entries at the configured interval

mod reaper;

pub use reaper::{Reaper, ReaperState, Sweep};
