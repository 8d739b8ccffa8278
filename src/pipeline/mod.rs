//! Background jobs.
//!
//! - `refresh`: the periodic two-week cache refresh, one loop per
//!   entity class.

mod refresh;

pub use refresh::RefreshScheduler;
