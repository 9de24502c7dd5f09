//! Load history per monitored target
//!
//! Each target owns a fixed-length window of raw rate observations and
//! their first differences. The delta window is the forecasting signal.

mod store;
mod window;


pub use store::HistoryStore;
pub use window::{HistoryWindow, WarmupPolicy, WindowSnapshot, DEFAULT_HISTORY_LENGTH};
