//! Persisted temperature/humidity history.
//!
//! The control loop appends a [`SamplePoint`] every flush interval; the web
//! layer reads the whole collection back for the history chart.

pub mod sample;
pub mod store;

// Re-export commonly used items
pub use sample::{HistorySeries, SamplePoint};
pub use store::HistoryStore;
