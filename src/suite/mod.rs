//! CRUD check scenarios against an objects API.
//!
//! The scenarios run sequentially and share one object created on first use,
//! so the read, update and delete checks all operate on the same record.

pub mod fixtures;
pub mod report;
pub mod scenarios;

pub use report::{Outcome, ScenarioResult, SuiteReport};
pub use scenarios::{Marker, Scenario, Selection, Suite};
