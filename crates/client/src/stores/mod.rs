//! Client-local view state and the reconcilers that own it.

pub mod detail;
pub mod list;

pub use detail::{DetailOutcome, DetailReconciler, DetailState, DELETED_NOTICE};
pub use list::{ListOutcome, ListReconciler};
