//! Fatal error types for the packing façade.
//!
//! Ordinary infeasibility ("no packing exists") is returned as plain data —
//! `(false, None)` — from [`crate::pack`], never as an [`Err`]. The types here
//! are reserved for faults that mean the caller could not get a decisive
//! answer at all.

use thiserror::Error;

/// Fatal faults raised by [`crate::pack`].
///
/// These are distinct from infeasibility: a `PackError` means the solver
/// could not decide the instance, not that it decided "no".
#[derive(Debug, Error)]
pub enum PackError {
    /// The ILP backend could not be constructed or initialized.
    #[error("ILP solver backend unavailable: {reason}")]
    SolverUnavailable { reason: String },

    /// An internal invariant was violated (e.g. an undo did not restore
    /// state exactly). Indicates a bug in this crate, not bad input.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}
