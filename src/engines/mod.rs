//! The three exhaustive decision engines, one module each.
//!
//! Every engine takes the same validated inputs (box dimensions, a
//! [`crate::geometry::PieceSet`], a rotation flag) and returns an
//! [`crate::grid::OccupancyGrid`] keyed to its own internal piece numbering;
//! the façade (`crate::pack`) re-keys the result to input-order indices
//! before returning it to callers. Engines never call each other.

pub mod backtracking;
pub mod exact_cover;
pub mod ilp;
