//! Solves a static spatial slice of the Einstein field equations
//! G_ab = 8π T_ab on a fixed cartesian grid. The unknowns are the ADM
//! metric primitives at every cell; the residual couples neighbors through
//! finite-difference derivatives of the metric.

pub mod curvature;
pub mod efe;
pub mod fd;
pub mod geometry;
pub mod grid;
pub mod lac;
pub mod metric;
pub mod prims;
mod serde_array;
pub mod solver;
pub mod source;
pub mod units;

/// Provides common types used for most `cartan` applications.
pub mod prelude {
    pub use crate::efe::EfeSystem;
    pub use crate::fd::Order;
    pub use crate::geometry::{IndexSpace, Rectangle};
    pub use crate::grid::{Grid, GridView, GridViewMut};
    pub use crate::lac::{JfnkConfig, LineSearch, Outcome, SolveReport};
    pub use crate::prims::{MetricPrims, StressEnergyPrims};
    pub use crate::solver::{SolverCallbacks, SolverKind};
}
