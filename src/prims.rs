//! Per-cell primitive records: the metric variables the solver adjusts and
//! the read-only matter/electromagnetic sources.

use crate::grid::FlatCell;
use cartan_tensor::{Sym3, Sym4, Vector3};

/// The ADM metric primitives at one cell: lapse α, shift βⁱ and spatial
/// metric γᵢⱼ. Exactly 10 reals, laid out in the flat solver order
/// (α, β⁰, β¹, β², γ₀₀, γ₁₀, γ₁₁, γ₂₀, γ₂₁, γ₂₂).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct MetricPrims {
    pub alpha: f64,
    pub beta_u: Vector3,
    pub gamma_ll: Sym3,
}

impl MetricPrims {
    /// The flat-space slice: unit lapse, zero shift, identity 3-metric.
    pub fn flat() -> Self {
        Self {
            alpha: 1.0,
            beta_u: Vector3::zeros(),
            gamma_ll: Sym3::identity(),
        }
    }
}

unsafe impl FlatCell for MetricPrims {
    const REALS: usize = 10;
}

unsafe impl FlatCell for Sym4 {
    const REALS: usize = 10;
}

// The solver state vector aliases grids of these records; their packing
// must stay byte-identical to 10 consecutive reals.
const _: () = assert!(std::mem::size_of::<MetricPrims>() == 80);
const _: () = assert!(std::mem::size_of::<Sym4>() == 80);

/// The stress-energy primitives at one cell. `use_v` and `use_em` let
/// vacuum regions skip the matter 4-velocity and the whole EM tensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct StressEnergyPrims {
    /// Matter density, 1/m².
    pub rho: f64,
    /// Pressure.
    pub p: f64,
    /// Specific internal energy.
    pub e_int: f64,
    /// Matter 3-velocity (upper, spatial).
    pub v_u: Vector3,
    /// Electric field (upper, spatial).
    pub e_u: Vector3,
    /// Magnetic field (upper, spatial).
    pub b_u: Vector3,
    pub use_v: bool,
    pub use_em: bool,
}
