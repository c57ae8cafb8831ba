//! Algebraic reconstruction of the 4-metric from ADM primitives.

use crate::prims::MetricPrims;
use cartan_tensor::{sum, Sym4};

/// The metric quantities derived from the primitives at one cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricCell {
    /// g_ab.
    pub g_ll: Sym4,
    /// g^ab, the exact algebraic inverse of `g_ll`.
    pub g_uu: Sym4,
    /// ∂ₜg_ab, from the supplied primitive time derivatives.
    pub dt_g_ll: Sym4,
}

/// Reconstructs g_ab, g^ab and ∂ₜg_ab from the primitives and their time
/// derivatives at one cell.
///
/// The lapse must not vanish; a zero lapse means an initial-condition
/// generator or the solver produced an unphysical slice, and there is no
/// way to continue from it.
pub fn reconstruct(prims: &MetricPrims, dt_prims: &MetricPrims) -> MetricCell {
    let alpha = prims.alpha;
    assert!(
        alpha != 0.0,
        "lapse vanished during metric reconstruction; the slice is unphysical"
    );

    let beta_u = &prims.beta_u;
    let gamma_ll = &prims.gamma_ll;
    let alpha_sq = alpha * alpha;

    // β_i = γ_ij βʲ and β² = βⁱβ_i
    let beta_l: [f64; 3] =
        std::array::from_fn(|i| sum::<3, 1>(|[j]| beta_u[j] * gamma_ll[[i, j]]));
    let beta_sq = sum::<3, 1>(|[i]| beta_l[i] * beta_u[i]);

    let mut g_ll = Sym4::zeros();
    g_ll[[0, 0]] = -alpha_sq + beta_sq;
    for i in 0..3 {
        g_ll[[i + 1, 0]] = beta_l[i];
        for j in 0..=i {
            g_ll[[i + 1, j + 1]] = gamma_ll[[i, j]];
        }
    }

    let dt_alpha = dt_prims.alpha;
    let dt_beta_u = &dt_prims.beta_u;
    let dt_gamma_ll = &dt_prims.gamma_ll;

    let mut dt_g_ll = Sym4::zeros();
    // g_tt,t = (-α² + β²),t = -2 α α,t + 2 βⁱ,t β_i + βⁱ βʲ γ_ij,t
    dt_g_ll[[0, 0]] = -2.0 * alpha * dt_alpha
        + sum::<3, 1>(|[i]| 2.0 * dt_beta_u[i] * beta_l[i])
        + sum::<3, 2>(|[i, j]| beta_u[i] * beta_u[j] * dt_gamma_ll[[i, j]]);
    // g_ti,t = β_i,t = βʲ,t γ_ij + βʲ γ_ij,t
    for i in 0..3 {
        dt_g_ll[[i + 1, 0]] =
            sum::<3, 1>(|[j]| dt_beta_u[j] * gamma_ll[[i, j]] + beta_u[j] * dt_gamma_ll[[i, j]]);
        // g_ij,t = γ_ij,t
        for j in 0..=i {
            dt_g_ll[[i + 1, j + 1]] = dt_gamma_ll[[i, j]];
        }
    }

    let gamma_uu = gamma_ll.inverse(gamma_ll.determinant());

    let mut g_uu = Sym4::zeros();
    g_uu[[0, 0]] = -1.0 / alpha_sq;
    for i in 0..3 {
        g_uu[[i + 1, 0]] = beta_u[i] / alpha_sq;
        for j in 0..=i {
            g_uu[[i + 1, j + 1]] = gamma_uu[[i, j]] - beta_u[i] * beta_u[j] / alpha_sq;
        }
    }

    debug_assert!(g_uu.buffer().iter().all(|v| v.is_finite()));

    MetricCell {
        g_ll,
        g_uu,
        dt_g_ll,
    }
}
