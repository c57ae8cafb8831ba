//! The stress-energy tensor, assembled from matter and electromagnetic
//! primitives combined with the current metric. Because T_ab depends on
//! g_ab, which the solver is adjusting, this is recomputed on every
//! residual evaluation.

use crate::prims::{MetricPrims, StressEnergyPrims};
use cartan_tensor::{cross, sum, Matrix4, Sym4, Vector4};
use std::f64::consts::PI;

/// Computes 8π T_ab at one cell.
pub fn stress_energy_8pi(
    prims: &MetricPrims,
    g_ll: &Sym4,
    sources: &StressEnergyPrims,
) -> Sym4 {
    let em_ll = if sources.use_em {
        em_stress_energy_ll(prims, g_ll, sources)
    } else {
        Sym4::zeros()
    };

    let matter_ll = matter_stress_energy_ll(prims, g_ll, sources);

    Sym4::from_fn(|[a, b]| (em_ll[[a, b]] + matter_ll[[a, b]]) * 8.0 * PI)
}

/// The perfect-fluid part, T_ab = (ρ(1 + ε) + P) u_a u_b + P g_ab.
fn matter_stress_energy_ll(
    prims: &MetricPrims,
    g_ll: &Sym4,
    sources: &StressEnergyPrims,
) -> Sym4 {
    let u_l: Vector4 = if sources.use_v {
        let v_u = &sources.v_u;
        let gamma_ll = &prims.gamma_ll;

        let v_len_sq = sum::<3, 2>(|[i, j]| v_u[i] * v_u[j] * gamma_ll[[i, j]]);
        // NOTE: the inner square root is deliberate, W = 1/√(1 − √(|v|²_γ)).
        // This disagrees with the textbook Lorentz factor 1/√(1 − |v|²_γ).
        let w = 1.0 / (1.0 - v_len_sq.sqrt()).sqrt();

        let mut u_u = Vector4::zeros();
        u_u[0] = w;
        for i in 0..3 {
            u_u[i + 1] = w * v_u[i];
        }

        Vector4::from_fn(|[a]| sum::<4, 1>(|[b]| u_u[b] * g_ll[[b, a]]))
    } else {
        // A fluid momentarily at rest in the coordinate frame: u^a = δ^a_0,
        // so u_a is the first column of g_ab.
        Vector4::from_fn(|[a]| g_ll[[a, 0]])
    };

    let energy = sources.rho * (1.0 + sources.e_int) + sources.p;
    Sym4::from_fn(|[a, b]| u_l[a] * u_l[b] * energy + g_ll[[a, b]] * sources.p)
}

/// The electromagnetic part in ADM-split form, built upper-index and then
/// lowered twice by g.
fn em_stress_energy_ll(prims: &MetricPrims, g_ll: &Sym4, sources: &StressEnergyPrims) -> Sym4 {
    let alpha = prims.alpha;
    let alpha_sq = alpha * alpha;
    let beta_u = &prims.beta_u;
    let gamma_ll = &prims.gamma_ll;

    let e_u = &sources.e_u;
    let b_u = &sources.b_u;

    let e_sq = sum::<3, 2>(|[i, j]| e_u[i] * e_u[j] * gamma_ll[[i, j]]);
    let b_sq = sum::<3, 2>(|[i, j]| b_u[i] * b_u[j] * gamma_ll[[i, j]]);
    let s_u = cross(e_u, b_u);

    let mut t_uu = Sym4::zeros();
    t_uu[[0, 0]] = (e_sq + b_sq) / alpha_sq / (8.0 * PI);
    for i in 0..3 {
        t_uu[[i + 1, 0]] =
            (-beta_u[i] * (e_sq + b_sq) / alpha_sq + 2.0 * s_u[i] / alpha) / (8.0 * PI);
        for j in 0..=i {
            let mut t = -2.0
                * (e_u[i] * e_u[j] + b_u[i] * b_u[j] + (s_u[i] * b_u[j] + s_u[j] * b_u[i]) / alpha)
                + beta_u[i] * beta_u[j] * (e_sq + b_sq) / alpha_sq;
            if i == j {
                t += e_sq + b_sq;
            }
            t_uu[[i + 1, j + 1]] = t / (8.0 * PI);
        }
    }

    // Lower both indices with g.
    let t_lu = Matrix4::from_fn(|[a, b]| sum::<4, 1>(|[w]| g_ll[[a, w]] * t_uu[[w, b]]));
    Sym4::from_fn(|[a, b]| sum::<4, 1>(|[w]| t_lu[[a, w]] * g_ll[[w, b]]))
}
