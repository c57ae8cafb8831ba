//! Christoffel symbols and the Einstein tensor from the metric grids.
//!
//! Spatial derivatives come from the centered finite-difference operator
//! with clamped-edge sampling; time derivatives of the metric are supplied
//! by the reconstruction stage, and time derivatives of the connection are
//! taken as zero (stationary slice).

use crate::fd::{partial_derivative, Order};
use crate::geometry::IndexSpace;
use crate::grid::Grid;
use cartan_tensor::{sum, Christoffel, Sym4, Vector4};

/// Computes Γᵃ_bc at `index` from g_ab, g^ab and ∂ₜg_ab.
pub fn christoffel_at(
    order: Order,
    space: IndexSpace<3>,
    index: [usize; 3],
    dx: [f64; 3],
    g_ll: &Grid<Sym4>,
    g_uu: &Grid<Sym4>,
    dt_g_ll: &Grid<Sym4>,
) -> Christoffel {
    // ∂ₖg_ab in the three spatial directions.
    let dg_spatial: [Sym4; 3] = partial_derivative(order, space, index, dx, |i| g_ll[i]);

    // Full derivative ∂_c g_ab with the time slot first.
    let dg = |a: usize, b: usize, c: usize| -> f64 {
        if c == 0 {
            dt_g_ll[index][[a, b]]
        } else {
            dg_spatial[c - 1][[a, b]]
        }
    };

    // Γ_abc = ½ (∂_c g_ab + ∂_b g_ac − ∂_a g_bc), symmetric in (b, c).
    let gamma_lll = Christoffel::from_fn(|[a, b, c]| 0.5 * (dg(a, b, c) + dg(a, c, b) - dg(b, c, a)));

    let g_uu = &g_uu[index];
    Christoffel::from_fn(|[a, b, c]| sum::<4, 1>(|[d]| g_uu[[a, d]] * gamma_lll[[d, b, c]]))
}

/// Assembles G_ab at `index` from the Christoffel grid via the direct Ricci
/// identity
///
///   R_ab = ∂_c Γᶜ_ab − ∂_b Γᶜ_ac + Γᶜ_ab Γᵈ_dc − Γᵈ_ac Γᶜ_bd,
///
/// which is written only on the upper triangle: the ∂_b Γᶜ_ac term is
/// symmetric in the continuum limit but not at finite resolution, so the
/// result is symmetrized by construction.
pub fn einstein_at(
    order: Order,
    space: IndexSpace<3>,
    index: [usize; 3],
    dx: [f64; 3],
    g_ll: &Grid<Sym4>,
    g_uu: &Grid<Sym4>,
    gamma_ull: &Grid<Christoffel>,
) -> Sym4 {
    // ∂ₖΓᵃ_bc in the three spatial directions.
    let dgamma_spatial: [Christoffel; 3] =
        partial_derivative(order, space, index, dx, |i| gamma_ull[i]);

    // ∂_d Γᵃ_bc with the time slot zero: the slice is stationary.
    let dgamma = |a: usize, b: usize, c: usize, d: usize| -> f64 {
        if d == 0 {
            0.0
        } else {
            dgamma_spatial[d - 1][[a, b, c]]
        }
    };

    let gamma = &gamma_ull[index];

    // Γ-trace vector Γᵈ_dc.
    let gamma_trace: Vector4 = gamma.trace_first_pair();

    let ricci_ll = Sym4::from_fn(|[a, b]| {
        sum::<4, 1>(|[c]| {
            dgamma(c, a, b, c) - dgamma(c, a, c, b)
                + gamma[[c, a, b]] * gamma_trace[c]
                - sum::<4, 1>(|[d]| gamma[[d, a, c]] * gamma[[c, b, d]])
        })
    });

    let g_ll = &g_ll[index];
    let g_uu = &g_uu[index];

    // Scalar curvature and the Einstein tensor.
    let scalar = g_uu.cotrace(&ricci_ll);
    Sym4::from_fn(|[a, b]| ricci_ll[[a, b]] - 0.5 * scalar * g_ll[[a, b]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::par_fill3;
    use crate::metric::reconstruct;
    use crate::prims::MetricPrims;

    fn metric_grids(
        space: IndexSpace<3>,
        prims: impl Fn([usize; 3]) -> MetricPrims + Sync,
    ) -> (Grid<Sym4>, Grid<Sym4>, Grid<Sym4>) {
        let mut g_ll = Grid::new(space);
        let mut g_uu = Grid::new(space);
        let mut dt_g_ll = Grid::new(space);

        par_fill3(&mut g_ll, &mut g_uu, &mut dt_g_ll, |index| {
            let cell = reconstruct(&prims(index), &MetricPrims::default());
            (cell.g_ll, cell.g_uu, cell.dt_g_ll)
        });

        (g_ll, g_uu, dt_g_ll)
    }

    #[test]
    fn flat_space_has_no_connection() {
        let space = IndexSpace::cubic(4);
        let dx = [1.0; 3];
        let (g_ll, g_uu, dt_g_ll) = metric_grids(space, |_| MetricPrims::flat());

        for index in space.iterate() {
            let gamma = christoffel_at(Order::Two, space, index, dx, &g_ll, &g_uu, &dt_g_ll);
            assert_eq!(gamma, Christoffel::zeros());
        }
    }

    #[test]
    fn flat_space_is_einstein_flat() {
        let space = IndexSpace::cubic(4);
        let dx = [1.0; 3];
        let (g_ll, g_uu, dt_g_ll) = metric_grids(space, |_| MetricPrims::flat());

        let mut gamma_ull = Grid::new(space);
        gamma_ull.par_fill(|index| {
            christoffel_at(Order::Two, space, index, dx, &g_ll, &g_uu, &dt_g_ll)
        });

        for index in space.iterate() {
            let einstein = einstein_at(Order::Two, space, index, dx, &g_ll, &g_uu, &gamma_ull);
            assert_eq!(einstein, Sym4::zeros());
        }
    }

    #[test]
    fn connection_is_symmetric_in_lower_indices() {
        // A lapse that varies smoothly in x gives a nontrivial connection;
        // symmetry in (b, c) holds bitwise by packed storage.
        let space = IndexSpace::cubic(6);
        let dx = [0.5; 3];
        let (g_ll, g_uu, dt_g_ll) = metric_grids(space, |[i, _, _]| {
            let mut prims = MetricPrims::flat();
            prims.alpha = 1.0 + 0.01 * (i as f64);
            prims
        });

        let index = [3, 3, 3];
        let gamma = christoffel_at(Order::Four, space, index, dx, &g_ll, &g_uu, &dt_g_ll);

        let mut nonzero = false;
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    assert_eq!(gamma[[a, b, c]].to_bits(), gamma[[a, c, b]].to_bits());
                    nonzero |= gamma[[a, b, c]] != 0.0;
                }
            }
        }
        assert!(nonzero);
    }
}
