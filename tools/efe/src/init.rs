//! Preset initial guesses for the metric primitives.

use cartan::geometry::{IndexSpace, Rectangle};
use cartan::grid::Grid;
use cartan::prims::MetricPrims;
use cartan::units::C;
use cartan_tensor::{Sym3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::body::Body;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitCondKind {
    Flat,
    StellarSchwarzschild,
    StellarKerrNewman,
    EmField,
    EmLine,
}

impl InitCondKind {
    /// The stellar guesses build an enclosed-mass profile and need a
    /// spherical matter source under them.
    pub fn requires_spherical_body(self) -> bool {
        matches!(
            self,
            InitCondKind::StellarSchwarzschild | InitCondKind::StellarKerrNewman
        )
    }

    /// Fills the metric primitive grid with the initial guess.
    pub fn initialize(
        self,
        body: &Body,
        bounds: &Rectangle<3>,
        space: IndexSpace<3>,
        prims: &mut Grid<MetricPrims>,
    ) {
        let body = *body;

        prims.par_fill(|index| {
            let x = bounds.cell_center(space.size(), index);

            match self {
                // The EM presets start from a flat slice over their fields.
                InitCondKind::Flat | InitCondKind::EmField | InitCondKind::EmLine => {
                    MetricPrims::flat()
                }
                InitCondKind::StellarSchwarzschild => stellar_schwarzschild(&body, x),
                InitCondKind::StellarKerrNewman => stellar_kerr_newman(&body, x),
            }
        });
    }
}

/// The interior/exterior Schwarzschild slice around a constant-density
/// sphere, substituting the enclosed mass m(r) for the point mass.
///
/// The lapse follows MTW box 23.2 eqn 6: √(1 − 2M/r) outside the body and
/// 3/2 √(1 − 2M/R) − 1/2 √(1 − 2M r²/R³) inside. The spatial metric takes
/// the cartesian enclosed-mass form γ_ij = δ_ij + xⁱxʲ/r² · 2m/(r − 2m).
fn stellar_schwarzschild(body: &Body, x: [f64; 3]) -> MetricPrims {
    let r = (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt();
    let m = body.enclosed_mass(r);
    let mass = body.mass;
    let radius = body.radius;

    let alpha = if r > radius {
        (1.0 - 2.0 * mass / r).sqrt()
    } else {
        1.5 * (1.0 - 2.0 * mass / radius).sqrt()
            - 0.5 * (1.0 - 2.0 * mass * r * r / radius.powi(3)).sqrt()
    };

    let gamma_ll =
        Sym3::from_fn(|[i, j]| (i == j) as u8 as f64 + x[i] / r * x[j] / r * 2.0 * m / (r - 2.0 * m));

    MetricPrims {
        alpha,
        beta_u: Vector3::zeros(),
        gamma_ll,
    }
}

/// A Kerr-Schild slice for the slowly rotating body, 3.4.33 through 3.4.35
/// of Alcubierre "Introduction to 3+1 Numerical Relativity", with the
/// enclosed mass substituted inside the body (the interior rotating metric
/// is an unsolved problem; this is only an initial guess).
fn stellar_kerr_newman(body: &Body, [x, y, z]: [f64; 3]) -> MetricPrims {
    // One revolution per day, converted to 1/m.
    let angular_velocity = 2.0 * PI / (60.0 * 60.0 * 24.0) / C;
    // Moment of inertia of a uniform sphere, m³.
    let inertia = 2.0 / 5.0 * body.mass * body.radius * body.radius;
    // Angular momentum per mass, m.
    let a = inertia * angular_velocity / body.mass;

    // The Kerr-Schild radius solves (x² + y²)/(r² + a²) + z²/r² = 1,
    // i.e. r⁴ − (|x|² − a²) r² − a² z² = 0; take the positive root.
    let rr_minus_aa = x * x + y * y + z * z - a * a;
    let r = ((rr_minus_aa + (rr_minus_aa * rr_minus_aa + 4.0 * a * a * z * z).sqrt()) / 2.0).sqrt();

    let m = body.enclosed_mass(r);
    let charge = 0.0_f64;
    let h = (r * m - charge * charge / 2.0) / (r * r + a * a * z * z / (r * r));

    let l = [
        (r * x + a * y) / (r * r + a * a),
        (r * y - a * x) / (r * r + a * a),
        z / r,
    ];

    let alpha = (1.0 - 2.0 * h / (1.0 + 2.0 * h)).sqrt();
    let beta_u = Vector3::from_fn(|[i]| 2.0 * h * l[i] / (1.0 + 2.0 * h));
    let gamma_ll = Sym3::from_fn(|[i, j]| (i == j) as u8 as f64 + 2.0 * h * l[i] * l[j]);

    MetricPrims {
        alpha,
        beta_u,
        gamma_ll,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyKind;
    use cartan::metric::reconstruct;
    use cartan_tensor::sum;

    fn earth_setup() -> (Body, Rectangle<3>, IndexSpace<3>) {
        let body = Body::new(BodyKind::Earth);
        let half = 2.0 * body.radius;
        (
            body,
            Rectangle::from_aabb([-half; 3], [half; 3]),
            IndexSpace::cubic(8),
        )
    }

    #[test]
    fn schwarzschild_limits() {
        let (body, bounds, space) = earth_setup();
        let mut prims = Grid::new(space);
        InitCondKind::StellarSchwarzschild.initialize(&body, &bounds, space, &mut prims);

        for index in space.iterate() {
            let cell = &prims[index];
            // Earth's field is weak: the lapse stays just below one, and
            // the spatial metric is near flat but not exactly flat.
            assert!(cell.alpha > 0.999 && cell.alpha < 1.0);
            assert!(cell.gamma_ll.determinant() > 1.0);

            // Positive definite throughout.
            let x = bounds.cell_center(space.size(), index);
            let norm = sum::<3, 2>(|[i, j]| cell.gamma_ll[[i, j]] * x[i] * x[j]);
            assert!(norm > 0.0);
        }
    }

    #[test]
    fn exterior_lapse_matches_the_point_mass() {
        let (body, bounds, space) = earth_setup();
        let mut prims = Grid::new(space);
        InitCondKind::StellarSchwarzschild.initialize(&body, &bounds, space, &mut prims);

        let index = [7, 3, 3];
        let x = bounds.cell_center(space.size(), index);
        let r = (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt();
        assert!(r > body.radius);

        let cell = &prims[index];
        assert!((cell.alpha - (1.0 - 2.0 * body.mass / r).sqrt()).abs() < 1e-15);
    }

    #[test]
    fn kerr_newman_is_reconstructible() {
        let (body, bounds, space) = earth_setup();
        let mut prims = Grid::new(space);
        InitCondKind::StellarKerrNewman.initialize(&body, &bounds, space, &mut prims);

        // The rotating guess must still give an invertible metric with a
        // small but nonzero shift.
        let mut saw_shift = false;
        for index in space.iterate() {
            let cell = &prims[index];
            assert!(cell.alpha > 0.0 && cell.alpha < 1.0);

            let rebuilt = reconstruct(cell, &MetricPrims::default());
            for a in 0..4 {
                let delta = sum::<4, 1>(|[b]| rebuilt.g_ll[[a, b]] * rebuilt.g_uu[[b, a]]);
                assert!((delta - 1.0).abs() < 1e-10);
            }

            saw_shift |= cell.beta_u[0] != 0.0;
        }
        assert!(saw_shift);
    }
}
