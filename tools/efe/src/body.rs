//! Preset source bodies. A body fixes the length scale of the domain and
//! fills the stress-energy primitive grid.

use cartan::geometry::{IndexSpace, Rectangle};
use cartan::grid::Grid;
use cartan::prims::StressEnergyPrims;
use cartan::units::{mass_from_kg, C, G};
use cartan_tensor::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Radius of Earth, m.
const EARTH_RADIUS: f64 = 6.37101e6;
/// Mass of Earth, kg.
const EARTH_MASS_KG: f64 = 5.9736e24;

/// Radius of the Sun, m.
const SUN_RADIUS: f64 = 6.960e8;
/// Mass of the Sun, kg.
const SUN_MASS_KG: f64 = 1.9891e30;

/// Earth's surface magnetic field (0.45 gauss) in geometrized units, 1/m.
fn surface_magnetic_field() -> f64 {
    0.45 * (0.1 * G).sqrt() / C
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Earth,
    Sun,
    EmField,
    EmLine,
}

/// A source preset: its geometry and the primitive fields it deposits.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub kind: BodyKind,
    /// Body radius, m. For the EM presets this is the conductor scale and
    /// only fixes the domain size.
    pub radius: f64,
    /// Geometrized mass, m.
    pub mass: f64,
}

impl Body {
    pub fn new(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Earth => Self {
                kind,
                radius: EARTH_RADIUS,
                mass: mass_from_kg(EARTH_MASS_KG),
            },
            BodyKind::Sun => Self {
                kind,
                radius: SUN_RADIUS,
                mass: mass_from_kg(SUN_MASS_KG),
            },
            // Matter-free presets; the Earth length scale keeps the grid
            // spacing comparable to the stellar runs.
            BodyKind::EmField | BodyKind::EmLine => Self {
                kind,
                radius: EARTH_RADIUS,
                mass: 0.0,
            },
        }
    }

    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radius.powi(3)
    }

    /// Average density in geometrized units, 1/m².
    pub fn density(&self) -> f64 {
        self.mass / self.volume()
    }

    /// Geometrized mass enclosed within coordinate radius `r`.
    pub fn enclosed_mass(&self, r: f64) -> f64 {
        let matter_radius = r.min(self.radius);
        self.density() * 4.0 / 3.0 * PI * matter_radius.powi(3)
    }

    /// The stellar initial conditions assume a spherical matter source.
    pub fn is_spherical(&self) -> bool {
        matches!(self.kind, BodyKind::Earth | BodyKind::Sun)
    }

    /// Fills the stress-energy primitive grid. The grid is read-only for
    /// the rest of the run.
    pub fn init_sources(
        &self,
        bounds: &Rectangle<3>,
        space: IndexSpace<3>,
        sources: &mut Grid<StressEnergyPrims>,
    ) {
        let body = *self;
        let density = self.density();

        sources.par_fill(|index| {
            let x = bounds.cell_center(space.size(), index);
            let r = (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt();

            match body.kind {
                BodyKind::Earth | BodyKind::Sun => StressEnergyPrims {
                    rho: if r < body.radius { density } else { 0.0 },
                    ..Default::default()
                },
                BodyKind::EmField => StressEnergyPrims {
                    // A uniform magnetic field along z.
                    b_u: Vector3::from_fn(|[i]| {
                        if i == 2 {
                            surface_magnetic_field()
                        } else {
                            0.0
                        }
                    }),
                    use_em: true,
                    ..Default::default()
                },
                BodyKind::EmLine => {
                    // A conductor of radius `body.radius` along z carrying a
                    // uniform current: the azimuthal field grows linearly
                    // inside the conductor and falls off as 1/r outside.
                    let r_cyl = (x[0] * x[0] + x[1] * x[1]).sqrt();
                    let magnitude = if r_cyl < body.radius {
                        surface_magnetic_field() * r_cyl / body.radius
                    } else {
                        surface_magnetic_field() * body.radius / r_cyl
                    };

                    let b_u = if r_cyl > 0.0 {
                        Vector3::from_fn(|[i]| match i {
                            0 => -magnitude * x[1] / r_cyl,
                            1 => magnitude * x[0] / r_cyl,
                            _ => 0.0,
                        })
                    } else {
                        Vector3::zeros()
                    };

                    StressEnergyPrims {
                        b_u,
                        use_em: true,
                        ..Default::default()
                    }
                }
            }
        });
    }
}
