//! Post-solve observables: the constraint residual by block, numerical and
//! analytical gravitational acceleration, and the tab-separated cell table.

use cartan::efe::EfeSystem;
use cartan::geometry::Rectangle;
use cartan::grid::Grid;
use cartan::prims::MetricPrims;
use cartan::units::{curvature_to_density_cgs, C};
use cartan_app::float::lin_range;
use cartan_tensor::Sym4;
use eyre::Context as _;
use std::io::Write as _;
use std::path::Path;

use crate::body::Body;

/// Everything the report columns need, computed once after the solve.
pub struct Observables {
    efe: Grid<Sym4>,
    numerical_gravity: Grid<f64>,
    analytical_gravity: Grid<f64>,
}

impl Observables {
    /// Runs the pipeline once on the final primitives and derives the
    /// per-cell observables.
    pub fn compute(
        system: &mut EfeSystem,
        prims: &Grid<MetricPrims>,
        body: &Body,
        bounds: Rectangle<3>,
    ) -> Self {
        let space = system.space();

        // F = G_ab − 8πT_ab on the final slice; this also leaves the
        // scratch metric and connection grids at the final iterate.
        let mut efe = Grid::<Sym4>::new(space);
        system.residual(prims.as_flat(), efe.as_flat_mut());

        // aⁱ = Γⁱ_tt, projected on the radial direction: Γʳ_tt = Γⁱ_tt
        // ∂r/∂xⁱ = Γⁱ_tt xⁱ/r. Times c² for the two timelike legs.
        let mut numerical_gravity = Grid::<f64>::new(space);
        {
            let gamma_ull = system.christoffels();
            numerical_gravity.par_fill(|index| {
                let x = bounds.cell_center(space.size(), index);
                let r = (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt();

                let mut result = 0.0;
                for i in 0..3 {
                    result += gamma_ull[index][[i + 1, 0, 0]] * x[i] / r;
                }
                result * C * C
            });
        }

        // The enclosed-mass Schwarzschild connection Γʳ_tt, m/s².
        let mut analytical_gravity = Grid::<f64>::new(space);
        {
            let body = *body;
            analytical_gravity.par_fill(|index| {
                let x = bounds.cell_center(space.size(), index);
                let r = (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt();
                let m = body.enclosed_mass(r);

                // Matter derivatives dm/dr are dropped; with them the
                // analytical profile disagrees with the lapse choice.
                let dm_dr = 0.0;
                (2.0 * m * (r - 2.0 * m) + 2.0 * dm_dr * r * (2.0 * m - r)) / (2.0 * r.powi(3))
                    * C
                    * C
            });
        }

        Self {
            efe,
            numerical_gravity,
            analytical_gravity,
        }
    }

    pub fn efe(&self) -> &Grid<Sym4> {
        &self.efe
    }

    pub fn numerical_gravity(&self) -> &Grid<f64> {
        &self.numerical_gravity
    }

    pub fn analytical_gravity(&self) -> &Grid<f64> {
        &self.analytical_gravity
    }

    /// The tt component of the constraint in density-equivalent g/cm³: in
    /// the absence of curvature error it matches the source density.
    pub fn efe_tt_density(&self, index: [usize; 3]) -> f64 {
        curvature_to_density_cgs(self.efe[index][[0, 0]])
    }

    /// Writes the tab-separated observable table, one row per cell.
    pub fn write_table(
        &self,
        path: &Path,
        system: &EfeSystem,
        prims: &Grid<MetricPrims>,
    ) -> eyre::Result<()> {
        let space = system.space();

        let file = std::fs::File::create(path)
            .wrap_err_with(|| format!("failed to open output file {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);

        let names = [
            "ix",
            "iy",
            "iz",
            "rho",
            "det-1",
            "alpha-1",
            "gravity",
            "analyticalGravity",
            "EFE_tt(g/cm^3)",
            "EFE_ti",
            "EFE_ij",
            "G_ab",
        ];
        writeln!(out, "#{}", names.join("\t"))?;

        for index in space.iterate() {
            let prim = &prims[index];
            let efe = &self.efe[index];

            // |F_ti| across the three momentum constraints, times c.
            let efe_ti = (efe[[0, 1]] * efe[[0, 1]]
                + efe[[0, 2]] * efe[[0, 2]]
                + efe[[0, 3]] * efe[[0, 3]])
                .sqrt()
                * C;

            // Frobenius norm of the stress block.
            let mut efe_ij = 0.0;
            for a in 1..4 {
                for b in 1..4 {
                    efe_ij += efe[[a, b]] * efe[[a, b]];
                }
            }
            let efe_ij = efe_ij.sqrt();

            // Frobenius norm of the full Einstein tensor.
            let einstein = system.einstein_at(index);
            let mut g_norm = 0.0;
            for a in 0..4 {
                for b in 0..4 {
                    g_norm += einstein[[a, b]] * einstein[[a, b]];
                }
            }
            let g_norm = g_norm.sqrt();

            let columns = [
                index[0] as f64,
                index[1] as f64,
                index[2] as f64,
                system.sources()[index].rho,
                prim.gamma_ll.determinant() - 1.0,
                prim.alpha - 1.0,
                self.numerical_gravity[index],
                self.analytical_gravity[index],
                self.efe_tt_density(index),
                efe_ti,
                efe_ij,
                g_norm,
            ];

            let row = columns
                .iter()
                .map(|v| format!("{v:.16e}"))
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(out, "{row}")?;
        }

        out.flush()?;
        Ok(())
    }

    /// Prints the EFE_tt range and a 256-bin histogram to stdout.
    pub fn print_tt_distribution(&self, system: &EfeSystem) {
        let space = system.space();

        let mut tt_min = f64::INFINITY;
        let mut tt_max = f64::NEG_INFINITY;
        for index in space.iterate() {
            let tt = self.efe[index][[0, 0]];
            tt_min = tt_min.min(tt);
            tt_max = tt_max.max(tt);
        }
        println!("EFE_tt range: {tt_min} to {tt_max}");

        if tt_max <= tt_min {
            return;
        }

        let bins = 256;
        let mut distribution = vec![0usize; bins];
        for index in space.iterate() {
            let tt = self.efe[index][[0, 0]];
            let bin = (((tt - tt_min) / (tt_max - tt_min)) * bins as f64) as usize;
            distribution[bin.min(bins - 1)] += 1;
        }

        println!("EFE_tt:");
        let edges: Vec<f64> = lin_range(tt_min, tt_max, bins + 1).collect();
        for (i, count) in distribution.iter().enumerate() {
            println!("{}\t{}\t{}", edges[i], edges[i + 1], count);
        }
    }
}

/// The worst residual component over the whole slice.
pub fn max_abs_component(efe: &Grid<Sym4>) -> f64 {
    efe.as_flat().iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
}
