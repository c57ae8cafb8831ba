//! EFE solver drivers: the default Jacobian-free Newton–Krylov driver and
//! the diagnostic pure-Krylov drivers over the same constraint.
//!
//! The pure-Krylov drivers treat G_ab(x) as if it were a linear operator
//! against the fixed right-hand side 8πT_ab(x⁰). Because T depends on the
//! metric being solved for, and a flat initial guess sends G_ab(x) to zero
//! (giving a singular Arnoldi basis), they do not converge in general and
//! are kept for diagnostics only.

use crate::efe::EfeSystem;
use crate::grid::Grid;
use crate::lac::{
    norm, ConjGrad, ConjRes, Gmres, Jfnk, JfnkConfig, LinearMap, LinearSolver, NonlinearMap,
    SolveReport,
};
use crate::prims::MetricPrims;
use crate::units::curvature_to_density_cgs;

/// The closed set of solver drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Jfnk,
    Gmres,
    ConjRes,
    ConjGrad,
}

impl SolverKind {
    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Jfnk => "jfnk",
            SolverKind::Gmres => "gmres",
            SolverKind::ConjRes => "conjres",
            SolverKind::ConjGrad => "conjgrad",
        }
    }
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jfnk" => Ok(SolverKind::Jfnk),
            "gmres" => Ok(SolverKind::Gmres),
            "conjres" => Ok(SolverKind::ConjRes),
            "conjgrad" => Ok(SolverKind::ConjGrad),
            other => Err(format!("unknown solver \"{other}\"")),
        }
    }
}

/// Per-iteration hooks for logging and cooperative cancellation. Returning
/// true from either requests early termination.
#[derive(Default)]
pub struct SolverCallbacks<'a> {
    /// (outer iteration, residual in g/cm³, step scale α).
    pub outer: Option<&'a mut dyn FnMut(usize, f64, f64) -> bool>,
    /// (outer iteration, inner iteration, inner L2 residual).
    pub inner: Option<&'a mut dyn FnMut(usize, usize, f64) -> bool>,
}

/// The EFE constraint presented to the Newton–Krylov driver.
struct EfeProblem<'a, 'b> {
    system: &'a mut EfeSystem,
    callbacks: &'a mut SolverCallbacks<'b>,
    outer_iteration: usize,
}

impl NonlinearMap for EfeProblem<'_, '_> {
    fn dimension(&self) -> usize {
        self.system.dofs()
    }

    fn apply(&mut self, x: &[f64], y: &mut [f64]) {
        self.system.residual(x, y);
    }

    /// Residuals are reported in density-equivalent units, g/cm³: in the
    /// absence of curvature error the tt constraint matches the source
    /// density, which makes the number humanly interpretable.
    fn residual_norm(&mut self, r: &[f64]) -> f64 {
        curvature_to_density_cgs(norm(r))
    }

    fn callback(&mut self, iteration: usize, residual: f64, alpha: f64) -> bool {
        self.outer_iteration = iteration;
        log::trace!("jfnk iter={iteration} alpha={alpha} residual={residual:.6e}");

        match &mut self.callbacks.outer {
            Some(hook) => hook(iteration, residual, alpha),
            None => false,
        }
    }

    fn inner_callback(&mut self, iteration: usize, residual: f64) -> bool {
        log::trace!(
            "gmres outer={} iter={iteration} residual={residual:.6e}",
            self.outer_iteration
        );

        match &mut self.callbacks.inner {
            Some(hook) => hook(self.outer_iteration, iteration, residual),
            None => false,
        }
    }
}

/// The curvature side G_ab(x) viewed as a linear operator, for the
/// diagnostic drivers.
struct EinsteinOperator<'a, 'b> {
    system: &'a mut EfeSystem,
    callbacks: &'a mut SolverCallbacks<'b>,
}

impl LinearMap for EinsteinOperator<'_, '_> {
    fn dimension(&self) -> usize {
        self.system.dofs()
    }

    fn apply(&mut self, src: &[f64], dest: &mut [f64]) {
        self.system.einstein_apply(src, dest);
    }

    fn callback(&mut self, iteration: usize, residual: f64) -> bool {
        log::trace!("krylov iter={iteration} residual={residual:.6e}");

        match &mut self.callbacks.inner {
            Some(hook) => hook(0, iteration, residual),
            None => false,
        }
    }
}

/// Runs the selected driver on the primitive grid in place, returning how
/// the iteration ended. Non-convergence is not an error: the grid holds the
/// best iterate found and the caller reports the final residual.
pub fn solve(
    kind: SolverKind,
    system: &mut EfeSystem,
    prims: &mut Grid<MetricPrims>,
    config: JfnkConfig,
    callbacks: &mut SolverCallbacks<'_>,
) -> SolveReport {
    let n = system.dofs();
    assert_eq!(prims.space(), system.space());

    match kind {
        SolverKind::Jfnk => {
            let mut jfnk = Jfnk::new(n, config);
            // The scalar rescale keeps inner residuals in the same
            // density-equivalent units as the outer loop.
            jfnk.set_preconditioner(Box::new(|src, dest| {
                for i in 0..src.len() {
                    dest[i] = curvature_to_density_cgs(src[i]);
                }
            }));

            let mut problem = EfeProblem {
                system,
                callbacks,
                outer_iteration: 0,
            };

            jfnk.solve(&mut problem, prims.as_flat_mut())
        }
        SolverKind::Gmres | SolverKind::ConjRes | SolverKind::ConjGrad => {
            let x = prims.as_flat_mut();
            let b = system.stress_energy_flat(x);

            let operator = EinsteinOperator { system, callbacks };
            let tolerance = config.gmres.tolerance;

            match kind {
                SolverKind::Gmres => {
                    let mut solver = Gmres::new(n, config.gmres);
                    solver.solve(operator, &b, x)
                }
                SolverKind::ConjRes => ConjRes::new(n, n, tolerance).solve(operator, &b, x),
                SolverKind::ConjGrad => ConjGrad::new(n, n, tolerance).solve(operator, &b, x),
                SolverKind::Jfnk => unreachable!(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fd::Order;
    use crate::geometry::IndexSpace;

    #[test]
    fn solver_names_round_trip() {
        for kind in [
            SolverKind::Jfnk,
            SolverKind::Gmres,
            SolverKind::ConjRes,
            SolverKind::ConjGrad,
        ] {
            assert_eq!(kind.name().parse::<SolverKind>().unwrap(), kind);
        }
        assert!("bicgstab".parse::<SolverKind>().is_err());
    }

    /// With a flat vacuum start the residual is already zero, so the outer
    /// loop must converge without taking a step.
    #[test]
    fn jfnk_accepts_an_exact_initial_guess() {
        let space = IndexSpace::cubic(3);
        let mut system = EfeSystem::new(
            space,
            [1.0; 3],
            Order::Two,
            Grid::new(space),
            Grid::new(space),
        );

        let mut prims = Grid::<MetricPrims>::new(space);
        prims.par_fill(|_| MetricPrims::flat());

        let mut callbacks = SolverCallbacks::default();
        let report = solve(
            SolverKind::Jfnk,
            &mut system,
            &mut prims,
            JfnkConfig {
                max_iterations: 4,
                ..Default::default()
            },
            &mut callbacks,
        );

        assert!(report.converged());
        assert_eq!(report.iterations, 0);
        assert_eq!(prims[[1, 1, 1]], MetricPrims::flat());
    }
}
