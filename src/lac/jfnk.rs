use super::{norm, Gmres, GmresConfig, LinearMap, LinearSolver, Outcome, SolveReport};

/// A nonlinear vector function F whose zero the Newton–Krylov driver seeks.
pub trait NonlinearMap {
    fn dimension(&self) -> usize;

    /// y ← F(x).
    fn apply(&mut self, x: &[f64], y: &mut [f64]);

    /// Norm used for convergence tests and reporting. L2 by default;
    /// problems override this to report in more meaningful units.
    fn residual_norm(&mut self, r: &[f64]) -> f64 {
        norm(r)
    }

    /// Invoked once per outer iteration. Returning true requests stop.
    fn callback(&mut self, iteration: usize, residual: f64, alpha: f64) -> bool {
        let _ = (iteration, residual, alpha);
        false
    }

    /// Invoked once per inner (Krylov) iteration. Returning true requests
    /// stop of the inner solve.
    fn inner_callback(&mut self, iteration: usize, residual: f64) -> bool {
        let _ = (iteration, residual);
        false
    }
}

/// Line search strategies along the Newton step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSearch {
    /// Take the full step without evaluating it.
    None,
    /// Evaluate the full step once and accept it regardless.
    Linear,
    /// Halve the step scale from `max_alpha` until the residual decreases.
    Bisect,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct JfnkConfig {
    pub max_iterations: usize,
    /// Stop when the reported residual norm falls below this.
    pub tolerance: f64,
    /// Finite-difference scale for the Jacobian action.
    pub jacobian_epsilon: f64,
    /// Upper bound of the step scale.
    pub max_alpha: f64,
    pub line_search: LineSearch,
    pub line_search_max_iter: usize,
    pub gmres: GmresConfig,
}

impl Default for JfnkConfig {
    fn default() -> Self {
        Self {
            max_iterations: usize::MAX,
            tolerance: 1e-7,
            jacobian_epsilon: 1e-6,
            max_alpha: 1.0,
            line_search: LineSearch::Bisect,
            line_search_max_iter: 20,
            gmres: GmresConfig::default(),
        }
    }
}

/// The Jacobian action J(x)·v ≈ (F(x + εv) − F(x)) / ε, presented to the
/// inner Krylov solver as a black-box linear map.
struct JacobianMap<'a, M> {
    map: &'a mut M,
    x0: &'a [f64],
    f0: &'a [f64],
    epsilon: f64,
    perturbed: Vec<f64>,
}

impl<'a, M: NonlinearMap> LinearMap for JacobianMap<'a, M> {
    fn dimension(&self) -> usize {
        self.map.dimension()
    }

    fn apply(&mut self, src: &[f64], dest: &mut [f64]) {
        for i in 0..self.perturbed.len() {
            self.perturbed[i] = self.x0[i] + self.epsilon * src[i];
        }

        self.map.apply(&self.perturbed, dest);

        for i in 0..dest.len() {
            dest[i] = (dest[i] - self.f0[i]) / self.epsilon;
        }
    }

    fn callback(&mut self, iteration: usize, residual: f64) -> bool {
        self.map.inner_callback(iteration, residual)
    }
}

/// Jacobian-free Newton–Krylov driver over a [`NonlinearMap`].
pub struct Jfnk {
    dimension: usize,
    config: JfnkConfig,
    gmres: Gmres,

    f: Vec<f64>,
    rhs: Vec<f64>,
    step: Vec<f64>,
    x_trial: Vec<f64>,
    f_trial: Vec<f64>,
}

impl Jfnk {
    pub fn new(dimension: usize, config: JfnkConfig) -> Self {
        Self {
            dimension,
            config,
            gmres: Gmres::new(dimension, config.gmres),

            f: vec![0.0; dimension],
            rhs: vec![0.0; dimension],
            step: vec![0.0; dimension],
            x_trial: vec![0.0; dimension],
            f_trial: vec![0.0; dimension],
        }
    }

    /// Installs a left preconditioner on the inner solver.
    pub fn set_preconditioner(&mut self, precondition: super::Preconditioner) {
        self.gmres.set_preconditioner(precondition);
    }

    /// Drives F(x) towards zero. On return `x` holds the last accepted
    /// iterate, whatever the outcome: non-convergence is reported, not
    /// fatal.
    pub fn solve<M: NonlinearMap>(&mut self, map: &mut M, x: &mut [f64]) -> SolveReport {
        assert_eq!(x.len(), self.dimension);

        map.apply(x, &mut self.f);
        let mut residual = map.residual_norm(&self.f);
        let mut alpha = self.config.max_alpha;

        let mut iter = 0;
        let mut outcome = Outcome::MaxIterations;

        while iter < self.config.max_iterations {
            if map.callback(iter, residual, alpha) {
                outcome = Outcome::Stopped;
                break;
            }

            if residual < self.config.tolerance {
                outcome = Outcome::Converged;
                break;
            }

            // Inner solve: J(x) Δx = −F(x).
            for i in 0..self.dimension {
                self.rhs[i] = -self.f[i];
            }
            self.step.fill(0.0);

            let jacobian = JacobianMap {
                map: &mut *map,
                x0: &*x,
                f0: &self.f,
                epsilon: self.config.jacobian_epsilon,
                perturbed: vec![0.0; self.dimension],
            };
            self.gmres.solve(jacobian, &self.rhs, &mut self.step);

            // Line search along the step.
            match self.line_search(map, x, residual) {
                Some((accepted_alpha, trial_residual)) => {
                    alpha = accepted_alpha;
                    for i in 0..self.dimension {
                        x[i] = self.x_trial[i];
                    }
                    self.f.clone_from_slice(&self.f_trial);
                    residual = trial_residual;
                }
                None => {
                    // Bisection exhausted without a reduction; keep the
                    // last accepted x and stop.
                    outcome = Outcome::StepRejected;
                    iter += 1;
                    break;
                }
            }

            iter += 1;
        }

        if residual < self.config.tolerance {
            outcome = Outcome::Converged;
        }

        SolveReport {
            iterations: iter,
            residual,
            outcome,
        }
    }

    /// Evaluates x + α Δx for the configured strategy. Returns the accepted
    /// (α, residual), or None if every trial failed to reduce the residual.
    fn line_search<M: NonlinearMap>(
        &mut self,
        map: &mut M,
        x: &[f64],
        current_residual: f64,
    ) -> Option<(f64, f64)> {
        let mut alpha = self.config.max_alpha;

        match self.config.line_search {
            LineSearch::None | LineSearch::Linear => {
                self.try_step(map, x, alpha);
                let trial = map.residual_norm(&self.f_trial);
                Some((alpha, trial))
            }
            LineSearch::Bisect => {
                for _ in 0..self.config.line_search_max_iter {
                    self.try_step(map, x, alpha);
                    let trial = map.residual_norm(&self.f_trial);

                    if trial < current_residual {
                        return Some((alpha, trial));
                    }

                    alpha *= 0.5;
                }

                None
            }
        }
    }

    fn try_step<M: NonlinearMap>(&mut self, map: &mut M, x: &[f64], alpha: f64) {
        for i in 0..self.dimension {
            self.x_trial[i] = x[i] + alpha * self.step[i];
        }
        map.apply(&self.x_trial, &mut self.f_trial);
    }
}
