use super::{dot, norm, LinearMap, LinearSolver, Outcome, SolveReport};

/// A left preconditioner applied to residual vectors before they enter the
/// Arnoldi process. The solver treats it as a black box.
pub type Preconditioner = Box<dyn FnMut(&[f64], &mut [f64]) + Send>;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct GmresConfig {
    /// Krylov subspace dimension before a restart.
    pub restart: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for GmresConfig {
    fn default() -> Self {
        Self {
            restart: 10,
            max_iterations: 0, // 0 means the problem dimension
            tolerance: 1e-7,
        }
    }
}

impl GmresConfig {
    fn iteration_cap(&self, dimension: usize) -> usize {
        if self.max_iterations == 0 {
            dimension
        } else {
            self.max_iterations
        }
    }
}

/// Implementation of restarted GMRES with Givens-rotation least squares.
///
/// Breakdown (a vanishing Arnoldi vector) terminates gracefully with the
/// last residual, and a residual that repeats bitwise across successive
/// iterations for longer than the problem dimension is treated as a stall,
/// so an ill-conditioned operator cannot spin forever.
pub struct Gmres {
    dimension: usize,
    config: GmresConfig,
    precondition: Option<Preconditioner>,

    // Arnoldi basis and Hessenberg factorization workspace.
    basis: Vec<Vec<f64>>,
    hessenberg: Vec<Vec<f64>>,
    givens_cos: Vec<f64>,
    givens_sin: Vec<f64>,
    rhs_rot: Vec<f64>,
    residual_vec: Vec<f64>,
    scratch: Vec<f64>,
}

impl Gmres {
    pub fn new(dimension: usize, config: GmresConfig) -> Self {
        assert!(config.restart >= 1, "gmres restart length must be positive");
        let m = config.restart;

        Self {
            dimension,
            config,
            precondition: None,

            basis: vec![vec![0.0; dimension]; m + 1],
            hessenberg: vec![vec![0.0; m + 1]; m],
            givens_cos: vec![0.0; m],
            givens_sin: vec![0.0; m],
            rhs_rot: vec![0.0; m + 1],
            residual_vec: vec![0.0; dimension],
            scratch: vec![0.0; dimension],
        }
    }

    /// Installs a left preconditioner M⁻¹.
    pub fn set_preconditioner(&mut self, precondition: Preconditioner) {
        self.precondition = Some(precondition);
    }

    /// r ← M⁻¹ v, or a plain copy without a preconditioner.
    fn preconditioned(&mut self, v: &[f64], dest_is_residual: bool) {
        let dest = if dest_is_residual {
            &mut self.residual_vec
        } else {
            &mut self.scratch
        };

        match &mut self.precondition {
            Some(m_inv) => m_inv(v, dest),
            None => dest.clone_from_slice(v),
        }
    }

    /// Accumulates the minimizer of the current least-squares problem into
    /// `solution`, using `k` Arnoldi columns.
    fn update_solution(&mut self, k: usize, solution: &mut [f64]) {
        if k == 0 {
            return;
        }

        // Back substitution on the rotated Hessenberg system.
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut value = self.rhs_rot[i];
            for j in (i + 1)..k {
                value -= self.hessenberg[j][i] * y[j];
            }
            y[i] = value / self.hessenberg[i][i];
        }

        for (j, yj) in y.iter().enumerate() {
            for i in 0..self.dimension {
                solution[i] += yj * self.basis[j][i];
            }
        }
    }
}

impl LinearSolver for Gmres {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn solve<M: LinearMap>(
        &mut self,
        mut map: M,
        rhs: &[f64],
        solution: &mut [f64],
    ) -> SolveReport {
        let n = self.dimension;
        let m = self.config.restart;
        let max_iterations = self.config.iteration_cap(n);

        let mut iter = 0;
        let mut residual = f64::INFINITY;
        let mut last_residual = f64::NAN;
        let mut stalled_for = 0;

        'restart: loop {
            // r = M⁻¹ (b − A x)
            map.apply(solution, &mut self.scratch);
            for i in 0..n {
                self.scratch[i] = rhs[i] - self.scratch[i];
            }
            let unpreconditioned = std::mem::take(&mut self.scratch);
            self.preconditioned(&unpreconditioned, true);
            self.scratch = unpreconditioned;

            let beta = norm(&self.residual_vec);
            residual = beta;

            if beta <= self.config.tolerance {
                return SolveReport {
                    iterations: iter,
                    residual,
                    outcome: Outcome::Converged,
                };
            }

            for i in 0..n {
                self.basis[0][i] = self.residual_vec[i] / beta;
            }
            self.rhs_rot.fill(0.0);
            self.rhs_rot[0] = beta;

            for k in 0..m {
                if iter >= max_iterations {
                    self.update_solution(k, solution);
                    return SolveReport {
                        iterations: iter,
                        residual,
                        outcome: Outcome::MaxIterations,
                    };
                }

                // w = M⁻¹ A v_k
                let v_k = std::mem::take(&mut self.basis[k]);
                map.apply(&v_k, &mut self.residual_vec);
                self.basis[k] = v_k;
                let applied = std::mem::take(&mut self.residual_vec);
                self.preconditioned(&applied, false);
                self.residual_vec = applied;

                // Modified Gram-Schmidt against the basis built so far.
                for j in 0..=k {
                    let h = dot(&self.scratch, &self.basis[j]);
                    self.hessenberg[k][j] = h;
                    for i in 0..n {
                        self.scratch[i] -= h * self.basis[j][i];
                    }
                }

                let h_next = norm(&self.scratch);
                self.hessenberg[k][k + 1] = h_next;

                if h_next == 0.0 {
                    // The subspace closed; the least-squares solution over
                    // it is exact (or the basis degenerated). Either way,
                    // report what we have.
                    self.update_solution(k, solution);
                    return SolveReport {
                        iterations: iter,
                        residual,
                        outcome: Outcome::Breakdown,
                    };
                }

                for i in 0..n {
                    self.basis[k + 1][i] = self.scratch[i] / h_next;
                }

                // Apply the accumulated Givens rotations to the new column,
                // then zero its subdiagonal with a fresh rotation.
                for j in 0..k {
                    let h0 = self.hessenberg[k][j];
                    let h1 = self.hessenberg[k][j + 1];
                    self.hessenberg[k][j] = self.givens_cos[j] * h0 + self.givens_sin[j] * h1;
                    self.hessenberg[k][j + 1] = -self.givens_sin[j] * h0 + self.givens_cos[j] * h1;
                }

                let h0 = self.hessenberg[k][k];
                let h1 = self.hessenberg[k][k + 1];
                let r = (h0 * h0 + h1 * h1).sqrt();
                self.givens_cos[k] = h0 / r;
                self.givens_sin[k] = h1 / r;
                self.hessenberg[k][k] = r;
                self.hessenberg[k][k + 1] = 0.0;

                self.rhs_rot[k + 1] = -self.givens_sin[k] * self.rhs_rot[k];
                self.rhs_rot[k] *= self.givens_cos[k];

                residual = self.rhs_rot[k + 1].abs();
                iter += 1;

                if residual == last_residual {
                    stalled_for += 1;
                } else {
                    stalled_for = 0;
                }
                last_residual = residual;

                if map.callback(iter, residual) {
                    self.update_solution(k + 1, solution);
                    return SolveReport {
                        iterations: iter,
                        residual,
                        outcome: Outcome::Stopped,
                    };
                }

                if stalled_for > n {
                    self.update_solution(k + 1, solution);
                    return SolveReport {
                        iterations: iter,
                        residual,
                        outcome: Outcome::Stalled,
                    };
                }

                if residual <= self.config.tolerance {
                    self.update_solution(k + 1, solution);
                    return SolveReport {
                        iterations: iter,
                        residual,
                        outcome: Outcome::Converged,
                    };
                }
            }

            // Restart: fold the subspace into the solution and begin again.
            self.update_solution(m, solution);

            if iter >= max_iterations {
                break 'restart;
            }
        }

        SolveReport {
            iterations: iter,
            residual,
            outcome: Outcome::MaxIterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lac::IdentityMap;

    struct DenseMap {
        matrix: Vec<Vec<f64>>,
    }

    impl LinearMap for DenseMap {
        fn dimension(&self) -> usize {
            self.matrix.len()
        }

        fn apply(&mut self, src: &[f64], dest: &mut [f64]) {
            for (i, row) in self.matrix.iter().enumerate() {
                dest[i] = dot(row, src);
            }
        }
    }

    #[test]
    fn identity_converges_immediately() {
        let rhs: Vec<f64> = (0..20).map(|i| (i as f64).sin()).collect();
        let mut solution = vec![0.0; 20];

        let mut solver = Gmres::new(20, GmresConfig::default());
        let report = solver.solve(IdentityMap::new(20), &rhs, &mut solution);

        assert!(report.converged());
        for i in 0..20 {
            assert!((solution[i] - rhs[i]).abs() < 1e-7);
        }
    }

    #[test]
    fn unsymmetric_system_with_restart() {
        // A strictly diagonally dominant unsymmetric matrix.
        let n = 24;
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            matrix[i][i] = 4.0 + (i % 3) as f64;
            if i + 1 < n {
                matrix[i][i + 1] = 1.0;
            }
            if i >= 1 {
                matrix[i][i - 1] = -0.5;
            }
        }

        let exact: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let mut rhs = vec![0.0; n];
        DenseMap {
            matrix: matrix.clone(),
        }
        .apply(&exact, &mut rhs);

        let mut solution = vec![0.0; n];
        let mut solver = Gmres::new(
            n,
            GmresConfig {
                restart: 6,
                max_iterations: 500,
                tolerance: 1e-10,
            },
        );
        let report = solver.solve(DenseMap { matrix }, &rhs, &mut solution);

        assert!(report.converged());
        for i in 0..n {
            assert!((solution[i] - exact[i]).abs() < 1e-7);
        }
    }

    #[test]
    fn preconditioner_rescales_residuals() {
        // With M⁻¹ = I/4 the solver still finds the right answer.
        let rhs = vec![2.0; 12];
        let mut solution = vec![0.0; 12];

        let mut solver = Gmres::new(12, GmresConfig::default());
        solver.set_preconditioner(Box::new(|src, dest| {
            for i in 0..src.len() {
                dest[i] = src[i] / 4.0;
            }
        }));

        let report = solver.solve(IdentityMap::new(12), &rhs, &mut solution);

        assert!(report.converged());
        for &v in &solution {
            assert!((v - 2.0).abs() < 1e-7);
        }
    }

    #[test]
    fn singular_basis_terminates_gracefully() {
        // The zero operator reproduces the flat-space Krylov failure: A x
        // is identically zero, so the first Arnoldi vector vanishes.
        struct ZeroMap;
        impl LinearMap for ZeroMap {
            fn dimension(&self) -> usize {
                8
            }
            fn apply(&mut self, _src: &[f64], dest: &mut [f64]) {
                dest.fill(0.0);
            }
        }

        let rhs = vec![1.0; 8];
        let mut solution = vec![0.0; 8];

        let mut solver = Gmres::new(8, GmresConfig::default());
        let report = solver.solve(ZeroMap, &rhs, &mut solution);

        assert_eq!(report.outcome, Outcome::Breakdown);
        assert!(report.residual.is_finite());
    }
}
