use super::{dot, norm, LinearMap, LinearSolver, Outcome, SolveReport};

/// Implementation of the conjugate residual method: like conjugate
/// gradients, but minimizing the residual norm, so it tolerates symmetric
/// indefinite operators. Diagnostic driver only on the EFE constraint.
pub struct ConjRes {
    max_iterations: usize,
    tolerance: f64,
    dimension: usize,

    rg: Vec<f64>,
    ar: Vec<f64>,
    pg: Vec<f64>,
    ap: Vec<f64>,
}

impl ConjRes {
    pub fn new(dimension: usize, max_iterations: usize, tolerance: f64) -> Self {
        Self {
            dimension,
            max_iterations,
            tolerance,

            rg: vec![0.0; dimension],
            ar: vec![0.0; dimension],
            pg: vec![0.0; dimension],
            ap: vec![0.0; dimension],
        }
    }
}

impl LinearSolver for ConjRes {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn solve<M: LinearMap>(
        &mut self,
        mut map: M,
        rhs: &[f64],
        solution: &mut [f64],
    ) -> SolveReport {
        map.apply(solution, &mut self.ap);

        for i in 0..self.dimension {
            self.rg[i] = rhs[i] - self.ap[i];
        }
        self.pg.clone_from_slice(&self.rg);

        map.apply(&self.rg, &mut self.ar);
        self.ap.clone_from_slice(&self.ar);

        let mut r_ar = dot(&self.rg, &self.ar);
        let mut residual = norm(&self.rg);
        let mut outcome = Outcome::MaxIterations;
        let mut iter = 0;

        while iter < self.max_iterations {
            if residual <= self.tolerance {
                outcome = Outcome::Converged;
                break;
            }

            let ap_ap = dot(&self.ap, &self.ap);
            if ap_ap == 0.0 || r_ar == 0.0 {
                outcome = Outcome::Breakdown;
                break;
            }

            let step = r_ar / ap_ap;
            for i in 0..self.dimension {
                solution[i] += step * self.pg[i];
                self.rg[i] -= step * self.ap[i];
            }

            map.apply(&self.rg, &mut self.ar);

            let r_ar_next = dot(&self.rg, &self.ar);
            let direction = r_ar_next / r_ar;
            r_ar = r_ar_next;
            residual = norm(&self.rg);

            for i in 0..self.dimension {
                self.pg[i] = self.rg[i] + direction * self.pg[i];
            }
            // A(p) follows from linearity without another operator call.
            for i in 0..self.dimension {
                self.ap[i] = self.ar[i] + direction * self.ap[i];
            }

            iter += 1;

            if map.callback(iter, residual) {
                outcome = Outcome::Stopped;
                break;
            }
        }

        if residual <= self.tolerance {
            outcome = Outcome::Converged;
        }

        SolveReport {
            iterations: iter,
            residual,
            outcome,
        }
    }
}
