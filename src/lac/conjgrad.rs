use super::{dot, norm, LinearMap, LinearSolver, Outcome, SolveReport};

/// Implementation of the conjugate gradient method. Requires a symmetric
/// positive definite operator; on the EFE constraint it is kept only as a
/// diagnostic driver.
pub struct ConjGrad {
    max_iterations: usize,
    tolerance: f64,
    dimension: usize,

    rg: Vec<f64>,
    pg: Vec<f64>,
    ap: Vec<f64>,
}

impl ConjGrad {
    pub fn new(dimension: usize, max_iterations: usize, tolerance: f64) -> Self {
        Self {
            dimension,
            max_iterations,
            tolerance,

            rg: vec![0.0; dimension],
            pg: vec![0.0; dimension],
            ap: vec![0.0; dimension],
        }
    }
}

impl LinearSolver for ConjGrad {
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

        let mut rr = dot(&self.rg, &self.rg);
        let mut residual = rr.sqrt();
        let mut outcome = Outcome::MaxIterations;
        let mut iter = 0;

        while iter < self.max_iterations {
            if residual <= self.tolerance {
                outcome = Outcome::Converged;
                break;
            }

            map.apply(&self.pg, &mut self.ap);

            let curvature = dot(&self.pg, &self.ap);
            if curvature == 0.0 {
                outcome = Outcome::Breakdown;
                break;
            }

            let step = rr / curvature;
            for i in 0..self.dimension {
                solution[i] += step * self.pg[i];
                self.rg[i] -= step * self.ap[i];
            }

            let rr_next = dot(&self.rg, &self.rg);
            let direction = rr_next / rr;
            rr = rr_next;
            residual = norm(&self.rg);

            for i in 0..self.dimension {
                self.pg[i] = self.rg[i] + direction * self.pg[i];
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
