//! Centered finite differencing of cell-valued fields.
//!
//! Edges are handled by clamping the sampled index into the grid rather
//! than switching to one-sided stencils, so derivatives at boundary cells
//! have reduced accuracy.

use crate::geometry::IndexSpace;
use std::ops::{Add, Mul, Sub};

mod stencil;

pub use stencil::Stencil;

/// Supported centered stencil orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Order {
    Two,
    Four,
    Six,
    Eight,
}

impl Order {
    pub fn from_int(order: usize) -> Option<Self> {
        match order {
            2 => Some(Order::Two),
            4 => Some(Order::Four),
            6 => Some(Order::Six),
            8 => Some(Order::Eight),
            _ => None,
        }
    }

    /// Half-width of the stencil in cells.
    pub fn radius(self) -> usize {
        match self {
            Order::Two => 1,
            Order::Four => 2,
            Order::Six => 3,
            Order::Eight => 4,
        }
    }

    /// Positive-offset half of the centered first-derivative weights,
    /// w₁..w_p. The full stencil is antisymmetric with zero center weight.
    pub fn weights(self) -> &'static [f64] {
        match self {
            Order::Two => &[1.0 / 2.0],
            Order::Four => &[2.0 / 3.0, -1.0 / 12.0],
            Order::Six => &[3.0 / 4.0, -3.0 / 20.0, 1.0 / 60.0],
            Order::Eight => &[4.0 / 5.0, -1.0 / 5.0, 4.0 / 105.0, -1.0 / 280.0],
        }
    }
}

impl Default for Order {
    fn default() -> Self {
        Order::Eight
    }
}

/// Computes ∂ₖf at `index` along each of the three spatial axes, returning
/// one payload per axis (a prepended lower spatial index). The sampling
/// closure receives clamped cell indices and so never sees an out-of-range
/// index.
pub fn partial_derivative<T, F>(
    order: Order,
    space: IndexSpace<3>,
    index: [usize; 3],
    dx: [f64; 3],
    sample: F,
) -> [T; 3]
where
    T: Copy + Default + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>,
    F: Fn([usize; 3]) -> T,
{
    let weights = order.weights();

    std::array::from_fn(|axis| {
        let mut result = T::default();

        for (s, &weight) in weights.iter().enumerate() {
            let mut fwd = [index[0] as isize, index[1] as isize, index[2] as isize];
            let mut bwd = fwd;
            fwd[axis] += s as isize + 1;
            bwd[axis] -= s as isize + 1;

            // Antisymmetric centered stencil: w₋ₛ = −wₛ.
            let diff = sample(space.clamp(fwd)) - sample(space.clamp(bwd));
            result = result + diff * weight;
        }

        result * (1.0 / dx[axis])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::rational::Rational64 as Ratio;
    use num::{ToPrimitive, Zero};

    fn check_weights<const M: usize>(order: Order) {
        let exact = Stencil::<M>::centered().derivative_weights(Ratio::zero());
        let table = order.weights();
        let p = order.radius();

        for s in 1..=p {
            assert_eq!(exact[p + s].to_f64().unwrap(), table[s - 1]);
            assert_eq!(exact[p - s].to_f64().unwrap(), -table[s - 1]);
        }
        assert_eq!(exact[p], Ratio::zero());
    }

    /// The hard-coded tables must agree with the Lagrange generator.
    #[test]
    fn weight_tables_match_lagrange_stencils() {
        check_weights::<3>(Order::Two);
        check_weights::<5>(Order::Four);
        check_weights::<7>(Order::Six);
        check_weights::<9>(Order::Eight);
    }

    #[test]
    fn differentiates_polynomials_exactly() {
        // Order 2p is exact on polynomials up to degree 2p; test x³ with
        // the sixth-order stencil on interior cells.
        let space = IndexSpace::new([16, 1, 1]);
        let dx = [0.5, 1.0, 1.0];
        let f = |i: [usize; 3]| {
            let x = i[0] as f64 * dx[0];
            x * x * x
        };

        for i in 3..13 {
            let [ddx, _, _] = partial_derivative(Order::Six, space, [i, 0, 0], dx, f);
            let x = i as f64 * dx[0];
            assert!((ddx - 3.0 * x * x).abs() < 1e-9);
        }
    }

    #[test]
    fn constant_fields_have_zero_derivative() {
        let space = IndexSpace::cubic(4);

        for index in space.iterate() {
            let d = partial_derivative(Order::Eight, space, index, [1.0; 3], |_| 7.0);
            assert_eq!(d, [0.0, 0.0, 0.0]);
        }
    }
}
