use std::array;

/// Represents a rectangular physical domain.
#[derive(Debug, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rectangle<const N: usize> {
    /// Size of the rectangle along each axis.
    #[serde(with = "crate::serde_array")]
    pub size: [f64; N],
    /// Origin of the rectangle (located at the bottom-left corner).
    #[serde(with = "crate::serde_array")]
    pub origin: [f64; N],
}

impl<const N: usize> Rectangle<N> {
    /// Constructs a rectangle from an aabb.
    pub fn from_aabb(aa: [f64; N], bb: [f64; N]) -> Self {
        let size = array::from_fn(|axis| (bb[axis] - aa[axis]).max(0.0));
        Self { size, origin: aa }
    }

    /// Computes the center of the rectangle.
    pub fn center(&self) -> [f64; N] {
        array::from_fn(|i| self.origin[i] + self.size[i] / 2.0)
    }

    /// Cell spacing when the rectangle is divided into `cells` per axis.
    pub fn spacing(&self, cells: [usize; N]) -> [f64; N] {
        array::from_fn(|i| self.size[i] / cells[i] as f64)
    }

    /// World coordinates of the center of cell `index` on a lattice of
    /// `cells` cells per axis: xᵢ = origin + (index + ½)·Δx.
    pub fn cell_center(&self, cells: [usize; N], index: [usize; N]) -> [f64; N] {
        let dx = self.spacing(cells);
        array::from_fn(|i| self.origin[i] + (index[i] as f64 + 0.5) * dx[i])
    }
}
