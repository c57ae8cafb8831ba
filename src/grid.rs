//! A 3-D rectangular lattice of cells with parallel per-cell iteration.

use crate::geometry::IndexSpace;
use rayon::prelude::*;
use std::ops::{Index, IndexMut};

/// Marker for `#[repr(C)]` cell types whose memory layout is exactly
/// `REALS` consecutive `f64`s, so that a grid of them can be viewed as a
/// flat solver vector and back without copying.
///
/// # Safety
/// Implementors must be `#[repr(C)]` (or transparent) aggregates of `f64`
/// with no padding, and `std::mem::size_of::<Self>()` must equal
/// `REALS * 8`.
pub unsafe trait FlatCell: Copy + Default + Send + Sync + 'static {
    const REALS: usize;
}

/// A dense grid of cells over a 3-D index space, linearized row-major
/// (first axis fastest).
#[derive(Debug, Clone)]
pub struct Grid<T> {
    space: IndexSpace<3>,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(space: IndexSpace<3>) -> Self {
        Self {
            space,
            data: vec![T::default(); space.len()],
        }
    }
}

impl<T> Grid<T> {
    pub fn space(&self) -> IndexSpace<3> {
        self.space
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Heap footprint of the cell buffer in bytes.
    pub fn heap_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }
}

impl<T: Send + Sync> Grid<T> {
    /// Overwrites every cell with `f(index)` on the worker pool. `f` may
    /// read any other grid but must depend only on its own index; each
    /// worker writes only the cell it is indexed at.
    pub fn par_fill(&mut self, f: impl Fn([usize; 3]) -> T + Sync) {
        let space = self.space;

        self.data
            .par_iter_mut()
            .enumerate()
            .for_each(|(linear, cell)| {
                *cell = f(space.cartesian_from_linear(linear));
            });
    }
}

/// Overwrites three same-shaped grids in one parallel pass, for stages that
/// produce several outputs per cell. Same contract as [`Grid::par_fill`].
pub fn par_fill3<A, B, C>(
    a: &mut Grid<A>,
    b: &mut Grid<B>,
    c: &mut Grid<C>,
    f: impl Fn([usize; 3]) -> (A, B, C) + Sync,
) where
    A: Send + Sync,
    B: Send + Sync,
    C: Send + Sync,
{
    let space = a.space;
    assert_eq!(space, b.space);
    assert_eq!(space, c.space);

    a.data
        .par_iter_mut()
        .zip_eq(b.data.par_iter_mut())
        .zip_eq(c.data.par_iter_mut())
        .enumerate()
        .for_each(|(linear, ((cell_a, cell_b), cell_c))| {
            let (ra, rb, rc) = f(space.cartesian_from_linear(linear));
            *cell_a = ra;
            *cell_b = rb;
            *cell_c = rc;
        });
}

impl<T> Index<[usize; 3]> for Grid<T> {
    type Output = T;

    fn index(&self, index: [usize; 3]) -> &Self::Output {
        &self.data[self.space.linear_from_cartesian(index)]
    }
}

impl<T> IndexMut<[usize; 3]> for Grid<T> {
    fn index_mut(&mut self, index: [usize; 3]) -> &mut Self::Output {
        &mut self.data[self.space.linear_from_cartesian(index)]
    }
}

impl<T: FlatCell> Grid<T> {
    /// Views the cell buffer as a flat vector of reals, in the per-cell
    /// field order of `T`.
    pub fn as_flat(&self) -> &[f64] {
        unsafe {
            std::slice::from_raw_parts(self.data.as_ptr() as *const f64, self.len() * T::REALS)
        }
    }

    pub fn as_flat_mut(&mut self) -> &mut [f64] {
        let len = self.len() * T::REALS;
        unsafe { std::slice::from_raw_parts_mut(self.data.as_mut_ptr() as *mut f64, len) }
    }
}

/// A borrowed grid view over a flat solver vector. The vector's layout must
/// be cell-major with `T::REALS` reals per cell.
#[derive(Clone, Copy)]
pub struct GridView<'a, T> {
    space: IndexSpace<3>,
    data: &'a [T],
}

impl<'a, T: FlatCell> GridView<'a, T> {
    pub fn from_flat(flat: &'a [f64], space: IndexSpace<3>) -> Self {
        assert_eq!(flat.len(), space.len() * T::REALS);

        let data = unsafe { std::slice::from_raw_parts(flat.as_ptr() as *const T, space.len()) };

        Self { space, data }
    }

    pub fn space(&self) -> IndexSpace<3> {
        self.space
    }
}

impl<'a, T> Index<[usize; 3]> for GridView<'a, T> {
    type Output = T;

    fn index(&self, index: [usize; 3]) -> &Self::Output {
        &self.data[self.space.linear_from_cartesian(index)]
    }
}

/// A mutable grid view over a flat solver vector.
pub struct GridViewMut<'a, T> {
    space: IndexSpace<3>,
    data: &'a mut [T],
}

impl<'a, T: FlatCell> GridViewMut<'a, T> {
    pub fn from_flat(flat: &'a mut [f64], space: IndexSpace<3>) -> Self {
        assert_eq!(flat.len(), space.len() * T::REALS);

        let data =
            unsafe { std::slice::from_raw_parts_mut(flat.as_mut_ptr() as *mut T, space.len()) };

        Self { space, data }
    }

    pub fn space(&self) -> IndexSpace<3> {
        self.space
    }
}

impl<'a, T: Send + Sync> GridViewMut<'a, T> {
    /// Parallel overwrite, identical in contract to [`Grid::par_fill`].
    pub fn par_fill(&mut self, f: impl Fn([usize; 3]) -> T + Sync) {
        let space = self.space;

        self.data
            .par_iter_mut()
            .enumerate()
            .for_each(|(linear, cell)| {
                *cell = f(space.cartesian_from_linear(linear));
            });
    }
}

impl<'a, T> Index<[usize; 3]> for GridViewMut<'a, T> {
    type Output = T;

    fn index(&self, index: [usize; 3]) -> &Self::Output {
        &self.data[self.space.linear_from_cartesian(index)]
    }
}

impl<'a, T> IndexMut<[usize; 3]> for GridViewMut<'a, T> {
    fn index_mut(&mut self, index: [usize; 3]) -> &mut Self::Output {
        &mut self.data[self.space.linear_from_cartesian(index)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    #[repr(C)]
    struct Pair {
        a: f64,
        b: f64,
    }

    unsafe impl FlatCell for Pair {
        const REALS: usize = 2;
    }

    #[test]
    fn par_fill_indexes_every_cell() {
        let space = IndexSpace::new([3, 4, 5]);
        let mut grid = Grid::<f64>::new(space);

        grid.par_fill(|[i, j, k]| (i + 10 * j + 100 * k) as f64);

        for index in space.iterate() {
            assert_eq!(grid[index], (index[0] + 10 * index[1] + 100 * index[2]) as f64);
        }
    }

    #[test]
    fn flat_views_alias_cells() {
        let space = IndexSpace::cubic(2);
        let mut grid = Grid::<Pair>::new(space);
        grid[[1, 0, 0]] = Pair { a: 1.0, b: 2.0 };

        let flat = grid.as_flat();
        assert_eq!(flat.len(), 16);
        assert_eq!(flat[2], 1.0);
        assert_eq!(flat[3], 2.0);

        let view = GridView::<Pair>::from_flat(flat, space);
        assert_eq!(view[[1, 0, 0]], Pair { a: 1.0, b: 2.0 });
    }
}
