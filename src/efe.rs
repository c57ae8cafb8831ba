//! The Einstein-field-equation constraint map F(x) = G_ab(x) − 8π T_ab(x)
//! over the flattened primitive vector.
//!
//! All intermediate per-cell grids (g_ab, g^ab, ∂ₜg_ab, Γᵃ_bc) are
//! process-wide scratch owned here: they are rewritten on every residual
//! evaluation and never read across evaluations.

use crate::curvature::{christoffel_at, einstein_at};
use crate::fd::Order;
use crate::geometry::IndexSpace;
use crate::grid::{par_fill3, FlatCell, Grid, GridView, GridViewMut};
use crate::metric::reconstruct;
use crate::prims::{MetricPrims, StressEnergyPrims};
use crate::source::stress_energy_8pi;
use cartan_tensor::{Christoffel, Sym4};

/// The residual context: grid geometry, the read-only source grids, and the
/// scratch grids reused across evaluations.
pub struct EfeSystem {
    space: IndexSpace<3>,
    dx: [f64; 3],
    order: Order,

    dt_prims: Grid<MetricPrims>,
    sources: Grid<StressEnergyPrims>,

    g_ll: Grid<Sym4>,
    g_uu: Grid<Sym4>,
    dt_g_ll: Grid<Sym4>,
    gamma_ull: Grid<Christoffel>,
}

impl EfeSystem {
    pub fn new(
        space: IndexSpace<3>,
        dx: [f64; 3],
        order: Order,
        dt_prims: Grid<MetricPrims>,
        sources: Grid<StressEnergyPrims>,
    ) -> Self {
        assert_eq!(dt_prims.space(), space);
        assert_eq!(sources.space(), space);

        Self {
            space,
            dx,
            order,
            dt_prims,
            sources,
            g_ll: Grid::new(space),
            g_uu: Grid::new(space),
            dt_g_ll: Grid::new(space),
            gamma_ull: Grid::new(space),
        }
    }

    pub fn space(&self) -> IndexSpace<3> {
        self.space
    }

    pub fn dx(&self) -> [f64; 3] {
        self.dx
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Length of the flattened primitive (and residual) vector.
    pub fn dofs(&self) -> usize {
        self.space.len() * MetricPrims::REALS
    }

    /// Heap footprint of the owned grids, for the allocation report.
    pub fn scratch_heap_size(&self) -> usize {
        self.dt_prims.heap_size()
            + self.sources.heap_size()
            + self.g_ll.heap_size()
            + self.g_uu.heap_size()
            + self.dt_g_ll.heap_size()
            + self.gamma_ull.heap_size()
    }

    pub fn sources(&self) -> &Grid<StressEnergyPrims> {
        &self.sources
    }

    /// Mutable access for initialization; the sources are read-only during
    /// a solve.
    pub fn sources_mut(&mut self) -> &mut Grid<StressEnergyPrims> {
        &mut self.sources
    }

    /// Γᵃ_bc of the most recent [`Self::prepare`] call.
    pub fn christoffels(&self) -> &Grid<Christoffel> {
        &self.gamma_ull
    }

    /// g_ab of the most recent [`Self::prepare`] call.
    pub fn g_ll(&self) -> &Grid<Sym4> {
        &self.g_ll
    }

    /// g^ab of the most recent [`Self::prepare`] call.
    pub fn g_uu(&self) -> &Grid<Sym4> {
        &self.g_uu
    }

    /// Runs the metric-reconstruction and Christoffel stages for the given
    /// primitive vector. Each stage is a synchronization barrier; within a
    /// stage cells are independent.
    pub fn prepare(&mut self, x: &[f64]) {
        let prims = GridView::<MetricPrims>::from_flat(x, self.space);

        // Stage 1: g_ab, g^ab, ∂ₜg_ab.
        let dt_prims = &self.dt_prims;
        par_fill3(
            &mut self.g_ll,
            &mut self.g_uu,
            &mut self.dt_g_ll,
            |index| {
                let cell = reconstruct(&prims[index], &dt_prims[index]);
                (cell.g_ll, cell.g_uu, cell.dt_g_ll)
            },
        );

        // Stage 2: Γᵃ_bc.
        let (order, space, dx) = (self.order, self.space, self.dx);
        let (g_ll, g_uu, dt_g_ll) = (&self.g_ll, &self.g_uu, &self.dt_g_ll);
        self.gamma_ull
            .par_fill(|index| christoffel_at(order, space, index, dx, g_ll, g_uu, dt_g_ll));
    }

    /// G_ab at one cell. Valid after [`Self::prepare`].
    pub fn einstein_at(&self, index: [usize; 3]) -> Sym4 {
        einstein_at(
            self.order,
            self.space,
            index,
            self.dx,
            &self.g_ll,
            &self.g_uu,
            &self.gamma_ull,
        )
    }

    /// 8π T_ab at one cell for the given primitives. Valid after
    /// [`Self::prepare`] (the metric enters through the scratch g_ab).
    pub fn stress_energy_at(&self, prims: &MetricPrims, index: [usize; 3]) -> Sym4 {
        stress_energy_8pi(prims, &self.g_ll[index], &self.sources[index])
    }

    /// The residual map y ← F(x) = G_ab(x) − 8π T_ab(x), with x and y in
    /// the per-cell layout of [`MetricPrims`].
    pub fn residual(&mut self, x: &[f64], y: &mut [f64]) {
        self.prepare(x);

        let prims = GridView::<MetricPrims>::from_flat(x, self.space);
        let mut out = GridViewMut::<Sym4>::from_flat(y, self.space);

        let this = &*self;
        out.par_fill(|index| {
            let einstein = this.einstein_at(index);
            let t_8pi = this.stress_energy_at(&prims[index], index);
            einstein - t_8pi
        });
    }

    /// The curvature side alone, y ← G_ab(x). This is the operator the
    /// diagnostic pure-Krylov drivers iterate.
    pub fn einstein_apply(&mut self, x: &[f64], y: &mut [f64]) {
        self.prepare(x);

        let mut out = GridViewMut::<Sym4>::from_flat(y, self.space);
        let this = &*self;
        out.par_fill(|index| this.einstein_at(index));
    }

    /// 8π T_ab over the whole grid for the given primitives, flattened.
    /// The pure-Krylov drivers evaluate this once as their right-hand side.
    pub fn stress_energy_flat(&mut self, x: &[f64]) -> Vec<f64> {
        self.prepare(x);

        let prims = GridView::<MetricPrims>::from_flat(x, self.space);
        let mut grid = Grid::<Sym4>::new(self.space);
        let this = &*self;
        grid.par_fill(|index| this.stress_energy_at(&prims[index], index));

        grid.as_flat().to_vec()
    }
}
