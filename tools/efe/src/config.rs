use cartan::lac::{GmresConfig, JfnkConfig, LineSearch};
use cartan::solver::SolverKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::body::BodyKind;
use crate::init::InitCondKind;

/// Configuration of a single solve, loaded from a toml file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Cubic grid edge N.
    pub size: usize,
    /// Half-edge of the domain in units of the body radius.
    #[serde(alias = "bodyRadii")]
    pub body_radii: f64,
    /// Outer nonlinear iteration cap. Absent means unbounded; 0 skips the
    /// solve and only emits observables.
    pub maxiter: Option<usize>,
    /// Source distribution preset.
    pub body: BodyKind,
    /// Initial guess preset.
    #[serde(alias = "initCond")]
    pub init_cond: InitCondKind,
    /// Solver driver.
    pub solver: SolverKind,
    /// Centered stencil order: 2, 4, 6 or 8.
    pub order: usize,
    /// Fixed worker pool size.
    pub threads: usize,
    /// Tab-separated observable columns, one row per cell.
    #[serde(alias = "outputFilename")]
    pub output_filename: Option<PathBuf>,

    pub newton: NewtonConfig,
    pub gmres: GmresSection,
    pub logs: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: 16,
            body_radii: 2.0,
            maxiter: None,
            body: BodyKind::Earth,
            init_cond: InitCondKind::StellarSchwarzschild,
            solver: SolverKind::Jfnk,
            order: 8,
            threads: 8,
            output_filename: None,
            newton: NewtonConfig::default(),
            gmres: GmresSection::default(),
            logs: LogConfig::default(),
        }
    }
}

impl Config {
    /// Collects the solver settings into the library configuration.
    pub fn jfnk_config(&self) -> JfnkConfig {
        JfnkConfig {
            max_iterations: self.maxiter.unwrap_or(usize::MAX),
            tolerance: self.newton.tolerance,
            jacobian_epsilon: self.newton.jacobian_epsilon,
            max_alpha: self.newton.max_alpha,
            line_search: self.newton.line_search,
            line_search_max_iter: self.newton.line_search_max_iter,
            gmres: GmresConfig {
                restart: self.gmres.restart,
                max_iterations: self.gmres.max_iterations,
                tolerance: self.gmres.tolerance,
            },
        }
    }
}

/// Outer Newton loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewtonConfig {
    pub tolerance: f64,
    pub jacobian_epsilon: f64,
    pub max_alpha: f64,
    pub line_search: LineSearch,
    pub line_search_max_iter: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-7,
            jacobian_epsilon: 1e-6,
            max_alpha: 1.0,
            line_search: LineSearch::Bisect,
            line_search_max_iter: 20,
        }
    }
}

/// Inner Krylov settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GmresSection {
    pub restart: usize,
    /// 0 caps at the problem dimension.
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for GmresSection {
    fn default() -> Self {
        let defaults = GmresConfig::default();
        Self {
            restart: defaults.restart,
            max_iterations: defaults.max_iterations,
            tolerance: defaults.tolerance,
        }
    }
}

/// Optional per-iteration solver logs, tab-separated and flushed per line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `#iter residual alpha` per outer iteration.
    pub jfnk: Option<PathBuf>,
    /// `#jfnk_iter gmres_iter residual` per inner iteration.
    pub gmres: Option<PathBuf>,
}
