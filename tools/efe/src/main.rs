//! An executable for solving a static spatial slice of the Einstein field
//! equations around a preset source body.

use cartan::prelude::*;
use cartan::solver;
use cartan_app::progress;
use clap::{arg, value_parser, ArgMatches, Command};
use console::style;
use eyre::{eyre, Context as _};
use indicatif::{HumanBytes, HumanDuration, ProgressBar};
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod body;
mod config;
mod history;
mod init;
mod obs;
#[cfg(test)]
mod scenarios;

use body::Body;
use config::Config;
use history::{GmresLog, JfnkLog};
use obs::Observables;

/// Runs `f`, printing `name ... (secs)` around it like a stopwatch.
fn time<T>(name: &str, f: impl FnOnce() -> T) -> T {
    print!("{name} ... ");
    use std::io::Write as _;
    std::io::stdout().flush().ok();

    let start = Instant::now();
    let result = f();
    println!("({:.3}s)", start.elapsed().as_secs_f64());

    result
}

fn run(config: &Config) -> eyre::Result<()> {
    let start = Instant::now();

    let body = Body::new(config.body);
    let order = Order::from_int(config.order)
        .ok_or_else(|| eyre!("unsupported stencil order {} (use 2, 4, 6 or 8)", config.order))?;

    eyre::ensure!(config.size > 0, "grid size must be positive");
    eyre::ensure!(
        !config.init_cond.requires_spherical_body() || body.is_spherical(),
        "initial condition {:?} requires a spherical body, got {:?}",
        config.init_cond,
        config.body
    );

    // Basic info dumping
    println!("mass={} m", body.mass);
    println!("radius={} m", body.radius);
    println!("volume={} m^3", body.volume());
    println!("density={} m^-2", body.density());

    let space = IndexSpace::cubic(config.size);
    let half = config.body_radii * body.radius;
    let bounds = Rectangle::from_aabb([-half; 3], [half; 3]);
    let dx = bounds.spacing(space.size());

    println!(
        "grid: {}^3 cells, dx = {:.5e} m, solver = {}",
        config.size,
        dx[0],
        style(config.solver.name()).green()
    );

    // Allocate the primitive grids and the solver context (which owns the
    // per-process scratch grids).
    let (mut prims, mut system) = time("allocating", || {
        let prims = Grid::<MetricPrims>::new(space);
        let dt_prims = Grid::<MetricPrims>::new(space);
        let sources = Grid::<StressEnergyPrims>::new(space);
        let system = EfeSystem::new(space, dx, order, dt_prims, sources);

        let total = prims.heap_size() + system.scratch_heap_size();
        print!("~{} for {} cells ", HumanBytes(total as u64), space.len());

        (prims, system)
    });

    time("calculating stress-energy primitives", || {
        body.init_sources(&bounds, space, system.sources_mut());
    });

    time("calculating metric primitives", || {
        config
            .init_cond
            .initialize(&body, &bounds, space, &mut prims);
    });

    // Solve, unless maxiter = 0 asked for observables only.
    if config.maxiter != Some(0) {
        let mut jfnk_log = match &config.logs.jfnk {
            Some(path) => Some(JfnkLog::create(path).wrap_err("failed to open jfnk log")?),
            None => None,
        };
        let mut gmres_log = match &config.logs.gmres {
            Some(path) => Some(GmresLog::create(path).wrap_err("failed to open gmres log")?),
            None => None,
        };

        let bar = match config.maxiter {
            Some(cap) => {
                let bar = ProgressBar::new(cap as u64);
                bar.set_style(progress::iteration_style());
                bar
            }
            None => {
                let bar = ProgressBar::no_length();
                bar.set_style(progress::spinner_style());
                bar
            }
        };
        bar.set_prefix("[solve]");
        bar.enable_steady_tick(Duration::from_millis(100));

        let mut outer = |iteration: usize, residual: f64, alpha: f64| -> bool {
            bar.inc(1);
            bar.set_message(format!(
                "iter {iteration}, residual {residual:.6e} g/cm^3, alpha {alpha}"
            ));

            if let Some(log) = &mut jfnk_log {
                log.append(iteration, residual, alpha).ok();
            }
            false
        };
        let mut inner = |outer_iter: usize, iteration: usize, residual: f64| -> bool {
            if let Some(log) = &mut gmres_log {
                log.append(outer_iter, iteration, residual).ok();
            }
            false
        };

        let mut callbacks = SolverCallbacks {
            outer: Some(&mut outer),
            inner: Some(&mut inner),
        };

        let report = time("solving", || {
            solver::solve(
                config.solver,
                &mut system,
                &mut prims,
                config.jfnk_config(),
                &mut callbacks,
            )
        });

        bar.finish_and_clear();

        let status = if report.converged() {
            style("converged".to_string()).green()
        } else {
            style(format!("{:?}", report.outcome)).yellow()
        };
        println!(
            "solver finished after {} iterations: {}, residual {:.6e}",
            report.iterations, status, report.residual
        );
    }

    // Once all is solved for, do some final calculations and report.
    let observables = time("calculating EFE constraint", || {
        Observables::compute(&mut system, &prims, &body, bounds)
    });

    if let Some(path) = &config.output_filename {
        time("outputting", || observables.write_table(path, &system, &prims))?;
    }

    println!(
        "worst constraint component: {:.6e} 1/m^2",
        obs::max_abs_component(observables.efe())
    );
    observables.print_tt_distribution(&system);

    println!("finished in {}", HumanDuration(start.elapsed()));
    println!("done!");
    Ok(())
}

// Main function that can return an error
fn main() -> eyre::Result<()> {
    // Set up nice colored error handing.
    color_eyre::install()?;
    env_logger::builder().format_timestamp(None).init();

    let command = Command::new("efe")
        .about("Solves the Einstein field equations for a static metric around a source body.")
        .version("0.1.0")
        .config_args();
    let matches = command.get_matches();

    let config = parse_config(&matches)?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .wrap_err("failed to build worker pool")?;

    run(&config)
}

// ******************************
// Helpers **********************
// ******************************

fn parse_config(matches: &ArgMatches) -> eyre::Result<Config> {
    let Some(config_path) = matches.get_one::<PathBuf>("config").cloned() else {
        // No file: run entirely on defaults.
        return Ok(Config::default());
    };

    let config_path = cartan_app::file::abs_or_relative(&config_path)?;
    cartan_app::file::import_toml::<Config>(&config_path)
        .wrap_err_with(|| format!("failed to parse config file {}", config_path.display()))
}

/// Extension trait for defining helper methods on `clap::Command`.
trait CommandExt {
    fn config_args(self) -> Self;
}

impl CommandExt for Command {
    fn config_args(self) -> Self {
        self.arg(
            arg!(-c --config <FILE> "Sets a custom config file")
                .required(false)
                .value_parser(value_parser!(PathBuf)),
        )
    }
}
