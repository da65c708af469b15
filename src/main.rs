use anyhow::{Context, Result};
use clap::Parser;
use mac_dispatch::config::Config;
use mac_dispatch::dispatch::{DispatchSolution, ModelKind, Scenario};
use mac_dispatch::mac::{linspace, Curve, MacModel, MacTech};
use mac_dispatch::telemetry::init_tracing;
use serde_json::json;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

mod cli;
use cli::{Cli, Commands, MacCommands};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)?;
    init_tracing(&cfg.logging);

    match cli.command {
        Commands::Mac { command } => run_mac(&cfg, command),
        Commands::Dispatch {
            model,
            scenario,
            seed,
            summary,
        } => {
            let model = model.unwrap_or(cfg.dispatch.model);
            let scenario = match scenario.or_else(|| cfg.dispatch.scenario.clone()) {
                Some(path) => Scenario::from_path(&path)
                    .with_context(|| format!("reading scenario {}", path.display()))?,
                None => sample_scenario(model, seed.unwrap_or(cfg.dispatch.seed)),
            };
            let solution = model.build().solve(&scenario)?;
            if summary {
                print_summary(&solution);
            } else {
                println!("{}", solution.to_json()?);
            }
            Ok(())
        }
    }
}

fn sample_scenario(model: ModelKind, seed: u64) -> Scenario {
    match model {
        ModelKind::II => Scenario::model_ii_sample(),
        ModelKind::I | ModelKind::III => Scenario::model_i_sample(seed),
    }
}

fn run_mac(cfg: &Config, command: MacCommands) -> Result<()> {
    let model = MacModel::new(cfg.mac)?;
    match command {
        MacCommands::Report { points, csv } => {
            let e0 = model.e0();
            let n = points.unwrap_or(cfg.report.grid_points);
            let grid = linspace(
                cfg.report.grid_min_share * e0,
                cfg.report.grid_max_share * e0,
                n,
            );
            let curves = vec![
                model.cost(&grid)?,
                model.emissions(&grid)?,
                model.ctilde(&grid)?,
                model.mac_curve(&grid)?,
            ];
            if let Some(dir) = csv {
                write_curves(&dir, &curves)?;
            }
            println!("{}", serde_json::to_string_pretty(&curves)?);
        }
        MacCommands::Optimum => {
            let outcome = model.outcome()?;
            info!(e_opt = outcome.e_opt, price = outcome.price, "optimum found");
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        MacCommands::Tech { prices } => {
            let tech = MacTech::new(cfg.mac, cfg.tech.to_input())?;
            let outcome = tech.outcome()?;
            let prices = if prices.is_empty() {
                linspace(0.0, 2.0 * outcome.price, cfg.report.grid_points)
            } else {
                prices
            };
            let curve = tech.mac_curve(&prices)?;
            let report = json!({ "outcome": outcome, "curve": curve });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn write_curves(dir: &Path, curves: &[Curve]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for curve in curves {
        let path = dir.join(format!("{}.csv", curve.name()));
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        curve.write_csv(file)?;
        info!(path = %path.display(), "wrote curve");
    }
    Ok(())
}

fn print_summary(solution: &DispatchSolution) {
    println!(
        "{} ({}) welfare = {:.2}",
        solution.model, solution.status, solution.welfare
    );
    for h in solution.hourly() {
        println!(
            "hour {:>2}: served {:>9.2}  generation {:>9.2}  charge {:>8.2}  discharge {:>8.2}  net flow {:>8.2}",
            h.hour,
            h.served_demand,
            h.total_generation(),
            h.total_charge(),
            h.total_discharge(),
            h.net_flow()
        );
    }
}
