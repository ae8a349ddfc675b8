//! Lamella command-line interface.
//!
//! Run eigenmode-expansion simulations from TOML configuration files:
//! ```sh
//! lamella-cli run job.toml
//! lamella-cli validate job.toml
//! lamella-cli materials
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lamella-cli")]
#[command(about = "Lamella: eigenmode-expansion solver for layered photonic structures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running the simulation.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Display information about built-in material models.
    Materials,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Lamella Eigenmode-Expansion Solver");
            println!("==================================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_simulation(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_amplitudes {
                let csv_path = out_dir.join("amplitudes.csv");
                runner::write_amplitudes_csv(&result, &csv_path)?;
            }

            if job.output.save_json {
                let json_path = out_dir.join("amplitudes.json");
                runner::write_results_json(&result, &json_path)?;
            }

            if let Some(scan) = &result.field_scan {
                let field_path = out_dir.join("exit_field.csv");
                runner::write_field_csv(scan, &field_path)?;
            }

            println!("Simulation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            // Also check that the solver context can be built.
            runner::build_context(&job)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Materials => {
            println!("Built-in material models:");
            println!();
            println!("  Constant index:");
            println!("    any [materials.<name>] entry with n = <float> or [re, im]");
            println!("    optional mur for magnetic materials");
            println!();
            println!("  Dispersive models (model = \"...\", sampled at the job wavelength):");
            println!("    fused_silica — Sellmeier fit (Malitson 1965), 0.21–6.7 µm");
            println!();
            println!("  Library use:");
            println!("    TabulatedIndex — cubic-spline interpolation of measured (n, k) samples");
            Ok(())
        }
    }
}
