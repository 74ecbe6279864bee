mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dcfval_core::analysis::{run_breakeven, run_tornado, solvable_parameters};
use dcfval_core::model::{Distribution, MonteCarloConfig, PreviewPoint, StreamId};
use dcfval_core::persistence::{load_model, template_names};
use dcfval_core::{run_deterministic, run_monte_carlo};

#[derive(Parser)]
#[command(
    name = "dcfval",
    version,
    about = "Discounted cash flow modeling from the command line"
)]
struct Cli {
    /// Log filter, e.g. "info" or "debug" (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a model document for structural and configuration errors
    Validate { model: PathBuf },

    /// Run one deterministic valuation pass
    Deterministic { model: PathBuf },

    /// Run a Monte Carlo outcome distribution
    MonteCarlo {
        model: PathBuf,
        #[arg(long, default_value_t = 10_000)]
        simulations: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Rank uncertain parameters by the NPV swing of their P10..P90 range
    Tornado { model: PathBuf },

    /// List the parameters eligible for breakeven solving
    Parameters { model: PathBuf },

    /// Solve one parameter for a target NPV
    Breakeven {
        model: PathBuf,
        /// Parameter name as reported by `parameters`
        #[arg(long)]
        parameter: String,
        /// Stream owning the parameter; omit for model settings
        #[arg(long)]
        stream: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        target: f64,
    },

    /// Preview a distribution month by month
    Preview {
        /// Distribution as JSON, e.g. '{"type":"FIXED","params":{"value":100}}'
        distribution: String,
        #[arg(long, default_value_t = 60)]
        horizon: usize,
        #[arg(long, default_value_t = 0)]
        start_month: usize,
        #[arg(long)]
        end_month: Option<usize>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// List the model templates available in a directory
    Templates {
        #[arg(long, default_value = "templates")]
        dir: PathBuf,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    match cli.command {
        Command::Validate { model } => {
            let model = load_model(&model)?;
            model.validate()?;
            println!(
                "ok: '{}', {} streams over {} months",
                model.name,
                model.len(),
                model.settings.forecast_months
            );
        }
        Command::Deterministic { model } => {
            let model = load_model(&model)?;
            model.validate()?;
            print_json(&run_deterministic(&model)?)?;
        }
        Command::MonteCarlo {
            model,
            simulations,
            seed,
        } => {
            let model = load_model(&model)?;
            model.validate()?;
            let config = MonteCarloConfig {
                n_simulations: simulations,
            };
            print_json(&run_monte_carlo(&model, &config, seed)?)?;
        }
        Command::Tornado { model } => {
            let model = load_model(&model)?;
            model.validate()?;
            print_json(&run_tornado(&model)?)?;
        }
        Command::Parameters { model } => {
            let model = load_model(&model)?;
            print_json(&solvable_parameters(&model)?)?;
        }
        Command::Breakeven {
            model,
            parameter,
            stream,
            target,
        } => {
            let model = load_model(&model)?;
            model.validate()?;
            let stream_id = stream.map(StreamId::from);
            print_json(&run_breakeven(
                &model,
                stream_id.as_ref(),
                &parameter,
                target,
            )?)?;
        }
        Command::Preview {
            distribution,
            horizon,
            start_month,
            end_month,
            seed,
        } => {
            let distribution: Distribution = serde_json::from_str(&distribution)?;
            let points: Vec<PreviewPoint> = distribution
                .preview(start_month, end_month, horizon, seed)?
                .collect();
            print_json(&points)?;
        }
        Command::Templates { dir } => {
            for name in template_names(&dir) {
                println!("{name}");
            }
        }
    }

    Ok(())
}
