use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fire_verify_core::catalog::SimulationCatalogEntry;
use fire_verify_core::{
    CandidateSelector, FixedChoice, Pipeline, ReportSink, RunError, Stage, VerificationReport,
    VerifyConfig, VerifyError,
};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Verify Model A and Model B fire-spread forecasts against the observed perimeter
#[derive(Parser, Debug)]
#[command(name = "fire-verify")]
#[command(about = "Wildfire forecast verification", long_about = None)]
struct Args {
    /// Fire identifier, e.g. K52125
    fire_id: String,

    /// TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum Model A simulation duration in hours
    #[arg(short, long)]
    min_duration: Option<f64>,

    /// Model A candidate to use when several qualify (1-based)
    #[arg(long)]
    choice: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// List the qualifying Model A runs and exit
    #[arg(long)]
    list_candidates: bool,
}

/// Asks on the terminal which Model A run to use
///
/// Declines when input ends or the prompt cannot be written.
struct PromptSelector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptSelector<R, W> {
    fn ask(
        &mut self,
        fire_id: &str,
        candidates: &[SimulationCatalogEntry],
    ) -> io::Result<Option<usize>> {
        writeln!(self.output, "Multiple Model A runs found for fire '{fire_id}':")?;
        for (i, entry) in candidates.iter().enumerate() {
            writeln!(
                self.output,
                "{}: {} (forecast time: {})",
                i + 1,
                entry.sim_unique,
                entry.forecast_time
            )?;
        }
        loop {
            write!(self.output, "Enter the number of the run to use: ")?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match line.trim().parse::<usize>() {
                Ok(n) if (1..=candidates.len()).contains(&n) => return Ok(Some(n - 1)),
                Ok(_) => writeln!(
                    self.output,
                    "Invalid choice. Please enter a number between 1 and {}.",
                    candidates.len()
                )?,
                Err(_) => writeln!(self.output, "Invalid input. Please enter a valid number.")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> CandidateSelector for PromptSelector<R, W> {
    fn select(&mut self, fire_id: &str, candidates: &[SimulationCatalogEntry]) -> Option<usize> {
        self.ask(fire_id, candidates).unwrap_or_else(|e| {
            warn!("Candidate prompt failed: {e}");
            None
        })
    }
}

/// Writes the finished report as text or pretty JSON
struct ReportPrinter<W> {
    out: W,
    json: bool,
}

impl<W: Write> ReportSink for ReportPrinter<W> {
    fn deliver(&mut self, report: &VerificationReport) -> Result<(), VerifyError> {
        let written = if self.json {
            serde_json::to_writer_pretty(&mut self.out, &report.summary())
                .map_err(io::Error::from)
                .and_then(|()| writeln!(self.out))
        } else {
            write!(self.out, "{report}")
        };
        written
            .and_then(|()| self.out.flush())
            .map_err(|e| VerifyError::Delivery {
                reason: e.to_string(),
            })
    }
}

fn load_config(args: &Args) -> Result<VerifyConfig, RunError> {
    let mut config = match &args.config {
        Some(path) => VerifyConfig::load(path)
            .map_err(|e| RunError::new(&args.fire_id, Stage::Setup, e))?,
        None => VerifyConfig::default(),
    };
    if let Some(hours) = args.min_duration {
        config.min_duration_hours = hours;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<(), RunError> {
    let config = load_config(args)?;
    let pipeline = Pipeline::from_config(&args.fire_id, &config)?;

    if args.list_candidates {
        let candidates = pipeline
            .model_a()
            .candidates(&args.fire_id, pipeline.min_duration_hours())
            .map_err(|e| RunError::new(&args.fire_id, Stage::LocateModelA, e))?;
        for (i, entry) in candidates.iter().enumerate() {
            println!(
                "{}: {} ({} h, forecast time: {})",
                i + 1,
                entry.sim_unique,
                entry.duration_hours,
                entry.forecast_time
            );
        }
        return Ok(());
    }

    let mut printer = ReportPrinter {
        out: io::stdout().lock(),
        json: args.json,
    };
    let sinks: &mut [&mut dyn ReportSink] = &mut [&mut printer];
    match args.choice {
        Some(n) => {
            // 0 wraps to an out-of-range index and is rejected by the locator
            let mut selector = FixedChoice(n.wrapping_sub(1));
            pipeline.run_with_sinks(&args.fire_id, &mut selector, sinks)?;
        }
        None => {
            let mut selector = PromptSelector {
                input: io::stdin().lock(),
                output: io::stderr(),
            };
            pipeline.run_with_sinks(&args.fire_id, &mut selector, sinks)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
