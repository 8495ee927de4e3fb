use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_pubchem_fetcher::app::App;
use kira_pubchem_fetcher::config::{ConfigLoader, Overrides, ResolvedConfig};
use kira_pubchem_fetcher::domain::Cid;
use kira_pubchem_fetcher::error::KiraError;
use kira_pubchem_fetcher::output::{JsonOutput, OutputMode, print_summary};
use kira_pubchem_fetcher::pubchem::PubchemHttpClient;
use kira_pubchem_fetcher::store::Layout;
use kira_pubchem_fetcher::tui::Tui;

#[derive(Parser)]
#[command(name = "kira-pc")]
#[command(about = "Resumable daily batch fetcher for PubChem descriptors and SDF structures")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    output_dir: Option<String>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch the next batch of CIDs (default)")]
    Run,
    #[command(about = "Show the progress marker and last run's not-found log")]
    Status,
    #[command(about = "Overwrite the progress marker")]
    Reset(ResetArgs),
}

#[derive(Args, Clone, Default)]
struct RunArgs {
    #[arg(long, global = true, help = "Start at this CID instead of the progress marker")]
    start: Option<String>,

    #[arg(long, global = true, help = "Number of consecutive CIDs to scan")]
    batch_size: Option<u64>,
}

impl RunArgs {
    fn is_empty(&self) -> bool {
        self.start.is_none() && self.batch_size.is_none()
    }
}

#[derive(Args)]
struct ResetArgs {
    #[arg(long, default_value = "1")]
    to: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::MissingConfig(_)
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::InvalidConfig(_)
        | KiraError::InvalidCid(_) => 2,
        KiraError::ProgressParse { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let command = cli.command.unwrap_or(Commands::Run);
    let overrides = overrides(&command, cli.run, cli.output_dir).map_err(miette::Report::new)?;
    let config =
        ConfigLoader::resolve(cli.config.as_deref(), overrides).map_err(miette::Report::new)?;

    let client =
        PubchemHttpClient::new(&config.base_url, config.timeout).map_err(miette::Report::new)?;
    let app = App::new(Layout::under(&config.output_dir), client);

    match command {
        Commands::Run => run_batch(app, config, output_mode),
        Commands::Status => {
            let status = app.status().map_err(miette::Report::new)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_status(&status).into_diagnostic(),
                OutputMode::Interactive => {
                    println!("next start CID: {}", status.next_start_cid);
                    println!("progress file:  {}", status.progress_path);
                    println!("3D SDF dir:     {}", status.structures_3d_dir);
                    println!("2D SDF dir:     {}", status.structures_2d_dir);
                    println!("table dir:      {}", status.table_dir);
                    println!(
                        "not found in last run: {} ({})",
                        status.not_found.len(),
                        status.not_found_log
                    );
                    for entry in &status.not_found {
                        println!("  CID {} - {}", entry.cid, entry.reason);
                    }
                    Ok(())
                }
            }
        }
        Commands::Reset(args) => {
            let to = args.to.parse::<Cid>().map_err(miette::Report::new)?;
            let result = app.reset(to).map_err(miette::Report::new)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_reset(&result).into_diagnostic(),
                OutputMode::Interactive => {
                    println!("next start CID: {}", result.next_start_cid);
                    Ok(())
                }
            }
        }
    }
}

/// `--start` and `--batch-size` shape a run; anywhere else they are a
/// usage error rather than silently ignored.
fn overrides(
    command: &Commands,
    run: RunArgs,
    output_dir: Option<String>,
) -> Result<Overrides, KiraError> {
    if !matches!(command, Commands::Run) && !run.is_empty() {
        return Err(KiraError::InvalidConfig(
            "--start and --batch-size only apply to `run`".to_string(),
        ));
    }
    Ok(Overrides {
        batch_size: run.batch_size,
        start_cid: run.start.map(|value| value.parse::<Cid>()).transpose()?,
        output_dir,
    })
}

fn run_batch(
    app: App<PubchemHttpClient>,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let report = app.run(&config, &JsonOutput).map_err(miette::Report::new)?;
            JsonOutput::print_report(&report).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => {
            let label = match config.start_cid {
                Some(start) => format!("{} CIDs from {start}", config.batch_size),
                None => format!("{} CIDs from marker", config.batch_size),
            };
            let mut tui = Tui::new(label);
            let report = tui.run(move |sink| app.run(&config, sink))?;
            print_summary(&report);
            Ok(())
        }
    }
}
