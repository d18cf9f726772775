//! masplan: plan multi-agent pipelines from declarative queries
//!
//! Usage:
//!   masplan compile queries/cats_sentence.yaml   → dump the clause program
//!   masplan solve queries/cats_sentence.yaml     → print the task plan
//!   masplan explain queries/leek_recipe.yaml     → print the proof tree
//!   masplan run queries/cats_paragraph.yaml      → solve and execute offline
//!   masplan catalog                              → list demo types and tasks
//!   masplan config --dump                        → print effective config

use anyhow::Context;
use clap::{Parser, Subcommand};
use masplan::config::{MasplanConfig, OutputFormat};
use masplan::{demo, render};
use masplan_planner::{execute_with_report, MasQuery};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "masplan",
    version = env!("CARGO_PKG_VERSION"),
    about = "Multi-agent-system planner: compile a MASQuery to Horn clauses, prove it, run the plan"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (TOML). Default: <config_dir>/masplan/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output format; overrides [output] format from the config
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and print its clause program
    Compile {
        /// Query document (.yaml/.yml or .json)
        query: PathBuf,
    },
    /// Compile and resolve a query, print the plan
    Solve { query: PathBuf },
    /// Print the derivation of every requested output
    Explain { query: PathBuf },
    /// Solve a query and execute the plan against the demo catalog
    Run {
        query: PathBuf,
        /// Also write the run report as YAML to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List demo resource types, tasks and descriptors
    Catalog,
    /// Show configuration
    Config {
        /// Dump the effective config as TOML
        #[arg(long)]
        dump: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = MasplanConfig::resolve(cli.config.as_deref());
    let _guard = init_tracing(&config.log.filter, cli.log_file.as_deref())?;
    let format = cli.format.unwrap_or(config.output.format);
    let planner = demo::planner(config.planner.clone())?;

    match cli.command {
        Commands::Compile { query } => {
            let doc = load(&query)?;
            let db = planner.compile(&doc)?;
            print!("{}", render::program(&db, format)?);
        }
        Commands::Solve { query } => {
            let doc = load(&query)?;
            let solution = planner.solve(&doc)?;
            print!("{}", render::plan(&solution.plan, format)?);
        }
        Commands::Explain { query } => {
            let doc = load(&query)?;
            let db = planner.compile(&doc)?;
            for (output, derivation) in planner.derive(&db)? {
                println!("# {}", output);
                print!("{}", derivation.render());
            }
        }
        Commands::Run { query, report } => {
            let doc = load(&query)?;
            let solution = planner.solve(&doc)?;
            let label = query
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "query".into());
            let (run, result) = execute_with_report(
                &solution.plan,
                &label,
                solution.clauses.seed(),
            );
            if let Some(path) = report {
                std::fs::write(&path, run.to_yaml())
                    .with_context(|| format!("writing report to {}", path.display()))?;
            }
            eprintln!("{}", run.summary_line());
            let value = result?;
            print!("{}", render::resource(&value, format)?);
        }
        Commands::Catalog => {
            print!("{}", render::catalog(planner.registry(), planner.catalog()));
        }
        Commands::Config { dump } => {
            if dump {
                print!("{}", config.to_toml());
            } else {
                match MasplanConfig::default_path() {
                    Some(p) => println!("config path: {}", p.display()),
                    None => println!("config path: <none>"),
                }
                println!("use --dump to print the effective config");
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> anyhow::Result<MasQuery> {
    MasQuery::load(path).with_context(|| format!("loading query {}", path.display()))
}

/// Stderr logging, optionally mirrored to a file. `RUST_LOG` wins over the
/// configured filter. The returned guard must live until exit.
fn init_tracing(
    filter: &str,
    log_file: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("--log-file {} has no file name", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Ok(Some(guard))
}
