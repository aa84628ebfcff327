//! prover-bridge CLI: run parametrized goals against SWI-Prolog or ProbLog.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use prover_bridge::config::BridgeConfig;
use prover_bridge::convert::Value;
use prover_bridge::engine::{EngineKind, InProcessBackend, Prover, ProverBuilder};
use prover_bridge::error::EngineError;
use prover_bridge::solution::Solution;
use prover_bridge::term::parse_term;

#[derive(Parser)]
#[command(name = "prover-bridge", version, about = "Typed queries against logic engines")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/prover-bridge/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Engine to use, overriding the config file.
    #[arg(long, global = true)]
    engine: Option<EngineKind>,

    /// Log at debug level (otherwise RUST_LOG, default warn).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a goal pattern and print every solution.
    Solve {
        /// Goal pattern, e.g. "member(X, ?List)."
        goal: String,

        /// One term per placeholder, e.g. "[1,2,3]".
        args: Vec<String>,

        /// Theory files loaded before solving.
        #[arg(short, long = "theory")]
        theories: Vec<PathBuf>,

        /// Print solutions as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the script that would be sent to the engine.
    Script {
        goal: String,

        args: Vec<String>,

        #[arg(short, long = "theory")]
        theories: Vec<PathBuf>,
    },

    /// Show which engine executable discovery resolves to.
    Probe,

    /// Manage the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config.
    Show,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => BridgeConfig::default_path()?,
    };
    let mut config = BridgeConfig::load_or_default(&config_path)?;
    if let Some(engine) = cli.engine {
        config.engine = engine;
    }

    match cli.command {
        Commands::Solve {
            goal,
            args,
            theories,
            json,
        } => {
            let mut prover = ProverBuilder::from_config(&config).build()?;
            load_theories(&mut prover, &theories)?;
            let args = parse_args(&args)?;
            let solution = prover.solve(&goal, &args)?;
            if json {
                print_json(&solution)?;
            } else {
                print_table(&solution)?;
            }
        }

        Commands::Script {
            goal,
            args,
            theories,
        } => {
            let mut prover = ProverBuilder::from_config(&config)
                .backend(InProcessBackend::new("script-only", |_| {
                    Err(EngineError::InProcess {
                        message: "scripts are printed, not run".into(),
                    })
                }))
                .build()?;
            load_theories(&mut prover, &theories)?;
            let args = parse_args(&args)?;
            let goal = prover.query(&goal).goal_string(&args)?;
            print!("{}", prover.script(&goal));
        }

        Commands::Probe => {
            let engine = config.engine;
            let providers = ProverBuilder::from_config(&config).into_providers();
            match providers.resolve() {
                Some(exe) => {
                    println!("engine:     {engine}");
                    println!("executable: {exe}");
                    for (key, value) in &exe.env {
                        println!("  env {key}={value}");
                    }
                    for (var, dirs) in &exe.path_prepend {
                        for dir in dirs {
                            println!("  {var} += {}", dir.display());
                        }
                    }
                }
                None => {
                    return Err(EngineError::ProverCreation {
                        engine: engine.to_string(),
                    }
                    .into());
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    return Err(miette::miette!(
                        help = "Pass --force to overwrite it.",
                        "config already exists at {}",
                        config_path.display()
                    ));
                }
                BridgeConfig::for_engine(config.engine).save(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                print!("{}", toml::to_string_pretty(&config).into_diagnostic()?);
            }
        },
    }

    Ok(())
}

fn load_theories(prover: &mut Prover, paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        prover.load_theory_file(path)?;
    }
    Ok(())
}

/// Each CLI argument is term text, passed through to the goal as is.
fn parse_args(args: &[String]) -> Result<Vec<Value>> {
    args.iter()
        .map(|arg| -> Result<Value> { Ok(Value::Term(parse_term(arg)?)) })
        .collect()
}

fn print_table(solution: &Solution) -> Result<()> {
    if let Some(reason) = solution.failure_reason() {
        println!("failed: {reason}");
        return Ok(());
    }
    for row in solution {
        let mut line = row
            .bindings()
            .iter()
            .map(|(var, term)| format!("{var} = {term}"))
            .collect::<Vec<_>>()
            .join(", ");
        if line.is_empty() {
            line.push_str("true");
        }
        match row.probability() {
            Some(p) => println!("{line}  (p = {p})"),
            None => println!("{line}"),
        }
    }
    if let Some(mean) = solution.mean_probability() {
        println!("mean probability: {mean}");
    }
    println!("{}", if solution.is_success() { "true." } else { "false." });
    Ok(())
}

fn print_json(solution: &Solution) -> Result<()> {
    let mut rows = Vec::with_capacity(solution.len());
    let mut cursor = solution.clone();
    while cursor.fetch() {
        let mut bindings = serde_json::Map::new();
        for var in cursor.variables() {
            bindings.insert(var.clone(), cursor.get(var)?.to_json());
        }
        rows.push(serde_json::json!({
            "bindings": bindings,
            "probability": cursor.probability(),
        }));
    }
    let out = serde_json::json!({
        "success": solution.is_success(),
        "failure": solution.failure_reason(),
        "variables": solution.variables(),
        "rows": rows,
    });
    println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
    Ok(())
}
