//! # jud CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Results are printed as pretty JSON on stdout. Engine failures print a
//! JSON error document and exit with status 2 (3 when the proceso was busy
//! and the call can be retried); any other failure exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jud_cli::plazo::{run_dias_restantes, run_plazos, run_sweep, DiasRestantesArgs, PlazosArgs, SweepArgs};
use jud_cli::proceso::{
    run_crear, run_mostrar, run_sentencia, run_transicionar, CrearArgs, MostrarArgs,
    SentenciaArgs, TransicionarArgs,
};
use jud_cli::{engine_error_json, open_engine, resolve_store};

/// Judicial process engine CLI.
///
/// Creates procesos, applies procedural events, tracks plazos and issues
/// sentencias against a directory of JSON proceso files.
#[derive(Parser, Debug)]
#[command(name = "jud", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding one JSON file per proceso.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Engine configuration file (YAML). Overrides JUD_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a proceso in BORRADOR.
    Crear(CrearArgs),
    /// Print a proceso.
    Mostrar(MostrarArgs),
    /// Apply a procedural event to a proceso.
    Transicionar(TransicionarArgs),
    /// List a proceso's plazos.
    Plazos(PlazosArgs),
    /// Days remaining on a plazo.
    DiasRestantes(DiasRestantesArgs),
    /// Issue the sentencia from a draft file.
    Sentencia(SentenciaArgs),
    /// Expire overdue plazos across the store.
    Sweep(SweepArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let store = resolve_store(cli.store);
    let result = open_engine(&store, cli.config.as_deref()).and_then(|engine| match &cli.command {
        Commands::Crear(args) => run_crear(&engine, args),
        Commands::Mostrar(args) => run_mostrar(&engine, args),
        Commands::Transicionar(args) => run_transicionar(&engine, args),
        Commands::Plazos(args) => run_plazos(&engine, args),
        Commands::DiasRestantes(args) => run_dias_restantes(&engine, args),
        Commands::Sentencia(args) => run_sentencia(&engine, args),
        Commands::Sweep(args) => run_sweep(&engine, args),
    });

    match result {
        Ok(value) => print_json(&value),
        Err(e) => match engine_error_json(&e) {
            Some(doc) => {
                print_json(&doc);
                let retryable = doc["error"]["retryable"].as_bool().unwrap_or(false);
                ExitCode::from(if retryable { 3 } else { 2 })
            }
            None => {
                tracing::error!("{e:#}");
                eprintln!("error: {e:#}");
                ExitCode::from(1)
            }
        },
    }
}

fn print_json(value: &serde_json::Value) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to render output: {e}");
            ExitCode::from(1)
        }
    }
}
