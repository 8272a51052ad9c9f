// ==============================================================================
// main.rs - nCoV Surveillance Database Loader Entry Point
// ==============================================================================
// Description: Command line interface for creating the database and loading
//              pipeline outputs into it
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Progress and loading-error events go to stdout as JSON lines; diagnostic
// logs go to stderr.
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ncov_db::config::{LoaderConfig, DEFAULT_BATCH_SIZE};
use ncov_db::events::JsonLinesSink;
use ncov_db::run;
use ncov_db::store::Store;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database (or bring its schema up to date)
    Init {
        #[command(flatten)]
        db: DbArgs,
    },

    /// Load every pipeline output of one sequencing run
    LoadRun {
        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        loader: LoaderArgs,

        /// Sequencing run output directory
        run_dir: PathBuf,
    },

    /// Load melted freebayes/snpEff variant tables (*.tsv) from a directory
    LoadMeltedFreebayesVcfs {
        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        loader: LoaderArgs,

        /// Directory searched recursively for *.tsv files
        dir: PathBuf,
    },

    /// Load a pangolin lineage report (CSV)
    LoadPangolinResults {
        #[command(flatten)]
        db: DbArgs,

        #[command(flatten)]
        loader: LoaderArgs,

        /// Pangolin lineage report
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct DbArgs {
    /// SQLite database file
    #[arg(long, env = "NCOV_DB_PATH")]
    db: PathBuf,
}

#[derive(Args, Debug)]
struct LoaderArgs {
    /// Alt-allele frequency below which the consensus is the ref allele
    #[arg(long, env = "NCOV_DB_MIN_FREQ_THRESHOLD", default_value_t = 0.25)]
    min_freq_threshold: f64,

    /// Alt-allele frequency above which the consensus is the alt allele
    #[arg(long, env = "NCOV_DB_FREQ_THRESHOLD", default_value_t = 0.75)]
    freq_threshold: f64,

    /// Minimum depth (recorded only)
    #[arg(long, env = "NCOV_DB_MIN_DEPTH", default_value_t = 10)]
    min_depth: u32,

    /// ncov2019-artic-nf version in the run output directory name
    #[arg(long, default_value = "1.3")]
    artic_version: String,

    /// ncov-tools version in the QC output directory name
    #[arg(long, default_value = "1.5")]
    ncov_tools_version: String,

    /// ivar version recorded with ivar variants
    #[arg(long, default_value = "1.3")]
    ivar_version: String,

    /// freebayes version recorded with freebayes variants
    #[arg(long, default_value = "1.3.2")]
    freebayes_version: String,

    /// Records written between batch flushes
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

impl LoaderArgs {
    fn into_config(self) -> Result<LoaderConfig> {
        let mut config = LoaderConfig::default()
            .with_thresholds(self.min_freq_threshold, self.freq_threshold)
            .context("Invalid frequency thresholds")?
            .with_batch_size(self.batch_size);

        config.min_depth = self.min_depth;
        config.artic_version = self.artic_version;
        config.ncov_tools_version = self.ncov_tools_version;
        config.ivar_version = self.ivar_version;
        config.freebayes_version = self.freebayes_version;

        debug!("Loader configuration: {:?}", config);
        Ok(config)
    }
}

fn main() -> ExitCode {
    // .env values feed the clap `env` fallbacks
    dotenvy::dotenv().ok();

    // Logs on stderr; stdout carries the event stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ncov_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return ExitCode::from(report_usage(&e)),
    };

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::Init { db } => {
            let store = open_store(&db.db)?;
            info!(
                "Database ready: {:?} (schema version {})",
                db.db,
                store.schema_version()?
            );
        }

        Command::LoadRun { db, loader, run_dir } => {
            let config = loader.into_config()?;
            let mut store = open_store(&db.db)?;
            let mut events = JsonLinesSink::stdout();

            let report = run::load_run(&mut store, &config, &run_dir, &mut events)
                .with_context(|| format!("Failed to load run {:?}", run_dir))?;
            info!(
                "Loaded {} files ({} failed): {} inserted, {} already present, {} rows skipped",
                report.files_loaded,
                report.files_failed,
                report.totals.inserted,
                report.totals.already_present,
                report.totals.skipped
            );
        }

        Command::LoadMeltedFreebayesVcfs { db, loader, dir } => {
            let config = loader.into_config()?;
            let mut store = open_store(&db.db)?;
            let mut events = JsonLinesSink::stdout();

            let report = run::load_freebayes_dir(&mut store, &config, &dir, &mut events)
                .with_context(|| format!("Failed to load freebayes variants from {:?}", dir))?;
            info!(
                "Loaded {} files ({} failed): {} variants inserted",
                report.files_loaded, report.files_failed, report.totals.inserted
            );
        }

        Command::LoadPangolinResults { db, loader, file } => {
            let config = loader.into_config()?;
            let mut store = open_store(&db.db)?;
            let mut events = JsonLinesSink::stdout();

            let report = run::load_pangolin_file(&mut store, &config, &file, &mut events)
                .with_context(|| format!("Failed to load pangolin results {:?}", file))?;
            info!(
                "Loaded {} lineage calls ({} already present, {} rows skipped)",
                report.inserted, report.already_present, report.skipped
            );
        }
    }

    Ok(())
}

/// Print a clap usage error (or help/version) and pick the exit code
///
/// Help and version go to stdout and are not failures.
fn report_usage(e: &clap::Error) -> u8 {
    if let Err(write_err) = e.print() {
        warn!("Failed to print usage: {}", write_err);
    }
    if e.use_stderr() {
        1
    } else {
        0
    }
}

/// Open the database and apply pending migrations
fn open_store(path: &Path) -> Result<Store> {
    let mut store = Store::open(path)
        .with_context(|| format!("Failed to open database {:?}", path))?;
    store.migrate().context("Failed to migrate database schema")?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommand_names() {
        let cli = Cli::try_parse_from([
            "ncov-db",
            "load-melted-freebayes-vcfs",
            "--db",
            "ncov.db",
            "/data/freebayes",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::LoadMeltedFreebayesVcfs { .. }));

        let cli = Cli::try_parse_from([
            "ncov-db",
            "load-run",
            "--db",
            "ncov.db",
            "--min-freq-threshold",
            "0.2",
            "/runs/210115_M00325",
        ])
        .unwrap();
        match cli.command {
            Command::LoadRun { loader, run_dir, .. } => {
                assert_eq!(loader.min_freq_threshold, 0.2);
                assert_eq!(loader.freq_threshold, 0.75);
                assert_eq!(run_dir, PathBuf::from("/runs/210115_M00325"));
            }
            other => panic!("Expected LoadRun, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_subcommand_is_an_error() {
        let err = Cli::try_parse_from(["ncov-db", "load-everything"]).unwrap_err();
        assert!(err.use_stderr());

        let help = Cli::try_parse_from(["ncov-db", "--help"]).unwrap_err();
        assert!(!help.use_stderr());
    }

    #[test]
    fn test_usage_exit_codes() {
        let err = Cli::try_parse_from(["ncov-db", "load-everything"]).unwrap_err();
        assert_eq!(report_usage(&err), 1);

        let version = Cli::try_parse_from(["ncov-db", "--version"]).unwrap_err();
        assert_eq!(report_usage(&version), 0);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let cli = Cli::try_parse_from([
            "ncov-db",
            "load-pangolin-results",
            "--db",
            "ncov.db",
            "--min-freq-threshold",
            "0.9",
            "--freq-threshold",
            "0.1",
            "lineages.csv",
        ])
        .unwrap();
        match cli.command {
            Command::LoadPangolinResults { loader, .. } => assert!(loader.into_config().is_err()),
            other => panic!("Expected LoadPangolinResults, got {:?}", other),
        }
    }
}
