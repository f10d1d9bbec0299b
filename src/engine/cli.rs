//! CLI command handler: layer config, wire Ctrl+C, run the pipeline, pick an exit code.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::process::ExitCode;

use crate::engine::arg_parser::Cli;
use crate::engine::progress::ProgressSink;
use crate::engine::tools::running_as_root;
use crate::error::SignError;
use crate::pipeline::CancelToken;
use crate::report::{JsonSink, OutcomeSink, SortedSink, TextSink};
use crate::utils::filesig_toml::{apply_file_to_opts, default_config_path, load_filesig_toml};
use crate::utils::setup_logging;
use crate::{Algorithm, Opts, OutputFormat, RunStatus, SignOpts};

/// Exit code for a configuration error (bad root, unknown algorithm, bad config).
pub const EXIT_CONFIG: u8 = 2;

/// Build opts: defaults, then `.filesig.toml`, then env/CLI (clap merges env into the CLI fields).
pub fn resolve_opts(cli: &Cli) -> Result<Opts> {
    let mut opts = Opts::default();
    let (config_path, required) = match &cli.config {
        Some(p) => (p.clone(), true),
        None => (default_config_path(), false),
    };
    if let Some(file) = load_filesig_toml(&config_path, required)? {
        apply_file_to_opts(&file, &mut opts)
            .with_context(|| format!("apply {}", config_path.display()))?;
    }

    if let Some(ref id) = cli.algorithm {
        opts.algorithm = id.parse::<Algorithm>()?;
    }
    if cli.jobs.is_some() {
        opts.jobs = cli.jobs;
    }
    if let Some(v) = cli.follow_links {
        opts.follow_links = v;
    }
    if let Some(v) = cli.include_special {
        opts.include_special = v;
    }
    if !cli.exclude.is_empty() {
        opts.exclude = cli.exclude.clone();
    }
    if cli.timeout.is_some() {
        opts.timeout_secs = cli.timeout;
    }
    if cli.deadline.is_some() {
        opts.deadline_secs = cli.deadline;
    }
    if let Some(v) = cli.sorted {
        opts.sorted = v;
    }
    if let Some(json) = cli.json {
        opts.format = if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };
    }
    if let Some(v) = cli.fail_on_error {
        opts.fail_on_error = v;
    }
    if let Some(v) = cli.parallel_walk {
        opts.parallel_walk = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    if let Some(v) = cli.progress {
        opts.progress = v;
    }
    Ok(opts)
}

/// Pick the sink chain for `opts`: format, then optional sorting, then optional progress.
fn build_sink(opts: &Opts) -> Box<dyn OutcomeSink> {
    let base: Box<dyn OutcomeSink> = match opts.format {
        OutputFormat::Text => Box::new(TextSink::stdio()),
        OutputFormat::Json => Box::new(JsonSink::new(std::io::stdout())),
    };
    let ordered: Box<dyn OutcomeSink> = if opts.sorted {
        Box::new(SortedSink::new(base))
    } else {
        base
    };
    if opts.progress {
        Box::new(ProgressSink::new(ordered, "Hashing"))
    } else {
        ordered
    }
}

/// Map an error from [`handle_run`] to an exit code.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SignError>() {
        Some(SignError::Configuration(_)) => EXIT_CONFIG,
        Some(SignError::Cancelled { .. } | SignError::DeadlineExceeded { .. }) => 130,
        Some(SignError::Sink(_) | SignError::Thread(_)) => 1,
        None => EXIT_CONFIG,
    }
}

/// Run one signing pass for the CLI.
pub fn handle_run(cli: &Cli) -> Result<ExitCode> {
    if cli.list_algorithms {
        for algo in Algorithm::all() {
            println!("{}", algo);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let opts = resolve_opts(cli)?;
    setup_logging(opts.verbose);
    if running_as_root() {
        info!("Running as root. File permissions are not enforced, so unreadable-file failures will not appear.");
    }
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    let cancel = CancelToken::new();
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || cancel_handler.cancel()).context("set Ctrl+C handler")?;

    let sign_opts = SignOpts::from(&opts);
    let mut sink = build_sink(&opts);
    let report = crate::sign_dir(&cli.dir, &sign_opts, &cancel, &mut sink)?;

    info!(
        "{} succeeded, {} failed in {:.2?} ({} workers peak)",
        report.summary.succeeded, report.summary.failed, report.elapsed, report.peak_in_flight
    );
    match report.status {
        RunStatus::Completed => {}
        RunStatus::Cancelled => warn!(
            "Cancelled; {} queued files were not hashed",
            report.not_admitted
        ),
        RunStatus::DeadlineExceeded => warn!(
            "Run deadline exceeded; {} queued files were not hashed",
            report.not_admitted
        ),
    }
    Ok(ExitCode::from(report.exit_code(opts.fail_on_error)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use clap::Parser;

    #[test]
    fn cli_overrides_defaults() {
        let cli = Cli::try_parse_from([
            "filesig",
            "-a",
            "blake3",
            "--json",
            "--fail-on-error",
            "false",
            "--config",
            "/nonexistent/filesig.toml",
        ])
        .unwrap();
        // Explicit --config must exist.
        assert!(resolve_opts(&cli).is_err());

        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("custom.toml");
        std::fs::write(&config, "[settings]\nalgorithm = \"md5\"\nsorted = true\n").unwrap();
        let cli = Cli {
            config: Some(config),
            ..cli
        };
        let opts = resolve_opts(&cli).unwrap();
        assert_eq!(opts.algorithm, Algorithm::Blake3);
        assert_eq!(opts.format, OutputFormat::Json);
        assert!(opts.sorted);
        assert!(!opts.fail_on_error);
    }

    #[test]
    fn unknown_algorithm_is_configuration_error() {
        let cli = Cli::try_parse_from(["filesig", "-a", "sha3", "--config", "/dev/null"]).unwrap();
        let err = resolve_opts(&cli).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn exit_codes_by_error_class() {
        let config: anyhow::Error = SignError::from(ConfigError::InvalidConcurrency { value: 0 }).into();
        assert_eq!(exit_code_for(&config), EXIT_CONFIG);
        let sink: anyhow::Error = SignError::Sink(std::io::Error::other("pipe")).into();
        assert_eq!(exit_code_for(&sink), 1);
    }
}
