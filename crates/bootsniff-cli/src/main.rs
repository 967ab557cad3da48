//! # bootsniff-cli
//!
//! Binary entry point for bootsniff.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Configuration loading from `bootsniff.yml`
//! - The `check` and `suite` commands, which sniff a boot and report results
//! - Shell completions via `bootsniff completions`

mod checks;
mod completions;
mod config;
mod report;

use anyhow::{Context, Result};
use bootsniff_adapters::{CommandSystem, PtyConsole};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{IsTerminal, stdout};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::checks::{CheckKind, CheckResult, Suite};
use crate::completions::CompletionsArgs;
use crate::config::{BootsniffConfig, SniffOverrides};
use crate::report::OutputFormat;

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// bootsniff - power-cycle a machine and watch its console for boot errors
#[derive(Parser, Debug)]
#[command(name = "bootsniff", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, default_value = "bootsniff.yml", global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single boot sniff check
    Check(CheckArgs),

    /// Run a named suite of checks
    Suite(SuiteArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[arg(value_enum)]
    check: CheckKind,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug)]
struct SuiteArgs {
    #[arg(value_enum)]
    suite: Suite,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Soft errors tolerated before the check fails (overrides config)
    #[arg(long)]
    threshold_attempts: Option<u32>,

    /// Quiet rounds needed before the boot counts as settled (overrides config)
    #[arg(long)]
    good_watermark: Option<u32>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl RunArgs {
    fn overrides(&self) -> SniffOverrides {
        SniffOverrides {
            threshold_attempts: self.threshold_attempts,
            good_watermark: self.good_watermark,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON reports on stdout stay parseable.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    colored::control::set_override(cli.color.should_use_colors());

    let exit_code = match cli.command {
        Commands::Check(args) => run_command(&cli.config, &[args.check], &args.run)?,
        Commands::Suite(args) => run_command(&cli.config, args.suite.checks(), &args.run)?,
        Commands::Completions(args) => {
            completions::generate_completions(&args);
            0
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn run_command(config_path: &Path, checks: &[CheckKind], args: &RunArgs) -> Result<i32> {
    let mut config = BootsniffConfig::load(config_path)?;
    config.apply_overrides(args.overrides());
    config.validate()?;
    debug!(
        threshold_attempts = config.sniff.threshold_attempts,
        good_watermark = config.sniff.good_watermark,
        bmc_type = config.target.bmc_type.as_str(),
        "Configuration loaded"
    );

    let results = execute(checks, &config)?;

    report::write_report(&mut stdout(), &results, args.format)?;
    Ok(report::exit_code(&results))
}

fn execute(checks: &[CheckKind], config: &BootsniffConfig) -> Result<Vec<CheckResult>> {
    if let Some(reason) = checks::skip_reason(config.target.bmc_type) {
        return Ok(checks::skip_all(checks, reason));
    }

    let mut console = PtyConsole::new(config.target.console.clone());
    let mut system = CommandSystem::new(
        config.target.clone(),
        Box::new(PtyConsole::new(config.target.console.clone())),
    )
    .context("Failed to set up system control")?;

    Ok(checks::run_checks(checks, &config.sniff, &mut system, &mut console))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootsniff_adapters::BmcType;

    #[test]
    fn test_color_mode() {
        assert!(ColorMode::Always.should_use_colors());
        assert!(!ColorMode::Never.should_use_colors());
    }

    #[test]
    fn test_parse_check_with_overrides() {
        let cli = Cli::try_parse_from([
            "bootsniff",
            "check",
            "firmware-shell",
            "--threshold-attempts",
            "5",
            "--format",
            "json",
        ])
        .unwrap();

        let Commands::Check(args) = cli.command else {
            panic!("expected check command");
        };
        assert_eq!(args.check, CheckKind::FirmwareShell);
        assert_eq!(args.run.threshold_attempts, Some(5));
        assert_eq!(args.run.good_watermark, None);
        assert_eq!(args.run.format, OutputFormat::Json);
        assert_eq!(cli.config, PathBuf::from("bootsniff.yml"));
    }

    #[test]
    fn test_parse_suite_with_global_flags() {
        let cli = Cli::try_parse_from([
            "bootsniff",
            "suite",
            "skiroot-full",
            "-c",
            "lab.yml",
            "-v",
            "--good-watermark",
            "30",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("lab.yml"));
        let Commands::Suite(args) = cli.command else {
            panic!("expected suite command");
        };
        assert_eq!(args.suite, Suite::SkirootFull);
        assert_eq!(args.run.good_watermark, Some(30));
    }

    #[test]
    fn test_unknown_check_rejected() {
        assert!(Cli::try_parse_from(["bootsniff", "check", "petitboot"]).is_err());
    }

    #[test]
    fn test_simulated_target_skips_without_collaborators() {
        let mut config = BootsniffConfig::default();
        config.target.bmc_type = BmcType::Qemu;
        // An unusable console program proves nothing was spawned.
        config.target.console.program = "/nonexistent/console".to_string();

        let results = execute(Suite::Host.checks(), &config).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, checks::CheckStatus::Skipped);
        assert_eq!(report::exit_code(&results), 0);
    }
}
