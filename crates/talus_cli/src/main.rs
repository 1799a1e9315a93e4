//! Talus CLI — the command-line driver for the Talus FPGA placement-and-routing engine.
//!
//! `talus-pnr` reads a packed netlist (or a previously placed snapshot),
//! places it onto a device, routes every net, and writes a place file (§6).

#![warn(missing_docs)]

mod run;

use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Parser, ValueEnum};
use talus_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use talus_source::{SourceDb, Span};

/// Talus — an FPGA placement-and-routing engine.
#[derive(Parser, Debug)]
#[command(name = "talus-pnr", version, about = "Talus placement-and-routing engine")]
#[command(group(ArgGroup::new("stage").args(["blif", "net", "place"]).required(true)))]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `talus.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Architecture preset name, or a path to an architecture JSON file.
    #[arg(long)]
    pub architecture: Option<String>,

    /// Start from a BLIF gate-level netlist. Out of scope: always rejected,
    /// with a note to pre-pack to `.net`.
    #[arg(long)]
    pub blif: Option<PathBuf>,

    /// Start from a packed `.net` netlist: run placement, then routing.
    #[arg(long)]
    pub net: Option<PathBuf>,

    /// Start from a previously placed circuit snapshot: run routing only.
    #[arg(long)]
    pub place: Option<PathBuf>,

    /// Randomize initial placement with the fixed seed 1.
    #[arg(long)]
    pub random: bool,

    /// A placer to run: `random`, `analytical`, or `sa`, optionally with
    /// inline `opt=value` overrides (e.g. `--placer sa,lambda=0.3`).
    /// Repeatable; given at least once, replaces the configured sequence.
    #[arg(long = "placer")]
    pub placers: Vec<String>,

    /// Output place file path.
    #[arg(long)]
    pub output: PathBuf,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config.clone(),
    };

    match run::run(&cli, &global) {
        Ok(code) => process::exit(code),
        Err(e) => {
            report_fatal(e.as_ref(), color);
            process::exit(1);
        }
    }
}

/// Renders a top-level fatal error the way the diagnostic pipeline renders
/// everything else (§AMBIENT): one error-severity [`Diagnostic`] through a
/// [`TerminalRenderer`]. All errors reaching this point are synthesized
/// (no single source file is at fault), so they carry `Span::DUMMY`.
fn report_fatal(e: &(dyn std::error::Error + 'static), color: bool) {
    let sink = DiagnosticSink::new();
    sink.emit(Diagnostic::error(classify_error(e), e.to_string(), Span::DUMMY));

    let renderer = TerminalRenderer::new(color, 80);
    let source_db = SourceDb::new();
    for diag in sink.diagnostics() {
        eprintln!("{}", renderer.render(&diag, &source_db));
    }
}

/// Maps a fatal error to a diagnostic code per §7's error kinds.
fn classify_error(e: &(dyn std::error::Error + 'static)) -> DiagnosticCode {
    use talus_common::PnrError;

    if let Some(err) = e.downcast_ref::<PnrError>() {
        let number = match err {
            PnrError::InputFormat { .. } => 101,
            PnrError::UnsupportedFormat { .. } => 102,
            PnrError::ArchitectureInconsistency(_) => 110,
            PnrError::PlacementInfeasible(_) => 120,
            PnrError::RouterUnreachableSink { .. } => 130,
            PnrError::RoutingNotConverged { .. } => 140,
        };
        return DiagnosticCode::new(Category::Error, number);
    }
    if e.downcast_ref::<talus_config::ConfigError>().is_some() {
        return DiagnosticCode::new(Category::Error, 150);
    }
    DiagnosticCode::new(Category::Error, 100)
}

/// Rough terminal detection — checks if stdout is a terminal.
fn atty_is_terminal() -> bool {
    // Use a simple heuristic: check the TERM env var.
    // In a real build we'd use the `is-terminal` crate, but this is
    // sufficient for now.
    std::env::var("TERM").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_net_stage() {
        let cli = Cli::parse_from(["talus-pnr", "--architecture", "a.json", "--net", "design.net", "--output", "out.place"]);
        assert_eq!(cli.net.as_deref(), Some(std::path::Path::new("design.net")));
        assert!(cli.blif.is_none());
        assert!(cli.place.is_none());
    }

    #[test]
    fn parse_place_stage() {
        let cli = Cli::parse_from(["talus-pnr", "--architecture", "a.json", "--place", "snap.json", "--output", "out.place"]);
        assert_eq!(cli.place.as_deref(), Some(std::path::Path::new("snap.json")));
    }

    #[test]
    fn stage_flags_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "talus-pnr",
            "--architecture",
            "a.json",
            "--net",
            "design.net",
            "--place",
            "snap.json",
            "--output",
            "out.place",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn stage_flag_is_required() {
        let result = Cli::try_parse_from(["talus-pnr", "--architecture", "a.json", "--output", "out.place"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_repeatable_placer_flags() {
        let cli = Cli::parse_from([
            "talus-pnr",
            "--architecture",
            "a.json",
            "--net",
            "design.net",
            "--placer",
            "random",
            "--placer",
            "sa,lambda=0.3",
            "--output",
            "out.place",
        ]);
        assert_eq!(cli.placers, vec!["random".to_string(), "sa,lambda=0.3".to_string()]);
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from([
            "talus-pnr",
            "--quiet",
            "--color",
            "never",
            "--architecture",
            "a.json",
            "--net",
            "design.net",
            "--output",
            "out.place",
        ]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_random_flag() {
        let cli = Cli::parse_from([
            "talus-pnr",
            "--architecture",
            "a.json",
            "--net",
            "design.net",
            "--random",
            "--output",
            "out.place",
        ]);
        assert!(cli.random);
    }
}
