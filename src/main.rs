use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use render_verify::config::VerifierConfig;
use render_verify::digest::ExpectedDigest;
use render_verify::error::EXIT_USAGE;
use render_verify::invocation::Invocation;
use render_verify::report;

#[derive(Parser)]
#[command(
    name = "render-verify",
    version,
    about = "Run a render executable and verify the SHA-256 of its stdout",
    after_help = "Arguments after the first '--' are forwarded to the render executable."
)]
struct Cli {
    /// Render executable to run (invoked with --stdout)
    #[arg(long, env = "RENDER_VERIFY_EXE", value_name = "PATH")]
    render_exe: Option<PathBuf>,

    /// Expected SHA-256 of the render output, hex, any case (surrounding whitespace is ignored)
    #[arg(long, value_name = "HEX", value_parser = ExpectedDigest::parse)]
    sha256: ExpectedDigest,

    /// Print a JSON report on stdout
    #[arg(long)]
    json: bool,

    /// Log the resolved command and digest details to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Arguments forwarded verbatim to the render executable
    #[arg(last = true, value_name = "ARGS")]
    extra_args: Vec<OsString>,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "render_verify=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false),
        )
        .init();
}

/// Flag → `RENDER_VERIFY_EXE` (both via clap) → project config → user config.
fn resolve_render_exe(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(exe) = &cli.render_exe {
        return Ok(exe.clone());
    }
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    VerifierConfig::load(&cwd)?.render_exe.ok_or_else(|| {
        anyhow::anyhow!(
            "no render executable: pass --render-exe, set RENDER_VERIFY_EXE, \
             or set render_exe in .render-verify/config.toml"
        )
    })
}

fn cmd_verify(cli: &Cli) -> i32 {
    let exe = match resolve_render_exe(cli) {
        Ok(exe) => exe,
        Err(e) => {
            eprintln!("[render-verify] error: {e:#}");
            return EXIT_USAGE;
        }
    };
    let invocation = Invocation::new(exe, cli.extra_args.iter().cloned());

    match render_verify::verify(&invocation, &cli.sha256) {
        Ok(v) => {
            tracing::debug!(outcome = ?v.outcome, "verification finished");
            report::print_verification(&v, cli.json);
            v.exit_code()
        }
        Err(e) => {
            report::print_error(&e, cli.json);
            e.exit_code()
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    std::process::exit(cmd_verify(&cli));
}
