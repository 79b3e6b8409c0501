// src/main.rs

use anyhow::{Context, Result};
use charm_bootstrap::config::{BootstrapConfig, Layout};
use charm_bootstrap::context::HostContext;
use charm_bootstrap::host;
use charm_bootstrap::orchestrator::{Orchestrator, Outcome};
use charm_bootstrap::reexec::reexec_into;
use charm_bootstrap::runner::SystemRunner;
use charm_bootstrap::state::BootstrapState;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "charm-bootstrap")]
#[command(
    author,
    version,
    about = "Bootstrap a charm's dependencies from its wheelhouse, then hand off",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bootstrap pass, then exec COMMAND under the provisioned interpreter
    Run {
        /// Charm directory (default: $JUJU_CHARM_DIR)
        #[arg(short, long)]
        charm_dir: Option<PathBuf>,
        /// Filesystem root holding etc/lsb-release or etc/redhat-release
        #[arg(short, long, default_value = "/")]
        root: PathBuf,
        /// Isolated environment directory (default: ../.venv)
        #[arg(long)]
        venv: Option<PathBuf>,
        /// Hook command to hand off to; provision only when omitted
        #[arg(last = true)]
        command: Vec<OsString>,
    },
    /// Show the detected host distribution
    Detect {
        /// Filesystem root holding etc/lsb-release or etc/redhat-release
        #[arg(short, long, default_value = "/")]
        root: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show whether the charm is bootstrapped
    Status {
        /// Charm directory (default: $JUJU_CHARM_DIR)
        #[arg(short, long)]
        charm_dir: Option<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

fn resolve_charm_dir(ctx: &HostContext, flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(dir) => Ok(dir),
        None => ctx
            .charm_dir()
            .context("Pass --charm-dir or run inside a charm hook"),
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            charm_dir,
            root,
            venv,
            command,
        }) => {
            let ctx = HostContext::from_process().context("Failed to read process environment")?;
            let charm_dir = resolve_charm_dir(&ctx, charm_dir)?;

            let mut layout = Layout::new(&charm_dir, &ctx);
            layout.root = root;
            if let Some(venv) = venv {
                layout.venv_dir = venv;
            }

            let config = BootstrapConfig::load(&layout.layer_config())
                .with_context(|| format!("Failed to load {}", layout.layer_config().display()))?;
            info!("Bootstrapping charm at {}", charm_dir.display());

            let runner = SystemRunner;
            let mut orchestrator = Orchestrator::new(layout, config, &runner);
            let outcome = orchestrator.run(ctx, &command)?;

            if let Outcome::RestartRequired { interpreter, .. } = &outcome {
                info!("Provisioned interpreter: {:?}", interpreter);
            }

            match outcome.handoff() {
                Some(handoff) => Err::<(), _>(reexec_into(handoff)).context("Hand-off failed"),
                None => {
                    info!("No command given, exiting after bootstrap");
                    Ok(())
                }
            }
        }
        Some(Commands::Detect { root, json }) => {
            let profile = host::detect_host(&root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                println!("Family:      {}", profile.family);
                println!("ID:          {}", profile.release_id);
                println!("Release:     {}", profile.release);
                println!("Codename:    {}", profile.codename);
                println!("Description: {}", profile.description);
            }
            Ok(())
        }
        Some(Commands::Status { charm_dir, json }) => {
            let ctx = HostContext::from_process().context("Failed to read process environment")?;
            let charm_dir = resolve_charm_dir(&ctx, charm_dir)?;
            let layout = Layout::new(&charm_dir, &ctx);
            let state = BootstrapState::new(layout.sentinel());
            let record = state.read_record()?;

            if json {
                let report = serde_json::json!({
                    "sentinel": layout.sentinel(),
                    "bootstrapped": state.is_bootstrapped(),
                    "record": record,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if state.is_bootstrapped() {
                println!("Bootstrapped ({})", layout.sentinel().display());
                if let Some(record) = record {
                    println!("  At:       {}", record.bootstrapped_at.to_rfc3339());
                    println!("  Host:     {} ({})", record.codename, record.family);
                    println!("  Isolated: {}", record.isolated);
                }
            } else {
                println!("Not bootstrapped ({} absent)", layout.sentinel().display());
            }
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "charm-bootstrap",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("charm-bootstrap v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'charm-bootstrap --help' for usage information");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_collects_trailing_command() {
        let cli = Cli::try_parse_from([
            "charm-bootstrap",
            "run",
            "--charm-dir",
            "/srv/charm",
            "--",
            "hooks/install",
            "--flag",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Run {
                charm_dir, command, ..
            }) => {
                assert_eq!(charm_dir, Some(PathBuf::from("/srv/charm")));
                assert_eq!(
                    command,
                    vec![OsString::from("hooks/install"), OsString::from("--flag")]
                );
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_resolve_charm_dir_prefers_flag() {
        let ctx = HostContext::new(Vec::<(String, String)>::new(), PathBuf::from("/"));
        assert!(resolve_charm_dir(&ctx, None).is_err());
        assert_eq!(
            resolve_charm_dir(&ctx, Some(PathBuf::from("/srv/charm"))).unwrap(),
            PathBuf::from("/srv/charm")
        );
    }

    #[test]
    fn test_run_accepts_non_utf8_command() {
        use std::os::unix::ffi::OsStringExt;

        let latin1 = OsString::from_vec(b"caf\xe9".to_vec());
        let cli = Cli::try_parse_from([
            OsString::from("charm-bootstrap"),
            OsString::from("run"),
            OsString::from("--"),
            OsString::from("hooks/install"),
            latin1.clone(),
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Run { command, .. }) => {
                assert_eq!(command, vec![OsString::from("hooks/install"), latin1]);
            }
            _ => panic!("expected run"),
        }
    }
}
