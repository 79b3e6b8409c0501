// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("charm-bootstrap")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Charm Bootstrap Contributors")
        .about("Bootstrap a charm's dependencies from its wheelhouse, then hand off")
        .subcommand_required(false)
        .subcommand(
            Command::new("run")
                .about("Run the bootstrap pass, then exec COMMAND under the provisioned interpreter")
                .arg(
                    Arg::new("charm_dir")
                        .short('c')
                        .long("charm-dir")
                        .value_name("DIR")
                        .help("Charm directory (default: $JUJU_CHARM_DIR)"),
                )
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .default_value("/")
                        .help("Filesystem root holding etc/lsb-release or etc/redhat-release"),
                )
                .arg(
                    Arg::new("venv")
                        .long("venv")
                        .value_name("DIR")
                        .help("Isolated environment directory (default: ../.venv)"),
                )
                .arg(
                    Arg::new("command")
                        .last(true)
                        .num_args(1..)
                        .help("Hook command to hand off to; provision only when omitted"),
                ),
        )
        .subcommand(
            Command::new("detect")
                .about("Show the detected host distribution")
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .default_value("/")
                        .help("Filesystem root holding etc/lsb-release or etc/redhat-release"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Print as JSON"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show whether the charm is bootstrapped")
                .arg(
                    Arg::new("charm_dir")
                        .short('c')
                        .long("charm-dir")
                        .value_name("DIR")
                        .help("Charm directory (default: $JUJU_CHARM_DIR)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Print as JSON"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("charm-bootstrap.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
