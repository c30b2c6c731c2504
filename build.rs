// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: feed service index
fn feed_index_arg() -> Arg {
    Arg::new("feed_index")
        .required(true)
        .value_name("FEED")
        .help("Feed service index URI or path to a feed published to disk")
}

/// Common argument: publisher-race delay
fn delay_arg() -> Arg {
    Arg::new("delay")
        .long("delay")
        .value_name("MINUTES")
        .default_value("10")
        .help("Ignore commits newer than this many minutes")
}

/// Common argument: concurrency bound
fn max_threads_arg() -> Arg {
    Arg::new("max_threads")
        .long("max-threads")
        .value_name("N")
        .default_value("16")
        .help("Maximum concurrent fetches")
}

fn build_cli() -> Command {
    Command::new("feedmirror")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mirror and inspect NuGet v3 feeds via the catalog resource")
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("List the live packages on a feed")
                .arg(feed_index_arg())
                .arg(
                    Arg::new("start")
                        .short('s')
                        .long("start")
                        .help("Window start, exclusive (ISO-8601)"),
                )
                .arg(
                    Arg::new("end")
                        .short('e')
                        .long("end")
                        .help("Window end, inclusive (ISO-8601)"),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .action(clap::ArgAction::SetTrue)
                        .help("Include commit timestamps in the output"),
                )
                .arg(max_threads_arg()),
        )
        .subcommand(
            Command::new("nupkgs")
                .about("Mirror a feed's package archives to a local directory tree")
                .arg(feed_index_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value(".")
                        .help("Output directory"),
                )
                .arg(
                    Arg::new("folder_format")
                        .long("folder-format")
                        .value_parser(["v2", "v3"])
                        .default_value("v3")
                        .help("Directory layout for mirrored archives"),
                )
                .arg(delay_arg())
                .arg(max_threads_arg())
                .arg(
                    Arg::new("batch_size")
                        .long("batch-size")
                        .default_value("128")
                        .help("Entries dispatched per batch"),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_parser([
                            "fail-if-exists",
                            "skip-if-exists",
                            "overwrite-if-newer",
                            "force",
                        ])
                        .default_value("overwrite-if-newer")
                        .help("Behavior when the destination archive already exists"),
                )
                .arg(
                    Arg::new("ignore_errors")
                        .long("ignore-errors")
                        .action(clap::ArgAction::SetTrue)
                        .help("Log download failures instead of failing the run"),
                )
                .arg(
                    Arg::new("include")
                        .short('i')
                        .long("include")
                        .action(clap::ArgAction::Append)
                        .help("Only mirror ids matching these globs"),
                )
                .arg(
                    Arg::new("exclude")
                        .short('e')
                        .long("exclude")
                        .action(clap::ArgAction::Append)
                        .help("Skip ids matching these globs"),
                )
                .arg(
                    Arg::new("extra_root")
                        .long("extra-root")
                        .action(clap::ArgAction::Append)
                        .help("Additional storage roots considered for archive placement"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check that every live archive on a feed is reachable")
                .arg(feed_index_arg())
                .arg(delay_arg())
                .arg(max_threads_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("feedmirror.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }
}
