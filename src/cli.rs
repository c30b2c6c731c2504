// src/cli.rs
//! CLI definitions for the feedmirror tool
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use crate::mirror::{DownloadMode, Layout};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "feedmirror")]
#[command(version)]
#[command(about = "Mirror and inspect NuGet v3 feeds via the catalog resource", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the live packages on a feed
    List {
        /// Feed service index URI (or path to a feed published to disk)
        feed_index: String,

        /// Window start, exclusive (ISO-8601; default: beginning of time)
        #[arg(short, long)]
        start: Option<String>,

        /// Window end, inclusive (ISO-8601; default: now)
        #[arg(short, long)]
        end: Option<String>,

        /// Include commit timestamps in the output
        #[arg(short, long)]
        verbose: bool,

        /// Maximum concurrent page fetches
        #[arg(long, default_value_t = crate::catalog::DEFAULT_MAX_THREADS)]
        max_threads: usize,
    },

    /// Mirror a feed's package archives to a local directory tree
    Nupkgs {
        /// Feed service index URI (or path to a feed published to disk)
        feed_index: String,

        /// Output directory (also holds cursor.json and the run logs)
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Directory layout for mirrored archives
        #[arg(long, value_enum, default_value_t = Layout::V3)]
        folder_format: Layout,

        /// Ignore commits newer than this many minutes, avoiding races
        /// with a running publisher
        #[arg(long, default_value_t = crate::mirror::DEFAULT_DELAY_MINUTES)]
        delay: i64,

        /// Maximum concurrent downloads
        #[arg(long, default_value_t = crate::catalog::DEFAULT_MAX_THREADS)]
        max_threads: usize,

        /// Entries dispatched per batch; the cursor advances between batches
        #[arg(long, default_value_t = crate::mirror::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Behavior when the destination archive already exists
        #[arg(long, value_enum, default_value_t = DownloadMode::OverwriteIfNewer)]
        mode: DownloadMode,

        /// Log download failures instead of failing the run
        #[arg(long)]
        ignore_errors: bool,

        /// Only mirror ids matching these globs (repeatable)
        #[arg(short = 'i', long = "include")]
        include: Vec<String>,

        /// Skip ids matching these globs (repeatable)
        #[arg(short = 'e', long = "exclude")]
        exclude: Vec<String>,

        /// Additional storage roots considered for archive placement
        #[arg(long = "extra-root")]
        extra_roots: Vec<PathBuf>,
    },

    /// Check that every live archive on a feed is reachable
    Validate {
        /// Feed service index URI (or path to a feed published to disk)
        feed_index: String,

        /// Ignore commits newer than this many minutes
        #[arg(long, default_value_t = crate::mirror::DEFAULT_DELAY_MINUTES)]
        delay: i64,

        /// Maximum concurrent probes
        #[arg(long, default_value_t = crate::catalog::DEFAULT_MAX_THREADS)]
        max_threads: usize,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
