// src/main.rs
//! feedmirror - CLI Entry Point

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use feedmirror::cli::{Cli, Commands};
use feedmirror::commands;
use std::io;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Usage errors exit 1 like every other failure
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(1);
    });

    // Ctrl-C cancels in-flight fetches and stops the cursor from advancing
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    match cli.command {
        Commands::List {
            feed_index,
            start,
            end,
            verbose,
            max_threads,
        } => {
            commands::cmd_list(
                &feed_index,
                start.as_deref(),
                end.as_deref(),
                verbose,
                max_threads,
                &cancel,
            )
            .await?
        }

        Commands::Nupkgs {
            feed_index,
            output,
            folder_format,
            delay,
            max_threads,
            batch_size,
            mode,
            ignore_errors,
            include,
            exclude,
            extra_roots,
        } => {
            commands::cmd_nupkgs(
                &feed_index,
                output,
                folder_format,
                delay,
                max_threads,
                batch_size,
                mode,
                ignore_errors,
                include,
                exclude,
                extra_roots,
                &cancel,
            )
            .await?
        }

        Commands::Validate {
            feed_index,
            delay,
            max_threads,
        } => commands::cmd_validate(&feed_index, delay, max_threads, &cancel).await?,

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "feedmirror", &mut io::stdout());
        }
    }

    Ok(())
}
