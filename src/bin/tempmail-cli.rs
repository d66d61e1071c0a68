#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for disposable mailboxes (receive-only)

use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempmail_client::{
    ClientConfig, MessageDetail, MessageSummary, Orchestrator, ProviderHandle,
    Summaries,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tempmail-cli")]
#[command(about = "Disposable mailboxes across several public providers")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Probe every provider and show its health and domains
    Providers,

    /// Create a mailbox and print its address
    Create,

    /// Create a mailbox and print incoming messages until Ctrl-C
    Watch {
        /// Polling interval in seconds (clamped to 2..=10)
        #[arg(long, default_value = "3")]
        interval: u64,

        /// Also print the body of each new message
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ClientConfig::from_env()?;
    let orchestrator = Arc::new(Orchestrator::new(&config)?);

    match &args.command {
        Command::Providers => cmd_providers(&orchestrator, &args).await?,
        Command::Create => cmd_create(&orchestrator, &args).await?,
        Command::Watch { interval, show } => {
            cmd_watch(&orchestrator, &args, *interval, *show).await?;
        }
    }

    Ok(())
}

async fn cmd_providers(
    orchestrator: &Orchestrator,
    args: &Args,
) -> anyhow::Result<()> {
    let pinned = orchestrator.initialize().await;
    let handles = orchestrator.provider_handles();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&handles)?);
    } else {
        print_provider_table(&handles, &pinned);
    }

    Ok(())
}

async fn cmd_create(
    orchestrator: &Orchestrator,
    args: &Args,
) -> anyhow::Result<()> {
    orchestrator.initialize().await;
    orchestrator.create_mailbox().await;
    let mailbox = orchestrator.active_identity();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mailbox)?);
    } else if let Some(mailbox) = mailbox {
        println!("Address:  {}", mailbox.address);
        println!("Provider: {}", mailbox.provider);
    }

    Ok(())
}

async fn cmd_watch(
    orchestrator: &Arc<Orchestrator>,
    args: &Args,
    interval: u64,
    show: bool,
) -> anyhow::Result<()> {
    orchestrator.initialize().await;
    let address = orchestrator.create_mailbox().await;
    eprintln!(
        "Watching {} on {} (Ctrl-C to stop)",
        address,
        orchestrator.active_provider_name()
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<Summaries>();
    orchestrator.start_auto_refresh(
        move |summaries| {
            let _ = tx.send(summaries);
        },
        Some(Duration::from_secs(interval)),
    );

    let mut seen = HashSet::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = rx.recv() => {
                let Some(summaries) = received else { break };
                let unseen = summaries
                    .iter()
                    .filter(|s| seen.insert(s.id.clone()));
                for summary in unseen {
                    print_summary(summary, args.json)?;
                    if !show {
                        continue;
                    }
                    let detail = orchestrator
                        .get_message(&summary.id)
                        .await
                        .into_value();
                    if let Some(detail) = detail {
                        print_detail(&detail, args.json)?;
                    }
                }
            }
        }
    }

    orchestrator.stop_auto_refresh();
    let stats = orchestrator.stats();
    eprintln!(
        "\n{} message(s) fetched, {} provider switch(es)",
        stats.messages_fetched, stats.provider_switches
    );
    Ok(())
}

fn print_provider_table(handles: &[ProviderHandle], pinned: &str) {
    println!("{:<16} {:<8} {:<7} Domains", "Provider", "Healthy", "Pinned");
    println!("{}", "-".repeat(72));

    for handle in handles {
        println!(
            "{:<16} {:<8} {:<7} {}",
            handle.name,
            if handle.healthy { "yes" } else { "no" },
            if handle.name == pinned { "*" } else { "" },
            truncate(&handle.cached_domain_list.join(", "), 40),
        );
    }
}

fn print_summary(summary: &MessageSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }
    println!(
        "{:<20} {:<30} {}",
        summary
            .received_at
            .map_or_else(
                || "-".to_string(),
                |d| d.format("%Y-%m-%d %H:%M").to_string()
            ),
        truncate(summary.from.as_deref().unwrap_or("-"), 28),
        truncate(&summary.subject, 40),
    );
    Ok(())
}

fn print_detail(detail: &MessageDetail, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(detail)?);
        return Ok(());
    }
    println!("\n--- Body ---\n");
    println!("{}", detail.best_body());
    if !detail.attachments.is_empty() {
        println!("\n({} attachment(s))", detail.attachments.len());
    }
    println!();
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
