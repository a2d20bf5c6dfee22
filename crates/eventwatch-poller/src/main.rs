// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! eventwatch - follow account events from the terminal.
//!
//! Commands:
//! - `watch` polls with adaptive backoff and prints new events until Ctrl-C
//! - `list` prints one page of events
//! - `history --before` prints events older than a timestamp
//! - `open` marks the most recent unseen event as seen
//! - `seen` and `read` mark a single event

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use eventwatch_api::{
    Event, EventSource, EventsClient, FilterOptions, event_message, format_api_datetime,
    generic_message, parse_api_datetime,
};
use eventwatch_poller::{
    BackoffPolicy, BackoffStrategy, NotificationCenter, NotificationList, PollerConfig,
    PollingController,
};
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "eventwatch", version, about = "Follow cloud account events")]
struct Cli {
    /// API root
    #[arg(long, env = "EVENTWATCH_API_URL", value_name = "URL")]
    api_url: Option<String>,

    /// Personal access token
    #[arg(long, env = "EVENTWATCH_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    token: Option<String>,

    /// Events per page
    #[arg(long, env = "EVENTWATCH_PAGE_SIZE", value_name = "N")]
    page_size: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll for new events and print them as they arrive
    Watch {
        /// Poll id used in logs
        #[arg(long, default_value = "notifications")]
        poll_id: String,

        /// First interval in milliseconds
        #[arg(long, value_name = "MS")]
        initial_ms: Option<u64>,

        /// Interval ceiling in milliseconds
        #[arg(long, value_name = "MS")]
        max_ms: Option<u64>,

        /// Grow the interval linearly instead of exponentially
        #[arg(long)]
        linear: bool,
    },

    /// Print one page of events, newest first
    List {
        /// Only events not yet seen
        #[arg(long)]
        unseen: bool,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Print events created before a timestamp (YYYY-MM-DDTHH:MM:SS)
    History {
        #[arg(long, value_name = "TIMESTAMP")]
        before: String,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Mark the most recent unseen event as seen
    Open,

    /// Mark one event as seen
    Seen { event_id: u64 },

    /// Mark one event as read
    Read { event_id: u64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventwatch=info,eventwatch_poller=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();
    let mut config = PollerConfig::from_env().context("failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api = config.api.with_base_url(url);
    }
    if let Some(token) = cli.token {
        config.api = config.api.with_token(token);
    }
    if let Some(page_size) = cli.page_size {
        config.api = config.api.with_page_size(page_size);
    }

    let client = Arc::new(EventsClient::new(config.api.clone())?);

    match cli.command {
        Command::Watch {
            poll_id,
            initial_ms,
            max_ms,
            linear,
        } => {
            let mut policy = config.backoff;
            if let Some(ms) = initial_ms {
                policy.initial = Duration::from_millis(ms);
            }
            if let Some(ms) = max_ms {
                policy.max = Duration::from_millis(ms);
            }
            if linear {
                policy.strategy = BackoffStrategy::Linear;
            }
            policy.validate()?;
            watch(client, policy, &poll_id).await
        }
        Command::List { unseen, page, json } => {
            let filter = if unseen {
                FilterOptions::unseen()
            } else {
                FilterOptions::new()
            };
            let result = client.list_events(&filter, page).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for event in &result.data {
                    print_event(event);
                }
                println!(
                    "page {}/{} ({} events)",
                    result.page, result.pages, result.results
                );
            }
            Ok(())
        }
        Command::History { before, page } => {
            let Some(before) = parse_api_datetime(&before) else {
                bail!("invalid timestamp '{}', expected YYYY-MM-DDTHH:MM:SS", before);
            };
            let result = client
                .list_events(&FilterOptions::created_before(before), page)
                .await?;
            for event in &result.data {
                print_event(event);
            }
            if result.has_next() {
                println!("more available: --page {}", result.page + 1);
            }
            Ok(())
        }
        Command::Open => {
            let page = client.list_events(&FilterOptions::unseen(), 1).await?;
            let list = Arc::new(Mutex::new(NotificationList::new()));
            let center = NotificationCenter::new(client, list);
            center.list().lock().await.ingest(page.data);
            match center.open().await? {
                Some(id) => println!("marked event {} as seen", id),
                None => println!("no unseen events"),
            }
            Ok(())
        }
        Command::Seen { event_id } => {
            client.mark_seen(event_id).await?;
            println!("marked event {} as seen", event_id);
            Ok(())
        }
        Command::Read { event_id } => {
            client.mark_read(event_id).await?;
            println!("marked event {} as read", event_id);
            Ok(())
        }
    }
}

async fn watch(
    client: Arc<EventsClient>,
    policy: BackoffPolicy,
    poll_id: &str,
) -> anyhow::Result<()> {
    let controller = PollingController::new(client, policy);
    let mut events = controller.subscribe();

    info!(
        poll_id,
        initial_ms = policy.initial.as_millis() as u64,
        max_ms = policy.max.as_millis() as u64,
        strategy = policy.strategy.as_str(),
        "Watching account events"
    );
    controller.start(poll_id).await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Output fell behind, some events were not printed");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.shutdown().await;
    Ok(())
}

fn print_event(event: &Event) {
    let text = event_message(event).unwrap_or_else(|| generic_message(event));
    let marker = if event.seen { ' ' } else { '*' };
    println!(
        "{} {} #{} {}",
        marker,
        format_api_datetime(&event.created),
        event.id,
        text
    );
}
