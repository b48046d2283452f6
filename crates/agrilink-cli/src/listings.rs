//! Live listings API commands.
//!
//! Called from `main` once configuration is loaded. Ctrl-C cancels the
//! in-flight call: any back-off in progress is cut short and the last error
//! is reported.

use std::path::{Path, PathBuf};

use agrilink_client::{CancellationToken, ListingsClient, ListingsQuery, SortOrder};
use agrilink_core::{AppConfig, ListingDraft, ListingForm, ListingStatus, ProductCategory};
use anyhow::Context;
use clap::Subcommand;
use rust_decimal::Decimal;

use crate::offline::read_json;

/// Sub-commands available under `listings`.
#[derive(Debug, Subcommand)]
pub enum ListingsCommands {
    /// List public listings, or your own with --mine
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "10")]
        limit: u32,
        #[arg(long, value_parser = parse_category)]
        category: Option<ProductCategory>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
        /// Sort newest first
        #[arg(long)]
        newest: bool,
        /// Only the authenticated farmer's listings
        #[arg(long)]
        mine: bool,
    },
    /// Fetch a single listing
    Get { id: String },
    /// Create a listing from a JSON payload
    Create {
        file: PathBuf,
        /// Treat the payload as raw, string-typed form input
        #[arg(long)]
        form: bool,
    },
    /// Delete a listing
    Delete { id: String },
    /// Set the status of one or more listings
    SetStatus {
        #[arg(long, value_parser = parse_status)]
        status: ListingStatus,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show view and inquiry figures for one of your listings
    Analytics { id: String },
    /// Check that the listings API is reachable
    Health,
}

fn parse_category(raw: &str) -> Result<ProductCategory, String> {
    ProductCategory::from_wire(&raw.to_ascii_lowercase()).ok_or_else(|| {
        let allowed: Vec<&str> = ProductCategory::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown category; expected one of {}", allowed.join(", "))
    })
}

fn parse_status(raw: &str) -> Result<ListingStatus, String> {
    ListingStatus::from_wire(&raw.to_ascii_lowercase()).ok_or_else(|| {
        let allowed: Vec<&str> = ListingStatus::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown status; expected one of {}", allowed.join(", "))
    })
}

/// Runs one listings command, writing the API log to `dump_log` afterwards
/// whether or not the command succeeded.
///
/// # Errors
///
/// Returns an error if the client cannot be built, the call fails, or the
/// log cannot be written.
pub(crate) async fn run_listings(
    config: &AppConfig,
    command: ListingsCommands,
    dump_log: Option<&Path>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let client = ListingsClient::from_config(config)
        .context("failed to build listings client")?
        .with_cancellation(cancel.clone());

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, cancelling request");
            cancel.cancel();
        }
    });

    let result = dispatch(&client, command).await;
    ctrl_c.abort();

    if let Some(path) = dump_log {
        let json = client.log().export_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write API log to {}", path.display()))?;
        tracing::info!(path = %path.display(), entries = client.log().len(), "API log written");
    }

    result
}

async fn dispatch(client: &ListingsClient, command: ListingsCommands) -> anyhow::Result<()> {
    match command {
        ListingsCommands::List {
            page,
            limit,
            category,
            search,
            min_price,
            max_price,
            newest,
            mine,
        } => {
            let query = ListingsQuery {
                category,
                search,
                min_price,
                max_price,
                sort_by: newest.then(|| "createdAt".to_string()),
                sort_order: newest.then_some(SortOrder::Desc),
                ..ListingsQuery::default()
            }
            .page(page, limit);
            let listings = if mine {
                client.my_listings(&query).await
            } else {
                client.list_listings(&query).await
            }
            .map_err(describe)?;
            print_json(&listings)
        }
        ListingsCommands::Get { id } => print_json(&client.get_listing(&id).await.map_err(describe)?),
        ListingsCommands::Create { file, form } => {
            let payload = read_json(&file)?;
            let listing = if form {
                let form: ListingForm =
                    serde_json::from_value(payload).context("payload is not a listing form")?;
                client.create_listing_from_form(&form).await
            } else {
                let draft: ListingDraft =
                    serde_json::from_value(payload).context("payload is not a listing draft")?;
                client.create_listing(&draft).await
            }
            .map_err(describe)?;
            print_json(&listing)
        }
        ListingsCommands::Delete { id } => {
            client.delete_listing(&id).await.map_err(describe)?;
            println!("deleted listing {id}");
            Ok(())
        }
        ListingsCommands::SetStatus { status, ids } => {
            client
                .bulk_update_status(&ids, status)
                .await
                .map_err(describe)?;
            println!("set {} listing(s) to {status}", ids.len());
            Ok(())
        }
        ListingsCommands::Analytics { id } => {
            print_json(&client.listing_analytics(&id).await.map_err(describe)?)
        }
        ListingsCommands::Health => {
            if client.health_check().await {
                println!("listings API is reachable");
                Ok(())
            } else {
                anyhow::bail!("listings API is not reachable")
            }
        }
    }
}

/// Pairs the user-facing message with the underlying error and any field
/// errors, so the terminal shows both.
fn describe(err: agrilink_client::ApiError) -> anyhow::Error {
    let mut message = err.user_message();
    if let Some(fields) = err.field_errors() {
        for (field, messages) in fields {
            message.push_str(&format!("\n  {field}: {}", messages.join("; ")));
        }
    }
    anyhow::Error::new(err).context(message)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
