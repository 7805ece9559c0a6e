//! ddbkit demo - a short walkthrough of the widget façade.
//!
//! Saves a handful of widgets, looks one up through the group index, pages
//! through the group, runs a prefix query and stamps two widgets in one
//! transaction.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DDBKIT_BACKEND` | `memory` | `memory` or `aws` |
//! | `DDBKIT_WIDGETS` | `5` | Widgets saved by the walkthrough |
//! | `DDBKIT_ENDPOINT_URL` | *(unset)* | Endpoint override for the `aws` backend |
//! | `AWS_REGION` | `us-east-1` | Region for the `aws` backend |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod config;
mod widget;

use std::sync::Arc;

use anyhow::{Context, Result};
use ddbkit_aws::{AwsStore, AwsStoreConfig};
use ddbkit_core::Cursor;
use ddbkit_memory::MemoryStore;
use ddbkit_model::DynamoStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Backend, DemoConfig};
use crate::widget::{QueryOptions, Widget, WidgetDao, widget_table};

const GROUP: &str = "demo";

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

async fn build_store(backend: Backend) -> Arc<dyn DynamoStore> {
    match backend {
        Backend::Memory => Arc::new(MemoryStore::new().with_table(widget_table())),
        Backend::Aws => Arc::new(AwsStore::from_config(&AwsStoreConfig::from_env()).await),
    }
}

async fn walkthrough(dao: &WidgetDao, widget_count: usize) -> Result<()> {
    for i in 0..widget_count {
        let mut widget = Widget::new(GROUP, format!("w{i:03}")).with_name(format!("widget {i}"));
        dao.save(&mut widget)
            .await
            .with_context(|| format!("failed to save widget {}", widget.widget_id))?;
    }
    info!(count = widget_count, group = GROUP, "saved widgets");

    let found = dao.find(GROUP, "w000").await?;
    info!(found = ?found.as_ref().map(|w| &w.id), "looked up w000 through the group index");

    let mut offset = Cursor::empty();
    let mut page_no = 0;
    loop {
        let page = dao
            .query(GROUP, &QueryOptions {
                limit: Some(2),
                offset,
                ..QueryOptions::default()
            })
            .await?;
        page_no += 1;
        let ids: Vec<&str> = page.items.iter().map(|w| w.widget_id.as_str()).collect();
        info!(page = page_no, ?ids, cursor = %page.cursor, "read page");
        if !page.has_more() {
            break;
        }
        offset = page.cursor;
    }

    let prefixed = dao
        .query(GROUP, &QueryOptions {
            widget_id_starts_with: Some("w00".to_owned()),
            reverse: true,
            ..QueryOptions::default()
        })
        .await?;
    info!(count = prefixed.items.len(), "prefix query w00*, newest first");

    if let [first, second, ..] = prefixed.items.as_slice() {
        dao.touch_all(&[first.id.as_str(), second.id.as_str()])
            .await
            .context("transaction failed")?;
        info!(first = %first.id, second = %second.id, "touched two widgets atomically");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = DemoConfig::from_env()?;
    init_tracing(&config.log_level)?;

    info!(backend = ?config.backend, "starting ddbkit demo");
    let store = build_store(config.backend).await;
    let dao = WidgetDao::new(store);

    walkthrough(&dao, config.widget_count).await?;
    info!("done");
    Ok(())
}
