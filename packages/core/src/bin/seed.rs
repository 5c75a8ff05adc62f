//! Development data seeder.
//!
//! Builds a demo hierarchy against the database path given as the first
//! argument: one fonds, ten series, five sub-series per series, three boxes
//! per sub-series. Safe to point at a fresh file; the schema is created on
//! open.
//!
//! Usage: `cargo run --bin seed -- ./data/archcore.db`

use anyhow::Context;
use archcore::db::{DatabaseService, SqliteStore};
use archcore::models::levels;
use archcore::services::{CreateNodeParams, HierarchyService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: seed <db-path>")?;

    let db = Arc::new(DatabaseService::new(db_path).await?);
    let store = Arc::new(SqliteStore::new(db));
    let hierarchy = HierarchyService::new(store);

    let fonds = hierarchy
        .create_node(CreateNodeParams {
            title: "Fond-1".to_string(),
            level_of_description: Some(levels::FONDS.to_string()),
            ..Default::default()
        })
        .await?;

    for a in 0..10 {
        let series = hierarchy
            .create_node(CreateNodeParams {
                title: format!("Serie-{}", a),
                parent_id: Some(fonds.id.clone()),
                level_of_description: Some(levels::SERIES.to_string()),
                ..Default::default()
            })
            .await?;

        for b in 0..5 {
            let sub_series = hierarchy
                .create_node(CreateNodeParams {
                    title: format!("SubSerie-{}", b),
                    parent_id: Some(series.id.clone()),
                    level_of_description: Some(levels::SUB_SERIES.to_string()),
                    ..Default::default()
                })
                .await?;

            for c in 0..3 {
                hierarchy
                    .create_node(CreateNodeParams {
                        title: format!("Box-{}", c),
                        parent_id: Some(sub_series.id.clone()),
                        level_of_description: Some(levels::BOX.to_string()),
                        ..Default::default()
                    })
                    .await?;
            }
        }
    }

    tracing::info!(fonds = %fonds.id, "seeded demo hierarchy");
    Ok(())
}
