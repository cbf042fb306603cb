use crate::output::{self, OutputFormat};
use anyhow::Result;
use owo_colors::OwoColorize;
use redash_common::config::ConnectionSettings;
use redash_common::models::Dialect;
use redash_core::remote::{ControlPlane, HttpControlPlane};
use serde::Serialize;

#[derive(Serialize)]
struct DataSourceList {
    data_sources: Vec<redash_core::remote::DataSource>,
}

/// List the data sources visible to the configured API key.
pub async fn data_sources(settings: &ConnectionSettings, format: OutputFormat) -> Result<i32> {
    let control_plane = HttpControlPlane::new(settings)?;
    let sources = control_plane.data_sources().await?;

    if format.is_machine_readable() {
        output::print_success(
            format,
            DataSourceList {
                data_sources: sources,
            },
        )?;
        return Ok(0);
    }

    if sources.is_empty() {
        println!("No data sources visible to this API key.");
        return Ok(0);
    }
    for source in sources {
        println!(
            "{} {} (Type: {}, Dialect: {})",
            format!("#{}", source.id).dimmed(),
            source.name.bold(),
            source.source_type.cyan(),
            Dialect::for_data_source_type(&source.source_type)
        );
    }
    Ok(0)
}
