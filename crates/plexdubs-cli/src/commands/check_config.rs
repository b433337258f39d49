use crate::output::Output;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use plex_dubs_config::Config;
use serde_json::json;
use std::path::Path;

pub fn run_check_config(config_file: Option<&Path>, output: &Output) -> Result<()> {
    let config = match Config::load(config_file) {
        Ok(config) => config,
        Err(e) => {
            output.error(e.to_string());
            return Err(e).wrap_err("Configuration is invalid");
        }
    };

    if !output.is_human() {
        // The token is never serialized
        output.json(&json!({ "type": "config", "config": config, "collections": config.targets() }));
        return Ok(());
    }

    output.success("Configuration is valid");
    output.info(format!("  Plex server:        {}", config.plex_url));
    for target in config.targets() {
        output.info(format!(
            "  {} library:  '{}' -> collection '{}' (max {})",
            target.library_kind, target.library_section, target.collection_name, target.max_size
        ));
    }
    output.info(format!("  Recency window:     {} days", config.max_date_diff));
    output.info(format!("  Registry size:      {}", config.dedup_registry_size));
    if let Some(tag) = &config.sonarr_anime_tag {
        output.info(format!("  Sonarr anime tag:   {}", tag));
    }
    if let Some(tag) = &config.radarr_anime_tag {
        output.info(format!("  Radarr anime tag:   {}", tag));
    }
    output.info(format!("  Listen address:     {}", config.listen_addr));
    Ok(())
}
