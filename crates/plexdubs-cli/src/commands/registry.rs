use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::Table;
use plex_dubs_config::{Config, PathManager, DEFAULT_DEDUP_REGISTRY_SIZE};
use plex_dubs_core::RegistryStorage;
use serde_json::json;
use std::path::Path;

fn storage() -> RegistryStorage {
    RegistryStorage::new(PathManager::default().registry_file())
}

pub fn run_list(config_file: Option<&Path>, output: &Output) -> Result<()> {
    // Listing should still work when the Plex settings are incomplete
    let capacity = match Config::load(config_file) {
        Ok(config) => config.dedup_registry_size,
        Err(e) => {
            output.warn(format!(
                "Configuration incomplete ({}); assuming registry size {}",
                e, DEFAULT_DEDUP_REGISTRY_SIZE
            ));
            DEFAULT_DEDUP_REGISTRY_SIZE
        }
    };

    let storage = storage();
    let registries = storage
        .load(capacity)
        .map_err(|e| eyre!("Failed to read registry at {}: {:#}", storage.path().display(), e))?;

    if !output.is_human() {
        let entries: serde_json::Map<String, serde_json::Value> = registries
            .iter()
            .map(|(kind, registry)| (kind.to_string(), json!(registry.iter().collect::<Vec<_>>())))
            .collect();
        output.json(&json!({ "type": "registry", "path": storage.path(), "entries": entries }));
        return Ok(());
    }

    if registries.values().all(|registry| registry.is_empty()) {
        output.info(format!("Registry is empty ({})", storage.path().display()));
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Library", "Media id"]);
    for (kind, registry) in &registries {
        for media_id in registry.iter() {
            table.add_row(vec![kind.to_string(), media_id.to_string()]);
        }
    }
    output.info(table.to_string());
    Ok(())
}

pub fn run_clear(output: &Output) -> Result<()> {
    let storage = storage();
    storage
        .clear()
        .map_err(|e| eyre!("Failed to clear registry at {}: {:#}", storage.path().display(), e))?;
    output.success(format!("Cleared registry {}", storage.path().display()));
    output.info("A running server still holds its registry in memory; restart it to start empty");
    Ok(())
}
