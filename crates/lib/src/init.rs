//! Initialize the configuration directory: create ~/.nanbot with a default config and the bundled catalog.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::content::BUILTIN_CATALOG;

/// Graph API version written into a fresh config.
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// File name of the catalog written next to the config.
pub const CATALOG_FILE: &str = "catalog.json";

fn default_config() -> serde_json::Value {
    json!({
        "server": { "bind": "127.0.0.1", "port": 3000 },
        "whatsapp": {
            "apiToken": "",
            "phoneNumberId": "",
            "apiVersion": DEFAULT_API_VERSION,
            "verifyToken": ""
        },
        "dialogue": { "catalogPath": CATALOG_FILE }
    })
}

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with empty credentials and the default API version if missing.
/// - Writes the bundled `catalog.json` if missing, so screen text can be edited in place.
///
/// Existing files are never overwritten.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let body = serde_json::to_string_pretty(&default_config())
            .context("serializing default config")?;
        std::fs::write(config_path, body + "\n")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    let catalog_path = config_dir.join(CATALOG_FILE);
    if !catalog_path.exists() {
        std::fs::write(&catalog_path, BUILTIN_CATALOG)
            .with_context(|| format!("writing catalog to {}", catalog_path.display()))?;
        log::info!("wrote bundled catalog to {}", catalog_path.display());
    } else {
        log::debug!("catalog already exists at {}, skipping", catalog_path.display());
    }

    Ok(config_dir.to_path_buf())
}
