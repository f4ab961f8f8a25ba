use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;

#[derive(Debug)]
pub struct Settings {
    pub database_url: String,
    /// Auth backend token endpoint; absent means refresh stays disabled.
    pub token_endpoint: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/launcher.db".into(),
            token_endpoint: None,
        }
    }
}

/// Defaults, overridden by `launcher.toml` if present, overridden by env.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("launcher.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
            if let Some(v) = file_cfg.get("token_endpoint") {
                settings.token_endpoint = Some(v.clone());
            }
        }
    }

    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("LAUNCHER__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("LAUNCHER__TOKEN_ENDPOINT") {
        settings.token_endpoint = Some(v);
    }

    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{path}");
    }

    format!("sqlite://{raw_database_url}")
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = database_url
        .strip_prefix("sqlite://")
        .filter(|p| !p.is_empty())
    else {
        return Ok(());
    };

    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory '{}'", parent.display()))?;
    }
    Ok(())
}
