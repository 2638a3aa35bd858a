use std::path::Path;

use anyhow::Context;
use config::{Config, Environment, File, FileFormat, Map};
use order_form::FormSettings;
use serde::Deserialize;
use shared::domain::{NormalizationRule, MAX_INGREDIENTS};

pub const CONFIG_FILE: &str = "server.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub nutrition_base_url: String,
    pub max_ingredients: usize,
    pub name_rule: NormalizationRule,
    pub ingredient_rule: NormalizationRule,
    pub verify_after_insert: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/smoothies.db".into(),
            nutrition_base_url: nutrition::DEFAULT_BASE_URL.into(),
            max_ingredients: MAX_INGREDIENTS,
            name_rule: NormalizationRule::Upper,
            ingredient_rule: NormalizationRule::Upper,
            verify_after_insert: false,
        }
    }
}

impl Settings {
    pub fn form_settings(&self) -> FormSettings {
        FormSettings {
            max_ingredients: self.max_ingredients,
            name_rule: self.name_rule,
            ingredient_rule: self.ingredient_rule,
            verify_after_insert: self.verify_after_insert,
        }
    }
}

/// Defaults, then `server.toml` when present, then `APP__*` variables.
/// `SERVER_BIND`, `DATABASE_URL` and `NUTRITION_BASE_URL` still work when
/// their `APP__` counterpart is unset.
pub fn load_settings() -> anyhow::Result<Settings> {
    let env = std::env::vars().collect::<Map<String, String>>();
    settings_from(Path::new(CONFIG_FILE), &env)
}

pub(crate) fn settings_from(
    file: &Path,
    env: &Map<String, String>,
) -> anyhow::Result<Settings> {
    let config = Config::builder()
        .add_source(File::from(file).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        )
        .build()
        .with_context(|| format!("failed to read settings from '{}'", file.display()))?;
    let mut settings: Settings = config
        .try_deserialize()
        .context("invalid server settings")?;

    for (legacy, primary, slot) in [
        ("SERVER_BIND", "APP__BIND_ADDR", &mut settings.bind_addr),
        ("DATABASE_URL", "APP__DATABASE_URL", &mut settings.database_url),
        (
            "NUTRITION_BASE_URL",
            "APP__NUTRITION_BASE_URL",
            &mut settings.nutrition_base_url,
        ),
    ] {
        if env.contains_key(primary) {
            continue;
        }
        if let Some(v) = env.get(legacy) {
            *slot = v.clone();
        }
    }

    settings.max_ingredients = settings.max_ingredients.clamp(1, MAX_INGREDIENTS);
    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.replace('\\', "/");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
