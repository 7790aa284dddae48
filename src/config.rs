use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::fetch::FetchMode;
use crate::menu::Projection;
use crate::notify::dispatch::DispatchConfig;
use crate::schedule::DailyTrigger;

pub const DEFAULT_PAGE_URL: &str = "https://order.toasttab.com/online/benchmark-pizzeria-kensington";
const CONFIG_FILE: &str = "menu_watch";
const ENV_PREFIX: &str = "MENU_WATCH";

/// Unprefixed variables honoured for compatibility with existing deployments.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PIZZA_DATA_FILE", "data_file"),
    ("HA_URL", "ha_url"),
    ("HA_TOKEN", "ha_token"),
    ("SPIDER_API_KEY", "spider_api_key"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub page_url: String,
    pub data_file: PathBuf,
    pub category: String,
    pub image_size: String,
    /// Daily trigger, `HH:MM` UTC.
    pub run_at: String,
    pub fetch_mode: FetchMode,
    pub timeout_secs: u64,
    pub ha_url: Option<String>,
    pub ha_token: Option<String>,
    pub notify_service: String,
    pub notify_title: String,
    pub spider_api_key: Option<String>,
}

/// Values from command-line flags; highest precedence.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub page_url: Option<String>,
    pub data_file: Option<PathBuf>,
    pub fetch_mode: Option<FetchMode>,
}

impl Settings {
    /// Defaults < `menu_watch.toml` < `MENU_WATCH_*` < legacy vars < flags.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::build(overrides, &env, Some(CONFIG_FILE))
    }

    fn build(
        overrides: &Overrides,
        env: &HashMap<String, String>,
        config_file: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("page_url", DEFAULT_PAGE_URL)?
            .set_default("data_file", "data.json")?
            .set_default("category", "pizza")?
            .set_default("image_size", "xl")?
            .set_default("run_at", "21:37")?
            .set_default("fetch_mode", "rendered")?
            .set_default("timeout_secs", 60)?
            .set_default("notify_service", "all_phones")?
            .set_default("notify_title", "Benchmark pizza menu changed!")?;

        if let Some(name) = config_file {
            builder = builder.add_source(File::with_name(name).required(false));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).source(Some(env.clone())));

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, env.get(*var).cloned())?;
        }

        builder = builder
            .set_override_option("page_url", overrides.page_url.clone())?
            .set_override_option(
                "data_file",
                overrides.data_file.as_ref().map(|p| p.display().to_string()),
            )?
            .set_override_option(
                "fetch_mode",
                overrides.fetch_mode.map(|m| match m {
                    FetchMode::Rendered => "rendered",
                    FetchMode::Direct => "direct",
                }),
            )?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.trigger()?;
        Ok(settings)
    }

    pub fn trigger(&self) -> Result<DailyTrigger, ConfigError> {
        DailyTrigger::parse(&self.run_at).map_err(|e| {
            ConfigError::Message(format!("invalid run_at `{}` (expected HH:MM): {}", self.run_at, e))
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn projection(&self) -> Projection {
        Projection {
            category: self.category.clone(),
            image_size: self.image_size.clone(),
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            base_url: self.ha_url.clone(),
            token: self.ha_token.clone(),
            service: self.notify_service.clone(),
            title: self.notify_title.clone(),
            click_url: self.page_url.clone(),
            timeout: self.timeout(),
        }
    }
}
