use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

pub const SOURCE: &str = "coloso";

const DEFAULT_BASE_URL: &str = "https://coloso.co.kr";
const DEFAULT_USER_AGENT: &str = "coloso_crawler/0.1";

/// Runtime settings: built-in defaults, overridden by `COLOSO_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub db_path: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("timeout_secs", 30)?
            .set_default("concurrency", 1)?
            .set_default("db_path", "data/lectures.sqlite")?
            .add_source(Environment::with_prefix("COLOSO").try_parsing(true))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.base_url)
    }
}

/// URLs of everything the crawler talks to, derived from one base.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn categories(&self) -> String {
        format!("{}/api/displays", self.base)
    }

    pub fn category_courses(&self, sub_category_id: i64) -> String {
        format!("{}/category/{}", self.base, sub_category_id)
    }

    pub fn course_detail(&self, product_id: i64) -> String {
        format!("{}/api/catalogs/courses?id={}", self.base, product_id)
    }
}
