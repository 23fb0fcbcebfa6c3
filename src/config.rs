use crate::error::AppError;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Search engine backend.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    OpenSearch,
    Memory,
}

/// What the indexer does with the remaining records of an upload event once
/// one of them fails.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure, keep going, report it at the end.
    #[default]
    Isolate,
    /// Stop at the first failing record and return its error.
    Abort,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: Engine,
    pub search_endpoint: String,
    pub index_name: String,
    pub region: String,
    pub search_service: String,
    pub storage_endpoint: Option<String>,
    pub recognition_endpoint: Option<String>,
    pub web_port: u16,
    pub log_level: String,
    pub record_failure_policy: FailurePolicy,
}

impl AppConfig {
    pub fn new() -> Result<Self, AppError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("engine", "opensearch")?
            .set_default("search_endpoint", "http://localhost:9200")?
            .set_default("index_name", "photos")?
            .set_default("region", "us-east-1")?
            .set_default("search_service", "es")?
            .set_default("web_port", 8080)?
            .set_default("log_level", "info")?
            .set_default("record_failure_policy", "isolate")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PHOTO_SEARCH"))
            .build()?;

        Ok(s.try_deserialize()?)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests(search_endpoint: &str) -> Self {
        Self {
            engine: Engine::Memory,
            search_endpoint: search_endpoint.to_string(),
            index_name: "photos".to_string(),
            region: "us-east-1".to_string(),
            search_service: "es".to_string(),
            storage_endpoint: None,
            recognition_endpoint: None,
            web_port: 0,
            log_level: "debug".to_string(),
            record_failure_policy: FailurePolicy::Isolate,
        }
    }
}
