use crate::config::{AppConfig, Engine};
use crate::error::AppError;
use crate::recognition::{LabelDetector, RekognitionDetector};
use crate::search::Searcher;
use crate::search_clients::{memory::MemorySearcher, opensearch::OpenSearchSearcher};
use crate::signing::AwsCredentials;
use crate::storage::{ObjectStore, S3ObjectStore};
use std::sync::Arc;

/// Clients shared by every invocation, built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ObjectStore>,
    pub detector: Arc<dyn LabelDetector>,
    pub searcher: Arc<dyn Searcher>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ObjectStore>,
        detector: Arc<dyn LabelDetector>,
        searcher: Arc<dyn Searcher>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            detector,
            searcher,
        }
    }

    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let credentials = AwsCredentials::from_env()?;

        let searcher: Arc<dyn Searcher> = match config.engine {
            Engine::Memory => {
                log::info!("Using in-memory search engine");
                Arc::new(MemorySearcher::new())
            }
            Engine::OpenSearch => Arc::new(OpenSearchSearcher::new(&config, credentials.clone())?),
        };
        let store = Arc::new(S3ObjectStore::new(&config, credentials.clone())?);
        let detector = Arc::new(RekognitionDetector::new(&config, credentials)?);

        Ok(Self::new(config, store, detector, searcher))
    }
}
