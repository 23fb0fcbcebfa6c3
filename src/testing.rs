//! In-process fakes for the external collaborators.

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::document::{PhotoDocument, PhotoHit};
use crate::error::AppError;
use crate::recognition::{DetectParams, DetectedLabel, ImageRef, LabelDetector};
use crate::search::{SearchOutcome, SearchQuery, Searcher};
use crate::search_clients::memory::MemorySearcher;
use crate::storage::{ObjectHead, ObjectStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct FakeStore {
    objects: Arc<Mutex<HashMap<(String, String), ObjectHead>>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(
        self,
        bucket: &str,
        key: &str,
        last_modified: DateTime<Utc>,
        custom_labels: Option<&str>,
    ) -> Self {
        self.set_object(bucket, key, last_modified, custom_labels);
        self
    }

    pub fn set_object(
        &self,
        bucket: &str,
        key: &str,
        last_modified: DateTime<Utc>,
        custom_labels: Option<&str>,
    ) {
        let mut metadata = HashMap::new();
        if let Some(labels) = custom_labels {
            metadata.insert("customlabels".to_string(), labels.to_string());
        }
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            ObjectHead {
                last_modified,
                metadata,
            },
        );
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead, AppError> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or(AppError::Upstream {
                service: "object storage",
                status: 404,
                body: String::new(),
            })
    }
}

#[derive(Clone, Default)]
pub struct FakeDetector {
    labels: Arc<Mutex<HashMap<String, Vec<String>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<(ImageRef, DetectParams)>>>,
}

impl FakeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(self, key: &str, labels: &[&str]) -> Self {
        self.labels.lock().unwrap().insert(
            key.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn failing_on(self, key: &str) -> Self {
        self.failing.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(ImageRef, DetectParams)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LabelDetector for FakeDetector {
    async fn detect_labels(
        &self,
        image: &ImageRef,
        params: &DetectParams,
    ) -> Result<Vec<DetectedLabel>, AppError> {
        self.calls.lock().unwrap().push((image.clone(), *params));
        if self.failing.lock().unwrap().contains(&image.key) {
            return Err(AppError::Upstream {
                service: "recognition service",
                status: 500,
                body: String::new(),
            });
        }
        Ok(self
            .labels
            .lock()
            .unwrap()
            .get(&image.key)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|name| DetectedLabel {
                name,
                confidence: 90.0,
            })
            .collect())
    }
}

/// Returns a canned outcome and records every query it receives.
#[derive(Default)]
pub struct CannedSearcher {
    outcome: SearchOutcome,
    queries: Mutex<Vec<SearchQuery>>,
}

impl CannedSearcher {
    pub fn new(total: u64, documents: Vec<PhotoDocument>) -> Self {
        Self {
            outcome: SearchOutcome {
                total,
                documents: documents.into_iter().map(PhotoHit::from).collect(),
            },
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Searcher for CannedSearcher {
    async fn index_document(&self, _document: &PhotoDocument) -> Result<(), AppError> {
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, AppError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.outcome.clone())
    }
}

pub fn test_context(store: FakeStore, detector: FakeDetector) -> (AppContext, Arc<MemorySearcher>) {
    let searcher = Arc::new(MemorySearcher::new());
    let ctx = AppContext::new(
        AppConfig::for_tests("http://unused"),
        Arc::new(store),
        Arc::new(detector),
        searcher.clone(),
    );
    (ctx, searcher)
}

pub fn search_context(searcher: Arc<CannedSearcher>) -> AppContext {
    AppContext::new(
        AppConfig::for_tests("http://unused"),
        Arc::new(FakeStore::new()),
        Arc::new(FakeDetector::new()),
        searcher,
    )
}

pub fn photo(bucket: &str, key: &str, labels: &[&str]) -> PhotoDocument {
    PhotoDocument::new(
        bucket,
        key,
        Utc::now(),
        labels.iter().map(|l| l.to_string()).collect(),
    )
}
