use crate::document::{PhotoDocument, PhotoHit};
use crate::error::AppError;
use async_trait::async_trait;

/// Upper bound on hits requested per query.
pub const MAX_RESULTS: usize = 50;

/// A normalised keyword plus the result cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub size: usize,
}

impl SearchQuery {
    /// Trims and lowercases the keyword; indexed labels are lowercase, so
    /// the query has to be as well. Returns `None` for a blank keyword.
    pub fn new(keyword: &str) -> Option<Self> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return None;
        }
        Some(Self {
            keyword,
            size: MAX_RESULTS,
        })
    }
}

/// Matches as reported by the engine. `total` may exceed `documents.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub total: u64,
    pub documents: Vec<PhotoHit>,
}

#[async_trait]
pub trait Searcher: Send + Sync {
    /// Writes the document under its object key, replacing any previous one.
    async fn index_document(&self, document: &PhotoDocument) -> Result<(), AppError>;
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, AppError>;
}
