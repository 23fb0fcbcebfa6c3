use crate::document::{PhotoDocument, PhotoHit};
use crate::error::AppError;
use crate::search::{SearchOutcome, SearchQuery, Searcher};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Process-local engine for development runs and tests. Documents are keyed
/// by object key; a query matches when any of its whitespace-separated terms
/// equals one of the document's labels.
#[derive(Default)]
pub struct MemorySearcher {
    documents: RwLock<BTreeMap<String, PhotoDocument>>,
}

impl MemorySearcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemorySearcher {
    pub fn document_count(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn get(&self, object_key: &str) -> Option<PhotoDocument> {
        self.documents
            .read()
            .ok()
            .and_then(|docs| docs.get(object_key).cloned())
    }
}

#[async_trait]
impl Searcher for MemorySearcher {
    async fn index_document(&self, document: &PhotoDocument) -> Result<(), AppError> {
        let mut docs = self
            .documents
            .write()
            .map_err(|_| AppError::Generic("memory index lock poisoned".into()))?;
        docs.insert(document.object_key.clone(), document.clone());
        log::trace!("Memory index now holds {} documents", docs.len());
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, AppError> {
        let docs = self
            .documents
            .read()
            .map_err(|_| AppError::Generic("memory index lock poisoned".into()))?;
        let terms: Vec<String> = query
            .keyword
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let matches: Vec<PhotoHit> = docs
            .values()
            .filter(|doc| terms.iter().any(|term| doc.labels.contains(term)))
            .cloned()
            .map(PhotoHit::from)
            .collect();

        Ok(SearchOutcome {
            total: matches.len() as u64,
            documents: matches.into_iter().take(query.size).collect(),
        })
    }
}
