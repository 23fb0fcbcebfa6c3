use crate::config::AppConfig;
use crate::document::{PhotoDocument, PhotoHit};
use crate::error::AppError;
use crate::search::{SearchOutcome, SearchQuery, Searcher};
use crate::signing::{AwsCredentials, SigV4Signer};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use url::Url;

const SERVICE_NAME: &str = "search engine";

pub struct OpenSearchSearcher {
    client: reqwest::Client,
    endpoint: Url,
    index_name: String,
    signer: SigV4Signer,
}

impl OpenSearchSearcher {
    pub fn new(config: &AppConfig, credentials: AwsCredentials) -> Result<Self, AppError> {
        log::debug!("Creating search client for endpoint: {}", config.search_endpoint);
        let endpoint = Url::parse(&config.search_endpoint)?;
        let signer = SigV4Signer::new(credentials, &config.region, &config.search_service);
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            index_name: config.index_name.clone(),
            signer,
        })
    }

    /// `{endpoint}/{index}/{segments...}`, each segment percent-encoded.
    fn url_for(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Generic(format!("Cannot use {} as a base URL", self.endpoint)))?
            .pop_if_empty()
            .push(&self.index_name)
            .extend(segments);
        Ok(url)
    }

    /// Sends a JSON body signed together with its `Content-Type` header.
    async fn send_signed(
        &self,
        method: Method,
        url: Url,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, AppError> {
        let content_type = mime::APPLICATION_JSON.as_ref();
        let signed = self.signer.sign(
            method.as_str(),
            &url,
            &[("content-type", content_type)],
            &body,
            Utc::now(),
        )?;

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        log::debug!("{} {} -> {}", method, url, response.status());
        if !response.status().is_success() {
            return Err(AppError::upstream(SERVICE_NAME, response).await);
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: Total,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Newer engines report `{"value": n, "relation": ..}`, older ones a bare count.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Object { value: u64 },
    Count(u64),
}

impl Total {
    fn value(&self) -> u64 {
        match *self {
            Total::Object { value } => value,
            Total::Count(value) => value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: PhotoHit,
}

#[async_trait]
impl Searcher for OpenSearchSearcher {
    async fn index_document(&self, document: &PhotoDocument) -> Result<(), AppError> {
        let url = self.url_for(&["_doc", &document.object_key])?;
        let body = serde_json::to_vec(document)?;
        log::trace!("Document to index: {}", String::from_utf8_lossy(&body));

        let response = self.send_signed(Method::PUT, url, body).await?;
        let reply = response.text().await?;
        log::debug!("Index response for {}: {}", document.object_key, reply);
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, AppError> {
        log::debug!("Searching {} for label: {}", self.signer.service(), query.keyword);
        let url = self.url_for(&["_search"])?;
        let body = serde_json::to_vec(&json!({
            "size": query.size,
            "query": {
                "match": { "labels": query.keyword }
            }
        }))?;

        let response = self.send_signed(Method::GET, url, body).await?;
        let parsed: SearchResponse = response.json().await?;

        let outcome = SearchOutcome {
            total: parsed.hits.total.value(),
            documents: parsed.hits.hits.into_iter().map(|hit| hit.source).collect(),
        };
        log::debug!(
            "Found {} documents ({} total) for label: {}",
            outcome.documents.len(),
            outcome.total,
            query.keyword
        );
        Ok(outcome)
    }
}
