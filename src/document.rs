use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User metadata key carrying comma-separated labels supplied at upload.
pub const CUSTOM_LABELS_KEY: &str = "customlabels";

/// The document stored in the search engine, one per object key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDocument {
    pub object_key: String,
    pub bucket: String,
    pub created_timestamp: DateTime<Utc>,
    pub labels: BTreeSet<String>,
}

impl PhotoDocument {
    pub fn new(
        bucket: &str,
        object_key: &str,
        created_timestamp: DateTime<Utc>,
        labels: BTreeSet<String>,
    ) -> Self {
        Self {
            object_key: object_key.to_string(),
            bucket: bucket.to_string(),
            created_timestamp,
            labels,
        }
    }
}

/// Splits the `customlabels` metadata value into trimmed, lowercase labels.
/// Absent, empty and whitespace-only input all yield no labels.
pub fn parse_custom_labels(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Lowercase set-union of both label sources.
pub fn fuse_labels<A, B>(detected: A, custom: B) -> BTreeSet<String>
where
    A: IntoIterator,
    A::Item: AsRef<str>,
    B: IntoIterator,
    B::Item: AsRef<str>,
{
    detected
        .into_iter()
        .map(|l| l.as_ref().to_lowercase())
        .chain(custom.into_iter().map(|l| l.as_ref().to_lowercase()))
        .collect()
}

/// Public object URL in the storage provider's virtual-host form.
pub fn public_url(bucket: &str, object_key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket, object_key)
}

/// The part of a stored document that search results are built from.
/// Read tolerantly: documents written without a timestamp still match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoHit {
    pub object_key: String,
    pub bucket: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl From<PhotoDocument> for PhotoHit {
    fn from(doc: PhotoDocument) -> Self {
        Self {
            object_key: doc.object_key,
            bucket: doc.bucket,
            labels: doc.labels,
        }
    }
}

/// One item of the HTTP channel's result list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub object_key: String,
    pub bucket: String,
    pub labels: BTreeSet<String>,
    pub url: String,
}

impl From<PhotoHit> for SearchResultItem {
    fn from(doc: PhotoHit) -> Self {
        let url = public_url(&doc.bucket, &doc.object_key);
        Self {
            object_key: doc.object_key,
            bucket: doc.bucket,
            labels: doc.labels,
            url,
        }
    }
}
