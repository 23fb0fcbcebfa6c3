//! Object storage metadata lookup.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::signing::{hex_sha256, uri_encode, AwsCredentials, SigV4Signer};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, LAST_MODIFIED};
use std::collections::HashMap;
use url::Url;

const SERVICE_NAME: &str = "object storage";
const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// What a metadata lookup returns for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHead {
    pub last_modified: DateTime<Utc>,
    /// User metadata with lowercase keys and the provider prefix removed.
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead, AppError>;
}

pub struct S3ObjectStore {
    client: reqwest::Client,
    region: String,
    endpoint: Option<Url>,
    signer: SigV4Signer,
}

impl S3ObjectStore {
    pub fn new(config: &AppConfig, credentials: AwsCredentials) -> Result<Self, AppError> {
        let endpoint = config
            .storage_endpoint
            .as_deref()
            .map(Url::parse)
            .transpose()?;
        Ok(Self {
            client: reqwest::Client::new(),
            region: config.region.clone(),
            endpoint,
            signer: SigV4Signer::new(credentials, &config.region, "s3"),
        })
    }

    /// Virtual-host style against AWS, path style against a custom endpoint.
    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, AppError> {
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        let url = match self.endpoint {
            Some(ref endpoint) => format!(
                "{}/{}/{}",
                endpoint.as_str().trim_end_matches('/'),
                uri_encode(bucket),
                encoded_key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                bucket, self.region, encoded_key
            ),
        };
        Ok(Url::parse(&url)?)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead, AppError> {
        let url = self.object_url(bucket, key)?;
        let payload_hash = hex_sha256(b"");
        let signed = self.signer.sign(
            "HEAD",
            &url,
            &[("x-amz-content-sha256", payload_hash.as_str())],
            b"",
            Utc::now(),
        )?;

        let mut request = self
            .client
            .head(url.clone())
            .header("x-amz-content-sha256", &payload_hash);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        log::debug!("HEAD {} -> {}", url, response.status());
        if !response.status().is_success() {
            return Err(AppError::upstream(SERVICE_NAME, response).await);
        }
        parse_head(response.headers())
    }
}

fn parse_head(headers: &HeaderMap) -> Result<ObjectHead, AppError> {
    let raw = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Timestamp("missing Last-Modified header".into()))?;
    let last_modified = DateTime::parse_from_rfc2822(raw)
        .map_err(|e| AppError::Timestamp(format!("{}: {}", raw, e)))?
        .with_timezone(&Utc);

    let metadata = headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(USER_METADATA_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((key.to_lowercase(), value.to_string()))
        })
        .collect();

    Ok(ObjectHead {
        last_modified,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(endpoint: Option<&str>) -> S3ObjectStore {
        let mut config = AppConfig::for_tests("http://unused");
        config.storage_endpoint = endpoint.map(str::to_string);
        let credentials = AwsCredentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
        };
        S3ObjectStore::new(&config, credentials).unwrap()
    }

    #[test]
    fn virtual_host_url_encodes_key_segments() {
        let url = store(None).object_url("my-bucket", "trips/my photo+1.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://my-bucket.s3.us-east-1.amazonaws.com/trips/my%20photo%2B1.jpg"
        );
    }

    #[tokio::test]
    async fn head_reads_timestamp_and_user_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/my-bucket/img1.jpg"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-content-sha256"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
                    .insert_header("x-amz-meta-customlabels", "Sam, Birthday")
                    .insert_header("ETag", "\"abc\""),
            )
            .mount(&server)
            .await;

        let head = store(Some(&server.uri()))
            .head_object("my-bucket", "img1.jpg")
            .await
            .unwrap();
        assert_eq!(
            head.last_modified,
            Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()
        );
        assert_eq!(head.metadata.len(), 1);
        assert_eq!(head.metadata["customlabels"], "Sam, Birthday");
    }

    #[tokio::test]
    async fn missing_object_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = store(Some(&server.uri()))
            .head_object("my-bucket", "gone.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 404, .. }));
    }
}
