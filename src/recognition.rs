//! Automated label detection for stored images.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::signing::{AwsCredentials, SigV4Signer};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

const SERVICE_NAME: &str = "recognition service";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const DETECT_LABELS_TARGET: &str = "RekognitionService.DetectLabels";

/// An image addressed by its storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectParams {
    pub max_labels: u32,
    pub min_confidence: f32,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            max_labels: 10,
            min_confidence: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedLabel {
    pub name: String,
    pub confidence: f32,
}

#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Labels in the order the service ranks them.
    async fn detect_labels(
        &self,
        image: &ImageRef,
        params: &DetectParams,
    ) -> Result<Vec<DetectedLabel>, AppError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsRequest<'a> {
    image: ImageSource<'a>,
    max_labels: u32,
    min_confidence: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ImageSource<'a> {
    s3_object: S3ObjectRef<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct S3ObjectRef<'a> {
    bucket: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsResponse {
    #[serde(default)]
    labels: Vec<DetectedLabel>,
}

pub struct RekognitionDetector {
    client: reqwest::Client,
    endpoint: Url,
    signer: SigV4Signer,
}

impl RekognitionDetector {
    pub fn new(config: &AppConfig, credentials: AwsCredentials) -> Result<Self, AppError> {
        let endpoint = match config.recognition_endpoint {
            Some(ref endpoint) => Url::parse(endpoint)?,
            None => Url::parse(&format!("https://rekognition.{}.amazonaws.com/", config.region))?,
        };
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            signer: SigV4Signer::new(credentials, &config.region, "rekognition"),
        })
    }
}

#[async_trait]
impl LabelDetector for RekognitionDetector {
    async fn detect_labels(
        &self,
        image: &ImageRef,
        params: &DetectParams,
    ) -> Result<Vec<DetectedLabel>, AppError> {
        let body = serde_json::to_vec(&DetectLabelsRequest {
            image: ImageSource {
                s3_object: S3ObjectRef {
                    bucket: &image.bucket,
                    name: &image.key,
                },
            },
            max_labels: params.max_labels,
            min_confidence: params.min_confidence,
        })?;

        let signed = self.signer.sign(
            "POST",
            &self.endpoint,
            &[
                ("content-type", CONTENT_TYPE),
                ("x-amz-target", DETECT_LABELS_TARGET),
            ],
            &body,
            Utc::now(),
        )?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header("x-amz-target", DETECT_LABELS_TARGET)
            .body(body);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        log::debug!(
            "DetectLabels s3://{}/{} -> {}",
            image.bucket,
            image.key,
            response.status()
        );
        if !response.status().is_success() {
            return Err(AppError::upstream(SERVICE_NAME, response).await);
        }

        let parsed: DetectLabelsResponse = response.json().await?;
        Ok(parsed.labels)
    }
}
