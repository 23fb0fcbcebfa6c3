use crate::config::FailurePolicy;
use crate::context::AppContext;
use crate::document::{fuse_labels, parse_custom_labels, PhotoDocument, CUSTOM_LABELS_KEY};
use crate::error::AppError;
use crate::events::{UploadEvent, UploadRecord};
use crate::recognition::{DetectParams, ImageRef};
use serde::Serialize;

/// Outcome of one upload event, record by record.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct IndexReport {
    pub indexed: Vec<String>,
    pub failed: Vec<FailedRecord>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecord {
    pub bucket: String,
    pub object_key: String,
    pub error: String,
}

impl IndexReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Metadata read, label detection, fusion and a single full-replace write.
/// Nothing is written if any step before the write fails.
pub async fn index_photo(ctx: &AppContext, bucket: &str, key: &str) -> Result<PhotoDocument, AppError> {
    log::debug!("Indexing s3://{}/{}", bucket, key);

    let head = ctx.store.head_object(bucket, key).await?;
    let custom = parse_custom_labels(head.metadata.get(CUSTOM_LABELS_KEY).map(String::as_str));
    log::trace!("Custom labels for {}: {:?}", key, custom);

    let image = ImageRef {
        bucket: bucket.to_string(),
        key: key.to_string(),
    };
    let detected = ctx
        .detector
        .detect_labels(&image, &DetectParams::default())
        .await?;
    for label in &detected {
        log::trace!("Detected '{}' in {} ({:.1}%)", label.name, key, label.confidence);
    }

    let labels = fuse_labels(detected.iter().map(|l| l.name.as_str()), &custom);
    let document = PhotoDocument::new(bucket, key, head.last_modified, labels);

    ctx.searcher.index_document(&document).await?;
    log::info!("Indexed {} with {} labels", key, document.labels.len());
    Ok(document)
}

pub async fn index_record(ctx: &AppContext, record: &UploadRecord) -> Result<PhotoDocument, AppError> {
    index_photo(ctx, record.bucket(), &record.object_key()).await
}

/// Processes the records in order. Under [`FailurePolicy::Isolate`] a failed
/// record is logged and reported; under [`FailurePolicy::Abort`] its error is
/// returned and later records are left untouched.
pub async fn handle_upload_event(
    ctx: &AppContext,
    event: &UploadEvent,
    policy: FailurePolicy,
) -> Result<IndexReport, AppError> {
    log::info!("Received upload event with {} records", event.records.len());
    let mut report = IndexReport::default();

    for record in &event.records {
        match index_record(ctx, record).await {
            Ok(document) => report.indexed.push(document.object_key),
            Err(e) if policy == FailurePolicy::Isolate => {
                log::error!(
                    "Failed to index s3://{}/{}: {}",
                    record.bucket(),
                    record.object_key(),
                    e
                );
                report.failed.push(FailedRecord {
                    bucket: record.bucket().to_string(),
                    object_key: record.object_key(),
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}
