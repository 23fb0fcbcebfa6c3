//! Inbound event shapes, resolved once at the boundary.

use crate::error::AppError;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;

const KEYWORD_SLOT_PATH: &str = "/sessionState/intent/slots/Keyword/value/interpretedValue";

/// Storage upload notification carrying one or more records.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<UploadRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

#[cfg(test)]
impl UploadRecord {
    pub fn new(bucket: &str, key: &str) -> Self {
        Self {
            s3: S3Entity {
                bucket: BucketEntity {
                    name: bucket.to_string(),
                },
                object: ObjectEntity {
                    key: key.to_string(),
                },
            },
        }
    }
}

impl UploadRecord {
    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }

    /// Notification keys arrive form-URL-encoded (`+` for space, `%XX`).
    pub fn object_key(&self) -> String {
        let key = self.s3.object.key.replace('+', " ");
        percent_decode_str(&key).decode_utf8_lossy().into_owned()
    }
}

/// A search request in whichever channel it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundRequest {
    /// Conversational front-end with the `Keyword` slot resolved.
    Conversational { keyword: String },
    /// HTTP proxy request; `keyword` is the `q` query parameter, if any.
    Http {
        method: String,
        keyword: Option<String>,
    },
    Unrecognized,
}

impl InboundRequest {
    /// Checks for a conversational session first, then an HTTP method.
    ///
    /// A conversational request without a usable `Keyword` slot is an error;
    /// a missing `q` parameter is not, the HTTP channel answers it with 400.
    pub fn from_value(event: &Value) -> Result<Self, AppError> {
        if event.get("sessionState").is_some() {
            let keyword = event
                .pointer(KEYWORD_SLOT_PATH)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AppError::Malformed("missing Keyword slot interpretedValue".into())
                })?;
            return Ok(InboundRequest::Conversational {
                keyword: keyword.to_string(),
            });
        }

        if let Some(method) = event.get("httpMethod") {
            let keyword = event
                .get("queryStringParameters")
                .and_then(|params| params.get("q"))
                .and_then(Value::as_str)
                .map(str::to_string);
            return Ok(InboundRequest::Http {
                method: method.as_str().unwrap_or_default().to_string(),
                keyword,
            });
        }

        Ok(InboundRequest::Unrecognized)
    }
}

/// Any event either entry point can receive.
#[derive(Debug, Clone)]
pub enum Event {
    Upload(UploadEvent),
    Query(InboundRequest),
}

impl Event {
    /// Envelopes with `Records` go to the indexer, everything else to the
    /// query mediator.
    pub fn classify(event: Value) -> Result<Self, AppError> {
        if event.get("Records").is_some() {
            let upload: UploadEvent = serde_json::from_value(event)?;
            return Ok(Event::Upload(upload));
        }
        InboundRequest::from_value(&event).map(Event::Query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_event_parses_records() {
        let event = json!({
            "Records": [
                { "eventName": "ObjectCreated:Put",
                  "s3": { "bucket": { "name": "b1", "arn": "arn:aws:s3:::b1" },
                          "object": { "key": "img1.jpg", "size": 1024 } } },
                { "s3": { "bucket": { "name": "b1" }, "object": { "key": "img2.jpg" } } }
            ]
        });
        match Event::classify(event).unwrap() {
            Event::Upload(upload) => {
                assert_eq!(upload.records.len(), 2);
                assert_eq!(upload.records[0].bucket(), "b1");
                assert_eq!(upload.records[1].object_key(), "img2.jpg");
            }
            other => panic!("expected upload event, got {:?}", other),
        }
    }

    #[test]
    fn notification_keys_are_decoded() {
        let record = UploadRecord::new("b1", "summer+trip/beach%2C+day%201.jpg");
        assert_eq!(record.object_key(), "summer trip/beach, day 1.jpg");
    }

    #[test]
    fn raw_separators_in_keys_survive_decoding() {
        let record = UploadRecord::new("b1", "a%3Db+c=d&e%2Bf.jpg");
        assert_eq!(record.object_key(), "a=b c=d&e+f.jpg");
    }

    #[test]
    fn conversational_request_takes_priority() {
        let event = json!({
            "httpMethod": "GET",
            "sessionState": { "intent": { "slots": {
                "Keyword": { "value": { "originalValue": "Dogs", "interpretedValue": "dog" } }
            } } }
        });
        assert_eq!(
            InboundRequest::from_value(&event).unwrap(),
            InboundRequest::Conversational {
                keyword: "dog".into()
            }
        );
    }

    #[test]
    fn conversational_request_without_slot_is_malformed() {
        let event = json!({ "sessionState": { "intent": { "slots": { "Keyword": null } } } });
        let err = InboundRequest::from_value(&event).unwrap_err();
        assert!(matches!(err, AppError::Malformed(_)));
    }

    #[test]
    fn http_request_with_and_without_query() {
        let with_q = json!({ "httpMethod": "GET", "queryStringParameters": { "q": "beach" } });
        assert_eq!(
            InboundRequest::from_value(&with_q).unwrap(),
            InboundRequest::Http {
                method: "GET".into(),
                keyword: Some("beach".into())
            }
        );

        let null_params = json!({ "httpMethod": "GET", "queryStringParameters": null });
        assert_eq!(
            InboundRequest::from_value(&null_params).unwrap(),
            InboundRequest::Http {
                method: "GET".into(),
                keyword: None
            }
        );
    }

    #[test]
    fn anything_else_is_unrecognized() {
        let event = json!({ "source": "aws.events" });
        assert_eq!(
            InboundRequest::from_value(&event).unwrap(),
            InboundRequest::Unrecognized
        );
        assert!(matches!(
            Event::classify(event).unwrap(),
            Event::Query(InboundRequest::Unrecognized)
        ));
    }
}
