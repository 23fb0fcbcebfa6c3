//! Turns an inbound search request into one engine query and shapes the
//! result for the channel it came from.

use crate::context::AppContext;
use crate::document::SearchResultItem;
use crate::error::AppError;
use crate::events::InboundRequest;
use crate::search::{SearchOutcome, SearchQuery};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

const INTENT_NAME: &str = "SearchIntent";

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Headers",
        "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token",
    ),
    ("Access-Control-Allow-Methods", "GET,OPTIONS"),
];

/// Conversational fulfilment: dialog closed, intent fulfilled, one message.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    pub session_state: SessionState,
    pub messages: Vec<DialogMessage>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub dialog_action: DialogAction,
    pub intent: IntentState,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub action_type: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct IntentState {
    pub name: String,
    pub state: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DialogMessage {
    pub content_type: String,
    pub content: String,
}

impl DialogResponse {
    pub fn fulfilled(message: String) -> Self {
        Self {
            session_state: SessionState {
                dialog_action: DialogAction {
                    action_type: "Close".to_string(),
                },
                intent: IntentState {
                    name: INTENT_NAME.to_string(),
                    state: "Fulfilled".to_string(),
                },
            },
            messages: vec![DialogMessage {
                content_type: "PlainText".to_string(),
                content: message,
            }],
        }
    }
}

/// HTTP proxy response; `body` is the JSON payload already encoded.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    /// Every HTTP-channel response, success or error, goes through here.
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> Result<Self, AppError> {
        let mut headers: BTreeMap<String, String> = CORS_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        headers.insert(
            "Content-Type".to_string(),
            mime::APPLICATION_JSON.to_string(),
        );
        Ok(Self {
            status_code,
            headers,
            body: serde_json::to_string(body)?,
        })
    }

    pub fn error(status_code: u16, message: &str) -> Result<Self, AppError> {
        Self::json(status_code, &json!({ "error": message }))
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum OutboundResponse {
    Dialog(DialogResponse),
    Proxy(ProxyResponse),
}

/// HTTP channel success body.
#[derive(Debug, Serialize, PartialEq)]
pub struct ApiResults {
    pub query: String,
    pub count: usize,
    pub results: Vec<SearchResultItem>,
}

pub async fn search_photos(ctx: &AppContext, query: &SearchQuery) -> Result<SearchOutcome, AppError> {
    log::debug!("Searching photos for '{}'", query.keyword);
    ctx.searcher.search(query).await
}

pub fn format_dialog_message(keyword: &str, outcome: &SearchOutcome) -> String {
    if outcome.total == 0 {
        return format!("No photos found for '{}'.", keyword);
    }
    let keys: Vec<&str> = outcome
        .documents
        .iter()
        .map(|doc| doc.object_key.as_str())
        .collect();
    format!(
        "I found {} photos for {}: {}",
        outcome.total,
        keyword,
        keys.join(", ")
    )
}

/// `count` is the number of items returned, not the engine's total.
pub fn format_api_results(keyword: &str, outcome: SearchOutcome) -> ApiResults {
    let results: Vec<SearchResultItem> = outcome
        .documents
        .into_iter()
        .map(SearchResultItem::from)
        .collect();
    ApiResults {
        query: keyword.to_string(),
        count: results.len(),
        results,
    }
}

pub async fn handle_conversational(ctx: &AppContext, keyword: &str) -> Result<DialogResponse, AppError> {
    let query = SearchQuery::new(keyword)
        .ok_or_else(|| AppError::Malformed("Keyword slot is blank".into()))?;
    let outcome = search_photos(ctx, &query).await?;
    Ok(DialogResponse::fulfilled(format_dialog_message(
        &query.keyword,
        &outcome,
    )))
}

pub async fn handle_http(ctx: &AppContext, keyword: Option<&str>) -> Result<ProxyResponse, AppError> {
    let query = match keyword.and_then(SearchQuery::new) {
        Some(query) => query,
        None => return ProxyResponse::error(400, "Missing query parameter q"),
    };
    let outcome = search_photos(ctx, &query).await?;
    ProxyResponse::json(200, &format_api_results(&query.keyword, outcome))
}

pub async fn handle_request(ctx: &AppContext, request: InboundRequest) -> Result<OutboundResponse, AppError> {
    log::debug!("Handling inbound request: {:?}", request);
    match request {
        InboundRequest::Conversational { keyword } => handle_conversational(ctx, &keyword)
            .await
            .map(OutboundResponse::Dialog),
        InboundRequest::Http { method, keyword } => {
            log::debug!("HTTP {} search request", method);
            handle_http(ctx, keyword.as_deref())
                .await
                .map(OutboundResponse::Proxy)
        }
        InboundRequest::Unrecognized => {
            ProxyResponse::error(400, "Unknown request source").map(OutboundResponse::Proxy)
        }
    }
}
