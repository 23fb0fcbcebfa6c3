mod config;
mod context;
mod document;
mod error;
mod events;
mod indexer;
mod mediator;
mod recognition;
mod search;
mod search_clients;
mod signing;
mod storage;
#[cfg(test)]
mod testing;
mod web_server;

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppError;
use crate::events::{Event, InboundRequest};
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

/// Photo indexing and label search.
#[derive(Parser)]
#[command(name = "photo-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (upload events, query events, direct search).
    Serve,
    /// Index a single stored image.
    Index {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
    },
    /// Search indexed photos by label and print the HTTP-channel body.
    Search { keyword: String },
    /// Read a raw event from a JSON file, dispatch it, print the response.
    Handle { event: PathBuf },
}

async fn handle_event_file(ctx: &AppContext, path: &Path) -> Result<serde_json::Value, AppError> {
    log::debug!("Reading event from {}", path.display());
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;

    let response = match Event::classify(value)? {
        Event::Upload(upload) => {
            let report =
                indexer::handle_upload_event(ctx, &upload, ctx.config.record_failure_policy).await?;
            serde_json::to_value(report)?
        }
        Event::Query(request) => serde_json::to_value(mediator::handle_request(ctx, request).await?)?,
    };
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new()?;

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting photo-search with engine {:?}", config.engine);
    let ctx = AppContext::from_config(config)?;

    match cli.command {
        Commands::Serve => web_server::start_web_server(ctx).await?,
        Commands::Index { bucket, key } => {
            let document = indexer::index_photo(&ctx, &bucket, &key).await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Search { keyword } => {
            let request = InboundRequest::Http {
                method: "GET".to_string(),
                keyword: Some(keyword),
            };
            let response = mediator::handle_request(&ctx, request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Handle { event } => {
            let response = handle_event_file(&ctx, &event).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    info!("photo-search finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_context, FakeDetector, FakeStore};
    use chrono::Utc;
    use serde_json::json;
    use std::io::Write;

    fn event_file(event: serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", event).unwrap();
        file
    }

    #[tokio::test]
    async fn handle_dispatches_upload_then_conversational_event() {
        let store = FakeStore::new().with_object("b1", "img1.jpg", Utc::now(), Some("Cat"));
        let detector = FakeDetector::new().with_labels("img1.jpg", &["Pet"]);
        let (ctx, searcher) = test_context(store, detector);

        let upload = event_file(json!({
            "Records": [
                { "s3": { "bucket": { "name": "b1" }, "object": { "key": "img1.jpg" } } }
            ]
        }));
        let report = handle_event_file(&ctx, upload.path()).await.unwrap();
        assert_eq!(report["indexed"], json!(["img1.jpg"]));
        assert_eq!(report["failed"], json!([]));
        assert!(searcher.get("img1.jpg").is_some());

        let question = event_file(json!({
            "sessionState": { "intent": { "slots": {
                "Keyword": { "value": { "interpretedValue": "Cat" } }
            } } }
        }));
        let reply = handle_event_file(&ctx, question.path()).await.unwrap();
        assert_eq!(reply["sessionState"]["intent"]["state"], "Fulfilled");
        assert_eq!(
            reply["messages"][0]["content"],
            "I found 1 photos for cat: img1.jpg"
        );
    }

    #[tokio::test]
    async fn handle_reports_unreadable_file_as_io_error() {
        let (ctx, _) = test_context(FakeStore::new(), FakeDetector::new());
        let err = handle_event_file(&ctx, Path::new("/nonexistent/event.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
