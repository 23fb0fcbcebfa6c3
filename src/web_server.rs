use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::Value;
use std::collections::HashMap;

use crate::context::AppContext;
use crate::error::AppError;
use crate::events::{InboundRequest, UploadEvent};
use crate::indexer;
use crate::mediator::{self, OutboundResponse, ProxyResponse};

/// Upload notifications. Responds 200 with the per-record report, or 207
/// when some records failed under the isolate policy.
async fn upload_event(
    ctx: web::Data<AppContext>,
    event: web::Json<UploadEvent>,
) -> Result<HttpResponse, AppError> {
    let policy = ctx.config.record_failure_policy;
    let report = indexer::handle_upload_event(&ctx, &event, policy).await?;
    let status = if report.is_success() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok(HttpResponse::build(status).json(report))
}

/// Raw query events from either channel; the reply is the channel envelope.
async fn query_event(
    ctx: web::Data<AppContext>,
    event: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    log::debug!("Received query event: {}", event.0);
    let request = InboundRequest::from_value(&event)?;
    let response = mediator::handle_request(&ctx, request).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Direct HTTP channel: the proxy envelope becomes the actual response.
async fn search(
    ctx: web::Data<AppContext>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let request = InboundRequest::Http {
        method: "GET".to_string(),
        keyword: query.get("q").cloned(),
    };
    match mediator::handle_request(&ctx, request).await? {
        OutboundResponse::Proxy(proxy) => Ok(into_http_response(proxy)),
        OutboundResponse::Dialog(_) => Err(AppError::Generic(
            "HTTP request produced a dialog response".into(),
        )),
    }
}

fn into_http_response(proxy: ProxyResponse) -> HttpResponse {
    let status = StatusCode::from_u16(proxy.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);
    for (name, value) in proxy.headers {
        builder.insert_header((name, value));
    }
    builder.body(proxy.body)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/events/upload").route(web::post().to(upload_event)))
        .service(web::resource("/events/query").route(web::post().to(query_event)))
        .service(web::resource("/search").route(web::get().to(search)));
}

pub async fn start_web_server(ctx: AppContext) -> Result<(), AppError> {
    let port = ctx.config.web_port;
    let ctx_data = web::Data::new(ctx);

    log::info!("Starting web server on port: {}", port);

    HttpServer::new(move || App::new().app_data(ctx_data.clone()).configure(configure))
        .bind(format!("0.0.0.0:{}", port))?
        .run()
        .await?;
    Ok(())
}
