//! HTTP server for the qsflat API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                               |
//! |--------|-------------------|-------------------------------------------|
//! | GET    | `/health`         | Health check                              |
//! | POST   | `/api/parse`      | Upload a CSV, get the flattened CSV back  |
//! | GET    | `/api/logs`       | SSE stream for real-time logs             |
//!
//! `POST /api/parse` takes multipart fields `file`, `column`,
//! `separateItems` (`true`, `on` or `1`), and optionally `delimiter` and
//! `format` (`csv` or `json`).

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, ParseResponse, ResponseFormat};
use crate::config::{Config, MAX_UPLOAD_SIZE};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::output::table_to_bytes;
use crate::transform::pipeline::{transform_bytes, ParseOptions, PipelineOutput};

type ApiError = (StatusCode, Json<Value>);

const ROWS_WRITTEN: HeaderName = HeaderName::from_static("x-rows-written");
const ROWS_SKIPPED: HeaderName = HeaderName::from_static("x-rows-skipped");

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Build the router with all routes and layers.
pub fn router(config: Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION, ROWS_WRITTEN, ROWS_SKIPPED]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/parse", post(parse_csv))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(cors)
        .with_state(AppState {
            config: Arc::new(config),
        })
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 qsflat server running on http://localhost:{}", port);
    println!("   POST /api/parse  - Upload CSV, download flattened CSV");
    println!("   GET  /api/logs   - SSE log stream");
    println!("   GET  /health     - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "qsflat",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "parse": "POST /api/parse",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Fields of a parse request.
#[derive(Debug, Default)]
struct ParseRequest {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    column: Option<String>,
    separate_items: bool,
    delimiter: Option<char>,
    format: ResponseFormat,
}

async fn read_request(mut multipart: Multipart) -> ServerResult<ParseRequest> {
    let mut request = ParseRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            request.file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            request.file = Some(bytes.to_vec());
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;

        match name.as_str() {
            "column" => request.column = Some(text),
            "separateItems" => request.separate_items = parse_flag(&text),
            "delimiter" => request.delimiter = parse_delimiter(&text)?,
            "format" => {
                request.format = ResponseFormat::parse(&text)
                    .ok_or_else(|| ServerError::BadRequest(format!("Unknown format '{}'", text)))?
            }
            _ => {}
        }
    }

    Ok(request)
}

/// Checkbox-style flag: `true`, `on`, `1`, `yes`.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

fn parse_delimiter(value: &str) -> ServerResult<Option<char>> {
    if value.is_empty() {
        return Ok(None);
    }
    if value == "\\t" || value.eq_ignore_ascii_case("tab") {
        return Ok(Some('\t'));
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Some(c)),
        _ => Err(ServerError::BadRequest(format!(
            "Delimiter must be a single character, got '{}'",
            value
        ))),
    }
}

/// Upload CSV endpoint
async fn parse_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let request = read_request(multipart).await.map_err(api_error)?;

    let bytes = request
        .file
        .ok_or_else(|| api_error(ServerError::BadRequest("No file provided".into())))?;
    let column = request
        .column
        .ok_or_else(|| api_error(ServerError::BadRequest("No column letter provided".into())))?;

    eprintln!("\n{}", "=".repeat(70));
    eprintln!(
        "📄 NEW UPLOAD: {} ({} bytes), column {}",
        request.file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        column
    );
    eprintln!("{}\n", "=".repeat(70));

    let options = ParseOptions::new(column)
        .separate_items(request.separate_items)
        .with_delimiter(request.delimiter)
        .with_max_item_index(state.config.max_item_index);

    let output = tokio::task::spawn_blocking(move || transform_bytes(&bytes, &options))
        .await
        .map_err(|e| api_error(ServerError::Internal(e.to_string())))?
        .map_err(|e| api_error(ServerError::Pipeline(e)))?;

    match request.format {
        ResponseFormat::Json => Ok(Json(ParseResponse::from(output)).into_response()),
        ResponseFormat::Csv => csv_response(&output, &state.config.output_name),
    }
}

fn csv_response(output: &PipelineOutput, file_name: &str) -> Result<Response, ApiError> {
    let body = table_to_bytes(&output.table)
        .map_err(|e| api_error(ServerError::Pipeline(PipelineError::Csv(e))))?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
            (ROWS_WRITTEN, HeaderValue::from(output.table.len())),
            (ROWS_SKIPPED, HeaderValue::from(output.skipped.len())),
        ],
        body,
    )
        .into_response())
}

/// Map an error to a status code and JSON body.
fn api_error(err: ServerError) -> ApiError {
    let status = match &err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(PipelineError::Column(_)) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match &err {
        ServerError::Pipeline(inner) => inner.to_string(),
        other => other.to_string(),
    };
    log_error(&message);
    (status, Json(error_response(&message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "qsflat-test-boundary";
    const ORDERS: &str = "id,qs\n1,item1=A&amt1=2&qty1=3\n2,item2000000=X\n";

    fn multipart_body(fields: &[(&str, &str)], file: &str) -> Body {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"orders.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n{file}\r\n--{BOUNDARY}--\r\n"
        ));
        Body::from(body)
    }

    async fn post_parse(fields: &[(&str, &str)], file: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/api/parse")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(fields, file))
            .unwrap();

        router(Config::default()).oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_parse_returns_csv_attachment() {
        let response = post_parse(&[("column", "B"), ("separateItems", "true")], ORDERS).await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"parsed_output.csv\""
        );
        assert_eq!(headers["x-rows-written"], "1");
        assert_eq!(headers["x-rows-skipped"], "1");

        assert_eq!(
            body_text(response).await,
            "itemQuantity,itemSku,itemUnitPrice\n3,A,2\n"
        );
    }

    #[tokio::test]
    async fn test_parse_combined_items_by_default() {
        let response = post_parse(&[("column", "b")], ORDERS).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "items\nA;2;3;\n");
    }

    #[tokio::test]
    async fn test_parse_json_format() {
        let response = post_parse(
            &[("column", "B"), ("separateItems", "on"), ("format", "json")],
            ORDERS,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "warning");
        assert_eq!(body["schema"], json!(["itemQuantity", "itemSku", "itemUnitPrice"]));
        assert_eq!(body["rows"], json!([["3", "A", "2"]]));
        assert_eq!(body["metadata"]["column"], "B");
        assert_eq!(body["metadata"]["rowsWritten"], 1);
        assert_eq!(body["metadata"]["skipped"][0]["row"], 2);
        assert_eq!(body["metadata"]["csvInfo"]["columns"], json!(["id", "qs"]));
    }

    #[tokio::test]
    async fn test_parse_invalid_column_is_bad_request() {
        let response = post_parse(&[("column", "1")], ORDERS).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("Invalid column reference"));
    }

    #[tokio::test]
    async fn test_parse_out_of_range_column_is_bad_request() {
        let response = post_parse(&[("column", "Z")], ORDERS).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("the file has 2 column(s)"));
    }

    #[tokio::test]
    async fn test_parse_unreadable_csv_is_unprocessable() {
        let response = post_parse(&[("column", "A")], "").await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_parse_without_column_is_bad_request() {
        let response = post_parse(&[], ORDERS).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_unknown_format_is_bad_request() {
        let response = post_parse(&[("column", "B"), ("format", "xml")], ORDERS).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("on"));
        assert!(parse_flag(" 1 "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("").unwrap(), None);
        assert_eq!(parse_delimiter(";").unwrap(), Some(';'));
        assert_eq!(parse_delimiter("tab").unwrap(), Some('\t'));
        assert!(parse_delimiter(";;").is_err());
    }

    #[test]
    fn test_api_error_status() {
        let (status, _) = api_error(ServerError::BadRequest("x".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let column = PipelineError::Column(crate::error::ColumnError::InvalidColumnReference("1".into()));
        let (status, body) = api_error(ServerError::Pipeline(column));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["status"], "error");

        let csv = PipelineError::Csv(crate::error::CsvError::EmptyFile);
        let (status, _) = api_error(ServerError::Pipeline(csv));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
