use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use quick_xml::escape::escape;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{CompareError, Result};
use crate::extract::{PdfTextExtractor, TextExtractor};
use crate::parser::RecordRules;
use crate::report::{REPORT_FILE_NAME, XLSX_CONTENT_TYPE, render_table_html, write_xlsx};
use crate::{Comparison, SourceFile, compare_documents};

pub const MISSING_UPLOADS: &str = "Please upload both PDFs to proceed.";
pub const COMPLETE: &str = "Comparison complete!";

/// A finished comparison together with its rendered workbook.
#[derive(Debug)]
pub struct Report {
    pub comparison: Comparison,
    pub xlsx: Vec<u8>,
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    rules: Arc<RecordRules>,
    extractor: Arc<dyn TextExtractor>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_extractor(config, Arc::new(PdfTextExtractor))
    }

    pub fn with_extractor(config: Config, extractor: Arc<dyn TextExtractor>) -> Result<Self> {
        let rules = config.rules()?;
        Ok(Self {
            config: Arc::new(config),
            rules: Arc::new(rules),
            extractor,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();
    Router::new()
        .route("/", get(upload_page))
        .route("/compare", post(compare_page))
        .route("/api/compare", post(api_compare))
        .route("/api/report", post(api_report))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, build_router(state)).await
}

pub async fn start_server(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    serve(listener, state).await
}

#[derive(Debug)]
struct Upload {
    name: String,
    bytes: Bytes,
}

#[derive(Debug, Default)]
struct Uploads {
    old: Option<Upload>,
    new: Option<Upload>,
}

impl Uploads {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut uploads = Uploads::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(slot) = field.name().map(str::to_owned) else {
                continue;
            };
            let name = field.file_name().unwrap_or(&slot).to_string();
            let bytes = field.bytes().await?;
            // An empty file input still sends a part; treat it as not uploaded.
            if bytes.is_empty() {
                continue;
            }
            let upload = Some(Upload { name, bytes });
            match slot.as_str() {
                "old" => uploads.old = upload,
                "new" => uploads.new = upload,
                other => tracing::debug!(field = other, "ignoring unknown form field"),
            }
        }
        Ok(uploads)
    }

    fn both(self) -> Result<(Upload, Upload)> {
        match (self.old, self.new) {
            (Some(old), Some(new)) => Ok((old, new)),
            (None, _) => Err(CompareError::MissingUpload("old")),
            (_, None) => Err(CompareError::MissingUpload("new")),
        }
    }
}

async fn run_comparison(state: &AppState, old: Upload, new: Upload) -> Result<Report> {
    tracing::info!(old = %old.name, new = %new.name, "comparing booking lists");

    let extractor = state.extractor.clone();
    let rules = state.rules.clone();
    let options = state.config.report_options();

    // PDF extraction is CPU-bound; keep it off the async workers.
    tokio::task::spawn_blocking(move || -> Result<Report> {
        let comparison = compare_documents(
            extractor.as_ref(),
            SourceFile {
                name: &old.name,
                bytes: &old.bytes,
            },
            SourceFile {
                name: &new.name,
                bytes: &new.bytes,
            },
            &rules,
        )?;
        let xlsx = write_xlsx(&comparison.entries, &options)?;
        Ok(Report { comparison, xlsx })
    })
    .await?
}

async fn upload_page() -> Html<String> {
    page("")
}

async fn compare_page(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let (old, new) = match Uploads::read(multipart).await?.both() {
        Ok(both) => both,
        Err(_) => {
            let notice = format!(r#"<p class="info">{MISSING_UPLOADS}</p>"#);
            return Ok((StatusCode::BAD_REQUEST, page(&notice)).into_response());
        }
    };

    let report = run_comparison(&state, old, new).await?;
    let body = format!(
        concat!(
            r#"<p class="success">{complete}</p>"#,
            "<p>{summary}</p>",
            r#"<p class="generated">Generated {generated}</p>"#,
            r#"<p><a class="download" href="{href}" download="{file}">Download Excel Report</a></p>"#,
            "{table}"
        ),
        complete = COMPLETE,
        summary = escape(report.comparison.summary.to_string().as_str()),
        generated = report.comparison.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        href = download_href(&report.xlsx),
        file = REPORT_FILE_NAME,
        table = render_table_html(&report.comparison.entries),
    );
    Ok(page(&body).into_response())
}

/// The workbook travels inside the result page, so each download link serves
/// exactly the run that rendered it.
pub fn download_href(xlsx: &[u8]) -> String {
    format!("data:{XLSX_CONTENT_TYPE};base64,{}", BASE64.encode(xlsx))
}

async fn api_compare(State(state): State<AppState>, multipart: Multipart) -> Result<Json<Comparison>> {
    let (old, new) = Uploads::read(multipart).await?.both()?;
    let report = run_comparison(&state, old, new).await?;
    Ok(Json(report.comparison))
}

async fn api_report(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let (old, new) = Uploads::read(multipart).await?.both()?;
    let report = run_comparison(&state, old, new).await?;
    Ok(xlsx_response(report.xlsx))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn xlsx_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(r#"attachment; filename="{REPORT_FILE_NAME}""#),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn page(body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Booking List Comparator</title>
<style>
body {{ font-family: sans-serif; max-width: 64rem; margin: 2rem auto; padding: 0 1rem; }}
table.report {{ border-collapse: collapse; width: 100%; margin-top: 1rem; }}
table.report th, table.report td {{ border: 1px solid #ccc; padding: .3rem .5rem; vertical-align: top; white-space: pre-wrap; }}
tr.added td {{ background: #eef9ee; }}
tr.removed td {{ background: #fbeeee; }}
.info {{ color: #245; }}
.success {{ color: #262; font-weight: bold; }}
</style>
</head>
<body>
<h1>Booking List Comparator</h1>
<p>Upload two PDF booking lists. This app compares all details and highlights changes.</p>
<form method="post" action="/compare" enctype="multipart/form-data"
      onsubmit="document.getElementById('busy').hidden = false">
<p><label>Previous week's booking list (PDF) <input type="file" name="old" accept="application/pdf,.pdf" required></label></p>
<p><label>Current week's booking list (PDF) <input type="file" name="new" accept="application/pdf,.pdf" required></label></p>
<p><button type="submit">Compare</button> <span id="busy" hidden>Processing files and comparing...</span></p>
</form>
{body}
</body>
</html>
"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_page_has_both_inputs() {
        let Html(html) = page("");
        assert!(html.contains(r#"name="old""#));
        assert!(html.contains(r#"name="new""#));
        assert_eq!(html.matches("required").count(), 2);
    }

    #[test]
    fn missing_uploads_are_named() {
        let err = Uploads::default().both().unwrap_err();
        assert!(matches!(err, CompareError::MissingUpload("old")));

        let only_old = Uploads {
            old: Some(Upload {
                name: "old.pdf".into(),
                bytes: Bytes::from_static(b"%PDF"),
            }),
            new: None,
        };
        assert!(matches!(only_old.both(), Err(CompareError::MissingUpload("new"))));
    }

    #[test]
    fn download_link_carries_the_workbook() {
        let href = download_href(b"PK\x03\x04");
        let data = href
            .strip_prefix(&format!("data:{XLSX_CONTENT_TYPE};base64,"))
            .unwrap();
        assert_eq!(BASE64.decode(data).unwrap(), b"PK\x03\x04");
    }

    #[test]
    fn bad_rules_fail_state_construction() {
        let config = Config {
            name_pattern: "(".into(),
            ..Config::default()
        };
        assert!(AppState::new(config).is_err());
    }
}
