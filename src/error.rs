use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("failed to read PDF `{name}`: {source}")]
    Pdf {
        name: String,
        #[source]
        source: pdf_extract::OutputError,
    },

    #[error("invalid {field} pattern: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("failed to write spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid upload: {0}")]
    Upload(#[from] axum::extract::multipart::MultipartError),

    #[error("missing upload `{0}`")]
    MissingUpload(&'static str),

    #[error("text extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CompareError {
    pub fn status(&self) -> StatusCode {
        match self {
            CompareError::Pdf { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CompareError::Upload(_) | CompareError::MissingUpload(_) => StatusCode::BAD_REQUEST,
            CompareError::Pattern { .. }
            | CompareError::Spreadsheet(_)
            | CompareError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CompareError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::warn!("{self}");
        }
        (status, self.to_string()).into_response()
    }
}

pub type Result<T, E = CompareError> = std::result::Result<T, E>;
