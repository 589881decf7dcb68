use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadarError {
    #[error("{0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("upstream error{}: {message}", status_suffix(.status))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("persistence error: {0}")]
    Persistence(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl RadarError {
    pub fn upstream(message: impl Into<String>) -> Self {
        RadarError::Upstream {
            status: None,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RadarError::Validation(_) => StatusCode::BAD_REQUEST,
            RadarError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            RadarError::Configuration(_) | RadarError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for RadarError {
    fn from(err: reqwest::Error) -> Self {
        RadarError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for RadarError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "radar request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
