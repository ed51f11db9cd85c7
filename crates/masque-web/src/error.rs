use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use masque_feed::{SocialError, SocialErrorKind};
use masque_util_error::FmtCompact as _;
use serde::Serialize;
use snafu::Snafu;
use tracing::{debug, warn};

use crate::LOG_TARGET;
use crate::routes::AppJson;

#[derive(Debug, Snafu)]
pub enum RequestError {
    #[snafu(transparent)]
    Social { source: SocialError },
    #[snafu(visibility(pub(crate)))]
    #[snafu(display("Not logged in"))]
    NotLoggedIn,
    #[snafu(transparent)]
    Json { source: JsonRejection },
    #[snafu(transparent)]
    Path { source: PathRejection },
    #[snafu(transparent)]
    Query { source: QueryRejection },
}
pub type RequestResult<T> = std::result::Result<T, RequestError>;

// How error responses are serialized
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Social { source } => match source.kind() {
                SocialErrorKind::Validation => StatusCode::BAD_REQUEST,
                SocialErrorKind::ContentTooLong => StatusCode::PAYLOAD_TOO_LARGE,
                SocialErrorKind::Forbidden => StatusCode::FORBIDDEN,
                SocialErrorKind::NotFound => StatusCode::NOT_FOUND,
                SocialErrorKind::Conflict => StatusCode::CONFLICT,
                SocialErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RequestError::NotLoggedIn => StatusCode::FORBIDDEN,
            RequestError::Json { .. } | RequestError::Path { .. } | RequestError::Query { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let message = if status_code.is_server_error() {
            warn!(
                target: LOG_TARGET,
                err = %self.fmt_compact(),
                "Unexpected Request Error"
            );
            "Internal Server Error".to_owned()
        } else {
            debug!(
                target: LOG_TARGET,
                err = %self.fmt_compact(),
                "Request Error"
            );
            self.fmt_compact().to_string()
        };

        (status_code, AppJson(ErrorResponse { error: message })).into_response()
    }
}
