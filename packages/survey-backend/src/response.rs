use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use danci_survey::SurveyError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl From<SurveyError> for AppError {
    fn from(err: SurveyError) -> Self {
        let status = match &err {
            SurveyError::InvalidAnswer(_) => StatusCode::BAD_REQUEST,
            SurveyError::SurveyAborted(_) | SurveyError::ContentUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SurveyError::PriorKnowledgeUnavailable(_) | SurveyError::InvalidConfig(_) => {
                tracing::error!(error = %err, "survey engine failure");
                let mut internal = Self::internal(err.to_string());
                internal.code = err.code().to_string();
                return internal;
            }
        };
        Self::operational(status, err.code(), err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError::operational(status, code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survey_error_status_mapping() {
        let cases = [
            (SurveyError::InvalidAnswer("x".into()), StatusCode::BAD_REQUEST, "INVALID_ANSWER"),
            (SurveyError::SurveyAborted("x".into()), StatusCode::SERVICE_UNAVAILABLE, "SURVEY_ABORTED"),
            (
                SurveyError::ContentUnavailable { rank: 10 },
                StatusCode::SERVICE_UNAVAILABLE,
                "CONTENT_UNAVAILABLE",
            ),
            (
                SurveyError::InvalidConfig("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INVALID_CONFIG",
            ),
        ];
        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn test_internal_message_hidden() {
        let response = AppError::internal("database password leaked").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
