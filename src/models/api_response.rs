use serde::Serialize;

pub const ENTITY: &str = "INSIGHT_BE";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub entity: String,
    pub code: String,
    pub cause: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(code: &str, cause: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            errors: Some(vec![ApiError {
                entity: ENTITY.to_string(),
                code: code.to_string(),
                cause: cause.into(),
            }]),
        }
    }
}
