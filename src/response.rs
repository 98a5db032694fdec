//! # API 响应结构
//!
//! 统一的 JSON 响应信封 `{"code": int, "msg": string, "data": any?}`。
//!
//! HTTP 状态码与 `code` 相互独立：普通业务成功和失败都返回 HTTP 200，
//! 分别使用 `code = 200` 和 `code = -1`；认证拒绝等场景由调用方显式指定状态码。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, HtxpError};
use crate::lerror;
use crate::logging::{LogComponent, LogStage};

/// 成功时的 `code`
pub const SUCCESS_CODE: i32 = 200;
/// 成功时的 `msg`
pub const SUCCESS_MSG: &str = "success";
/// 业务失败时的 `code`
pub const ERROR_CODE: i32 = -1;

/// # 响应信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn new(code: i32, msg: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data,
        }
    }

    /// `{code: 200, msg: "success", data}`
    #[must_use]
    pub fn success(data: T) -> Self {
        Self::new(SUCCESS_CODE, SUCCESS_MSG, Some(data))
    }
}

impl Envelope<()> {
    /// `{code: -1, msg}`，不含 data
    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self::new(ERROR_CODE, msg, None)
    }
}

/// # API响应枚举
///
/// 统一所有API出口，方便转换为 `axum::response::Response`
#[derive(Debug)]
pub enum ApiResponse<T: Serialize> {
    /// HTTP 200, code 200
    Success(T),
    /// HTTP 200, code 200, 不含 data
    SuccessWithoutData,
    /// HTTP 200, code -1
    Error(String),
    /// 指定 HTTP 状态码和 code
    Status(StatusCode, i32, String),
    /// 应用错误，code 等于映射出的 HTTP 状态码
    AppError(HtxpError),
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Success(data) => (StatusCode::OK, Json(Envelope::success(data))).into_response(),
            Self::SuccessWithoutData => (
                StatusCode::OK,
                Json(Envelope::<()>::new(SUCCESS_CODE, SUCCESS_MSG, None)),
            )
                .into_response(),
            Self::Error(message) => (StatusCode::OK, Json(Envelope::error(message))).into_response(),
            Self::Status(status, code, message) => {
                (status, Json(Envelope::<()>::new(code, message, None))).into_response()
            }
            Self::AppError(error) => {
                let (status, error_code) = error.to_http_response_parts();
                if error.category() == ErrorCategory::Server {
                    lerror!(
                        "system",
                        LogStage::Response,
                        LogComponent::Main,
                        "app_error",
                        &format!("请求处理失败 [{error_code}]: {error}")
                    );
                }
                let envelope = Envelope::<()>::new(i32::from(status.as_u16()), error.to_string(), None);
                (status, Json(envelope)).into_response()
            }
        }
    }
}

impl IntoResponse for HtxpError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::AppError(self).into_response()
    }
}

/// # 便捷函数：成功响应
pub fn success<T: Serialize>(data: T) -> Response {
    ApiResponse::Success(data).into_response()
}

/// # 便捷函数：无数据体的成功响应
#[must_use]
pub fn success_without_data() -> Response {
    ApiResponse::<()>::SuccessWithoutData.into_response()
}

/// # 便捷函数：业务错误响应
///
/// HTTP 200，`code = -1`，`msg` 为错误描述。
pub fn error(err: impl std::fmt::Display) -> Response {
    ApiResponse::<()>::Error(err.to_string()).into_response()
}

/// # 便捷函数：指定状态码与 code 的错误响应
pub fn error_with_status(status: StatusCode, code: i32, message: impl Into<String>) -> Response {
    ApiResponse::<()>::Status(status, code, message.into()).into_response()
}

/// # 便捷函数：应用错误响应
#[must_use]
pub fn app_error(error: HtxpError) -> Response {
    ApiResponse::<()>::AppError(error).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_envelope_omits_absent_data() {
        let text = serde_json::to_string(&Envelope::error("boom")).unwrap();
        assert_eq!(text, r#"{"code":-1,"msg":"boom"}"#);

        let text = serde_json::to_string(&Envelope::success(json!({"id": 1}))).unwrap();
        assert_eq!(text, r#"{"code":200,"msg":"success","data":{"id":1}}"#);
    }

    #[test]
    fn test_envelope_deserializes_without_data() {
        let envelope: Envelope<Value> = serde_json::from_str(r#"{"code":401,"msg":"invalid token"}"#).unwrap();
        assert_eq!(envelope.code, 401);
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_success_and_error_are_http_200() {
        let response = success(vec![1, 2, 3]);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"code": 200, "msg": "success", "data": [1, 2, 3]})
        );

        let response = error("order not found");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"code": -1, "msg": "order not found"}));
    }

    #[tokio::test]
    async fn test_error_with_status() {
        let response = error_with_status(StatusCode::UNAUTHORIZED, 401, "invalid token");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"code": 401, "msg": "invalid token"}));
    }

    #[tokio::test]
    async fn test_app_error_uses_mapped_status() {
        let response = HtxpError::parse("bad number").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], 400);
        assert_eq!(body["msg"], "解析错误: bad number");
    }
}
