//! 领域层统一错误定义
//!
//! 聚焦序列化/解码、类型解析、仓储与配置等最小必要集合，
//! 便于在命令层统一转换为结果信封。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/解码 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("decode error: {reason}")]
    Decode { reason: String },

    // --- 类型解析/仓储 ---
    #[error("not found: {reason}")]
    NotFound { reason: String },
    #[error("{reason}")]
    Business { reason: String },
    #[error("repository error: {reason}")]
    Repository { reason: String },

    // --- 配置（定位器解析失败等，属部署错误而非请求错误） ---
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    // --- 请求可修正的校验失败；explanation 可携带示例参数 ---
    #[error("{message}")]
    Validation {
        message: String,
        explanation: Option<String>,
    },
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
