use async_trait::async_trait;
use domsrv_domain::serialization::WireFormat;

/// HTTP 风格状态分类，供外部传输层直接映射为状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Forbidden,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
        }
    }
}

/// 统一命令结果信封
///
/// 每个命令以同一形状上报结果，与输入/输出格式无关。
///
/// 不变式：成功/失败二者必居其一；失败信封绝不携带 `data`
/// （不存在表示“部分成功”的数据）。
#[derive(Debug, Clone)]
pub struct CommandResult<P> {
    pub success: bool,
    pub status: StatusCode,
    pub data: Option<P>,
    pub message: String,
    pub explanation: Option<String>,
}

impl<P> CommandResult<P> {
    /// 正常完成
    pub fn success(data: P, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: StatusCode::Ok,
            data: Some(data),
            message: message.into(),
            explanation: None,
        }
    }

    /// 请求形状错误（4xx 语义）；`explanation` 可携带修正后的示例参数
    pub fn fail(message: impl Into<String>, explanation: Option<String>) -> Self {
        Self {
            success: false,
            status: StatusCode::BadRequest,
            data: None,
            message: message.into(),
            explanation,
        }
    }

    /// 显式状态返回（如策略拒绝的 Forbidden，不附示例——请求形状并无问题）
    pub fn returned(status: StatusCode, data: Option<P>, message: impl Into<String>) -> Self {
        let success = matches!(status, StatusCode::Ok);
        Self {
            success,
            status,
            data: if success { data } else { None },
            message: message.into(),
            explanation: None,
        }
    }
}

/// 服务端命令契约
///
/// 给定输入序列化器、输出序列化器与编码态参数，产出结果信封。
/// 实现不得假设任何具体格式，只能经由 [`WireFormat`] 抽象操作；
/// 一个命令实例绑定一种格式类型参数，按格式分别注册。
#[async_trait]
pub trait ServerCommand<F: WireFormat>: Send + Sync {
    async fn execute(&self, input: &F, output: &F, data: F::Payload) -> CommandResult<F::Payload>;
}
