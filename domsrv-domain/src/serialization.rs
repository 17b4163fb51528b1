use crate::error::DomainResult;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

/// 序列化格式抽象（wire format）
///
/// - 管线对具体格式保持无关：同一段逻辑可工作于 JSON、二进制等任意实现；
/// - `Payload` 为编码后的不透明载荷，需可嵌套（载荷本身可被再次编码，
///   以便 `PersistArgument` 携带编码态的批次字段）。
pub trait WireFormat: Send + Sync + 'static {
    /// 编码后的载荷类型
    type Payload: Clone + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    fn encode<T: Serialize>(&self, value: &T) -> DomainResult<Self::Payload>;

    fn decode<T: DeserializeOwned>(&self, payload: &Self::Payload) -> DomainResult<T>;

    /// 渲染为可读文本（仅用于诊断信息）
    fn render(&self, payload: &Self::Payload) -> String;
}

/// JSON 格式实现
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl WireFormat for JsonFormat {
    type Payload = serde_json::Value;

    fn encode<T: Serialize>(&self, value: &T) -> DomainResult<Self::Payload> {
        Ok(serde_json::to_value(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, payload: &Self::Payload) -> DomainResult<T> {
        Ok(serde_json::from_value(payload.clone())?)
    }

    fn render(&self, payload: &Self::Payload) -> String {
        payload.to_string()
    }
}
