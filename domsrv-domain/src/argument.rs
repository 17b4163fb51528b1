use serde::{Deserialize, Serialize};

/// 持久化命令参数
///
/// 由调用方以所选格式编码提交；三个批次字段均为编码态的不透明载荷，
/// 在类型解析完成之前不做任何具体类型的解码。
/// 字段在线格式采用 PascalCase，与既有调用方保持兼容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersistArgument<P> {
    pub root_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_insert: Option<P>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_update: Option<P>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_delete: Option<P>,
}

impl<P> PersistArgument<P> {
    /// 仅携带类型名的示例参数（用于失败响应中的修正示例）
    pub fn example(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            to_insert: None,
            to_update: None,
            to_delete: None,
        }
    }

    /// 三个批次是否全部缺失
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_none() && self.to_update.is_none() && self.to_delete.is_none()
    }
}

/// 更新对
///
/// `original` 为已知的旧状态，`modified` 为期望的新状态。
/// legacy 扁平格式（仅提交新状态序列）归一化后 `original` 为 `None`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePair<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<T>,
    pub modified: T,
}

impl<T> UpdatePair<T> {
    pub fn new(original: Option<T>, modified: T) -> Self {
        Self { original, modified }
    }

    /// 由 legacy 扁平格式的“新状态”归一化为更新对
    pub fn from_modified(modified: T) -> Self {
        Self {
            original: None,
            modified,
        }
    }
}
