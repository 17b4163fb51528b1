/// 领域对象
///
/// 模型内可按名称解析的类型。
///
/// 关联常量：
/// - `NAME`：完整类型名（如 `"Sales.Invoice"`），模型内唯一且稳定，
///   用于请求路由、权限裁决与日志。避免依赖 `type_name::<T>()`。
pub trait DomainObject: Send + Sync + 'static {
    /// 完整类型名（建议常量字符串，不随重构变化）
    const NAME: &'static str;
}

/// 聚合根能力标记
///
/// 具备该能力的类型可作为独立的持久化单元被插入/更新/删除；
/// 不具备该能力的类型必须在任何持久化尝试之前被拒绝。
pub trait AggregateRoot: DomainObject {
    /// 持久化标识（URI），由仓储在持久化时返回
    fn uri(&self) -> String;
}
