use crate::{
    argument::{PersistArgument, UpdatePair},
    domain_object::{AggregateRoot, DomainObject},
    error::{DomainError, DomainResult},
    registry::ServiceRegistry,
    repository::PersistableRepository,
    serialization::WireFormat,
};
use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// 待持久化的原始批次（仍处于编码态）
pub struct RawBatches<F: WireFormat> {
    pub to_insert: Option<F::Payload>,
    pub to_update: Option<F::Payload>,
    pub to_delete: Option<F::Payload>,
}

type PersistFuture<'a> = Pin<Box<dyn Future<Output = DomainResult<Vec<String>>> + Send + 'a>>;

type PersistFn<F> =
    Arc<dyn for<'a> Fn(&'a F, &'a ServiceRegistry, RawBatches<F>) -> PersistFuture<'a> + Send + Sync>;

type ExampleFn<F> = Arc<dyn Fn(&F) -> Option<<F as WireFormat>::Payload> + Send + Sync>;

/// 针对某一聚合根类型、在注册时闭合的强类型操作集
struct RootOps<F: WireFormat> {
    persist: PersistFn<F>,
    example: ExampleFn<F>,
}

impl<F: WireFormat> Clone for RootOps<F> {
    fn clone(&self) -> Self {
        Self {
            persist: self.persist.clone(),
            example: self.example.clone(),
        }
    }
}

/// 运行时类型句柄
///
/// 由 [`DomainModel::find`] 按名称解析得到；`ops` 仅在类型具备聚合根
/// 能力时存在，能力检查即对其存在性的查询，无需任何运行时反射。
pub struct DomainType<F: WireFormat> {
    name: &'static str,
    ops: Option<RootOps<F>>,
}

impl<F: WireFormat> Clone for DomainType<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            ops: self.ops.clone(),
        }
    }
}

impl<F: WireFormat> DomainType<F> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 是否具备聚合根能力
    pub fn is_aggregate_root(&self) -> bool {
        self.ops.is_some()
    }

    /// 为该类型生成示例参数：携带一个默认构造实例的单元素插入批次
    pub fn example(&self, format: &F) -> Option<F::Payload> {
        self.ops.as_ref().and_then(|ops| (ops.example)(format))
    }

    /// 以注册时闭合的强类型操作执行持久化
    ///
    /// 调用方只知道“按名称解析出的某个类型”；类型擦除在此处终结，
    /// 批次解码、legacy 回退与仓储调用全部发生在针对具体类型的闭包内。
    pub async fn persist(
        &self,
        format: &F,
        locator: &ServiceRegistry,
        batches: RawBatches<F>,
    ) -> DomainResult<Vec<String>> {
        match &self.ops {
            Some(ops) => (ops.persist)(format, locator, batches).await,
            None => Err(DomainError::Configuration {
                reason: format!("{} is not an aggregate root", self.name),
            }),
        }
    }
}

/// 领域模型注册表（类型解析器）
///
/// - 将类型名映射到运行时类型句柄；
/// - 启动期一次性注册，请求期只读；
/// - 未注册的名称解析为 `None`，失败语义由调用方决定，绝不 panic。
pub struct DomainModel<F: WireFormat> {
    types: DashMap<&'static str, DomainType<F>>,
}

impl<F: WireFormat> Default for DomainModel<F> {
    fn default() -> Self {
        Self {
            types: DashMap::new(),
        }
    }
}

impl<F: WireFormat> DomainModel<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册普通领域对象（不具备聚合根能力）
    pub fn register_object<T: DomainObject>(&self) {
        self.types.insert(
            T::NAME,
            DomainType {
                name: T::NAME,
                ops: None,
            },
        );
    }

    /// 注册聚合根，并捕获针对 `T` 的强类型持久化与示例闭包
    ///
    /// `T: Default` 用于示例参数的实例合成（诊断路径），
    /// 真实持久化不会构造该实例。
    pub fn register_root<T>(&self)
    where
        T: AggregateRoot + Clone + Default + Serialize + DeserializeOwned,
    {
        let persist: PersistFn<F> = Arc::new(persist_entry::<T, F>);
        let example: ExampleFn<F> = Arc::new(|format| example_argument::<T, F>(format));
        self.types.insert(
            T::NAME,
            DomainType {
                name: T::NAME,
                ops: Some(RootOps { persist, example }),
            },
        );
        debug!(root = T::NAME, "registered aggregate root");
    }

    /// 解析类型名；未注册返回 `None`
    pub fn find(&self, name: &str) -> Option<DomainType<F>> {
        self.types.get(name).map(|entry| entry.clone())
    }

    /// 已注册类型名（只读视图）
    pub fn registered_types(&self) -> Vec<&'static str> {
        self.types.iter().map(|entry| *entry.key()).collect()
    }
}

/// 为 `T` 合成示例参数：`{ RootName, ToInsert: [T::default()] }`
fn example_argument<T, F>(format: &F) -> Option<F::Payload>
where
    T: AggregateRoot + Default + Serialize,
    F: WireFormat,
{
    let batch = format.encode(&vec![T::default()]).ok()?;
    let mut argument = PersistArgument::<F::Payload>::example(T::NAME);
    argument.to_insert = Some(batch);
    format.encode(&argument).ok()
}

fn decode_failure<T, F>(format: &F, label: &str, cause: &DomainError) -> DomainError
where
    T: AggregateRoot + Default + Serialize,
    F: WireFormat,
{
    DomainError::Validation {
        message: format!("Error deserializing {label}: {cause}."),
        explanation: example_argument::<T, F>(format)
            .map(|payload| format!("Example argument:\n{}", format.render(&payload))),
    }
}

fn decode_batch<T, F>(format: &F, payload: Option<&F::Payload>, label: &str) -> DomainResult<Vec<T>>
where
    T: AggregateRoot + Default + Serialize + DeserializeOwned,
    F: WireFormat,
{
    match payload {
        None => Ok(Vec::new()),
        Some(raw) => format
            .decode(raw)
            .map_err(|cause| decode_failure::<T, F>(format, label, &cause)),
    }
}

/// 更新批次解码，两段式且优先级固定：
/// 先按 `(original, modified)` 对解析；仅当主格式解不出任何内容时，
/// 才按 legacy 扁平“新状态”序列回退并归一化，避免悄悄丢弃合法的对数据。
/// 回退也一无所获时，报告主格式的解码结果。
fn decode_update_batch<T, F>(
    format: &F,
    payload: Option<&F::Payload>,
) -> DomainResult<Vec<UpdatePair<T>>>
where
    T: AggregateRoot + Clone + Default + Serialize + DeserializeOwned,
    F: WireFormat,
{
    let Some(raw) = payload else {
        return Ok(Vec::new());
    };
    match format.decode::<Vec<UpdatePair<T>>>(raw) {
        Ok(pairs) if !pairs.is_empty() => Ok(pairs),
        primary => {
            if let Ok(values) = format.decode::<Vec<T>>(raw) {
                if !values.is_empty() {
                    return Ok(values.into_iter().map(UpdatePair::from_modified).collect());
                }
            }
            primary.map_err(|cause| decode_failure::<T, F>(format, "ToUpdate", &cause))
        }
    }
}

/// 批次的截断预览：至多前两个元素，避免把大批量数据灌入错误文本
fn preview<F, T>(format: &F, label: &str, head: &[T]) -> String
where
    F: WireFormat,
    T: Serialize,
{
    if head.is_empty() {
        return String::new();
    }
    match format.encode(&head) {
        Ok(payload) => format!("\n{label} (first two): {}", format.render(&payload)),
        Err(_) => String::new(),
    }
}

/// 注册表存储的入口：把针对 `T` 的 async 持久化包装为可擦除的装箱 future
fn persist_entry<'a, T, F>(
    format: &'a F,
    locator: &'a ServiceRegistry,
    batches: RawBatches<F>,
) -> PersistFuture<'a>
where
    T: AggregateRoot + Clone + Default + Serialize + DeserializeOwned,
    F: WireFormat,
{
    Box::pin(persist_root::<T, F>(format, locator, batches))
}

async fn persist_root<'a, T, F>(
    format: &'a F,
    locator: &'a ServiceRegistry,
    batches: RawBatches<F>,
) -> DomainResult<Vec<String>>
where
    T: AggregateRoot + Clone + Default + Serialize + DeserializeOwned,
    F: WireFormat,
{
    let repository = locator.resolve::<Arc<dyn PersistableRepository<T>>>()?;

    let insert: Vec<T> = decode_batch(format, batches.to_insert.as_ref(), "ToInsert")?;
    let update: Vec<UpdatePair<T>> = decode_update_batch(format, batches.to_update.as_ref())?;
    let delete: Vec<T> = decode_batch(format, batches.to_delete.as_ref(), "ToDelete")?;

    // 非空载荷也可能合法地解出空批次，需在解码后复查
    if insert.is_empty() && update.is_empty() && delete.is_empty() {
        return Err(DomainError::Validation {
            message: "Data not sent or deserialized unsuccessfully.".to_string(),
            explanation: example_argument::<T, F>(format)
                .map(|payload| format!("Example argument:\n{}", format.render(&payload))),
        });
    }

    let insert_head: Vec<T> = insert.iter().take(2).cloned().collect();
    let update_head: Vec<UpdatePair<T>> = update.iter().take(2).cloned().collect();
    let delete_head: Vec<T> = delete.iter().take(2).cloned().collect();

    match repository.persist(insert, update, delete).await {
        Ok(uris) => Ok(uris),
        Err(DomainError::Business { reason }) => Err(DomainError::Validation {
            message: reason,
            explanation: None,
        }),
        Err(other) => Err(DomainError::Validation {
            message: format!("Error persisting: {other}."),
            explanation: Some(format!(
                "{}{}{}",
                preview(format, "Insert", &insert_head),
                preview(format, "Update", &update_head),
                preview(format, "Delete", &delete_head),
            )),
        }),
    }
}
