use crate::command::ServerCommand;
use crate::persist_aggregate_root::PersistAggregateRoot;
use async_trait::async_trait;
use domsrv_domain::{
    argument::{PersistArgument, UpdatePair},
    domain_object::DomainObject,
    error::{DomainError, DomainResult},
    registry::ServiceRegistry,
    repository::{PersistableRepository, Repository},
    serialization::WireFormat,
    specification::Specification,
};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::sync::Arc;

/// 进程内类型化仓储门面
///
/// 让内部调用方像使用普通类型化仓储一样使用命令管线：
/// - `find`/`query`/`search` 委托给定位器解析出的底层仓储；
/// - `persist` 将参数编码为 [`PersistArgument`]，进程内直接执行
///   聚合根持久化命令，再从信封解码 URI 列表——与外部调用方
///   走完全相同的管线，以此验证格式无关性。
pub struct CommandRepository<T, F: WireFormat> {
    command: Arc<PersistAggregateRoot<F>>,
    format: Arc<F>,
    inner: Arc<dyn PersistableRepository<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> CommandRepository<T, F>
where
    T: DomainObject,
    F: WireFormat,
{
    pub fn new(
        command: Arc<PersistAggregateRoot<F>>,
        format: Arc<F>,
        inner: Arc<dyn PersistableRepository<T>>,
    ) -> Self {
        Self {
            command,
            format,
            inner,
            _marker: PhantomData,
        }
    }

    /// 从服务定位器装配全部协作者
    pub fn from_scope(scope: &Arc<ServiceRegistry>) -> DomainResult<Self> {
        Ok(Self {
            command: Arc::new(PersistAggregateRoot::from_scope(scope)?),
            format: scope.resolve::<Arc<F>>()?,
            inner: scope.resolve::<Arc<dyn PersistableRepository<T>>>()?,
            _marker: PhantomData,
        })
    }
}

fn encode_batch<F, T>(format: &F, batch: &[T]) -> DomainResult<Option<F::Payload>>
where
    F: WireFormat,
    T: Serialize,
{
    if batch.is_empty() {
        Ok(None)
    } else {
        format.encode(&batch).map(Some)
    }
}

#[async_trait]
impl<T, F> Repository<T> for CommandRepository<T, F>
where
    T: DomainObject,
    F: WireFormat,
{
    async fn find(&self, uris: &[String]) -> DomainResult<Vec<T>> {
        self.inner.find(uris).await
    }

    async fn query(
        &self,
        specification: Option<&dyn Specification<T>>,
    ) -> DomainResult<Vec<T>> {
        self.inner.query(specification).await
    }

    async fn search(
        &self,
        specification: Option<&dyn Specification<T>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> DomainResult<Vec<T>> {
        self.inner.search(specification, limit, offset).await
    }
}

#[async_trait]
impl<T, F> PersistableRepository<T> for CommandRepository<T, F>
where
    T: DomainObject + Serialize + DeserializeOwned,
    F: WireFormat,
{
    async fn persist(
        &self,
        insert: Vec<T>,
        update: Vec<UpdatePair<T>>,
        delete: Vec<T>,
    ) -> DomainResult<Vec<String>> {
        let format = self.format.as_ref();
        let argument = PersistArgument {
            root_name: T::NAME.to_string(),
            to_insert: encode_batch(format, &insert)?,
            to_update: encode_batch(format, &update)?,
            to_delete: encode_batch(format, &delete)?,
        };
        let data = format.encode(&argument)?;

        let result = self.command.execute(format, format, data).await;
        if !result.success {
            return Err(DomainError::Repository {
                reason: result.message,
            });
        }
        let Some(payload) = result.data else {
            return Err(DomainError::Repository {
                reason: "persist result carried no data".to_string(),
            });
        };
        format.decode(&payload)
    }
}
