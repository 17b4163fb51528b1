use crate::{argument::UpdatePair, error::DomainResult, specification::Specification};
use async_trait::async_trait;

/// 领域对象只读仓储
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// 按 URI 批量查找
    async fn find(&self, uris: &[String]) -> DomainResult<Vec<T>>;

    /// 按规约过滤；`None` 表示不过滤
    async fn query(
        &self,
        specification: Option<&dyn Specification<T>>,
    ) -> DomainResult<Vec<T>>;

    /// 按规约过滤并分页
    async fn search(
        &self,
        specification: Option<&dyn Specification<T>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> DomainResult<Vec<T>>;
}

/// 可持久化仓储
///
/// 以“插入/更新对/删除”为一个持久化单元；一次调用的并发一致性
/// 由具体存储实现负责，本接口不附加任何锁或排序保证。
#[async_trait]
pub trait PersistableRepository<T>: Repository<T> {
    /// 返回本次持久化产生的 URI 列表（插入按提交顺序在前）。
    /// 可识别的业务规则冲突以 [`DomainError::Business`](crate::error::DomainError) 报告。
    async fn persist(
        &self,
        insert: Vec<T>,
        update: Vec<UpdatePair<T>>,
        delete: Vec<T>,
    ) -> DomainResult<Vec<String>>;
}
