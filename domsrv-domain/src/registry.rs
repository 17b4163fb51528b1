use crate::error::{DomainError, DomainResult};
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};

/// 服务定位器（对象构造作用域）
///
/// - 以 TypeId 注册/解析协作者（按类型的仓储、序列化器、权限管理器等）；
/// - 启动期一次性装配，请求期只读；
/// - 解析失败属于配置错误，而非单次请求的业务失败。
#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册服务实例（同类型重复注册以后者为准）
    pub fn register<X>(&self, service: X)
    where
        X: Clone + Send + Sync + 'static,
    {
        self.services.insert(TypeId::of::<X>(), Box::new(service));
    }

    /// 解析服务实例；未注册返回 [`DomainError::Configuration`]
    pub fn resolve<X>(&self) -> DomainResult<X>
    where
        X: Clone + Send + Sync + 'static,
    {
        self.services
            .get(&TypeId::of::<X>())
            .and_then(|entry| entry.downcast_ref::<X>().cloned())
            .ok_or_else(|| DomainError::Configuration {
                reason: format!("service not registered: {}", type_name::<X>()),
            })
    }
}
