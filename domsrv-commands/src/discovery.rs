use crate::{command::ServerCommand, error::CommandError};
use dashmap::DashMap;
use domsrv_domain::{error::DomainResult, registry::ServiceRegistry, serialization::WireFormat};
use std::sync::Arc;
use tracing::{debug, info};

/// 命令注册表
///
/// 传输层按稳定命令标识查找命令实例；启动期填充，请求期只读。
pub struct CommandRegistry<F: WireFormat> {
    commands: DashMap<&'static str, Arc<dyn ServerCommand<F>>>,
}

impl<F: WireFormat> Default for CommandRegistry<F> {
    fn default() -> Self {
        Self {
            commands: DashMap::new(),
        }
    }
}

impl<F: WireFormat> CommandRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令；同名重复注册报错
    pub fn register(
        &self,
        name: &'static str,
        command: Arc<dyn ServerCommand<F>>,
    ) -> Result<(), CommandError> {
        if self.commands.contains_key(name) {
            return Err(CommandError::AlreadyRegistered { command: name });
        }
        self.commands.insert(name, command);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ServerCommand<F>>> {
        self.commands.get(name).map(|entry| entry.clone())
    }

    /// 已注册命令名（只读视图）
    pub fn registered_commands(&self) -> Vec<&'static str> {
        self.commands.iter().map(|entry| *entry.key()).collect()
    }
}

type ConstructFn<F> =
    Arc<dyn Fn(&Arc<ServiceRegistry>) -> DomainResult<Arc<dyn ServerCommand<F>>> + Send + Sync>;

/// 服务描述符
///
/// “程序集扫描”的显式等价物：公开导出的命令构造器清单由启动代码传入，
/// 不依赖任何环境单例。`explicit` 标记该命令已被显式声明，发现阶段跳过。
pub struct ServiceDescriptor<F: WireFormat> {
    pub name: &'static str,
    pub explicit: bool,
    construct: ConstructFn<F>,
}

impl<F: WireFormat> ServiceDescriptor<F> {
    pub fn new(
        name: &'static str,
        construct: impl Fn(&Arc<ServiceRegistry>) -> DomainResult<Arc<dyn ServerCommand<F>>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name,
            explicit: false,
            construct: Arc::new(construct),
        }
    }

    /// 标记为已显式声明
    pub fn explicit(mut self) -> Self {
        self.explicit = true;
        self
    }
}

/// 启动期服务发现
///
/// 逐一检视描述符，凡未显式声明且尚未注册者，经其构造器装配并注册。
/// 幂等：重复执行不会二次注册，也不会报错。返回本次新注册的数量。
pub fn discover<F: WireFormat>(
    scope: &Arc<ServiceRegistry>,
    registry: &CommandRegistry<F>,
    descriptors: &[ServiceDescriptor<F>],
) -> Result<usize, CommandError> {
    let mut registered = 0;
    for descriptor in descriptors {
        if descriptor.explicit || registry.contains(descriptor.name) {
            debug!(command = descriptor.name, "skipping declared command");
            continue;
        }
        let command = (descriptor.construct)(scope)?;
        registry.register(descriptor.name, command)?;
        registered += 1;
    }
    info!(registered, "service discovery finished");
    Ok(registered)
}
