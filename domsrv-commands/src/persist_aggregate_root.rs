use crate::command::{CommandResult, ServerCommand, StatusCode};
use async_trait::async_trait;
use domsrv_domain::{
    argument::PersistArgument,
    error::{DomainError, DomainResult},
    model::{DomainModel, RawBatches},
    registry::ServiceRegistry,
    serialization::WireFormat,
};
use std::sync::Arc;
use tracing::debug;

/// 权限协作者：按解析后的类型名裁决访问，策略内容不在本层定义
pub trait PermissionManager: Send + Sync {
    fn can_access(&self, type_name: &str) -> bool;
}

/// 参数本身无法解码时示例所用的占位类型名
const PLACEHOLDER_ROOT: &str = "Module.AggregateRoot";

/// 聚合根持久化命令
///
/// 严格按序推进的状态机，每一步要么终止于失败信封、要么进入下一步：
/// 1. 解码参数；2. 解析类型名；3. 能力检查；4. 权限检查；
/// 5. 载荷在场检查；6–7. 批次解码（含 legacy 回退）与解码后复查；
/// 8. 经由类型句柄分发到强类型持久化操作；9–11. 编码结果或归类失败。
///
/// 除 legacy 回退外无任何重试；所有失败路径都汇聚为结果信封，
/// 绝不向上抛出、绝不终止进程。
pub struct PersistAggregateRoot<F: WireFormat> {
    locator: Arc<ServiceRegistry>,
    model: Arc<DomainModel<F>>,
    permissions: Arc<dyn PermissionManager>,
}

impl<F: WireFormat> PersistAggregateRoot<F> {
    /// 传输层使用的稳定命令标识
    pub const NAME: &'static str = "persist-aggregate-root";

    pub fn new(
        locator: Arc<ServiceRegistry>,
        model: Arc<DomainModel<F>>,
        permissions: Arc<dyn PermissionManager>,
    ) -> Self {
        Self {
            locator,
            model,
            permissions,
        }
    }

    /// 从服务定位器装配（服务发现的构造路径）
    pub fn from_scope(scope: &Arc<ServiceRegistry>) -> DomainResult<Self> {
        Ok(Self {
            model: scope.resolve::<Arc<DomainModel<F>>>()?,
            permissions: scope.resolve::<Arc<dyn PermissionManager>>()?,
            locator: scope.clone(),
        })
    }

    /// 为（可能尚未解析的）类型名生成示例参数文本
    fn example(output: &F, root_name: &str) -> Option<String> {
        let argument = PersistArgument::<F::Payload>::example(root_name);
        output
            .encode(&argument)
            .ok()
            .map(|payload| format!("Example argument:\n{}", output.render(&payload)))
    }
}

#[async_trait]
impl<F: WireFormat> ServerCommand<F> for PersistAggregateRoot<F> {
    async fn execute(&self, input: &F, output: &F, data: F::Payload) -> CommandResult<F::Payload> {
        let argument: PersistArgument<F::Payload> = match input.decode(&data) {
            Ok(argument) => argument,
            Err(error) => {
                return CommandResult::fail(
                    error.to_string(),
                    Self::example(output, PLACEHOLDER_ROOT),
                );
            }
        };
        debug!(root = %argument.root_name, "persist command received");

        let Some(root_type) = self.model.find(&argument.root_name) else {
            return CommandResult::fail(
                format!("Couldn't find root type {}.", argument.root_name),
                Self::example(output, &argument.root_name),
            );
        };

        if !root_type.is_aggregate_root() {
            return CommandResult::fail(
                format!(
                    "Specified type ({}) is not an aggregate root. Please check your arguments.",
                    argument.root_name
                ),
                None,
            );
        }

        if !self.permissions.can_access(root_type.name()) {
            debug!(root = root_type.name(), "access denied");
            return CommandResult::returned(
                StatusCode::Forbidden,
                None,
                format!(
                    "You don't have permission to access: {}.",
                    argument.root_name
                ),
            );
        }

        if argument.is_empty() {
            let explanation = root_type
                .example(output)
                .map(|payload| format!("Example argument:\n{}", output.render(&payload)));
            return CommandResult::fail("Data to persist not specified.", explanation);
        }

        let batches = RawBatches {
            to_insert: argument.to_insert,
            to_update: argument.to_update,
            to_delete: argument.to_delete,
        };
        match root_type.persist(input, &self.locator, batches).await {
            Ok(uris) => match output.encode(&uris) {
                Ok(payload) => CommandResult::success(payload, "Data persisted"),
                Err(error) => {
                    CommandResult::fail(format!("Error serializing result: {error}."), None)
                }
            },
            Err(DomainError::Validation {
                message,
                explanation,
            }) => CommandResult::fail(message, explanation),
            Err(error) => CommandResult::fail(error.to_string(), None),
        }
    }
}
