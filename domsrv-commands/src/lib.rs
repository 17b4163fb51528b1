//! 领域对象服务器的命令层（domsrv-commands）
//!
//! - 命令契约与统一结果信封（`command`）
//! - 聚合根持久化命令（`persist_aggregate_root`）
//! - 进程内类型化仓储门面（`bridge`）
//! - 命令注册表与启动期服务发现（`discovery`）
pub mod bridge;
pub mod command;
pub mod discovery;
pub mod error;
pub mod persist_aggregate_root;

pub use bridge::CommandRepository;
pub use command::{CommandResult, ServerCommand, StatusCode};
pub use discovery::{CommandRegistry, ServiceDescriptor, discover};
pub use error::CommandError;
pub use persist_aggregate_root::{PermissionManager, PersistAggregateRoot};
