//! 领域对象服务器的领域侧基础库（domsrv-domain）
//!
//! 提供聚合根持久化管线所需的领域层抽象与构件：
//! - 领域对象与聚合根能力标记（`domain_object`）
//! - 序列化格式抽象与 JSON 实现（`serialization`）
//! - 持久化参数与更新对数据模型（`argument`）
//! - 服务定位器（`registry`）：按类型注册/解析协作者
//! - 领域模型注册表（`model`）：类型名解析、能力检查与泛型持久化调用器
//! - 类型化仓储接口（`repository`）与规约（`specification`）
//!
//! 本 crate 不绑定任何传输与存储实现，仅定义接口与最小必要的错误类型，
//! 便于命令层（domsrv-commands）与具体基础设施分别适配。
pub mod argument;
pub mod domain_object;
pub mod error;
pub mod model;
pub mod registry;
pub mod repository;
pub mod serialization;
pub mod specification;

pub use argument::{PersistArgument, UpdatePair};
pub use domain_object::{AggregateRoot, DomainObject};
pub use error::{DomainError, DomainResult};
pub use model::{DomainModel, DomainType, RawBatches};
pub use registry::ServiceRegistry;
pub use serialization::{JsonFormat, WireFormat};
