use async_trait::async_trait;
use domsrv_commands::{
    CommandRegistry, CommandRepository, PermissionManager, PersistAggregateRoot, ServerCommand,
    ServiceDescriptor, discover,
};
use domsrv_domain::argument::UpdatePair;
use domsrv_domain::domain_object::{AggregateRoot, DomainObject};
use domsrv_domain::error::{DomainError, DomainResult};
use domsrv_domain::model::DomainModel;
use domsrv_domain::registry::ServiceRegistry;
use domsrv_domain::repository::{PersistableRepository, Repository};
use domsrv_domain::serialization::JsonFormat;
use domsrv_domain::specification::{PredicateSpecification, Specification};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Invoice {
    number: String,
    customer: String,
    amount: i64,
}

impl DomainObject for Invoice {
    const NAME: &'static str = "Sales.Invoice";
}

impl AggregateRoot for Invoice {
    fn uri(&self) -> String {
        format!("Sales.Invoice/{}", self.number)
    }
}

#[derive(Default, Clone)]
struct InMemoryInvoiceRepository {
    store: Arc<Mutex<HashMap<String, Invoice>>>,
}

#[async_trait]
impl Repository<Invoice> for InMemoryInvoiceRepository {
    async fn find(&self, uris: &[String]) -> DomainResult<Vec<Invoice>> {
        let store = self.store.lock().unwrap();
        Ok(uris.iter().filter_map(|uri| store.get(uri).cloned()).collect())
    }

    async fn query(
        &self,
        specification: Option<&dyn Specification<Invoice>>,
    ) -> DomainResult<Vec<Invoice>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .values()
            .filter(|it| specification.is_none_or(|spec| spec.is_satisfied_by(it)))
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        specification: Option<&dyn Specification<Invoice>>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> DomainResult<Vec<Invoice>> {
        let all = self.query(specification).await?;
        Ok(all
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }
}

#[async_trait]
impl PersistableRepository<Invoice> for InMemoryInvoiceRepository {
    async fn persist(
        &self,
        insert: Vec<Invoice>,
        update: Vec<UpdatePair<Invoice>>,
        delete: Vec<Invoice>,
    ) -> DomainResult<Vec<String>> {
        let mut store = self.store.lock().unwrap();
        let mut uris = Vec::with_capacity(insert.len());
        for mut it in insert {
            if it.number.is_empty() {
                it.number = Uuid::new_v4().to_string();
            }
            let uri = it.uri();
            if store.contains_key(&uri) {
                return Err(DomainError::Business {
                    reason: format!("invoice already exists: {uri}"),
                });
            }
            store.insert(uri.clone(), it);
            uris.push(uri);
        }
        for pair in update {
            store.insert(pair.modified.uri(), pair.modified);
        }
        for it in delete {
            store.remove(&it.uri());
        }
        Ok(uris)
    }
}

struct AllowAll;

impl PermissionManager for AllowAll {
    fn can_access(&self, _type_name: &str) -> bool {
        true
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // 装配对象构造作用域
    let scope = Arc::new(ServiceRegistry::new());
    let repository = InMemoryInvoiceRepository::default();
    scope.register::<Arc<dyn PersistableRepository<Invoice>>>(Arc::new(repository.clone()));
    scope.register::<Arc<JsonFormat>>(Arc::new(JsonFormat));
    scope.register::<Arc<dyn PermissionManager>>(Arc::new(AllowAll));

    let model = Arc::new(DomainModel::<JsonFormat>::new());
    model.register_root::<Invoice>();
    scope.register::<Arc<DomainModel<JsonFormat>>>(model);

    // 启动期服务发现
    let registry = CommandRegistry::<JsonFormat>::new();
    let descriptors = vec![ServiceDescriptor::new(
        PersistAggregateRoot::<JsonFormat>::NAME,
        |scope| {
            Ok(Arc::new(PersistAggregateRoot::<JsonFormat>::from_scope(scope)?)
                as Arc<dyn ServerCommand<JsonFormat>>)
        },
    )];
    let registered = discover(&scope, &registry, &descriptors).unwrap();
    println!("discovered {registered} command(s): {:?}", registry.registered_commands());

    // 外部调用路径：编码请求 → 命令 → 信封
    let command = registry
        .get(PersistAggregateRoot::<JsonFormat>::NAME)
        .unwrap();
    let request = json!({
        "RootName": "Sales.Invoice",
        "ToInsert": [
            {"number": "inv-1001", "customer": "ACME", "amount": 250},
            {"number": "inv-1002", "customer": "Globex", "amount": 90},
        ],
    });
    let result = command.execute(&JsonFormat, &JsonFormat, request).await;
    println!("insert: success={} message={}", result.success, result.message);
    println!("uris: {}", result.data.unwrap());

    // 失败路径：未知类型名附带修正示例
    let result = command
        .execute(&JsonFormat, &JsonFormat, json!({"RootName": "Sales.Order"}))
        .await;
    println!("unknown root: {}", result.message);
    println!("{}", result.explanation.unwrap());

    // 进程内路径：仓储门面走与外部调用完全相同的管线
    let bridge = CommandRepository::<Invoice, JsonFormat>::from_scope(&scope).unwrap();
    let uris = bridge
        .persist(
            Vec::new(),
            vec![UpdatePair::new(
                None,
                Invoice {
                    number: "inv-1002".to_string(),
                    customer: "Globex".to_string(),
                    amount: 120,
                },
            )],
            Vec::new(),
        )
        .await
        .unwrap();
    println!("bridge update done, new uris: {uris:?}");

    let large = PredicateSpecification::new(|it: &Invoice| it.amount >= 120);
    let matched = bridge.query(Some(&large)).await.unwrap();
    println!("invoices with amount >= 120: {matched:?}");
}
