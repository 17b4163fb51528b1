use async_trait::async_trait;
use domsrv_commands::{CommandResult, PermissionManager, PersistAggregateRoot, ServerCommand, StatusCode};
use domsrv_domain::argument::{PersistArgument, UpdatePair};
use domsrv_domain::domain_object::{AggregateRoot, DomainObject};
use domsrv_domain::error::{DomainError, DomainResult};
use domsrv_domain::model::DomainModel;
use domsrv_domain::registry::ServiceRegistry;
use domsrv_domain::repository::{PersistableRepository, Repository};
use domsrv_domain::serialization::{JsonFormat, WireFormat};
use domsrv_domain::specification::Specification;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Invoice {
    number: String,
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

struct Currency;

impl DomainObject for Currency {
    const NAME: &'static str = "Common.Currency";
}

#[derive(Default)]
struct RecordingRepository {
    calls: AtomicUsize,
    last: Mutex<Option<(Vec<Invoice>, Vec<UpdatePair<Invoice>>, Vec<Invoice>)>>,
    failure: Mutex<Option<DomainError>>,
}

#[async_trait]
impl Repository<Invoice> for RecordingRepository {
    async fn find(&self, _uris: &[String]) -> DomainResult<Vec<Invoice>> {
        Ok(Vec::new())
    }

    async fn query(
        &self,
        _specification: Option<&dyn Specification<Invoice>>,
    ) -> DomainResult<Vec<Invoice>> {
        Ok(Vec::new())
    }

    async fn search(
        &self,
        _specification: Option<&dyn Specification<Invoice>>,
        _limit: Option<usize>,
        _offset: Option<usize>,
    ) -> DomainResult<Vec<Invoice>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl PersistableRepository<Invoice> for RecordingRepository {
    async fn persist(
        &self,
        insert: Vec<Invoice>,
        update: Vec<UpdatePair<Invoice>>,
        delete: Vec<Invoice>,
    ) -> DomainResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failure.lock().unwrap().take() {
            return Err(failure);
        }
        let uris = insert.iter().map(|it| it.uri()).collect();
        *self.last.lock().unwrap() = Some((insert, update, delete));
        Ok(uris)
    }
}

struct AllowAll;
impl PermissionManager for AllowAll {
    fn can_access(&self, _type_name: &str) -> bool {
        true
    }
}

struct DenyAll;
impl PermissionManager for DenyAll {
    fn can_access(&self, _type_name: &str) -> bool {
        false
    }
}

fn setup(
    repository: Arc<RecordingRepository>,
    permissions: Arc<dyn PermissionManager>,
) -> PersistAggregateRoot<JsonFormat> {
    let scope = Arc::new(ServiceRegistry::new());
    scope.register::<Arc<dyn PersistableRepository<Invoice>>>(repository);
    let model = Arc::new(DomainModel::<JsonFormat>::new());
    model.register_root::<Invoice>();
    model.register_object::<Currency>();
    PersistAggregateRoot::new(scope, model, permissions)
}

async fn run(command: &PersistAggregateRoot<JsonFormat>, argument: Value) -> CommandResult<Value> {
    command.execute(&JsonFormat, &JsonFormat, argument).await
}

fn invoice(number: &str, amount: i64) -> Invoice {
    Invoice {
        number: number.to_string(),
        amount,
    }
}

/// 把失败信封中的示例文本还原为可重新提交的参数
fn decode_example(explanation: &str) -> PersistArgument<Value> {
    let encoded = explanation
        .strip_prefix("Example argument:\n")
        .expect("explanation should carry an example argument");
    serde_json::from_str(encoded).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn end_to_end_insert_persists_and_reports_uris() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(AllowAll));

    let result = run(
        &command,
        json!({
            "RootName": "Sales.Invoice",
            "ToInsert": [{"number": "inv-7", "amount": 120}],
        }),
    )
    .await;

    assert!(result.success, "unexpected failure: {}", result.message);
    assert_eq!(result.status, StatusCode::Ok);
    assert_eq!(result.message, "Data persisted");
    assert_eq!(result.data, Some(json!(["Sales.Invoice/inv-7"])));

    let last = repository.last.lock().unwrap().take().unwrap();
    assert_eq!(last.0, vec![invoice("inv-7", 120)]);
    assert!(last.1.is_empty());
    assert!(last.2.is_empty());
    assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_root_example_succeeds_after_correction() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(AllowAll));

    let result = run(&command, json!({"RootName": "Sales.Unknown"})).await;

    assert!(!result.success);
    assert_eq!(result.message, "Couldn't find root type Sales.Unknown.");
    assert_eq!(repository.calls.load(Ordering::SeqCst), 0);

    // 示例以请求的名称为键；修正名称并补上载荷后重新提交应当成功
    let mut example = decode_example(result.explanation.as_deref().unwrap());
    assert_eq!(example.root_name, "Sales.Unknown");
    example.root_name = "Sales.Invoice".to_string();
    example.to_insert = Some(json!([invoice("inv-1", 10)]));

    let corrected = JsonFormat.encode(&example).unwrap();
    let retried = run(&command, corrected).await;
    assert!(retried.success, "retry failed: {}", retried.message);
    assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_aggregate_root_is_rejected_before_repository() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(AllowAll));

    let result = run(
        &command,
        json!({"RootName": "Common.Currency", "ToInsert": [{}]}),
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.status, StatusCode::BadRequest);
    assert_eq!(
        result.message,
        "Specified type (Common.Currency) is not an aggregate root. Please check your arguments."
    );
    assert!(result.explanation.is_none());
    assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn denied_access_is_forbidden_without_example() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(DenyAll));

    let result = run(
        &command,
        json!({
            "RootName": "Sales.Invoice",
            "ToInsert": [{"number": "inv-1", "amount": 10}],
        }),
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.status, StatusCode::Forbidden);
    assert_eq!(
        result.message,
        "You don't have permission to access: Sales.Invoice."
    );
    assert!(result.data.is_none());
    assert!(result.explanation.is_none());
    assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn absent_payloads_fail_with_resolved_type_example() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(AllowAll));

    let result = run(&command, json!({"RootName": "Sales.Invoice"})).await;

    assert!(!result.success);
    assert_eq!(result.message, "Data to persist not specified.");
    let example = decode_example(result.explanation.as_deref().unwrap());
    assert_eq!(example.root_name, "Sales.Invoice");
    assert!(example.to_insert.is_some());
    assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn decoded_empty_batches_fail_with_synthesized_example() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(AllowAll));

    let result = run(
        &command,
        json!({"RootName": "Sales.Invoice", "ToInsert": [], "ToDelete": []}),
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.message, "Data not sent or deserialized unsuccessfully.");
    let example = decode_example(result.explanation.as_deref().unwrap());
    assert_eq!(example.root_name, "Sales.Invoice");
    assert_eq!(
        example.to_insert,
        Some(json!([{"number": "", "amount": 0}]))
    );
    assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn legacy_flat_update_reaches_repository_as_pairs() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(AllowAll));

    let result = run(
        &command,
        json!({
            "RootName": "Sales.Invoice",
            "ToUpdate": [invoice("inv-1", 10), invoice("inv-2", 20)],
        }),
    )
    .await;

    assert!(result.success, "unexpected failure: {}", result.message);
    let last = repository.last.lock().unwrap().take().unwrap();
    assert!(last.0.is_empty());
    assert_eq!(
        last.1,
        vec![
            UpdatePair::from_modified(invoice("inv-1", 10)),
            UpdatePair::from_modified(invoice("inv-2", 20)),
        ]
    );
    assert!(last.2.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_argument_fails_with_placeholder_example() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(AllowAll));

    let result = run(&command, json!([1, 2, 3])).await;

    assert!(!result.success);
    let example = decode_example(result.explanation.as_deref().unwrap());
    assert_eq!(example.root_name, "Module.AggregateRoot");
    assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn business_failure_surfaces_repository_message_unwrapped() {
    let repository = Arc::new(RecordingRepository::default());
    *repository.failure.lock().unwrap() = Some(DomainError::Business {
        reason: "duplicate invoice number".to_string(),
    });
    let command = setup(repository.clone(), Arc::new(AllowAll));

    let result = run(
        &command,
        json!({
            "RootName": "Sales.Invoice",
            "ToInsert": [{"number": "inv-1", "amount": 10}],
        }),
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.message, "duplicate invoice number");
    assert!(result.explanation.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn round_trip_argument_drives_identical_repository_call() {
    let repository = Arc::new(RecordingRepository::default());
    let command = setup(repository.clone(), Arc::new(AllowAll));
    let format = JsonFormat;

    let argument = PersistArgument {
        root_name: "Sales.Invoice".to_string(),
        to_insert: Some(format.encode(&vec![invoice("inv-1", 10)]).unwrap()),
        to_update: Some(
            format
                .encode(&vec![UpdatePair::new(
                    Some(invoice("inv-2", 20)),
                    invoice("inv-2", 25),
                )])
                .unwrap(),
        ),
        to_delete: None,
    };

    let encoded = format.encode(&argument).unwrap();
    let first = run(&command, encoded.clone()).await;
    assert!(first.success);
    let first_call = repository.last.lock().unwrap().take().unwrap();

    // 编码再解码后的参数必须驱动完全相同的仓储调用
    let round_tripped: PersistArgument<Value> = format.decode(&encoded).unwrap();
    let second = run(&command, format.encode(&round_tripped).unwrap()).await;
    assert!(second.success);
    let second_call = repository.last.lock().unwrap().take().unwrap();

    assert_eq!(first_call, second_call);
    assert_eq!(first.data, second.data);
}
