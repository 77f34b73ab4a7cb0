use std::{
	collections::{HashMap, HashSet},
	sync::{Arc, Mutex},
};

use sogodap_config::{BackendSettings, Config};
use sogodap_domain::{ExtractorRegistry, FilterExpr, Scope, SearchSpec};
use sogodap_service::{
	AddressBookBackend, BindOutcome, BoxFuture, Connection, DirectoryService, Error,
	PartitionLookup, QueryTarget, Result, SearchStatus,
};
use sogodap_storage::models::{Partition, PartitionColumn};

const INFO_URL: &str = "mysql://sogo:pw@db.example.com/sogo/sogo_folder_info";
const STORE_URL: &str = "mysql://sogo:pw@db.example.com:3306/sogo/sogo_store";

const JOHN: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:John Doe\r\nN:Doe;John;;;\r\nTITLE:Engineer\r\nEND:VCARD\r\n";
const JANE: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Jane Doe\r\nN:Doe;Jane;;;\r\nEND:VCARD\r\n";
const ADAM: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Adam Ant\r\nN:Ant;Adam;;;\r\nEND:VCARD\r\n";
const ZOE: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Zoe Zed\r\nEND:VCARD\r\n";

/// Serves folders per principal and records per table, remembering every call.
#[derive(Default)]
struct MemoryBackend {
	partitions: HashMap<String, Vec<Partition>>,
	records: HashMap<String, Vec<String>>,
	unreachable: HashSet<String>,
	fail_lookup: bool,
	lookups: Mutex<Vec<PartitionLookup>>,
	queries: Mutex<Vec<(QueryTarget, String)>>,
}
impl MemoryBackend {
	fn with_partition(mut self, principal: &str, partition: Partition) -> Self {
		self.partitions.entry(principal.to_string()).or_default().push(partition);

		self
	}

	fn with_records(mut self, key: &str, records: &[&str]) -> Self {
		self.records
			.entry(key.to_string())
			.or_default()
			.extend(records.iter().map(|record| record.to_string()));

		self
	}

	fn lookups(&self) -> Vec<PartitionLookup> {
		self.lookups.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn queries(&self) -> Vec<(QueryTarget, String)> {
		self.queries.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl AddressBookBackend for MemoryBackend {
	fn lookup_partitions<'a>(
		&'a self,
		lookup: &'a PartitionLookup,
	) -> BoxFuture<'a, Result<Vec<Partition>>> {
		self.lookups.lock().unwrap_or_else(|err| err.into_inner()).push(lookup.clone());

		let result = if self.fail_lookup {
			Err(Error::Storage { message: "lookup failed".to_string() })
		} else {
			Ok(lookup
				.principals
				.iter()
				.filter_map(|principal| self.partitions.get(principal))
				.flatten()
				.cloned()
				.collect())
		};

		Box::pin(async move { result })
	}

	fn fetch_records<'a>(
		&'a self,
		target: &'a QueryTarget,
		constraint: &'a str,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		self.queries
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.push((target.clone(), constraint.to_string()));

		let key = match target.folder_id {
			Some(id) => format!("{}#{id}", target.table),
			None => target.table.clone(),
		};
		let result = if self.unreachable.contains(&target.table) {
			Err(Error::Storage { message: format!("{} is unreachable", target.table) })
		} else {
			Ok(self.records.get(&key).cloned().unwrap_or_default())
		};

		Box::pin(async move { result })
	}
}

fn combined_settings() -> BackendSettings {
	BackendSettings {
		folder_info_url: INFO_URL.to_string(),
		store_url: Some(STORE_URL.to_string()),
	}
}

fn distributed_settings() -> BackendSettings {
	BackendSettings { folder_info_url: INFO_URL.to_string(), store_url: None }
}

fn test_config() -> Config {
	let mut cfg = Config::default();

	cfg.search.subtree_lookup = vec!["bob".to_string(), "carol".to_string()];
	cfg.filters.insert("cn".to_string(), ".*_val_.*".to_string());
	cfg.auth.user = "cn=sogodap".to_string();
	cfg.auth.password = "secret".to_string();

	cfg
}

fn service(
	settings: BackendSettings,
	backend: MemoryBackend,
) -> (DirectoryService, Arc<MemoryBackend>) {
	let backend = Arc::new(backend);
	let service = DirectoryService::with_backend(test_config(), settings, backend.clone())
		.expect("Failed to build service.");

	(service, backend)
}

fn spec(scope: Scope, filter: &str, size_limit: u32, attributes: &[&str]) -> SearchSpec {
	SearchSpec {
		base: "uid=alice".to_string(),
		scope,
		filter: FilterExpr::parse(filter).expect("filter should parse"),
		size_limit,
		attributes: attributes.iter().map(|name| name.to_string()).collect(),
	}
}

fn first_values(entries: &[sogodap_domain::OutputEntry]) -> Vec<&str> {
	entries.iter().map(|entry| entry.attributes[0].1.as_str()).collect()
}

#[tokio::test]
async fn subtree_search_looks_up_shared_principals() {
	let (service, backend) = service(combined_settings(), MemoryBackend::default());

	service.search(&spec(Scope::WholeSubtree, "", 0, &["cn"])).await;
	service.search(&spec(Scope::SingleLevel, "", 0, &["cn"])).await;

	let lookups = backend.lookups();

	assert_eq!(lookups.len(), 2);
	assert_eq!(lookups[0].column, PartitionColumn::FolderId);
	assert_eq!(lookups[0].table, "sogo_folder_info");
	assert_eq!(lookups[0].principals, vec!["alice", "bob", "carol"]);
	assert_eq!(lookups[1].principals, vec!["alice"]);
}

#[tokio::test]
async fn no_partitions_is_no_such_object() {
	let (service, backend) = service(combined_settings(), MemoryBackend::default());
	let outcome = service.search(&spec(Scope::WholeSubtree, "(cn=John)", 0, &["cn"])).await;

	assert_eq!(outcome.status, SearchStatus::NoSuchObject);
	assert!(outcome.entries.is_empty());
	assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn base_without_principal_skips_backend() {
	let (service, backend) = service(combined_settings(), MemoryBackend::default());
	let mut search = spec(Scope::BaseObject, "", 0, &["cn"]);

	search.base = "uid=".to_string();

	let outcome = service.search(&search).await;

	assert_eq!(outcome.status, SearchStatus::NoSuchObject);
	assert!(backend.lookups().is_empty());
}

#[tokio::test]
async fn lookup_failure_is_operations_error() {
	let backend = MemoryBackend { fail_lookup: true, ..MemoryBackend::default() };
	let (service, _) = service(combined_settings(), backend);
	let outcome = service.search(&spec(Scope::WholeSubtree, "", 0, &["cn"])).await;

	assert_eq!(outcome.status, SearchStatus::OperationsError);
	assert!(outcome.entries.is_empty());
}

#[tokio::test]
async fn combined_store_scopes_queries_by_folder() {
	let backend = MemoryBackend::default()
		.with_partition("alice", Partition::Folder { id: 7 })
		.with_records("sogo_store#7", &[JOHN]);
	let (service, backend) = service(combined_settings(), backend);
	let outcome = service.search(&spec(Scope::SingleLevel, "(cn=John)", 0, &["cn", "sn"])).await;

	assert_eq!(outcome.status, SearchStatus::Success);
	assert_eq!(outcome.entries.len(), 1);
	assert_eq!(outcome.entries[0].dn, "cn=0,uid=alice");
	assert_eq!(
		outcome.entries[0].attributes,
		vec![("cn".to_string(), "John Doe".to_string()), ("sn".to_string(), "Doe".to_string())]
	);
	assert_eq!(
		backend.queries(),
		vec![(
			QueryTarget {
				connection: Connection::Primary,
				table: "sogo_store".to_string(),
				folder_id: Some(7),
			},
			" and c_folder_id = 7 and (c_content regexp '.*John.*') limit 100".to_string(),
		)]
	);
}

#[tokio::test]
async fn distributed_store_skips_unreachable_address_books() {
	let mut backend = MemoryBackend::default()
		.with_partition(
			"alice",
			Partition::Location("mysql://sogo:pw@DB.example.com:3306/sogo/sogoalice001".to_string()),
		)
		.with_partition(
			"bob",
			Partition::Location("mysql://sogo:pw@db2.example.com/sogo/sogobob001".to_string()),
		)
		.with_partition("carol", Partition::Location("garbage".to_string()))
		.with_records("sogoalice001", &[JANE])
		.with_records("sogobob001", &[JOHN]);

	backend.unreachable.insert("sogobob001".to_string());

	let (service, backend) = service(distributed_settings(), backend);
	let outcome = service.search(&spec(Scope::WholeSubtree, "", 0, &["cn"])).await;

	assert_eq!(outcome.status, SearchStatus::Success);
	assert_eq!(first_values(&outcome.entries), vec!["Jane Doe"]);

	let queries = backend.queries();

	assert_eq!(queries.len(), 2);
	assert_eq!(queries[0].0.connection, Connection::Primary);
	assert_eq!(queries[0].1, " limit 100");
	assert!(matches!(
		&queries[1].0.connection,
		Connection::Transient(identity) if identity.host == "db2.example.com"
	));
}

#[tokio::test]
async fn results_are_merged_sorted_and_capped() {
	let backend = MemoryBackend::default()
		.with_partition("alice", Partition::Folder { id: 1 })
		.with_partition("bob", Partition::Folder { id: 2 })
		.with_records("sogo_store#1", &[ZOE, "not a vcard", JOHN])
		.with_records("sogo_store#2", &[JANE, ADAM]);
	let (service, backend) = service(combined_settings(), backend);
	let outcome = service.search(&spec(Scope::WholeSubtree, "", 3, &["cn"])).await;

	assert_eq!(outcome.status, SearchStatus::Success);
	assert_eq!(first_values(&outcome.entries), vec!["Adam Ant", "Jane Doe", "John Doe"]);
	assert!(backend.queries().iter().all(|(_, constraint)| constraint.ends_with(" limit 3")));
}

#[tokio::test]
async fn contacts_without_requested_values_are_dropped() {
	let backend = MemoryBackend::default()
		.with_partition("alice", Partition::Folder { id: 1 })
		.with_records("sogo_store#1", &[JOHN, JANE]);
	let (service, _) = service(combined_settings(), backend);
	let outcome = service.search(&spec(Scope::BaseObject, "", 0, &["mobile"])).await;

	assert_eq!(outcome.status, SearchStatus::Success);
	assert!(outcome.entries.is_empty());
}

#[tokio::test]
async fn custom_extractors_serve_extra_attributes() {
	let backend = MemoryBackend::default()
		.with_partition("alice", Partition::Folder { id: 1 })
		.with_records("sogo_store#1", &[JOHN]);
	let (service, _) = service(combined_settings(), backend);
	let mut extractors = ExtractorRegistry::default();

	extractors.register("title", |card| card.preferred_text("TITLE"));

	let service = service.with_extractors(extractors);
	let outcome = service.search(&spec(Scope::BaseObject, "", 0, &["cn", "title"])).await;

	assert_eq!(
		outcome.entries[0].attributes,
		vec![
			("cn".to_string(), "John Doe".to_string()),
			("title".to_string(), "Engineer".to_string())
		]
	);
}

#[test]
fn bind_checks_configured_credential() {
	let (service, _) = service(combined_settings(), MemoryBackend::default());

	assert_eq!(service.bind("cn=sogodap", "secret"), BindOutcome::Success);
	assert_eq!(service.bind("cn=sogodap", "wrong"), BindOutcome::InvalidCredentials);
	assert_eq!(service.bind("", ""), BindOutcome::InvalidCredentials);
}

#[test]
fn invalid_folder_info_url_fails_construction() {
	let settings = BackendSettings { folder_info_url: "sogo".to_string(), store_url: None };
	let result =
		DirectoryService::with_backend(test_config(), settings, Arc::new(MemoryBackend::default()));

	assert!(matches!(result, Err(Error::InvalidLocation { .. })));
}
