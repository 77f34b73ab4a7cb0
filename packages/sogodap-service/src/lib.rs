pub mod auth;
pub mod backend;
pub mod locator;
pub mod registry;
pub mod search;

mod error;

pub use auth::{BindAuthenticator, BindOutcome};
pub use backend::SqlBackend;
pub use error::{Error, Result};
pub use locator::{PartitionLocator, PartitionLookup};
pub use registry::{Connection, ConnectionRegistry, QueryTarget};
pub use search::{SearchOutcome, SearchStatus};

use std::{future::Future, pin::Pin, sync::Arc};

use sogodap_config::{BackendSettings, Config};
use sogodap_domain::{ExtractorRegistry, FilterTemplates};
use sogodap_storage::{db::Db, location::BackendLocation, models::Partition};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where address books and their records come from.
pub trait AddressBookBackend
where
	Self: Send + Sync,
{
	fn lookup_partitions<'a>(
		&'a self,
		lookup: &'a PartitionLookup,
	) -> BoxFuture<'a, Result<Vec<Partition>>>;

	/// Returns the raw vCard text of each record; `constraint` is the suffix built by
	/// `sogodap_domain::filter::scoped_constraint`.
	fn fetch_records<'a>(
		&'a self,
		target: &'a QueryTarget,
		constraint: &'a str,
	) -> BoxFuture<'a, Result<Vec<String>>>;
}

pub struct DirectoryService {
	pub cfg: Config,
	backend: Arc<dyn AddressBookBackend>,
	locator: PartitionLocator,
	registry: ConnectionRegistry,
	templates: FilterTemplates,
	extractors: ExtractorRegistry,
	authenticator: BindAuthenticator,
}
impl DirectoryService {
	pub fn new(cfg: Config, backend_settings: BackendSettings, db: Db) -> Result<Self> {
		Self::with_backend(cfg, backend_settings, Arc::new(SqlBackend::new(db)))
	}

	pub fn with_backend(
		cfg: Config,
		backend_settings: BackendSettings,
		backend: Arc<dyn AddressBookBackend>,
	) -> Result<Self> {
		let folder_info = BackendLocation::parse(&backend_settings.folder_info_url)?;
		let store = match backend_settings.store_url.as_deref() {
			Some(url) if backend_settings.is_combined() => Some(BackendLocation::parse(url)?),
			_ => None,
		};
		let locator =
			PartitionLocator::new(&folder_info, store.is_some(), &cfg.search.subtree_lookup);
		let registry = ConnectionRegistry::new(folder_info.identity, store);
		let templates = FilterTemplates::new(&cfg.filters);
		let authenticator = BindAuthenticator::new(&cfg.auth);

		Ok(Self {
			cfg,
			backend,
			locator,
			registry,
			templates,
			extractors: ExtractorRegistry::default(),
			authenticator,
		})
	}

	/// Replaces the attribute extractors, e.g. to serve attributes beyond the built-in set.
	pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
		self.extractors = extractors;

		self
	}
}
