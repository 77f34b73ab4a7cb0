use std::sync::Arc;

use sogodap_service::DirectoryService;
use sogodap_storage::{db::Db, location::BackendLocation};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<DirectoryService>,
}
impl AppState {
	/// Reads SOGo's backend settings and connects to the folder-info database.
	///
	/// The connection is pinged here, so an unreachable database stops startup.
	pub async fn new(config: sogodap_config::Config) -> color_eyre::Result<Self> {
		tracing::debug!(path = %config.backend.sogo_conf.display(), "Reading SOGo backend settings.");

		let backend_settings = sogodap_config::load_backend(&config.backend.sogo_conf)?;
		let folder_info = BackendLocation::parse(&backend_settings.folder_info_url)?;

		tracing::debug!(
			backend = %folder_info.identity,
			combined = backend_settings.is_combined(),
			"Connecting to the SOGo database."
		);

		let db = Db::connect(&folder_info.identity, config.backend.pool_max_conns).await?;
		let service = DirectoryService::new(config, backend_settings, db)?;

		Ok(Self { service: Arc::new(service) })
	}
}
