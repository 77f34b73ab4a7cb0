mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Auth, Backend, BackendSettings, Config, Search, Service};

use std::{fs, path::Path};

use sogodap_domain::filter::TEMPLATE_PLACEHOLDER;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Reads SOGo's property-list configuration (XML, binary or OpenStep text).
pub fn load_backend(path: &Path) -> Result<BackendSettings> {
	let raw = fs::read(path)
		.map_err(|err| Error::ReadBackend { path: path.to_path_buf(), source: err })?;
	let settings: BackendSettings = plist::from_bytes(&raw)
		.map_err(|err| Error::ParseBackend { path: path.to_path_buf(), source: err })?;

	validate_backend(&settings)?;

	Ok(settings)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.listen_address.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.listen_address must be non-empty.".to_string(),
		});
	}
	if cfg.backend.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "backend.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_results == 0 {
		return Err(Error::Validation {
			message: "search.max_results must be greater than zero.".to_string(),
		});
	}

	for (attribute, template) in &cfg.filters {
		if attribute.trim().is_empty() {
			return Err(Error::Validation {
				message: "filters keys must be non-empty attribute names.".to_string(),
			});
		}
		if !template.contains(TEMPLATE_PLACEHOLDER) {
			return Err(Error::Validation {
				message: format!(
					"filters.{attribute} must contain the {TEMPLATE_PLACEHOLDER} placeholder."
				),
			});
		}
	}

	Ok(())
}

pub fn validate_backend(settings: &BackendSettings) -> Result<()> {
	if settings.folder_info_url.trim().is_empty() {
		return Err(Error::Validation { message: "OCSFolderInfoURL must be non-empty.".to_string() });
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.filters = cfg
		.filters
		.drain()
		.map(|(attribute, template)| (attribute.trim().to_ascii_lowercase(), template))
		.collect();
	cfg.search.subtree_lookup = cfg
		.search
		.subtree_lookup
		.iter()
		.map(|principal| principal.trim())
		.filter(|principal| !principal.is_empty())
		.map(str::to_string)
		.collect();
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
