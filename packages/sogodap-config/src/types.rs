use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;

/// Gateway settings. Every section is optional in the file and falls back to the historical
/// SOGodap defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub service: Service,
	#[serde(default)]
	pub backend: Backend,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub auth: Auth,
	/// Map keys are lower-cased LDAP attribute names, values are regexp templates containing
	/// the `_val_` placeholder.
	#[serde(default)]
	pub filters: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_listen_address")]
	pub listen_address: String,
	#[serde(default = "default_listen_port")]
	pub listen_port: u16,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}
impl Service {
	pub fn listen_bind(&self) -> String {
		format!("{}:{}", self.listen_address, self.listen_port)
	}
}
impl Default for Service {
	fn default() -> Self {
		Self {
			listen_address: default_listen_address(),
			listen_port: default_listen_port(),
			log_level: default_log_level(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Backend {
	/// Location of the SOGo property-list file describing the database URLs.
	#[serde(default = "default_sogo_conf")]
	pub sogo_conf: PathBuf,
	#[serde(default = "default_pool_max_conns")]
	pub pool_max_conns: u32,
}
impl Default for Backend {
	fn default() -> Self {
		Self { sogo_conf: default_sogo_conf(), pool_max_conns: default_pool_max_conns() }
	}
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_max_results")]
	pub max_results: u32,
	/// Number of leading requested attributes used to order results. Zero disables sorting.
	#[serde(default = "default_sort_attributes")]
	pub sort_attributes: u32,
	/// Principals whose address books are added to every subtree search.
	#[serde(default)]
	pub subtree_lookup: Vec<String>,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			max_results: default_max_results(),
			sort_attributes: default_sort_attributes(),
			subtree_lookup: Vec::new(),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct Auth {
	#[serde(default)]
	pub user: String,
	#[serde(default)]
	pub password: String,
}

/// The subset of SOGo's own configuration the gateway depends on.
#[derive(Clone, Debug, Deserialize)]
pub struct BackendSettings {
	#[serde(rename = "OCSFolderInfoURL")]
	pub folder_info_url: String,
	#[serde(rename = "OCSStoreURL", default)]
	pub store_url: Option<String>,
}
impl BackendSettings {
	/// Address books share one combined store table when `OCSStoreURL` is configured.
	pub fn is_combined(&self) -> bool {
		self.store_url.as_deref().is_some_and(|url| !url.trim().is_empty())
	}
}

fn default_listen_address() -> String {
	"127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
	10_389
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_sogo_conf() -> PathBuf {
	PathBuf::from("/etc/sogo/sogo.conf")
}

fn default_pool_max_conns() -> u32 {
	4
}

fn default_max_results() -> u32 {
	100
}

fn default_sort_attributes() -> u32 {
	1
}
