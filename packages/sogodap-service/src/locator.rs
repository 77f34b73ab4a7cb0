use sogodap_domain::SearchSpec;
use sogodap_storage::{location::BackendLocation, models::PartitionColumn};

/// The folder lookup for one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionLookup {
	pub column: PartitionColumn,
	pub table: String,
	pub principals: Vec<String>,
}

/// Decides whose address books a search reads.
#[derive(Clone, Debug)]
pub struct PartitionLocator {
	table: String,
	column: PartitionColumn,
	shared: Vec<String>,
}
impl PartitionLocator {
	pub fn new(folder_info: &BackendLocation, combined: bool, shared: &[String]) -> Self {
		let column = if combined { PartitionColumn::FolderId } else { PartitionColumn::Location };

		Self { table: folder_info.table.clone(), column, shared: shared.to_vec() }
	}

	/// The base principal, followed by the shared principals on subtree searches.
	pub fn resolve_principals(&self, spec: &SearchSpec) -> Vec<String> {
		let mut principals: Vec<String> = Vec::new();
		let shared = if spec.is_subtree() { self.shared.as_slice() } else { &[] };

		for principal in std::iter::once(spec.principal()).chain(shared.iter().map(String::as_str)) {
			let principal = principal.trim();

			if principal.is_empty() || principals.iter().any(|known| known == principal) {
				continue;
			}

			principals.push(principal.to_string());
		}

		principals
	}

	pub fn lookup(&self, principals: Vec<String>) -> PartitionLookup {
		PartitionLookup { column: self.column, table: self.table.clone(), principals }
	}
}
