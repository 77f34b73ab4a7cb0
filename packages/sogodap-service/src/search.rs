use sogodap_domain::{OutputEntry, SearchSpec, aggregate, filter};

use crate::DirectoryService;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStatus {
	Success,
	/// No principal or no address book matched the base.
	NoSuchObject,
	/// The folder lookup itself failed.
	OperationsError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
	pub entries: Vec<OutputEntry>,
	pub status: SearchStatus,
}
impl SearchOutcome {
	fn empty(status: SearchStatus) -> Self {
		Self { entries: Vec::new(), status }
	}
}

impl DirectoryService {
	/// Runs one search across every address book the base principal can see.
	///
	/// Address books that cannot be reached and records that cannot be decoded are skipped, so a
	/// search only fails as a whole when the folder lookup fails.
	pub async fn search(&self, spec: &SearchSpec) -> SearchOutcome {
		let principals = self.locator.resolve_principals(spec);

		if principals.is_empty() {
			tracing::debug!(base = %spec.base, "Search base names no principal.");

			return SearchOutcome::empty(SearchStatus::NoSuchObject);
		}

		let lookup = self.locator.lookup(principals);
		let partitions = match self.backend.lookup_partitions(&lookup).await {
			Ok(partitions) => partitions,
			Err(err) => {
				tracing::warn!(error = %err, base = %spec.base, "Failed to look up address books.");

				return SearchOutcome::empty(SearchStatus::OperationsError);
			},
		};

		if partitions.is_empty() {
			tracing::debug!(principals = ?lookup.principals, "No address book found.");

			return SearchOutcome::empty(SearchStatus::NoSuchObject);
		}

		let size_limit =
			aggregate::effective_size_limit(spec.size_limit, self.cfg.search.max_results);
		let fragment = self.templates.translate(&spec.filter);

		tracing::debug!(
			principals = ?lookup.principals,
			partitions = partitions.len(),
			size_limit,
			fragment = %fragment,
			"Resolved search."
		);

		let mut contacts = Vec::new();

		for partition in &partitions {
			let target = match self.registry.route(partition) {
				Ok(target) => target,
				Err(err) => {
					tracing::warn!(error = %err, "Skipping unroutable address book.");

					continue;
				},
			};
			let constraint = filter::scoped_constraint(&fragment, target.folder_id, size_limit);
			let records = match self.backend.fetch_records(&target, &constraint).await {
				Ok(records) => records,
				Err(err) => {
					tracing::warn!(error = %err, table = %target.table, "Skipping address book.");

					continue;
				},
			};

			for raw in &records {
				match self.extractors.decode_record(raw, &spec.attributes) {
					Ok(Some(contact)) => contacts.push(contact),
					Ok(None) => {},
					Err(err) => {
						tracing::debug!(error = %err, table = %target.table, "Skipping malformed record.");
					},
				}
			}
		}

		let entries =
			aggregate::compose(contacts, spec, self.cfg.search.sort_attributes, size_limit);

		tracing::debug!(entries = entries.len(), "Search finished.");

		SearchOutcome { entries, status: SearchStatus::Success }
	}
}
