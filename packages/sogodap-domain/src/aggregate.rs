use std::cmp::Ordering;

use crate::{Contact, SearchSpec};

/// A protocol-neutral search result entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputEntry {
	pub dn: String,
	/// Requested attribute names paired with their decoded value, in request order.
	pub attributes: Vec<(String, String)>,
}

/// A zero or over-large request falls back to the configured maximum.
pub fn effective_size_limit(requested: u32, max: u32) -> u32 {
	if requested == 0 || requested > max { max } else { requested }
}

pub fn effective_sort_depth(configured: u32, width: usize) -> usize {
	(configured as usize).min(width)
}

/// Stable ordering over the first `depth` values; equal prefixes keep their input order.
pub fn sort_contacts(contacts: &mut [Contact], depth: usize) {
	if depth == 0 {
		return;
	}

	contacts.sort_by(|lhs, rhs| compare_prefix(lhs.values(), rhs.values(), depth));
}

/// Sorts, truncates and maps the merged contacts of one search.
pub fn compose(
	mut contacts: Vec<Contact>,
	spec: &SearchSpec,
	sort_attributes: u32,
	size_limit: u32,
) -> Vec<OutputEntry> {
	sort_contacts(&mut contacts, effective_sort_depth(sort_attributes, spec.attributes.len()));
	contacts.truncate(size_limit as usize);

	contacts
		.into_iter()
		.enumerate()
		.map(|(idx, contact)| OutputEntry {
			dn: entry_dn(idx, &spec.base),
			attributes: spec.attributes.iter().cloned().zip(contact.into_values()).collect(),
		})
		.collect()
}

pub fn entry_dn(index: usize, base: &str) -> String {
	format!("cn={index},{base}")
}

fn compare_prefix(lhs: &[String], rhs: &[String], depth: usize) -> Ordering {
	lhs.iter()
		.zip(rhs.iter())
		.take(depth)
		.map(|(l, r)| l.cmp(r))
		.find(|ordering| ordering.is_ne())
		.unwrap_or(Ordering::Equal)
}
