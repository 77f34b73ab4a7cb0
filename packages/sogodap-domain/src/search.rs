use crate::FilterExpr;

const PRINCIPAL_PREFIX: &str = "uid=";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
	BaseObject,
	SingleLevel,
	WholeSubtree,
}

/// One search request as handed over by the protocol adapter.
#[derive(Clone, Debug)]
pub struct SearchSpec {
	/// Base DN naming the principal, e.g. `uid=alice`.
	pub base: String,
	pub scope: Scope,
	pub filter: FilterExpr,
	/// Zero means the client did not ask for a limit.
	pub size_limit: u32,
	pub attributes: Vec<String>,
}
impl SearchSpec {
	pub fn is_subtree(&self) -> bool {
		self.scope == Scope::WholeSubtree
	}

	/// The principal named by the first RDN of the base DN, without the `uid=` prefix.
	pub fn principal(&self) -> &str {
		let base = self.base.trim();
		let rdn = base.split(',').next().unwrap_or_default().trim();

		match rdn.get(..PRINCIPAL_PREFIX.len()) {
			Some(prefix) if prefix.eq_ignore_ascii_case(PRINCIPAL_PREFIX) =>
				rdn[PRINCIPAL_PREFIX.len()..].trim(),
			_ => rdn,
		}
	}
}
