use sogodap_config::Auth;

use crate::DirectoryService;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindOutcome {
	Success,
	InvalidCredentials,
}

/// Checks simple binds against the single configured credential.
///
/// An anonymous bind only succeeds when no credential is configured.
#[derive(Clone, Debug)]
pub struct BindAuthenticator {
	user: String,
	password: String,
}
impl BindAuthenticator {
	pub fn new(auth: &Auth) -> Self {
		Self { user: auth.user.clone(), password: auth.password.clone() }
	}

	pub fn authenticate(&self, dn: &str, password: &str) -> BindOutcome {
		if dn == self.user && password == self.password {
			BindOutcome::Success
		} else {
			BindOutcome::InvalidCredentials
		}
	}
}

impl DirectoryService {
	pub fn bind(&self, dn: &str, password: &str) -> BindOutcome {
		let outcome = self.authenticator.authenticate(dn, password);

		if outcome == BindOutcome::InvalidCredentials {
			tracing::info!(dn, "Rejected bind with invalid credentials.");
		}

		outcome
	}
}
