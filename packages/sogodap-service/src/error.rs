pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid backend location: {message}")]
	InvalidLocation { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sogodap_storage::Error> for Error {
	fn from(err: sogodap_storage::Error) -> Self {
		match err {
			sogodap_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			sogodap_storage::Error::InvalidLocation { location, message } =>
				Self::InvalidLocation { message: format!("{location}: {message}") },
			sogodap_storage::Error::Decode(message) => Self::Storage { message },
		}
	}
}
