#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid backend location {location:?}: {message}")]
	InvalidLocation { location: String, message: String },
	#[error("Unexpected column value: {0}")]
	Decode(String),
}
