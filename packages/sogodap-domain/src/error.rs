pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid filter at offset {position}: {message}")]
	FilterSyntax { position: usize, message: String },
	#[error("Invalid vCard: {message}")]
	Vcard { message: String },
}
