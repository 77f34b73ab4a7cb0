/// One address book a principal can see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Partition {
	/// A folder inside the combined store, scoped with `c_folder_id = <id>`.
	Folder { id: i64 },
	/// A backend URL naming the table that holds one address book.
	Location(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionColumn {
	FolderId,
	Location,
}
impl PartitionColumn {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::FolderId => "c_folder_id",
			Self::Location => "c_location",
		}
	}
}
