use sogodap_storage::{
	location::{BackendLocation, ConnectionIdentity},
	models::Partition,
};

use crate::{Error, Result};

/// Which session a partition query runs on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Connection {
	/// The startup pool, already known to be alive.
	Primary,
	/// A connection opened, pinged, used for one query and closed.
	Transient(ConnectionIdentity),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryTarget {
	pub connection: Connection,
	pub table: String,
	/// Set in combined mode, where one table holds every folder.
	pub folder_id: Option<i64>,
}

/// Routes partitions to tables and decides when the primary pool can be reused.
#[derive(Clone, Debug)]
pub struct ConnectionRegistry {
	primary: ConnectionIdentity,
	store: Option<BackendLocation>,
}
impl ConnectionRegistry {
	pub fn new(primary: ConnectionIdentity, store: Option<BackendLocation>) -> Self {
		Self { primary, store }
	}

	pub fn route(&self, partition: &Partition) -> Result<QueryTarget> {
		match partition {
			Partition::Folder { id } => {
				let store = self.store.as_ref().ok_or_else(|| Error::InvalidLocation {
					message: format!("folder {id} returned without a combined store."),
				})?;

				Ok(QueryTarget {
					connection: self.connection_for(&store.identity),
					table: store.table.clone(),
					folder_id: Some(*id),
				})
			},
			Partition::Location(descriptor) => {
				let location = BackendLocation::parse(descriptor)?;

				Ok(QueryTarget {
					connection: self.connection_for(&location.identity),
					table: location.table,
					folder_id: None,
				})
			},
		}
	}

	fn connection_for(&self, identity: &ConnectionIdentity) -> Connection {
		if *identity == self.primary {
			Connection::Primary
		} else {
			Connection::Transient(identity.clone())
		}
	}
}
