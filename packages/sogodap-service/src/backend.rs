use sogodap_storage::{
	db::{Db, TransientConnection},
	models::Partition,
	queries,
};

use crate::{
	AddressBookBackend, BoxFuture, Result, locator::PartitionLookup,
	registry::{Connection, QueryTarget},
};

/// Reads SOGo tables over MySQL, reusing the primary pool where the registry allows.
pub struct SqlBackend {
	db: Db,
}
impl SqlBackend {
	pub fn new(db: Db) -> Self {
		Self { db }
	}

	async fn lookup(&self, lookup: &PartitionLookup) -> Result<Vec<Partition>> {
		let rows = queries::lookup_partitions(
			&self.db.pool,
			lookup.column,
			&lookup.table,
			&lookup.principals,
		)
		.await?;

		Ok(keep_decoded(rows, lookup.column.as_str()))
	}

	async fn fetch(&self, target: &QueryTarget, constraint: &str) -> Result<Vec<String>> {
		let rows = match &target.connection {
			Connection::Primary =>
				queries::fetch_contents(&self.db.pool, &target.table, constraint).await?,
			Connection::Transient(identity) => {
				let mut conn = TransientConnection::open(identity).await?;
				let rows =
					queries::fetch_contents(conn.connection(), &target.table, constraint).await;

				if let Err(err) = conn.close().await {
					tracing::debug!(error = %err, %identity, "Failed to close transient connection.");
				}

				rows?
			},
		};

		Ok(keep_decoded(rows, "c_content"))
	}
}
impl AddressBookBackend for SqlBackend {
	fn lookup_partitions<'a>(
		&'a self,
		lookup: &'a PartitionLookup,
	) -> BoxFuture<'a, Result<Vec<Partition>>> {
		Box::pin(self.lookup(lookup))
	}

	fn fetch_records<'a>(
		&'a self,
		target: &'a QueryTarget,
		constraint: &'a str,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(self.fetch(target, constraint))
	}
}

fn keep_decoded<T>(rows: Vec<sogodap_storage::Result<T>>, column: &str) -> Vec<T> {
	rows.into_iter()
		.filter_map(|row| match row {
			Ok(value) => Some(value),
			Err(err) => {
				tracing::debug!(error = %err, column, "Skipping undecodable row.");

				None
			},
		})
		.collect()
}
