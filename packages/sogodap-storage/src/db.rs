use sqlx::{
	Connection, MySqlConnection, MySqlPool,
	mysql::MySqlPoolOptions,
};

use crate::{Result, location::ConnectionIdentity};

/// The long-lived pool for the backend named by the folder-info descriptor.
pub struct Db {
	pub pool: MySqlPool,
}
impl Db {
	/// Connects and pings once, so an unreachable backend fails at startup.
	pub async fn connect(identity: &ConnectionIdentity, max_conns: u32) -> Result<Self> {
		let pool = MySqlPoolOptions::new()
			.max_connections(max_conns)
			.connect_with(identity.connect_options())
			.await?;
		let db = Self { pool };

		db.ping().await?;

		Ok(db)
	}

	pub async fn ping(&self) -> Result<()> {
		let mut conn = self.pool.acquire().await?;

		conn.ping().await?;

		Ok(())
	}
}

/// A single connection opened for one query against a secondary backend.
pub struct TransientConnection {
	conn: MySqlConnection,
}
impl TransientConnection {
	pub async fn open(identity: &ConnectionIdentity) -> Result<Self> {
		let mut conn = MySqlConnection::connect_with(&identity.connect_options()).await?;

		conn.ping().await?;

		Ok(Self { conn })
	}

	pub fn connection(&mut self) -> &mut MySqlConnection {
		&mut self.conn
	}

	pub async fn close(self) -> Result<()> {
		self.conn.close().await?;

		Ok(())
	}
}
