mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	Connection, Executor,
	mysql::{MySqlConnectOptions, MySqlConnection},
};
use tokio::runtime::Builder;
use url::Url;
use uuid::Uuid;

pub const FOLDER_INFO_TABLE: &str = "sogo_folder_info";
pub const STORE_TABLE: &str = "sogo_store";

const FOLDER_INFO_SCHEMA: &str = "\
CREATE TABLE sogo_folder_info (
	c_folder_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
	c_path VARCHAR(255) NOT NULL,
	c_path1 VARCHAR(255) NOT NULL,
	c_path2 VARCHAR(255) NULL,
	c_path3 VARCHAR(255) NULL,
	c_path4 VARCHAR(255) NULL,
	c_foldername VARCHAR(255) NOT NULL,
	c_location VARCHAR(2048) NULL,
	c_folder_type VARCHAR(255) NOT NULL
)";
const STORE_SCHEMA: &str = "\
CREATE TABLE sogo_store (
	c_folder_id INT NOT NULL,
	c_name VARCHAR(255) NOT NULL,
	c_content MEDIUMTEXT NOT NULL,
	c_creationdate INT NOT NULL DEFAULT 0,
	c_lastmodified INT NOT NULL DEFAULT 0,
	c_version INT NOT NULL DEFAULT 0,
	c_deleted INT NULL,
	PRIMARY KEY (c_folder_id, c_name)
)";

/// A disposable database laid out like a SOGo backend.
pub struct TestDatabase {
	name: String,
	base_url: Url,
	admin_options: MySqlConnectOptions,
	options: MySqlConnectOptions,
	cleaned: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_url = Url::parse(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse SOGODAP_MYSQL_DSN: {err}.")))?;
		let admin_options = MySqlConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse SOGODAP_MYSQL_DSN: {err}.")))?;
		let name = format!("sogodap_test_{}", Uuid::new_v4().simple());
		let mut admin_conn = MySqlConnection::connect_with(&admin_options)
			.await
			.map_err(|err| Error::Message(format!("Failed to connect to MySQL: {err}.")))?;

		admin_conn
			.execute(format!("CREATE DATABASE `{name}`").as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		let options = admin_options.clone().database(&name);
		let db = Self { name, base_url, admin_options, options, cleaned: false };
		let mut conn = db.connect().await?;

		conn.execute(FOLDER_INFO_SCHEMA).await?;
		conn.execute(STORE_SCHEMA).await?;
		conn.close().await?;

		Ok(db)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// A backend descriptor pointing at `table` inside this database.
	pub fn location(&self, table: &str) -> String {
		let mut url = self.base_url.clone();

		url.set_path(&format!("/{}/{table}", self.name));

		url.to_string()
	}

	pub async fn connect(&self) -> Result<MySqlConnection> {
		Ok(MySqlConnection::connect_with(&self.options).await?)
	}

	/// Registers a contact folder and returns its id.
	pub async fn add_folder(&self, principal: &str, location: Option<&str>) -> Result<i64> {
		let mut conn = self.connect().await?;
		let result = sqlx::query(
			"\
INSERT INTO sogo_folder_info (c_path, c_path1, c_path2, c_path3, c_path4, c_foldername, c_location, c_folder_type)
VALUES (?, 'Users', ?, 'Contacts', 'personal', 'Personal Address Book', ?, 'Contact')",
		)
		.bind(format!("/Users/{principal}/Contacts/personal"))
		.bind(principal)
		.bind(location)
		.execute(&mut conn)
		.await?;

		Ok(result.last_insert_id() as i64)
	}

	pub async fn add_store_record(
		&self,
		folder_id: i64,
		name: &str,
		content: &str,
		deleted: bool,
	) -> Result<()> {
		let mut conn = self.connect().await?;

		sqlx::query(
			"INSERT INTO sogo_store (c_folder_id, c_name, c_content, c_deleted) VALUES (?, ?, ?, ?)",
		)
		.bind(folder_id)
		.bind(name)
		.bind(content)
		.bind(deleted.then_some(1_i32))
		.execute(&mut conn)
		.await?;

		Ok(())
	}

	/// Creates a per-folder contact table as used by distributed stores.
	pub async fn create_contact_table(&self, table: &str) -> Result<()> {
		let mut conn = self.connect().await?;
		let sql = format!(
			"\
CREATE TABLE `{table}` (
	c_name VARCHAR(255) NOT NULL PRIMARY KEY,
	c_content MEDIUMTEXT NOT NULL,
	c_deleted INT NULL
)"
		);

		conn.execute(sql.as_str()).await?;

		Ok(())
	}

	pub async fn add_table_record(&self, table: &str, name: &str, content: &str) -> Result<()> {
		let mut conn = self.connect().await?;
		let sql = format!("INSERT INTO `{table}` (c_name, c_content) VALUES (?, ?)");

		sqlx::query(&sql).bind(name).bind(content).execute(&mut conn).await?;

		Ok(())
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner().await
	}

	async fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		cleanup_database(&self.name, &self.admin_options).await?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test database cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(cleanup_database(&name, &admin_options)) {
				eprintln!("Test database cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var("SOGODAP_MYSQL_DSN").ok()
}

async fn cleanup_database(name: &str, admin_options: &MySqlConnectOptions) -> Result<()> {
	let mut conn = MySqlConnection::connect_with(admin_options).await.map_err(|err| {
		Error::Message(format!("Failed to connect to MySQL for cleanup: {err}."))
	})?;

	conn.execute(format!("DROP DATABASE IF EXISTS `{name}`").as_str())
		.await
		.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}
