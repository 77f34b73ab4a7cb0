use sqlx::{Executor, MySql, Row};

use crate::{
	Error, Result,
	models::{Partition, PartitionColumn},
};

/// Renders the folder lookup with one placeholder per principal.
pub fn partition_lookup_sql(column: PartitionColumn, table: &str, principals: usize) -> String {
	let placeholders = vec!["?"; principals].join(", ");

	format!(
		"select {} from {table} where c_folder_type = 'Contact' and c_path2 in ({placeholders})",
		column.as_str()
	)
}

/// `constraint` is appended verbatim and must already start with a space when non-empty.
pub fn contents_sql(table: &str, constraint: &str) -> String {
	format!("select c_content from {table} where c_deleted is null{constraint}")
}

/// Returns one entry per row; rows whose column cannot be decoded come back as errors.
pub async fn lookup_partitions<'e, E>(
	executor: E,
	column: PartitionColumn,
	table: &str,
	principals: &[String],
) -> Result<Vec<Result<Partition>>>
where
	E: Executor<'e, Database = MySql>,
{
	if principals.is_empty() {
		return Ok(Vec::new());
	}

	let sql = partition_lookup_sql(column, table, principals.len());
	let mut query = sqlx::query(&sql);

	for principal in principals {
		query = query.bind(principal.as_str());
	}

	let rows = query.fetch_all(executor).await?;

	Ok(rows
		.iter()
		.map(|row| match column {
			PartitionColumn::FolderId => row
				.try_get::<i64, _>(0)
				.map(|id| Partition::Folder { id })
				.map_err(|err| Error::Decode(format!("c_folder_id: {err}"))),
			PartitionColumn::Location => row
				.try_get::<String, _>(0)
				.map(Partition::Location)
				.map_err(|err| Error::Decode(format!("c_location: {err}"))),
		})
		.collect())
}

/// Returns the raw vCard text of every live record matching `constraint`.
pub async fn fetch_contents<'e, E>(
	executor: E,
	table: &str,
	constraint: &str,
) -> Result<Vec<Result<String>>>
where
	E: Executor<'e, Database = MySql>,
{
	let sql = contents_sql(table, constraint);
	let rows = sqlx::query(&sql).fetch_all(executor).await?;

	Ok(rows
		.iter()
		.map(|row| {
			row.try_get::<String, _>(0).map_err(|err| Error::Decode(format!("c_content: {err}")))
		})
		.collect())
}
