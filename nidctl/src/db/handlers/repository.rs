//! Generic data-access layer for table-backed record types.
//!
//! [`Table`] is a thin repository over a single SQLite table, generic over the
//! [`Record`] type. It provides the common operations — create, point lookup,
//! update, delete, ordered/paginated scans, equality filtering — plus the two
//! validation primitives (relation existence, unique-field collision) that the
//! operation layer runs before mutating writes.
//!
//! Unknown attribute names are handled leniently here: an unknown filter key
//! is dropped with a warning and an unknown ordering column is ignored. The
//! operation layer above re-validates caller-supplied filter keys strictly and
//! fails fast before reaching this layer; both tiers are intentional and other
//! direct callers rely on the lenient one accepting extra, ignorable keys.
//!
//! Each `Table` borrows a `&mut SqliteConnection` for its lifetime, so the
//! caller decides the transaction scope explicitly.

use anyhow::anyhow;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{instrument, warn};

use crate::db::errors::{DbError, Result};
use crate::db::record::{FieldMap, Record, Value};

/// Hard ceiling on the number of rows a single scan can return.
pub const MAX_LIMIT: i64 = 100;

/// An (offset, limit) pagination window. The limit is clamped to
/// [`MAX_LIMIT`]; the offset is floored at zero and otherwise unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    offset: i64,
    limit: i64,
}

impl Page {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, MAX_LIMIT)
    }
}

/// Generic repository for one [`Record`] type.
pub struct Table<'c, R: Record> {
    db: &'c mut SqliteConnection,
    _record: std::marker::PhantomData<R>,
}

impl<'c, R: Record> Table<'c, R> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self {
            db,
            _record: std::marker::PhantomData,
        }
    }

    /// Insert a new row and return the persisted record, primary key
    /// populated by the store. No validation happens here; callers run the
    /// `validate_*` primitives (or their own checks) first.
    #[instrument(skip(self, fields), fields(table = R::TABLE), err)]
    pub async fn create(&mut self, fields: &FieldMap) -> Result<R> {
        if fields.is_empty() {
            let mut query =
                QueryBuilder::new(format!("INSERT INTO {} DEFAULT VALUES RETURNING *", R::TABLE));
            return Ok(query.build_query_as::<R>().fetch_one(&mut *self.db).await?);
        }

        let mut query = QueryBuilder::new(format!("INSERT INTO {} (", R::TABLE));
        for (i, (name, _)) in fields.iter().enumerate() {
            check_identifier(name)?;
            if i > 0 {
                query.push(", ");
            }
            query.push(name);
        }
        query.push(") VALUES (");
        for (i, (_, value)) in fields.iter().enumerate() {
            if i > 0 {
                query.push(", ");
            }
            value.push_bind_to(&mut query);
        }
        query.push(") RETURNING *");

        Ok(query.build_query_as::<R>().fetch_one(&mut *self.db).await?)
    }

    /// Point lookup by primary key.
    #[instrument(skip(self), fields(table = R::TABLE, pk = %pk), err)]
    pub async fn get(&mut self, pk: &R::Id) -> Result<Option<R>> {
        let mut query = QueryBuilder::new(format!(
            "SELECT * FROM {} WHERE {} = ",
            R::TABLE,
            R::PRIMARY_KEY
        ));
        query.push_bind(pk.clone());
        Ok(query.build_query_as::<R>().fetch_optional(&mut *self.db).await?)
    }

    /// Apply field assignments to the row with the given primary key and
    /// return the updated record, or `None` when the key does not resolve.
    /// Missing rows are never created here.
    #[instrument(skip(self, fields), fields(table = R::TABLE, pk = %pk), err)]
    pub async fn update(&mut self, pk: &R::Id, fields: &FieldMap) -> Result<Option<R>> {
        if fields.is_empty() {
            return self.get(pk).await;
        }

        let mut query = QueryBuilder::new(format!("UPDATE {} SET ", R::TABLE));
        for (i, (name, value)) in fields.iter().enumerate() {
            check_identifier(name)?;
            if i > 0 {
                query.push(", ");
            }
            query.push(name);
            query.push(" = ");
            value.push_bind_to(&mut query);
        }
        query.push(format!(" WHERE {} = ", R::PRIMARY_KEY));
        query.push_bind(pk.clone());
        query.push(" RETURNING *");

        Ok(query.build_query_as::<R>().fetch_optional(&mut *self.db).await?)
    }

    /// Delete the row with the given primary key. Returns `false` only when
    /// the key does not resolve to a row.
    #[instrument(skip(self), fields(table = R::TABLE, pk = %pk), err)]
    pub async fn delete(&mut self, pk: &R::Id) -> Result<bool> {
        let mut query = QueryBuilder::new(format!(
            "DELETE FROM {} WHERE {} = ",
            R::TABLE,
            R::PRIMARY_KEY
        ));
        query.push_bind(pk.clone());
        let result = query.build().execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Full scan with pagination and optional ordering.
    #[instrument(skip(self), fields(table = R::TABLE), err)]
    pub async fn all(&mut self, page: &Page, order_by: Option<&str>) -> Result<Vec<R>> {
        self.filter(page, order_by, &FieldMap::new()).await
    }

    /// Paginated scan constrained to exact equality on every listed field
    /// (AND-combined). A key that is not a column of this record type is
    /// dropped with a warning; a null value compiles to `IS NULL`.
    #[instrument(skip(self, filters), fields(table = R::TABLE), err)]
    pub async fn filter(
        &mut self,
        page: &Page,
        order_by: Option<&str>,
        filters: &FieldMap,
    ) -> Result<Vec<R>> {
        let mut query = QueryBuilder::new(format!("SELECT * FROM {}", R::TABLE));
        push_filters::<R>(&mut query, filters);
        push_ordering::<R>(&mut query, order_by);
        query.push(" LIMIT ");
        query.push_bind(page.limit());
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        Ok(query.build_query_as::<R>().fetch_all(&mut *self.db).await?)
    }

    /// First row matching the filters, in store-defined order.
    #[instrument(skip(self, filters), fields(table = R::TABLE), err)]
    pub async fn first(&mut self, filters: &FieldMap) -> Result<Option<R>> {
        let mut query = QueryBuilder::new(format!("SELECT * FROM {}", R::TABLE));
        push_filters::<R>(&mut query, filters);
        query.push(" LIMIT 1");
        Ok(query.build_query_as::<R>().fetch_optional(&mut *self.db).await?)
    }

    /// Total number of rows in the table.
    #[instrument(skip(self), fields(table = R::TABLE), err)]
    pub async fn count(&mut self) -> Result<i64> {
        let mut query = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Whether any row matches the filters.
    #[instrument(skip(self, filters), fields(table = R::TABLE), err)]
    pub async fn exists(&mut self, filters: &FieldMap) -> Result<bool> {
        Ok(self.first(filters).await?.is_some())
    }

    /// Check every foreign-key relation of this record type against the
    /// candidate payload: the local column must be present with a non-null
    /// value, and the referenced row must exist.
    #[instrument(skip(self, fields), fields(table = R::TABLE), err)]
    pub async fn validate_relations(&mut self, fields: &FieldMap) -> Result<()> {
        for field in R::fields() {
            let Some(reference) = field.references else {
                continue;
            };
            if field.name == R::PRIMARY_KEY {
                continue;
            }

            let value = match fields.get(field.name) {
                None | Some(Value::Null) => {
                    return Err(DbError::ForeignKeyViolation {
                        column: Some(field.name.to_string()),
                        message: format!("key '{}' not found in provided body", field.name),
                    });
                }
                Some(value) => value,
            };

            let mut query = QueryBuilder::new(format!(
                "SELECT 1 FROM {} WHERE {} = ",
                reference.table, reference.column
            ));
            value.push_bind_to(&mut query);
            if query.build().fetch_optional(&mut *self.db).await?.is_none() {
                return Err(DbError::ForeignKeyViolation {
                    column: Some(field.name.to_string()),
                    message: format!(
                        "{} with {} = '{}' does not exist",
                        reference.table, reference.column, value
                    ),
                });
            }
        }
        Ok(())
    }

    /// Reject payloads that set the primary key, and check every unique
    /// column of the payload for a collision with an existing row.
    ///
    /// The check-then-insert window is not atomic against concurrent writers;
    /// the store's own UNIQUE constraint is the last line of defense and
    /// surfaces the same [`DbError::UniqueViolation`].
    #[instrument(skip(self, fields), fields(table = R::TABLE), err)]
    pub async fn validate_unique_fields(&mut self, fields: &FieldMap) -> Result<()> {
        if fields.contains(R::PRIMARY_KEY) {
            return Err(DbError::PrimaryKeyImmutable {
                column: R::PRIMARY_KEY.to_string(),
            });
        }

        for field in R::fields().iter().filter(|f| f.unique) {
            let Some(value) = fields.get(field.name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let mut probe = FieldMap::new();
            probe.set(field.name, value.clone());
            if self.exists(&probe).await? {
                return Err(DbError::UniqueViolation {
                    column: Some(field.name.to_string()),
                    value: Some(value.to_string()),
                    message: format!("'{}' with value '{value}' already exists", field.name),
                });
            }
        }
        Ok(())
    }
}

/// Append `WHERE`/`AND` equality conditions for every known filter key.
/// Column names are only interpolated after a registry hit, so no
/// caller-controlled identifier ever reaches the SQL text.
fn push_filters<'args, R: Record>(query: &mut QueryBuilder<'args, Sqlite>, filters: &FieldMap) {
    let mut first = true;
    for (name, value) in filters.iter() {
        let Some(field) = R::field(name) else {
            warn!(table = R::TABLE, field = name, "dropping filter on unknown field");
            continue;
        };
        query.push(if first { " WHERE " } else { " AND " });
        first = false;
        query.push(field.name);
        if value.is_null() {
            query.push(" IS NULL");
        } else {
            query.push(" = ");
            value.push_bind_to(query);
        }
    }
}

/// Append an `ORDER BY` clause. A leading `-` means descending; an unknown
/// column leaves the scan unordered.
fn push_ordering<'args, R: Record>(query: &mut QueryBuilder<'args, Sqlite>, order_by: Option<&str>) {
    let Some(raw) = order_by else {
        return;
    };
    let (column, descending) = match raw.strip_prefix('-') {
        Some(column) => (column, true),
        None => (raw, false),
    };
    let Some(field) = R::field(column) else {
        return;
    };
    query.push(" ORDER BY ");
    query.push(field.name);
    if descending {
        query.push(" DESC");
    }
}

fn check_identifier(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(DbError::Other(anyhow!("invalid column name '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::db::models::clients::Client;
    use crate::db::models::usage::ApiUsage;
    use crate::db::record::Value;
    use chrono::Utc;
    use sqlx::SqlitePool;

    fn client_fields(name: &str) -> FieldMap {
        FieldMap::new()
            .with("name", name)
            .with("api_key", format!("sk-test-{name}"))
            .with("created_at", Utc::now())
    }

    #[test]
    fn page_clamps_limit_and_floors_offset() {
        assert_eq!(Page::new(0, 500).limit(), MAX_LIMIT);
        assert_eq!(Page::new(0, 0).limit(), 1);
        assert_eq!(Page::new(-5, 10).offset(), 0);
        assert_eq!(Page::new(7, 10).offset(), 7);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn create_and_get_round_trip(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut table = Table::<Client>::new(&mut conn);

        let created = table.create(&client_fields("svc-a")).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.name, "svc-a");
        assert_eq!(created.description, None);

        let fetched = table.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, created.name);
        assert_eq!(fetched.api_key, created.api_key);

        assert!(table.get(&9999).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn update_applies_fields_and_reports_missing_keys(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut table = Table::<Client>::new(&mut conn);
        let created = table.create(&client_fields("svc-a")).await.unwrap();

        let mut changes = FieldMap::new();
        changes.set("description", "updated");
        let updated = table.update(&created.id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.description.as_deref(), Some("updated"));
        assert_eq!(updated.name, "svc-a");

        // Missing primary key: no row, no creation-on-missing
        assert!(table.update(&9999, &changes).await.unwrap().is_none());

        // An empty assignment set degrades to a point lookup
        let unchanged = table
            .update(&created.id, &FieldMap::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.description.as_deref(), Some("updated"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn delete_is_false_only_for_unresolved_keys(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut table = Table::<Client>::new(&mut conn);
        let created = table.create(&client_fields("svc-a")).await.unwrap();

        assert!(table.delete(&created.id).await.unwrap());
        assert!(!table.delete(&created.id).await.unwrap());
        assert!(!table.delete(&9999).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn scans_paginate_and_order(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut table = Table::<Client>::new(&mut conn);
        for name in ["svc-a", "svc-b", "svc-c"] {
            table.create(&client_fields(name)).await.unwrap();
        }

        let page = table.all(&Page::new(0, 2), Some("name")).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "svc-a");

        let descending = table.all(&Page::default(), Some("-name")).await.unwrap();
        assert_eq!(descending[0].name, "svc-c");

        // Offset past the record count is an empty result, not an error
        let beyond = table.all(&Page::new(99, 10), None).await.unwrap();
        assert!(beyond.is_empty());

        // Ordering by an unknown column is ignored
        let unordered = table.all(&Page::default(), Some("bogus")).await.unwrap();
        assert_eq!(unordered.len(), 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn filter_narrows_and_drops_unknown_keys(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut table = Table::<Client>::new(&mut conn);
        table.create(&client_fields("svc-a")).await.unwrap();
        table
            .create(&client_fields("svc-b").with("description", "described"))
            .await
            .unwrap();

        let mut by_name = FieldMap::new();
        by_name.set("name", "svc-a");
        let matched = table.filter(&Page::default(), None, &by_name).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "svc-a");

        // Unknown keys are dropped, leaving the scan unconstrained
        let mut bogus = FieldMap::new();
        bogus.set("bogus", "x");
        let all = table.filter(&Page::default(), None, &bogus).await.unwrap();
        assert_eq!(all.len(), 2);

        // Null filters match IS NULL
        let mut undescribed = FieldMap::new();
        undescribed.set("description", Value::Null);
        let nulls = table
            .filter(&Page::default(), None, &undescribed)
            .await
            .unwrap();
        assert_eq!(nulls.len(), 1);
        assert_eq!(nulls[0].name, "svc-a");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn first_exists_and_count(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut table = Table::<Client>::new(&mut conn);
        table.create(&client_fields("svc-a")).await.unwrap();
        table.create(&client_fields("svc-b")).await.unwrap();

        let mut by_name = FieldMap::new();
        by_name.set("name", "svc-b");
        assert_eq!(table.first(&by_name).await.unwrap().unwrap().name, "svc-b");
        assert!(table.exists(&by_name).await.unwrap());

        by_name.set("name", "svc-z");
        assert!(table.first(&by_name).await.unwrap().is_none());
        assert!(!table.exists(&by_name).await.unwrap());

        assert_eq!(table.count().await.unwrap(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn relation_validation_requires_an_existing_target(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let client = Table::<Client>::new(&mut conn)
            .create(&client_fields("svc-a"))
            .await
            .unwrap();

        let mut usage = Table::<ApiUsage>::new(&mut conn);

        let valid = FieldMap::new().with("client_id", client.id);
        usage.validate_relations(&valid).await.unwrap();

        let missing = FieldMap::new().with("path", "/clients");
        let err = usage.validate_relations(&missing).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let dangling = FieldMap::new().with("client_id", 9999i64);
        let err = usage.validate_relations(&dangling).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn unique_validation_rejects_collisions_and_pk_writes(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut table = Table::<Client>::new(&mut conn);
        table.create(&client_fields("svc-a")).await.unwrap();

        let pk_write = FieldMap::new().with("id", 7i64);
        let err = table.validate_unique_fields(&pk_write).await.unwrap_err();
        assert!(matches!(err, DbError::PrimaryKeyImmutable { .. }));

        let duplicate = FieldMap::new().with("name", "svc-a");
        let err = table.validate_unique_fields(&duplicate).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { column: Some(ref c), .. } if c == "name"
        ));

        let fresh = FieldMap::new().with("name", "svc-b");
        table.validate_unique_fields(&fresh).await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn store_constraint_backstops_the_uniqueness_race(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut table = Table::<Client>::new(&mut conn);
        table.create(&client_fields("svc-a")).await.unwrap();

        // Insert without pre-validation, as a racing writer would
        let err = table.create(&client_fields("svc-a")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
