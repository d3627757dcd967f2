//! Lifecycle pipelines for resource operations.
//!
//! [`Lifecycle`] turns a [`Record`] type and an output projection into the six
//! resource verbs — create, retrieve, list, filter, update, delete — each a
//! fixed pipeline of validate → pre-hook → core action → post-hook → project.
//!
//! Hooks are optional callbacks supplied at construction time; a concrete
//! service configures only the stages it needs (for example injecting a
//! generated secret before insert) and the pipeline runs every stage in order
//! regardless, so the contract stays stable whichever hooks are present.
//! Hooks are synchronous; anything that needs the store belongs in the
//! handler around the pipeline.
//!
//! Filter-key validation is strict here: a caller-supplied key that is not a
//! column of the record type aborts with a 4xx before the repository is
//! touched. The repository's own filter is deliberately lenient (it drops
//! unknown keys with a warning); keep the asymmetry — direct repository
//! callers rely on it.
//!
//! Validation always precedes the mutating step, so a failed relation,
//! uniqueness, or filter-key check leaves the store untouched.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::db::handlers::repository::{Page, Table};
use crate::db::record::{FieldMap, Record, Value};
use crate::errors::{Error, Result};

/// Pagination and ordering for list/filter scans.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Page,
    pub order_by: Option<String>,
}

/// Outcome of the delete verb. Deleting an absent key is not an error; it
/// reports `deleted: false`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct Deleted {
    pub deleted: bool,
}

type ValidateHook = Box<dyn Fn(&FieldMap) -> Result<()> + Send + Sync>;
type PayloadHook = Box<dyn Fn(&mut FieldMap) + Send + Sync>;
type ParamsValidateHook = Box<dyn Fn(&ListParams) -> Result<()> + Send + Sync>;
type ParamsHook = Box<dyn Fn(&mut ListParams) + Send + Sync>;
type IdHook<Id> = Box<dyn Fn(&Id) + Send + Sync>;
type RecordHook<R> = Box<dyn Fn(&R) + Send + Sync>;
type BatchHook<R> = Box<dyn Fn(&[R]) + Send + Sync>;
type DeleteHook<Id> = Box<dyn Fn(&Id, bool) + Send + Sync>;

/// Verb pipelines over a record type `R`, projecting results to `Out`.
pub struct Lifecycle<R: Record, Out> {
    validate_writes: bool,
    validate_create: Option<ValidateHook>,
    pre_create: Option<PayloadHook>,
    on_create: Option<RecordHook<R>>,
    pre_retrieve: Option<IdHook<R::Id>>,
    on_retrieve: Option<RecordHook<R>>,
    validate_list: Option<ParamsValidateHook>,
    pre_list: Option<ParamsHook>,
    on_list: Option<BatchHook<R>>,
    pre_filter: Option<PayloadHook>,
    on_filter: Option<BatchHook<R>>,
    validate_update: Option<ValidateHook>,
    pre_update: Option<PayloadHook>,
    on_update: Option<RecordHook<R>>,
    pre_delete: Option<IdHook<R::Id>>,
    on_delete: Option<DeleteHook<R::Id>>,
    _out: std::marker::PhantomData<fn() -> Out>,
}

impl<R: Record, Out: From<R>> Default for Lifecycle<R, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record, Out: From<R>> Lifecycle<R, Out> {
    pub fn new() -> Self {
        Self {
            validate_writes: true,
            validate_create: None,
            pre_create: None,
            on_create: None,
            pre_retrieve: None,
            on_retrieve: None,
            validate_list: None,
            pre_list: None,
            on_list: None,
            pre_filter: None,
            on_filter: None,
            validate_update: None,
            pre_update: None,
            on_update: None,
            pre_delete: None,
            on_delete: None,
            _out: std::marker::PhantomData,
        }
    }

    /// Suppress the default relation and uniqueness validation on create and
    /// update. For resources that genuinely need no such checks — e.g. usage
    /// rows whose relation is nullable by design.
    pub fn without_write_validation(mut self) -> Self {
        self.validate_writes = false;
        self
    }

    pub fn validate_create(
        mut self,
        hook: impl Fn(&FieldMap) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validate_create = Some(Box::new(hook));
        self
    }

    pub fn pre_create(mut self, hook: impl Fn(&mut FieldMap) + Send + Sync + 'static) -> Self {
        self.pre_create = Some(Box::new(hook));
        self
    }

    pub fn on_create(mut self, hook: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.on_create = Some(Box::new(hook));
        self
    }

    pub fn pre_retrieve(mut self, hook: impl Fn(&R::Id) + Send + Sync + 'static) -> Self {
        self.pre_retrieve = Some(Box::new(hook));
        self
    }

    pub fn on_retrieve(mut self, hook: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.on_retrieve = Some(Box::new(hook));
        self
    }

    pub fn validate_list(
        mut self,
        hook: impl Fn(&ListParams) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validate_list = Some(Box::new(hook));
        self
    }

    pub fn pre_list(mut self, hook: impl Fn(&mut ListParams) + Send + Sync + 'static) -> Self {
        self.pre_list = Some(Box::new(hook));
        self
    }

    pub fn on_list(mut self, hook: impl Fn(&[R]) + Send + Sync + 'static) -> Self {
        self.on_list = Some(Box::new(hook));
        self
    }

    pub fn pre_filter(mut self, hook: impl Fn(&mut FieldMap) + Send + Sync + 'static) -> Self {
        self.pre_filter = Some(Box::new(hook));
        self
    }

    pub fn on_filter(mut self, hook: impl Fn(&[R]) + Send + Sync + 'static) -> Self {
        self.on_filter = Some(Box::new(hook));
        self
    }

    pub fn validate_update(
        mut self,
        hook: impl Fn(&FieldMap) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validate_update = Some(Box::new(hook));
        self
    }

    pub fn pre_update(mut self, hook: impl Fn(&mut FieldMap) + Send + Sync + 'static) -> Self {
        self.pre_update = Some(Box::new(hook));
        self
    }

    pub fn on_update(mut self, hook: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }

    pub fn pre_delete(mut self, hook: impl Fn(&R::Id) + Send + Sync + 'static) -> Self {
        self.pre_delete = Some(Box::new(hook));
        self
    }

    pub fn on_delete(mut self, hook: impl Fn(&R::Id, bool) + Send + Sync + 'static) -> Self {
        self.on_delete = Some(Box::new(hook));
        self
    }

    /// Create: validate (relations + uniqueness, then the custom hook) →
    /// strip nulls → pre-hook → insert → post-hook → project.
    pub async fn create(&self, db: &mut SqliteConnection, mut payload: FieldMap) -> Result<Out> {
        if self.validate_writes {
            let mut table = Table::<R>::new(&mut *db);
            table.validate_relations(&payload).await?;
            table.validate_unique_fields(&payload).await?;
        }
        if let Some(validate) = &self.validate_create {
            validate(&payload)?;
        }
        payload.strip_nulls();
        if let Some(pre) = &self.pre_create {
            pre(&mut payload);
        }
        let record = Table::<R>::new(&mut *db).create(&payload).await?;
        if let Some(on) = &self.on_create {
            on(&record);
        }
        Ok(Out::from(record))
    }

    /// Retrieve: pre-hook → load by pk → absent fails → post-hook → project.
    pub async fn retrieve(&self, db: &mut SqliteConnection, pk: R::Id) -> Result<Out> {
        if let Some(pre) = &self.pre_retrieve {
            pre(&pk);
        }
        let record = Table::<R>::new(&mut *db)
            .get(&pk)
            .await?
            .ok_or_else(|| Error::NotFound {
                resource: R::TABLE.to_string(),
                id: pk.to_string(),
            })?;
        if let Some(on) = &self.on_retrieve {
            on(&record);
        }
        Ok(Out::from(record))
    }

    /// List: validate params → pre-hook → paginated/ordered scan (tombstoned
    /// rows excluded when the type declares a tombstone) → post-hook →
    /// project each.
    pub async fn list(&self, db: &mut SqliteConnection, mut params: ListParams) -> Result<Vec<Out>> {
        if let Some(validate) = &self.validate_list {
            validate(&params)?;
        }
        if let Some(pre) = &self.pre_list {
            pre(&mut params);
        }
        let mut filters = FieldMap::new();
        if let Some(tombstone) = R::tombstone() {
            filters.set(tombstone, Value::Null);
        }
        let records = Table::<R>::new(&mut *db)
            .filter(&params.page, params.order_by.as_deref(), &filters)
            .await?;
        if let Some(on) = &self.on_list {
            on(&records);
        }
        Ok(records.into_iter().map(Out::from).collect())
    }

    /// Filter: inject tombstone exclusion → reject any filter key that is
    /// not a column of `R` → pre-hook → scan → post-hook → project each.
    pub async fn filter(
        &self,
        db: &mut SqliteConnection,
        mut filters: FieldMap,
        params: ListParams,
    ) -> Result<Vec<Out>> {
        if let Some(tombstone) = R::tombstone() {
            filters.set(tombstone, Value::Null);
        }
        for (name, _) in filters.iter() {
            if R::field(name).is_none() {
                return Err(Error::BadRequest {
                    message: format!("Invalid filter field: {name}"),
                });
            }
        }
        if let Some(pre) = &self.pre_filter {
            pre(&mut filters);
        }
        let records = Table::<R>::new(&mut *db)
            .filter(&params.page, params.order_by.as_deref(), &filters)
            .await?;
        if let Some(on) = &self.on_filter {
            on(&records);
        }
        Ok(records.into_iter().map(Out::from).collect())
    }

    /// Filter from a raw parameter set: null-valued entries are stripped
    /// before the strict filter runs.
    pub async fn filter_params(
        &self,
        db: &mut SqliteConnection,
        mut raw: FieldMap,
        params: ListParams,
    ) -> Result<Vec<Out>> {
        raw.strip_nulls();
        self.filter(db, raw, params).await
    }

    /// Update: validate (as create) → strip nulls → pre-hook → load, mutate
    /// and persist → post-hook → project. Fails when the pk does not resolve.
    pub async fn update(
        &self,
        db: &mut SqliteConnection,
        pk: R::Id,
        mut payload: FieldMap,
    ) -> Result<Out> {
        if self.validate_writes {
            let mut table = Table::<R>::new(&mut *db);
            table.validate_relations(&payload).await?;
            table.validate_unique_fields(&payload).await?;
        }
        if let Some(validate) = &self.validate_update {
            validate(&payload)?;
        }
        payload.strip_nulls();
        if let Some(pre) = &self.pre_update {
            pre(&mut payload);
        }
        let record = Table::<R>::new(&mut *db)
            .update(&pk, &payload)
            .await?
            .ok_or_else(|| Error::NotFound {
                resource: R::TABLE.to_string(),
                id: pk.to_string(),
            })?;
        if let Some(on) = &self.on_update {
            on(&record);
        }
        Ok(Out::from(record))
    }

    /// Delete: pre-hook → delete if present → post-hook → deleted flag.
    pub async fn delete(&self, db: &mut SqliteConnection, pk: R::Id) -> Result<Deleted> {
        if let Some(pre) = &self.pre_delete {
            pre(&pk);
        }
        let deleted = Table::<R>::new(&mut *db).delete(&pk).await?;
        if let Some(on) = &self.on_delete {
            on(&pk, deleted);
        }
        Ok(Deleted { deleted })
    }
}
