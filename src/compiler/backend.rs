//! Model capability surface
//!
//! The compiler reaches the database only through [`ModelBackend`]: id
//! searches, name searches, reads of a reference column and reads of the
//! materialized parent path. Every call is awaited before the compiler
//! moves on, since the next rewrite usually depends on the ids returned.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::domain::{Domain, Operator, RecordId};
use crate::errors::{DomainError, DomainResult};
use crate::schema::ModelDef;

/// Boxed future returned by backend calls
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = DomainResult<T>> + Send + 'a>>;

/// Options of an id search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Bypass row-level access rules (hierarchy walks)
    pub privileged: bool,
    /// Hide archived records
    pub active_test: bool,
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            privileged: false,
            active_test: true,
            limit: None,
        }
    }
}

impl SearchOptions {
    /// Privileged search that sees the whole tree
    pub fn privileged(active_test: bool) -> Self {
        Self {
            privileged: true,
            active_test,
            limit: None,
        }
    }

    pub fn with_active_test(mut self, active_test: bool) -> Self {
        self.active_test = active_test;
        self
    }
}

/// Database round trips needed while compiling
pub trait ModelBackend: Send + Sync {
    /// Ids of `model` records matching `domain`, in id order
    fn search_ids<'a>(
        &'a self,
        model: &'a ModelDef,
        domain: &'a Domain,
        options: SearchOptions,
    ) -> BackendFuture<'a, Vec<RecordId>>;

    /// Ids of records whose display name matches `name` (a string or a
    /// list of strings). Searches the model's `rec_name` by default.
    fn name_search<'a>(
        &'a self,
        model: &'a ModelDef,
        name: &'a Value,
        operator: Operator,
        options: SearchOptions,
    ) -> BackendFuture<'a, Vec<RecordId>> {
        Box::pin(async move {
            let domain = Domain::leaf(model.rec_name.clone(), operator, name.clone());
            self.search_ids(model, &domain, options).await
        })
    }

    /// Values of the reference column `field` on `ids`, without nulls
    /// or duplicates. Always privileged.
    fn read_references<'a>(
        &'a self,
        model: &'a ModelDef,
        ids: &'a [RecordId],
        field: &'a str,
    ) -> BackendFuture<'a, Vec<RecordId>>;

    /// `(id, parent_path)` of the existing records among `ids`. Always
    /// privileged.
    fn read_parent_paths<'a>(
        &'a self,
        model: &'a ModelDef,
        ids: &'a [RecordId],
    ) -> BackendFuture<'a, Vec<(RecordId, String)>>;
}

/// Backend without a database.
///
/// Domains that compile to SQL alone (no name search, no hierarchy walk)
/// work unchanged; anything else fails with `AERO_DOMAIN_BACKEND`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

impl OfflineBackend {
    fn unavailable<T: Send + 'static>(what: &str, model: &ModelDef) -> BackendFuture<'static, T> {
        let err = DomainError::backend(format!(
            "{} on {} needs a database connection",
            what, model.name
        ));
        Box::pin(async move { Err(err) })
    }
}

impl ModelBackend for OfflineBackend {
    fn search_ids<'a>(
        &'a self,
        model: &'a ModelDef,
        _domain: &'a Domain,
        _options: SearchOptions,
    ) -> BackendFuture<'a, Vec<RecordId>> {
        Self::unavailable("search", model)
    }

    fn read_references<'a>(
        &'a self,
        model: &'a ModelDef,
        _ids: &'a [RecordId],
        _field: &'a str,
    ) -> BackendFuture<'a, Vec<RecordId>> {
        Self::unavailable("read", model)
    }

    fn read_parent_paths<'a>(
        &'a self,
        model: &'a ModelDef,
        _ids: &'a [RecordId],
    ) -> BackendFuture<'a, Vec<(RecordId, String)>> {
        Self::unavailable("parent path read", model)
    }
}
