//! Record store interface.
//!
//! Durable state lives in the hosted backend. The core only needs create/read/update/delete
//! against named collections, each scoped by tenant and optionally by patient. [`RecordStore`]
//! is that seam; [`InMemoryStore`] backs tests, the CLI and the demo server.

use crate::validation::validate_tenant_id;
use crate::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Named record collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Patients,
    Medications,
    MedicationAdministrations,
    LabResults,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Medications => "patient_medications",
            Collection::MedicationAdministrations => "medication_administrations",
            Collection::LabResults => "lab_results",
        }
    }
}

/// Tenant (and optional patient) scope of a query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scope {
    tenant_id: String,
    patient_id: Option<String>,
}

impl Scope {
    /// Tenant-wide scope.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTenant` if the tenant id fails validation.
    pub fn tenant(tenant_id: &str) -> CoreResult<Self> {
        validate_tenant_id(tenant_id)?;
        Ok(Self {
            tenant_id: tenant_id.to_string(),
            patient_id: None,
        })
    }

    /// Narrow to one patient.
    pub fn patient(&self, patient_id: &str) -> CoreResult<Self> {
        let patient_id = patient_id.trim();
        if patient_id.is_empty() {
            return Err(CoreError::InvalidInput("patient id cannot be empty".into()));
        }
        Ok(Self {
            tenant_id: self.tenant_id.clone(),
            patient_id: Some(patient_id.to_string()),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn patient_id(&self) -> Option<&str> {
        self.patient_id.as_deref()
    }

    /// The same tenant without the patient narrowing.
    pub fn tenant_only(&self) -> Self {
        Self {
            tenant_id: self.tenant_id.clone(),
            patient_id: None,
        }
    }
}

/// Generic data-access interface over JSON records.
pub trait RecordStore: Send + Sync {
    /// Create a record. Fails with `AlreadyExists` if the id is taken in this scope.
    fn insert(&self, scope: &Scope, collection: Collection, id: &str, record: Value)
        -> CoreResult<()>;

    fn get(&self, scope: &Scope, collection: Collection, id: &str) -> CoreResult<Option<Value>>;

    /// Replace an existing record. Fails with `NotFound` if absent.
    fn update(&self, scope: &Scope, collection: Collection, id: &str, record: Value)
        -> CoreResult<()>;

    /// Returns whether a record was removed.
    fn delete(&self, scope: &Scope, collection: Collection, id: &str) -> CoreResult<bool>;

    /// All records in the scope, ordered by id.
    fn list(&self, scope: &Scope, collection: Collection) -> CoreResult<Vec<Value>>;
}

type ScopeKey = (String, Option<String>, Collection);

/// Process-local store. Scopes never see each other's records.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<ScopeKey, BTreeMap<String, Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(scope: &Scope, collection: Collection) -> ScopeKey {
        (
            scope.tenant_id.clone(),
            scope.patient_id.clone(),
            collection,
        )
    }
}

fn poisoned<T>(_: T) -> CoreError {
    CoreError::StoreUnavailable("in-memory store lock poisoned".into())
}

impl RecordStore for InMemoryStore {
    fn insert(
        &self,
        scope: &Scope,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> CoreResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        let bucket = records.entry(Self::key(scope, collection)).or_default();
        if bucket.contains_key(id) {
            return Err(CoreError::AlreadyExists {
                collection: collection.as_str().into(),
                id: id.into(),
            });
        }
        bucket.insert(id.to_string(), record);
        Ok(())
    }

    fn get(&self, scope: &Scope, collection: Collection, id: &str) -> CoreResult<Option<Value>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .get(&Self::key(scope, collection))
            .and_then(|bucket| bucket.get(id))
            .cloned())
    }

    fn update(
        &self,
        scope: &Scope,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> CoreResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records
            .get_mut(&Self::key(scope, collection))
            .and_then(|bucket| bucket.get_mut(id))
        {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(CoreError::NotFound {
                collection: collection.as_str().into(),
                id: id.into(),
            }),
        }
    }

    fn delete(&self, scope: &Scope, collection: Collection, id: &str) -> CoreResult<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records
            .get_mut(&Self::key(scope, collection))
            .map(|bucket| bucket.remove(id).is_some())
            .unwrap_or(false))
    }

    fn list(&self, scope: &Scope, collection: Collection) -> CoreResult<Vec<Value>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .get(&Self::key(scope, collection))
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Typed access to one collection of a [`RecordStore`].
pub struct Records<'a> {
    store: &'a dyn RecordStore,
    scope: &'a Scope,
    collection: Collection,
}

impl<'a> Records<'a> {
    pub fn new(store: &'a dyn RecordStore, scope: &'a Scope, collection: Collection) -> Self {
        Self {
            store,
            scope,
            collection,
        }
    }

    pub fn insert<T: Serialize>(&self, id: &str, record: &T) -> CoreResult<()> {
        let value = serde_json::to_value(record).map_err(CoreError::Serialization)?;
        self.store.insert(self.scope, self.collection, id, value)
    }

    pub fn update<T: Serialize>(&self, id: &str, record: &T) -> CoreResult<()> {
        let value = serde_json::to_value(record).map_err(CoreError::Serialization)?;
        self.store.update(self.scope, self.collection, id, value)
    }

    pub fn get<T: DeserializeOwned>(&self, id: &str) -> CoreResult<Option<T>> {
        self.store
            .get(self.scope, self.collection, id)?
            .map(|value| serde_json::from_value(value).map_err(CoreError::Deserialization))
            .transpose()
    }

    /// Like [`Records::get`], failing with `NotFound` when absent.
    pub fn require<T: DeserializeOwned>(&self, id: &str) -> CoreResult<T> {
        self.get(id)?.ok_or_else(|| CoreError::NotFound {
            collection: self.collection.as_str().into(),
            id: id.into(),
        })
    }

    pub fn list<T: DeserializeOwned>(&self) -> CoreResult<Vec<T>> {
        self.store
            .list(self.scope, self.collection)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(CoreError::Deserialization))
            .collect()
    }

    pub fn delete(&self, id: &str) -> CoreResult<bool> {
        self.store.delete(self.scope, self.collection, id)
    }
}
