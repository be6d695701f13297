//! Dataset resource
//!
//! A dataset is created in its bootstrap database (defaulting to
//! `database_name`) and moved to `database_name` by the follow-up update
//! when the two differ. Everything beyond the table identity is written by
//! that update, since the create endpoint accepts only a handful of fields.
//!
//! Owners are managed only when `owner_ids` is non-empty; otherwise the
//! server's owners are recorded and left alone.

use declarative::{ApplyContext, Lifecycle};
use reconcile::{Certification, pack_certification, unpack_certification};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use superset_client::{Api, Database, Dataset, DatasetPost, DatasetPut};

use super::non_empty;
use crate::error::{ProviderError, Result, call, missing_id, numeric_id};

pub const KIND: &str = "dataset";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub database_name: String,
    #[serde(default)]
    pub bootstrap_database_name: Option<String>,
    pub table_name: String,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cache_timeout: Option<i64>,
    #[serde(default)]
    pub is_managed_externally: bool,
    #[serde(default)]
    pub filter_select_enabled: bool,
    #[serde(default)]
    pub fetch_values_predicate: Option<String>,
    #[serde(default)]
    pub always_filter_main_dttm: bool,
    #[serde(default)]
    pub normalize_columns: bool,
    #[serde(default)]
    pub owner_ids: BTreeSet<i64>,
    #[serde(default)]
    pub certified_by: Option<String>,
    #[serde(default)]
    pub certification_details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetState {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub database_id: Option<i64>,
    pub database_name: String,
    #[serde(default)]
    pub bootstrap_database_id: Option<i64>,
    #[serde(default)]
    pub bootstrap_database_name: Option<String>,
    pub table_name: String,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cache_timeout: Option<i64>,
    #[serde(default)]
    pub is_managed_externally: bool,
    #[serde(default)]
    pub filter_select_enabled: bool,
    #[serde(default)]
    pub fetch_values_predicate: Option<String>,
    #[serde(default)]
    pub always_filter_main_dttm: bool,
    #[serde(default)]
    pub normalize_columns: bool,
    #[serde(default)]
    pub owner_ids: BTreeSet<i64>,
    #[serde(default)]
    pub certified_by: Option<String>,
    #[serde(default)]
    pub certification_details: Option<String>,
}

impl DatasetState {
    fn certification(&self) -> Certification {
        Certification {
            certified_by: self.certified_by.clone(),
            details: self.certification_details.clone(),
        }
    }

    /// Database the dataset is first created in
    fn bootstrap_name(&self) -> &str {
        self.bootstrap_database_name
            .as_deref()
            .unwrap_or(&self.database_name)
    }

    /// The update body that brings a freshly created or drifted dataset in
    /// line with this state
    fn put(&self) -> Result<DatasetPut> {
        let extra = pack_certification(Some(&self.certification())).map_err(|e| {
            ProviderError::Invalid(format!(
                "Unable to encode certification for Dataset '{}': {e}",
                self.table_name
            ))
        })?;
        Ok(DatasetPut {
            sql: self.sql.clone(),
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            description: Some(self.description.clone().unwrap_or_default()),
            cache_timeout: self.cache_timeout,
            filter_select_enabled: Some(self.filter_select_enabled),
            fetch_values_predicate: Some(self.fetch_values_predicate.clone().unwrap_or_default()),
            always_filter_main_dttm: Some(self.always_filter_main_dttm),
            normalize_columns: Some(self.normalize_columns),
            is_managed_externally: Some(self.is_managed_externally),
            owners: (!self.owner_ids.is_empty()).then(|| self.owner_ids.iter().copied().collect()),
            extra: Some(extra.unwrap_or_default()),
            ..DatasetPut::default()
        })
    }
}

/// The dataset named `table_name`, in full
pub(crate) fn load_by_name(api: &dyn Api, table_name: &str) -> Result<Dataset> {
    let summary = api
        .find_dataset(table_name)
        .map_err(call(format!("find dataset with name '{table_name}'")))?
        .ok_or_else(|| ProviderError::Unresolved {
            kind: "datasets",
            names: vec![table_name.to_string()],
        })?;
    api.get_dataset(summary.id)
        .map_err(call(format!("get dataset with ID {}", summary.id)))
}

/// The dataset a columns, metrics or folder record belongs to; by id once
/// known, by name before that. `None` when it no longer exists.
pub(crate) fn locate(api: &dyn Api, id: Option<i64>, table_name: &str) -> Result<Option<Dataset>> {
    let id = match id {
        Some(id) => id,
        None => match api
            .find_dataset(table_name)
            .map_err(call(format!("find dataset with name '{table_name}'")))?
        {
            Some(summary) => summary.id,
            None => return Ok(None),
        },
    };
    match api.get_dataset(id) {
        Ok(dataset) => Ok(Some(dataset)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(ProviderError::client(format!("read Dataset with ID {id}"), e)),
    }
}

/// A physical or virtual dataset
pub struct DatasetResource<'a> {
    pub api: &'a dyn Api,
}

impl DatasetResource<'_> {
    fn database(&self, name: &str) -> Result<Database> {
        self.api
            .find_database(name)
            .map_err(call(format!("find Database '{name}'")))?
            .ok_or_else(|| ProviderError::Unresolved {
                kind: "databases",
                names: vec![name.to_string()],
            })
    }

    /// Live attributes, keeping what the server does not report
    fn observe(dataset: Dataset, current: &DatasetState) -> Result<DatasetState> {
        let certification = unpack_certification(dataset.extra.as_deref()).map_err(|e| {
            ProviderError::Invalid(format!(
                "Unable to parse extra for Dataset with ID {}: {e}",
                dataset.id
            ))
        })?;
        let certification = certification.unwrap_or_default();

        Ok(DatasetState {
            id: Some(dataset.id),
            database_id: Some(dataset.database.id),
            database_name: dataset.database.database_name,
            bootstrap_database_id: current.bootstrap_database_id,
            bootstrap_database_name: current.bootstrap_database_name.clone(),
            table_name: dataset.table_name,
            catalog: non_empty(dataset.catalog),
            schema: non_empty(dataset.schema),
            sql: non_empty(dataset.sql),
            description: non_empty(dataset.description),
            cache_timeout: dataset.cache_timeout,
            is_managed_externally: dataset.is_managed_externally.unwrap_or(false),
            filter_select_enabled: dataset.filter_select_enabled.unwrap_or(false),
            fetch_values_predicate: non_empty(dataset.fetch_values_predicate),
            always_filter_main_dttm: dataset.always_filter_main_dttm.unwrap_or(false),
            normalize_columns: dataset.normalize_columns.unwrap_or(false),
            owner_ids: dataset.owners.iter().map(|o| o.id).collect(),
            certified_by: certification.certified_by,
            certification_details: certification.details,
        })
    }

    fn fetch(&self, id: i64, current: &DatasetState) -> Result<DatasetState> {
        let dataset = self
            .api
            .get_dataset(id)
            .map_err(call(format!("read Dataset with ID {id}")))?;
        Self::observe(dataset, current)
    }
}

impl Lifecycle for DatasetResource<'_> {
    type Config = DatasetConfig;
    type State = DatasetState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn plan(&self, config: &DatasetConfig, prior: Option<&DatasetState>) -> DatasetState {
        let owner_ids = if config.owner_ids.is_empty() {
            prior.map(|p| p.owner_ids.clone()).unwrap_or_default()
        } else {
            config.owner_ids.clone()
        };
        DatasetState {
            id: prior.and_then(|p| p.id),
            database_id: prior.and_then(|p| p.database_id),
            database_name: config.database_name.clone(),
            bootstrap_database_id: prior.and_then(|p| p.bootstrap_database_id),
            bootstrap_database_name: non_empty(config.bootstrap_database_name.clone()),
            table_name: config.table_name.clone(),
            catalog: non_empty(config.catalog.clone()),
            schema: non_empty(config.schema.clone()),
            sql: non_empty(config.sql.clone()),
            description: non_empty(config.description.clone()),
            cache_timeout: config.cache_timeout,
            is_managed_externally: config.is_managed_externally,
            filter_select_enabled: config.filter_select_enabled,
            fetch_values_predicate: non_empty(config.fetch_values_predicate.clone()),
            always_filter_main_dttm: config.always_filter_main_dttm,
            normalize_columns: config.normalize_columns,
            owner_ids,
            certified_by: non_empty(config.certified_by.clone()),
            certification_details: non_empty(config.certification_details.clone()),
        }
    }

    fn requires_replace(&self, planned: &DatasetState, prior: &DatasetState) -> bool {
        planned.database_name != prior.database_name
            || planned.table_name != prior.table_name
            || planned.bootstrap_database_name != prior.bootstrap_database_name
    }

    fn create(&self, _ctx: &mut ApplyContext<'_>, planned: &DatasetState) -> Result<DatasetState> {
        let bootstrap = self.database(planned.bootstrap_name())?;
        let target = if bootstrap.database_name == planned.database_name {
            None
        } else {
            Some(self.database(&planned.database_name)?)
        };

        if let Some(existing) = self
            .api
            .find_dataset(&planned.table_name)
            .map_err(call("validate Dataset name uniqueness"))?
        {
            return Err(ProviderError::Conflict {
                kind: "Dataset",
                field: "name",
                value: planned.table_name.clone(),
                id: existing.id,
            });
        }

        let id = self
            .api
            .create_dataset(&DatasetPost {
                database: bootstrap.id,
                table_name: planned.table_name.clone(),
                schema: planned.schema.clone(),
                catalog: planned.catalog.clone(),
                sql: planned.sql.clone(),
                is_managed_externally: planned.is_managed_externally,
                normalize_columns: planned.normalize_columns,
            })
            .map_err(call("create Dataset"))?;
        log::debug!(
            "created dataset {} with id {id} in database {}",
            planned.table_name,
            bootstrap.database_name
        );

        let put = DatasetPut {
            database_id: target.as_ref().map(|db| db.id),
            ..planned.put()?
        };
        if let Err(e) = self.api.update_dataset(id, &put) {
            // Roll back the dataset created above
            if let Err(cleanup) = self.api.delete_dataset(id) {
                log::warn!("failed to remove dataset {id} after failed update: {cleanup}");
            }
            return Err(ProviderError::client(format!("update Dataset with ID {id}"), e));
        }

        let seed = DatasetState {
            bootstrap_database_id: Some(bootstrap.id),
            ..planned.clone()
        };
        self.fetch(id, &seed)
    }

    fn read(&self, _ctx: &mut ApplyContext<'_>, current: &DatasetState) -> Result<Option<DatasetState>> {
        let Some(id) = current.id else {
            return Ok(None);
        };
        match self.fetch(id, current) {
            Ok(state) => Ok(Some(state)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn update(
        &self,
        _ctx: &mut ApplyContext<'_>,
        planned: &DatasetState,
        prior: &DatasetState,
    ) -> Result<DatasetState> {
        let id = prior.id.ok_or_else(|| missing_id(KIND))?;
        self.api
            .update_dataset(id, &planned.put()?)
            .map_err(call(format!("update Dataset with ID {id}")))?;
        self.fetch(id, planned)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &DatasetState) -> Result<()> {
        let id = current.id.ok_or_else(|| missing_id(KIND))?;
        match self.api.delete_dataset(id) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ProviderError::client(format!("delete Dataset with ID {id}"), e)),
        }
    }

    fn import(&self, id: &str) -> Result<DatasetState> {
        Ok(DatasetState {
            id: Some(numeric_id(KIND, id)?),
            database_id: None,
            database_name: String::new(),
            bootstrap_database_id: None,
            bootstrap_database_name: None,
            table_name: String::new(),
            catalog: None,
            schema: None,
            sql: None,
            description: None,
            cache_timeout: None,
            is_managed_externally: false,
            filter_select_enabled: false,
            fetch_values_predicate: None,
            always_filter_main_dttm: false,
            normalize_columns: false,
            owner_ids: BTreeSet::new(),
            certified_by: None,
            certification_details: None,
        })
    }
}
