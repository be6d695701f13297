//! Columns of an existing dataset
//!
//! The declared map is the dataset's complete column list: columns that
//! already exist keep their server id and inferred type, new ones are
//! created, and anything undeclared is dropped.

use declarative::{ApplyContext, Diagnostic, Diagnostics, Lifecycle};
use reconcile::{DatasetColumn, columns_from_wire, reconcile_columns};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use superset_client::{Api, DatasetPut};

use super::dataset::{load_by_name, locate};
use super::{certification, non_empty};
use crate::error::{ProviderError, Result, call, numeric_id};

pub const KIND: &str = "dataset_columns";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetColumnsConfig {
    pub dataset_name: String,
    pub columns: BTreeMap<String, DatasetColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetColumnsState {
    #[serde(default)]
    pub dataset_id: Option<i64>,
    pub dataset_name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, DatasetColumn>,
}

/// Declared column as the server will report it back
fn planned_column(declared: &DatasetColumn, prior: Option<&DatasetColumn>) -> DatasetColumn {
    DatasetColumn {
        id: prior.and_then(|p| p.id),
        data_type: prior
            .and_then(|p| p.data_type.clone())
            .or_else(|| non_empty(declared.data_type.clone())),
        advanced_data_type: non_empty(declared.advanced_data_type.clone()),
        description: non_empty(declared.description.clone()),
        expression: non_empty(declared.expression.clone()),
        verbose_name: non_empty(declared.verbose_name.clone()),
        certification: certification(declared.certification.as_ref()),
        ..declared.clone()
    }
}

pub struct DatasetColumnsResource<'a> {
    pub api: &'a dyn Api,
}

impl DatasetColumnsResource<'_> {
    fn write(&self, ctx: &mut ApplyContext<'_>, planned: &DatasetColumnsState) -> Result<DatasetColumnsState> {
        let dataset = load_by_name(self.api, &planned.dataset_name)?;
        let columns = reconcile_columns(&planned.columns, &dataset.columns)?;
        log::debug!(
            "sending {} columns for dataset {}",
            columns.len(),
            dataset.id
        );
        let put = DatasetPut {
            columns: Some(columns),
            ..DatasetPut::default()
        };
        self.api
            .update_dataset(dataset.id, &put)
            .map_err(call(format!("update dataset with ID {}", dataset.id)))?;

        let seed = DatasetColumnsState {
            dataset_id: Some(dataset.id),
            ..planned.clone()
        };
        self.read(ctx, &seed)?.ok_or_else(|| {
            ProviderError::Invalid(format!(
                "Dataset '{}' disappeared while updating its columns",
                planned.dataset_name
            ))
        })
    }
}

impl Lifecycle for DatasetColumnsResource<'_> {
    type Config = DatasetColumnsConfig;
    type State = DatasetColumnsState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(config: &DatasetColumnsConfig, diags: &mut Diagnostics) {
        for (key, column) in &config.columns {
            if *key != column.column_name {
                diags.push(
                    Diagnostic::error(
                        "Invalid Column Key",
                        format!(
                            "Column is keyed \"{key}\" but named \"{}\"; the key must equal column_name",
                            column.column_name
                        ),
                    )
                    .at(format!("columns.{key}")),
                );
            }
        }
    }

    fn plan(
        &self,
        config: &DatasetColumnsConfig,
        prior: Option<&DatasetColumnsState>,
    ) -> DatasetColumnsState {
        let columns = config
            .columns
            .iter()
            .map(|(key, declared)| {
                let previous = prior.and_then(|p| p.columns.get(key));
                (key.clone(), planned_column(declared, previous))
            })
            .collect();
        DatasetColumnsState {
            dataset_id: prior.and_then(|p| p.dataset_id),
            dataset_name: config.dataset_name.clone(),
            columns,
        }
    }

    fn requires_replace(&self, planned: &DatasetColumnsState, prior: &DatasetColumnsState) -> bool {
        planned.dataset_name != prior.dataset_name
    }

    fn create(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &DatasetColumnsState,
    ) -> Result<DatasetColumnsState> {
        self.write(ctx, planned)
    }

    fn read(
        &self,
        _ctx: &mut ApplyContext<'_>,
        current: &DatasetColumnsState,
    ) -> Result<Option<DatasetColumnsState>> {
        let Some(dataset) = locate(self.api, current.dataset_id, &current.dataset_name)? else {
            return Ok(None);
        };
        Ok(Some(DatasetColumnsState {
            dataset_id: Some(dataset.id),
            columns: columns_from_wire(&dataset.columns)?,
            dataset_name: dataset.table_name,
        }))
    }

    fn update(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &DatasetColumnsState,
        _prior: &DatasetColumnsState,
    ) -> Result<DatasetColumnsState> {
        self.write(ctx, planned)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &DatasetColumnsState) -> Result<()> {
        let Some(dataset) = locate(self.api, current.dataset_id, &current.dataset_name)? else {
            return Ok(());
        };
        let put = DatasetPut {
            columns: Some(Vec::new()),
            ..DatasetPut::default()
        };
        match self.api.update_dataset(dataset.id, &put) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ProviderError::client(
                format!("update dataset with ID {}", dataset.id),
                e,
            )),
        }
    }

    fn import(&self, id: &str) -> Result<DatasetColumnsState> {
        Ok(DatasetColumnsState {
            dataset_id: Some(numeric_id("dataset", id)?),
            dataset_name: String::new(),
            columns: BTreeMap::new(),
        })
    }
}
