//! Metrics of an existing dataset
//!
//! Same replacement semantics as `dataset_columns`: the declared map is the
//! complete list, and metrics that exist already keep their server id.

use declarative::{ApplyContext, Diagnostic, Diagnostics, Lifecycle};
use reconcile::{DatasetMetric, metrics_from_wire, reconcile_metrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use superset_client::{Api, DatasetPut};

use super::dataset::{load_by_name, locate};
use super::{certification, non_empty};
use crate::error::{ProviderError, Result, call, numeric_id};

pub const KIND: &str = "dataset_metrics";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetMetricsConfig {
    pub dataset_name: String,
    pub metrics: BTreeMap<String, DatasetMetric>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetMetricsState {
    #[serde(default)]
    pub dataset_id: Option<i64>,
    pub dataset_name: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, DatasetMetric>,
}

fn planned_metric(declared: &DatasetMetric, prior: Option<&DatasetMetric>) -> DatasetMetric {
    DatasetMetric {
        id: prior.and_then(|p| p.id),
        description: non_empty(declared.description.clone()),
        verbose_name: non_empty(declared.verbose_name.clone()),
        d3format: non_empty(declared.d3format.clone()),
        warning_text: non_empty(declared.warning_text.clone()),
        certification: certification(declared.certification.as_ref()),
        ..declared.clone()
    }
}

pub struct DatasetMetricsResource<'a> {
    pub api: &'a dyn Api,
}

impl DatasetMetricsResource<'_> {
    fn write(&self, ctx: &mut ApplyContext<'_>, planned: &DatasetMetricsState) -> Result<DatasetMetricsState> {
        let dataset = load_by_name(self.api, &planned.dataset_name)?;
        let put = DatasetPut {
            metrics: Some(reconcile_metrics(&planned.metrics, &dataset.metrics)?),
            ..DatasetPut::default()
        };
        self.api
            .update_dataset(dataset.id, &put)
            .map_err(call(format!("update dataset with ID {}", dataset.id)))?;

        let seed = DatasetMetricsState {
            dataset_id: Some(dataset.id),
            ..planned.clone()
        };
        self.read(ctx, &seed)?.ok_or_else(|| {
            ProviderError::Invalid(format!(
                "Dataset '{}' disappeared while updating its metrics",
                planned.dataset_name
            ))
        })
    }
}

impl Lifecycle for DatasetMetricsResource<'_> {
    type Config = DatasetMetricsConfig;
    type State = DatasetMetricsState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(config: &DatasetMetricsConfig, diags: &mut Diagnostics) {
        for (key, metric) in &config.metrics {
            if *key != metric.metric_name {
                diags.push(
                    Diagnostic::error(
                        "Invalid Metric Key",
                        format!(
                            "Metric is keyed \"{key}\" but named \"{}\"; the key must equal metric_name",
                            metric.metric_name
                        ),
                    )
                    .at(format!("metrics.{key}")),
                );
            }
            if metric.expression.trim().is_empty() {
                diags.add_error("Invalid Metric", format!("Metric \"{key}\" has an empty expression"));
            }
        }
    }

    fn plan(
        &self,
        config: &DatasetMetricsConfig,
        prior: Option<&DatasetMetricsState>,
    ) -> DatasetMetricsState {
        DatasetMetricsState {
            dataset_id: prior.and_then(|p| p.dataset_id),
            dataset_name: config.dataset_name.clone(),
            metrics: config
                .metrics
                .iter()
                .map(|(key, declared)| {
                    let previous = prior.and_then(|p| p.metrics.get(key));
                    (key.clone(), planned_metric(declared, previous))
                })
                .collect(),
        }
    }

    fn requires_replace(&self, planned: &DatasetMetricsState, prior: &DatasetMetricsState) -> bool {
        planned.dataset_name != prior.dataset_name
    }

    fn create(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &DatasetMetricsState,
    ) -> Result<DatasetMetricsState> {
        self.write(ctx, planned)
    }

    fn read(
        &self,
        _ctx: &mut ApplyContext<'_>,
        current: &DatasetMetricsState,
    ) -> Result<Option<DatasetMetricsState>> {
        let Some(dataset) = locate(self.api, current.dataset_id, &current.dataset_name)? else {
            return Ok(None);
        };
        Ok(Some(DatasetMetricsState {
            dataset_id: Some(dataset.id),
            metrics: metrics_from_wire(&dataset.metrics)?,
            dataset_name: dataset.table_name,
        }))
    }

    fn update(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &DatasetMetricsState,
        _prior: &DatasetMetricsState,
    ) -> Result<DatasetMetricsState> {
        self.write(ctx, planned)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &DatasetMetricsState) -> Result<()> {
        let Some(dataset) = locate(self.api, current.dataset_id, &current.dataset_name)? else {
            return Ok(());
        };
        let put = DatasetPut {
            metrics: Some(Vec::new()),
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

    fn import(&self, id: &str) -> Result<DatasetMetricsState> {
        Ok(DatasetMetricsState {
            dataset_id: Some(numeric_id("dataset", id)?),
            dataset_name: String::new(),
            metrics: BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{assert_converges, ctx};
    use reconcile::Currency;
    use superset_client::MockApi;

    fn metric(name: &str, expression: &str) -> DatasetMetric {
        DatasetMetric {
            id: None,
            metric_name: name.into(),
            expression: expression.into(),
            description: None,
            verbose_name: None,
            d3format: None,
            warning_text: None,
            currency: None,
            certification: None,
        }
    }

    fn config(metrics: Vec<DatasetMetric>) -> DatasetMetricsConfig {
        DatasetMetricsConfig {
            dataset_name: "orders".into(),
            metrics: metrics
                .into_iter()
                .map(|m| (m.metric_name.clone(), m))
                .collect(),
        }
    }

    #[test]
    fn test_existing_metric_updated_in_place() {
        let api = MockApi::new();
        let db = api.add_database("examples");
        let dataset = api.add_dataset(db, "orders");
        let (id, _) = api.add_dataset_metric(dataset, "count", "COUNT(*)");
        let resource = DatasetMetricsResource { api: &api };

        let state = assert_converges(
            &resource,
            &config(vec![
                DatasetMetric {
                    verbose_name: Some("Orders".into()),
                    d3format: Some(",d".into()),
                    ..metric("count", "COUNT(*)")
                },
                DatasetMetric {
                    currency: Some(Currency {
                        symbol: "USD".into(),
                        symbol_position: "prefix".into(),
                    }),
                    warning_text: Some(String::new()),
                    ..metric("revenue", "SUM(price)")
                },
            ]),
        );

        assert_eq!(state.metrics["count"].id, Some(id));
        assert_eq!(state.metrics["count"].verbose_name.as_deref(), Some("Orders"));
        assert_eq!(state.metrics["revenue"].warning_text, None);
        assert_eq!(api.dataset(dataset).unwrap().metrics.len(), 2);
    }

    #[test]
    fn test_changed_expression_is_an_update() {
        let api = MockApi::new();
        let db = api.add_database("examples");
        api.add_dataset(db, "orders");
        let resource = DatasetMetricsResource { api: &api };
        let prior = assert_converges(&resource, &config(vec![metric("count", "COUNT(*)")]));

        let planned = resource.plan(&config(vec![metric("count", "COUNT(id)")]), Some(&prior));
        assert_ne!(planned, prior);
        assert!(!resource.requires_replace(&planned, &prior));
        let updated = resource.update(&mut ctx(), &planned, &prior).unwrap();
        assert_eq!(updated, planned);
        assert_eq!(updated.metrics["count"].id, prior.metrics["count"].id);
    }

    #[test]
    fn test_validation() {
        let mut cfg = config(vec![metric("blank", " ")]);
        cfg.metrics.insert("alias".into(), metric("count", "COUNT(*)"));
        let mut diags = Diagnostics::new();
        DatasetMetricsResource::validate(&cfg, &mut diags);
        assert_eq!(diags.error_count(), 2);
    }

    #[test]
    fn test_delete_after_dataset_removed() {
        let api = MockApi::new();
        let db = api.add_database("examples");
        let dataset = api.add_dataset(db, "orders");
        let resource = DatasetMetricsResource { api: &api };
        let state = assert_converges(&resource, &config(vec![metric("count", "COUNT(*)")]));

        api.delete_dataset(dataset).unwrap();
        assert_eq!(resource.read(&mut ctx(), &state).unwrap(), None);
        resource.delete(&mut ctx(), &state).unwrap();
    }
}
