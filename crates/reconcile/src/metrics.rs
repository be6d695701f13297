//! Dataset metrics.
//!
//! Same model as [`crate::columns`]: a map keyed by `metric_name`, sent as a
//! full list in which existing metrics carry the server's id.

use crate::error::{Error, Result};
use crate::extra::{Certification, pack_certification, unpack_certification};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use superset_client::{Metric, MetricPut};

/// Currency formatting of a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Currency {
    /// ISO currency code, e.g. `USD`.
    pub symbol: String,
    /// `prefix` or `suffix`.
    pub symbol_position: String,
}

impl From<&Currency> for superset_client::Currency {
    fn from(c: &Currency) -> Self {
        Self {
            symbol: c.symbol.clone(),
            symbol_position: c.symbol_position.clone(),
        }
    }
}

impl From<&superset_client::Currency> for Currency {
    fn from(c: &superset_client::Currency) -> Self {
        Self {
            symbol: c.symbol.clone(),
            symbol_position: c.symbol_position.clone(),
        }
    }
}

/// A declared metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetMetric {
    /// Server id (computed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Metric name; the key of the metric.
    pub metric_name: String,
    /// SQL expression.
    pub expression: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    /// d3 number format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d3format: Option<String>,
    /// Warning shown next to the metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_text: Option<String>,
    /// Currency formatting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    /// Certification, stored in `extra`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification: Option<Certification>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

/// Wire list for the declared metrics, in key order.
///
/// # Errors
///
/// Returns [`Error::PackExtra`] if certification cannot be encoded.
pub fn reconcile_metrics(
    declared: &BTreeMap<String, DatasetMetric>,
    server: &[Metric],
) -> Result<Vec<MetricPut>> {
    let by_name: HashMap<&str, i64> = server
        .iter()
        .map(|m| (m.metric_name.as_str(), m.id))
        .collect();

    declared
        .values()
        .map(|metric| {
            let extra = pack_certification(metric.certification.as_ref()).map_err(|source| {
                Error::PackExtra {
                    kind: "metric",
                    name: metric.metric_name.clone(),
                    source,
                }
            })?;
            Ok(MetricPut {
                id: by_name.get(metric.metric_name.as_str()).copied(),
                metric_name: metric.metric_name.clone(),
                expression: metric.expression.clone(),
                description: metric.description.clone(),
                verbose_name: metric.verbose_name.clone(),
                d3format: metric.d3format.clone(),
                warning_text: metric.warning_text.clone(),
                currency: metric.currency.as_ref().map(Into::into),
                extra,
            })
        })
        .collect()
}

/// Declared shape of the server's metrics, keyed by name.
///
/// # Errors
///
/// Returns [`Error::UnpackExtra`] for a metric with malformed `extra`.
pub fn metrics_from_wire(server: &[Metric]) -> Result<BTreeMap<String, DatasetMetric>> {
    server
        .iter()
        .map(|m| {
            let certification =
                unpack_certification(m.extra.as_deref()).map_err(|source| Error::UnpackExtra {
                    kind: "metric",
                    name: m.metric_name.clone(),
                    source,
                })?;
            let metric = DatasetMetric {
                id: Some(m.id),
                metric_name: m.metric_name.clone(),
                expression: m.expression.clone(),
                description: non_empty(m.description.as_ref()),
                verbose_name: non_empty(m.verbose_name.as_ref()),
                d3format: non_empty(m.d3format.as_ref()),
                warning_text: non_empty(m.warning_text.as_ref()),
                currency: m.currency.as_ref().map(Into::into),
                certification,
            };
            Ok((m.metric_name.clone(), metric))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(name: &str, expression: &str) -> DatasetMetric {
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

    fn echo(puts: Vec<MetricPut>) -> Vec<Metric> {
        puts.into_iter()
            .map(|p| Metric {
                id: p.id.unwrap_or(500),
                metric_name: p.metric_name,
                uuid: None,
                expression: p.expression,
                description: p.description,
                verbose_name: p.verbose_name,
                d3format: p.d3format,
                warning_text: p.warning_text,
                currency: p.currency,
                extra: p.extra,
            })
            .collect()
    }

    #[test]
    fn test_minimal_metric_has_no_currency_or_extra() {
        let mut map = BTreeMap::new();
        map.insert("METRIC1".to_string(), declared("METRIC1", "SUM(COL1)"));

        let puts = reconcile_metrics(&map, &[]).unwrap();
        assert_eq!(puts[0].currency, None);
        assert_eq!(puts[0].extra, None);

        let back = metrics_from_wire(&echo(puts)).unwrap();
        assert_eq!(back["METRIC1"].certification, None);
    }

    #[test]
    fn test_server_id_preserved() {
        let mut map = BTreeMap::new();
        let mut m = declared("revenue", "SUM(amount)");
        m.id = Some(1);
        map.insert("revenue".to_string(), m);

        let server = echo(vec![MetricPut {
            id: Some(42),
            ..reconcile_metrics(&map, &[]).unwrap().remove(0)
        }]);
        let puts = reconcile_metrics(&map, &server).unwrap();
        assert_eq!(puts[0].id, Some(42));
    }

    #[test]
    fn test_currency_mapped_both_ways() {
        let mut map = BTreeMap::new();
        let mut m = declared("revenue", "SUM(amount)");
        m.currency = Some(Currency {
            symbol: "USD".into(),
            symbol_position: "prefix".into(),
        });
        map.insert("revenue".to_string(), m.clone());

        let puts = reconcile_metrics(&map, &[]).unwrap();
        let wire = puts[0].currency.as_ref().unwrap();
        assert_eq!(wire.symbol_position, "prefix");

        let back = metrics_from_wire(&echo(puts)).unwrap();
        assert_eq!(back["revenue"].currency, m.currency);
    }

    #[test]
    fn test_certified_metric_round_trip() {
        let mut map = BTreeMap::new();
        let mut m = declared("revenue", "SUM(amount)");
        m.certification = Some(Certification {
            certified_by: Some("finance".into()),
            details: Some("audited".into()),
        });
        map.insert("revenue".to_string(), m.clone());

        let back = metrics_from_wire(&echo(reconcile_metrics(&map, &[]).unwrap())).unwrap();
        assert_eq!(back["revenue"].certification, m.certification);
    }
}
