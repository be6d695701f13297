//! Certification carried in the opaque `extra` JSON string.
//!
//! Columns and metrics store certification as
//! `{"certification":{"certified_by":..,"details":..}}` inside `extra`.
//! Nothing else in the workspace reads or writes `extra`.

use serde::{Deserialize, Serialize};

/// Who certified a column or metric, and why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Certification {
    /// Certifying person or team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certified_by: Option<String>,
    /// Certification details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Certification {
    /// Whether neither field carries text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certified_by.as_deref().is_none_or(str::is_empty)
            && self.details.as_deref().is_none_or(str::is_empty)
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Extra {
    #[serde(default)]
    certification: Option<WireCertification>,
}

#[derive(Serialize, Deserialize, Default)]
struct WireCertification {
    #[serde(default)]
    certified_by: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Encode certification into an `extra` string.
///
/// Absent or empty certification encodes to `None`.
///
/// # Errors
///
/// Returns the JSON encoding error.
pub fn pack_certification(certification: Option<&Certification>) -> serde_json::Result<Option<String>> {
    let Some(cert) = certification.filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let extra = Extra {
        certification: Some(WireCertification {
            certified_by: Some(cert.certified_by.clone().unwrap_or_default()),
            details: Some(cert.details.clone().unwrap_or_default()),
        }),
    };
    serde_json::to_string(&extra).map(Some)
}

/// Decode certification from an `extra` string.
///
/// Absent or empty `extra`, and `extra` without certification text,
/// decode to `None`.
///
/// # Errors
///
/// Returns the JSON decoding error for malformed `extra`.
pub fn unpack_certification(extra: Option<&str>) -> serde_json::Result<Option<Certification>> {
    let Some(raw) = extra.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let extra: Extra = serde_json::from_str(raw)?;
    let Some(wire) = extra.certification else {
        return Ok(None);
    };
    let cert = Certification {
        certified_by: non_empty(wire.certified_by),
        details: non_empty(wire.details),
    };
    Ok((!cert.is_empty()).then_some(cert))
}
