//! Errors raised by resource handlers
//!
//! Every handler returns [`ProviderError`]; the lifecycle framework turns it
//! into a diagnostic whose summary comes from [`Diagnose::summary`].

use declarative::Diagnose;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// A remote call failed
    #[error("Unable to {action}, got error: {source}")]
    Client {
        action: String,
        #[source]
        source: superset_client::Error,
    },

    /// The dataset's folder tree could not be converted
    #[error("Unable to convert folders for Dataset with ID {dataset_id}: {source}")]
    Folder {
        dataset_id: i64,
        #[source]
        source: reconcile::Error,
    },

    /// Columns or metrics could not be converted
    #[error(transparent)]
    Reconcile(#[from] reconcile::Error),

    /// An object with the same natural key already exists
    #[error("A {kind} with {field} '{value}' already exists with ID {id}")]
    Conflict {
        kind: &'static str,
        field: &'static str,
        value: String,
        id: i64,
    },

    /// Names that match nothing on the server
    #[error("The following {kind} were not found: {}", names.join(", "))]
    Unresolved { kind: &'static str, names: Vec<String> },

    #[error("{0}")]
    InvalidImportId(String),

    #[error("{0}")]
    Invalid(String),
}

impl ProviderError {
    /// Wrap a client error with the action that was attempted
    pub fn client(action: impl Into<String>, source: superset_client::Error) -> Self {
        Self::Client {
            action: action.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Client { source, .. } if source.is_not_found())
    }
}

/// `map_err` adapter: `.map_err(call("create Role"))?`
pub fn call(action: impl Into<String>) -> impl FnOnce(superset_client::Error) -> ProviderError {
    let action = action.into();
    move |source| ProviderError::client(action, source)
}

/// Parse a numeric import identifier
pub fn numeric_id(kind: &str, id: &str) -> Result<i64> {
    id.trim().parse().map_err(|e| {
        ProviderError::InvalidImportId(format!("Expected numeric {kind} ID, got {id:?}: {e}"))
    })
}

/// Parse a natural-key import identifier
pub fn natural_key(kind: &str, id: &str) -> Result<String> {
    let key = id.trim();
    if key.is_empty() {
        return Err(ProviderError::InvalidImportId(format!(
            "Expected a {kind} name, got an empty string"
        )));
    }
    Ok(key.to_string())
}

/// Recorded state that lacks the server id
pub fn missing_id(kind: &str) -> ProviderError {
    ProviderError::Invalid(format!("{kind} has no recorded ID; import it or recreate it"))
}

impl Diagnose for ProviderError {
    fn summary(&self) -> &'static str {
        match self {
            Self::Client { .. } | Self::Reconcile(_) => "Client Error",
            Self::Folder { .. } => "Folder Conversion Error",
            Self::Conflict { .. } => "Conflict",
            Self::Unresolved { kind, .. } => match *kind {
                "permissions" => "Invalid Permissions",
                "roles" => "Invalid Roles",
                "groups" => "Invalid Groups",
                "databases" => "Invalid Database",
                "datasets" => "Invalid Dataset",
                _ => "Invalid Folder Children",
            },
            Self::InvalidImportId(_) => "Invalid import ID",
            Self::Invalid(_) => "Invalid Configuration",
        }
    }
}
