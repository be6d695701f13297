//! Folder tree of an existing dataset
//!
//! Children name the columns and metrics they hold; their uuids are taken
//! from the dataset on every write. A child that names nothing on the
//! dataset fails the write instead of being sent with a made-up uuid,
//! which the server would reject anyway.

use declarative::{ApplyContext, Diagnostic, Diagnostics, Lifecycle};
use reconcile::{
    Folder, FolderChild, from_wire_folders, resolve_columns, to_wire_folders, unresolved_children,
};
use serde::{Deserialize, Serialize};
use superset_client::{Api, DatasetPut, FolderType};

use super::dataset::{load_by_name, locate};
use super::non_empty;
use crate::error::{ProviderError, Result, call, numeric_id};

pub const KIND: &str = "dataset_folder";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetFolderConfig {
    pub dataset_name: String,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetFolderState {
    #[serde(default)]
    pub dataset_id: Option<i64>,
    pub dataset_name: String,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// A declared uuid in the server's spelling; blank and nil mean "assign one"
fn declared_uuid(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && !v.chars().all(|c| c == '0' || c == '-'))
}

fn planned_child(declared: &FolderChild, prior: Option<&Folder>) -> FolderChild {
    let previous = prior.and_then(|f| {
        f.children
            .iter()
            .find(|c| c.name == declared.name && c.kind == declared.kind)
    });
    FolderChild {
        name: declared.name.clone(),
        kind: declared.kind,
        description: non_empty(declared.description.clone()),
        uuid: previous
            .and_then(|c| c.uuid.clone())
            .or_else(|| declared_uuid(declared.uuid.as_ref())),
    }
}

fn planned_folder(declared: &Folder, prior: &[Folder]) -> Folder {
    let previous = prior.iter().find(|f| f.name == declared.name);
    Folder {
        name: declared.name.clone(),
        kind: declared.kind,
        description: non_empty(declared.description.clone()),
        uuid: declared_uuid(declared.uuid.as_ref()).or_else(|| previous.and_then(|f| f.uuid.clone())),
        children: declared
            .children
            .iter()
            .map(|child| planned_child(child, previous))
            .collect(),
    }
}

pub struct DatasetFolderResource<'a> {
    pub api: &'a dyn Api,
}

impl DatasetFolderResource<'_> {
    fn write(&self, ctx: &mut ApplyContext<'_>, planned: &DatasetFolderState) -> Result<DatasetFolderState> {
        let dataset = load_by_name(self.api, &planned.dataset_name)?;

        let mut folders = planned.folders.clone();
        resolve_columns(&mut folders, &dataset.columns, &dataset.metrics);
        let missing = unresolved_children(&folders, &dataset.columns, &dataset.metrics);
        if !missing.is_empty() {
            return Err(ProviderError::Unresolved {
                kind: "folder children",
                names: missing,
            });
        }
        let wire = to_wire_folders(&folders).map_err(|source| ProviderError::Folder {
            dataset_id: dataset.id,
            source,
        })?;

        let put = DatasetPut {
            folders: Some(wire),
            ..DatasetPut::default()
        };
        self.api
            .update_dataset(dataset.id, &put)
            .map_err(call(format!("update dataset with ID {}", dataset.id)))?;

        let seed = DatasetFolderState {
            dataset_id: Some(dataset.id),
            ..planned.clone()
        };
        self.read(ctx, &seed)?.ok_or_else(|| {
            ProviderError::Invalid(format!(
                "Dataset '{}' disappeared while updating its folders",
                planned.dataset_name
            ))
        })
    }
}

impl Lifecycle for DatasetFolderResource<'_> {
    type Config = DatasetFolderConfig;
    type State = DatasetFolderState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(config: &DatasetFolderConfig, diags: &mut Diagnostics) {
        for (i, folder) in config.folders.iter().enumerate() {
            if folder.kind != FolderType::Folder {
                diags.push(
                    Diagnostic::error(
                        "Invalid Folder",
                        format!(
                            "Root level folders must be of type 'folder', got '{}'",
                            folder.kind.as_str()
                        ),
                    )
                    .at(format!("folders[{i}].type")),
                );
            }
            for (j, child) in folder.children.iter().enumerate() {
                if child.kind == FolderType::Folder {
                    diags.push(
                        Diagnostic::error("Invalid Folder", "Nested folders are not supported")
                            .at(format!("folders[{i}].children[{j}].type")),
                    );
                }
            }
        }
    }

    fn plan(&self, config: &DatasetFolderConfig, prior: Option<&DatasetFolderState>) -> DatasetFolderState {
        let previous = prior.map(|p| p.folders.as_slice()).unwrap_or_default();
        DatasetFolderState {
            dataset_id: prior.and_then(|p| p.dataset_id),
            dataset_name: config.dataset_name.clone(),
            folders: config
                .folders
                .iter()
                .map(|folder| planned_folder(folder, previous))
                .collect(),
        }
    }

    fn requires_replace(&self, planned: &DatasetFolderState, prior: &DatasetFolderState) -> bool {
        planned.dataset_name != prior.dataset_name
    }

    fn create(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &DatasetFolderState,
    ) -> Result<DatasetFolderState> {
        self.write(ctx, planned)
    }

    fn read(
        &self,
        _ctx: &mut ApplyContext<'_>,
        current: &DatasetFolderState,
    ) -> Result<Option<DatasetFolderState>> {
        let Some(dataset) = locate(self.api, current.dataset_id, &current.dataset_name)? else {
            return Ok(None);
        };
        let folders = from_wire_folders(dataset.folders.as_deref().unwrap_or_default()).map_err(
            |source| ProviderError::Folder {
                dataset_id: dataset.id,
                source,
            },
        )?;
        Ok(Some(DatasetFolderState {
            dataset_id: Some(dataset.id),
            dataset_name: dataset.table_name,
            folders,
        }))
    }

    fn update(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &DatasetFolderState,
        _prior: &DatasetFolderState,
    ) -> Result<DatasetFolderState> {
        self.write(ctx, planned)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &DatasetFolderState) -> Result<()> {
        let Some(dataset) = locate(self.api, current.dataset_id, &current.dataset_name)? else {
            return Ok(());
        };
        let put = DatasetPut {
            folders: Some(Vec::new()),
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

    fn import(&self, id: &str) -> Result<DatasetFolderState> {
        Ok(DatasetFolderState {
            dataset_id: Some(numeric_id("dataset", id)?),
            dataset_name: String::new(),
            folders: Vec::new(),
        })
    }
}
