//! Tag resource

use declarative::{ApplyContext, Lifecycle};
use serde::{Deserialize, Serialize};
use superset_client::{Api, Tag, TagPayload};

use super::non_empty;
use crate::error::{ProviderError, Result, call, missing_id, numeric_id};

pub const KIND: &str = "tag";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagState {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<Tag> for TagState {
    fn from(tag: Tag) -> Self {
        Self {
            id: Some(tag.id),
            name: tag.name,
            description: non_empty(tag.description),
        }
    }
}

/// A Superset tag
pub struct TagResource<'a> {
    pub api: &'a dyn Api,
}

impl TagResource<'_> {
    fn payload(state: &TagState) -> TagPayload {
        TagPayload {
            name: state.name.clone(),
            description: state.description.clone(),
        }
    }

    fn fetch(&self, id: i64) -> Result<TagState> {
        let tag = self
            .api
            .get_tag(id)
            .map_err(call(format!("read Tag with ID {id}")))?;
        Ok(tag.into())
    }
}

impl Lifecycle for TagResource<'_> {
    type Config = TagConfig;
    type State = TagState;
    type Error = ProviderError;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn plan(&self, config: &TagConfig, prior: Option<&TagState>) -> TagState {
        TagState {
            id: prior.and_then(|p| p.id),
            name: config.name.clone(),
            description: config.description.clone(),
        }
    }

    fn requires_replace(&self, planned: &TagState, prior: &TagState) -> bool {
        planned.name != prior.name
    }

    fn create(&self, _ctx: &mut ApplyContext<'_>, planned: &TagState) -> Result<TagState> {
        if let Some(existing) = self
            .api
            .find_tag(&planned.name)
            .map_err(call("validate Tag name uniqueness"))?
        {
            return Err(ProviderError::Conflict {
                kind: "Tag",
                field: "name",
                value: planned.name.clone(),
                id: existing.id,
            });
        }

        let id = self
            .api
            .create_tag(&Self::payload(planned))
            .map_err(call("create Tag"))?;
        log::debug!("created tag {} with id {id}", planned.name);
        self.fetch(id)
    }

    fn read(&self, _ctx: &mut ApplyContext<'_>, current: &TagState) -> Result<Option<TagState>> {
        let Some(id) = current.id else {
            return Ok(None);
        };
        match self.fetch(id) {
            Ok(state) => Ok(Some(state)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn update(
        &self,
        _ctx: &mut ApplyContext<'_>,
        planned: &TagState,
        prior: &TagState,
    ) -> Result<TagState> {
        let id = prior.id.ok_or_else(|| missing_id(KIND))?;
        self.api
            .update_tag(id, &Self::payload(planned))
            .map_err(call(format!("update Tag with ID {id}")))?;
        self.fetch(id)
    }

    fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &TagState) -> Result<()> {
        let id = current.id.ok_or_else(|| missing_id(KIND))?;
        match self.api.delete_tag(id) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ProviderError::client(format!("delete Tag with ID {id}"), e)),
        }
    }

    fn import(&self, id: &str) -> Result<TagState> {
        Ok(TagState {
            id: Some(numeric_id(KIND, id)?),
            name: String::new(),
            description: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{assert_converges, ctx};
    use declarative::Diagnose;
    use superset_client::MockApi;

    fn config(name: &str, description: Option<&str>) -> TagConfig {
        TagConfig {
            name: name.into(),
            description: description.map(String::from),
        }
    }

    #[test]
    fn test_create_read_converges() {
        let api = MockApi::new();
        let tags = TagResource { api: &api };
        let state = assert_converges(&tags, &config("finance", Some("Finance team")));
        assert!(state.id.is_some());
        assert_eq!(state.description.as_deref(), Some("Finance team"));
    }

    #[test]
    fn test_create_conflict_names_existing_id() {
        let api = MockApi::new();
        let existing = api
            .create_tag(&TagPayload {
                name: "finance".into(),
                description: None,
            })
            .unwrap();

        let tags = TagResource { api: &api };
        let err = tags
            .create(&mut ctx(), &tags.plan(&config("finance", None), None))
            .unwrap_err();
        assert_eq!(err.summary(), "Conflict");
        assert!(err.to_string().contains(&format!("ID {existing}")));
    }

    #[test]
    fn test_update_description_in_place() {
        let api = MockApi::new();
        let tags = TagResource { api: &api };
        let prior = assert_converges(&tags, &config("finance", None));

        let planned = tags.plan(&config("finance", Some("updated")), Some(&prior));
        assert!(!tags.requires_replace(&planned, &prior));
        let updated = tags.update(&mut ctx(), &planned, &prior).unwrap();
        assert_eq!(updated.id, prior.id);
        assert_eq!(updated.description.as_deref(), Some("updated"));
    }

    #[test]
    fn test_rename_requires_replace() {
        let api = MockApi::new();
        let tags = TagResource { api: &api };
        let prior = TagState {
            id: Some(1),
            name: "a".into(),
            description: None,
        };
        let planned = tags.plan(&config("b", None), Some(&prior));
        assert!(tags.requires_replace(&planned, &prior));
    }

    #[test]
    fn test_read_missing_clears_state() {
        let api = MockApi::new();
        let tags = TagResource { api: &api };
        let state = assert_converges(&tags, &config("finance", None));
        tags.delete(&mut ctx(), &state).unwrap();
        assert_eq!(tags.read(&mut ctx(), &state).unwrap(), None);
        // Deleting again is not an error
        tags.delete(&mut ctx(), &state).unwrap();
    }

    #[test]
    fn test_import_by_id() {
        let api = MockApi::new();
        let id = api
            .create_tag(&TagPayload {
                name: "ops".into(),
                description: Some("Operations".into()),
            })
            .unwrap();
        let tags = TagResource { api: &api };
        let seed = tags.import(&id.to_string()).unwrap();
        let state = tags.read(&mut ctx(), &seed).unwrap().unwrap();
        assert_eq!(state.name, "ops");
        assert_eq!(state.description.as_deref(), Some("Operations"));

        assert!(tags.import("ops").is_err());
    }
}
