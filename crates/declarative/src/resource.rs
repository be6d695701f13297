//! Resource lifecycle for declarative state management
//!
//! A resource kind implements [`Lifecycle`]: how to turn its configuration
//! into a planned state and how to create, read, update and delete the
//! remote object. [`Instance`] binds one declared (or previously recorded)
//! object to its lifecycle and exposes it to the planner and executor
//! through the object-safe [`Resource`] trait.

use crate::context::ApplyContext;
use crate::diagnostics::{Diagnose, Diagnostics};
use crate::diff::{ResourceDiff, diff_values};
use crate::timeouts::{Operation, Timeouts};
use crate::types::{Action, Address, ApplyResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Behaviour of one resource kind
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, Diagnose, Lifecycle};
///
/// struct TagLifecycle<'a> {
///     api: &'a dyn Api,
/// }
///
/// impl Lifecycle for TagLifecycle<'_> {
///     type Config = TagConfig;
///     type State = TagState;
///     type Error = ProviderError;
///
///     fn kind(&self) -> &'static str {
///         "tag"
///     }
///
///     fn plan(&self, config: &TagConfig, prior: Option<&TagState>) -> TagState {
///         TagState {
///             id: prior.and_then(|p| p.id),
///             name: config.name.clone(),
///         }
///     }
///
///     fn create(&self, _ctx: &mut ApplyContext<'_>, planned: &TagState) -> Result<TagState, ProviderError> {
///         let id = self.api.create_tag(&planned.name)?;
///         Ok(TagState { id: Some(id), ..planned.clone() })
///     }
///
///     // read, update, delete, import ...
/// }
/// ```
pub trait Lifecycle {
    /// Declared attributes as written by the user
    type Config: fmt::Debug;
    /// Attributes recorded after the last successful operation
    type State: fmt::Debug + Clone + Serialize + DeserializeOwned;
    type Error: Diagnose;

    /// Kind name used in addresses (e.g. `dataset_columns`)
    fn kind(&self) -> &'static str;

    /// Check the configuration without touching the remote service
    fn validate(_config: &Self::Config, _diags: &mut Diagnostics) {}

    /// Compute the state the configuration asks for
    ///
    /// `prior` is the last recorded state; computed attributes (ids,
    /// identifiers assigned by the server) are carried over from it.
    fn plan(&self, config: &Self::Config, prior: Option<&Self::State>) -> Self::State;

    /// Whether moving from `prior` to `planned` needs destroy-then-create
    fn requires_replace(&self, _planned: &Self::State, _prior: &Self::State) -> bool {
        false
    }

    /// Attribute paths whose values must not be displayed
    fn sensitive(&self) -> &'static [&'static str] {
        &[]
    }

    fn create(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &Self::State,
    ) -> Result<Self::State, Self::Error>;

    /// Fetch the live state, or `None` if the remote object is gone
    fn read(
        &self,
        ctx: &mut ApplyContext<'_>,
        current: &Self::State,
    ) -> Result<Option<Self::State>, Self::Error>;

    fn update(
        &self,
        ctx: &mut ApplyContext<'_>,
        planned: &Self::State,
        prior: &Self::State,
    ) -> Result<Self::State, Self::Error>;

    fn delete(&self, ctx: &mut ApplyContext<'_>, current: &Self::State) -> Result<(), Self::Error>;

    /// Turn an import identifier into a seed state for the first read
    fn import(&self, id: &str) -> Result<Self::State, Self::Error>;
}

/// Failure to move recorded state in or out of its typed form
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to decode recorded state for {address}: {source}")]
    Decode {
        address: Address,
        source: serde_json::Error,
    },

    #[error("Failed to encode state for {address}: {source}")]
    Encode {
        address: Address,
        source: serde_json::Error,
    },
}

/// Object-safe view of a resource instance
///
/// The planner and executor only ever see this trait, so instances of
/// different kinds can live in one plan.
pub trait Resource {
    fn address(&self) -> &Address;

    fn timeouts(&self) -> Timeouts;

    /// Whether the resource is declared in configuration
    fn is_declared(&self) -> bool;

    /// Whether the resource has recorded state
    fn is_tracked(&self) -> bool;

    /// Offline validation of the declared configuration
    fn validate(&self) -> Diagnostics;

    /// Re-read the remote object and replace the recorded state
    fn refresh(&mut self, ctx: &mut ApplyContext<'_>);

    /// Compare the declared configuration against the recorded state
    fn diff(&self) -> Result<ResourceDiff, StateError>;

    /// Carry out `action`, recording diagnostics into `ctx`
    fn apply(&mut self, ctx: &mut ApplyContext<'_>, action: Action) -> ApplyResult;

    /// Adopt an existing remote object identified by `id`
    fn import(&mut self, ctx: &mut ApplyContext<'_>, id: &str) -> ApplyResult;

    /// Recorded state in its persisted form
    fn state_value(&self) -> Result<Option<Value>, StateError>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource<'a> = Box<dyn Resource + 'a>;

/// One resource instance bound to its lifecycle
pub struct Instance<L: Lifecycle> {
    lifecycle: L,
    address: Address,
    config: Option<L::Config>,
    state: Option<L::State>,
    timeouts: Timeouts,
}

impl<L: Lifecycle> Instance<L> {
    pub fn new(lifecycle: L, name: impl Into<String>) -> Self {
        let address = Address::new(lifecycle.kind(), name);
        Self {
            lifecycle,
            address,
            config: None,
            state: None,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_config(mut self, config: L::Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_state(mut self, state: L::State) -> Self {
        self.state = Some(state);
        self
    }

    /// Load recorded state from its persisted form
    pub fn with_state_value(mut self, value: Value) -> Result<Self, StateError> {
        let state = serde_json::from_value(value).map_err(|source| StateError::Decode {
            address: self.address.clone(),
            source,
        })?;
        self.state = Some(state);
        Ok(self)
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn state(&self) -> Option<&L::State> {
        self.state.as_ref()
    }

    fn encode(&self, state: &L::State) -> Result<Value, StateError> {
        serde_json::to_value(state).map_err(|source| StateError::Encode {
            address: self.address.clone(),
            source,
        })
    }

    fn fail(ctx: &mut ApplyContext<'_>, error: &L::Error) -> ApplyResult {
        ctx.diagnostics.add_failure(error);
        ApplyResult::Failed {
            error: error.to_string(),
        }
    }

    fn missing(&self, ctx: &mut ApplyContext<'_>, what: &str) -> ApplyResult {
        let detail = format!("{} has no {what}", self.address);
        ctx.diagnostics.add_error("Invalid Plan", detail.clone());
        ApplyResult::Failed { error: detail }
    }

    fn create(&mut self, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyResult> {
        let Some(config) = &self.config else {
            return Err(self.missing(ctx, "configuration"));
        };
        let planned = self.lifecycle.plan(config, None);
        let lifecycle = &self.lifecycle;
        match ctx.bounded(Operation::Create, |ctx| lifecycle.create(ctx, &planned)) {
            Ok(state) => {
                self.state = Some(state);
                Ok(())
            }
            Err(e) => Err(Self::fail(ctx, &e)),
        }
    }

    fn delete(&mut self, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyResult> {
        let Some(current) = &self.state else {
            return Ok(());
        };
        let lifecycle = &self.lifecycle;
        match ctx.bounded(Operation::Delete, |ctx| lifecycle.delete(ctx, current)) {
            Ok(()) => {
                self.state = None;
                Ok(())
            }
            Err(e) => Err(Self::fail(ctx, &e)),
        }
    }

    fn update(&mut self, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyResult> {
        let (Some(config), Some(prior)) = (&self.config, &self.state) else {
            return Err(self.missing(ctx, "configuration or recorded state"));
        };
        let planned = self.lifecycle.plan(config, Some(prior));
        let lifecycle = &self.lifecycle;
        match ctx.bounded(Operation::Update, |ctx| lifecycle.update(ctx, &planned, prior)) {
            Ok(state) => {
                self.state = Some(state);
                Ok(())
            }
            Err(e) => Err(Self::fail(ctx, &e)),
        }
    }
}

impl<L: Lifecycle> Resource for Instance<L> {
    fn address(&self) -> &Address {
        &self.address
    }

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn is_declared(&self) -> bool {
        self.config.is_some()
    }

    fn is_tracked(&self) -> bool {
        self.state.is_some()
    }

    fn validate(&self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if let Some(config) = &self.config {
            L::validate(config, &mut diags);
        }
        diags
    }

    fn refresh(&mut self, ctx: &mut ApplyContext<'_>) {
        let Some(current) = &self.state else {
            return;
        };
        let lifecycle = &self.lifecycle;
        match ctx.bounded(Operation::Read, |ctx| lifecycle.read(ctx, current)) {
            Ok(Some(state)) => self.state = Some(state),
            Ok(None) => {
                log::info!("{} no longer exists remotely, dropping it from state", self.address);
                self.state = None;
            }
            Err(e) => {
                log::debug!("refresh of {} failed: {e}", self.address);
                ctx.diagnostics.add_failure(&e);
            }
        }
    }

    fn diff(&self) -> Result<ResourceDiff, StateError> {
        let sensitive = self.lifecycle.sensitive();
        let (action, changes) = match (&self.config, &self.state) {
            (Some(config), None) => {
                let planned = self.encode(&self.lifecycle.plan(config, None))?;
                (Action::Create, diff_values(None, Some(&planned), sensitive))
            }
            (Some(config), Some(prior)) => {
                let planned = self.lifecycle.plan(config, Some(prior));
                let changes = diff_values(
                    Some(&self.encode(prior)?),
                    Some(&self.encode(&planned)?),
                    sensitive,
                );
                let action = if changes.is_empty() {
                    Action::NoOp
                } else if self.lifecycle.requires_replace(&planned, prior) {
                    Action::Replace
                } else {
                    Action::Update
                };
                (action, changes)
            }
            (None, Some(prior)) => {
                let prior = self.encode(prior)?;
                (Action::Delete, diff_values(Some(&prior), None, sensitive))
            }
            (None, None) => (Action::NoOp, Vec::new()),
        };
        Ok(ResourceDiff::new(self.address.clone(), action, changes))
    }

    fn apply(&mut self, ctx: &mut ApplyContext<'_>, action: Action) -> ApplyResult {
        log::debug!("{} {}", action, self.address);
        let outcome = match action {
            Action::NoOp => return ApplyResult::NoChange,
            Action::Create => self.create(ctx).map(|()| ApplyResult::Created),
            Action::Update => self.update(ctx).map(|()| ApplyResult::Modified),
            Action::Replace => self
                .delete(ctx)
                .and_then(|()| self.create(ctx))
                .map(|()| ApplyResult::Replaced),
            Action::Delete => self.delete(ctx).map(|()| ApplyResult::Removed),
        };
        outcome.unwrap_or_else(|failed| failed)
    }

    fn import(&mut self, ctx: &mut ApplyContext<'_>, id: &str) -> ApplyResult {
        let seed = match self.lifecycle.import(id) {
            Ok(seed) => seed,
            Err(e) => return Self::fail(ctx, &e),
        };
        let lifecycle = &self.lifecycle;
        match ctx.bounded(Operation::Read, |ctx| lifecycle.read(ctx, &seed)) {
            Ok(Some(state)) => {
                self.state = Some(state);
                ApplyResult::Imported
            }
            Ok(None) => {
                let detail = format!(
                    "Cannot import non-existent remote object: {} with ID {id} was not found",
                    self.address.kind
                );
                ctx.diagnostics.add_error("Import Error", detail.clone());
                ApplyResult::Failed { error: detail }
            }
            Err(e) => Self::fail(ctx, &e),
        }
    }

    fn state_value(&self) -> Result<Option<Value>, StateError> {
        self.state.as_ref().map(|s| self.encode(s)).transpose()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::Deserialize;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    #[derive(Debug, Error)]
    #[error("{0}")]
    pub struct TestError(pub String);

    impl Diagnose for TestError {
        fn summary(&self) -> &'static str {
            "Client Error"
        }
    }

    #[derive(Debug, Clone)]
    pub struct TestConfig {
        pub name: String,
        pub label: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TestState {
        pub id: Option<i64>,
        pub name: String,
        pub label: String,
    }

    /// In-memory remote store keyed by id
    #[derive(Default)]
    pub struct Remote {
        pub objects: RefCell<BTreeMap<i64, (String, String)>>,
        pub log: RefCell<Vec<String>>,
        pub fail_on: RefCell<Option<&'static str>>,
    }

    impl Remote {
        fn check(&self, op: &'static str) -> Result<(), TestError> {
            self.log.borrow_mut().push(op.to_string());
            if *self.fail_on.borrow() == Some(op) {
                return Err(TestError(format!("{op} failed")));
            }
            Ok(())
        }
    }

    pub struct TestLifecycle<'a> {
        pub remote: &'a Remote,
    }

    impl Lifecycle for TestLifecycle<'_> {
        type Config = TestConfig;
        type State = TestState;
        type Error = TestError;

        fn kind(&self) -> &'static str {
            "thing"
        }

        fn validate(config: &TestConfig, diags: &mut Diagnostics) {
            if config.name.is_empty() {
                diags.add_error("Invalid Configuration", "name must not be empty");
            }
        }

        fn plan(&self, config: &TestConfig, prior: Option<&TestState>) -> TestState {
            TestState {
                id: prior.and_then(|p| p.id),
                name: config.name.clone(),
                label: config.label.clone(),
            }
        }

        fn requires_replace(&self, planned: &TestState, prior: &TestState) -> bool {
            planned.name != prior.name
        }

        fn create(&self, _ctx: &mut ApplyContext<'_>, planned: &TestState) -> Result<TestState, TestError> {
            self.remote.check("create")?;
            let mut objects = self.remote.objects.borrow_mut();
            let id = objects.keys().next_back().copied().unwrap_or(0) + 1;
            objects.insert(id, (planned.name.clone(), planned.label.clone()));
            Ok(TestState {
                id: Some(id),
                ..planned.clone()
            })
        }

        fn read(&self, _ctx: &mut ApplyContext<'_>, current: &TestState) -> Result<Option<TestState>, TestError> {
            self.remote.check("read")?;
            let Some(id) = current.id else {
                return Ok(None);
            };
            Ok(self
                .remote
                .objects
                .borrow()
                .get(&id)
                .map(|(name, label)| TestState {
                    id: Some(id),
                    name: name.clone(),
                    label: label.clone(),
                }))
        }

        fn update(
            &self,
            _ctx: &mut ApplyContext<'_>,
            planned: &TestState,
            prior: &TestState,
        ) -> Result<TestState, TestError> {
            self.remote.check("update")?;
            let id = prior.id.ok_or_else(|| TestError("no id".into()))?;
            self.remote
                .objects
                .borrow_mut()
                .insert(id, (planned.name.clone(), planned.label.clone()));
            Ok(planned.clone())
        }

        fn delete(&self, _ctx: &mut ApplyContext<'_>, current: &TestState) -> Result<(), TestError> {
            self.remote.check("delete")?;
            if let Some(id) = current.id {
                self.remote.objects.borrow_mut().remove(&id);
            }
            Ok(())
        }

        fn import(&self, id: &str) -> Result<TestState, TestError> {
            let id = id
                .parse()
                .map_err(|_| TestError(format!("invalid import ID {id:?}")))?;
            Ok(TestState {
                id: Some(id),
                name: String::new(),
                label: String::new(),
            })
        }
    }

    pub fn config(name: &str, label: &str) -> TestConfig {
        TestConfig {
            name: name.into(),
            label: label.into(),
        }
    }

    fn ctx() -> ApplyContext<'static> {
        ApplyContext::new(false, false)
    }

    #[test]
    fn test_create_then_noop() {
        let remote = Remote::default();
        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "a").with_config(config("a", "A"));

        let diff = instance.diff().unwrap();
        assert_eq!(diff.action, Action::Create);
        assert_eq!(diff.changes.len(), 2);

        let mut ctx = ctx();
        assert_eq!(instance.apply(&mut ctx, Action::Create), ApplyResult::Created);
        assert_eq!(instance.state().unwrap().id, Some(1));
        assert_eq!(instance.diff().unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_label_change_updates_in_place() {
        let remote = Remote::default();
        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "a").with_config(config("a", "A"));
        instance.apply(&mut ctx(), Action::Create);

        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "a")
            .with_config(config("a", "B"))
            .with_state(instance.state().unwrap().clone());

        let diff = instance.diff().unwrap();
        assert_eq!(diff.action, Action::Update);
        assert_eq!(diff.changes[0].path, "label");

        assert_eq!(instance.apply(&mut ctx(), Action::Update), ApplyResult::Modified);
        assert_eq!(remote.objects.borrow()[&1].1, "B");
    }

    #[test]
    fn test_name_change_replaces() {
        let remote = Remote::default();
        let prior = TestState {
            id: Some(7),
            name: "old".into(),
            label: "A".into(),
        };
        remote.objects.borrow_mut().insert(7, ("old".into(), "A".into()));

        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "a")
            .with_config(config("new", "A"))
            .with_state(prior);

        assert_eq!(instance.diff().unwrap().action, Action::Replace);
        assert_eq!(instance.apply(&mut ctx(), Action::Replace), ApplyResult::Replaced);

        assert_eq!(*remote.log.borrow(), vec!["delete", "create"]);
        assert!(!remote.objects.borrow().contains_key(&7));
        assert_eq!(instance.state().unwrap().name, "new");
    }

    #[test]
    fn test_undeclared_state_is_deleted() {
        let remote = Remote::default();
        remote.objects.borrow_mut().insert(3, ("gone".into(), String::new()));
        let state = serde_json::json!({"id": 3, "name": "gone", "label": ""});

        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "gone")
            .with_state_value(state)
            .unwrap();

        assert_eq!(instance.diff().unwrap().action, Action::Delete);
        assert_eq!(instance.apply(&mut ctx(), Action::Delete), ApplyResult::Removed);
        assert!(instance.state_value().unwrap().is_none());
    }

    #[test]
    fn test_failure_is_recorded_as_diagnostic() {
        let remote = Remote::default();
        *remote.fail_on.borrow_mut() = Some("create");
        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "a").with_config(config("a", "A"));

        let mut ctx = ctx();
        let result = instance.apply(&mut ctx, Action::Create);

        assert!(!result.is_success());
        assert!(ctx.diagnostics.has_error());
        assert_eq!(ctx.diagnostics.iter().next().unwrap().summary, "Client Error");
        assert!(instance.state().is_none());
    }

    #[test]
    fn test_refresh_drops_vanished_object() {
        let remote = Remote::default();
        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "a").with_state(TestState {
            id: Some(9),
            name: "a".into(),
            label: String::new(),
        });

        let mut ctx = ctx();
        instance.refresh(&mut ctx);
        assert!(instance.state().is_none());
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn test_refresh_error_keeps_state() {
        let remote = Remote::default();
        *remote.fail_on.borrow_mut() = Some("read");
        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "a").with_state(TestState {
            id: Some(9),
            name: "a".into(),
            label: String::new(),
        });

        let mut ctx = ctx();
        instance.refresh(&mut ctx);
        assert!(instance.state().is_some());
        assert!(ctx.diagnostics.has_error());
    }

    #[test]
    fn test_import_existing_and_missing() {
        let remote = Remote::default();
        remote.objects.borrow_mut().insert(4, ("found".into(), "L".into()));

        let mut instance = Instance::new(TestLifecycle { remote: &remote }, "found");
        assert_eq!(instance.import(&mut ctx(), "4"), ApplyResult::Imported);
        assert_eq!(instance.state().unwrap().label, "L");

        let mut missing = Instance::new(TestLifecycle { remote: &remote }, "missing");
        let mut ctx = ctx();
        let result = missing.import(&mut ctx, "5");
        match result {
            ApplyResult::Failed { error } => {
                assert!(error.starts_with("Cannot import non-existent remote object"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(missing.state().is_none());
    }

    #[test]
    fn test_validate_uses_static_check() {
        let remote = Remote::default();
        let instance = Instance::new(TestLifecycle { remote: &remote }, "a").with_config(config("", "A"));
        assert!(instance.validate().has_error());
    }
}
