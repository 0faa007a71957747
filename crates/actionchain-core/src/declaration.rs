//! Declarative state values as produced upstream for one endpoint.
//!
//! The planner only cares about two capabilities: whether a declaration's id
//! may be rewritten (it maps back to an action) and whether it accepts
//! requisites. Both are answered by explicit methods on [`StateDeclaration`].
//!
//! Every variant renders to the agent's state grammar:
//!
//! ```text
//! <id>:
//!   <module>.<function>:
//!     - <arg>: <value>
//!     - require:
//!         - <module>: <other id>
//! ```

use crate::error::{ActionChainError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

pub const MODULE_RUN: &str = "module.run";
pub const PKG_INSTALLED: &str = "pkg.installed";
pub const PATCH_INSTALLED: &str = "pkg.patch_installed";
pub const SYSTEM_REBOOT: &str = "system.reboot";

// ---------------------------------------------------------------------------
// Requisites
// ---------------------------------------------------------------------------

/// Target of a requisite: the state module and the declaration id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequisiteRef {
    pub module: String,
    pub id: String,
}

impl RequisiteRef {
    pub fn new(module: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            id: id.into(),
        }
    }

    fn to_value(&self) -> Value {
        let mut m = Mapping::new();
        m.insert(Value::from(self.module.as_str()), Value::from(self.id.as_str()));
        Value::Mapping(m)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requisites {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<RequisiteRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub onfail: Vec<RequisiteRef>,
}

impl Requisites {
    pub fn is_empty(&self) -> bool {
        self.require.is_empty() && self.onfail.is_empty()
    }

    pub fn add_require(&mut self, target: RequisiteRef) {
        self.require.push(target);
    }

    pub fn add_onfail(&mut self, target: RequisiteRef) {
        self.onfail.push(target);
    }

    fn append_to(&self, body: &mut Vec<Value>) {
        for (key, refs) in [("require", &self.require), ("onfail", &self.onfail)] {
            if !refs.is_empty() {
                let list = refs.iter().map(RequisiteRef::to_value).collect();
                body.push(single(key, Value::Sequence(list)));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Invocation of an execution module function through `module.run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRun {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Mapping,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<u64>,
    #[serde(default)]
    pub requisites: Requisites,
}

impl ModuleRun {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args: Mapping::new(),
            kwargs: None,
            action_id: None,
            requisites: Requisites::default(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(Value::from(key), value.into());
        self
    }

    pub fn with_kwarg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.kwargs
            .get_or_insert_with(Mapping::new)
            .insert(Value::from(key), value.into());
        self
    }

    pub fn with_action_id(mut self, action_id: u64) -> Self {
        self.action_id = Some(action_id);
        self
    }

    /// The state modules applied by this invocation, from the `mods` argument
    /// given either as a comma separated string or as a list.
    pub fn mods(&self) -> Vec<String> {
        match self.args.get("mods") {
            Some(Value::String(s)) => s
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            Some(Value::Sequence(list)) => list
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn applies_mod(&self, module: &str) -> bool {
        self.mods().iter().any(|m| m == module)
    }

    /// The `pillar` mapping passed in `kwargs`, if any.
    pub fn pillar(&self) -> Option<&Mapping> {
        self.kwargs.as_ref()?.get("pillar")?.as_mapping()
    }

    fn body(&self) -> Vec<Value> {
        let mut body = vec![single("name", Value::from(self.name.as_str()))];
        for (k, v) in &self.args {
            let mut m = Mapping::new();
            m.insert(k.clone(), v.clone());
            body.push(Value::Mapping(m));
        }
        if let Some(kwargs) = &self.kwargs {
            body.push(single("kwargs", Value::Mapping(kwargs.clone())));
        }
        self.requisites.append_to(&mut body);
        body
    }
}

/// Ensures a set of packages is installed, optionally at given versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkgInstalled {
    pub id: String,
    /// Package name to version; an empty version means "any".
    #[serde(default)]
    pub packages: Vec<(String, String)>,
    #[serde(default)]
    pub requisites: Requisites,
}

impl PkgInstalled {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            packages: Vec::new(),
            requisites: Requisites::default(),
        }
    }

    pub fn add_package(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.packages.push((name.into(), version.into()));
    }

    fn body(&self) -> Vec<Value> {
        let pkgs = self
            .packages
            .iter()
            .map(|(name, version)| {
                if version.is_empty() {
                    Value::from(name.as_str())
                } else {
                    single(name, Value::from(version.as_str()))
                }
            })
            .collect();
        let mut body = vec![single("pkgs", Value::Sequence(pkgs))];
        self.requisites.append_to(&mut body);
        body
    }
}

/// Ensures a set of patches (advisories) is installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchInstalled {
    pub id: String,
    #[serde(default)]
    pub patches: Vec<String>,
    #[serde(default)]
    pub requisites: Requisites,
}

impl PatchInstalled {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            patches: Vec::new(),
            requisites: Requisites::default(),
        }
    }

    pub fn add_patch(&mut self, patch: impl Into<String>) {
        self.patches.push(patch.into());
    }

    fn body(&self) -> Vec<Value> {
        let ids = self
            .patches
            .iter()
            .map(|p| Value::from(p.as_str()))
            .collect();
        let mut body = vec![single("advisory_ids", Value::Sequence(ids))];
        self.requisites.append_to(&mut body);
        body
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemReboot {
    pub id: String,
    /// Delay before the reboot, in minutes.
    #[serde(default)]
    pub minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<u64>,
    #[serde(default)]
    pub requisites: Requisites,
}

impl SystemReboot {
    pub fn new(id: impl Into<String>, minutes: u32) -> Self {
        Self {
            id: id.into(),
            minutes,
            action_id: None,
            requisites: Requisites::default(),
        }
    }

    pub fn with_action_id(mut self, action_id: u64) -> Self {
        self.action_id = Some(action_id);
        self
    }

    fn body(&self) -> Vec<Value> {
        let mut body = vec![
            single("name", Value::from(SYSTEM_REBOOT)),
            single("at_time", Value::from(self.minutes)),
        ];
        self.requisites.append_to(&mut body);
        body
    }
}

/// Any other state, passed through verbatim. It neither maps to an action
/// nor accepts requisites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericState {
    pub id: String,
    /// The `<module>.<function>` key, e.g. `file.managed`.
    pub state: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl GenericState {
    pub fn new(id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: state.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.push(single(key, value.into()));
        self
    }
}

// ---------------------------------------------------------------------------
// StateDeclaration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateDeclaration {
    ModuleRun(ModuleRun),
    PkgInstalled(PkgInstalled),
    PatchInstalled(PatchInstalled),
    SystemReboot(SystemReboot),
    State(GenericState),
}

impl StateDeclaration {
    pub fn id(&self) -> &str {
        match self {
            StateDeclaration::ModuleRun(s) => &s.id,
            StateDeclaration::PkgInstalled(s) => &s.id,
            StateDeclaration::PatchInstalled(s) => &s.id,
            StateDeclaration::SystemReboot(s) => &s.id,
            StateDeclaration::State(s) => &s.id,
        }
    }

    /// The `<module>.<function>` this declaration renders under.
    pub fn state_fn(&self) -> &str {
        match self {
            StateDeclaration::ModuleRun(_) | StateDeclaration::SystemReboot(_) => MODULE_RUN,
            StateDeclaration::PkgInstalled(_) => PKG_INSTALLED,
            StateDeclaration::PatchInstalled(_) => PATCH_INSTALLED,
            StateDeclaration::State(s) => &s.state,
        }
    }

    /// Identifiable declarations carry an action-chain state id that the
    /// planner extends with the chunk number.
    pub fn is_identifiable(&self) -> bool {
        matches!(
            self,
            StateDeclaration::ModuleRun(_) | StateDeclaration::SystemReboot(_)
        )
    }

    pub fn supports_requisites(&self) -> bool {
        !matches!(self, StateDeclaration::State(_))
    }

    pub fn id_mut(&mut self) -> Option<&mut String> {
        match self {
            StateDeclaration::ModuleRun(s) => Some(&mut s.id),
            StateDeclaration::SystemReboot(s) => Some(&mut s.id),
            _ => None,
        }
    }

    pub fn requisites(&self) -> Option<&Requisites> {
        match self {
            StateDeclaration::ModuleRun(s) => Some(&s.requisites),
            StateDeclaration::PkgInstalled(s) => Some(&s.requisites),
            StateDeclaration::PatchInstalled(s) => Some(&s.requisites),
            StateDeclaration::SystemReboot(s) => Some(&s.requisites),
            StateDeclaration::State(_) => None,
        }
    }

    pub fn requisites_mut(&mut self) -> Option<&mut Requisites> {
        match self {
            StateDeclaration::ModuleRun(s) => Some(&mut s.requisites),
            StateDeclaration::PkgInstalled(s) => Some(&mut s.requisites),
            StateDeclaration::PatchInstalled(s) => Some(&mut s.requisites),
            StateDeclaration::SystemReboot(s) => Some(&mut s.requisites),
            StateDeclaration::State(_) => None,
        }
    }

    /// The action this declaration was generated for, if known.
    pub fn action_id(&self) -> Option<u64> {
        match self {
            StateDeclaration::ModuleRun(s) => s.action_id,
            StateDeclaration::SystemReboot(s) => s.action_id,
            _ => None,
        }
    }

    pub fn as_module_run(&self) -> Option<&ModuleRun> {
        match self {
            StateDeclaration::ModuleRun(s) => Some(s),
            _ => None,
        }
    }

    /// Resolve the requisite target pointing at this declaration.
    ///
    /// Fails when the state function is not of the form `<module>.<function>`
    /// or the id is empty.
    pub fn requisite_ref(&self) -> Result<RequisiteRef> {
        let state_fn = self.state_fn();
        let mut parts = state_fn.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(module), Some(function), None)
                if !module.is_empty() && !function.is_empty() && !self.id().is_empty() =>
            {
                Ok(RequisiteRef::new(module, self.id()))
            }
            _ => Err(ActionChainError::MalformedRequisite(format!(
                "{}: {state_fn}",
                self.id()
            ))),
        }
    }

    /// Render as a single `{id: {state_fn: [...]}}` mapping.
    pub fn to_sls(&self) -> Mapping {
        let body = match self {
            StateDeclaration::ModuleRun(s) => s.body(),
            StateDeclaration::PkgInstalled(s) => s.body(),
            StateDeclaration::PatchInstalled(s) => s.body(),
            StateDeclaration::SystemReboot(s) => s.body(),
            StateDeclaration::State(s) => s.args.clone(),
        };
        let mut inner = Mapping::new();
        inner.insert(Value::from(self.state_fn()), Value::Sequence(body));
        let mut outer = Mapping::new();
        outer.insert(Value::from(self.id()), Value::Mapping(inner));
        outer
    }
}

impl From<ModuleRun> for StateDeclaration {
    fn from(s: ModuleRun) -> Self {
        StateDeclaration::ModuleRun(s)
    }
}

impl From<PkgInstalled> for StateDeclaration {
    fn from(s: PkgInstalled) -> Self {
        StateDeclaration::PkgInstalled(s)
    }
}

impl From<PatchInstalled> for StateDeclaration {
    fn from(s: PatchInstalled) -> Self {
        StateDeclaration::PatchInstalled(s)
    }
}

impl From<SystemReboot> for StateDeclaration {
    fn from(s: SystemReboot) -> Self {
        StateDeclaration::SystemReboot(s)
    }
}

impl From<GenericState> for StateDeclaration {
    fn from(s: GenericState) -> Self {
        StateDeclaration::State(s)
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut m = Mapping::new();
    m.insert(Value::from(key), value);
    Value::Mapping(m)
}
