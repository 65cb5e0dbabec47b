//! Loaded packages and their modules.

use crate::error::SessionError;
use nnp_core::manifest::DEFAULT_MAIN;
use nnp_core::{parse_dependencies, CfgContext, Manifest, PredicateCache, Requirement, Selector};
use semver::Version;
use serde_json::{Map, Value};
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// A package registered in a session.
///
/// Holds the manifest, the effective fields computed when it was loaded and
/// the cache of modules created from it.
#[derive(Debug)]
pub struct Package {
    manifest: Manifest,
    name: String,
    version: Version,
    effective: Map<String, Value>,
    dependencies: Vec<(String, Requirement)>,
    modules: RefCell<HashMap<String, Rc<Module>>>,
}

impl Package {
    /// Build a package from its manifest, evaluating `cfg(...)` fields once.
    pub(crate) fn new(
        manifest: Manifest,
        cache: &PredicateCache,
        ctx: &mut CfgContext,
    ) -> Result<Rc<Self>, SessionError> {
        let name = manifest.name()?.full_name();
        let version = manifest.version()?;
        let effective = manifest.effective(cache, ctx)?;
        let dependencies = parse_dependencies(&effective)?;

        Ok(Rc::new(Self {
            manifest,
            name,
            version,
            effective,
            dependencies,
            modules: RefCell::new(HashMap::new()),
        }))
    }

    /// Full package name (`@scope/name` or `name`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// `name@version`.
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Directory the manifest was loaded from.
    pub fn directory(&self) -> Option<&Path> {
        self.manifest.directory()
    }

    /// Fields active under the session configuration.
    pub fn effective(&self) -> &Map<String, Value> {
        &self.effective
    }

    /// Active dependencies in declaration order.
    pub fn dependencies(&self) -> &[(String, Requirement)] {
        &self.dependencies
    }

    /// Version selector this package declares for `name`.
    ///
    /// `None` when the dependency is not declared or is not a registry
    /// requirement.
    pub fn dependency_selector(&self, name: &str) -> Option<&Selector> {
        self.dependencies
            .iter()
            .find(|(dep, _)| dep == name)
            .and_then(|(_, req)| req.selector())
    }

    /// Default module path, honouring conditional `main` fields.
    pub fn main(&self) -> &str {
        self.effective
            .get("main")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MAIN)
    }

    /// A cached module, if it was loaded before.
    pub fn module(&self, name: &str) -> Option<Rc<Module>> {
        self.modules.borrow().get(name).cloned()
    }

    /// All modules loaded so far, sorted by name.
    pub fn modules(&self) -> Vec<Rc<Module>> {
        let mut modules: Vec<Rc<Module>> = self.modules.borrow().values().cloned().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    /// Get or create the module at `path`.
    ///
    /// `None` or a path that normalizes to the package root loads the
    /// default module. Repeated calls return the same `Rc`.
    ///
    /// # Errors
    /// Returns `InvalidOperation` if the path climbs above the package root.
    pub fn load_module(self: &Rc<Self>, path: Option<&str>) -> Result<Rc<Module>, SessionError> {
        let mut name = match path {
            Some(path) => nnp_util::path::normalize_module_path(path).ok_or_else(|| {
                SessionError::invalid_operation(format!(
                    "module path \"{path}\" escapes package \"{}\"",
                    self.name
                ))
            })?,
            None => String::new(),
        };
        if name.is_empty() {
            name = nnp_util::path::normalize_module_path(self.main())
                .filter(|main| !main.is_empty())
                .ok_or_else(|| {
                    SessionError::invalid_operation(format!(
                        "package \"{}\" has an invalid main \"{}\"",
                        self.name,
                        self.main()
                    ))
                })?;
        }

        let mut modules = self.modules.borrow_mut();
        let module = modules.entry(name).or_insert_with_key(|name| {
            Rc::new(Module {
                name: name.clone(),
                package: Rc::downgrade(self),
                namespace: RefCell::new(Map::new()),
                state: Cell::new(ModuleState::Unexecuted),
            })
        });
        Ok(Rc::clone(module))
    }
}

/// Execution state of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Unexecuted,
    Executing,
    Executed,
}

/// A module inside a package.
///
/// The namespace is filled by the executor. While the module is executing
/// it may be observed half populated by a cyclic require.
#[derive(Debug)]
pub struct Module {
    name: String,
    package: Weak<Package>,
    namespace: RefCell<Map<String, Value>>,
    state: Cell<ModuleState>,
}

impl Module {
    /// Normalized module path inside the package (`lib/util`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning package, unless the session was dropped.
    pub fn package(&self) -> Option<Rc<Package>> {
        self.package.upgrade()
    }

    /// `name@version/module`.
    pub fn identifier(&self) -> String {
        match self.package() {
            Some(package) => format!("{}/{}", package.identifier(), self.name),
            None => self.name.clone(),
        }
    }

    /// Filesystem location without extension.
    pub fn path(&self) -> Option<PathBuf> {
        let package = self.package()?;
        let mut path = package.directory()?.to_path_buf();
        path.extend(self.name.split('/'));
        Some(path)
    }

    pub fn state(&self) -> ModuleState {
        self.state.get()
    }

    pub fn is_executed(&self) -> bool {
        self.state.get() == ModuleState::Executed
    }

    pub(crate) fn set_state(&self, state: ModuleState) {
        self.state.set(state);
    }

    pub fn namespace(&self) -> Ref<'_, Map<String, Value>> {
        self.namespace.borrow()
    }

    /// Clone of one exported value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.namespace.borrow().get(key).cloned()
    }

    /// Export a value, replacing any previous one.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.namespace.borrow_mut().insert(key.into(), value);
    }

    pub(crate) fn clear(&self) {
        self.namespace.borrow_mut().clear();
    }
}
