//! Module resolution sessions.

use crate::error::SessionError;
use crate::executor::{Executor, Require};
use crate::finder::{DirectoryFinder, Finder};
use crate::package::{Module, ModuleState, Package};
use nnp_core::{Config, Manifest, PackageRef, PkgError, PredicateCache, Selector};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Hook consulted before a named package is required.
///
/// Returning an error aborts the require, e.g. to reject packages the
/// origin does not declare as dependencies.
pub trait RequireObserver {
    /// # Errors
    /// Any error is returned from the require unchanged.
    fn on_require(&self, origin: Option<&Rc<Module>>, package: &str) -> Result<(), SessionError>;
}

/// Everything a session owns apart from its executor.
pub(crate) struct SessionState {
    pub(crate) config: Config,
    pub(crate) cache: Arc<PredicateCache>,
    pub(crate) finders: Vec<Box<dyn Finder>>,
    pub(crate) packages: BTreeMap<String, Rc<Package>>,
    pub(crate) stack: Vec<Rc<Module>>,
    pub(crate) observer: Option<Box<dyn RequireObserver>>,
    pub(crate) host_paths: Vec<PathBuf>,
}

/// A module resolution session.
///
/// Packages are loaded at most once per session and each module executes at
/// most once. A session is single threaded; use one per thread.
pub struct Session {
    state: SessionState,
    executor: Box<dyn Executor>,
}

impl Session {
    /// Create a session searching the directories of `config.search_path()`.
    pub fn new(config: Config, executor: impl Executor + 'static) -> Self {
        let finders = config
            .search_path()
            .into_iter()
            .map(|dir| Box::new(DirectoryFinder::new(dir)) as Box<dyn Finder>)
            .collect();
        Self::with_finders(config, finders, executor)
    }

    /// Create a session with an explicit finder list.
    pub fn with_finders(
        config: Config,
        finders: Vec<Box<dyn Finder>>,
        executor: impl Executor + 'static,
    ) -> Self {
        Self {
            state: SessionState {
                config,
                cache: PredicateCache::global(),
                finders,
                packages: BTreeMap::new(),
                stack: Vec::new(),
                observer: None,
                host_paths: Vec::new(),
            },
            executor: Box::new(executor),
        }
    }

    /// Use `cache` instead of the process-wide predicate cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<PredicateCache>) -> Self {
        self.state.cache = cache;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl RequireObserver + 'static) -> Self {
        self.state.observer = Some(Box::new(observer));
        self
    }

    /// Append a finder; it is consulted after the existing ones.
    pub fn add_finder(&mut self, finder: impl Finder + 'static) {
        self.state.finders.push(Box::new(finder));
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn cache(&self) -> &Arc<PredicateCache> {
        &self.state.cache
    }

    pub fn finders(&self) -> &[Box<dyn Finder>] {
        &self.state.finders
    }

    /// Loaded packages, sorted by name.
    pub fn packages(&self) -> impl Iterator<Item = &Rc<Package>> {
        self.state.packages.values()
    }

    pub fn package(&self, name: &str) -> Option<&Rc<Package>> {
        self.state.packages.get(name)
    }

    /// The module currently executing, if any.
    pub fn current_module(&self) -> Option<&Rc<Module>> {
        self.state.stack.last()
    }

    /// Host module directories injected by active [`SessionScope`]s.
    pub fn host_paths(&self) -> &[PathBuf] {
        &self.state.host_paths
    }

    /// Load a package, reusing the loaded one if present.
    ///
    /// # Errors
    /// Returns `DependencyMismatch` if a loaded package does not satisfy
    /// `selector`, `PackageNotFound` if no finder has it, or a manifest
    /// error. Nothing is registered on failure.
    pub fn load_package(
        &mut self,
        name: &str,
        selector: Option<&Selector>,
    ) -> Result<Rc<Package>, SessionError> {
        load_package_in(&mut self.state, name, selector)
    }

    /// Register a package from a manifest.
    ///
    /// # Errors
    /// Returns `InvalidOperation` if a package of that name is already
    /// loaded, or a manifest error.
    pub fn add_package(&mut self, manifest: Manifest) -> Result<Rc<Package>, SessionError> {
        add_package_in(&mut self.state, manifest)
    }

    /// Resolve a reference to a module without executing it.
    ///
    /// # Errors
    /// See [`Session::require`].
    pub fn resolve(
        &mut self,
        reference: &str,
        origin: Option<&Rc<Module>>,
    ) -> Result<Rc<Module>, SessionError> {
        resolve_in(&mut self.state, reference, origin)
    }

    /// Resolve a reference and, if `execute` is set, execute the module
    /// unless it already ran.
    ///
    /// `./` and `../` references are relative to `origin`. Other references
    /// name a package and optionally a module path; the version selector
    /// comes from the dependencies of the origin's package.
    ///
    /// # Errors
    /// Returns `InvalidOperation` for relative references without an origin
    /// or escaping their package, `InvalidReference` for malformed references
    /// or references carrying a version or member, any [`Session::load_package`]
    /// error, `CyclicRequire` in strict cycle mode, or `Execution`.
    pub fn require(
        &mut self,
        reference: &str,
        origin: Option<&Rc<Module>>,
        execute: bool,
    ) -> Result<Rc<Module>, SessionError> {
        require_in(
            &mut self.state,
            self.executor.as_ref(),
            reference,
            origin,
            execute,
        )
    }

    /// Execute a module unless it already ran.
    ///
    /// # Errors
    /// Returns `CyclicRequire` in strict cycle mode, or `Execution`.
    pub fn exec_module(&mut self, module: &Rc<Module>) -> Result<(), SessionError> {
        exec_in(&mut self.state, self.executor.as_ref(), module)
    }

    /// Inject the configured host module directories until the guard drops.
    pub fn enter(&mut self) -> SessionScope<'_> {
        let paths = self.state.config.host_search_path();
        let injected = paths.len();
        let outer = std::mem::take(&mut self.state.host_paths);
        self.state.host_paths = paths.into_iter().chain(outer).collect();
        debug!(injected, "entered session scope");
        SessionScope {
            session: self,
            injected,
        }
    }
}

/// Guard returned by [`Session::enter`].
///
/// Derefs to the session; dropping it removes the host paths it added.
pub struct SessionScope<'a> {
    session: &'a mut Session,
    injected: usize,
}

impl Deref for SessionScope<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for SessionScope<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for SessionScope<'_> {
    fn drop(&mut self) {
        let paths = &mut self.session.state.host_paths;
        let injected = self.injected.min(paths.len());
        paths.drain(..injected);
        debug!(removed = injected, "left session scope");
    }
}

fn is_relative(reference: &str) -> bool {
    reference.starts_with("./") || reference.starts_with("../")
}

pub(crate) fn load_package_in(
    state: &mut SessionState,
    name: &str,
    selector: Option<&Selector>,
) -> Result<Rc<Package>, SessionError> {
    if let Some(package) = state.packages.get(name) {
        if let Some(selector) = selector {
            if !selector.matches(package.version()) {
                warn!(
                    package = name,
                    loaded = %package.version(),
                    selector = %selector,
                    "dependency mismatch"
                );
                return Err(SessionError::DependencyMismatch {
                    name: name.to_string(),
                    loaded: package.version().clone(),
                    selector: selector.clone(),
                });
            }
        }
        return Ok(Rc::clone(package));
    }

    let any = Selector::any();
    let selector = selector.unwrap_or(&any);
    let manifest = find_manifest(&state.finders, name, selector)?;
    let found = manifest.name()?.full_name();
    if found != name {
        return Err(SessionError::invalid_operation(format!(
            "finder returned package \"{found}\" for \"{name}\""
        )));
    }
    add_package_in(state, manifest)
}

fn find_manifest(
    finders: &[Box<dyn Finder>],
    name: &str,
    selector: &Selector,
) -> Result<Manifest, SessionError> {
    for finder in finders {
        match finder.find_package(name, selector) {
            Ok(manifest) => {
                debug!(package = name, ?finder, "finder hit");
                return Ok(manifest);
            }
            Err(SessionError::PackageNotFound { .. }) => {
                trace!(package = name, ?finder, "finder miss");
            }
            Err(err) => return Err(err),
        }
    }
    Err(SessionError::PackageNotFound {
        name: name.to_string(),
        selector: selector.clone(),
    })
}

pub(crate) fn add_package_in(
    state: &mut SessionState,
    manifest: Manifest,
) -> Result<Rc<Package>, SessionError> {
    let name = manifest.name()?.full_name();
    if state.packages.contains_key(&name) {
        return Err(SessionError::invalid_operation(format!(
            "package \"{name}\" is already loaded"
        )));
    }

    let mut ctx = state.config.cfg_context();
    let package = Package::new(manifest, &state.cache, &mut ctx)?;
    for error in ctx.take_errors() {
        warn!(package = %package.identifier(), %error, "cfg evaluation failed");
    }

    debug!(
        package = %package.identifier(),
        directory = ?package.directory(),
        "loaded package"
    );
    state.packages.insert(name, Rc::clone(&package));
    Ok(package)
}

pub(crate) fn resolve_in(
    state: &mut SessionState,
    reference: &str,
    origin: Option<&Rc<Module>>,
) -> Result<Rc<Module>, SessionError> {
    if is_relative(reference) {
        let Some(origin) = origin else {
            return Err(SessionError::invalid_operation(format!(
                "relative require \"{reference}\" outside of a module"
            )));
        };
        let Some(package) = origin.package() else {
            return Err(SessionError::invalid_operation(format!(
                "module \"{}\" no longer belongs to a session",
                origin.name()
            )));
        };
        if reference.contains(':') {
            return Err(
                PkgError::ref_invalid(reference, "relative references cannot name a member").into(),
            );
        }
        let base = nnp_util::path::dirname(origin.name());
        let Some(path) = nnp_util::path::join_module(base, reference) else {
            return Err(SessionError::invalid_operation(format!(
                "\"{reference}\" escapes package \"{}\"",
                package.name()
            )));
        };
        return package.load_module(Some(&path));
    }

    let parsed = PackageRef::parse(reference)?;
    if parsed.selector.is_some() || parsed.member.is_some() {
        return Err(
            PkgError::ref_invalid(reference, "require() accepts no version or member").into(),
        );
    }
    let name = parsed.package_name();

    if let Some(ref observer) = state.observer {
        observer.on_require(origin, &name)?;
    }

    let selector = origin
        .and_then(|module| module.package())
        .and_then(|package| package.dependency_selector(&name).cloned());
    let package = load_package_in(state, &name, selector.as_ref())?;
    package.load_module(parsed.module.as_deref())
}

pub(crate) fn require_in(
    state: &mut SessionState,
    executor: &dyn Executor,
    reference: &str,
    origin: Option<&Rc<Module>>,
    execute: bool,
) -> Result<Rc<Module>, SessionError> {
    let module = resolve_in(state, reference, origin)?;
    if execute {
        exec_in(state, executor, &module)?;
    }
    Ok(module)
}

pub(crate) fn exec_in(
    state: &mut SessionState,
    executor: &dyn Executor,
    module: &Rc<Module>,
) -> Result<(), SessionError> {
    match module.state() {
        ModuleState::Executed => return Ok(()),
        ModuleState::Executing => {
            let id = module.identifier();
            let from = state.stack.last().map(|m| m.identifier());
            if state.config.strict_cycles {
                return Err(SessionError::CyclicRequire { module: id });
            }
            warn!(module = %id, ?from, "cyclic require, module is only partially executed");
            return Ok(());
        }
        ModuleState::Unexecuted => {}
    }

    debug!(module = %module.identifier(), "executing module");
    module.set_state(ModuleState::Executing);
    state.stack.push(Rc::clone(module));
    let result = {
        let mut require = Require {
            state: &mut *state,
            executor,
            origin: Rc::clone(module),
        };
        executor.execute(module, &mut require)
    };
    state.stack.pop();

    match result {
        Ok(()) => {
            module.set_state(ModuleState::Executed);
            Ok(())
        }
        Err(source) => {
            module.set_state(ModuleState::Unexecuted);
            module.clear();
            // Cycle errors pass through every executor on the stack unwrapped.
            match source.downcast::<SessionError>() {
                Ok(err) if matches!(*err, SessionError::CyclicRequire { .. }) => Err(*err),
                Ok(err) => Err(SessionError::Execution {
                    module: module.identifier(),
                    source: err,
                }),
                Err(source) => Err(SessionError::Execution {
                    module: module.identifier(),
                    source,
                }),
            }
        }
    }
}
