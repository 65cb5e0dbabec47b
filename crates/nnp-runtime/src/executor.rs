//! The seam between the session and whatever runs module bodies.

use crate::error::{BoxError, SessionError};
use crate::package::Module;
use crate::session::{self, SessionState};
use serde_json::Value;
use std::path::PathBuf;
use std::rc::Rc;

/// Runs module bodies.
///
/// Called at most once per successful execution of a module. Nested
/// requires go through the [`Require`] handle so the session can track the
/// executing module and detect cycles.
pub trait Executor {
    /// Execute `module`, filling its namespace.
    ///
    /// # Errors
    /// Any error marks the module unexecuted again and is reported as
    /// `SessionError::Execution`.
    fn execute(&self, module: &Rc<Module>, require: &mut Require<'_>) -> Result<(), BoxError>;
}

/// Require handle passed to an executing module.
pub struct Require<'a> {
    pub(crate) state: &'a mut SessionState,
    pub(crate) executor: &'a dyn Executor,
    pub(crate) origin: Rc<Module>,
}

impl Require<'_> {
    /// The module being executed.
    pub fn origin(&self) -> &Rc<Module> {
        &self.origin
    }

    /// Require and execute another module on behalf of the origin.
    ///
    /// # Errors
    /// Same as [`crate::Session::require`].
    pub fn require(&mut self, reference: &str) -> Result<Rc<Module>, SessionError> {
        session::require_in(
            self.state,
            self.executor,
            reference,
            Some(&self.origin),
            true,
        )
    }

    /// Resolve a module without executing it.
    ///
    /// # Errors
    /// Same as [`crate::Session::resolve`].
    pub fn resolve(&mut self, reference: &str) -> Result<Rc<Module>, SessionError> {
        session::resolve_in(self.state, reference, Some(&self.origin))
    }

    /// Host module directories active for this execution.
    pub fn host_paths(&self) -> &[PathBuf] {
        &self.state.host_paths
    }
}

/// Executor that runs nothing; every module executes to an empty namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

impl Executor for NoopExecutor {
    fn execute(&self, _module: &Rc<Module>, _require: &mut Require<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Executor backed by a closure.
pub struct FnExecutor<F>(F);

impl<F> FnExecutor<F>
where
    F: Fn(&Rc<Module>, &mut Require<'_>) -> Result<(), BoxError>,
{
    pub fn new(body: F) -> Self {
        Self(body)
    }
}

impl<F> Executor for FnExecutor<F>
where
    F: Fn(&Rc<Module>, &mut Require<'_>) -> Result<(), BoxError>,
{
    fn execute(&self, module: &Rc<Module>, require: &mut Require<'_>) -> Result<(), BoxError> {
        (self.0)(module, require)
    }
}

/// Executor for JSON data modules.
///
/// Module `lib/util` is read from `<package>/lib/util.json`, which must hold
/// an object. Entries listed under `"require"` are required first, in order;
/// every other key is exported.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExecutor;

impl JsonExecutor {
    pub const EXTENSION: &'static str = "json";
}

impl Executor for JsonExecutor {
    fn execute(&self, module: &Rc<Module>, require: &mut Require<'_>) -> Result<(), BoxError> {
        let mut path = module
            .path()
            .ok_or_else(|| format!("module \"{}\" has no location", module.identifier()))?
            .into_os_string();
        path.push(".");
        path.push(Self::EXTENSION);
        let path = PathBuf::from(path);
        let content = nnp_util::fs::read_to_string_lossy(&path)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        let Value::Object(body) = serde_json::from_str::<Value>(&content)? else {
            return Err(format!("{}: module body must be an object", path.display()).into());
        };

        if let Some(requires) = body.get("require") {
            let Some(requires) = requires.as_array() else {
                return Err(format!("{}: 'require' must be an array", path.display()).into());
            };
            for reference in requires {
                let Some(reference) = reference.as_str() else {
                    return Err(
                        format!("{}: require entries must be strings", path.display()).into(),
                    );
                };
                require.require(reference)?;
            }
        }

        for (key, value) in body {
            if key != "require" {
                module.set(key, value);
            }
        }
        Ok(())
    }
}
