use crate::cfg::{CfgContext, CfgValue};
use crate::error::Error;
use crate::paths;
use crate::version::running_version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable selecting the environment (`dev`, `prod`, ...).
pub const ENV_VAR: &str = "NNP_ENV";

/// Environment variable overriding the install prefix.
pub const PREFIX_VAR: &str = "NNP_PREFIX";

/// Runtime configuration for package resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Global install prefix.
    pub prefix: PathBuf,

    /// Project-local package directory, relative to `cwd`. `None` disables it.
    pub local_packages: Option<PathBuf>,

    /// Explicit package search path; replaces the computed one.
    pub path: Option<Vec<PathBuf>>,

    /// Explicit host module search path; replaces the computed one.
    pub host_paths: Option<Vec<PathBuf>>,

    pub environment: Environment,

    /// Return predicate evaluation errors instead of collecting them.
    pub strict_eval: bool,

    /// Fail on cyclic requires instead of returning the partial module.
    pub strict_cycles: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Extra variables visible to `cfg(...)` predicates.
    pub vars: BTreeMap<String, ConfigVar>,
}

/// Deployment environment. Sets the `dev` / `prod` predicate flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Parse `dev`, `development`, `prod` or `production`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Self::Development),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }
}

/// A predicate variable value from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigVar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<&ConfigVar> for CfgValue {
    fn from(var: &ConfigVar) -> Self {
        match var {
            ConfigVar::Bool(b) => CfgValue::Bool(*b),
            ConfigVar::Int(i) => CfgValue::Int(*i),
            ConfigVar::Float(x) => CfgValue::Float(*x),
            ConfigVar::Str(s) => CfgValue::Str(s.clone()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            prefix: paths::default_prefix(),
            local_packages: Some(PathBuf::from(paths::LOCAL_PACKAGES_DIR)),
            path: None,
            host_paths: None,
            environment: Environment::default(),
            strict_eval: false,
            strict_cycles: false,
            verbosity: 0,
            json_logs: false,
            vars: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Config rooted at the project containing `start`.
    #[must_use]
    pub fn discover(start: &Path) -> Self {
        Self::new(paths::project_root(start).unwrap_or_else(|| start.to_path_buf()))
    }

    /// Default config with `NNP_ENV` and `NNP_PREFIX` applied.
    ///
    /// # Errors
    /// Returns `InvalidEnv` if `NNP_ENV` names no known environment.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// # Errors
    /// Returns `InvalidEnv` if `NNP_ENV` names no known environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
        if let Some(value) = lookup(ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.environment = Environment::parse(&value).ok_or(Error::InvalidEnv {
                var: ENV_VAR,
                value,
                expected: "dev, development, prod or production",
            })?;
        }
        if let Some(prefix) = lookup(PREFIX_VAR).filter(|v| !v.trim().is_empty()) {
            self.prefix = PathBuf::from(prefix);
        }
        Ok(())
    }

    /// Load a JSON config file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `ConfigRead` or `ConfigParse` on failure.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content =
            nnp_util::fs::read_to_string_lossy(path).map_err(|source| Error::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: PathBuf) -> Self {
        self.prefix = prefix;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: Vec<PathBuf>) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub fn with_strict_cycles(mut self, strict: bool) -> Self {
        self.strict_cycles = strict;
        self
    }

    #[must_use]
    pub fn with_strict_eval(mut self, strict: bool) -> Self {
        self.strict_eval = strict;
        self
    }

    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: ConfigVar) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    fn local_dir(&self) -> Option<PathBuf> {
        self.local_packages.as_ref().map(|dir| self.cwd.join(dir))
    }

    /// Package directories searched in order.
    ///
    /// The explicit `path` if set, otherwise the local package directory
    /// followed by `<prefix>/packages`.
    #[must_use]
    pub fn search_path(&self) -> Vec<PathBuf> {
        if let Some(ref path) = self.path {
            return path.clone();
        }
        self.local_dir()
            .into_iter()
            .chain(std::iter::once(paths::prefix_packages_dir(&self.prefix)))
            .collect()
    }

    /// Host interpreter module directories.
    ///
    /// The explicit `host_paths` if set, otherwise `<local>/.modules`
    /// followed by `<prefix>/modules`.
    #[must_use]
    pub fn host_search_path(&self) -> Vec<PathBuf> {
        if let Some(ref paths) = self.host_paths {
            return paths.clone();
        }
        self.local_dir()
            .map(|dir| dir.join(paths::HOST_MODULES_DIR))
            .into_iter()
            .chain(std::iter::once(paths::prefix_modules_dir(&self.prefix)))
            .collect()
    }

    /// Predicate context for this configuration.
    ///
    /// Binds `dev` and `prod` from the environment, `nnp` to the running
    /// version, then every entry of `vars` (which may override the former).
    #[must_use]
    pub fn cfg_context(&self) -> CfgContext {
        let mut ctx = CfgContext::with_defaults().with_strict(self.strict_eval);
        ctx.set("dev", self.environment == Environment::Development);
        ctx.set("prod", self.environment == Environment::Production);
        if let Some(version) = running_version() {
            ctx.set("nnp", version);
        }
        for (name, value) in &self.vars {
            ctx.set(name.clone(), CfgValue::from(value));
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/work"));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.local_packages, Some(PathBuf::from("nnp_packages")));
        assert!(!config.strict_cycles);
        assert!(config.prefix.ends_with(".nnp"));
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("dev"), Some(Environment::Development));
        assert_eq!(Environment::parse("Production"), Some(Environment::Production));
        assert_eq!(Environment::parse("staging"), None);
    }

    #[test]
    fn test_apply_env() {
        let mut config = Config::new(PathBuf::from("/work"));
        config
            .apply_env(lookup(&[("NNP_ENV", "prod"), ("NNP_PREFIX", "/opt/nnp")]))
            .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.prefix, PathBuf::from("/opt/nnp"));

        let err = config
            .apply_env(lookup(&[("NNP_ENV", "staging")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEnv { var: ENV_VAR, .. }));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(ENV_VAR, "production");
        std::env::set_var(PREFIX_VAR, "/tmp/nnp-prefix");

        let config = Config::from_env().unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.prefix, PathBuf::from("/tmp/nnp-prefix"));

        std::env::remove_var(ENV_VAR);
        std::env::remove_var(PREFIX_VAR);
    }

    #[test]
    #[serial]
    fn test_from_env_unset() {
        std::env::remove_var(ENV_VAR);
        std::env::remove_var(PREFIX_VAR);

        let config = Config::from_env().unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.prefix, paths::default_prefix());
    }

    #[test]
    fn test_search_paths() {
        let config = Config::new(PathBuf::from("/work")).with_prefix(PathBuf::from("/opt/nnp"));
        assert_eq!(
            config.search_path(),
            vec![
                PathBuf::from("/work/nnp_packages"),
                PathBuf::from("/opt/nnp/packages")
            ]
        );
        assert_eq!(
            config.host_search_path(),
            vec![
                PathBuf::from("/work/nnp_packages/.modules"),
                PathBuf::from("/opt/nnp/modules")
            ]
        );

        let mut global_only = config.clone();
        global_only.local_packages = None;
        assert_eq!(global_only.search_path(), vec![PathBuf::from("/opt/nnp/packages")]);

        let explicit = config.with_path(vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(
            explicit.search_path(),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_cfg_context() {
        let config = Config::new(PathBuf::from("/work"))
            .with_environment(Environment::Production)
            .with_var("os", ConfigVar::Str("linux".to_string()))
            .with_var("level", ConfigVar::Int(2));
        let mut ctx = config.cfg_context();

        assert!(ctx.isset("prod"));
        assert!(!ctx.isset("dev"));
        assert!(ctx.isset("nnp"));

        let cache = crate::cfg::PredicateCache::new();
        assert!(crate::cfg::evaluate("os == linux", &cache, &mut ctx).unwrap());
        assert!(crate::cfg::evaluate("level >= 2", &cache, &mut ctx).unwrap());
        assert!(crate::cfg::evaluate("nnp >= 0.0.1", &cache, &mut ctx).unwrap());
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_strict_eval_propagates() {
        let ctx = Config::new(PathBuf::from("/work"))
            .with_strict_eval(true)
            .cfg_context();
        assert!(ctx.is_strict());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"environment": "production", "strict_cycles": true, "vars": {"gpu": true, "ratio": 0.5}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert!(config.strict_cycles);
        assert_eq!(config.vars["gpu"], ConfigVar::Bool(true));
        assert_eq!(config.vars["ratio"], ConfigVar::Float(0.5));

        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::ConfigParse { .. })));
        assert!(matches!(
            Config::load(&dir.path().join("missing.json")),
            Err(Error::ConfigRead { .. })
        ));
    }

    #[test]
    fn test_load_config_with_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{\"vars\": {\"label\": \"caf\xff\"}}").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.vars["label"], ConfigVar::Str("caf\u{FFFD}".to_string()));
    }

    #[test]
    fn test_discover_uses_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(crate::MANIFEST_FILE), "{}").unwrap();

        let config = Config::discover(&nested);
        assert_eq!(config.cwd, dir.path());
    }
}
