#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Module resolution for nnp packages.
//!
//! A [`Session`] owns every package loaded during one run. Packages are
//! located through [`Finder`]s, their modules are cached per package, and
//! module bodies are run by a host supplied [`Executor`] at most once.
//!
//! ## Usage
//!
//! ```ignore
//! use nnp_core::Config;
//! use nnp_runtime::{JsonExecutor, Session};
//!
//! let mut session = Session::new(Config::discover(&cwd), JsonExecutor);
//! let module = session.require("spam/lib/util", None, true)?;
//! println!("{:?}", module.get("answer"));
//! ```

mod error;
pub mod executor;
pub mod finder;
pub mod logging;
mod package;
mod session;

pub use error::{BoxError, SessionError};
pub use executor::{Executor, FnExecutor, JsonExecutor, NoopExecutor, Require};
pub use finder::{DirectoryFinder, Finder, MemoryFinder};
pub use package::{Module, ModuleState, Package};
pub use session::{RequireObserver, Session, SessionScope};
