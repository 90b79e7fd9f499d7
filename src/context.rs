//! Explicit daemon context: the live configuration tree plus the logger.
//!
//! Passed by reference wherever the daemon needs configuration or wants to
//! report something. Reloading is all-or-nothing: a tree that fails to
//! parse is reported and discarded, and the previously installed tree
//! stays live.

use crate::conf_tree::{ConfTree, Query};
use crate::error::ConfError;
use crate::log::Logger;
use std::path::{Path, PathBuf};

const MODULE: &str = "conf";

#[derive(Debug, Default)]
pub struct Context {
    logger: Logger,
    conf: Option<ConfTree>,
    path: Option<PathBuf>,
}

impl Context {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            conf: None,
            path: None,
        }
    }

    /// The installed configuration, if a load ever succeeded.
    pub fn conf(&self) -> Option<&ConfTree> {
        self.conf.as_ref()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    /// Path of the last `load`, used by `reload`.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Parse `path` and install it. The path is remembered for `reload`
    /// even if this attempt fails.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), ConfError> {
        let path = path.as_ref().to_path_buf();
        self.path = Some(path.clone());
        self.install(&path)
    }

    /// Re-read the last loaded path. Without a prior `load` this is a no-op.
    pub fn reload(&mut self) -> Result<(), ConfError> {
        match self.path.clone() {
            Some(path) => self.install(&path),
            None => Ok(()),
        }
    }

    fn install(&mut self, path: &Path) -> Result<(), ConfError> {
        let tree = match ConfTree::read(path) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(path = %path.display(), kind = e.kind(), "configuration rejected");
                self.logger.error(MODULE, &e.to_string());
                return Err(e);
            }
        };

        // Validate before swapping so a bad value leaves the old tree live.
        let debug = tree.find_bool(tree.root(), &Query::new("debug"));
        let debug = match debug {
            Ok(d) => d,
            Err(e) => {
                self.logger.error(MODULE, &e.to_string());
                return Err(e);
            }
        };

        let entries = tree.len();
        self.conf = Some(tree);
        if let Some(on) = debug {
            self.logger.set_debug(on);
        }
        self.logger.notice(
            MODULE,
            &format!("loaded {} ({entries} entries)", path.display()),
        );
        Ok(())
    }
}
