use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::core::{Instance, Module};

/// One retained version of a script.
#[derive(Clone)]
pub struct VersionEntry {
    pub version: u64,
    pub module: Arc<Module>,
    pub instance: Option<Instance>,
    pub created_at: SystemTime,
}

impl VersionEntry {
    pub fn new(version: u64, module: Arc<Module>, instance: Option<Instance>) -> Self {
        Self {
            version,
            module,
            instance,
            created_at: SystemTime::now(),
        }
    }
}

impl fmt::Debug for VersionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionEntry")
            .field("version", &self.version)
            .field("module", &self.module)
            .field("instance", &self.instance.is_some())
            .field("created_at", &self.created_at)
            .finish()
    }
}
