use crate::config::{Export, ExportOptions};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// NFSv2: 32-bit sizes, file ids and a single packed device number.
    V2,
    #[default]
    V3,
}

/// Effective identity of the calling client, as carried by AUTH_UNIX.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
}

/// Per-call information handed down by the dispatcher. Read-only here.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub cred: Credentials,
    pub version: ProtocolVersion,
    pub export: Arc<Export>,
}

impl RequestContext {
    pub fn new(cred: Credentials, version: ProtocolVersion, export: Arc<Export>) -> Self {
        Self {
            cred,
            version,
            export,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.export.options
    }

    pub fn is_export_root(&self, path: &Path) -> bool {
        self.export.is_root(path)
    }
}
