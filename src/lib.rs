//! Attribute translation for an NFSv3 server.
//!
//! Converts host `stat` data into `fattr3` and weak cache consistency views,
//! and applies client `sattr3` requests to local objects. Every function is
//! synchronous, stateless and safe to call concurrently; callers running on
//! an async executor should move calls onto a blocking pool.

pub mod attr;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod proto;
pub mod setattr;
pub mod util;

pub use attr::{
    fattr_from_snapshot, getattr, post_op_from_path, post_op_from_snapshot, post_op_with_handle,
    pre_op_from_path, pre_op_from_snapshot,
};
pub use config::{Export, ExportOptions};
pub use context::{Credentials, ProtocolVersion, RequestContext};
pub use error::{ConfigError, status_from_errno};
pub use host::{HostOps, HostTime, MetadataSnapshot, SystemHost};
pub use proto::{
    Fattr, FileHandle, FileType, NfsStat, NfsTime, PostOpAttr, PreOpAttr, SetAttr, SetAttrGuard,
    SetTime, SpecData, WccAttr, WccData,
};
pub use setattr::{
    DEFAULT_CREATE_MODE, apply_attributes, apply_attributes_guarded, create_host_mode,
    create_mode,
};
pub use util::{HostKind, file_type_from_mode, type_to_mode};
