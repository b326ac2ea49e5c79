//! Applying a client's `sattr3` to a local object.
//!
//! Fields are applied one system call at a time in a fixed order: mode,
//! ownership, size, timestamps. The first failure ends the request with its
//! mapped status; earlier changes stay in place.

use crate::host::{HostOps, MetadataSnapshot, SystemHost};
use crate::proto::{FileHandle, FileType, NfsStat, NfsTime, SetAttr, SetAttrGuard, SetTime};
use crate::util::{HostKind, MODE_PERM_MASK, file_type_from_mode, type_to_mode};
use log::{debug, trace, warn};
use nix::sys::time::TimeSpec;
use std::path::Path;

/// Mode for newly created objects whose request carries no mode:
/// read/write for the owner, read-only for group and others.
pub const DEFAULT_CREATE_MODE: u32 = 0o644;

pub fn create_mode(changes: &SetAttr) -> u32 {
    changes.mode.unwrap_or(DEFAULT_CREATE_MODE)
}

/// Full `st_mode` (type and permission bits) for an object of `kind` created
/// with `changes`, e.g. for `mknod`.
pub fn create_host_mode(kind: FileType, changes: &SetAttr) -> u32 {
    type_to_mode(kind) | (create_mode(changes) & MODE_PERM_MASK)
}

pub fn apply_attributes(path: &Path, handle: &FileHandle, changes: &SetAttr) -> NfsStat {
    apply_attributes_with(&SystemHost, path, handle, changes, SetAttrGuard::Unchecked)
}

/// SETATTR with a ctime guard: nothing is changed unless the object's
/// current ctime equals the guard value.
pub fn apply_attributes_guarded(
    path: &Path,
    handle: &FileHandle,
    changes: &SetAttr,
    guard: SetAttrGuard,
) -> NfsStat {
    apply_attributes_with(&SystemHost, path, handle, changes, guard)
}

pub fn apply_attributes_with<H: HostOps + ?Sized>(
    host: &H,
    path: &Path,
    handle: &FileHandle,
    changes: &SetAttr,
    guard: SetAttrGuard,
) -> NfsStat {
    match apply_steps(host, path, handle, changes, guard) {
        Ok(()) => NfsStat::Ok,
        Err(status) => status,
    }
}

fn apply_steps<H: HostOps + ?Sized>(
    host: &H,
    path: &Path,
    handle: &FileHandle,
    changes: &SetAttr,
    guard: SetAttrGuard,
) -> Result<(), NfsStat> {
    if changes.is_empty() && guard == SetAttrGuard::Unchecked {
        return Ok(());
    }

    let snapshot = host
        .lstat(path)
        .map_err(|err| step_failed("lstat", path, err))?;
    check_identity(path, handle, &snapshot)?;

    if let SetAttrGuard::CtimeMatches(expected) = guard {
        let current = NfsTime::from(snapshot.ctime);
        if current != expected {
            debug!(
                "setattr guard mismatch on {}: ctime {current:?}, expected {expected:?}",
                path.display()
            );
            return Err(NfsStat::NotSync);
        }
    }

    let kind = file_type_from_mode(snapshot.mode);

    // Links carry no permission bits of their own; chmod would reach the target.
    if let Some(mode) = changes.mode
        && !kind.is(FileType::Symlink)
    {
        host.chmod(path, mode & MODE_PERM_MASK)
            .map_err(|err| step_failed("chmod", path, err))?;
    }

    if changes.uid.is_some() || changes.gid.is_some() {
        host.chown(path, changes.uid, changes.gid)
            .map_err(|err| step_failed("chown", path, err))?;
    }

    if let Some(size) = changes.size {
        apply_size(host, path, kind, size)?;
    }

    if changes.atime.is_set() || changes.mtime.is_set() {
        let atime = timespec_for(changes.atime);
        let mtime = timespec_for(changes.mtime);
        host.set_times(path, &atime, &mtime)
            .map_err(|err| step_failed("utimensat", path, err))?;
    }

    trace!("applied {changes:?} to {}", path.display());
    Ok(())
}

/// Handles minted with an identity must still name the object at `path`.
fn check_identity(
    path: &Path,
    handle: &FileHandle,
    snapshot: &MetadataSnapshot,
) -> Result<(), NfsStat> {
    let Some(identity) = handle.identity() else {
        return Ok(());
    };
    if identity.dev != snapshot.dev || identity.ino != snapshot.ino {
        warn!(
            "stale handle for {}: handle names {}:{}, found {}:{}",
            path.display(),
            identity.dev,
            identity.ino,
            snapshot.dev,
            snapshot.ino
        );
        return Err(NfsStat::Stale);
    }
    Ok(())
}

fn apply_size<H: HostOps + ?Sized>(
    host: &H,
    path: &Path,
    kind: HostKind,
    size: u64,
) -> Result<(), NfsStat> {
    if !kind.is(FileType::Regular) {
        debug!("refusing size change on non-regular {}", path.display());
        return Err(NfsStat::Inval);
    }
    let len = i64::try_from(size).map_err(|_| NfsStat::FBig)?;
    host.truncate(path, len)
        .map_err(|err| step_failed("truncate", path, err))
}

fn timespec_for(time: SetTime) -> TimeSpec {
    match time {
        SetTime::DontChange => TimeSpec::UTIME_OMIT,
        SetTime::ServerTime => TimeSpec::UTIME_NOW,
        SetTime::ClientTime(t) => TimeSpec::new(t.seconds as _, t.nseconds as _),
    }
}

fn step_failed(step: &str, path: &Path, err: nix::Error) -> NfsStat {
    let status = NfsStat::from(err);
    debug!("setattr {step} on {} failed: {err} -> {status}", path.display());
    status
}
