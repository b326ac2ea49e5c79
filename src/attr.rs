//! Pre- and post-operation attribute views.
//!
//! A mutating procedure captures a [`PreOpAttr`] before touching the object
//! and a [`PostOpAttr`] afterwards; the pair lets a client tell whether its
//! own request was the only change since it last cached the attributes.
//! Failing to stat the object is not an error here: the views are simply
//! absent, which the protocol treats as a valid answer.

use crate::context::{ProtocolVersion, RequestContext};
use crate::host::{HostOps, HostTime, MetadataSnapshot, SystemHost};
use crate::proto::{
    Fattr, FileHandle, FileType, NfsStat, NfsTime, PostOpAttr, PreOpAttr, SpecData, WccAttr,
};
use crate::util::{MODE_PERM_MASK, file_type_from_mode, nfs_time_from_raw};
use log::{debug, trace};
use std::path::Path;

const BLOCK_SIZE: u64 = 512;
const REMOVABLE_ROOT_MODE: u32 = 0o555;

impl From<HostTime> for NfsTime {
    fn from(value: HostTime) -> Self {
        nfs_time_from_raw(value.sec, value.nsec)
    }
}

pub fn pre_op_from_path(path: &Path) -> PreOpAttr {
    match SystemHost.lstat(path) {
        Ok(snapshot) => pre_op_from_snapshot(&snapshot),
        Err(err) => {
            debug!("pre-op attributes unavailable for {}: {err}", path.display());
            PreOpAttr::Absent
        }
    }
}

pub fn pre_op_from_snapshot(snapshot: &MetadataSnapshot) -> PreOpAttr {
    PreOpAttr::Present(WccAttr {
        size: snapshot.size,
        mtime: snapshot.mtime.into(),
        ctime: snapshot.ctime.into(),
    })
}

pub fn post_op_from_path(path: &Path, ctx: &RequestContext) -> PostOpAttr {
    match SystemHost.lstat(path) {
        Ok(snapshot) => post_op_from_snapshot(&snapshot, ctx),
        Err(err) => {
            debug!("post-op attributes unavailable for {}: {err}", path.display());
            PostOpAttr::Absent
        }
    }
}

pub fn post_op_from_snapshot(snapshot: &MetadataSnapshot, ctx: &RequestContext) -> PostOpAttr {
    PostOpAttr::Present(fattr_from_snapshot(snapshot, ctx))
}

/// Like [`post_op_from_path`], but allowed to take the file id from `handle`
/// when the host's inode numbers cannot be trusted.
pub fn post_op_with_handle(path: &Path, handle: &FileHandle, ctx: &RequestContext) -> PostOpAttr {
    match getattr(path, handle, ctx) {
        Ok(attr) => PostOpAttr::Present(attr),
        Err(status) => {
            debug!("post-op attributes unavailable for {}: {status}", path.display());
            PostOpAttr::Absent
        }
    }
}

/// Full attributes for `path`, or the status a GETATTR reply should carry.
pub fn getattr(path: &Path, handle: &FileHandle, ctx: &RequestContext) -> Result<Fattr, NfsStat> {
    getattr_with(&SystemHost, path, handle, ctx)
}

pub fn getattr_with<H: HostOps + ?Sized>(
    host: &H,
    path: &Path,
    handle: &FileHandle,
    ctx: &RequestContext,
) -> Result<Fattr, NfsStat> {
    let options = ctx.options();
    if options.removable && ctx.is_export_root(path) {
        trace!("synthesising attributes for removable export root {}", path.display());
        return Ok(narrow_for_version(removable_root_fattr(handle, ctx), ctx.version));
    }

    let snapshot = host.lstat(path)?;
    let mut attr = wide_fattr(&snapshot, ctx);
    if options.handle_fileid || snapshot.ino == 0 {
        attr.fileid = handle.fileid();
    }
    Ok(narrow_for_version(attr, ctx.version))
}

pub fn fattr_from_snapshot(snapshot: &MetadataSnapshot, ctx: &RequestContext) -> Fattr {
    narrow_for_version(wide_fattr(snapshot, ctx), ctx.version)
}

fn wide_fattr(snapshot: &MetadataSnapshot, ctx: &RequestContext) -> Fattr {
    let ftype = file_type_from_mode(snapshot.mode).file_type();
    let (uid, gid) = reported_owner(snapshot, ctx);
    let rdev = match ftype {
        FileType::BlockDevice | FileType::CharDevice => split_dev(snapshot.rdev),
        _ => SpecData::default(),
    };

    Fattr {
        ftype,
        mode: snapshot.mode & MODE_PERM_MASK,
        nlink: u32::try_from(snapshot.nlink).unwrap_or(u32::MAX),
        uid,
        gid,
        size: snapshot.size,
        used: snapshot.blocks.saturating_mul(BLOCK_SIZE),
        rdev,
        fsid: ctx.options().fsid.unwrap_or(snapshot.dev),
        fileid: snapshot.ino,
        atime: snapshot.atime.into(),
        mtime: snapshot.mtime.into(),
        ctime: snapshot.ctime.into(),
    }
}

/// In single-user mode everything the server process owns is presented as
/// belonging to the caller.
fn reported_owner(snapshot: &MetadataSnapshot, ctx: &RequestContext) -> (u32, u32) {
    let options = ctx.options();
    if !options.single_user {
        return (snapshot.uid, snapshot.gid);
    }
    let uid = if snapshot.uid == options.server_uid {
        ctx.cred.uid
    } else {
        snapshot.uid
    };
    let gid = if snapshot.gid == options.server_gid {
        ctx.cred.gid
    } else {
        snapshot.gid
    };
    (uid, gid)
}

fn removable_root_fattr(handle: &FileHandle, ctx: &RequestContext) -> Fattr {
    let identity = handle.identity();
    let fsid = ctx
        .options()
        .fsid
        .or(identity.map(|id| id.dev))
        .unwrap_or_default();

    Fattr {
        ftype: FileType::Directory,
        mode: REMOVABLE_ROOT_MODE,
        nlink: 2,
        uid: 0,
        gid: 0,
        size: 0,
        used: 0,
        rdev: SpecData::default(),
        fsid,
        fileid: handle.fileid(),
        atime: NfsTime::default(),
        mtime: NfsTime::default(),
        ctime: NfsTime::default(),
    }
}

fn narrow_for_version(mut attr: Fattr, version: ProtocolVersion) -> Fattr {
    if version == ProtocolVersion::V3 {
        return attr;
    }
    attr.size = attr.size.min(u64::from(u32::MAX));
    attr.used = attr.used.min(u64::from(u32::MAX));
    attr.fileid = (attr.fileid ^ (attr.fileid >> 32)) & u64::from(u32::MAX);
    attr.fsid &= u64::from(u32::MAX);
    attr.rdev = SpecData {
        major: (attr.rdev.major << 8) | (attr.rdev.minor & 0xff),
        minor: 0,
    };
    attr
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn split_dev(rdev: u64) -> SpecData {
    SpecData {
        major: nix::sys::stat::major(rdev) as u32,
        minor: nix::sys::stat::minor(rdev) as u32,
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn split_dev(rdev: u64) -> SpecData {
    SpecData {
        major: ((rdev >> 24) & 0xff) as u32,
        minor: (rdev & 0x00ff_ffff) as u32,
    }
}
