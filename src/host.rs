//! The system calls this crate issues, behind a trait so the attribute
//! applier can be driven against a scripted host in tests.

use crate::util::retry_eintr;
use nix::fcntl::{AT_FDCWD, AtFlags, OFlag, openat};
use nix::sys::stat::{FchmodatFlags, FileStat, Mode, UtimensatFlags, fchmodat, utimensat};
use nix::sys::time::TimeSpec;
use nix::unistd::{Gid, Uid, fchownat, ftruncate};
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostTime {
    pub sec: i64,
    pub nsec: i64,
}

impl HostTime {
    pub const fn new(sec: i64, nsec: i64) -> Self {
        Self { sec, nsec }
    }
}

/// Host metadata for one object, captured at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetadataSnapshot {
    /// Type and permission bits, as in `st_mode`.
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    /// Allocated storage in 512-byte units.
    pub blocks: u64,
    pub rdev: u64,
    pub dev: u64,
    pub ino: u64,
    pub atime: HostTime,
    pub mtime: HostTime,
    pub ctime: HostTime,
}

impl From<&FileStat> for MetadataSnapshot {
    fn from(stat: &FileStat) -> Self {
        Self {
            mode: stat.st_mode as u32,
            nlink: stat.st_nlink as u64,
            uid: stat.st_uid,
            gid: stat.st_gid,
            size: stat.st_size.max(0) as u64,
            blocks: stat.st_blocks.max(0) as u64,
            rdev: stat.st_rdev as u64,
            dev: stat.st_dev as u64,
            ino: stat.st_ino as u64,
            atime: HostTime::new(stat.st_atime.into(), stat.st_atime_nsec.into()),
            mtime: HostTime::new(stat.st_mtime.into(), stat.st_mtime_nsec.into()),
            ctime: HostTime::new(stat.st_ctime.into(), stat.st_ctime_nsec.into()),
        }
    }
}

/// Metadata system calls on a resolved path. None of them follow a trailing
/// symbolic link except `chmod`, which callers skip for links.
pub trait HostOps {
    fn lstat(&self, path: &Path) -> nix::Result<MetadataSnapshot>;
    fn chmod(&self, path: &Path, mode: u32) -> nix::Result<()>;
    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> nix::Result<()>;
    fn truncate(&self, path: &Path, size: i64) -> nix::Result<()>;
    /// `UTIME_OMIT` leaves a timestamp alone, `UTIME_NOW` takes the server clock.
    fn set_times(&self, path: &Path, atime: &TimeSpec, mtime: &TimeSpec) -> nix::Result<()>;
}

/// The local filesystem, through `nix`. Every call resolves the full path
/// from the working directory, so only search permission on the ancestors
/// is needed, the same as for plain `chmod(2)` and friends.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemHost;

impl HostOps for SystemHost {
    fn lstat(&self, path: &Path) -> nix::Result<MetadataSnapshot> {
        let stat = retry_eintr(|| nix::sys::stat::lstat(path))?;
        Ok(MetadataSnapshot::from(&stat))
    }

    fn chmod(&self, path: &Path, mode: u32) -> nix::Result<()> {
        retry_eintr(|| {
            fchmodat(
                AT_FDCWD,
                path,
                Mode::from_bits_truncate(mode as libc::mode_t),
                FchmodatFlags::FollowSymlink,
            )
        })
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> nix::Result<()> {
        retry_eintr(|| {
            fchownat(
                AT_FDCWD,
                path,
                uid.map(Uid::from_raw),
                gid.map(Gid::from_raw),
                AtFlags::AT_SYMLINK_NOFOLLOW,
            )
        })
    }

    fn truncate(&self, path: &Path, size: i64) -> nix::Result<()> {
        // O_NONBLOCK keeps a FIFO that slipped in after the type check from hanging us.
        let file = retry_eintr(|| {
            openat(
                AT_FDCWD,
                path,
                OFlag::O_WRONLY | OFlag::O_NONBLOCK | OFlag::O_NOFOLLOW | OFlag::O_CLOEXEC,
                Mode::empty(),
            )
        })?;
        retry_eintr(|| ftruncate(&file, size))
    }

    fn set_times(&self, path: &Path, atime: &TimeSpec, mtime: &TimeSpec) -> nix::Result<()> {
        retry_eintr(|| {
            utimensat(
                AT_FDCWD,
                path,
                atime,
                mtime,
                UtimensatFlags::NoFollowSymlink,
            )
        })
    }
}
