//! NFS version 3 attribute structures (RFC 1813, sections 2.5 and 2.6).
//!
//! Only the types this crate produces or consumes live here: the file type
//! enumeration, status codes, `fattr3` and the weak cache consistency pair,
//! and the settable attribute set sent with SETATTR/CREATE/MKDIR.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;

/// Maximum size in bytes of an opaque NFSv3 file handle.
pub const NFS3_FHSIZE: usize = 64;

const IDENTITY_TAG: u8 = 0x01;
const IDENTITY_LEN: usize = 1 + 8 + 8;

/// `ftype3`. Discriminants are the wire values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FileType {
    #[default]
    Regular = 1,
    Directory = 2,
    BlockDevice = 3,
    CharDevice = 4,
    Symlink = 5,
    Socket = 6,
    NamedPipe = 7,
}

impl FileType {
    pub const ALL: [FileType; 7] = [
        FileType::Regular,
        FileType::Directory,
        FileType::BlockDevice,
        FileType::CharDevice,
        FileType::Symlink,
        FileType::Socket,
        FileType::NamedPipe,
    ];
}

/// `nfsstat3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NfsStat {
    Ok = 0,
    Perm = 1,
    NoEnt = 2,
    Io = 5,
    Nxio = 6,
    Acces = 13,
    Exist = 17,
    XDev = 18,
    NoDev = 19,
    NotDir = 20,
    IsDir = 21,
    Inval = 22,
    FBig = 27,
    NoSpc = 28,
    Rofs = 30,
    MLink = 31,
    NameTooLong = 63,
    NotEmpty = 66,
    DQuot = 69,
    Stale = 70,
    Remote = 71,
    BadHandle = 10001,
    NotSync = 10002,
    BadCookie = 10003,
    NotSupp = 10004,
    TooSmall = 10005,
    ServerFault = 10006,
    BadType = 10007,
    Jukebox = 10008,
}

impl NfsStat {
    pub fn is_ok(self) -> bool {
        self == NfsStat::Ok
    }

    fn name(self) -> &'static str {
        match self {
            NfsStat::Ok => "NFS3_OK",
            NfsStat::Perm => "NFS3ERR_PERM",
            NfsStat::NoEnt => "NFS3ERR_NOENT",
            NfsStat::Io => "NFS3ERR_IO",
            NfsStat::Nxio => "NFS3ERR_NXIO",
            NfsStat::Acces => "NFS3ERR_ACCES",
            NfsStat::Exist => "NFS3ERR_EXIST",
            NfsStat::XDev => "NFS3ERR_XDEV",
            NfsStat::NoDev => "NFS3ERR_NODEV",
            NfsStat::NotDir => "NFS3ERR_NOTDIR",
            NfsStat::IsDir => "NFS3ERR_ISDIR",
            NfsStat::Inval => "NFS3ERR_INVAL",
            NfsStat::FBig => "NFS3ERR_FBIG",
            NfsStat::NoSpc => "NFS3ERR_NOSPC",
            NfsStat::Rofs => "NFS3ERR_ROFS",
            NfsStat::MLink => "NFS3ERR_MLINK",
            NfsStat::NameTooLong => "NFS3ERR_NAMETOOLONG",
            NfsStat::NotEmpty => "NFS3ERR_NOTEMPTY",
            NfsStat::DQuot => "NFS3ERR_DQUOT",
            NfsStat::Stale => "NFS3ERR_STALE",
            NfsStat::Remote => "NFS3ERR_REMOTE",
            NfsStat::BadHandle => "NFS3ERR_BADHANDLE",
            NfsStat::NotSync => "NFS3ERR_NOT_SYNC",
            NfsStat::BadCookie => "NFS3ERR_BAD_COOKIE",
            NfsStat::NotSupp => "NFS3ERR_NOTSUPP",
            NfsStat::TooSmall => "NFS3ERR_TOOSMALL",
            NfsStat::ServerFault => "NFS3ERR_SERVERFAULT",
            NfsStat::BadType => "NFS3ERR_BADTYPE",
            NfsStat::Jukebox => "NFS3ERR_JUKEBOX",
        }
    }
}

impl fmt::Display for NfsStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), *self as u32)
    }
}

/// `nfstime3`: seconds and nanoseconds since the epoch, both unsigned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NfsTime {
    pub seconds: u32,
    pub nseconds: u32,
}

impl NfsTime {
    pub const fn new(seconds: u32, nseconds: u32) -> Self {
        Self { seconds, nseconds }
    }
}

/// `specdata3`: device major and minor numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpecData {
    pub major: u32,
    pub minor: u32,
}

/// `fattr3`, the full attribute set returned in post-operation views.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fattr {
    pub ftype: FileType,
    /// Permission bits including setuid, setgid and sticky; no type bits.
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    /// Bytes of storage actually allocated.
    pub used: u64,
    pub rdev: SpecData,
    pub fsid: u64,
    pub fileid: u64,
    pub atime: NfsTime,
    pub mtime: NfsTime,
    pub ctime: NfsTime,
}

/// `wcc_attr`: the subset of attributes a client compares against its cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WccAttr {
    pub size: u64,
    pub mtime: NfsTime,
    pub ctime: NfsTime,
}

/// `pre_op_attr`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PreOpAttr {
    #[default]
    Absent,
    Present(WccAttr),
}

impl PreOpAttr {
    pub fn is_present(&self) -> bool {
        matches!(self, PreOpAttr::Present(_))
    }

    pub fn attributes(&self) -> Option<&WccAttr> {
        match self {
            PreOpAttr::Present(attr) => Some(attr),
            PreOpAttr::Absent => None,
        }
    }
}

/// `post_op_attr`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PostOpAttr {
    #[default]
    Absent,
    Present(Fattr),
}

impl PostOpAttr {
    pub fn is_present(&self) -> bool {
        matches!(self, PostOpAttr::Present(_))
    }

    pub fn attributes(&self) -> Option<&Fattr> {
        match self {
            PostOpAttr::Present(attr) => Some(attr),
            PostOpAttr::Absent => None,
        }
    }
}

/// `wcc_data`. Procedure handlers capture `before` ahead of the mutation and
/// `after` once it has completed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WccData {
    pub before: PreOpAttr,
    pub after: PostOpAttr,
}

impl WccData {
    pub fn new(before: PreOpAttr, after: PostOpAttr) -> Self {
        Self { before, after }
    }
}

/// `set_atime` / `set_mtime`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SetTime {
    #[default]
    DontChange,
    ServerTime,
    ClientTime(NfsTime),
}

impl SetTime {
    pub fn is_set(&self) -> bool {
        !matches!(self, SetTime::DontChange)
    }
}

/// `sattr3`. A `None` field means "leave unchanged".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetAttr {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: SetTime,
    pub mtime: SetTime,
}

impl SetAttr {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.uid.is_none()
            && self.gid.is_none()
            && self.size.is_none()
            && !self.atime.is_set()
            && !self.mtime.is_set()
    }
}

/// `sattrguard3`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SetAttrGuard {
    #[default]
    Unchecked,
    CtimeMatches(NfsTime),
}

/// Device and inode embedded in handles minted by [`FileHandle::from_identity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleIdentity {
    pub dev: u64,
    pub ino: u64,
}

/// `nfs_fh3`: an opaque token of at most [`NFS3_FHSIZE`] bytes.
///
/// The byte layout is owned by whoever mints the handle and is never parsed
/// here. Only handles built with [`FileHandle::from_identity`] carry a
/// device/inode identity; bytes received through [`FileHandle::new`] are
/// fully opaque, whatever they happen to contain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FileHandle {
    data: Bytes,
    identity: Option<HandleIdentity>,
}

impl FileHandle {
    pub fn new(data: impl Into<Bytes>) -> Result<Self, NfsStat> {
        let data = data.into();
        if data.len() > NFS3_FHSIZE {
            return Err(NfsStat::BadHandle);
        }
        Ok(Self {
            data,
            identity: None,
        })
    }

    /// Handle naming `dev`/`ino`. The bytes are a tag followed by both
    /// numbers big-endian; the identity itself is recorded alongside them.
    pub fn from_identity(dev: u64, ino: u64) -> Self {
        let mut raw = Vec::with_capacity(IDENTITY_LEN);
        raw.push(IDENTITY_TAG);
        raw.extend_from_slice(&dev.to_be_bytes());
        raw.extend_from_slice(&ino.to_be_bytes());
        Self {
            data: Bytes::from(raw),
            identity: Some(HandleIdentity { dev, ino }),
        }
    }

    pub fn identity(&self) -> Option<HandleIdentity> {
        self.identity
    }

    /// Stable 64-bit identifier for this handle: the embedded inode when the
    /// handle carries an identity, otherwise a digest of the handle bytes.
    pub fn fileid(&self) -> u64 {
        if let Some(identity) = self.identity() {
            return identity.ino;
        }
        let digest = Sha256::digest(&self.data);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_handle_decodes() {
        let fh = FileHandle::from_identity(0x0801, 42);
        assert_eq!(
            fh.identity(),
            Some(HandleIdentity {
                dev: 0x0801,
                ino: 42
            })
        );
        assert_eq!(fh.fileid(), 42);
    }

    #[test]
    fn opaque_handle_has_no_identity_but_stable_fileid() {
        let fh = FileHandle::new(b"opaque-token".to_vec()).unwrap();
        assert!(fh.identity().is_none());
        let again = FileHandle::new(b"opaque-token".to_vec()).unwrap();
        assert_eq!(fh.fileid(), again.fileid());
        let other = FileHandle::new(b"other-token".to_vec()).unwrap();
        assert_ne!(fh.fileid(), other.fileid());
    }

    #[test]
    fn opaque_bytes_never_carry_an_identity() {
        let minted = FileHandle::from_identity(0x0801, 42);
        let mut raw = vec![IDENTITY_TAG];
        raw.extend_from_slice(&[0xab; 31]);
        let lookalike = FileHandle::new(raw).unwrap();
        assert!(lookalike.identity().is_none());
        assert_ne!(lookalike.fileid(), 0xabab_abab_abab_abab);

        let copied = FileHandle::new(minted.data.clone()).unwrap();
        assert!(copied.identity().is_none());
        assert_ne!(copied, minted);
    }

    #[test]
    fn oversized_handle_is_rejected() {
        assert_eq!(
            FileHandle::new(vec![0u8; NFS3_FHSIZE + 1]),
            Err(NfsStat::BadHandle)
        );
        assert!(FileHandle::new(vec![0u8; NFS3_FHSIZE]).is_ok());
    }

    #[test]
    fn empty_set_attr_detection() {
        assert!(SetAttr::default().is_empty());
        let with_time = SetAttr {
            mtime: SetTime::ServerTime,
            ..SetAttr::default()
        };
        assert!(!with_time.is_empty());
        let with_size = SetAttr {
            size: Some(0),
            ..SetAttr::default()
        };
        assert!(!with_size.is_empty());
    }

    #[test]
    fn status_display_includes_wire_value() {
        assert_eq!(NfsStat::Rofs.to_string(), "NFS3ERR_ROFS (30)");
        assert_eq!(NfsStat::ServerFault.to_string(), "NFS3ERR_SERVERFAULT (10006)");
    }
}
