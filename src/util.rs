use crate::proto::{FileType, NfsTime};
use nix::errno::Errno as NixErrno;

const S_IFMT: u32 = libc::S_IFMT as u32;
const S_IFREG: u32 = libc::S_IFREG as u32;
const S_IFDIR: u32 = libc::S_IFDIR as u32;
const S_IFBLK: u32 = libc::S_IFBLK as u32;
const S_IFCHR: u32 = libc::S_IFCHR as u32;
const S_IFLNK: u32 = libc::S_IFLNK as u32;
const S_IFSOCK: u32 = libc::S_IFSOCK as u32;
const S_IFIFO: u32 = libc::S_IFIFO as u32;

/// Permission bits a client may set: rwx for all classes plus setuid,
/// setgid and sticky.
pub const MODE_PERM_MASK: u32 = 0o7777;

/// Object kind decoded from host mode bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKind {
    Known(FileType),
    /// Type bits the protocol has no name for; carries the raw `S_IFMT` bits.
    Unknown(u32),
}

impl HostKind {
    /// Wire type for this kind. Unmodelled kinds are reported as regular files.
    pub fn file_type(self) -> FileType {
        match self {
            HostKind::Known(kind) => kind,
            HostKind::Unknown(_) => FileType::Regular,
        }
    }

    pub fn is(self, kind: FileType) -> bool {
        self == HostKind::Known(kind)
    }
}

pub fn type_to_mode(kind: FileType) -> u32 {
    match kind {
        FileType::Regular => S_IFREG,
        FileType::Directory => S_IFDIR,
        FileType::BlockDevice => S_IFBLK,
        FileType::CharDevice => S_IFCHR,
        FileType::Symlink => S_IFLNK,
        FileType::Socket => S_IFSOCK,
        FileType::NamedPipe => S_IFIFO,
    }
}

pub fn file_type_from_mode(mode: u32) -> HostKind {
    match mode & S_IFMT {
        S_IFREG => HostKind::Known(FileType::Regular),
        S_IFDIR => HostKind::Known(FileType::Directory),
        S_IFBLK => HostKind::Known(FileType::BlockDevice),
        S_IFCHR => HostKind::Known(FileType::CharDevice),
        S_IFLNK => HostKind::Known(FileType::Symlink),
        S_IFSOCK => HostKind::Known(FileType::Socket),
        S_IFIFO => HostKind::Known(FileType::NamedPipe),
        other => HostKind::Unknown(other),
    }
}

pub fn nfs_time_from_raw(sec: i64, nsec: i64) -> NfsTime {
    if sec < 0 {
        return NfsTime::default();
    }
    let seconds = u32::try_from(sec).unwrap_or(u32::MAX);
    let nseconds = nsec.clamp(0, 999_999_999) as u32;
    NfsTime::new(seconds, nseconds)
}

pub fn retry_eintr<T, F>(mut op: F) -> Result<T, nix::Error>
where
    F: FnMut() -> Result<T, nix::Error>,
{
    loop {
        match op() {
            Err(err) if err == NixErrno::EINTR => continue,
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_bits_round_trip() {
        for kind in FileType::ALL {
            assert_eq!(file_type_from_mode(type_to_mode(kind)), HostKind::Known(kind));
        }
    }

    #[test]
    fn type_bits_are_distinct() {
        for (i, a) in FileType::ALL.iter().enumerate() {
            for b in &FileType::ALL[i + 1..] {
                assert_ne!(type_to_mode(*a), type_to_mode(*b));
            }
        }
    }

    #[test]
    fn permission_bits_do_not_affect_decoding() {
        let mode = type_to_mode(FileType::Directory) | 0o1777;
        assert_eq!(file_type_from_mode(mode), HostKind::Known(FileType::Directory));
    }

    #[test]
    fn unknown_type_bits_are_not_an_error() {
        // No host assigns type 0.
        let kind = file_type_from_mode(0o644);
        assert_eq!(kind, HostKind::Unknown(0));
        assert_eq!(kind.file_type(), FileType::Regular);
    }

    #[test]
    fn times_are_clamped_to_wire_range() {
        assert_eq!(nfs_time_from_raw(-5, 10), NfsTime::new(0, 0));
        assert_eq!(nfs_time_from_raw(12, 34), NfsTime::new(12, 34));
        assert_eq!(
            nfs_time_from_raw(i64::from(u32::MAX) + 10, 2_000_000_000),
            NfsTime::new(u32::MAX, 999_999_999)
        );
        assert_eq!(nfs_time_from_raw(7, -1), NfsTime::new(7, 0));
    }

    #[test]
    fn retry_eintr_retries_until_result() {
        let mut attempts = 0;
        let res = retry_eintr(|| {
            attempts += 1;
            if attempts < 3 {
                Err(NixErrno::EINTR)
            } else {
                Ok(attempts)
            }
        });
        assert_eq!(res, Ok(3));
    }
}
