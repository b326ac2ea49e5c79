use crate::proto::NfsStat;
use nix::errno::Errno;

/// Maps a host errno to the NFSv3 status reported to the client. Every call
/// site that turns a failed system call into a status goes through here.
pub fn status_from_errno(errno: Errno) -> NfsStat {
    match errno {
        Errno::EPERM => NfsStat::Perm,
        Errno::ENOENT => NfsStat::NoEnt,
        Errno::EIO => NfsStat::Io,
        Errno::ENXIO => NfsStat::Nxio,
        Errno::EACCES => NfsStat::Acces,
        Errno::EEXIST => NfsStat::Exist,
        Errno::EXDEV => NfsStat::XDev,
        Errno::ENODEV => NfsStat::NoDev,
        Errno::ENOTDIR => NfsStat::NotDir,
        Errno::EISDIR => NfsStat::IsDir,
        Errno::EINVAL => NfsStat::Inval,
        Errno::EFBIG => NfsStat::FBig,
        Errno::ENOSPC => NfsStat::NoSpc,
        Errno::EROFS => NfsStat::Rofs,
        Errno::EMLINK => NfsStat::MLink,
        Errno::ENAMETOOLONG => NfsStat::NameTooLong,
        Errno::ENOTEMPTY => NfsStat::NotEmpty,
        Errno::EDQUOT => NfsStat::DQuot,
        Errno::ESTALE => NfsStat::Stale,
        Errno::EOPNOTSUPP => NfsStat::NotSupp,
        // A separate value from EOPNOTSUPP outside Linux.
        #[cfg(any(
            target_vendor = "apple",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "illumos",
            target_os = "solaris",
            target_os = "aix",
        ))]
        Errno::ENOTSUP => NfsStat::NotSupp,
        _ => NfsStat::ServerFault,
    }
}

impl From<Errno> for NfsStat {
    fn from(value: Errno) -> Self {
        status_from_errno(value)
    }
}

/// Errors raised while reading export configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown export option `{0}`")]
    UnknownOption(String),
    #[error("invalid value `{value}` for export option `{option}`")]
    InvalidValue { option: &'static str, value: String },
    #[error("export option `{0}` requires a value")]
    MissingValue(&'static str),
    #[error("invalid file handle: {0}")]
    BadHandle(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_errnos_map_to_their_status() {
        let table = [
            (Errno::EPERM, NfsStat::Perm),
            (Errno::ENOENT, NfsStat::NoEnt),
            (Errno::EIO, NfsStat::Io),
            (Errno::ENXIO, NfsStat::Nxio),
            (Errno::EACCES, NfsStat::Acces),
            (Errno::EEXIST, NfsStat::Exist),
            (Errno::EXDEV, NfsStat::XDev),
            (Errno::ENODEV, NfsStat::NoDev),
            (Errno::ENOTDIR, NfsStat::NotDir),
            (Errno::EISDIR, NfsStat::IsDir),
            (Errno::EINVAL, NfsStat::Inval),
            (Errno::EFBIG, NfsStat::FBig),
            (Errno::ENOSPC, NfsStat::NoSpc),
            (Errno::EROFS, NfsStat::Rofs),
            (Errno::EMLINK, NfsStat::MLink),
            (Errno::ENAMETOOLONG, NfsStat::NameTooLong),
            (Errno::ENOTEMPTY, NfsStat::NotEmpty),
            (Errno::EDQUOT, NfsStat::DQuot),
            (Errno::ESTALE, NfsStat::Stale),
            (Errno::EOPNOTSUPP, NfsStat::NotSupp),
            (Errno::ENOTSUP, NfsStat::NotSupp),
        ];
        for (errno, status) in table {
            assert_eq!(status_from_errno(errno), status, "{errno:?}");
        }
    }

    #[test]
    fn unmapped_errno_is_server_fault() {
        assert_eq!(status_from_errno(Errno::EBADF), NfsStat::ServerFault);
        assert_eq!(status_from_errno(Errno::EAGAIN), NfsStat::ServerFault);
    }

    #[test]
    fn mapping_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(NfsStat::from(Errno::EROFS), NfsStat::Rofs);
        }
    }
}
