use crate::error::ConfigError;
use nix::unistd::{getegid, geteuid};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Options handled by the mount/authorization layer. They are accepted so a
/// full exports line can be parsed, but have no effect on attributes.
const PASSTHROUGH_OPTIONS: &[&str] = &[
    "rw",
    "ro",
    "sync",
    "async",
    "secure",
    "insecure",
    "root_squash",
    "no_root_squash",
    "all_squash",
    "no_all_squash",
];

/// Per-export settings that change how attributes are reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// The export root sits on removable media and must not be stat'ed.
    pub removable: bool,
    /// Reported instead of the host device number.
    pub fsid: Option<u64>,
    /// Host inode numbers are not durable; take `fileid` from the handle.
    pub handle_fileid: bool,
    /// Report objects owned by the server's ids as owned by the caller.
    pub single_user: bool,
    pub server_uid: u32,
    pub server_gid: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            removable: false,
            fsid: None,
            handle_fileid: false,
            single_user: false,
            server_uid: geteuid().as_raw(),
            server_gid: getegid().as_raw(),
        }
    }
}

impl FromStr for ExportOptions {
    type Err = ConfigError;

    /// Parses a comma separated exports option list such as
    /// `rw,removable,fsid=7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut options = ExportOptions::default();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let (key, value) = match item.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (item, None),
            };
            match key {
                "removable" => options.removable = true,
                "handle_fileid" => options.handle_fileid = true,
                "single_user" => options.single_user = true,
                "fsid" => {
                    let value = value.ok_or(ConfigError::MissingValue("fsid"))?;
                    let fsid = value.parse().map_err(|_| ConfigError::InvalidValue {
                        option: "fsid",
                        value: value.to_owned(),
                    })?;
                    options.fsid = Some(fsid);
                }
                _ if PASSTHROUGH_OPTIONS.contains(&key) => {}
                _ => return Err(ConfigError::UnknownOption(key.to_owned())),
            }
        }
        Ok(options)
    }
}

#[derive(Clone, Debug)]
pub struct Export {
    pub root: PathBuf,
    pub options: ExportOptions,
}

impl Export {
    pub fn new(root: impl Into<PathBuf>, options: ExportOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Paths reach this layer already resolved, so a plain comparison suffices.
    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_option_string_gives_defaults() {
        let options: ExportOptions = "".parse().unwrap();
        assert_eq!(options, ExportOptions::default());
    }

    #[test]
    fn parses_recognised_options() {
        let options: ExportOptions = "rw, removable,fsid=7,handle_fileid,single_user"
            .parse()
            .unwrap();
        assert!(options.removable);
        assert!(options.handle_fileid);
        assert!(options.single_user);
        assert_eq!(options.fsid, Some(7));
    }

    #[test]
    fn rejects_unknown_and_malformed_options() {
        assert_eq!(
            "rw,bogus".parse::<ExportOptions>(),
            Err(ConfigError::UnknownOption("bogus".into()))
        );
        assert_eq!(
            "fsid=abc".parse::<ExportOptions>(),
            Err(ConfigError::InvalidValue {
                option: "fsid",
                value: "abc".into()
            })
        );
        assert_eq!(
            "fsid".parse::<ExportOptions>(),
            Err(ConfigError::MissingValue("fsid"))
        );
    }

    #[test]
    fn export_root_comparison() {
        let export = Export::new("/srv/media", ExportOptions::default());
        assert!(export.is_root(Path::new("/srv/media")));
        assert!(!export.is_root(Path::new("/srv/media/disc")));
    }
}
