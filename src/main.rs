use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nfsattr::{
    ConfigError, Credentials, Export, ExportOptions, FileHandle, NfsTime, ProtocolVersion,
    RequestContext, SetAttr, SetAttrGuard, SetTime, WccData, apply_attributes_guarded, getattr,
    post_op_with_handle, pre_op_from_path,
};
use nix::unistd::{getgid, getuid};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "nfsattr-rs")]
#[command(about = "Report and change local file attributes the way an NFSv3 server does")]
struct Cli {
    /// Root of the export the paths live in.
    #[arg(long, default_value = "/")]
    export_root: PathBuf,

    /// Exports option list, e.g. `rw,removable,fsid=7`.
    #[arg(long, default_value = "")]
    options: String,

    /// Narrow attributes to what NFSv2 can carry.
    #[arg(long, default_value_t = false)]
    v2: bool,

    /// Present files owned by this process as owned by the caller.
    #[arg(long, default_value_t = false)]
    single_user: bool,

    /// Caller uid. Defaults to the real uid of this process.
    #[arg(long)]
    uid: Option<u32>,

    /// Caller gid. Defaults to the real gid of this process.
    #[arg(long)]
    gid: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the fattr3 for a path, or the status GETATTR would return.
    Getattr {
        path: PathBuf,
        /// File handle in hex.
        #[arg(long)]
        handle: Option<String>,
    },
    /// Print the pre-operation attributes of a path.
    Wcc { path: PathBuf },
    /// Apply attribute changes and print the status with before/after attributes.
    Setattr(SetattrArgs),
}

#[derive(Args, Debug)]
struct SetattrArgs {
    path: PathBuf,

    /// Permission bits in octal.
    #[arg(long, value_parser = parse_mode)]
    mode: Option<u32>,

    #[arg(long)]
    owner: Option<u32>,

    #[arg(long)]
    group: Option<u32>,

    /// Truncate or extend to this many bytes.
    #[arg(long)]
    size: Option<u64>,

    /// `now` or `SECONDS[.NANOSECONDS]`.
    #[arg(long, value_parser = parse_set_time)]
    atime: Option<SetTime>,

    /// `now` or `SECONDS[.NANOSECONDS]`.
    #[arg(long, value_parser = parse_set_time)]
    mtime: Option<SetTime>,

    /// Only apply if the current ctime equals `SECONDS[.NANOSECONDS]`.
    #[arg(long, value_parser = parse_nfs_time)]
    guard_ctime: Option<NfsTime>,

    /// File handle in hex.
    #[arg(long)]
    handle: Option<String>,
}

impl SetattrArgs {
    fn change_set(&self) -> SetAttr {
        SetAttr {
            mode: self.mode,
            uid: self.owner,
            gid: self.group,
            size: self.size,
            atime: self.atime.unwrap_or_default(),
            mtime: self.mtime.unwrap_or_default(),
        }
    }

    fn guard(&self) -> SetAttrGuard {
        self.guard_ctime
            .map_or(SetAttrGuard::Unchecked, SetAttrGuard::CtimeMatches)
    }
}

fn parse_mode(value: &str) -> Result<u32, String> {
    let digits = value.trim_start_matches("0o");
    u32::from_str_radix(digits, 8).map_err(|err| format!("invalid octal mode `{value}`: {err}"))
}

fn parse_nfs_time(value: &str) -> Result<NfsTime, String> {
    let (secs, nsecs) = value.split_once('.').unwrap_or((value, "0"));
    let seconds = secs
        .parse()
        .map_err(|err| format!("invalid seconds `{secs}`: {err}"))?;
    let nseconds: u32 = nsecs
        .parse()
        .map_err(|err| format!("invalid nanoseconds `{nsecs}`: {err}"))?;
    if nseconds > 999_999_999 {
        return Err(format!("nanoseconds out of range: {nseconds}"));
    }
    Ok(NfsTime::new(seconds, nseconds))
}

fn parse_set_time(value: &str) -> Result<SetTime, String> {
    if value == "now" {
        return Ok(SetTime::ServerTime);
    }
    parse_nfs_time(value).map(SetTime::ClientTime)
}

fn parse_handle(value: Option<&str>) -> Result<FileHandle, ConfigError> {
    let Some(value) = value else {
        return Ok(FileHandle::default());
    };
    let raw = hex::decode(value).map_err(|err| ConfigError::BadHandle(err.to_string()))?;
    FileHandle::new(raw).map_err(|status| ConfigError::BadHandle(status.to_string()))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut options: ExportOptions = cli
        .options
        .parse()
        .context("parsing --options")?;
    options.single_user |= cli.single_user;

    let cred = Credentials {
        uid: cli.uid.unwrap_or_else(|| getuid().as_raw()),
        gid: cli.gid.unwrap_or_else(|| getgid().as_raw()),
    };
    let version = if cli.v2 {
        ProtocolVersion::V2
    } else {
        ProtocolVersion::V3
    };
    let ctx = RequestContext::new(cred, version, Arc::new(Export::new(cli.export_root, options)));

    // Attribute calls block on the filesystem; keep them off the runtime threads.
    match cli.command {
        Command::Getattr { path, handle } => {
            let handle = parse_handle(handle.as_deref())?;
            let result = tokio::task::spawn_blocking(move || getattr(&path, &handle, &ctx)).await?;
            match result {
                Ok(attr) => println!("{attr:#?}"),
                Err(status) => anyhow::bail!("getattr failed: {status}"),
            }
        }
        Command::Wcc { path } => {
            let view = tokio::task::spawn_blocking(move || pre_op_from_path(&path)).await?;
            println!("{view:#?}");
        }
        Command::Setattr(args) => {
            let handle = parse_handle(args.handle.as_deref())?;
            let changes = args.change_set();
            let guard = args.guard();
            let (status, wcc) = tokio::task::spawn_blocking(move || {
                let before = pre_op_from_path(&args.path);
                let status = apply_attributes_guarded(&args.path, &handle, &changes, guard);
                let after = post_op_with_handle(&args.path, &handle, &ctx);
                (status, WccData::new(before, after))
            })
            .await?;
            println!("{wcc:#?}");
            if !status.is_ok() {
                anyhow::bail!("setattr failed: {status}");
            }
            println!("{status}");
        }
    }

    Ok(())
}
