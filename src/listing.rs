//! One-line descriptions of directory entries for `list`.

use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::fs::{self, DirEntry, Metadata};
use std::io;
use std::path::Path;

/// `Mon DD, YYYY hh:mm` on a 12-hour clock.
const TIMESTAMP_FORMAT: &str = "%b %d, %Y %I:%M";

/// Type and access flags, rendered as e.g. `drwx` or `-rw-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub dir: bool,
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Access {
    /// What the current user may do with `path`.
    #[cfg(unix)]
    pub fn of(path: &Path, meta: &Metadata) -> Self {
        use nix::unistd::{AccessFlags, access};
        let can = |flags| access(path, flags).is_ok();
        Self {
            dir: meta.is_dir(),
            read: can(AccessFlags::R_OK),
            write: can(AccessFlags::W_OK),
            execute: can(AccessFlags::X_OK),
        }
    }

    #[cfg(not(unix))]
    pub fn of(_path: &Path, meta: &Metadata) -> Self {
        Self {
            dir: meta.is_dir(),
            read: true,
            write: !meta.permissions().readonly(),
            execute: meta.is_dir(),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool, c: char| if on { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            flag(self.dir, 'd'),
            flag(self.read, 'r'),
            flag(self.write, 'w'),
            flag(self.execute, 'x')
        )
    }
}

pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_row(access: Access, size: u64, modified: &str, name: &str) -> String {
    format!("{access} {size:>10} {modified} {name}")
}

/// Describe one entry: access flags, size, modification time and base name.
///
/// Symlinks are followed; a dangling link is described by the link itself.
pub fn describe(entry: &DirEntry) -> io::Result<String> {
    let path = entry.path();
    let meta = match fs::metadata(&path) {
        Ok(meta) => meta,
        Err(_) => entry.metadata()?,
    };
    let modified: DateTime<Local> = meta.modified()?.into();
    Ok(format_row(
        Access::of(&path, &meta),
        meta.len(),
        &format_timestamp(&modified),
        &entry.file_name().to_string_lossy(),
    ))
}
