//! Atomic file replacement for watermark persistence.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Writes `data` to `path` atomically: temp file in the same directory,
/// fsync, rename over the target, fsync the directory. The file lands with
/// mode 0600.
///
/// Readers observe either the old contents or the new contents, never a
/// partial write, even across a crash.
pub fn write_file_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    #[cfg(target_family = "unix")]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;

    // The rename itself must survive a crash as well.
    File::open(dir)?.sync_all()?;
    Ok(())
}
