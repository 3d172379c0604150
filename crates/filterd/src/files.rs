//! Atomic file replacement shared by the evidence store and the process guard.

use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Writes `contents` to `path` through a temporary sibling and a rename.
///
/// Data is flushed and fsync'd before the rename so readers never observe a
/// partially written file. The result is readable only by the owner.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "target path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("filterd"),
    );
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        builder.permissions(Permissions::from_mode(0o600));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
