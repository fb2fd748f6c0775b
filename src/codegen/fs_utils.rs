//! Filesystem utilities for writing generated output

use std::fs;
use std::io::{self};
use std::path::{Component, Path, PathBuf};

use super::artifact::ProjectTree;

/// Write content to a file, creating parent directories if needed
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, contents)
}

/// Create a file for writing, creating parent directories if needed
pub fn create_file<P: AsRef<Path>>(path: P) -> io::Result<fs::File> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::File::create(path)
}

/// Join a tree-relative path onto `root`, refusing anything that would escape it
pub fn safe_join(root: &Path, relative: &str) -> io::Result<PathBuf> {
    let relative = Path::new(relative);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));

    if escapes || relative.as_os_str().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to write outside the output directory: {}", relative.display()),
        ));
    }
    Ok(root.join(relative))
}

/// Write every file of a project tree below `root`; returns the number of files written
pub fn write_tree<P: AsRef<Path>>(tree: &ProjectTree, root: P) -> io::Result<usize> {
    let root = root.as_ref();
    let mut written = 0;

    for (path, content) in tree.iter() {
        write_file(safe_join(root, path)?, content)?;
        written += 1;
    }

    tracing::debug!(files = written, root = %root.display(), "wrote project tree");
    Ok(written)
}
