//! Archive packaging for generated project trees.
//!
//! A tree is written as a gzip-compressed tar into a named temporary file.
//! Entries are streamed one at a time, so nothing beyond the compressor
//! window is buffered. The caller only ever sees a fully written archive:
//! on failure the temporary file is removed when it is dropped.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::codegen::artifact::ProjectTree;
use crate::codegen::naming::NameForms;
use crate::config::GeneratorConfig;
use crate::error::{ArchiveWriteError, GenerationError};

/// Media type of the archives produced here
pub const MEDIA_TYPE: &str = "application/gzip";

/// Mode of every archive entry
pub const FILE_MODE: u32 = 0o644;

const EXTENSION: &str = "tar.gz";

/// Delivery file name for a project, e.g. "order-desk.tar.gz"
pub fn archive_file_name(project: &str) -> Result<String, GenerationError> {
    let names = NameForms::project(project)?;
    Ok(format!("{}.{}", names.kebab, EXTENSION))
}

/// A finished archive, readable from the start.
///
/// Owns the backing temporary file; dropping the stream deletes it.
#[derive(Debug)]
pub struct ArchiveStream {
    name: String,
    len: u64,
    reader: File,
    _file: NamedTempFile,
}

impl ArchiveStream {
    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &'static str {
        MEDIA_TYPE
    }

    /// Archive size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the remaining archive bytes to `path`
    pub fn save_to<P: AsRef<Path>>(mut self, path: P) -> io::Result<u64> {
        let mut out = crate::codegen::fs_utils::create_file(path)?;
        let copied = io::copy(&mut self, &mut out)?;
        out.flush()?;
        Ok(copied)
    }
}

impl Read for ArchiveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Writes project trees into compressed archives
#[derive(Debug, Clone, Default)]
pub struct Archiver {
    temp_dir: Option<PathBuf>,
}

impl Archiver {
    /// Archiver staging files in `temp_dir`, or the system temp directory when `None`
    pub fn new(temp_dir: Option<PathBuf>) -> Self {
        Archiver { temp_dir }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.temp_dir.clone())
    }

    /// Package `tree` as `name`.
    ///
    /// An I/O failure is retried once with a fresh temporary file before it
    /// is returned.
    pub fn archive(&self, tree: &ProjectTree, name: &str) -> Result<ArchiveStream, ArchiveWriteError> {
        match self.write_archive(tree, name) {
            Ok(stream) => Ok(stream),
            Err(first) => {
                tracing::warn!(archive = %name, error = %first, "archive write failed, retrying once");
                self.write_archive(tree, name)
                    .map_err(|e| ArchiveWriteError::new(name, e))
            }
        }
    }

    fn temp_file(&self) -> io::Result<NamedTempFile> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("schemaforge-").suffix(".tar.gz");
            builder
        };
        match self.temp_dir {
            Some(ref dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    fn write_archive(&self, tree: &ProjectTree, name: &str) -> io::Result<ArchiveStream> {
        let file = self.temp_file()?;

        let encoder = GzEncoder::new(BufWriter::new(file.as_file()), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, content) in tree.iter() {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(content.len() as u64);
            header.set_mode(FILE_MODE);
            header.set_mtime(0);
            header.set_uid(0);
            header.set_gid(0);
            builder.append_data(&mut header, path, content)?;
        }

        let encoder = builder.into_inner()?;
        let writer = encoder.finish()?;
        writer.into_inner().map_err(|e| e.into_error())?;
        file.as_file().sync_all()?;

        let len = file.as_file().metadata()?.len();
        let reader = file.reopen()?;

        tracing::info!(archive = %name, entries = tree.len(), bytes = len, "archive written");
        Ok(ArchiveStream {
            name: name.to_string(),
            len,
            reader,
            _file: file,
        })
    }
}

/// Package a tree with the default archiver
pub fn archive(tree: &ProjectTree, name: &str) -> Result<ArchiveStream, ArchiveWriteError> {
    Archiver::default().archive(tree, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    fn sample_tree() -> ProjectTree {
        let mut tree = ProjectTree::new();
        tree.insert("composer.json", "{}\n");
        tree.insert("app/Models/Post.php", "<?php\n\nclass Post {}\n");
        tree.insert("storage/logs/.gitignore", "*\n!.gitignore\n");
        tree
    }

    #[test]
    fn test_archive_entries_match_tree() {
        let tree = sample_tree();
        let stream = archive(&tree, "blog.tar.gz").unwrap();
        assert_eq!(stream.file_name(), "blog.tar.gz");
        assert!(!stream.is_empty());

        let mut entries = tar::Archive::new(GzDecoder::new(stream));
        let mut seen = Vec::new();
        for entry in entries.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            assert_eq!(entry.header().mode().unwrap(), FILE_MODE);
            assert_eq!(entry.header().mtime().unwrap(), 0);

            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            assert_eq!(tree.get(&path), Some(content.as_slice()));
            seen.push(path);
        }

        let expected: Vec<String> = tree.paths().map(str::to_string).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_archive_is_reproducible() {
        let tree = sample_tree();
        let mut a = Vec::new();
        let mut b = Vec::new();
        archive(&tree, "x.tar.gz").unwrap().read_to_end(&mut a).unwrap();
        archive(&tree, "x.tar.gz").unwrap().read_to_end(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_failed_archive_leaves_no_files() {
        let staging = tempfile::tempdir().unwrap();
        let mut tree = sample_tree();
        tree.insert("../escape.txt", "nope");

        let err = Archiver::new(Some(staging.path().to_path_buf()))
            .archive(&tree, "bad.tar.gz")
            .unwrap_err();
        assert_eq!(err.name, "bad.tar.gz");
        assert_eq!(err.report().kind, "archive_write");
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_dropping_stream_removes_temp_file() {
        let staging = tempfile::tempdir().unwrap();
        let stream = Archiver::new(Some(staging.path().to_path_buf()))
            .archive(&sample_tree(), "blog.tar.gz")
            .unwrap();
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 1);
        drop(stream);
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_to_and_file_name() {
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("dist/blog.tar.gz");
        let stream = archive(&sample_tree(), "blog.tar.gz").unwrap();
        let len = stream.len();
        assert_eq!(stream.save_to(&target).unwrap(), len);
        assert_eq!(std::fs::metadata(&target).unwrap().len(), len);

        assert_eq!(archive_file_name("Order Desk").unwrap(), "order-desk.tar.gz");
        assert!(archive_file_name("9lives").is_err());
    }
}
