use anyhow::Result;
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::ScanError;
use crate::naming::CLASS_SUFFIX;

/// A memory-mapped jar with its central directory parsed once.
///
/// Entry lookups go through the archive's name table, so repeated reads from
/// the same jar cost no re-parsing. The mapping is released when the value is
/// dropped.
pub struct OpenArchive {
    path: PathBuf,
    archive: ZipArchive<Cursor<Mmap>>,
}

impl OpenArchive {
    pub fn open(archive_path: &Path) -> Result<Self, ScanError> {
        let file = File::open(archive_path).map_err(|e| ScanError::io(archive_path, e))?;
        // SAFETY: The file is opened read-only and the mapping is owned by the archive,
        // which is never handed out beyond this value's lifetime.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ScanError::io(archive_path, e))?;
        let archive = ZipArchive::new(Cursor::new(mmap)).map_err(|e| zip_error(archive_path, e))?;
        Ok(Self {
            path: archive_path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Reads a single entry, or `None` when the archive has no such entry.
    pub fn read_entry(&mut self, entry_name: &str) -> Result<Option<Vec<u8>>, ScanError> {
        let mut entry = match self.archive.by_name(entry_name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(zip_error(&self.path, e)),
        };
        // Grow from empty; the recorded entry size is unchecked.
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ScanError::io(&self.path, e))?;
        Ok(Some(bytes))
    }
}

/// Opens `archive_path`, hands the parsed archive to `f` and releases the file
/// and its mapping before returning, on success and on error alike.
fn with_archive<T>(
    archive_path: &Path,
    f: impl FnOnce(&mut ZipArchive<Cursor<Mmap>>) -> Result<T, ScanError>,
) -> Result<T, ScanError> {
    let mut opened = OpenArchive::open(archive_path)?;
    f(&mut opened.archive)
}

fn zip_error(archive_path: &Path, err: ZipError) -> ScanError {
    ScanError::io(archive_path, std::io::Error::from(err))
}

/// Entry names ending in `.class`, optionally restricted to those under `prefix/`.
pub fn class_entries(archive_path: &Path, prefix: Option<&str>) -> Result<Vec<String>, ScanError> {
    let dir_prefix = prefix.filter(|p| !p.is_empty()).map(|p| format!("{p}/"));

    with_archive(archive_path, |archive| {
        let mut names = Vec::new();
        for i in 0..archive.len() {
            let entry = archive
                .by_index_raw(i)
                .map_err(|e| zip_error(archive_path, e))?;
            let name = entry.name();
            if !name.ends_with(CLASS_SUFFIX) {
                continue;
            }
            if let Some(p) = dir_prefix.as_deref()
                && !name.starts_with(p)
            {
                continue;
            }
            names.push(name.to_string());
        }
        Ok(names)
    })
}

/// True when the archive holds `resource_path` as a directory, either through an explicit
/// directory entry or through any entry nested below it. Every archive holds the root.
pub fn contains_directory(archive_path: &Path, resource_path: &str) -> Result<bool, ScanError> {
    let dir_prefix = format!("{}/", resource_path.trim_end_matches('/'));

    with_archive(archive_path, |archive| {
        if resource_path.is_empty() {
            return Ok(true);
        }
        Ok(archive.file_names().any(|name| name.starts_with(&dir_prefix)))
    })
}

/// Reads a single entry, or `None` when the archive has no such entry.
pub fn read_entry(archive_path: &Path, entry_name: &str) -> Result<Option<Vec<u8>>, ScanError> {
    OpenArchive::open(archive_path)?.read_entry(entry_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "package_scan_archive_{}_{}_{}_{}",
            std::process::id(),
            nanos,
            n,
            name
        ))
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(name.trim_end_matches('/'), options)?;
            } else {
                zip.start_file(*name, options)?;
                zip.write_all(content)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    #[test]
    fn class_entries_lists_every_class_unless_prefixed() -> anyhow::Result<()> {
        let jar = temp_path("entries.jar");
        write_jar(
            &jar,
            &[
                ("org/acme/A.class", b""),
                ("org/acme/web/B$1.class", b""),
                ("org/other/C.class", b""),
                ("META-INF/MANIFEST.MF", b""),
            ],
        )?;

        let mut all = class_entries(&jar, None)?;
        all.sort();
        assert_eq!(
            all,
            vec![
                "org/acme/A.class",
                "org/acme/web/B$1.class",
                "org/other/C.class"
            ]
        );

        let mut scoped = class_entries(&jar, Some("org/acme"))?;
        scoped.sort();
        assert_eq!(scoped, vec!["org/acme/A.class", "org/acme/web/B$1.class"]);

        assert_eq!(class_entries(&jar, Some(""))?.len(), 3);

        std::fs::remove_file(jar)?;
        Ok(())
    }

    #[test]
    fn contains_directory_matches_nested_entries_and_directory_entries() -> anyhow::Result<()> {
        let jar = temp_path("dirs.jar");
        write_jar(
            &jar,
            &[("org/acme/A.class", b""), ("com/empty/", b"")],
        )?;

        assert!(contains_directory(&jar, "org")?);
        assert!(contains_directory(&jar, "org/acme")?);
        assert!(contains_directory(&jar, "com/empty")?);
        assert!(contains_directory(&jar, "")?);
        assert!(!contains_directory(&jar, "org/ac")?);
        assert!(!contains_directory(&jar, "net")?);

        std::fs::remove_file(jar)?;
        Ok(())
    }

    #[test]
    fn read_entry_returns_none_for_missing_entries() -> anyhow::Result<()> {
        let jar = temp_path("read.jar");
        write_jar(&jar, &[("org/acme/A.class", b"bytes")])?;

        assert_eq!(read_entry(&jar, "org/acme/A.class")?.as_deref(), Some(&b"bytes"[..]));
        assert_eq!(read_entry(&jar, "org/acme/B.class")?, None);

        std::fs::remove_file(jar)?;
        Ok(())
    }

    #[test]
    fn open_archive_serves_many_reads_from_one_mapping() -> anyhow::Result<()> {
        let jar = temp_path("open.jar");
        write_jar(
            &jar,
            &[("org/acme/A.class", b"first"), ("org/acme/B.class", b"second")],
        )?;

        let mut opened = OpenArchive::open(&jar)?;
        assert_eq!(opened.len(), 2);
        assert_eq!(opened.path(), jar.as_path());
        assert_eq!(opened.read_entry("org/acme/B.class")?.as_deref(), Some(&b"second"[..]));
        assert_eq!(opened.read_entry("org/acme/A.class")?.as_deref(), Some(&b"first"[..]));
        assert_eq!(opened.read_entry("org/acme/C.class")?, None);

        drop(opened);
        std::fs::remove_file(jar)?;
        Ok(())
    }

    #[test]
    fn read_entry_ignores_an_inflated_recorded_size() -> anyhow::Result<()> {
        let jar = temp_path("inflated.jar");
        write_jar(&jar, &[("org/acme/A.class", b"tiny")])?;

        // Rewrite the central directory's uncompressed size to almost 4 GiB.
        let mut raw = std::fs::read(&jar)?;
        let header = raw
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .expect("central directory header");
        raw[header + 24..header + 28].copy_from_slice(&0xFFFF_FF00u32.to_le_bytes());
        std::fs::write(&jar, &raw)?;

        assert_eq!(read_entry(&jar, "org/acme/A.class")?.as_deref(), Some(&b"tiny"[..]));

        std::fs::remove_file(jar)?;
        Ok(())
    }

    #[test]
    fn corrupt_archive_is_an_io_failure() -> anyhow::Result<()> {
        let jar = temp_path("corrupt.jar");
        std::fs::write(&jar, b"definitely not a zip file")?;

        let err = class_entries(&jar, None).unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));

        std::fs::remove_file(jar)?;
        Ok(())
    }
}
