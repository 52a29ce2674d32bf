use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::archive::{self, OpenArchive};
use crate::error::ScanError;
use crate::location::ResourceLocation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClasspathEntry {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl ClasspathEntry {
    /// Classifies a classpath element. Existing directories are directory roots
    /// whatever their name. Otherwise `.jar`/`.zip` names and existing regular
    /// files are archives, and anything else is a directory root. Relative paths
    /// are made absolute against the current directory.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if path.is_dir() {
            return Self::Directory(path);
        }
        let is_archive_name = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"));

        if is_archive_name || path.is_file() {
            Self::Archive(path)
        } else {
            Self::Directory(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(p) | Self::Archive(p) => p,
        }
    }

    fn resource(&self, resource_path: &str) -> Result<Option<ResourceLocation>, ScanError> {
        match self {
            Self::Directory(root) => {
                let dir = join_resource(root, resource_path);
                Ok(dir.is_dir().then(|| ResourceLocation::file(dir)))
            }
            Self::Archive(jar) => {
                if !jar.is_file() {
                    return Ok(None);
                }
                let found = archive::contains_directory(jar, resource_path)?;
                Ok(found.then(|| ResourceLocation::archive(jar.clone(), resource_path)))
            }
        }
    }
}

/// Ordered search path of directory and archive roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    entries: Vec<ClasspathEntry>,
}

impl Classpath {
    pub fn new(entries: Vec<ClasspathEntry>) -> Self {
        Self { entries }
    }

    /// Splits a platform path list (`:` on Unix, `;` on Windows), skipping empty elements.
    pub fn parse(raw: impl AsRef<OsStr>) -> Self {
        let entries = std::env::split_paths(raw.as_ref())
            .filter(|p| !p.as_os_str().is_empty())
            .map(ClasspathEntry::from_path)
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, entry: ClasspathEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every root that holds `resource_path` as a directory, in classpath order.
    pub fn find_resources(&self, resource_path: &str) -> Result<Vec<ResourceLocation>, ScanError> {
        let mut found = Vec::new();
        for entry in &self.entries {
            if let Some(location) = entry.resource(resource_path)? {
                found.push(location);
            }
        }
        Ok(found)
    }

    /// Bytes of the first class file named `class_path`, with the location they came from.
    pub fn find_class_file(
        &self,
        class_path: &str,
    ) -> Result<Option<(ResourceLocation, Vec<u8>)>, ScanError> {
        self.reader().find_class_file(class_path)
    }

    /// A reader for a batch of class-file lookups.
    pub fn reader(&self) -> ClasspathReader<'_> {
        ClasspathReader {
            classpath: self,
            archives: HashMap::new(),
        }
    }
}

/// Class-file lookups over a [`Classpath`] that share opened archives.
///
/// An archive root is opened on first use and stays mapped until the reader is
/// dropped, so a batch of lookups parses each jar's central directory once.
pub struct ClasspathReader<'a> {
    classpath: &'a Classpath,
    archives: HashMap<usize, Option<OpenArchive>>,
}

impl ClasspathReader<'_> {
    /// Same lookup as [`Classpath::find_class_file`]: the first root holding
    /// `class_path` wins.
    pub fn find_class_file(
        &mut self,
        class_path: &str,
    ) -> Result<Option<(ResourceLocation, Vec<u8>)>, ScanError> {
        let classpath = self.classpath;
        for (index, entry) in classpath.entries.iter().enumerate() {
            let hit = match entry {
                ClasspathEntry::Directory(root) => read_directory_class(root, class_path)?,
                ClasspathEntry::Archive(jar) => {
                    let slot = match self.archives.entry(index) {
                        Entry::Occupied(slot) => slot.into_mut(),
                        // A missing jar is remembered as absent and never retried.
                        Entry::Vacant(slot) => slot.insert(if jar.is_file() {
                            Some(OpenArchive::open(jar)?)
                        } else {
                            None
                        }),
                    };
                    match slot {
                        Some(opened) => opened
                            .read_entry(class_path)?
                            .map(|bytes| (ResourceLocation::archive(jar.clone(), class_path), bytes)),
                        None => None,
                    }
                }
            };
            if hit.is_some() {
                return Ok(hit);
            }
        }
        Ok(None)
    }

    /// Archives opened so far.
    pub fn archives_opened(&self) -> usize {
        self.archives.values().filter(|slot| slot.is_some()).count()
    }
}

fn read_directory_class(
    root: &Path,
    class_path: &str,
) -> Result<Option<(ResourceLocation, Vec<u8>)>, ScanError> {
    let file = join_resource(root, class_path);
    if !file.is_file() {
        return Ok(None);
    }
    let bytes = std::fs::read(&file).map_err(|e| ScanError::io(&file, e))?;
    Ok(Some((ResourceLocation::file(file), bytes)))
}

fn join_resource(root: &Path, resource_path: &str) -> PathBuf {
    resource_path
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "package_scan_classpath_{}_{}_{}_{}",
            std::process::id(),
            nanos,
            n,
            name
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, FileOptions::default())?;
            zip.write_all(content)?;
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn from_path_classifies_archives_and_directories() {
        let base = temp_dir("classify");
        let plain_file = base.join("lib.bundle");
        std::fs::write(&plain_file, b"x").unwrap();

        assert!(matches!(
            ClasspathEntry::from_path(base.join("missing.jar")),
            ClasspathEntry::Archive(_)
        ));
        assert!(matches!(
            ClasspathEntry::from_path(&plain_file),
            ClasspathEntry::Archive(_)
        ));
        assert!(matches!(
            ClasspathEntry::from_path(&base),
            ClasspathEntry::Directory(_)
        ));
        assert!(ClasspathEntry::from_path("relative/classes").path().is_absolute());

        let _ = std::fs::remove_dir_all(base);
    }

    #[test]
    fn parse_skips_empty_elements() {
        let joined = std::env::join_paths(["/a/classes", "", "/b/lib.jar"]).unwrap();
        let cp = Classpath::parse(&joined);
        assert_eq!(
            cp.entries(),
            &[
                ClasspathEntry::Directory(PathBuf::from("/a/classes")),
                ClasspathEntry::Archive(PathBuf::from("/b/lib.jar")),
            ]
        );
    }

    #[test]
    fn find_resources_reports_each_matching_root_in_order() -> anyhow::Result<()> {
        let base = temp_dir("resources");
        let classes = base.join("classes");
        std::fs::create_dir_all(classes.join("org/acme"))?;
        let jar = base.join("acme.jar");
        write_jar(&jar, &[("org/acme/web/A.class", b"")])?;
        let other = base.join("other.jar");
        write_jar(&other, &[("net/other/B.class", b"")])?;

        let cp = Classpath::new(vec![
            ClasspathEntry::Directory(classes.clone()),
            ClasspathEntry::Archive(jar.clone()),
            ClasspathEntry::Archive(other.clone()),
            ClasspathEntry::Archive(base.join("absent.jar")),
        ]);

        assert_eq!(
            cp.find_resources("org/acme")?,
            vec![
                ResourceLocation::file(classes.join("org").join("acme")),
                ResourceLocation::archive(jar.clone(), "org/acme"),
            ]
        );
        assert!(cp.find_resources("com/nothing")?.is_empty());
        assert_eq!(cp.find_resources("")?.len(), 3);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn find_class_file_prefers_the_first_root() -> anyhow::Result<()> {
        let base = temp_dir("first_root");
        let classes = base.join("classes");
        std::fs::create_dir_all(classes.join("org/acme"))?;
        std::fs::write(classes.join("org/acme/A.class"), b"from-dir")?;
        let jar = base.join("acme.jar");
        write_jar(
            &jar,
            &[
                ("org/acme/A.class", &b"from-jar"[..]),
                ("org/acme/B.class", &b"b"[..]),
            ],
        )?;

        let cp = Classpath::new(vec![
            ClasspathEntry::Directory(classes.clone()),
            ClasspathEntry::Archive(jar.clone()),
        ]);

        let (origin, bytes) = cp.find_class_file("org/acme/A.class")?.unwrap();
        assert_eq!(bytes, b"from-dir");
        assert_eq!(origin.scheme(), "file");

        let (origin, bytes) = cp.find_class_file("org/acme/B.class")?.unwrap();
        assert_eq!(bytes, b"b");
        assert_eq!(origin, ResourceLocation::archive(jar, "org/acme/B.class"));

        assert!(cp.find_class_file("org/acme/C.class")?.is_none());

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn directory_with_archive_extension_is_a_directory_root() -> anyhow::Result<()> {
        let base = temp_dir("exploded");
        let exploded = base.join("app.jar");
        std::fs::create_dir_all(exploded.join("org/acme"))?;
        std::fs::write(exploded.join("org/acme/A.class"), b"exploded")?;

        let joined = std::env::join_paths([&exploded, &base.join("lib.zip")])?;
        let cp = Classpath::parse(&joined);
        assert_eq!(
            cp.entries(),
            &[
                ClasspathEntry::Directory(exploded.clone()),
                ClasspathEntry::Archive(base.join("lib.zip")),
            ]
        );

        let (origin, bytes) = cp.find_class_file("org/acme/A.class")?.unwrap();
        assert_eq!(bytes, b"exploded");
        assert_eq!(origin.scheme(), "file");
        assert_eq!(cp.find_resources("org/acme")?.len(), 1);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn reader_opens_each_archive_once_for_a_batch() -> anyhow::Result<()> {
        let base = temp_dir("reader");
        let names: Vec<String> = (0..3000)
            .map(|i| format!("org/acme/p{}/C{i}.class", i % 7))
            .collect();
        let entries: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"c"[..])).collect();
        let big = base.join("big.jar");
        write_jar(&big, &entries)?;
        let small = base.join("small.jar");
        write_jar(&small, &[("net/other/B.class", &b"b"[..])])?;

        let cp = Classpath::new(vec![
            ClasspathEntry::Archive(base.join("absent.jar")),
            ClasspathEntry::Archive(small.clone()),
            ClasspathEntry::Archive(big.clone()),
        ]);

        let mut reader = cp.reader();
        assert_eq!(reader.archives_opened(), 0);
        for name in &names {
            let (origin, bytes) = reader.find_class_file(name)?.unwrap();
            assert_eq!(bytes, b"c");
            assert_eq!(origin, ResourceLocation::archive(big.clone(), name));
        }
        assert!(reader.find_class_file("org/acme/Missing.class")?.is_none());
        assert_eq!(reader.archives_opened(), 2);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }
}
