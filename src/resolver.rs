//! Package-to-class-set resolution.
//!
//! The resolver asks its [`ClassLoader`] for every resource location of a
//! package path, lists class identifiers under each location and loads them.
//!
//! - `file:` locations are walked recursively; nested directories extend the
//!   package name segment by segment.
//! - `jar:` locations list the archive's `.class` entries. With
//!   [`ArchiveFilter::Loose`] every class of the archive is taken, whatever
//!   package was asked for; [`ArchiveFilter::Prefix`] keeps only entries under
//!   the requested package.
//!
//! Any failure aborts the whole call: nothing is returned from a scan that
//! did not complete.

use anyhow::Context;
use ignore::WalkBuilder;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::archive;
use crate::class::ClassHandle;
use crate::error::ScanError;
use crate::loader::ClassLoader;
use crate::location::ResourceLocation;
use crate::naming::{CLASS_SUFFIX, entry_name_to_class_name, join_package, package_to_resource_path};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFilter {
    /// Every `.class` entry of a matching archive.
    #[default]
    Loose,
    /// Only entries under the requested package.
    Prefix,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub archive_filter: ArchiveFilter,
    pub initialize: bool,
}

pub struct PackageClassResolver<'a, L: ClassLoader + ?Sized> {
    loader: &'a L,
    options: ScanOptions,
}

impl<'a, L: ClassLoader + ?Sized> PackageClassResolver<'a, L> {
    pub fn new(loader: &'a L, options: ScanOptions) -> Self {
        Self { loader, options }
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    pub fn resolve_classes(&self, package_name: &str) -> anyhow::Result<HashSet<ClassHandle>> {
        self.collect_classes(package_name)
            .inspect_err(|e| {
                tracing::error!(package = package_name, error = %e, "get class set failure")
            })
            .with_context(|| format!("failed to resolve classes of package '{package_name}'"))
    }

    /// Class identifiers `resolve_classes` would load, without loading them.
    pub fn class_names(&self, package_name: &str) -> anyhow::Result<BTreeSet<String>> {
        self.collect_names(package_name)
            .inspect_err(|e| {
                tracing::error!(package = package_name, error = %e, "list class names failure")
            })
            .with_context(|| format!("failed to list classes of package '{package_name}'"))
    }

    fn collect_classes(&self, package_name: &str) -> Result<HashSet<ClassHandle>, ScanError> {
        let names = self.collect_names(package_name)?;
        let classes: HashSet<ClassHandle> = self
            .loader
            .find_classes(&names, self.options.initialize)?
            .into_iter()
            .collect();
        tracing::debug!(
            package = package_name,
            names = names.len(),
            classes = classes.len(),
            "resolved package"
        );
        Ok(classes)
    }

    fn collect_names(&self, package_name: &str) -> Result<BTreeSet<String>, ScanError> {
        let resource_path = package_to_resource_path(package_name);
        let urls = self.loader.get_resources(&resource_path)?;
        tracing::debug!(package = package_name, roots = urls.len(), "resource roots");

        let mut names = BTreeSet::new();
        for url in &urls {
            let found = match ResourceLocation::parse(url)? {
                ResourceLocation::File(dir) => scan_directory(&dir, package_name)?,
                ResourceLocation::Archive { archive, .. } => {
                    let prefix = match self.options.archive_filter {
                        ArchiveFilter::Loose => None,
                        ArchiveFilter::Prefix => Some(resource_path.as_str()),
                    };
                    scan_archive(&archive, prefix)?
                }
            };
            tracing::debug!(root = %url, classes = found.len(), "scanned root");
            names.extend(found);
        }
        Ok(names)
    }
}

/// Class identifiers under `dir`, which holds the classes of `package_name`.
/// Files not ending in `.class` are ignored, and so are dangling symlinks.
pub fn scan_directory(dir: &Path, package_name: &str) -> Result<BTreeSet<String>, ScanError> {
    let meta = std::fs::metadata(dir).map_err(|e| ScanError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(ScanError::io(
            dir,
            std::io::Error::other("resource location is not a directory"),
        ));
    }

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(true)
        .build();

    let mut names = BTreeSet::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_dangling_link(&err) => {
                tracing::debug!(error = %err, "skipping dangling symlink");
                continue;
            }
            Err(err) => return Err(walk_error(dir, err)),
        };
        if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(CLASS_SUFFIX))
        {
            continue;
        }

        let relative = path
            .strip_prefix(dir)
            .ok()
            .and_then(relative_resource_name)
            .ok_or_else(|| {
                ScanError::malformed(path.to_string_lossy(), "path is not valid UTF-8")
            })?;
        if let Some(class_name) = entry_name_to_class_name(&relative) {
            names.insert(join_package(package_name, &class_name));
        }
    }
    Ok(names)
}

/// Class identifiers of a jar's `.class` entries, limited to `prefix` when given.
pub fn scan_archive(archive_path: &Path, prefix: Option<&str>) -> Result<BTreeSet<String>, ScanError> {
    Ok(archive::class_entries(archive_path, prefix)?
        .iter()
        .filter_map(|entry| entry_name_to_class_name(entry))
        .collect())
}

fn relative_resource_name(relative: &Path) -> Option<String> {
    let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
    Some(segments?.join("/"))
}

/// A symlink below the walk root whose target does not exist. It is neither a
/// file nor a directory, so it holds no classes.
fn is_dangling_link(err: &ignore::Error) -> bool {
    let ignore::Error::WithPath { path, .. } = err else {
        return false;
    };
    err.depth().is_some_and(|depth| depth > 0)
        && err
            .io_error()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
        && std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

fn walk_error(root: &Path, err: ignore::Error) -> ScanError {
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other(message));
    ScanError::io(root, source)
}
