//! Resource locations and their URL form.
//!
//! Loaders hand resource locations to the resolver as URLs:
//!
//! - `file:/opt/app/classes/org/acme` for a package directory
//! - `jar:file:/opt/app/lib/acme.jar!/org/acme` for a package inside a jar
//!
//! Path characters that would break the URL (spaces, `%`, `!`, `#`, `?`) are
//! percent-encoded when rendering and decoded when parsing.

use anyhow::Result;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ScanError;

const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'%')
    .add(b'!')
    .add(b'#')
    .add(b'?')
    .add(b'"')
    .add(b'<')
    .add(b'>');

const FILE_SCHEME: &str = "file:";
const JAR_SCHEME: &str = "jar:";
const JAR_SEPARATOR: &str = "!/";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceLocation {
    File(PathBuf),
    Archive { archive: PathBuf, entry: String },
}

impl ResourceLocation {
    pub fn parse(url: &str) -> Result<Self, ScanError> {
        if let Some(rest) = url.strip_prefix(FILE_SCHEME) {
            return Ok(Self::File(decode_file_path(url, rest)?));
        }

        if let Some(rest) = url.strip_prefix(JAR_SCHEME) {
            let (archive_url, entry) = rest
                .split_once(JAR_SEPARATOR)
                .ok_or_else(|| ScanError::malformed(url, "missing '!/' separator"))?;
            let archive_path = archive_url
                .strip_prefix(FILE_SCHEME)
                .ok_or_else(|| ScanError::malformed(url, "archive is not a file: URL"))?;
            let archive = decode_file_path(url, archive_path)?;
            let entry = decode(url, entry)?.trim_end_matches('/').to_string();
            return Ok(Self::Archive { archive, entry });
        }

        let scheme = url.split_once(':').map(|(s, _)| s).unwrap_or("");
        Err(ScanError::malformed(
            url,
            format!("unsupported scheme '{scheme}'"),
        ))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn archive(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self::Archive {
            archive: archive.into(),
            entry: entry.into(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Archive { .. } => "jar",
        }
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{FILE_SCHEME}{}", encode_path(path)),
            Self::Archive { archive, entry } => write!(
                f,
                "{JAR_SCHEME}{FILE_SCHEME}{}{JAR_SEPARATOR}{}",
                encode_path(archive),
                utf8_percent_encode(entry, PATH_ENCODE_SET)
            ),
        }
    }
}

impl FromStr for ResourceLocation {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn encode_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    utf8_percent_encode(&raw, PATH_ENCODE_SET).to_string()
}

fn decode(url: &str, raw: &str) -> Result<String, ScanError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ScanError::malformed(url, "percent-decoded path is not valid UTF-8"))
}

fn decode_file_path(url: &str, raw: &str) -> Result<PathBuf, ScanError> {
    // `file:///x` and `file:/x` name the same path; a non-empty authority is not a local file.
    let raw = match raw.strip_prefix("//") {
        Some(rest) if rest.starts_with('/') => rest,
        Some(_) => return Err(ScanError::malformed(url, "remote file authority")),
        None => raw,
    };
    if raw.is_empty() {
        return Err(ScanError::malformed(url, "empty path"));
    }
    Ok(PathBuf::from(decode(url, raw)?))
}
