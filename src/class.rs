//! Loaded classes and the handles the resolver collects.
//!
//! A [`Class`] is defined once per loader from the bytes of its class file.
//! [`ClassHandle`] compares by identity, so a set of handles never holds the
//! same loaded class twice even when it was reached through several roots.

use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use crate::error::ScanError;
use crate::location::ResourceLocation;

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Static initialization hook registered for a class identifier.
pub type Initializer = Arc<dyn Fn(&Class) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct ClassVersion {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for ClassVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

pub struct Class {
    name: String,
    origin: ResourceLocation,
    version: ClassVersion,
    digest: String,
    size: usize,
    initializer: Option<Initializer>,
    init_outcome: OnceLock<Result<(), String>>,
}

impl Class {
    pub fn define(
        name: &str,
        origin: ResourceLocation,
        bytes: &[u8],
        initializer: Option<Initializer>,
    ) -> Result<Self, ScanError> {
        let version = parse_header(bytes).map_err(|reason| ScanError::ClassFormat {
            class_name: name.to_string(),
            reason,
        })?;

        Ok(Self {
            name: name.to_string(),
            origin,
            version,
            digest: hash_bytes(bytes),
            size: bytes.len(),
            initializer,
            init_outcome: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn package_name(&self) -> &str {
        self.name.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
    }

    pub fn origin(&self) -> &ResourceLocation {
        &self.origin
    }

    pub fn version(&self) -> ClassVersion {
        self.version
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs the registered initializer the first time it is called. Later calls
    /// report the first outcome again without re-running anything.
    pub fn initialize(&self) -> Result<(), ScanError> {
        let outcome = self.init_outcome.get_or_init(|| match &self.initializer {
            Some(init) => init(self).map_err(|e| format!("{e:#}")),
            None => Ok(()),
        });

        outcome.clone().map_err(|reason| ScanError::Initialization {
            class_name: self.name.clone(),
            reason,
        })
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.init_outcome.get(), Some(Ok(())))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("version", &self.version)
            .field("digest", &self.digest)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClassHandle(Arc<Class>);

impl ClassHandle {
    pub fn new(class: Class) -> Self {
        Self(Arc::new(class))
    }
}

impl Deref for ClassHandle {
    type Target = Class;

    fn deref(&self) -> &Class {
        &self.0
    }
}

impl PartialEq for ClassHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassHandle {}

impl Hash for ClassHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

fn parse_header(bytes: &[u8]) -> Result<ClassVersion, String> {
    if bytes.len() < 8 {
        return Err(format!("truncated header ({} bytes)", bytes.len()));
    }
    let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != CLASS_MAGIC {
        return Err(format!("bad magic 0x{magic:08X}"));
    }
    Ok(ClassVersion {
        minor: u16::from_be_bytes([bytes[4], bytes[5]]),
        major: u16::from_be_bytes([bytes[6], bytes[7]]),
    })
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
