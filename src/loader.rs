//! Class loading.
//!
//! [`ClassLoader`] is the seam the resolver talks to: it reports resource
//! locations for a package path and turns class identifiers into loaded
//! handles. [`ClasspathLoader`] implements it over a [`Classpath`], keeping
//! one defined class per identifier and an explicit registry of static
//! initializers.

use anyhow::Context;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use crate::class::{Class, ClassHandle, Initializer};
use crate::classpath::{Classpath, ClasspathReader};
use crate::error::ScanError;
use crate::naming::class_name_to_class_path;

pub trait ClassLoader: Send + Sync {
    /// URLs of every root holding `resource_path` (a `/`-separated package path).
    fn get_resources(&self, resource_path: &str) -> Result<Vec<String>, ScanError>;

    /// Resolves `name` without logging; callers decide how failures are reported.
    fn find_class(&self, name: &str, initialize: bool) -> Result<ClassHandle, ScanError>;

    /// Resolves a batch of identifiers, stopping at the first failure.
    fn find_classes(
        &self,
        names: &BTreeSet<String>,
        initialize: bool,
    ) -> Result<Vec<ClassHandle>, ScanError> {
        names
            .iter()
            .map(|name| self.find_class(name, initialize))
            .collect()
    }

    fn load_class(&self, name: &str, initialize: bool) -> anyhow::Result<ClassHandle> {
        self.find_class(name, initialize)
            .inspect_err(|e| tracing::error!(class = name, error = %e, "load class failure"))
            .with_context(|| format!("failed to load class {name}"))
    }

    /// Loads without running static initialization.
    fn load_class_lazy(&self, name: &str) -> anyhow::Result<ClassHandle> {
        self.load_class(name, false)
    }
}

pub struct ClasspathLoader {
    classpath: Classpath,
    initializers: HashMap<String, Initializer>,
    defined: Mutex<HashMap<String, ClassHandle>>,
}

impl ClasspathLoader {
    pub fn new(classpath: Classpath) -> Self {
        Self {
            classpath,
            initializers: HashMap::new(),
            defined: Mutex::new(HashMap::new()),
        }
    }

    pub fn classpath(&self) -> &Classpath {
        &self.classpath
    }

    pub fn register_initializer<F>(&mut self, class_name: &str, init: F)
    where
        F: Fn(&Class) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.initializers
            .insert(class_name.to_string(), Arc::new(init));
    }

    pub fn with_initializer<F>(mut self, class_name: &str, init: F) -> Self
    where
        F: Fn(&Class) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_initializer(class_name, init);
        self
    }

    pub fn defined_classes(&self) -> usize {
        self.defined
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn find_with(
        &self,
        reader: &mut ClasspathReader<'_>,
        name: &str,
        initialize: bool,
    ) -> Result<ClassHandle, ScanError> {
        let handle = self.define(reader, name)?;
        if initialize {
            handle.initialize()?;
        }
        Ok(handle)
    }

    fn define(&self, reader: &mut ClasspathReader<'_>, name: &str) -> Result<ClassHandle, ScanError> {
        if let Some(existing) = self
            .defined
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(existing.clone());
        }

        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ScanError::ClassNotFound(name.to_string()));
        }

        let class_path = class_name_to_class_path(name);
        let (origin, bytes) = reader
            .find_class_file(&class_path)?
            .ok_or_else(|| ScanError::ClassNotFound(name.to_string()))?;
        let class = Class::define(name, origin, &bytes, self.initializers.get(name).cloned())?;
        tracing::trace!(class = name, origin = %class.origin(), "defined class");

        // Two threads may race to define the same class; the first insert wins.
        let mut defined = self.defined.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(defined
            .entry(name.to_string())
            .or_insert_with(|| ClassHandle::new(class))
            .clone())
    }
}

impl ClassLoader for ClasspathLoader {
    fn get_resources(&self, resource_path: &str) -> Result<Vec<String>, ScanError> {
        Ok(self
            .classpath
            .find_resources(resource_path)?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    fn find_class(&self, name: &str, initialize: bool) -> Result<ClassHandle, ScanError> {
        self.find_with(&mut self.classpath.reader(), name, initialize)
    }

    /// Every archive on the classpath is opened at most once for the whole batch.
    fn find_classes(
        &self,
        names: &BTreeSet<String>,
        initialize: bool,
    ) -> Result<Vec<ClassHandle>, ScanError> {
        let mut reader = self.classpath.reader();
        let classes = names
            .iter()
            .map(|name| self.find_with(&mut reader, name, initialize))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::trace!(
            classes = classes.len(),
            archives = reader.archives_opened(),
            "loaded batch"
        );
        Ok(classes)
    }
}
