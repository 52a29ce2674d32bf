//! # package-scan
//!
//! Resolves every Java class that belongs to a package, whether the package
//! lives in a directory of compiled classes or inside a jar on the classpath.
//!
//! ## Architecture
//!
//! - **resolver**: Package-to-class-set resolution over `file:` and `jar:` locations
//! - **loader**: The `ClassLoader` seam and the classpath-backed loader with its initializer registry
//! - **classpath**: Ordered directory/jar roots, resource and class-file lookup
//! - **archive**: Scoped jar access (memory-mapped zip reading)
//! - **class**: Loaded class handles, class-file header checks and deferred initialization
//! - **location**: Resource location URLs (parse, render, percent-decoding)
//! - **naming**: Package, resource-path and class-identifier conversions
//! - **error**: Failure taxonomy
//! - **config** / **cli** / **logging**: Command-line surface

pub mod archive;
pub mod class;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod location;
pub mod logging;
pub mod naming;
pub mod resolver;
