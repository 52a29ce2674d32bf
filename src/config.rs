use anyhow::{Context, Result};
use clap::ValueEnum;
use std::env;
use std::ffi::{OsStr, OsString};

use crate::classpath::Classpath;
use crate::cli::Cli;
use crate::resolver::{ArchiveFilter, ScanOptions};

pub const CLASSPATH_ENV: &str = "CLASSPATH";
pub const ARCHIVE_FILTER_ENV: &str = "PACKAGE_SCAN_ARCHIVE_FILTER";

pub fn resolve_classpath(cli: &Cli) -> Classpath {
    classpath_from(cli.classpath.as_deref(), env::var_os(CLASSPATH_ENV))
}

pub fn resolve_scan_options(cli: &Cli, initialize: bool) -> Result<ScanOptions> {
    Ok(ScanOptions {
        archive_filter: resolve_archive_filter(cli)?,
        initialize,
    })
}

pub fn resolve_archive_filter(cli: &Cli) -> Result<ArchiveFilter> {
    archive_filter_from(cli.archive_filter, env::var(ARCHIVE_FILTER_ENV).ok())
}

fn classpath_from(flag: Option<&OsStr>, from_env: Option<OsString>) -> Classpath {
    if let Some(raw) = flag {
        return Classpath::parse(raw);
    }

    if let Some(raw) = from_env.filter(|v| !v.is_empty()) {
        return Classpath::parse(raw);
    }

    Classpath::parse(".")
}

fn archive_filter_from(flag: Option<ArchiveFilter>, from_env: Option<String>) -> Result<ArchiveFilter> {
    if let Some(filter) = flag {
        return Ok(filter);
    }

    match from_env.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => ArchiveFilter::from_str(raw, true)
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("Invalid {ARCHIVE_FILTER_ENV} value: {raw}")),
        None => Ok(ArchiveFilter::default()),
    }
}
