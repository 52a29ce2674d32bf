use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;

use crate::resolver::ArchiveFilter;

#[derive(Debug, Clone, Parser)]
#[command(name = "package-scan")]
#[command(about = "Resolve every Java class of a package from a classpath of directories and jars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directories and jars to search, separated like PATH. Defaults to $CLASSPATH, then `.`
    #[arg(long, visible_alias = "cp", value_name = "PATH_LIST")]
    pub classpath: Option<OsString>,

    #[arg(long, value_enum, value_name = "MODE")]
    pub archive_filter: Option<ArchiveFilter>,

    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Resolve and load every class of one or more packages
    Scan {
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<String>,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(long)]
        initialize: bool,

        #[arg(long)]
        names_only: bool,
    },
    /// Load a single class by its fully-qualified name
    Load {
        class_name: String,

        #[arg(long)]
        initialize: bool,
    },
    /// Show the resource locations the classpath reports for a package
    Resources { package: String },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
