use anyhow::Result;
use clap::Parser;
use package_scan::class::ClassHandle;
use package_scan::cli::{Cli, Commands, OutputFormat};
use package_scan::config::{resolve_classpath, resolve_scan_options};
use package_scan::loader::{ClassLoader, ClasspathLoader};
use package_scan::logging;
use package_scan::naming::package_to_resource_path;
use package_scan::resolver::PackageClassResolver;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = parse_cli();
    logging::init(cli.verbose)?;

    let loader = ClasspathLoader::new(resolve_classpath(&cli));

    match cli.command.clone() {
        Commands::Scan {
            packages,
            format,
            initialize,
            names_only,
        } => {
            let options = resolve_scan_options(&cli, initialize)?;
            let resolver = PackageClassResolver::new(&loader, options);
            let reports = packages
                .par_iter()
                .map(|package| scan_package(&resolver, package, names_only))
                .collect::<Result<Vec<_>>>()?;
            write_scan_output(&reports, format)?;
        }
        Commands::Load {
            class_name,
            initialize,
        } => {
            let class = loader.load_class(&class_name, initialize)?;
            println!("{}", serde_json::to_string_pretty(&ClassReport::from_handle(&class))?);
        }
        Commands::Resources { package } => {
            let locations = loader.get_resources(&package_to_resource_path(&package))?;
            let output = ResourcesResult { package, locations };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args(args))
}

/// Accepts the `java`-style `-cp` spelling and makes `scan` implicit when the
/// first positional argument is not a subcommand.
fn rewrite_args(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    for a in args.iter_mut().skip(1) {
        if a == "-cp" {
            *a = "--classpath".to_string();
        }
    }

    let subcommands = ["scan", "load", "resources", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "--classpath" || a == "--cp" || a == "--archive-filter" {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "scan".to_string());
        }
    }

    args
}

#[derive(Debug, Serialize)]
struct ClassReport {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initialized: Option<bool>,
}

impl ClassReport {
    fn from_handle(class: &ClassHandle) -> Self {
        Self {
            name: class.name().to_string(),
            origin: Some(class.origin().to_string()),
            version: Some(class.version().to_string()),
            digest: Some(class.digest().to_string()),
            initialized: Some(class.is_initialized()),
        }
    }

    fn name_only(name: String) -> Self {
        Self {
            name,
            origin: None,
            version: None,
            digest: None,
            initialized: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ScanReport {
    package: String,
    class_count: usize,
    duration_ms: u64,
    classes: Vec<ClassReport>,
}

#[derive(Debug, Serialize)]
struct ResourcesResult {
    package: String,
    locations: Vec<String>,
}

fn scan_package<L: ClassLoader + ?Sized>(
    resolver: &PackageClassResolver<'_, L>,
    package: &str,
    names_only: bool,
) -> Result<ScanReport> {
    let start = Instant::now();

    let classes: Vec<ClassReport> = if names_only {
        resolver
            .class_names(package)?
            .into_iter()
            .map(ClassReport::name_only)
            .collect()
    } else {
        let mut handles: Vec<ClassHandle> = resolver.resolve_classes(package)?.into_iter().collect();
        handles.sort_by(|a, b| a.name().cmp(b.name()));
        handles.iter().map(ClassReport::from_handle).collect()
    };

    Ok(ScanReport {
        package: package.to_string(),
        class_count: classes.len(),
        duration_ms: start.elapsed().as_millis() as u64,
        classes,
    })
}

fn write_scan_output(reports: &[ScanReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reports)?);
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for report in reports {
                out.push_str(&format!("package: {}\n", report.package));
                out.push_str(&format!("class_count: {}\n", report.class_count));
                out.push_str(&format!("duration_ms: {}\n", report.duration_ms));
                for class in &report.classes {
                    match (&class.version, &class.origin) {
                        (Some(version), Some(origin)) => {
                            out.push_str(&format!("- {} (v{version}) {origin}\n", class.name))
                        }
                        _ => out.push_str(&format!("- {}\n", class.name)),
                    }
                }
            }
            print!("{out}");
        }
    }

    Ok(())
}
