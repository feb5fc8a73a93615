//! Run orchestration for the CLI: config and profile loading, the scan or
//! trace itself, report rendering, exit status.

use std::fs;
use std::io;

use anyhow::{Context as _, Result, bail};
use tracing::warn;

use super::args::{Arguments, OutputFormat, rank_floor};
use super::exit_status::ExitStatus;
use crate::config::Config;
use crate::core::manager::Manager;
use crate::core::registry::Profile;
use crate::deps::AuditManager;
use crate::formatters::{Formatter, JsonFormatter, Render, Report, TextFormatter, YamlFormatter};
use crate::plugins;
use crate::tracer::diver::Diver;
use crate::tracer::routes::RouteFinder;

pub fn run(args: Arguments) -> Result<ExitStatus> {
    if args.targets.is_empty() {
        bail!("No targets found, provide files or directories to scan.");
    }

    let tests = plugins::builtin();
    let config = Config::load(args.config.as_deref(), &tests)?;
    let profile = match &args.profile {
        Some(name) => config.profile(name)?,
        None => Profile::default(),
    };

    if args.trace {
        return run_trace(&args);
    }

    let mut manager = Manager::new(config, profile, args.ignore_nosec)?;
    manager.discover_files(&args.targets, args.recursive, &args.excluded_paths);
    manager.run_tests();

    if args.audit {
        AuditManager::new().update_issues(&mut manager.results);
    }

    if let Some(path) = &args.baseline {
        match fs::read_to_string(path) {
            Ok(data) => manager.populate_baseline(&data),
            Err(error) => warn!(
                baseline = %path.display(), %error,
                "could not read baseline, continuing without it"
            ),
        }
    }

    let severity = rank_floor(args.severity);
    let confidence = rank_floor(args.confidence);
    let result_set = manager.filter_results(severity, confidence);
    let issue_count = result_set.count();
    let report = Report::new(result_set, &manager.skipped, &manager.metrics);

    let formatter = match args.format {
        OutputFormat::Text => Formatter::Text(TextFormatter),
        OutputFormat::Json => Formatter::Json(JsonFormatter),
        OutputFormat::Yaml => Formatter::Yaml(YamlFormatter),
    };
    match &args.output {
        Some(path) => {
            colored::control::set_override(false);
            let mut file = fs::File::create(path)
                .with_context(|| format!("Could not open output file: {}", path.display()))?;
            formatter.render(&mut file, &report)?;
        }
        None => {
            formatter.render(&mut io::stdout().lock(), &report)?;
        }
    }

    Ok(if issue_count > 0 {
        ExitStatus::Failure
    } else {
        ExitStatus::Success
    })
}

/// Route discovery plus the bounded call-graph dive, instead of the flat
/// per-file scan.
fn run_trace(args: &Arguments) -> Result<ExitStatus> {
    let mut finder = RouteFinder::new();
    let mut routes = Vec::new();
    for target in &args.targets {
        if target.is_file() {
            routes.extend(finder.fetch_routes(target));
        } else {
            warn!("--trace expects entry point files, skipping {}", target.display());
        }
    }

    let mut diver = Diver::new(routes, args.verbose)?;
    let count = diver.dive_all(args.depth.max(1));
    println!("\nVulnerable paths found: {}", count);

    Ok(if count > 0 {
        ExitStatus::Failure
    } else {
        ExitStatus::Success
    })
}
