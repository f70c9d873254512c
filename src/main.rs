use anyhow::{Context, Result};
use clap::Parser;
use klass_cache::cache::{CacheStats, CachedKlassProvider};
use klass_cache::catalog::{ClassEntry, class_entries};
use klass_cache::classfile::ClassFileParser;
use klass_cache::cli::{Cli, Commands, LogLevel, OutputFormat};
use klass_cache::config::{resolve_policy, resolve_scan_root};
use klass_cache::klass::{
    ACC_ABSTRACT, ACC_FINAL, ACC_INTERFACE, ACC_PUBLIC, ClassDefinitionInfo, LoaderKind,
    ParsedClass,
};
use klass_cache::policy::CachePolicy;
use klass_cache::provider::KlassProvider;
use klass_cache::scan::scan_jars;
use log::{LevelFilter, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    let policy = resolve_policy(&cli);

    match cli.command.clone() {
        Commands::Load {
            jars,
            trusted,
            rounds,
            format,
        } => {
            let report = load_jars(&jars, loader_kind(trusted), rounds, policy)?;
            write_report(&report, format)?;
        }
        Commands::Scan {
            path,
            limit,
            trusted,
            rounds,
            format,
        } => {
            let root = resolve_scan_root(path)?;
            let mut jars = scan_jars(&root)?;
            if let Some(limit) = limit {
                jars.truncate(limit);
            }
            info!("found {} jars under {}", jars.len(), root.display());
            let report = load_jars(&jars, loader_kind(trusted), rounds, policy)?;
            write_report(&report, format)?;
        }
        Commands::Inspect {
            jar_path,
            class_name,
            format,
        } => {
            let parsed = inspect_class(&jar_path, &normalize_class_name(&class_name))?;
            write_parsed(&parsed, format)?;
        }
    }

    Ok(())
}

fn init_logging(level: Option<LogLevel>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(LevelFilter::from(level));
    }
    builder.format_timestamp(None).init();
}

fn loader_kind(trusted: bool) -> LoaderKind {
    if trusted {
        LoaderKind::Boot
    } else {
        LoaderKind::Application
    }
}

fn normalize_class_name(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("import") {
        s = rest.trim();
    }
    if s.ends_with(';') {
        s = s.trim_end_matches(';').trim();
    }
    if let Some(stem) = s.strip_suffix(".class") {
        s = stem;
    }
    s.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '/' { '.' } else { c })
        .collect()
}

#[derive(Debug, Serialize)]
struct RoundReport {
    round: usize,
    defined: usize,
    failed: usize,
    parses: u64,
    duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct LoadReport {
    jars: usize,
    classes: usize,
    loader: String,
    policy_enabled: bool,
    rounds: Vec<RoundReport>,
    parses: u64,
    cache: CacheStats,
    duration_ms: u64,
}

fn load_jars(
    jars: &[PathBuf],
    loader: LoaderKind,
    rounds: usize,
    policy: CachePolicy,
) -> Result<LoadReport> {
    let start = Instant::now();
    let catalogs: Vec<Vec<ClassEntry>> = jars
        .par_iter()
        .map(|jar| class_entries(jar))
        .collect::<Result<_>>()?;
    let classes = catalogs.iter().map(Vec::len).sum();

    let cache = CachedKlassProvider::with_policy(ClassFileParser::new(), policy);
    let mut round_reports = Vec::with_capacity(rounds.max(1));
    for round in 1..=rounds.max(1) {
        let round_start = Instant::now();
        let parses_before = cache.fallback().parse_count();
        let (defined, failed) = catalogs
            .par_iter()
            .map(|entries| define_all(&cache, loader, entries))
            .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
        round_reports.push(RoundReport {
            round,
            defined,
            failed,
            parses: cache.fallback().parse_count() - parses_before,
            duration_ms: round_start.elapsed().as_millis() as u64,
        });
    }

    Ok(LoadReport {
        jars: jars.len(),
        classes,
        loader: format!("{loader:?}"),
        policy_enabled: policy.enabled,
        rounds: round_reports,
        parses: cache.fallback().parse_count(),
        cache: cache.stats(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Defines one jar's classes; the jar stands in for a single loader instance.
fn define_all(
    provider: &impl KlassProvider,
    loader: LoaderKind,
    entries: &[ClassEntry],
) -> (usize, usize) {
    let info = ClassDefinitionInfo::named();
    let mut defined = 0usize;
    let mut failed = 0usize;
    for entry in entries {
        let symbol = entry.symbol();
        match provider.parser_klass(loader, Some(&symbol), &entry.bytes, &info) {
            Ok(_) => defined += 1,
            Err(err) => {
                failed += 1;
                warn!("failed to define {}: {err:#}", entry.class_name);
            }
        }
    }
    (defined, failed)
}

fn inspect_class(jar_path: &Path, class_name: &str) -> Result<ParsedClass> {
    let entry = class_entries(jar_path)?
        .into_iter()
        .find(|e| e.class_name == class_name)
        .with_context(|| format!("Class {class_name} not found in {}", jar_path.display()))?;
    let parsed = ClassFileParser::new().parser_klass(
        LoaderKind::Application,
        Some(&entry.symbol()),
        &entry.bytes,
        &ClassDefinitionInfo::named(),
    )?;
    Ok(ParsedClass::clone(&parsed))
}

fn write_report(report: &LoadReport, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("jars: {}\n", report.jars));
            out.push_str(&format!("classes: {}\n", report.classes));
            out.push_str(&format!("loader: {}\n", report.loader));
            for r in &report.rounds {
                out.push_str(&format!(
                    "- round {}: defined {}, failed {}, parses {}, {} ms\n",
                    r.round, r.defined, r.failed, r.parses, r.duration_ms
                ));
            }
            out.push_str(&format!(
                "cache: {} entries (boot {}, app {}), hits {}, misses {}, bypassed {}, failures {}\n",
                report.cache.cached_entries,
                report.cache.boot_entries,
                report.cache.app_entries,
                report.cache.hits,
                report.cache.misses,
                report.cache.bypassed,
                report.cache.failures
            ));
            out.push_str(&format!("duration_ms: {}\n", report.duration_ms));
            out
        }
    };
    print_content(&content);
    Ok(())
}

fn write_parsed(parsed: &ParsedClass, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(parsed)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!(
                "{}{}\n",
                access_modifiers(parsed.access_flags),
                parsed.class_name
            ));
            if let Some(super_name) = &parsed.super_name {
                out.push_str(&format!("  extends {super_name}\n"));
            }
            if !parsed.interfaces.is_empty() {
                out.push_str(&format!("  implements {}\n", parsed.interfaces.join(", ")));
            }
            out.push_str(&format!(
                "  version {}.{}, {} constants, {} fields, {} methods\n",
                parsed.major_version,
                parsed.minor_version,
                parsed.constant_pool_count,
                parsed.field_count,
                parsed.method_count
            ));
            out
        }
    };
    print_content(&content);
    Ok(())
}

fn access_modifiers(flags: u16) -> String {
    let mut out = String::new();
    for (flag, word) in [
        (ACC_PUBLIC, "public "),
        (ACC_FINAL, "final "),
        (ACC_ABSTRACT, "abstract "),
    ] {
        if flags & flag != 0 {
            out.push_str(word);
        }
    }
    if flags & ACC_INTERFACE != 0 {
        out.push_str("interface ");
    } else {
        out.push_str("class ");
    }
    out
}

fn print_content(content: &str) {
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_class_name_accepts_imports_and_paths() {
        let raw = "import org.springframework.stereotype. Component ;";
        assert_eq!(
            normalize_class_name(raw),
            "org.springframework.stereotype.Component"
        );
        assert_eq!(
            normalize_class_name("org/example/Foo$Bar.class"),
            "org.example.Foo$Bar"
        );
    }

    #[test]
    fn access_modifiers_render_in_source_order() {
        assert_eq!(access_modifiers(0x0021), "public class ");
        assert_eq!(access_modifiers(0x0601), "public abstract interface ");
        assert_eq!(access_modifiers(0x0010), "final class ");
    }
}
