use serde_json::Value;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "klass_cache_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

/// Minimal class file: `name extends java/lang/Object`, no members.
fn class_bytes(name: &str) -> Vec<u8> {
    let mut pool = Vec::new();
    for utf8 in [name, "java/lang/Object"] {
        pool.push(1u8);
        pool.extend((utf8.len() as u16).to_be_bytes());
        pool.extend(utf8.as_bytes());
    }
    pool.extend([7, 0, 1, 7, 0, 2]);

    let mut out = Vec::new();
    out.extend(0xCAFE_BABEu32.to_be_bytes());
    out.extend(0u16.to_be_bytes());
    out.extend(61u16.to_be_bytes());
    out.extend(5u16.to_be_bytes());
    out.extend(pool);
    out.extend(0x0021u16.to_be_bytes());
    out.extend(3u16.to_be_bytes());
    out.extend(4u16.to_be_bytes());
    out.extend([0, 0, 0, 0, 0, 0, 0, 0]);
    out
}

fn write_jar(path: &std::path::Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

fn run_json(args: &[&str], envs: &[(&str, &str)]) -> anyhow::Result<Value> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_klass-cache"));
    cmd.args(args);
    cmd.env_remove("KLASS_CACHE_DISABLE");
    cmd.env_remove("KLASS_CACHE_ANONYMOUS");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let out = cmd.output()?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

/// Two copies of the same library, as two application loaders would see them.
fn library_copies(base: &std::path::Path) -> anyhow::Result<(String, String)> {
    let a = class_bytes("org/example/pkg/A");
    let b = class_bytes("org/example/pkg/B");
    let first = base.join("app1/lib/demo-1.0.jar");
    let second = base.join("app2/lib/demo-1.0.jar");
    for jar in [&first, &second] {
        write_jar(
            jar,
            &[
                ("org/example/pkg/A.class", &a),
                ("org/example/pkg/B.class", &b),
                ("META-INF/MANIFEST.MF", b""),
            ],
        )?;
    }
    Ok((
        first.to_string_lossy().to_string(),
        second.to_string_lossy().to_string(),
    ))
}

#[test]
fn application_loaders_share_identical_library_bytes() -> anyhow::Result<()> {
    let base = temp_dir("app_share");
    let (first, second) = library_copies(&base)?;

    let report = run_json(&["load", &first, &second, "--rounds", "3"], &[])?;
    assert_eq!(report["classes"], 4);
    assert_eq!(report["cache"]["app_entries"], 2);
    assert_eq!(report["cache"]["boot_entries"], 0);
    assert_eq!(report["cache"]["cached_entries"], 2);

    let first_round = report["rounds"][0]["parses"].as_u64().unwrap_or(0);
    assert!((2..=4).contains(&first_round), "first round parsed {first_round}");
    assert_eq!(report["rounds"][1]["parses"], 0);
    assert_eq!(report["rounds"][2]["parses"], 0);
    assert_eq!(report["rounds"][2]["defined"], 4);

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn trusted_loader_caches_by_name() -> anyhow::Result<()> {
    let base = temp_dir("trusted");
    let (first, _) = library_copies(&base)?;

    let report = run_json(&["load", "--trusted", &first], &[])?;
    assert_eq!(report["loader"], "Boot");
    assert_eq!(report["cache"]["boot_entries"], 2);
    assert_eq!(report["cache"]["app_entries"], 0);
    assert_eq!(report["parses"], 2);
    assert_eq!(report["cache"]["hits"], 2);

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn disabled_cache_parses_every_request() -> anyhow::Result<()> {
    let base = temp_dir("disabled");
    let (first, _) = library_copies(&base)?;

    let by_flag = run_json(&["--no-cache", "load", &first], &[])?;
    assert_eq!(by_flag["policy_enabled"], false);
    assert_eq!(by_flag["parses"], 4);
    assert_eq!(by_flag["cache"]["cached_entries"], 0);
    assert_eq!(by_flag["cache"]["bypassed"], 4);

    let by_env = run_json(&["load", &first], &[("KLASS_CACHE_DISABLE", "1")])?;
    assert_eq!(by_env["parses"], 4);
    assert_eq!(by_env["cache"]["cached_entries"], 0);

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn malformed_classes_fail_every_round() -> anyhow::Result<()> {
    let base = temp_dir("malformed");
    let jar = base.join("broken.jar");
    let good = class_bytes("org/example/Good");
    write_jar(
        &jar,
        &[
            ("org/example/Good.class", &good),
            ("org/example/Broken.class", b"\xca\xfe\xba\xbe\x00"),
        ],
    )?;
    let jar = jar.to_string_lossy().to_string();

    let report = run_json(&["load", &jar, "--rounds", "2"], &[])?;
    assert_eq!(report["rounds"][0]["failed"], 1);
    assert_eq!(report["rounds"][1]["failed"], 1);
    assert_eq!(report["rounds"][1]["parses"], 1);
    assert_eq!(report["cache"]["failures"], 2);
    assert_eq!(report["cache"]["cached_entries"], 1);

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn scan_walks_a_repository_and_inspect_prints_headers() -> anyhow::Result<()> {
    let base = temp_dir("scan");
    library_copies(&base)?;
    let root = base.to_string_lossy().to_string();

    let report = run_json(&["scan", "--path", &root, "--limit", "1"], &[])?;
    assert_eq!(report["jars"], 1);
    assert_eq!(report["cache"]["cached_entries"], 2);

    let jar = base.join("app1/lib/demo-1.0.jar");
    let parsed = run_json(
        &[
            "inspect",
            jar.to_string_lossy().as_ref(),
            "org/example/pkg/B.class",
        ],
        &[],
    )?;
    assert_eq!(parsed["class_name"], "org.example.pkg.B");
    assert_eq!(parsed["super_name"], "java.lang.Object");
    assert_eq!(parsed["major_version"], 61);

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}
