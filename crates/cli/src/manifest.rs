use anyhow::{Context, Result, bail};
use argtree_manifest::{DEFAULT_MANIFEST_NAME, Manifest};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: Manifest,
}

/// Read the manifest at `manifest_path`, or `argtree.json` in the current
/// directory when no path was given.
pub fn load_manifest(manifest_path: Option<&Path>) -> Result<LoadedManifest> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let (path, explicit) = match manifest_path {
        Some(p) => (resolve_against(&cwd, p), true),
        None => (cwd.join(DEFAULT_MANIFEST_NAME), false),
    };

    if !path.exists() {
        if explicit {
            bail!("manifest not found: {}", path.display());
        }
        bail!(
            "no {DEFAULT_MANIFEST_NAME} in {} (use --manifest to point at one)",
            cwd.display()
        );
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let manifest = Manifest::from_json(&contents)
        .with_context(|| format!("failed to load manifest: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded manifest");

    Ok(LoadedManifest { path, manifest })
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("argtree-{prefix}-{pid}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_explicit_manifest() {
        let dir = make_temp_dir("manifest-load");
        let path = dir.join("tree.json");
        fs::write(
            &path,
            r#"{ "schema-version": 1, "root": { "name": "app", "usage": "demo" } }"#,
        )
        .unwrap();

        let loaded = load_manifest(Some(&path)).unwrap();
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.manifest.root.name, "app");
        assert_eq!(loaded.manifest.root.usage, "demo");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_explicit_manifest_names_the_path() {
        let dir = make_temp_dir("manifest-missing");
        let path = dir.join("absent.json");
        let err = load_manifest(Some(&path)).unwrap_err();
        assert_eq!(err.to_string(), format!("manifest not found: {}", path.display()));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_manifest_keeps_the_cause() {
        let dir = make_temp_dir("manifest-invalid");
        let path = dir.join("bad.json");
        fs::write(&path, r#"{ "schema-version": 9, "root": { "name": "app" } }"#).unwrap();

        let err = load_manifest(Some(&path)).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("failed to load manifest"), "{chain}");
        assert!(chain.contains("unsupported schema-version 9"), "{chain}");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/work");
        assert_eq!(resolve_against(base, Path::new("a.json")), PathBuf::from("/work/a.json"));
        assert_eq!(resolve_against(base, Path::new("/abs.json")), PathBuf::from("/abs.json"));
    }
}
