use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::RealayConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["realay.toml", "realay.yaml", "realay.yml", "realay.json"];

/// JSON prefs file in the home directory, read when nothing else is found.
const LEGACY_PREFS: &str = ".realayprefs";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RealayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let mut config = parse_config(&raw, path)?;
    if let Some(home) = home_dir() {
        config.expand_home(&home);
    }
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./realay.{toml,yaml,yml,json}` (working directory)
/// 2. `~/.config/realay/realay.{toml,yaml,yml,json}` (user-global)
/// 3. `~/.realayprefs` (legacy JSON prefs with `dropbox`/`local` keys)
///
/// Returns `RealayConfig::default()` if no config file is found or it
/// fails to parse.
pub fn discover_and_load() -> RealayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RealayConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_config_file_in(
        Path::new("."),
        config_dir().as_deref(),
        home_dir().as_deref(),
    )
}

fn find_config_file_in(
    cwd: &Path,
    config_dir: Option<&Path>,
    home: Option<&Path>,
) -> Option<PathBuf> {
    first_existing(cwd)
        .or_else(|| config_dir.and_then(first_existing))
        .or_else(|| {
            home.map(|h| h.join(LEGACY_PREFS))
                .filter(|p| p.is_file())
        })
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Returns the user-global config directory (`~/.config/realay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "realay").map(|d| d.config_dir().to_path_buf())
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RealayConfig> {
    let ext = if path.file_name().is_some_and(|n| n == LEGACY_PREFS) {
        "json"
    } else {
        path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
    };

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(
        "realay.toml",
        "user = \"dan\"\nremote_root = \"/shared\"\nlocal_root = \"/work\"\n"
    )]
    #[case(
        "realay.yaml",
        "user: dan\nremote_root: /shared\nlocal_root: /work\n"
    )]
    #[case(
        "realay.json",
        r#"{"user": "dan", "remote_root": "/shared", "local_root": "/work"}"#
    )]
    fn loads_every_supported_format(#[case] name: &str, #[case] body: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.user.as_deref(), Some("dan"));
        assert_eq!(cfg.remote_root, Some(PathBuf::from("/shared")));
        assert_eq!(cfg.local_root, Some(PathBuf::from("/work")));
        assert_eq!(cfg.project_extension, "rpp");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("realay.ini");
        std::fs::write(&path, "user=dan").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("realay.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn first_existing_honours_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("realay.json"), "{}").unwrap();
        std::fs::write(dir.path().join("realay.toml"), "").unwrap();
        let found = first_existing(dir.path()).unwrap();
        assert!(found.ends_with("realay.toml"));
    }

    #[test]
    fn first_existing_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("realay.toml")).unwrap();
        assert!(first_existing(dir.path()).is_none());
    }

    #[test]
    fn legacy_prefs_is_the_last_resort() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let prefs = home.path().join(LEGACY_PREFS);
        std::fs::write(
            &prefs,
            r#"{"dropbox": "/shared", "local": "/work", "user": "dan", "debug": true}"#,
        )
        .unwrap();

        let found = find_config_file_in(cwd.path(), None, Some(home.path())).unwrap();
        assert_eq!(found, prefs);

        let cfg = load_config(&found).unwrap();
        assert_eq!(cfg.remote_root, Some(PathBuf::from("/shared")));
        assert_eq!(cfg.local_root, Some(PathBuf::from("/work")));
        assert!(cfg.debug);

        std::fs::write(cwd.path().join("realay.toml"), "").unwrap();
        let found = find_config_file_in(cwd.path(), None, Some(home.path())).unwrap();
        assert!(found.ends_with("realay.toml"));
    }
}
