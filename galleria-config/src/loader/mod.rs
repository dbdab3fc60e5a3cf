use anyhow::{Context, anyhow};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::models::GalleryConfig;

/// Environment variable naming a TOML or JSON config file.
pub const CONFIG_PATH_VAR: &str = "GALLERY_CONFIG_PATH";
/// Environment variable carrying the whole configuration as inline JSON.
pub const CONFIG_JSON_VAR: &str = "GALLERY_CONFIG_JSON";

const DEFAULT_CANDIDATES: &[&str] = &[
    "gallery.toml",
    "gallery.json",
    "config/gallery.toml",
    "config/gallery.json",
];

/// Source that produced the gallery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GalleryConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl GalleryConfig {
    /// Load configuration using the process environment and the current
    /// working directory.
    ///
    /// Evaluation order:
    /// 1) `$GALLERY_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$GALLERY_CONFIG_JSON` (inline JSON),
    /// 3) the first existing default file (`gallery.toml`, `gallery.json`,
    ///    `config/gallery.toml`, `config/gallery.json`),
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, GalleryConfigSource)> {
        let cwd = env::current_dir()
            .context("failed to resolve current directory")?;
        Self::load_with(|key| env::var(key).ok(), &cwd)
    }

    /// Same as [`GalleryConfig::load_from_env`] with an injectable variable
    /// lookup and a base directory for the default file candidates.
    pub fn load_with<F>(
        lookup: F,
        base_dir: &Path,
    ) -> anyhow::Result<(Self, GalleryConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = lookup(CONFIG_PATH_VAR)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str.trim());
            let path = if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            };
            let config = Self::load_from_file(&path)?;
            return Ok((config, GalleryConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_VAR)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            return Ok((parsed, GalleryConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(base_dir) {
            let config = Self::load_from_file(&path)?;
            return Ok((config, GalleryConfigSource::File(path)));
        }

        Ok((Self::default(), GalleryConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read gallery config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid gallery config {}", path.display())
            }),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| {
                    anyhow!(
                        "invalid gallery config {}: {}",
                        path.display(),
                        err
                    )
                })
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        // Try TOML first, then JSON for convenience.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse gallery config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid gallery config json: {err}"))
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        DEFAULT_CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }
}
