use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use anyhow::Result;
use std::fs;
use tiny_skia::Color;

pub const DEFAULT_APPIMAGE_FOLDER: &str = "AppImages";
pub const DEFAULT_COMPLETION_DELAY_MS: u64 = 2000;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub appimage: AppImageConfig,
    #[serde(default)]
    pub flatpak: FlatpakConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub terminal: Option<String>,
}

/// How portable binaries are recognized.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppImageStrategy {
    /// Configured root (or the default folder name) appears in the command line or descriptor path.
    #[default]
    Path,
    /// The launched binary carries a portable-binary extension.
    Extension,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppImageConfig {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub strategy: AppImageStrategy,
    #[serde(default = "default_appimage_folder")]
    pub default_root: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_appimage_folder() -> String { DEFAULT_APPIMAGE_FOLDER.to_string() }
fn default_extensions() -> Vec<String> { vec![".appimage".to_string(), ".run".to_string()] }

impl Default for AppImageConfig {
    fn default() -> Self {
        Self {
            root: None,
            strategy: AppImageStrategy::default(),
            default_root: default_appimage_folder(),
            extensions: default_extensions(),
        }
    }
}

impl AppImageConfig {
    /// The configured root, if it is long enough to be meaningful.
    pub fn configured_root(&self) -> Option<&str> {
        self.root
            .as_deref()
            .map(str::trim)
            .filter(|r| r.len() > 1)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FlatpakConfig {
    #[serde(default = "default_flatpak_program")]
    pub program: String,
}

fn default_flatpak_program() -> String { "flatpak".to_string() }

impl Default for FlatpakConfig {
    fn default() -> Self {
        Self { program: default_flatpak_program() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_completion_delay")]
    pub completion_delay_ms: u64,
    #[serde(default = "default_notify_command")]
    pub command: Option<String>,
}

fn default_completion_delay() -> u64 { DEFAULT_COMPLETION_DELAY_MS }
fn default_notify_command() -> Option<String> { Some("notify-send".to_string()) }

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            completion_delay_ms: default_completion_delay(),
            command: default_notify_command(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ThemeConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_padding")]
    pub padding: f32,
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    #[serde(default = "default_border_radius")]
    pub border_radius: f32,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_selection_background")]
    pub selection_background: String,
    #[serde(default = "default_selection_text")]
    pub selection_text: String,
    #[serde(default = "default_danger")]
    pub danger: String,
}

fn default_width() -> u32 { 600 }
fn default_height() -> u32 { 400 }
fn default_padding() -> f32 { 20.0 }
fn default_spacing() -> f32 { 10.0 }
fn default_border_radius() -> f32 { 12.0 }
fn default_background() -> String { "1e1e1eff".to_string() }
fn default_border_color() -> String { "3c3c50ff".to_string() }
fn default_text() -> String { "c8c8c8ff".to_string() }
fn default_selection_background() -> String { "3c3c50ff".to_string() }
fn default_selection_text() -> String { "ffffffff".to_string() }
fn default_danger() -> String { "ff5555ff".to_string() }

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            padding: default_padding(),
            spacing: default_spacing(),
            border_radius: default_border_radius(),
            background: default_background(),
            border_color: default_border_color(),
            text: default_text(),
            selection_background: default_selection_background(),
            selection_text: default_selection_text(),
            danger: default_danger(),
        }
    }
}

impl ThemeConfig {
    pub fn parse_color(hex: &str) -> Color {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 8 || !hex.is_ascii() {
            return Color::BLACK;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
        let a = u8::from_str_radix(&hex[6..8], 16).unwrap_or(255);

        Color::from_rgba8(r, g, b, a)
    }
}

pub fn config_path() -> PathBuf {
    match ProjectDirs::from("org", "flatnuke", "flatnuke") {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &config_path())
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.toml")).unwrap();
        assert!(config.appimage.root.is_none());
        assert_eq!(config.appimage.strategy, AppImageStrategy::Path);
        assert_eq!(config.notify.completion_delay_ms, 2000);
        assert_eq!(config.flatpak.program, "flatpak");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[appimage]\nroot = \"/home/u/.appimage\"\nstrategy = \"extension\"\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.appimage.configured_root(), Some("/home/u/.appimage"));
        assert_eq!(config.appimage.strategy, AppImageStrategy::Extension);
        assert_eq!(config.appimage.extensions, vec![".appimage", ".run"]);
        assert_eq!(config.theme.width, 600);
    }

    #[test]
    fn appimage_root_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.appimage.root = Some("/opt/apps".to_string());
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.appimage.root.as_deref(), Some("/opt/apps"));
    }

    #[test]
    fn near_empty_root_counts_as_unset() {
        let mut config = AppImageConfig::default();
        for root in ["", "/", " ", " / "] {
            config.root = Some(root.to_string());
            assert_eq!(config.configured_root(), None, "root {:?}", root);
        }
    }

    #[test]
    fn parse_color_rejects_bad_hex() {
        assert_eq!(ThemeConfig::parse_color("nothex"), Color::BLACK);
        assert_eq!(ThemeConfig::parse_color("#ff0000ff"), Color::from_rgba8(255, 0, 0, 255));
    }
}
