//! Report configuration, loaded from TOML with environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Overrides [`ReportConfig::output_dir`].
pub const OUTPUT_DIR_ENV: &str = "COMP_REPORT_OUTPUT_DIR";

/// Overrides [`ReportConfig::image_width_inches`].
pub const IMAGE_WIDTH_ENV: &str = "COMP_REPORT_IMAGE_WIDTH";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config is not valid TOML for [`ReportConfig`].
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings for a report run. Every key is optional in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory for generated documents and the image directory.
    pub output_dir: PathBuf,
    /// Name of the extracted-image directory inside `output_dir`.
    pub images_dir_name: String,
    /// Display width of inserted pictures.
    pub image_width_inches: f64,
    /// Extra boilerplate lines stripped from report text.
    pub banners: Vec<String>,
    /// Whether a JSON summary is written next to each document.
    pub write_summary: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            images_dir_name: "comp_images".to_owned(),
            image_width_inches: comp_report_docx::DEFAULT_IMAGE_WIDTH_INCHES,
            banners: Vec::new(),
            write_summary: true,
        }
    }
}

impl ReportConfig {
    /// Parses a TOML config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if `toml_str` is not a valid config.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads a TOML config file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loaded report config from {}", path.display());
        Ok(Self::from_toml_str(&contents)?.with_env_overrides())
    }

    /// Applies `COMP_REPORT_OUTPUT_DIR` and `COMP_REPORT_IMAGE_WIDTH`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(width) = var(IMAGE_WIDTH_ENV) {
            match width.trim().parse::<f64>() {
                Ok(inches) if inches > 0.0 => self.image_width_inches = inches,
                _ => log::warn!("Ignoring invalid {IMAGE_WIDTH_ENV}={width:?}"),
            }
        }
        self
    }

    /// Directory extracted images are saved into.
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join(&self.images_dir_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_the_default() {
        assert_eq!(ReportConfig::from_toml_str("").unwrap(), ReportConfig::default());
        assert_eq!(
            ReportConfig::default().images_dir(),
            PathBuf::from("output/comp_images")
        );
    }

    #[test]
    fn toml_keys_override_defaults() {
        let config = ReportConfig::from_toml_str(
            r#"
output_dir = "/tmp/reports"
image_width_inches = 3.5
banners = ["Acme Realty", "Confidential"]
write_summary = false
"#,
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.images_dir_name, "comp_images");
        assert!((config.image_width_inches - 3.5).abs() < f64::EPSILON);
        assert_eq!(config.banners, vec!["Acme Realty", "Confidential"]);
        assert!(!config.write_summary);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(matches!(
            ReportConfig::from_toml_str("image_width_inches = \"wide\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn environment_overrides() {
        let config = ReportConfig::default().with_overrides(|name| match name {
            OUTPUT_DIR_ENV => Some("/srv/out".to_owned()),
            IMAGE_WIDTH_ENV => Some("5.25".to_owned()),
            _ => None,
        });
        assert_eq!(config.output_dir, PathBuf::from("/srv/out"));
        assert!((config.image_width_inches - 5.25).abs() < f64::EPSILON);

        let config = ReportConfig::default().with_overrides(|name| {
            (name == IMAGE_WIDTH_ENV).then(|| "-1".to_owned())
        });
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn load_reads_a_file() {
        let dir = std::env::temp_dir().join(format!("comp_report_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.toml");
        std::fs::write(&path, "images_dir_name = \"pictures\"\n").unwrap();

        let config = ReportConfig::load(&path).unwrap();
        assert_eq!(config.images_dir_name, "pictures");
        assert!(matches!(
            ReportConfig::load(&dir.join("missing.toml")),
            Err(ConfigError::Io(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
