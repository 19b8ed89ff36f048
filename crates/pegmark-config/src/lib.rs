use pegmark_syntax::{DEFAULT_MAX_DEPTH, Extensions, ParserOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Unknown extension '{name}'")]
    UnknownExtension { name: String },
}

/// Directory holding the default config file, before tilde expansion.
const CONFIG_DIR: &str = "~/.config/pegmark";
const CONFIG_FILE: &str = "config.toml";

/// Parser settings as stored on disk.
///
/// ```toml
/// max_depth = 64
///
/// [extensions]
/// smarts = true
/// tables = true
/// ```
///
/// Extension names are the flag names of [`Extensions`] in any case,
/// including the `smartypants`, `suppress_all_html` and `all` groups.
/// Groups are applied before single flags, so `all = true` with
/// `hardwraps = false` enables everything but hard wraps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub extensions: BTreeMap<String, bool>,
}

impl Config {
    /// Read and validate the config at `config_path`. A missing file is
    /// `Ok(None)`; an extension name the parser does not know is an error
    /// here rather than when the options are first used.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        let content = match std::fs::read_to_string(config_path) {
            Ok(content) => content,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::ConfigReadError {
                    config_path: config_path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.parser_options()?;
        log::debug!(
            "loaded {} extension entries from {}",
            config.extensions.len(),
            config_path.display()
        );
        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    /// The options from the default config file, or plain Markdown when
    /// there is none.
    pub fn load_options() -> Result<ParserOptions, ConfigError> {
        match Self::load()? {
            Some(config) => config.parser_options(),
            None => Ok(ParserOptions::default()),
        }
    }

    /// Write the config as TOML, creating parent directories. A config
    /// naming an unknown extension is refused before anything is written.
    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        self.parser_options()?;
        let config_path = config_path.as_ref();
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(Self::config_path())
    }

    /// `~/.config/pegmark/config.toml`, with the home directory expanded.
    pub fn config_path() -> PathBuf {
        PathBuf::from(shellexpand::tilde(CONFIG_DIR).as_ref()).join(CONFIG_FILE)
    }

    /// A config that reproduces `options`, one entry per enabled flag.
    pub fn from_options(options: ParserOptions) -> Self {
        let extensions = options
            .extensions
            .iter_names()
            .map(|(name, _)| (name.to_ascii_lowercase(), true))
            .collect();
        Self {
            max_depth: (options.max_depth != DEFAULT_MAX_DEPTH).then_some(options.max_depth),
            extensions,
        }
    }

    /// The parser options this config describes.
    ///
    /// Wider groups are applied first and single flags last, whatever order
    /// the names sort in.
    pub fn parser_options(&self) -> Result<ParserOptions, ConfigError> {
        let mut entries = self
            .extensions
            .iter()
            .map(|(name, &enabled)| {
                Extensions::by_name(name)
                    .map(|flag| (flag, enabled))
                    .ok_or_else(|| ConfigError::UnknownExtension { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|(flag, _)| std::cmp::Reverse(flag.bits().count_ones()));

        let mut extensions = Extensions::NONE;
        for (flag, enabled) in entries {
            extensions.set(flag, enabled);
        }
        Ok(ParserOptions::new()
            .with_extensions(extensions)
            .with_max_depth(self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/pegmark/config.toml"));
    }

    #[test]
    fn test_empty_config_is_plain_markdown() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.parser_options().unwrap(), ParserOptions::default());
    }

    #[test]
    fn test_extensions_from_toml() {
        let config: Config = toml::from_str(
            r#"
max_depth = 64

[extensions]
smarts = true
Tables = true
hardwraps = false
"#,
        )
        .unwrap();

        let options = config.parser_options().unwrap();
        assert_eq!(options.extensions, Extensions::SMARTS | Extensions::TABLES);
        assert_eq!(options.max_depth, 64);
    }

    #[test]
    fn test_groups_can_be_narrowed() {
        let config: Config = toml::from_str(
            r#"
[extensions]
all = true
hardwraps = false
"#,
        )
        .unwrap();

        let options = config.parser_options().unwrap();
        assert_eq!(options.extensions, Extensions::ALL - Extensions::HARDWRAPS);
    }

    #[rstest]
    #[case("all = true\nabbreviations = false\n", Extensions::ALL - Extensions::ABBREVIATIONS)]
    #[case("all = true\nsmartypants = false\n", Extensions::ALL - Extensions::SMARTYPANTS)]
    #[case("smartypants = true\nquotes = false\n", Extensions::SMARTS)]
    #[case("all = false\ntables = true\n", Extensions::TABLES)]
    fn test_single_flags_override_groups(#[case] entries: &str, #[case] expected: Extensions) {
        let config: Config = toml::from_str(&format!("[extensions]\n{entries}")).unwrap();
        assert_eq!(config.parser_options().unwrap().extensions, expected);
    }

    #[test]
    fn test_unknown_extension_fails_the_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[extensions]\nfootnotes = true\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownExtension { ref name } if name == "footnotes"));
    }

    #[test]
    fn test_unknown_extension_is_not_saved() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        let mut config = Config::default();
        config.extensions.insert("footnotes".to_string(), true);

        assert!(config.save_to_path(&config_file).is_err());
        assert!(!config_file.exists());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let config: Config = toml::from_str("[extensions]\nwikilinks = true\n").unwrap();
        let err = config.parser_options().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownExtension { ref name } if name == "wikilinks"));
    }

    #[test]
    fn test_unknown_field_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "notes_path = \"/tmp\"\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let options = ParserOptions::new()
            .with_extensions(Extensions::SMARTYPANTS | Extensions::FENCED_CODE_BLOCKS)
            .with_max_depth(40);
        let config = Config::from_options(options);

        config.save_to_path(&config_file).unwrap();
        let loaded = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.parser_options().unwrap(), options);
    }

    #[test]
    fn test_default_depth_is_not_written() {
        let config = Config::from_options(ParserOptions::from(Extensions::TABLES));
        let toml_str = toml::to_string(&config).unwrap();
        assert!(!toml_str.contains("max_depth"));
        assert!(toml_str.contains("tables = true"));
    }

    #[test]
    fn test_loaded_options_drive_the_parser() {
        let config: Config = toml::from_str("[extensions]\ntables = true\n").unwrap();
        let parser = pegmark_syntax::MarkdownParser::new(config.parser_options().unwrap());
        let root = parser.parse("| a |\n|---|\n").unwrap();
        assert_eq!(root.children[0].kind, pegmark_syntax::NodeKind::Table);
    }
}
