//! Preprocessor configuration.
//!
//! Every field has a default matching a stock sbt + Scala.js project, so an empty
//! JSON object is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dialect::Dialect;
use crate::error::{PreprocessError, Result};
use crate::rewrite::RenameOrder;

pub const DEFAULT_CONFIG_FILE: &str = "svala.config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PreprocessOptions {
    /// `lang` attribute value that selects a script block.
    pub lang: String,
    pub scratch_dir: PathBuf,
    pub scratch_stem: String,
    pub scratch_extension: String,
    pub keep_scratch: bool,
    pub compiler: CompilerCommand,
    pub output_js: PathBuf,
    /// Defaults to `outputJs` with `.map` appended.
    pub output_map: Option<PathBuf>,
    pub cache: bool,
    pub cache_dir: PathBuf,
    pub component_extensions: Vec<String>,
    pub rename_order: RenameOrder,
    pub output_check: OutputCheck,
    pub dialect: Dialect,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        PreprocessOptions {
            lang: "scala".to_string(),
            scratch_dir: PathBuf::from("./tmp"),
            scratch_stem: "Script".to_string(),
            scratch_extension: "scala".to_string(),
            keep_scratch: false,
            compiler: CompilerCommand::default(),
            output_js: PathBuf::from("./target/scala-3.3.3/svala-fastopt.js"),
            output_map: None,
            cache: true,
            cache_dir: PathBuf::from(".svala/cache"),
            component_extensions: vec!["svelte".to_string()],
            rename_order: RenameOrder::Discovery,
            output_check: OutputCheck::Warn,
            dialect: Dialect::default(),
        }
    }
}

impl PreprocessOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: PreprocessOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| PreprocessError::io(path, e))?;
        Self::from_json_str(&data)
    }

    /// Loads `svala.config.json` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::from_json_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lang.trim().is_empty() {
            return Err(PreprocessError::Config("lang must not be empty".to_string()));
        }
        if self.compiler.program.trim().is_empty() {
            return Err(PreprocessError::Config(
                "compiler.program must not be empty".to_string(),
            ));
        }
        if self.scratch_stem.is_empty() || self.scratch_stem.contains(['/', '\\']) {
            return Err(PreprocessError::Config(format!(
                "scratchStem \"{}\" must be a plain file name",
                self.scratch_stem
            )));
        }
        Ok(())
    }

    /// Identifies the compiler setup. Two option sets with the same fingerprint
    /// compile a given source to the same artifacts.
    pub fn toolchain_fingerprint(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.compiler.display(),
            self.compiler.working_dir.display(),
            self.output_js.display(),
            self.output_map_path().display()
        )
    }

    pub fn output_map_path(&self) -> PathBuf {
        match &self.output_map {
            Some(path) => path.clone(),
            None => {
                let mut raw = self.output_js.clone().into_os_string();
                raw.push(".map");
                PathBuf::from(raw)
            }
        }
    }
}

/// External compiler invocation. `{source}` in any argument is replaced with the
/// scratch file path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl Default for CompilerCommand {
    fn default() -> Self {
        CompilerCommand {
            program: "sbt".to_string(),
            args: vec!["fastOptJS".to_string()],
            working_dir: PathBuf::from("."),
        }
    }
}

impl CompilerCommand {
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|a| a.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What to do with the JavaScript parser's verdict on rewritten code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputCheck {
    Off,
    #[default]
    Warn,
    Deny,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_object_is_default() {
        let options = PreprocessOptions::from_json_str("{}").unwrap();
        assert_eq!(options, PreprocessOptions::default());
        assert_eq!(options.compiler.display(), "sbt fastOptJS");
    }

    #[test]
    fn test_output_map_defaults_next_to_js() {
        let options = PreprocessOptions::default();
        assert_eq!(
            options.output_map_path(),
            PathBuf::from("./target/scala-3.3.3/svala-fastopt.js.map")
        );

        let explicit = PreprocessOptions {
            output_map: Some(PathBuf::from("out/main.map")),
            ..PreprocessOptions::default()
        };
        assert_eq!(explicit.output_map_path(), PathBuf::from("out/main.map"));
    }

    #[test]
    fn test_toolchain_fingerprint() {
        let base = PreprocessOptions::default();
        assert_eq!(
            base.toolchain_fingerprint(),
            PreprocessOptions::default().toolchain_fingerprint()
        );

        let bumped = PreprocessOptions {
            output_js: PathBuf::from("./target/scala-3.4.0/svala-fastopt.js"),
            ..PreprocessOptions::default()
        };
        assert_ne!(base.toolchain_fingerprint(), bumped.toolchain_fingerprint());

        let mut linked = PreprocessOptions::default();
        linked.compiler.args = vec!["fastLinkJS".to_string()];
        assert_ne!(base.toolchain_fingerprint(), linked.toolchain_fingerprint());
    }

    #[test]
    fn test_camel_case_fields() {
        let json = r#"{
            "lang": "scalajs",
            "outputJs": "target/scala-3.4.0/app-fastopt.js",
            "renameOrder": "longestFirst",
            "outputCheck": "deny",
            "compiler": { "program": "sbt", "args": ["-batch", "fastLinkJS"] },
            "dialect": { "sigilReplacement": "sjs_" }
        }"#;
        let options = PreprocessOptions::from_json_str(json).unwrap();
        assert_eq!(options.lang, "scalajs");
        assert_eq!(options.rename_order, RenameOrder::LongestFirst);
        assert_eq!(options.output_check, OutputCheck::Deny);
        assert_eq!(options.compiler.display(), "sbt -batch fastLinkJS");
        assert_eq!(options.compiler.working_dir, PathBuf::from("."));
        assert_eq!(options.dialect.sigil_replacement, "sjs_");
        assert_eq!(options.scratch_dir, PathBuf::from("./tmp"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(matches!(
            PreprocessOptions::from_json_str(r#"{ "lang": " " }"#),
            Err(PreprocessError::Config(_))
        ));
        assert!(matches!(
            PreprocessOptions::from_json_str(r#"{ "scratchStem": "../Script" }"#),
            Err(PreprocessError::Config(_))
        ));
        assert!(matches!(
            PreprocessOptions::from_json_str(r#"{ "outputCheck": "loud" }"#),
            Err(PreprocessError::Json(_))
        ));
    }

    #[test]
    fn test_discover_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            PreprocessOptions::discover(dir.path()).unwrap(),
            PreprocessOptions::default()
        );

        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), r#"{ "cache": false }"#).unwrap();
        let options = PreprocessOptions::discover(dir.path()).unwrap();
        assert!(!options.cache);
    }
}
