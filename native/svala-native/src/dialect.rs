//! Dialect Module
//!
//! Everything the rewrite pipeline assumes about the shape of Scala.js output
//! lives here: the export statement grammar, the alias separator, the identifier
//! sigil and its replacement, and the declaration keywords. A toolchain upgrade
//! that changes any of these is a change to this one value.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};

lazy_static! {
    /// Dialect used when no configuration overrides it.
    pub static ref SCALAJS_DIALECT: CompiledDialect = Dialect::default()
        .compile()
        .expect("built-in Scala.js dialect patterns are valid");
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIALECT DESCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Dialect {
    /// Regex matching one export statement. Capture group 1 is the alias list.
    pub export_pattern: String,
    /// Regex splitting an alias entry into internal and public name.
    pub alias_separator: String,
    /// Identifier prefix character the host syntax rejects.
    pub sigil: char,
    /// Literal substituted for every occurrence of `sigil`.
    pub sigil_replacement: String,
    /// Function-scoped declaration keyword emitted by the compiler.
    pub function_scoped_keyword: String,
    /// Block-scoped keyword it is downgraded to.
    pub block_scoped_keyword: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            export_pattern: r"export\s*\{([^}]+)\}\s*;".to_string(),
            alias_separator: r"\s+as(?:\s+|$)".to_string(),
            sigil: '$',
            sigil_replacement: "scala_".to_string(),
            function_scoped_keyword: "var".to_string(),
            block_scoped_keyword: "let".to_string(),
        }
    }
}

impl Dialect {
    pub fn compile(&self) -> Result<CompiledDialect> {
        let export_statement =
            Regex::new(&self.export_pattern).map_err(|source| PreprocessError::InvalidPattern {
                field: "exportPattern",
                source,
            })?;
        if export_statement.captures_len() < 2 {
            return Err(PreprocessError::Config(
                "exportPattern must capture the alias list in group 1".to_string(),
            ));
        }

        let alias_separator =
            Regex::new(&self.alias_separator).map_err(|source| PreprocessError::InvalidPattern {
                field: "aliasSeparator",
                source,
            })?;

        if self.function_scoped_keyword.trim().is_empty() {
            return Err(PreprocessError::Config(
                "functionScopedKeyword must not be empty".to_string(),
            ));
        }
        let declaration = Regex::new(&format!(
            r"\b{}\b",
            regex::escape(&self.function_scoped_keyword)
        ))
        .map_err(|source| PreprocessError::InvalidPattern {
            field: "functionScopedKeyword",
            source,
        })?;

        Ok(CompiledDialect {
            export_statement,
            alias_separator,
            declaration,
            sigil: self.sigil,
            sigil_replacement: self.sigil_replacement.clone(),
            block_scoped_keyword: self.block_scoped_keyword.clone(),
            fingerprint: self.fingerprint(),
        })
    }

    /// Stable string identifying this dialect, used to salt cache keys.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.export_pattern,
            self.alias_separator,
            self.sigil,
            self.sigil_replacement,
            self.function_scoped_keyword,
            self.block_scoped_keyword
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILED DIALECT
// ═══════════════════════════════════════════════════════════════════════════════

/// A `Dialect` with its patterns compiled, ready for the rewrite passes.
#[derive(Debug, Clone)]
pub struct CompiledDialect {
    pub(crate) export_statement: Regex,
    pub(crate) alias_separator: Regex,
    pub(crate) declaration: Regex,
    pub(crate) sigil: char,
    pub(crate) sigil_replacement: String,
    pub(crate) block_scoped_keyword: String,
    fingerprint: String,
}

impl CompiledDialect {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dialect_compiles() {
        let dialect = Dialect::default().compile().unwrap();
        assert!(dialect.export_statement.is_match("export { $c_Foo as Foo };"));
        assert!(dialect.declaration.is_match("var x = 1;"));
        assert!(!dialect.declaration.is_match("variable = 1;"));
    }

    #[test]
    fn test_rejects_pattern_without_group() {
        let dialect = Dialect {
            export_pattern: r"export\s*\{[^}]+\};".to_string(),
            ..Dialect::default()
        };
        assert!(matches!(
            dialect.compile(),
            Err(PreprocessError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_regex() {
        let dialect = Dialect {
            alias_separator: r"(\s+as".to_string(),
            ..Dialect::default()
        };
        match dialect.compile() {
            Err(PreprocessError::InvalidPattern { field, .. }) => {
                assert_eq!(field, "aliasSeparator")
            }
            other => panic!("expected InvalidPattern, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_keyword_is_escaped() {
        let dialect = Dialect {
            function_scoped_keyword: "v.r".to_string(),
            ..Dialect::default()
        };
        let compiled = dialect.compile().unwrap();
        assert!(compiled.declaration.is_match("v.r x"));
        assert!(!compiled.declaration.is_match("var x"));
    }

    #[test]
    fn test_fingerprint_tracks_fields() {
        let a = Dialect::default();
        let b = Dialect {
            sigil_replacement: "sjs_".to_string(),
            ..Dialect::default()
        };
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), Dialect::default().fingerprint());
    }

    #[test]
    fn test_deserialize_partial() {
        let dialect: Dialect = serde_json::from_str(r#"{ "sigilReplacement": "sjs_" }"#).unwrap();
        assert_eq!(dialect.sigil_replacement, "sjs_");
        assert_eq!(dialect.sigil, '$');
        assert_eq!(dialect.block_scoped_keyword, "let");
    }
}
