//! Rewrite Module
//!
//! Turns Scala.js linker output into text a component script block accepts.
//! Four text passes run in a fixed order on one buffer:
//!
//! 1. **Export resolution**: every `export { a as b, c };` statement is read into
//!    an ordered alias table and deleted from the text.
//! 2. **Renaming**: every occurrence of an internal name is replaced by its public
//!    name. Matching is a raw substring match with no identifier boundaries.
//! 3. **Sigil sanitizing**: every `$` becomes `scala_`, strings included.
//! 4. **Declaration downgrade**: every standalone `var` becomes `let`.
//!
//! None of the passes parse JavaScript. They rely on the compiler emitting the
//! shapes described by [`Dialect`](crate::dialect::Dialect).

use regex::{Captures, NoExpand};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dialect::{CompiledDialect, SCALAJS_DIALECT};

// ═══════════════════════════════════════════════════════════════════════════════
// EXPORT ALIAS TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Internal name → public name, in the order the exports were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportAliases {
    entries: Vec<(String, String)>,
}

impl ExportAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an alias. The first public name seen for an internal name wins.
    pub fn insert(&mut self, internal: &str, public: &str) {
        if let Some(existing) = self.get(internal) {
            if existing != public {
                warn!(
                    internal,
                    kept = existing,
                    ignored = public,
                    "internal name exported under two public names"
                );
            }
            return;
        }
        self.entries.push((internal.to_string(), public.to_string()));
    }

    pub fn get(&self, internal: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == internal)
            .map(|(_, public)| public.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(internal, public)| (internal.as_str(), public.as_str()))
    }

    /// Entries in the order `apply_renames` will substitute them.
    pub fn ordered(&self, order: RenameOrder) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self.iter().collect();
        if order == RenameOrder::LongestFirst {
            // Stable: equal lengths keep discovery order.
            pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        }
        pairs
    }
}

/// Order in which renames are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenameOrder {
    /// Order the aliases appear in the compiled output.
    #[default]
    Discovery,
    /// Longest internal name first, so a name that is a substring of another
    /// cannot clobber it.
    LongestFirst,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects every export alias and removes the export statements.
pub fn resolve_exports(source: &str, dialect: &CompiledDialect) -> (ExportAliases, String) {
    let mut aliases = ExportAliases::new();
    let stripped = dialect
        .export_statement
        .replace_all(source, |caps: &Captures| {
            let list = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            for entry in list.split(',') {
                record_alias(entry, dialect, &mut aliases);
            }
            String::new()
        })
        .into_owned();
    (aliases, stripped)
}

fn record_alias(entry: &str, dialect: &CompiledDialect, aliases: &mut ExportAliases) {
    let entry = entry.trim();
    if entry.is_empty() {
        // Trailing comma.
        return;
    }

    let parts: Vec<&str> = dialect
        .alias_separator
        .split(entry)
        .map(|part| part.trim())
        .collect();

    let (internal, public) = match parts.as_slice() {
        [internal] => (*internal, *internal),
        [internal, public] => (*internal, *public),
        [internal, public, ..] => {
            warn!(entry, "export entry has more than one separator, extra parts ignored");
            (*internal, *public)
        }
        [] => return,
    };

    if internal.is_empty() {
        warn!(entry, "export entry without an internal name skipped");
        return;
    }
    if public.is_empty() {
        warn!(entry, "export entry without a public name treated as self-export");
        aliases.insert(internal, internal);
        return;
    }
    aliases.insert(internal, public);
}

/// Replaces every occurrence of each internal name with its public name.
pub fn apply_renames(source: &str, aliases: &ExportAliases, order: RenameOrder) -> String {
    let mut text = source.to_string();
    for (internal, public) in aliases.ordered(order) {
        if internal == public {
            continue;
        }
        text = text.replace(internal, public);
    }
    text
}

/// Replaces the dialect's identifier sigil everywhere in the text.
pub fn sanitize_identifiers(source: &str, dialect: &CompiledDialect) -> String {
    if !source.contains(dialect.sigil) {
        return source.to_string();
    }
    let mut buf = [0u8; 4];
    let sigil: &str = dialect.sigil.encode_utf8(&mut buf);
    source.replace(sigil, &dialect.sigil_replacement)
}

/// Rewrites standalone function-scoped declaration keywords to block-scoped ones.
pub fn downgrade_declarations(source: &str, dialect: &CompiledDialect) -> String {
    dialect
        .declaration
        .replace_all(source, NoExpand(&dialect.block_scoped_keyword))
        .into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOutput {
    pub code: String,
    /// Source map as read from the compiler, untouched.
    pub map: String,
    pub aliases: ExportAliases,
}

/// Runs the full pipeline with the built-in Scala.js dialect.
pub fn rewrite(source: &str, map: &str) -> RewriteOutput {
    rewrite_with(source, map, &SCALAJS_DIALECT, RenameOrder::Discovery)
}

pub fn rewrite_with(
    source: &str,
    map: &str,
    dialect: &CompiledDialect,
    order: RenameOrder,
) -> RewriteOutput {
    let (aliases, code) = resolve_exports(source, dialect);
    let code = apply_renames(&code, &aliases, order);
    let code = sanitize_identifiers(&code, dialect);
    let code = downgrade_declarations(&code, dialect);

    debug!(
        exports = aliases.len(),
        input_len = source.len(),
        output_len = code.len(),
        "rewrote compiled script"
    );

    RewriteOutput {
        code,
        map: map.to_string(),
        aliases,
    }
}
