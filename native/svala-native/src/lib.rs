//! # Svala Native
//!
//! Build-time preprocessing of `<script lang="scala">` blocks in component
//! templates. A block is compiled with the Scala.js toolchain and the linker's
//! JavaScript output is rewritten so a component script block accepts it.
//!
//! ## Rewrite Invariants
//!
//! 1. **Pass Order**: export resolution → renaming → sigil sanitizing →
//!    declaration downgrade. Each pass sees the previous pass's text.
//!
//! 2. **Exports**: every `export { internal as public, ... };` statement is
//!    recorded in an ordered alias table and deleted from the output.
//!
//! 3. **Renaming**: internal names are replaced by public names as raw
//!    substrings, in discovery order unless `RenameOrder::LongestFirst` is set.
//!
//! 4. **Sigil**: every `$` becomes `scala_`, inside strings too.
//!
//! 5. **Declarations**: every standalone `var` becomes `let`.
//!
//! 6. **Source Maps**: passed through byte-for-byte.
//!
//! 7. **Purity**: the rewrite is deterministic and does no I/O. Scratch files,
//!    the compiler process, and caching live in `toolchain`, `cache` and
//!    `preprocess`.

mod cache;
mod check;
mod config;
mod dialect;
mod discovery;
mod error;
mod preprocess;
mod rewrite;
mod script;
mod toolchain;

#[cfg(feature = "napi")]
mod bindings;


pub use cache::{CachedRewrite, RewriteCache};
pub use check::check_output;
pub use config::{CompilerCommand, OutputCheck, PreprocessOptions, DEFAULT_CONFIG_FILE};
pub use dialect::{CompiledDialect, Dialect, SCALAJS_DIALECT};
pub use discovery::find_component_files;
pub use error::{PreprocessError, Result};
pub use preprocess::{
    ComponentOutput, DirReport, FileFailure, FileOutput, Preprocessor, PreprocessorPool, Processed,
};
pub use rewrite::{
    apply_renames, downgrade_declarations, resolve_exports, rewrite, rewrite_with,
    sanitize_identifiers, ExportAliases, RenameOrder, RewriteOutput,
};
pub use script::{find_script_blocks, parse_attributes, splice, ScriptBlock};
pub use toolchain::{CompiledArtifacts, Compiler, ScratchFile, Toolchain};

#[cfg(feature = "napi")]
pub use bindings::{preprocess_scala_script, rewrite_scalajs_output};
