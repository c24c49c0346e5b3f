//! Preprocess Module
//!
//! Ties the pieces together for a build: picks the script blocks tagged with
//! the configured language, compiles them, rewrites the compiled JavaScript, and
//! splices it back into the component. Blocks in other languages pass through
//! untouched.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, info_span, warn};

use crate::cache::{CachedRewrite, RewriteCache};
use crate::check::check_output;
use crate::config::{OutputCheck, PreprocessOptions};
use crate::dialect::CompiledDialect;
use crate::discovery::find_component_files;
use crate::error::{PreprocessError, Result};
use crate::rewrite::{rewrite_with, ExportAliases};
use crate::script::{find_script_blocks, is_lang, splice};
use crate::toolchain::{Compiler, Toolchain};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Result for one script block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Processed {
    pub code: String,
    pub map: String,
    pub aliases: ExportAliases,
    /// Served from the rewrite cache without running the compiler.
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOutput {
    pub code: String,
    /// Source maps of the rewritten blocks, in document order.
    pub maps: Vec<String>,
    pub blocks_rewritten: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutput {
    pub path: PathBuf,
    pub output: ComponentOutput,
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: PreprocessError,
}

/// Outcome of preprocessing a directory. Only files with at least one rewritten
/// block appear in `outputs`.
#[derive(Debug, Default)]
pub struct DirReport {
    pub outputs: Vec<FileOutput>,
    pub failures: Vec<FileFailure>,
    pub files_scanned: usize,
}

impl DirReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PREPROCESSOR
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Preprocessor {
    options: PreprocessOptions,
    dialect: CompiledDialect,
    compiler: Box<dyn Compiler>,
    cache: Option<RewriteCache>,
}

impl Preprocessor {
    /// Uses the sbt toolchain described by `options`.
    pub fn from_options(options: PreprocessOptions) -> Result<Self> {
        let toolchain = Toolchain::from_options(&options);
        Self::new(options, Box::new(toolchain))
    }

    pub fn new(options: PreprocessOptions, compiler: Box<dyn Compiler>) -> Result<Self> {
        options.validate()?;
        let dialect = options.dialect.compile()?;
        let cache = if options.cache {
            let salt = format!(
                "{}\u{1f}{:?}\u{1f}{}",
                dialect.fingerprint(),
                options.rename_order,
                options.toolchain_fingerprint()
            );
            Some(RewriteCache::new(options.cache_dir.clone(), salt))
        } else {
            None
        };

        Ok(Preprocessor {
            options,
            dialect,
            compiler,
            cache,
        })
    }

    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// Handles one script block. `None` when the block is not in the configured
    /// language.
    pub fn preprocess_script(
        &self,
        content: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<Option<Processed>> {
        self.preprocess_block(content, attributes, "<script>")
    }

    fn preprocess_block(
        &self,
        content: &str,
        attributes: &HashMap<String, String>,
        file: &str,
    ) -> Result<Option<Processed>> {
        if !is_lang(attributes, &self.options.lang) {
            return Ok(None);
        }

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(content) {
                return Ok(Some(Processed {
                    code: hit.code,
                    map: hit.map,
                    aliases: hit.aliases,
                    cached: true,
                }));
            }
        }

        let artifacts = self.compiler.compile(content)?;
        let output = rewrite_with(
            &artifacts.js,
            &artifacts.map,
            &self.dialect,
            self.options.rename_order,
        );

        self.check(&output.code, file)?;

        let rewritten = CachedRewrite {
            code: output.code,
            map: output.map,
            aliases: output.aliases,
        };
        if let Some(cache) = &self.cache {
            cache.set(content, &rewritten);
        }

        Ok(Some(Processed {
            code: rewritten.code,
            map: rewritten.map,
            aliases: rewritten.aliases,
            cached: false,
        }))
    }

    fn check(&self, code: &str, file: &str) -> Result<()> {
        if self.options.output_check == OutputCheck::Off {
            return Ok(());
        }
        let diagnostics = check_output(code);
        if diagnostics.is_empty() {
            return Ok(());
        }
        match self.options.output_check {
            OutputCheck::Deny => Err(PreprocessError::InvalidOutput {
                file: file.to_string(),
                diagnostics,
            }),
            _ => {
                for diagnostic in &diagnostics {
                    warn!(file, diagnostic = %diagnostic, "rewritten script may not parse");
                }
                Ok(())
            }
        }
    }

    /// Rewrites every matching script block of a component source.
    pub fn preprocess_component(&self, source: &str, file: &str) -> Result<ComponentOutput> {
        let _span = info_span!("preprocess_component", file).entered();

        let mut replacements = Vec::new();
        let mut maps = Vec::new();

        for block in find_script_blocks(source) {
            match self.preprocess_block(&block.content, &block.attributes, file)? {
                Some(processed) => {
                    debug!(
                        block = block.index,
                        exports = processed.aliases.len(),
                        cached = processed.cached,
                        "script block rewritten"
                    );
                    replacements.push((block.content_range.clone(), processed.code));
                    maps.push(processed.map);
                }
                None => continue,
            }
        }

        let blocks_rewritten = replacements.len();
        let code = if blocks_rewritten == 0 {
            source.to_string()
        } else {
            splice(source, replacements)
        };

        Ok(ComponentOutput {
            code,
            maps,
            blocks_rewritten,
        })
    }

    pub fn preprocess_file(&self, path: &Path) -> Result<ComponentOutput> {
        let source = fs::read_to_string(path).map_err(|e| PreprocessError::io(path, e))?;
        self.preprocess_component(&source, &path.to_string_lossy())
    }

    /// Preprocesses every component under `dir`. A failing file does not stop
    /// the others.
    pub fn preprocess_dir(&self, dir: &Path) -> Result<DirReport> {
        if !dir.is_dir() {
            return Err(PreprocessError::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let files = find_component_files(dir, &self.options.component_extensions);
        info!(dir = %dir.display(), files = files.len(), "preprocessing components");

        let results: Vec<(PathBuf, Result<ComponentOutput>)> = files
            .par_iter()
            .map(|path| (path.clone(), self.preprocess_file(path)))
            .collect();

        let mut report = DirReport {
            files_scanned: files.len(),
            ..DirReport::default()
        };
        for (path, result) in results {
            match result {
                Ok(output) if output.blocks_rewritten > 0 => {
                    report.outputs.push(FileOutput { path, output })
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "component failed");
                    report.failures.push(FileFailure { path, error });
                }
            }
        }
        Ok(report)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PREPROCESSOR POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Preprocessors keyed by their JSON options, so repeated calls with the same
/// configuration reuse compiled patterns and the cache handle.
#[derive(Default)]
pub struct PreprocessorPool {
    entries: Mutex<HashMap<String, Arc<Preprocessor>>>,
}

impl PreprocessorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` selects the default options.
    pub fn get(&self, options_json: Option<&str>) -> Result<Arc<Preprocessor>> {
        let key = options_json.unwrap_or_default().to_string();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries.get(&key) {
            return Ok(existing.clone());
        }

        let options = match options_json {
            Some(json) => PreprocessOptions::from_json_str(json)?,
            None => PreprocessOptions::default(),
        };
        let preprocessor = Arc::new(Preprocessor::from_options(options)?);
        debug!(pooled = entries.len() + 1, "created preprocessor");
        entries.insert(key, preprocessor.clone());
        Ok(preprocessor)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
