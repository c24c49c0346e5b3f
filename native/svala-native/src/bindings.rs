//! Node bindings, used from a bundler preprocessor hook.

use lazy_static::lazy_static;
use napi_derive::napi;
use std::collections::HashMap;

use crate::preprocess::PreprocessorPool;
use crate::rewrite::rewrite;

lazy_static! {
    static ref PREPROCESSORS: PreprocessorPool = PreprocessorPool::new();
}

#[napi(object)]
pub struct NativeScriptOutput {
    pub code: String,
    pub map: String,
}

/// Runs only the rewrite pipeline on already compiled Scala.js output.
#[napi]
pub fn rewrite_scalajs_output(code: String, map: String) -> NativeScriptOutput {
    let out = rewrite(&code, &map);
    NativeScriptOutput {
        code: out.code,
        map: out.map,
    }
}

/// Preprocesses one script block. Returns `null` when the block is not Scala.
#[napi]
pub fn preprocess_scala_script(
    content: String,
    attributes: serde_json::Value,
    options_json: Option<String>,
) -> napi::Result<Option<NativeScriptOutput>> {
    let attributes: HashMap<String, String> = match attributes {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Bool(true) => "true".to_string(),
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect(),
        _ => HashMap::new(),
    };

    let preprocessor = PREPROCESSORS
        .get(options_json.as_deref())
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let processed = preprocessor
        .preprocess_script(&content, &attributes)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;

    Ok(processed.map(|p| NativeScriptOutput {
        code: p.code,
        map: p.map,
    }))
}

