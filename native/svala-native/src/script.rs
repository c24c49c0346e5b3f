//! Script block extraction and splicing for component templates.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;

lazy_static! {
    /// Script block regex
    static ref SCRIPT_REGEX: Regex = Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script>").unwrap();

    /// Attribute regex for parsing script attributes
    static ref ATTR_REGEX: Regex = Regex::new(r#"(?i)([a-z0-9:_-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^>\s]+)))?"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    /// Position among the component's script blocks.
    pub index: usize,
    pub attributes: HashMap<String, String>,
    pub content: String,
    /// Byte range of `content` within the component source.
    pub content_range: Range<usize>,
}

impl ScriptBlock {
    pub fn lang(&self) -> Option<&str> {
        self.attributes.get("lang").map(|s| s.as_str())
    }

    pub fn is_lang(&self, lang: &str) -> bool {
        is_lang(&self.attributes, lang)
    }
}

/// Whether a block's attributes declare the given language.
pub fn is_lang(attributes: &HashMap<String, String>, lang: &str) -> bool {
    attributes
        .get("lang")
        .map(|value| value.eq_ignore_ascii_case(lang))
        .unwrap_or(false)
}

pub fn parse_attributes(attr_string: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for attr_caps in ATTR_REGEX.captures_iter(attr_string) {
        if let Some(name) = attr_caps.get(1) {
            let value = attr_caps
                .get(2)
                .or_else(|| attr_caps.get(3))
                .or_else(|| attr_caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "true".to_string());
            attributes.insert(name.as_str().to_lowercase(), value);
        }
    }
    attributes
}

/// Finds every inline script block in a component source, in document order.
pub fn find_script_blocks(source: &str) -> Vec<ScriptBlock> {
    SCRIPT_REGEX
        .captures_iter(source)
        .enumerate()
        .filter_map(|(index, caps)| {
            let attr_string = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let content = caps.get(2)?;
            Some(ScriptBlock {
                index,
                attributes: parse_attributes(attr_string),
                content: content.as_str().to_string(),
                content_range: content.range(),
            })
        })
        .collect()
}

/// Replaces byte ranges of `source`. Ranges must not overlap.
pub fn splice(source: &str, mut replacements: Vec<(Range<usize>, String)>) -> String {
    replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    debug_assert!(
        replacements.windows(2).all(|w| w[1].0.end <= w[0].0.start),
        "overlapping splice ranges"
    );

    let mut output = source.to_string();
    for (range, text) in replacements {
        output.replace_range(range, &text);
    }
    output
}
