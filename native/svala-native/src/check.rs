//! Output check: parses rewritten code as an ES module and runs semantic syntax
//! checks, which catch the duplicate `let` declarations a blind `var` downgrade
//! can produce.

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;

/// Returns one message per problem found. Empty means the code is acceptable.
pub fn check_output(code: &str) -> Vec<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let ret = Parser::new(&allocator, code, source_type).parse();

    if !ret.errors.is_empty() {
        return ret.errors.iter().map(|e| e.to_string()).collect();
    }

    let semantic = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&ret.program);
    semantic.errors.iter().map(|e| e.to_string()).collect()
}
