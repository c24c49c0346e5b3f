use svala_native::{check_output, rewrite};

fn main() {
    let compiled = r#"'use strict';
var $n_LCounter$ = null;
function $m_LCounter$() {
  if (($n_LCounter$ === null)) {
    $n_LCounter$ = new $c_LCounter$();
  }
  return $n_LCounter$;
}
function $s_LCounter__increment__I__I(n) {
  return ((1 + n) | 0);
}
export { $s_LCounter__increment__I__I as increment };
"#;

    let out = rewrite(compiled, "{\"version\":3}");

    println!("Exports:");
    for (internal, public) in out.aliases.iter() {
        println!("  {} -> {}", internal, public);
    }
    println!("\nRewritten:\n{}", out.code);

    let diagnostics = check_output(&out.code);
    if diagnostics.is_empty() {
        println!("Output parses as an ES module.");
    } else {
        println!("Diagnostics: {:?}", diagnostics);
    }
}
