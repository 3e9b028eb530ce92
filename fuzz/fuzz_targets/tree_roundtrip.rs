#![no_main]

use libfuzzer_sys::fuzz_target;
use linetmpl_engine::{Template, Tree};

// Writing a parsed tree back out and parsing it again must give the same
// template string, and the JSON form must decode to the same tree.
fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(template) = Template::parse_str("fuzz-roundtrip", source) else {
        return;
    };
    let tree = template.tree();

    let json = serde_json::to_vec(&tree).expect("tree serializes");
    let decoded: Tree = serde_json::from_slice(&json).expect("tree decodes");
    assert_eq!(decoded, tree);

    let written = tree.to_template_string();
    let reparsed = Template::parse_str("fuzz-roundtrip", &written).expect("written template parses");
    assert_eq!(reparsed.to_template_string(), written);
});
