#![no_main]

use libfuzzer_sys::fuzz_target;
use linetmpl_engine::Template;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if let Ok(template) = Template::parse_str("fuzz-template", source) {
            let _ = template.tree();
        }
    }
});
