#![no_main]

use cilcompat::metadata::{method::MethodBody, scope::ReferenceScope};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let scope = ReferenceScope::new();
    if let Ok(mut body) = MethodBody::decode(data, &scope) {
        if body.layout().is_ok() {
            let _ = body.encode(&scope);
        }
    }
});
