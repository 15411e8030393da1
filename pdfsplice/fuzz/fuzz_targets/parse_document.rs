#![no_main]

use libfuzzer_sys::fuzz_target;
use pdfsplice::{merge_documents, parse_document, serialize_document};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must produce an error, never a panic.
    let Ok(doc) = parse_document(data) else {
        return;
    };

    // Whatever parses must also survive a copy and re-serialization.
    if let Ok(merged) = merge_documents(&[doc]) {
        let bytes = serialize_document(&merged).unwrap();
        let reparsed = parse_document(&bytes).unwrap();
        assert_eq!(reparsed.page_count(), merged.page_count());
    }
});
