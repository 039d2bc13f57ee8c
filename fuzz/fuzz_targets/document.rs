//! Document Fuzz Target
//!
//! Fuzzes GraphQL document compilation and response-field extraction.
//! Goal: no panics on arbitrary text, including multi-byte whitespace.

#![no_main]

use kontrak_graphql::{GraphqlDocument, top_level_field};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    // Raw-text extractor
    let extracted = top_level_field(source);
    if let Some(field) = &extracted {
        assert!(!field.is_empty());
    }

    // Full compilation must agree with the extractor when it succeeds
    if let Ok(document) = GraphqlDocument::parse(source) {
        assert_eq!(document.top_level_field(), extracted.as_deref());
    }
});
