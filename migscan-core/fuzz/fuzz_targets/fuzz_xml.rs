#![no_main]

//! Fuzz target for the element lookups used on core, app and workbook parts.
//!
//! Any byte sequence must yield either a value or `None`, never a panic.

use libfuzzer_sys::fuzz_target;
use migscan_core::xml::{
    count_elements, element_text, element_u32, first_element_text, TagMatch, DUBLIN_CORE_NS,
};

fuzz_target!(|data: &[u8]| {
    let creator = [
        TagMatch::Namespaced {
            namespace: DUBLIN_CORE_NS,
            local: "creator",
        },
        TagMatch::Qualified("dc:creator"),
    ];
    let author = first_element_text(data, &creator);
    // A namespaced match always wins over the prefix fallback.
    if let Some(namespaced) = element_text(data, creator[0]) {
        assert_eq!(author, Some(namespaced));
    }

    let _ = element_u32(data, TagMatch::Local("Pages"));

    // Lookups fail together: a document is either well formed or not.
    match count_elements(data, TagMatch::Local("sheet")) {
        None | Some(0) => assert!(element_text(data, TagMatch::Local("sheet")).is_none()),
        Some(_) => assert!(element_text(data, TagMatch::Local("sheet")).is_some()),
    }
});
