#![no_main]
use libfuzzer_sys::fuzz_target;

use checkpoint_engine::ingest::{IncomingMessage, LocationCatalog, MessageParser};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(catalog) = LocationCatalog::builtin() else {
        return;
    };
    let _ = MessageParser::new(catalog).parse(&IncomingMessage::new(text));
});
