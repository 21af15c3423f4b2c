#![no_main]
use fibdelta::engine::{Engine, EngineOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz the decoder with arbitrary bytes.
    // The decoder must never panic; it only returns errors.
    let _ = Engine::default().decode_all(data);

    // Also fuzz with a table length picked by the first byte.
    if let Some((&first, rest)) = data.split_first() {
        let table_len = 2 + usize::from(first) % 93;
        if let Ok(engine) = Engine::new(EngineOptions { table_len }) {
            let _ = engine.decode_all(rest);
        }
    }
});
