#![no_main]
use fibdelta::engine::{Engine, EngineOptions};
use fibdelta::io::{compress_stream, decompress_stream};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte selects the table length; the rest is read as u64 words.
    let table_len = 2 + usize::from(data[0]) % 93;
    let engine = Engine::new(EngineOptions { table_len }).unwrap();
    let values: Vec<u64> = data[1..]
        .chunks(8)
        .map(|c| {
            let mut word = [0u8; 8];
            word[..c.len()].copy_from_slice(c);
            u64::from_le_bytes(word)
        })
        .collect();

    let encoded = engine.encode_all(values.iter().copied());
    let decoded = engine.decode_all(&encoded).unwrap();
    assert_eq!(decoded, values);

    // Text pipeline on the raw bytes must never panic and must round-trip
    // whatever integers it accepted.
    let mut bin = Vec::new();
    let Ok(stats) = compress_stream(&engine, data, &mut bin) else {
        return;
    };
    let mut text = Vec::new();
    let back = decompress_stream(&engine, bin.as_slice(), &mut text).unwrap();
    assert_eq!(back.values, stats.values);
});
