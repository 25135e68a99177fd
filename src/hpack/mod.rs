//! HPACK header compression (L1, spec §4.2).
//!
//! Module split mirrors the sibling `rama-http-core` fork's
//! `h2/hpack/{decoder,encoder,table,huffman}.rs` layout: table data and the
//! Huffman code are self-contained, `decoder`/`encoder` hold the codec logic
//! and own one `DynamicTable` each.

mod decoder;
mod encoder;
pub mod huffman;
mod integer;
mod table;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use table::{DynamicTable, STATIC_TABLE};

/// A decoded or to-be-encoded header pair. Plain owned strings rather than
/// the teacher's `Bytes`-backed `String<Bytes>`/`HeaderValue` split, since
/// our callers (the HTTP/2 engine) already convert to `http::HeaderMap`
/// immediately after decode.
pub type Header = (String, String);

#[cfg(test)]
mod prop_tests {
    use super::*;
    use quickcheck::{quickcheck, TestResult};

    fn printable_ascii(len: usize, seed: u8) -> String {
        (0..len)
            .map(|i| (33u8 + ((seed.wrapping_add(i as u8)) % 94)) as char)
            .collect()
    }

    #[test]
    fn huffman_round_trip_quickcheck() {
        fn prop(data: Vec<u8>) -> bool {
            let encoded = huffman::encode(&data);
            huffman::decode(&encoded).map(|d| d == data).unwrap_or(false)
        }
        quickcheck(prop as fn(Vec<u8>) -> bool);
    }

    #[test]
    fn hpack_round_trip_quickcheck() {
        fn prop(seeds: Vec<(u8, u8, u8)>) -> TestResult {
            if seeds.len() > 64 {
                return TestResult::discard();
            }
            let headers: Vec<Header> = seeds
                .iter()
                .map(|&(s1, s2, len)| {
                    let name = printable_ascii(1 + (len as usize % 64), s1).to_lowercase();
                    let value = printable_ascii(1 + (len as usize % 200), s2);
                    (name, value)
                })
                .collect();

            let mut enc = Encoder::new(4096);
            let wire = enc.encode(&headers);

            let mut dec = Decoder::new(4096);
            let decoded = match dec.decode(&wire, 1 << 20) {
                Ok(d) => d,
                Err(_) => return TestResult::failed(),
            };

            TestResult::from_bool(decoded == headers)
        }
        quickcheck(prop as fn(Vec<(u8, u8, u8)>) -> TestResult);
    }
}
