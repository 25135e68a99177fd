//! HPACK header block encoder (spec §4.2.4).

use super::huffman;
use super::integer;
use super::table::{DynamicTable, STATIC_TABLE};
use super::Header;

pub struct Encoder {
    dynamic: DynamicTable,
}

impl Encoder {
    pub fn new(max_table_size: usize) -> Self {
        Encoder {
            dynamic: DynamicTable::new(max_table_size),
        }
    }

    /// Peer asserted a new SETTINGS_HEADER_TABLE_SIZE; shrink (or, on a
    /// table-size-update frame, the encoder may also choose to grow up to
    /// this bound — we always use the full bound the peer allows).
    pub fn set_max_table_size(&mut self, max_table_size: usize) {
        self.dynamic.set_max_size(max_table_size);
    }

    /// Encodes `headers` in order. Always emits a literal with incremental
    /// indexing unless an exact (name, value) match exists in the static or
    /// dynamic table, matching the teacher's default "index everything that
    /// can be usefully reused" policy.
    pub fn encode(&mut self, headers: &[Header]) -> Vec<u8> {
        let mut out = Vec::new();

        for (name, value) in headers {
            if let Some(index) = find_exact(&self.dynamic, name, value) {
                out.extend(integer::encode(index as u64, 0x80, 7));
                continue;
            }

            if let Some(name_index) = find_name(&self.dynamic, name) {
                out.extend(integer::encode(name_index as u64, 0x40, 6));
            } else {
                out.push(0x40);
                out.extend(encode_string(name));
            }
            out.extend(encode_string(value));

            self.dynamic.insert(name.clone(), value.clone());
        }

        out
    }
}

fn find_exact(dynamic: &DynamicTable, name: &str, value: &str) -> Option<usize> {
    for (i, &(n, v)) in STATIC_TABLE.iter().enumerate() {
        if n == name && v == value {
            return Some(i + 1);
        }
    }
    for i in 0..dynamic.len() {
        if let Some((n, v)) = dynamic.get(i) {
            if n == name && v == value {
                return Some(STATIC_TABLE.len() + i + 1);
            }
        }
    }
    None
}

fn find_name(dynamic: &DynamicTable, name: &str) -> Option<usize> {
    for (i, &(n, _)) in STATIC_TABLE.iter().enumerate() {
        if n == name {
            return Some(i + 1);
        }
    }
    for i in 0..dynamic.len() {
        if let Some((n, _)) = dynamic.get(i) {
            if n == name {
                return Some(STATIC_TABLE.len() + i + 1);
            }
        }
    }
    None
}

/// Huffman-encodes `s` only when it strictly shortens the literal, per spec
/// §4.2.3's SHOULD.
fn encode_string(s: &str) -> Vec<u8> {
    let raw = s.as_bytes();
    let huff_len = huffman::encoded_len(raw);

    if huff_len < raw.len() {
        let encoded = huffman::encode(raw);
        let mut out = integer::encode(encoded.len() as u64, 0x80, 7);
        out.extend(encoded);
        out
    } else {
        let mut out = integer::encode(raw.len() as u64, 0x00, 7);
        out.extend_from_slice(raw);
        out
    }
}
