//! Static and dynamic header tables (spec §4.2.1, §3 `HpackDynamicTable`).

/// RFC 7541 Appendix A: the fixed 61-entry static table, index 1..=61.
pub static STATIC_TABLE: [(&str, &str); 61] = [
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

/// Per-entry overhead, spec §3: `32 + len(name) + len(value)`.
pub fn entry_size(name: &str, value: &str) -> usize {
    32 + name.len() + value.len()
}

/// Size-bounded FIFO of decoded/encoded (name, value) pairs. Newest entry is
/// logically index 62 (just after the 61 static entries); insertion prepends,
/// eviction removes from the tail, maintaining `total_size <= max_size`.
#[derive(Debug, Default)]
pub struct DynamicTable {
    entries: std::collections::VecDeque<(String, String)>,
    total_size: usize,
    max_size: usize,
}

impl DynamicTable {
    pub fn new(max_size: usize) -> Self {
        DynamicTable {
            entries: std::collections::VecDeque::new(),
            total_size: 0,
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Index `i` is 0-based, newest-first (entry 0 == wire index 62).
    pub fn get(&self, i: usize) -> Option<(&str, &str)> {
        self.entries
            .get(i)
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn insert(&mut self, name: String, value: String) {
        self.total_size += entry_size(&name, &value);
        self.entries.push_front((name, value));
        self.evict();
    }

    /// Peer (via SETTINGS_HEADER_TABLE_SIZE) or a dynamic-table-size-update
    /// representation asserts a new upper bound; evict down to it.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict();
    }

    fn evict(&mut self) {
        while self.total_size > self.max_size {
            match self.entries.pop_back() {
                Some((n, v)) => self.total_size -= entry_size(&n, &v),
                None => break,
            }
        }
    }
}
