//! Cell payload layout.
//!
//! A cell stores as much of its payload as fits under the page kind's
//! local threshold; the remainder spills into an overflow chain whose head
//! pointer immediately follows the local bytes.

use crate::types::PageKind;

/// How a payload is divided between the b-tree page and its overflow chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadSplit {
    /// Bytes stored on the b-tree page
    pub local: u64,
    /// Bytes stored in the overflow chain (0 if there is no chain)
    pub overflow: u64,
}

impl PayloadSplit {
    /// Whether the payload spills into an overflow chain
    pub fn has_overflow(&self) -> bool {
        self.overflow > 0
    }
}

/// Largest payload kept entirely on a page of the given kind.
pub fn max_local(kind: PageKind, usable_size: u32) -> u64 {
    let usable = u64::from(usable_size);
    if kind == PageKind::TableLeaf {
        usable - 35
    } else {
        ((usable - 12) * 64 / 255) - 23
    }
}

/// Smallest number of local bytes kept when a payload overflows.
pub fn min_local(usable_size: u32) -> u64 {
    ((u64::from(usable_size) - 12) * 32 / 255) - 23
}

/// Divide a payload of `payload_len` bytes between page and overflow chain.
pub fn split_payload(kind: PageKind, usable_size: u32, payload_len: u64) -> PayloadSplit {
    let max = max_local(kind, usable_size);
    if payload_len <= max {
        return PayloadSplit {
            local: payload_len,
            overflow: 0,
        };
    }

    let min = min_local(usable_size);
    let surplus = min + (payload_len - min) % (u64::from(usable_size) - 4);
    let local = if surplus <= max { surplus } else { min };

    PayloadSplit {
        local,
        overflow: payload_len - local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_4k() {
        assert_eq!(max_local(PageKind::TableLeaf, 4096), 4061);
        assert_eq!(max_local(PageKind::IndexLeaf, 4096), 1002);
        assert_eq!(max_local(PageKind::IndexInterior, 4096), 1002);
        assert_eq!(min_local(4096), 489);
    }

    #[test]
    fn test_small_payload_is_local() {
        let split = split_payload(PageKind::TableLeaf, 4096, 100);
        assert_eq!(split, PayloadSplit { local: 100, overflow: 0 });
        assert!(!split.has_overflow());

        let split = split_payload(PageKind::TableLeaf, 4096, 4061);
        assert!(!split.has_overflow());
    }

    #[test]
    fn test_table_leaf_surplus_kept_local() {
        // surplus = 489 + (5000 - 489) % 4092 = 908, which fits
        let split = split_payload(PageKind::TableLeaf, 4096, 5000);
        assert_eq!(split, PayloadSplit { local: 908, overflow: 4092 });
    }

    #[test]
    fn test_index_surplus_too_large_falls_back_to_min() {
        // surplus = 489 + 2511 = 3000 > 1002, so only min_local stays on page
        let split = split_payload(PageKind::IndexLeaf, 4096, 3000);
        assert_eq!(split, PayloadSplit { local: 489, overflow: 2511 });
    }

    #[test]
    fn test_partial_last_overflow_page_512() {
        // usable 512: max 477, min 39; 39 + 961 % 508 = 492 > 477
        let split = split_payload(PageKind::TableLeaf, 512, 1000);
        assert_eq!(split, PayloadSplit { local: 39, overflow: 961 });
    }
}
