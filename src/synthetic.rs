//! Generated datasets for benchmarks and scaling checks
//!
//! Intervals are spread evenly over the IPv4 space so that datasets of
//! different sizes can be compared at the same occupancy (share of the
//! address space covered).

use crate::address::Address;
use crate::index::RangeIndex;
use crate::record::IntervalRecord;

const LABELS: [&str; 8] = ["AU", "BR", "CN", "DE", "FR", "JP", "US", "ZA"];

const V4_SPACE: u64 = 1 << 32;

/// `count` disjoint IPv4 intervals covering roughly `occupancy` (0.0..=1.0)
/// of the address space, in ascending order
pub fn ipv4_intervals(count: usize, occupancy: f64) -> Vec<IntervalRecord> {
    let Some((count, stride, width)) = layout(count, occupancy) else {
        return Vec::new();
    };

    (0..count)
        .filter_map(|i| {
            let start = i * stride;
            let end = start + width - 1;
            IntervalRecord::new(
                Address::v4(start as u32),
                Address::v4(end as u32),
                LABELS[i as usize % LABELS.len()],
            )
            .ok()
        })
        .collect()
}

/// Interval count, stride and width, all in u64 so the full IPv4 space
/// fits on 32-bit targets too
fn layout(count: usize, occupancy: f64) -> Option<(u64, u64, u64)> {
    if count == 0 {
        return None;
    }
    let count = (count as u64).min(V4_SPACE);
    let stride = V4_SPACE / count;
    let width = ((stride as f64 * occupancy.clamp(0.0, 1.0)) as u64).clamp(1, stride);
    Some((count, stride, width))
}

/// Deterministic, well spread IPv4 query addresses
pub fn ipv4_queries(count: usize) -> Vec<Address> {
    // Multiplying by an odd constant permutes the 32-bit space
    (0..count as u32)
        .map(|i| Address::v4(i.wrapping_mul(0x9E37_79B9)))
        .collect()
}

/// Mean binary search steps for `queries` against a built index
pub fn average_steps(index: &RangeIndex, queries: &[Address]) -> f64 {
    if queries.is_empty() {
        return 0.0;
    }
    let total: u64 = queries
        .iter()
        .filter_map(|q| index.locate(q).ok())
        .map(|probe| probe.steps as u64)
        .sum();
    total as f64 / queries.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervals_are_disjoint_and_sorted() {
        let records = ipv4_intervals(1000, 0.5);
        assert_eq!(records.len(), 1000);
        assert!(records.windows(2).all(|w| w[0].end() < w[1].start()));
        assert!(RangeIndex::from_records(records).is_ok());
    }

    #[test]
    fn test_occupancy_is_respected() {
        let index = RangeIndex::from_records(ipv4_intervals(100, 0.25)).unwrap();
        let covered = index.stats().unwrap().v4_addresses_covered as f64;
        let share = covered / V4_SPACE as f64;
        assert!((share - 0.25).abs() < 0.01, "share was {share}");
    }

    #[test]
    fn test_full_occupancy_tiles_space() {
        let records = ipv4_intervals(4, 1.0);
        assert_eq!(records[0].start(), 0);
        assert_eq!(records[3].end(), u32::MAX as u128);
        assert!(records.windows(2).all(|w| w[0].end() + 1 == w[1].start()));
    }

    #[test]
    fn test_edge_inputs() {
        assert!(ipv4_intervals(0, 0.5).is_empty());
        // Zero occupancy still yields single-address intervals
        let records = ipv4_intervals(10, 0.0);
        assert!(records.iter().all(|r| r.span() == 1));
        assert_eq!(ipv4_queries(3).len(), 3);
    }

    #[test]
    fn test_layout_clamps_to_ipv4_space() {
        assert_eq!(layout(0, 0.5), None);
        assert_eq!(layout(4, 0.5), Some((4, 1 << 30, 1 << 29)));
        // More intervals than addresses: one address each, stride never zero
        let (count, stride, width) = layout(usize::MAX, 0.5).unwrap();
        assert_eq!((stride, width), (1, 1));
        assert!(count <= V4_SPACE);
    }
}
