//! Chunk planning.
//!
//! Planning is a pure function of the resource size and the policy: no I/O
//! and no shared state.

use super::http::ByteRange;

/// A resource that has been probed and is ready to transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTarget {
    /// Directly fetchable URL.
    pub url: String,
    /// Total size in bytes.
    pub total_size: u64,
    /// Whether the server honours byte ranges.
    pub supports_ranges: bool,
    /// `total_size` is the locator's estimate rather than a probed size.
    pub size_is_approximate: bool,
}

/// One contiguous byte range of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Zero-based position in the plan.
    pub index: usize,
    /// First byte, inclusive.
    pub start: u64,
    /// Last byte, inclusive.
    pub end: u64,
}

impl ChunkDescriptor {
    /// Number of bytes this chunk must deliver.
    pub fn expected_len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// The range to request.
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end)
    }
}

/// Inputs to [`plan_chunks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanPolicy {
    pub max_threads: usize,
    pub preferred_chunk_bytes: u64,
    pub small_file_threshold_bytes: u64,
    pub hard_cap_chunks: usize,
}

/// Number of chunks for a resource of `total_size` bytes.
pub fn chunk_count(total_size: u64, policy: &PlanPolicy) -> usize {
    if total_size == 0 {
        return 0;
    }
    if total_size < policy.small_file_threshold_bytes {
        return 1;
    }

    let by_size = total_size / policy.preferred_chunk_bytes.max(1);
    let wanted = (policy.max_threads as u64).min(by_size);
    let capped = wanted.clamp(1, policy.hard_cap_chunks.max(1) as u64);

    capped as usize
}

/// Split `[0, total_size - 1]` into contiguous chunks.
///
/// Every chunk but the last spans `floor(total_size / count)` bytes; the last
/// one absorbs the remainder. A zero-byte resource yields an empty plan.
pub fn plan_chunks(total_size: u64, policy: &PlanPolicy) -> Vec<ChunkDescriptor> {
    let count = chunk_count(total_size, policy);
    if count == 0 {
        return Vec::new();
    }

    let base = total_size / count as u64;

    (0..count)
        .map(|index| {
            let start = index as u64 * base;
            let end = if index == count - 1 {
                total_size - 1
            } else {
                start + base - 1
            };
            ChunkDescriptor { index, start, end }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn policy(max_threads: usize, preferred: u64) -> PlanPolicy {
        PlanPolicy {
            max_threads,
            preferred_chunk_bytes: preferred,
            small_file_threshold_bytes: 10 * MB,
            hard_cap_chunks: 16,
        }
    }

    #[test]
    fn test_ten_megabytes_four_threads() {
        let chunks = plan_chunks(10_485_760, &policy(4, MB));

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert_eq!(chunk.expected_len(), 2_621_440);
        }
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[3].end, 10_485_759);
    }

    #[test]
    fn test_small_file_is_single_chunk() {
        let chunks = plan_chunks(5 * MB, &policy(8, MB));

        assert_eq!(
            chunks,
            vec![ChunkDescriptor {
                index: 0,
                start: 0,
                end: 5 * MB - 1,
            }]
        );
    }

    #[test]
    fn test_empty_resource_has_no_chunks() {
        assert!(plan_chunks(0, &policy(8, MB)).is_empty());
    }

    #[test]
    fn test_last_chunk_absorbs_remainder() {
        let total = 10 * MB + 3;
        let chunks = plan_chunks(total, &policy(4, MB));

        assert_eq!(chunks.len(), 4);
        let base = total / 4;
        assert_eq!(chunks[0].expected_len(), base);
        assert_eq!(chunks[3].expected_len(), base + total % 4);
        assert_eq!(chunks[3].end, total - 1);
    }

    #[test]
    fn test_hard_cap_limits_count() {
        let chunks = plan_chunks(100 * MB, &policy(64, MB));
        assert_eq!(chunks.len(), 16);
    }

    #[test]
    fn test_preferred_size_limits_count() {
        // 12 MiB at 5 MiB per chunk only warrants 2 chunks
        let chunks = plan_chunks(12 * MB, &policy(8, 5 * MB));
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_preferred_larger_than_file_clamps_to_one() {
        let chunks = plan_chunks(20 * MB, &policy(8, 64 * MB));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end, 20 * MB - 1);
    }

    #[test]
    fn test_descriptor_range() {
        let chunk = ChunkDescriptor {
            index: 2,
            start: 100,
            end: 199,
        };
        assert_eq!(chunk.range(), ByteRange::new(100, 199));
        assert_eq!(chunk.expected_len(), 100);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_plan_covers_resource_exactly(
                total in 1u64..(1u64 << 40),
                max_threads in 0usize..64,
                preferred in 1u64..(64 * MB),
                threshold in 0u64..(32 * MB),
                cap in 1usize..32,
            ) {
                let policy = PlanPolicy {
                    max_threads,
                    preferred_chunk_bytes: preferred,
                    small_file_threshold_bytes: threshold,
                    hard_cap_chunks: cap,
                };
                let chunks = plan_chunks(total, &policy);

                prop_assert!(!chunks.is_empty());
                prop_assert!(chunks.len() <= cap);
                prop_assert_eq!(chunks[0].start, 0);
                prop_assert_eq!(chunks[chunks.len() - 1].end, total - 1);

                for (i, pair) in chunks.windows(2).enumerate() {
                    prop_assert_eq!(pair[0].index, i);
                    prop_assert!(pair[0].start <= pair[0].end);
                    prop_assert_eq!(pair[0].end + 1, pair[1].start);
                }

                let covered: u64 = chunks.iter().map(ChunkDescriptor::expected_len).sum();
                prop_assert_eq!(covered, total);
            }

            #[test]
            fn test_below_threshold_is_one_chunk(
                threshold in 2u64..(64 * MB),
                max_threads in 1usize..32,
            ) {
                let total = threshold - 1;
                let policy = PlanPolicy {
                    max_threads,
                    preferred_chunk_bytes: 1,
                    small_file_threshold_bytes: threshold,
                    hard_cap_chunks: 16,
                };
                let chunks = plan_chunks(total, &policy);

                prop_assert_eq!(chunks.len(), 1);
                prop_assert_eq!(chunks[0].start, 0);
                prop_assert_eq!(chunks[0].end, total - 1);
            }
        }
    }
}
