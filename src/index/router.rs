// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Record router: assigns records to file groups of their metadata-table
//! partition using a hash that must stay bit-stable across platforms and
//! releases.

use crate::index::record::{MetadataPartitionType, MetadataRecord};
use crate::index::RecordsGenerationParams;
use std::collections::BTreeMap;

/// Map a record key to a file group index.
///
/// The hash is the 32-bit polynomial `h = 31*h + byte` over the UTF-8
/// bytes of the key, folded by `|h| mod num_file_groups`. It is defined
/// here rather than delegated to any library hash so the mapping never
/// shifts underneath persisted file groups.
pub fn map_record_key_to_file_group_index(record_key: &str, num_file_groups: usize) -> usize {
    let mut h: i32 = 0;
    for byte in record_key.bytes() {
        h = h.wrapping_mul(31).wrapping_add(i32::from(byte));
    }

    (h.wrapping_abs().wrapping_rem(num_file_groups as i32)).wrapping_abs() as usize
}

/// Number of file groups for a metadata-table partition.
///
/// Once the partition is bootstrapped the layout is fixed by the existing
/// file slices; before that, the configured counts apply (the files
/// partition always has a single group).
pub fn partition_file_group_count(
    partition_type: MetadataPartitionType,
    latest_file_slice_count: Option<usize>,
    params: &RecordsGenerationParams,
) -> usize {
    if let Some(count) = latest_file_slice_count {
        return count.max(1);
    }

    match partition_type {
        MetadataPartitionType::BloomFilters => params.bloom_filter_file_group_count,
        MetadataPartitionType::ColumnStats => params.column_stats_file_group_count,
        MetadataPartitionType::Files => 1,
    }
}

/// Group records by their file group index within one metadata-table
/// partition.
pub fn group_by_file_group(
    records: Vec<MetadataRecord>,
    num_file_groups: usize,
) -> BTreeMap<usize, Vec<MetadataRecord>> {
    let mut groups: BTreeMap<usize, Vec<MetadataRecord>> = BTreeMap::new();
    for record in records {
        let index = map_record_key_to_file_group_index(&record.key(), num_file_groups);
        groups.entry(index).or_default().push(record);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_hash_is_stable() {
        // Pinned values; a change here means persisted file-group
        // assignments would move.
        assert_eq!(map_record_key_to_file_group_index("", 4), 0);
        assert_eq!(map_record_key_to_file_group_index("p1", 1), 0);

        let key = "P\u{0}x.parquet";
        assert_eq!(map_record_key_to_file_group_index(key, 4), 2);
        assert_eq!(map_record_key_to_file_group_index(key, 10), 4);
    }

    #[test]
    fn test_hash_matches_reference_values() {
        // h("a") = 97
        assert_eq!(map_record_key_to_file_group_index("a", 10), 7);
        // h("ab") = 31*97 + 98 = 3105
        assert_eq!(map_record_key_to_file_group_index("ab", 100), 5);
        // Multi-byte UTF-8 hashes over bytes, not code points
        assert_eq!(
            map_record_key_to_file_group_index("é", 1_000_000),
            31 * 195 + 169
        );
    }

    #[test]
    fn test_hash_overflow_stays_in_range() {
        let long_key = "p".repeat(4096);
        for groups in [1, 2, 7, 64] {
            let index = map_record_key_to_file_group_index(&long_key, groups);
            assert!(index < groups);
        }
    }

    #[test]
    fn test_file_group_count_prefers_existing_slices() {
        let params = RecordsGenerationParams::default();
        assert_eq!(
            partition_file_group_count(MetadataPartitionType::BloomFilters, Some(7), &params),
            7
        );
        assert_eq!(
            partition_file_group_count(MetadataPartitionType::ColumnStats, Some(0), &params),
            1
        );
    }

    #[test]
    fn test_file_group_count_from_config() {
        let params = RecordsGenerationParams {
            bloom_filter_file_group_count: 4,
            column_stats_file_group_count: 2,
            ..Default::default()
        };
        assert_eq!(
            partition_file_group_count(MetadataPartitionType::BloomFilters, None, &params),
            4
        );
        assert_eq!(
            partition_file_group_count(MetadataPartitionType::ColumnStats, None, &params),
            2
        );
        assert_eq!(
            partition_file_group_count(MetadataPartitionType::Files, None, &params),
            1
        );
    }

    #[test]
    fn test_group_by_file_group_routes_every_record() {
        let records = vec![
            MetadataRecord::partition_files("p1", None, None),
            MetadataRecord::partition_files("p2", None, None),
            MetadataRecord::bloom_filter("p1", "f1.parquet", "t1", "dynamic", Bytes::new()),
        ];
        let groups = group_by_file_group(records, 3);
        let total: usize = groups.values().map(Vec::len).sum();
        assert_eq!(total, 3);
        assert!(groups.keys().all(|g| *g < 3));
    }
}
