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

use crate::table::NON_PARTITIONED_NAME;

/// File extensions that mark a base (columnar) data file. Anything else —
/// log/delta files in particular — is not indexed by the bloom-filter or
/// column-stats builders.
const BASE_FILE_EXTENSIONS: [&str; 3] = [".parquet", ".orc", ".hfile"];

/// The final component of a slash-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether the given path names a base data file (by extension).
pub fn is_base_file(path: &str) -> bool {
    let name = file_name(path);
    BASE_FILE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Strip the partition prefix from a write-stat path, yielding the bare
/// filename used for index keys.
///
/// For the non-partitioned sentinel the path carries no partition segment;
/// only a leading `/` is dropped. For real partitions the filename starts
/// after `partition.len() + 1` characters (partition plus separator).
pub fn strip_partition_prefix<'a>(partition: &str, path_with_partition: &'a str) -> &'a str {
    let offset = if partition == NON_PARTITIONED_NAME {
        usize::from(path_with_partition.starts_with('/'))
    } else {
        partition.len() + 1
    };
    &path_with_partition[offset.min(path_with_partition.len())..]
}

/// The partition path of `full_path` relative to `base_path`, with leading
/// separators trimmed.
pub fn relative_partition_path(base_path: &str, full_path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    full_path
        .strip_prefix(base)
        .unwrap_or(full_path)
        .trim_start_matches('/')
        .to_string()
}
