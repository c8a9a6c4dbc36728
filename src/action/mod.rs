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

//! Action reader: parses completed timeline action blobs into their
//! in-memory shapes. Parsing is purely local; unknown fields are ignored
//! for indexing.

pub mod clean;
pub mod commit;
pub mod rollback;

pub use clean::{CleanMetadata, CleanPartitionMetadata};
pub use commit::{CommitMetadata, RecordStats, WriteStat};
pub use rollback::{RestoreMetadata, RollbackMetadata, RollbackPartitionMetadata};

use crate::error::{MetadataError, MetadataResult};
use crate::timeline::ActionKind;

/// Parsed shape of one timeline action.
#[derive(Debug, Clone)]
pub enum ActionMetadata {
    Commit(CommitMetadata),
    Clean(CleanMetadata),
    Rollback(RollbackMetadata),
    Restore(RestoreMetadata),
}

/// Parse one action blob according to its timeline action kind.
///
/// # Errors
///
/// Returns [`MetadataError::MalformedAction`] when the blob is not valid
/// JSON or a required field is missing, and
/// [`MetadataError::Unsupported`] for action kinds that carry no indexable
/// metadata.
pub fn parse_action(kind: &ActionKind, bytes: &[u8]) -> MetadataResult<ActionMetadata> {
    match kind {
        ActionKind::Commit | ActionKind::DeltaCommit | ActionKind::ReplaceCommit => {
            CommitMetadata::from_json(bytes).map(ActionMetadata::Commit)
        }
        ActionKind::Clean => CleanMetadata::from_json(bytes).map(ActionMetadata::Clean),
        ActionKind::Rollback => RollbackMetadata::from_json(bytes).map(ActionMetadata::Rollback),
        ActionKind::Restore => RestoreMetadata::from_json(bytes).map(ActionMetadata::Restore),
        ActionKind::Unknown(other) => Err(MetadataError::Unsupported(format!(
            "no action metadata for '{}' actions",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dispatches_on_kind() {
        let commit = br#"{"partitionToWriteStats":{}}"#;
        assert!(matches!(
            parse_action(&ActionKind::Commit, commit).unwrap(),
            ActionMetadata::Commit(_)
        ));
        assert!(matches!(
            parse_action(&ActionKind::DeltaCommit, commit).unwrap(),
            ActionMetadata::Commit(_)
        ));

        let clean = br#"{"partitionMetadata":{}}"#;
        assert!(matches!(
            parse_action(&ActionKind::Clean, clean).unwrap(),
            ActionMetadata::Clean(_)
        ));
    }

    #[test]
    fn test_parse_unknown_kind_is_unsupported() {
        let result = parse_action(&ActionKind::Unknown("savepoint".to_string()), b"{}");
        assert!(matches!(result, Err(MetadataError::Unsupported(_))));
    }

    #[test]
    fn test_parse_malformed_blob() {
        let result = parse_action(&ActionKind::Commit, b"{not json");
        match result {
            Err(MetadataError::MalformedAction { action, .. }) => assert_eq!(action, "commit"),
            other => panic!("expected MalformedAction, got {:?}", other),
        }
    }
}
