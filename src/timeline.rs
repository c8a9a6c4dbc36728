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

//! Instants and the timeline capability.
//!
//! The index core never reads timeline files itself; it asks the metadata
//! table's timeline two questions: does a given instant exist, and does a
//! timestamp fall before the retained start of the timeline. Timestamps are
//! opaque lexicographically ordered strings.

use std::fmt;

/// Kind of a timeline action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Commit,
    DeltaCommit,
    Clean,
    Rollback,
    Restore,
    ReplaceCommit,
    Unknown(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Commit => "commit",
            ActionKind::DeltaCommit => "deltacommit",
            ActionKind::Clean => "clean",
            ActionKind::Rollback => "rollback",
            ActionKind::Restore => "restore",
            ActionKind::ReplaceCommit => "replacecommit",
            ActionKind::Unknown(other) => other,
        }
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "commit" => ActionKind::Commit,
            "deltacommit" => ActionKind::DeltaCommit,
            "clean" => ActionKind::Clean,
            "rollback" => ActionKind::Rollback,
            "restore" => ActionKind::Restore,
            "replacecommit" => ActionKind::ReplaceCommit,
            other => ActionKind::Unknown(other.to_string()),
        }
    }
}

/// State of a timeline action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstantState {
    Requested,
    Inflight,
    Completed,
}

/// A single entry of the timeline: an action at a timestamp in a state.
///
/// Instants are totally ordered by their timestamp string; two instants
/// with the same timestamp compare by action and state only for equality
/// purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instant {
    pub action: ActionKind,
    pub timestamp: String,
    pub state: InstantState,
}

impl Instant {
    pub fn new(action: ActionKind, timestamp: impl Into<String>, state: InstantState) -> Self {
        Self {
            action,
            timestamp: timestamp.into(),
            state,
        }
    }

    /// A completed instant, the common case when probing the timeline.
    pub fn completed(action: ActionKind, timestamp: impl Into<String>) -> Self {
        Self::new(action, timestamp, InstantState::Completed)
    }

    /// Whether this instant's timestamp is strictly after the given one.
    pub fn is_after(&self, timestamp: &str) -> bool {
        self.timestamp.as_str() > timestamp
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}__{}]", self.timestamp, self.action.as_str())
    }
}

/// Read-only view of the metadata table's timeline.
pub trait Timeline: Send + Sync {
    /// Whether the given instant has been completed on this timeline.
    fn contains_instant(&self, instant: &Instant) -> bool;

    /// Whether the timestamp falls before the earliest retained instant
    /// (i.e. the instant has been archived away).
    fn is_before_timeline_start(&self, timestamp: &str) -> bool;
}
