//! # Data Model
//!
//! Core value types for the split/join pipeline: posting lists, work units,
//! container identifiers, and the record shapes flowing through the
//! link-back join.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact identifier for clusters produced by the upstream MST step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// One entry of a posting list: a group and its term weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupWeight {
    /// The group this weight belongs to
    pub group_id: String,
    /// Term weight (e.g., tf-idf) of the group for the owning term
    pub weight: f64,
}

impl GroupWeight {
    /// Create a new group/weight pair
    pub fn new(group_id: impl Into<String>, weight: f64) -> Self {
        Self {
            group_id: group_id.into(),
            weight,
        }
    }

    /// Parse a single `group=weight` token. Returns `None` if the token is
    /// missing the delimiter or carries a non-numeric weight.
    pub fn parse(raw: &str) -> Option<Self> {
        let (group_id, weight) = raw.split_once('=')?;
        if group_id.is_empty() {
            return None;
        }
        let weight = weight.parse::<f64>().ok()?;
        Some(Self::new(group_id, weight))
    }
}

impl fmt::Display for GroupWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.group_id, self.weight)
    }
}

/// A posting list for one term: the ordered groups the term occurs in.
///
/// Produced by the upstream inverted-index stage; immutable input to the
/// splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingEntry {
    /// The indexed term
    pub term: String,
    /// The groups the term occurs in, with weights, in index order
    pub postings: Vec<GroupWeight>,
}

impl PostingEntry {
    /// Create a new posting entry
    pub fn new(term: impl Into<String>, postings: Vec<GroupWeight>) -> Self {
        Self {
            term: term.into(),
            postings,
        }
    }

    /// Parse the comma-delimited `group=weight,...` wire form of a posting
    /// list. Malformed tokens are dropped; the caller observes the drop
    /// count for diagnostics.
    pub fn parse_list(raw: &str) -> (Vec<GroupWeight>, usize) {
        let mut postings = Vec::new();
        let mut malformed = 0usize;
        for token in raw.split(',') {
            if token.is_empty() {
                continue;
            }
            match GroupWeight::parse(token) {
                Some(entry) => postings.push(entry),
                None => malformed += 1,
            }
        }
        (postings, malformed)
    }

    /// Number of postings in the list
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

/// Whether a container holds a short unsplit list or a slice of a long one.
///
/// Keeping the two sequence streams disjoint spreads short self-join work
/// across different shards than split work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerClass {
    /// A threshold-bounded list sent whole to one container
    Small,
    /// A segment (or segment pair) of an oversized list
    Big,
}

impl ContainerClass {
    fn as_bit(self) -> u64 {
        match self {
            ContainerClass::Small => 0,
            ContainerClass::Big => 1,
        }
    }

    fn from_bit(bit: u64) -> Self {
        if bit == 0 {
            ContainerClass::Small
        } else {
            ContainerClass::Big
        }
    }
}

/// Identifier of one comparison container, namespaced by the producing task.
///
/// Encodes task identity, class, and sequence in a single 64-bit value:
/// `(task_id << 48) | (class << 32) | seq`. Namespacing by `task_id` keeps
/// containers allocated by independently-counting parallel splitter tasks
/// from colliding on the same shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId {
    /// The splitter task that allocated this container
    pub task_id: u16,
    /// Small (unsplit) or big (split) container stream
    pub class: ContainerClass,
    /// Sequence number within the task's class stream
    pub seq: u32,
}

impl ContainerId {
    /// Create a new container ID
    pub fn new(task_id: u16, class: ContainerClass, seq: u32) -> Self {
        Self {
            task_id,
            class,
            seq,
        }
    }

    /// Encode as a 64-bit integer for keying and comparison
    pub fn to_u64(&self) -> u64 {
        ((self.task_id as u64) << 48) | (self.class.as_bit() << 32) | (self.seq as u64)
    }

    /// Decode from a 64-bit integer
    pub fn from_u64(value: u64) -> Self {
        Self {
            task_id: ((value >> 48) & 0xFFFF) as u16,
            class: ContainerClass::from_bit((value >> 32) & 0x1),
            seq: (value & 0xFFFF_FFFF) as u32,
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            ContainerClass::Small => 'S',
            ContainerClass::Big => 'B',
        };
        write!(f, "K{}.{}{}", self.task_id, class, self.seq)
    }
}

/// Processing mode of a work unit's comparison task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentRole {
    /// All-pairs comparison within one segment
    SelfJoin,
    /// Every element of one segment against every element of another
    Cross,
}

impl SegmentRole {
    /// Numeric tag carried in the composite key
    pub fn as_tag(self) -> u8 {
        match self {
            SegmentRole::SelfJoin => 0,
            SegmentRole::Cross => 1,
        }
    }
}

/// Delimiter separating the two segments of a cross-join unit on the wire.
pub const CROSS_DELIMITER: char = '#';

/// One bounded comparison work unit emitted by the splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkUnit {
    /// Compare all pairs within this list
    SelfJoin(Vec<GroupWeight>),
    /// Compare every element of `left` against every element of `right`
    Cross {
        left: Vec<GroupWeight>,
        right: Vec<GroupWeight>,
    },
}

impl WorkUnit {
    /// Processing mode of this unit
    pub fn role(&self) -> SegmentRole {
        match self {
            WorkUnit::SelfJoin(_) => SegmentRole::SelfJoin,
            WorkUnit::Cross { .. } => SegmentRole::Cross,
        }
    }

    /// Total number of posting entries carried by this unit
    pub fn len(&self) -> usize {
        match self {
            WorkUnit::SelfJoin(entries) => entries.len(),
            WorkUnit::Cross { left, right } => left.len() + right.len(),
        }
    }

    /// Whether the unit carries no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pairwise comparisons this unit requires
    pub fn comparisons(&self) -> usize {
        match self {
            WorkUnit::SelfJoin(entries) => entries.len() * entries.len().saturating_sub(1) / 2,
            WorkUnit::Cross { left, right } => left.len() * right.len(),
        }
    }

    /// Serialize to the comma-delimited wire form, with cross-join segments
    /// separated by [`CROSS_DELIMITER`].
    pub fn to_wire(&self) -> String {
        fn join(entries: &[GroupWeight]) -> String {
            entries
                .iter()
                .map(|entry| entry.to_string())
                .collect::<Vec<_>>()
                .join(",")
        }
        match self {
            WorkUnit::SelfJoin(entries) => join(entries),
            WorkUnit::Cross { left, right } => {
                format!("{}{}{}", join(left), CROSS_DELIMITER, join(right))
            }
        }
    }
}

/// The "one" side of the link-back join: a cluster assignment for a group.
///
/// At most one assignment exists per group; the merge reducer depends on
/// this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub group_id: String,
    pub cluster_id: ClusterId,
}

impl AssignmentRecord {
    /// Create a new assignment record
    pub fn new(group_id: impl Into<String>, cluster_id: ClusterId) -> Self {
        Self {
            group_id: group_id.into(),
            cluster_id,
        }
    }
}

/// The "many" side of the link-back join: entry metadata keyed by group.
///
/// Wire shape: `entry@@field::meta1##meta2`, where everything before the
/// first `::` identifies the entry and the remainder is retained metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRecord {
    pub group_id: String,
    /// The entry identifier portion (before the first `::`)
    pub entry: String,
    /// Retained metadata fields (after the first `::`, split on `##`)
    pub metadata: Vec<String>,
}

impl PayloadRecord {
    /// Create a new payload record
    pub fn new(
        group_id: impl Into<String>,
        entry: impl Into<String>,
        metadata: Vec<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            entry: entry.into(),
            metadata,
        }
    }

    /// Serialize the value portion back to its wire form
    pub fn to_wire(&self) -> String {
        if self.metadata.is_empty() {
            self.entry.clone()
        } else {
            format!("{}::{}", self.entry, self.metadata.join("##"))
        }
    }

    /// Parse the wire form of the value portion
    pub fn parse_value(group_id: impl Into<String>, raw: &str) -> Self {
        match raw.split_once("::") {
            Some((entry, rest)) => Self::new(
                group_id,
                entry,
                rest.split("##").map(str::to_string).collect(),
            ),
            None => Self::new(group_id, raw, Vec::new()),
        }
    }
}

/// One joined output record: a cluster attached to an entry's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedOutput {
    pub cluster_id: ClusterId,
    /// The entry identifier text the cluster was attached to
    pub text: String,
}

impl JoinedOutput {
    /// Create a new joined output record
    pub fn new(cluster_id: ClusterId, text: impl Into<String>) -> Self {
        Self {
            cluster_id,
            text: text.into(),
        }
    }
}

impl fmt::Display for JoinedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.cluster_id.0, self.text)
    }
}
