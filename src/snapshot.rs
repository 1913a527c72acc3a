//! Per-timestep partition structure for temporal networks.
//!
//! A temporal network is observed as a sequence of **snapshots**, one per
//! discrete timestep. An external static detector (modularity optimization,
//! label propagation, connected components, ...) partitions each snapshot
//! into groups; this module turns that raw node-to-label assignment into the
//! derived structure the tracking algorithms operate on:
//!
//! - [`SnapshotPartition`]: the detector's output for one timestep: a
//!   positive group label per present node, absence encoded as "no entry".
//! - [`Group`]: the nodes sharing one label at one timestep, plus the
//!   matching state (persistent color, ranked match candidates).
//! - [`GroupStructure`]: all groups of one timestep, ordered by label.
//! - [`Timeline`]: the validated, contiguous sequence of group structures
//!   over the full time range.
//!
//! Node identities are dense `usize` indices in `0..n_nodes`, stable across
//! the whole range; mapping from host identifiers is the caller's concern.
//! Timesteps form a half-open range `[begin, end)` applied uniformly.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Dense node index, stable across all timesteps.
pub type NodeId = usize;

/// Persistent community identity. `0` is reserved for "absent".
pub type ColorId = u32;

/// Half-open timestep range `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    begin: usize,
    end: usize,
}

impl TimeRange {
    /// Create a range. `end` is exclusive and must exceed `begin`.
    pub fn new(begin: usize, end: usize) -> Result<Self> {
        if end <= begin {
            return Err(Error::InvalidParameter {
                name: "time_range",
                message: "end must be greater than begin",
            });
        }
        Ok(Self { begin, end })
    }

    /// First timestep.
    pub fn begin(&self) -> usize {
        self.begin
    }

    /// One past the last timestep.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// True when the range is empty (never constructed by [`TimeRange::new`]).
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Iterate over the timesteps in order.
    pub fn iter(&self) -> core::ops::Range<usize> {
        self.begin..self.end
    }

    /// Position of `timestep` within the range, if contained.
    pub fn index_of(&self, timestep: usize) -> Option<usize> {
        (self.begin..self.end)
            .contains(&timestep)
            .then(|| timestep - self.begin)
    }
}

/// The external detector's output for one timestep: a positive group label
/// per present node.
///
/// Nodes without an assignment are absent from the snapshot. A label of `0`
/// is rejected at assignment time: the detector reserves `0` for absence, so
/// a present-but-unlabeled node is a data error, not something to paper over.
#[derive(Debug, Clone)]
pub struct SnapshotPartition {
    timestep: usize,
    labels: Vec<u32>,
}

impl SnapshotPartition {
    /// Create an empty partition (all nodes absent) for one timestep.
    pub fn new(timestep: usize, n_nodes: usize) -> Self {
        Self {
            timestep,
            labels: vec![0; n_nodes],
        }
    }

    /// Assign a group label to a node.
    ///
    /// Fails on label `0`, an out-of-range node, or a second assignment for
    /// the same node.
    pub fn assign(&mut self, node: NodeId, label: u32) -> Result<()> {
        if node >= self.labels.len() {
            return Err(Error::NodeOutOfRange {
                node,
                n_nodes: self.labels.len(),
                timestep: self.timestep,
            });
        }
        if label == 0 {
            return Err(Error::UnlabeledNode {
                node,
                timestep: self.timestep,
            });
        }
        if self.labels[node] != 0 {
            return Err(Error::DuplicateAssignment {
                node,
                timestep: self.timestep,
            });
        }
        self.labels[node] = label;
        Ok(())
    }

    /// Build a partition from `(node, label)` pairs. Unlisted nodes are
    /// absent.
    pub fn from_assignments<I>(timestep: usize, n_nodes: usize, assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, u32)>,
    {
        let mut partition = Self::new(timestep, n_nodes);
        for (node, label) in assignments {
            partition.assign(node, label)?;
        }
        Ok(partition)
    }

    /// Build a partition from static-detector output where every node is
    /// present and community ids are 0-based (`labels[node] = community`).
    ///
    /// This is the seam to detectors returning one `usize` per node: ids are
    /// shifted by one so `0` stays reserved for absence.
    pub fn from_detector_labels(timestep: usize, labels: &[usize]) -> Self {
        Self {
            timestep,
            labels: labels.iter().map(|&l| l as u32 + 1).collect(),
        }
    }

    /// Timestep this partition describes.
    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// Declared node count.
    pub fn n_nodes(&self) -> usize {
        self.labels.len()
    }

    /// Label of a node, or `0` if absent.
    pub fn label_of(&self, node: NodeId) -> u32 {
        self.labels.get(node).copied().unwrap_or(0)
    }
}

/// Coordinates of a group within a [`Timeline`]: structure index (position
/// within the range, not the raw timestep) and group index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRef {
    /// Structure index within the timeline (`timestep - range.begin`).
    pub step: usize,
    /// Group index within that structure.
    pub group: usize,
}

/// One ranked match candidate: an earlier group and its Jaccard similarity.
///
/// `source` is `None` for the sentinel recorded when the backward search
/// found nothing; such a group is guaranteed a fresh color.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// The earlier group, or `None` for the no-match sentinel.
    pub source: Option<GroupRef>,
    /// Jaccard similarity to that group (0 for the sentinel).
    pub similarity: f64,
}

/// A set of nodes sharing one detected label at one timestep.
///
/// The matcher assigns each group a persistent color and records its ranked
/// candidate list. The list is immutable once built; consumption is tracked
/// by an explicit cursor rather than by popping, so the similarity phase and
/// the assignment phase share no hidden mutation.
#[derive(Debug, Clone)]
pub struct Group {
    timestep: usize,
    label: u32,
    members: BTreeSet<NodeId>,
    color: Option<ColorId>,
    candidates: Vec<Candidate>,
    cursor: usize,
}

impl Group {
    fn new(timestep: usize, label: u32) -> Self {
        Self {
            timestep,
            label,
            members: BTreeSet::new(),
            color: None,
            candidates: Vec::new(),
            cursor: 0,
        }
    }

    /// Timestep this group belongs to.
    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// Detector label this group was built from.
    pub fn label(&self) -> u32 {
        self.label
    }

    /// Member nodes, in ascending order.
    pub fn members(&self) -> &BTreeSet<NodeId> {
        &self.members
    }

    /// Number of member nodes.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when `node` belongs to this group.
    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    /// Persistent color, once the matcher has assigned one.
    pub fn color(&self) -> Option<ColorId> {
        self.color
    }

    /// Jaccard index of the member sets: `|A ∩ B| / |A ∪ B|`.
    ///
    /// Defined as 0 when both groups are empty.
    pub fn jaccard(&self, other: &Group) -> f64 {
        let intersection = self.members.intersection(&other.members).count();
        let union = self.members.len() + other.members.len() - intersection;
        if union == 0 {
            return 0.0;
        }
        intersection as f64 / union as f64
    }

    pub(crate) fn set_color(&mut self, color: ColorId) {
        self.color = Some(color);
    }

    pub(crate) fn set_candidates(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.cursor = 0;
    }

    /// Candidate the cursor currently points at, if not exhausted.
    pub(crate) fn current_candidate(&self) -> Option<Candidate> {
        self.candidates.get(self.cursor).copied()
    }

    /// Advance the cursor and return the new head, if any.
    pub(crate) fn advance_candidate(&mut self) -> Option<Candidate> {
        self.cursor += 1;
        self.current_candidate()
    }
}

/// All groups present at one timestep, ordered by ascending detector label.
#[derive(Debug, Clone)]
pub struct GroupStructure {
    timestep: usize,
    groups: Vec<Group>,
}

impl GroupStructure {
    /// Build the groups of one timestep from a snapshot partition: nodes
    /// sharing a label become one group.
    pub fn from_partition(partition: &SnapshotPartition) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        for node in 0..partition.n_nodes() {
            let label = partition.label_of(node);
            if label == 0 {
                continue;
            }
            let group = match groups.binary_search_by_key(&label, |g| g.label) {
                Ok(pos) => &mut groups[pos],
                Err(pos) => {
                    groups.insert(pos, Group::new(partition.timestep(), label));
                    &mut groups[pos]
                }
            };
            let _ = group.members.insert(node);
        }
        Self {
            timestep: partition.timestep(),
            groups,
        }
    }

    /// Timestep this structure describes.
    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// Groups in label order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut [Group] {
        &mut self.groups
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when the timestep has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// The validated sequence of group structures over the full time range.
///
/// Snapshots must cover contiguous ascending timesteps and agree on the node
/// count; anything else is rejected up front, there is no partial-input mode.
#[derive(Debug, Clone)]
pub struct Timeline {
    range: TimeRange,
    n_nodes: usize,
    structures: Vec<GroupStructure>,
}

impl Timeline {
    /// Build a timeline from one partition per timestep.
    pub fn from_partitions(partitions: &[SnapshotPartition]) -> Result<Self> {
        let first = partitions.first().ok_or(Error::EmptyInput)?;
        let begin = first.timestep();
        let n_nodes = first.n_nodes();

        let mut structures = Vec::with_capacity(partitions.len());
        for (offset, partition) in partitions.iter().enumerate() {
            let expected = begin + offset;
            if partition.timestep() != expected {
                return Err(Error::NonContiguousTimesteps {
                    expected,
                    found: partition.timestep(),
                });
            }
            if partition.n_nodes() != n_nodes {
                return Err(Error::NodeCountMismatch {
                    expected: n_nodes,
                    found: partition.n_nodes(),
                    timestep: partition.timestep(),
                });
            }
            structures.push(GroupStructure::from_partition(partition));
        }

        Ok(Self {
            range: TimeRange::new(begin, begin + partitions.len())?,
            n_nodes,
            structures,
        })
    }

    /// The covered time range.
    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Node count shared by all snapshots.
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    /// True when the timeline has no timesteps (never produced by
    /// [`Timeline::from_partitions`]).
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Group structures in timestep order.
    pub fn structures(&self) -> &[GroupStructure] {
        &self.structures
    }

    pub(crate) fn structures_mut(&mut self) -> &mut [GroupStructure] {
        &mut self.structures
    }

    /// The group a node belongs to at a structure index, if present.
    pub fn group_of(&self, node: NodeId, step: usize) -> Option<&Group> {
        self.structures
            .get(step)?
            .groups()
            .iter()
            .find(|g| g.contains(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_rejects_zero_label() {
        let mut partition = SnapshotPartition::new(0, 3);
        let err = partition.assign(1, 0).unwrap_err();
        assert_eq!(
            err,
            Error::UnlabeledNode {
                node: 1,
                timestep: 0
            }
        );
    }

    #[test]
    fn test_partition_rejects_out_of_range_node() {
        let mut partition = SnapshotPartition::new(2, 3);
        let err = partition.assign(3, 1).unwrap_err();
        assert_eq!(
            err,
            Error::NodeOutOfRange {
                node: 3,
                n_nodes: 3,
                timestep: 2
            }
        );
    }

    #[test]
    fn test_partition_rejects_duplicate() {
        let mut partition = SnapshotPartition::new(0, 3);
        partition.assign(0, 1).unwrap();
        let err = partition.assign(0, 2).unwrap_err();
        assert_eq!(
            err,
            Error::DuplicateAssignment {
                node: 0,
                timestep: 0
            }
        );
    }

    #[test]
    fn test_detector_labels_shift() {
        let partition = SnapshotPartition::from_detector_labels(0, &[0, 0, 1, 2]);
        assert_eq!(partition.label_of(0), 1);
        assert_eq!(partition.label_of(3), 3);
    }

    #[test]
    fn test_group_structure_from_partition() {
        let partition =
            SnapshotPartition::from_assignments(0, 5, [(0, 2), (1, 1), (2, 2), (4, 1)]).unwrap();
        let structure = GroupStructure::from_partition(&partition);

        assert_eq!(structure.len(), 2);
        // Label order.
        assert_eq!(structure.groups()[0].label(), 1);
        assert_eq!(structure.groups()[1].label(), 2);
        assert!(structure.groups()[0].contains(1));
        assert!(structure.groups()[0].contains(4));
        assert!(structure.groups()[1].contains(0));
        assert!(structure.groups()[1].contains(2));
        // Node 3 is absent.
        assert!(!structure.groups()[0].contains(3));
        assert!(!structure.groups()[1].contains(3));
    }

    #[test]
    fn test_jaccard_bounds() {
        let p0 = SnapshotPartition::from_assignments(0, 4, [(0, 1), (1, 1), (2, 2)]).unwrap();
        let p1 = SnapshotPartition::from_assignments(1, 4, [(0, 1), (1, 1), (3, 2)]).unwrap();
        let s0 = GroupStructure::from_partition(&p0);
        let s1 = GroupStructure::from_partition(&p1);

        let g = &s0.groups()[0];
        let g_prime = &s1.groups()[0];
        let disjoint = &s1.groups()[1];

        assert!((g.jaccard(g_prime) - 1.0).abs() < f64::EPSILON);
        assert!((g.jaccard(g) - 1.0).abs() < f64::EPSILON);
        assert_eq!(g.jaccard(disjoint), 0.0);

        // Empty vs empty is 0 by convention, not a division error.
        let empty = Group::new(0, 9);
        assert_eq!(empty.jaccard(&empty), 0.0);
        assert_eq!(g.jaccard(&empty), 0.0);
    }

    #[test]
    fn test_timeline_rejects_gap() {
        let p0 = SnapshotPartition::from_assignments(0, 2, [(0, 1)]).unwrap();
        let p2 = SnapshotPartition::from_assignments(2, 2, [(0, 1)]).unwrap();
        let err = Timeline::from_partitions(&[p0, p2]).unwrap_err();
        assert_eq!(
            err,
            Error::NonContiguousTimesteps {
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_timeline_rejects_node_count_mismatch() {
        let p0 = SnapshotPartition::from_assignments(0, 2, [(0, 1)]).unwrap();
        let p1 = SnapshotPartition::from_assignments(1, 3, [(0, 1)]).unwrap();
        let err = Timeline::from_partitions(&[p0, p1]).unwrap_err();
        assert_eq!(
            err,
            Error::NodeCountMismatch {
                expected: 2,
                found: 3,
                timestep: 1
            }
        );
    }

    #[test]
    fn test_timeline_rejects_empty() {
        assert_eq!(Timeline::from_partitions(&[]).unwrap_err(), Error::EmptyInput);
    }

    #[test]
    fn test_time_range_index_of() {
        let range = TimeRange::new(3, 7).unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(range.index_of(3), Some(0));
        assert_eq!(range.index_of(6), Some(3));
        assert_eq!(range.index_of(7), None);
        assert_eq!(range.index_of(2), None);
    }
}
