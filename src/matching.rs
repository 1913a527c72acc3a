//! Temporal group matching: persistent identities for per-timestep groups.
//!
//! A static detector partitions every snapshot independently, so its group
//! labels carry no meaning across time. The matcher links groups between
//! timesteps into persistent communities ("colors") by set overlap.
//!
//! ## The Algorithm
//!
//! Two phases over the timeline:
//!
//! 1. **Similarity**: for each group at timestep t, compute the Jaccard
//!    index against every group at t-1. If nothing reaches the similarity
//!    threshold, widen the search one timestep at a time (t-2, t-3, ...)
//!    until a candidate appears or the lookback window is exhausted. All
//!    qualifying candidates are kept, ranked by descending similarity.
//!
//! 2. **Assignment**: the first timestep's groups each get a fresh color.
//!    Every later timestep is resolved greedily: a max-heap is seeded with
//!    each group's best candidate, and the globally most similar pair is
//!    matched first. A group whose best candidate's color was already taken
//!    this timestep falls back to its next candidate; a group that runs out
//!    of candidates gets a fresh color. Within a timestep no color is ever
//!    assigned twice.
//!
//! Greedy highest-similarity-first assignment approximates a maximum-weight
//! matching between lookback-linked partitions without an exact bipartite
//! solver: strong matches win first, and a group whose overlap with the past
//! is weak everywhere is treated as a new community.
//!
//! Determinism: candidate lists are ranked by similarity descending with
//! ties broken by earlier-group index ascending; the per-timestep heap
//! orders by similarity descending with ties broken by group index
//! ascending. Identical input always yields identical colors.
//!
//! ## References
//!
//! - Greene, Doyle, Cunningham (2010). "Tracking the evolution of
//!   communities in dynamic social networks." ASONAM 2010.
//! - Tantipathananandh, Berger-Wolf, Kempe (2007). "A framework for
//!   community identification in dynamic social networks." KDD 2007.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashSet};

use ndarray::Array2;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::snapshot::{
    Candidate, ColorId, Group, GroupRef, GroupStructure, NodeId, TimeRange, Timeline,
};

/// Matches groups across timesteps into persistent communities.
#[derive(Debug, Clone)]
pub struct GroupMatcher {
    /// Number of earlier timesteps to search before giving up.
    lookback: usize,
    /// Minimum Jaccard index for a match candidate.
    threshold: f64,
}

impl GroupMatcher {
    /// Create a matcher with the default window (1 timestep) and threshold
    /// (0.4).
    pub fn new() -> Self {
        Self {
            lookback: 1,
            threshold: 0.4,
        }
    }

    /// Set the lookback window. Must be at least 1.
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Set the similarity threshold. Must lie in `[0, 1]`.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.lookback < 1 {
            return Err(Error::InvalidParameter {
                name: "lookback",
                message: "must be at least 1",
            });
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidParameter {
                name: "threshold",
                message: "must lie in [0, 1]",
            });
        }
        Ok(())
    }

    /// Assign a persistent color to every group in the timeline.
    ///
    /// Mutates the timeline's groups (color and candidate state) and returns
    /// the resulting per-node color matrix.
    pub fn run(&self, timeline: &mut Timeline) -> Result<GroupColors> {
        self.validate()?;

        self.collect_candidates(timeline);
        let (colors, highest_color) = self.assign_colors(timeline);

        debug!(
            timesteps = timeline.len(),
            highest_color, "group matching complete"
        );

        Ok(GroupColors {
            range: timeline.range(),
            colors,
            highest_color,
        })
    }

    /// Phase 1: build each group's ranked candidate list.
    fn collect_candidates(&self, timeline: &mut Timeline) {
        let steps = timeline.len();
        for step in 1..steps {
            let (earlier, current) = timeline.structures_mut().split_at_mut(step);
            let structure = &mut current[0];
            for group_index in 0..structure.len() {
                let candidates = self.candidates_for(&structure.groups()[group_index], earlier, step);
                trace!(
                    step,
                    group_index,
                    n_candidates = candidates.len(),
                    "ranked candidates"
                );
                structure.groups_mut()[group_index].set_candidates(candidates);
            }
        }
    }

    /// Scan backward from `step - 1`, widening only while nothing qualified.
    fn candidates_for(
        &self,
        group: &Group,
        earlier: &[GroupStructure],
        step: usize,
    ) -> Vec<Candidate> {
        let floor = step.saturating_sub(self.lookback);
        let mut candidates = Vec::new();

        for earlier_step in (floor..step).rev() {
            for (earlier_index, earlier_group) in earlier[earlier_step].groups().iter().enumerate()
            {
                let similarity = group.jaccard(earlier_group);
                if similarity >= self.threshold {
                    candidates.push(Candidate {
                        source: Some(GroupRef {
                            step: earlier_step,
                            group: earlier_index,
                        }),
                        similarity,
                    });
                }
            }
            if !candidates.is_empty() {
                break;
            }
        }

        if candidates.is_empty() {
            // No overlap anywhere in the window: the sentinel guarantees a
            // fresh color during assignment.
            candidates.push(Candidate {
                source: None,
                similarity: 0.0,
            });
        } else {
            candidates.sort_by(|a, b| {
                b.similarity
                    .total_cmp(&a.similarity)
                    .then_with(|| source_index(a).cmp(&source_index(b)))
            });
        }

        candidates
    }

    /// Phase 2: greedy per-timestep color assignment.
    fn assign_colors(&self, timeline: &mut Timeline) -> (Array2<ColorId>, ColorId) {
        let n_nodes = timeline.n_nodes();
        let steps = timeline.len();
        let mut colors = Array2::<ColorId>::zeros((n_nodes, steps));
        let mut next_color: ColorId = 1;

        // First timestep: every group is a new community.
        let first = &mut timeline.structures_mut()[0];
        for group in first.groups_mut() {
            group.set_color(next_color);
            stamp(&mut colors, 0, group.members(), next_color);
            next_color += 1;
        }

        for step in 1..steps {
            let (earlier, current) = timeline.structures_mut().split_at_mut(step);
            let structure = &mut current[0];
            let n_groups = structure.len();

            let mut claimed: HashSet<ColorId> = HashSet::new();
            let mut uncolored: Vec<bool> = vec![true; n_groups];

            let mut heap: BinaryHeap<HeapEntry> = (0..n_groups)
                .filter_map(|group_index| {
                    structure.groups()[group_index]
                        .current_candidate()
                        .map(|c| HeapEntry {
                            similarity: c.similarity,
                            group_index,
                        })
                })
                .collect();

            while let Some(entry) = heap.pop() {
                let group_index = entry.group_index;
                if !uncolored[group_index] {
                    continue;
                }
                let candidate = match structure.groups()[group_index].current_candidate() {
                    Some(c) => c,
                    None => continue,
                };

                match candidate.source {
                    Some(source) => {
                        // The referenced group was colored in an earlier pass.
                        let previous_color = earlier[source.step].groups()[source.group]
                            .color()
                            .unwrap_or(0);
                        if claimed.contains(&previous_color) {
                            // Color taken this timestep: fall back to the
                            // next-best candidate, or give up and mint.
                            match structure.groups_mut()[group_index].advance_candidate() {
                                Some(next) => heap.push(HeapEntry {
                                    similarity: next.similarity,
                                    group_index,
                                }),
                                None => {
                                    self.mint(
                                        structure,
                                        group_index,
                                        &mut colors,
                                        step,
                                        &mut next_color,
                                        &mut uncolored,
                                    );
                                }
                            }
                        } else {
                            let group = &mut structure.groups_mut()[group_index];
                            group.set_color(previous_color);
                            stamp(&mut colors, step, group.members(), previous_color);
                            let _ = claimed.insert(previous_color);
                            uncolored[group_index] = false;
                        }
                    }
                    None => {
                        self.mint(
                            structure,
                            group_index,
                            &mut colors,
                            step,
                            &mut next_color,
                            &mut uncolored,
                        );
                    }
                }
            }

            // Safety net: should not occur, but no group may stay uncolored.
            for group_index in 0..n_groups {
                if uncolored[group_index] {
                    self.mint(
                        structure,
                        group_index,
                        &mut colors,
                        step,
                        &mut next_color,
                        &mut uncolored,
                    );
                }
            }
        }

        (colors, next_color - 1)
    }

    fn mint(
        &self,
        structure: &mut GroupStructure,
        group_index: usize,
        colors: &mut Array2<ColorId>,
        step: usize,
        next_color: &mut ColorId,
        uncolored: &mut [bool],
    ) {
        let group = &mut structure.groups_mut()[group_index];
        group.set_color(*next_color);
        stamp(colors, step, group.members(), *next_color);
        uncolored[group_index] = false;
        trace!(step, group_index, color = *next_color, "fresh color");
        *next_color += 1;
    }
}

impl Default for GroupMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn stamp(colors: &mut Array2<ColorId>, step: usize, members: &BTreeSet<NodeId>, color: ColorId) {
    for &node in members {
        colors[[node, step]] = color;
    }
}

fn source_index(candidate: &Candidate) -> usize {
    candidate.source.map(|s| s.group).unwrap_or(usize::MAX)
}

/// Heap entry for the per-timestep assignment pass. Higher similarity wins;
/// ties fall to the lower group index.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    similarity: f64,
    group_index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.similarity
            .total_cmp(&other.similarity)
            .then_with(|| other.group_index.cmp(&self.group_index))
    }
}

/// Per-node persistent colors over the full range, as assigned by the
/// matcher: entry `(node, step)` is the color of the node's group at that
/// timestep, or `0` when the node is absent.
#[derive(Debug, Clone)]
pub struct GroupColors {
    range: TimeRange,
    colors: Array2<ColorId>,
    highest_color: ColorId,
}

impl GroupColors {
    /// Wrap an externally produced color matrix.
    ///
    /// The matrix must have one column per timestep of `range`, and
    /// `highest_color` must cover every color it contains.
    pub fn from_matrix(
        range: TimeRange,
        colors: Array2<ColorId>,
        highest_color: ColorId,
    ) -> Result<Self> {
        if colors.ncols() != range.len() {
            return Err(Error::InvalidParameter {
                name: "colors",
                message: "matrix width must equal the time range length",
            });
        }
        if colors.iter().any(|&c| c > highest_color) {
            return Err(Error::InvalidParameter {
                name: "highest_color",
                message: "must be at least the largest color in the matrix",
            });
        }
        Ok(Self {
            range,
            colors,
            highest_color,
        })
    }

    /// The covered time range.
    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Node count.
    pub fn n_nodes(&self) -> usize {
        self.colors.nrows()
    }

    /// Number of timesteps.
    pub fn n_steps(&self) -> usize {
        self.colors.ncols()
    }

    /// The full `nodes × timesteps` color matrix.
    pub fn matrix(&self) -> &Array2<ColorId> {
        &self.colors
    }

    /// One node's color sequence.
    pub fn row(&self, node: NodeId) -> ndarray::ArrayView1<'_, ColorId> {
        self.colors.row(node)
    }

    /// Color of a node's group at a structure index.
    pub fn color(&self, node: NodeId, step: usize) -> ColorId {
        self.colors[[node, step]]
    }

    /// Highest color allocated so far; fresh colors continue above it.
    pub fn highest_color(&self) -> ColorId {
        self.highest_color
    }
}
