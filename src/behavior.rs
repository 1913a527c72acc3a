//! Behavioral sub-communities: nodes with identical temporal behavior.
//!
//! The cost model suits social networks, where individual nodes drift
//! between communities. In other settings (protein complexes across
//! experimental conditions, for instance) the interesting signal is the
//! opposite: sets of nodes that move **together**. This module groups nodes
//! whose group-color sequences are byte-identical across the whole range and
//! splits them into two kinds:
//!
//! - **stable**: the shared sequence never changes: the nodes sit in one
//!   persistent community for the entire run. The community keeps that
//!   color.
//! - **mobile**: the shared sequence varies, but the nodes vary in perfect
//!   sync: a sub-community migrating between detected groups as a unit.
//!   Each mobile community is minted a fresh color, stamped over its
//!   members' entire reported sequences, so the joint migration reads as
//!   one identity.
//!
//! Matching is exact-equality on whole sequences, merged transitively by
//! membership lookup; the pairwise scan is O(nodes² × average community
//! size), acceptable at the node counts host networks supply. A node
//! matching no other node belongs to no extracted community and keeps its
//! group-derived sequence.

use std::collections::BTreeSet;

use ndarray::Array2;
use tracing::debug;

use crate::error::Result;
use crate::matching::GroupColors;
use crate::snapshot::{ColorId, NodeId};

/// Which kind of behavioral community a node set forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityKind {
    /// Members share one unchanging community across the whole range.
    Stable,
    /// Members migrate between communities in perfect synchrony.
    Mobile,
}

/// A maximal set of nodes with pairwise identical group-color sequences.
#[derive(Debug, Clone)]
pub struct BehavioralCommunity {
    kind: CommunityKind,
    color: ColorId,
    members: BTreeSet<NodeId>,
}

impl BehavioralCommunity {
    /// Stable or mobile.
    pub fn kind(&self) -> CommunityKind {
        self.kind
    }

    /// The community's color: the retained original color for stable
    /// communities, a freshly minted one for mobile communities.
    pub fn color(&self) -> ColorId {
        self.color
    }

    /// Member nodes in ascending order.
    pub fn members(&self) -> &BTreeSet<NodeId> {
        &self.members
    }

    /// Number of member nodes.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the community has no members (extraction always produces
    /// at least two).
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when `node` belongs to this community.
    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }
}

/// Aggregate counts describing the extracted structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubcommunityDiagnostics {
    /// Number of stable communities.
    pub stable_communities: usize,
    /// Number of mobile communities.
    pub mobile_communities: usize,
    /// Nodes belonging to stable communities.
    pub stable_nodes: usize,
    /// Nodes belonging to mobile communities.
    pub mobile_nodes: usize,
    /// Mobile communities strictly larger than the size filter.
    pub mobile_above_min: usize,
    /// Nodes in those above-filter mobile communities.
    pub mobile_nodes_above_min: usize,
    /// Mean size of above-filter mobile communities (0 when there are none).
    pub mean_mobile_size_above_min: f64,
    /// Nodes whose reported sequence still changes over time.
    pub unstable_nodes: usize,
    /// Of the unstable nodes, how many are absent at some timestep.
    pub unstable_absent_nodes: usize,
}

/// Extracts behavioral sub-communities from matched group colors.
#[derive(Debug, Clone)]
pub struct SubcommunityExtractor {
    /// Size floor for the "larger than" diagnostics.
    min_size: usize,
}

impl SubcommunityExtractor {
    /// Create an extractor with the default size filter of 1.
    pub fn new() -> Self {
        Self { min_size: 1 }
    }

    /// Set the size filter used by the diagnostics.
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Group nodes by identical behavior and stamp mobile communities.
    ///
    /// Returns the reported-color matrix (the group colors with mobile
    /// communities overridden), the communities, and diagnostics. Fresh
    /// colors continue from the matcher's highest.
    pub fn extract(&self, colors: &GroupColors) -> Result<SubcommunityOutcome> {
        let n_nodes = colors.n_nodes();
        let mut reported = colors.matrix().clone();

        let mut stable_sets: Vec<BTreeSet<NodeId>> = Vec::new();
        let mut mobile_sets: Vec<BTreeSet<NodeId>> = Vec::new();

        for i in 0..n_nodes {
            for j in (i + 1)..n_nodes {
                if colors.row(i) != colors.row(j) {
                    continue;
                }
                let row = colors.row(i);
                let constant = row.iter().all(|&c| c == row[0]);
                let sets = if constant {
                    &mut stable_sets
                } else {
                    &mut mobile_sets
                };
                merge_pair(sets, i, j);
            }
        }

        let mut next_color = colors.highest_color() + 1;
        let mut communities = Vec::with_capacity(stable_sets.len() + mobile_sets.len());

        for members in stable_sets {
            // The shared sequence is constant; its first entry is the
            // community's single color.
            let sample = *members.iter().next().unwrap_or(&0);
            communities.push(BehavioralCommunity {
                kind: CommunityKind::Stable,
                color: colors.color(sample, 0),
                members,
            });
        }

        for members in mobile_sets {
            let color = next_color;
            next_color += 1;
            for &node in &members {
                for step in 0..reported.ncols() {
                    reported[[node, step]] = color;
                }
            }
            communities.push(BehavioralCommunity {
                kind: CommunityKind::Mobile,
                color,
                members,
            });
        }

        let diagnostics = self.diagnostics(&communities, &reported);

        debug!(
            stable = diagnostics.stable_communities,
            mobile = diagnostics.mobile_communities,
            "sub-community extraction complete"
        );

        Ok(SubcommunityOutcome {
            reported,
            communities,
            highest_color: next_color - 1,
            diagnostics,
        })
    }

    fn diagnostics(
        &self,
        communities: &[BehavioralCommunity],
        reported: &Array2<ColorId>,
    ) -> SubcommunityDiagnostics {
        let mut stats = SubcommunityDiagnostics {
            stable_communities: 0,
            mobile_communities: 0,
            stable_nodes: 0,
            mobile_nodes: 0,
            mobile_above_min: 0,
            mobile_nodes_above_min: 0,
            mean_mobile_size_above_min: 0.0,
            unstable_nodes: 0,
            unstable_absent_nodes: 0,
        };

        for community in communities {
            match community.kind() {
                CommunityKind::Stable => {
                    stats.stable_communities += 1;
                    stats.stable_nodes += community.len();
                }
                CommunityKind::Mobile => {
                    stats.mobile_communities += 1;
                    stats.mobile_nodes += community.len();
                    if community.len() > self.min_size {
                        stats.mobile_above_min += 1;
                        stats.mobile_nodes_above_min += community.len();
                    }
                }
            }
        }
        if stats.mobile_above_min > 0 {
            stats.mean_mobile_size_above_min =
                stats.mobile_nodes_above_min as f64 / stats.mobile_above_min as f64;
        }

        for node in 0..reported.nrows() {
            let row = reported.row(node);
            if row.iter().all(|&c| c == row[0]) {
                continue;
            }
            stats.unstable_nodes += 1;
            if row.iter().any(|&c| c == 0) {
                stats.unstable_absent_nodes += 1;
            }
        }

        stats
    }
}

impl Default for SubcommunityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Absorb a matched pair into the community already containing either node,
/// or start a new one.
fn merge_pair(sets: &mut Vec<BTreeSet<NodeId>>, i: NodeId, j: NodeId) {
    for set in sets.iter_mut() {
        if set.contains(&i) {
            let _ = set.insert(j);
            return;
        }
        if set.contains(&j) {
            let _ = set.insert(i);
            return;
        }
    }
    let mut fresh = BTreeSet::new();
    let _ = fresh.insert(i);
    let _ = fresh.insert(j);
    sets.push(fresh);
}

/// The extractor's output.
#[derive(Debug, Clone)]
pub struct SubcommunityOutcome {
    reported: Array2<ColorId>,
    communities: Vec<BehavioralCommunity>,
    highest_color: ColorId,
    diagnostics: SubcommunityDiagnostics,
}

impl SubcommunityOutcome {
    /// The `nodes × timesteps` reported matrix with mobile communities
    /// stamped over their members.
    pub fn reported(&self) -> &Array2<ColorId> {
        &self.reported
    }

    /// All extracted communities, stable first.
    pub fn communities(&self) -> &[BehavioralCommunity] {
        &self.communities
    }

    /// Highest color allocated, including mobile mints.
    pub fn highest_color(&self) -> ColorId {
        self.highest_color
    }

    /// Aggregate counts.
    pub fn diagnostics(&self) -> &SubcommunityDiagnostics {
        &self.diagnostics
    }

    /// The community color of one node, if it was extracted into one.
    pub fn community_of(&self, node: NodeId) -> Option<ColorId> {
        self.communities
            .iter()
            .find(|c| c.contains(node))
            .map(|c| c.color())
    }

    /// Decompose into the reported matrix, communities, and diagnostics.
    pub fn into_parts(
        self,
    ) -> (
        Array2<ColorId>,
        Vec<BehavioralCommunity>,
        SubcommunityDiagnostics,
    ) {
        (self.reported, self.communities, self.diagnostics)
    }
}
