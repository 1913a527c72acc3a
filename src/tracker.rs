//! The composed tracking pipeline.
//!
//! [`Tracker`] wires the stages together: snapshot partitions become a
//! [`Timeline`], the matcher assigns persistent colors, and one of two
//! consumers produces the final per-node reported sequences:
//!
//! - [`TrackingMode::CostModel`]: the social-network mode: each node's
//!   sequence is smoothed by the cost-minimizing colorer.
//! - [`TrackingMode::Subcommunity`]: the biological-network mode: nodes
//!   with identical behavior are folded into behavioral sub-communities.
//!
//! The run is batch and synchronous: it either completes with a fully
//! populated [`TrackingResult`] or fails before producing any output.

use std::collections::HashSet;

use ndarray::Array2;
use tracing::debug;

use crate::behavior::{BehavioralCommunity, SubcommunityDiagnostics, SubcommunityExtractor};
use crate::coloring::CostColorer;
use crate::error::Result;
use crate::matching::{GroupColors, GroupMatcher};
use crate::snapshot::{ColorId, NodeId, SnapshotPartition, TimeRange, Timeline};

/// Which consumer produces the reported sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// Smooth each node's sequence with the switch/visit/absence cost model.
    CostModel,
    /// Fold synchronized nodes into behavioral sub-communities.
    Subcommunity,
}

/// End-to-end temporal community tracker.
///
/// ```
/// use weft::{SnapshotPartition, Tracker, TrackingMode};
///
/// let snapshots: Vec<SnapshotPartition> = (0..3)
///     .map(|t| {
///         SnapshotPartition::from_assignments(t, 4, [(0, 1), (1, 1), (2, 2), (3, 2)])
///             .unwrap()
///     })
///     .collect();
///
/// let result = Tracker::new(TrackingMode::CostModel)
///     .with_lookback(2)
///     .with_switch_cost(2.0)
///     .run(&snapshots)
///     .unwrap();
///
/// assert_eq!(result.total_cost(), Some(0.0));
/// ```
#[derive(Debug, Clone)]
pub struct Tracker {
    mode: TrackingMode,
    matcher: GroupMatcher,
    colorer: CostColorer,
    extractor: SubcommunityExtractor,
}

impl Tracker {
    /// Create a tracker with default parameters for the given mode.
    pub fn new(mode: TrackingMode) -> Self {
        Self {
            mode,
            matcher: GroupMatcher::new(),
            colorer: CostColorer::new(),
            extractor: SubcommunityExtractor::new(),
        }
    }

    /// Set the matcher's lookback window. Must be at least 1.
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.matcher = self.matcher.with_lookback(lookback);
        self
    }

    /// Set the matcher's similarity threshold. Must lie in `[0, 1]`.
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.matcher = self.matcher.with_threshold(threshold);
        self
    }

    /// Set the cost model's switching penalty.
    pub fn with_switch_cost(mut self, cost: f64) -> Self {
        self.colorer = self.colorer.with_switch_cost(cost);
        self
    }

    /// Set the cost model's visiting penalty.
    pub fn with_visit_cost(mut self, cost: f64) -> Self {
        self.colorer = self.colorer.with_visit_cost(cost);
        self
    }

    /// Set the cost model's absence penalty.
    pub fn with_absent_cost(mut self, cost: f64) -> Self {
        self.colorer = self.colorer.with_absent_cost(cost);
        self
    }

    /// Set the sub-community size filter.
    pub fn with_min_community_size(mut self, min_size: usize) -> Self {
        self.extractor = self.extractor.with_min_size(min_size);
        self
    }

    /// Run the full pipeline over one partition per timestep.
    pub fn run(&self, partitions: &[SnapshotPartition]) -> Result<TrackingResult> {
        let mut timeline = Timeline::from_partitions(partitions)?;
        let colors = self.matcher.run(&mut timeline)?;

        debug!(
            mode = ?self.mode,
            n_nodes = colors.n_nodes(),
            timesteps = colors.n_steps(),
            "matched groups, producing reported sequences"
        );

        let (reported, outcome, highest_color) = match self.mode {
            TrackingMode::CostModel => {
                let coloring = self.colorer.color(&colors)?;
                let highest = colors.highest_color();
                let (reported, node_costs, total_cost) = coloring.into_parts();
                (
                    reported,
                    ModeOutcome::CostModel {
                        node_costs,
                        total_cost,
                    },
                    highest,
                )
            }
            TrackingMode::Subcommunity => {
                let outcome = self.extractor.extract(&colors)?;
                let highest = outcome.highest_color();
                let (reported, communities, diagnostics) = outcome.into_parts();
                (
                    reported,
                    ModeOutcome::Subcommunity {
                        communities,
                        diagnostics,
                    },
                    highest,
                )
            }
        };

        let persistence = persistence_of(&reported);

        Ok(TrackingResult {
            group_colors: colors,
            reported,
            outcome,
            persistence,
            highest_color,
        })
    }
}

/// Count of distinct reported colors per node. A node that never changes
/// community has persistence 1; larger values flag frequent movers.
fn persistence_of(reported: &Array2<ColorId>) -> Vec<usize> {
    (0..reported.nrows())
        .map(|node| {
            reported
                .row(node)
                .iter()
                .copied()
                .collect::<HashSet<ColorId>>()
                .len()
        })
        .collect()
}

/// Mode-specific portion of a tracking result.
#[derive(Debug, Clone)]
pub enum ModeOutcome {
    /// Cost-model mode: per-node optima and the network aggregate.
    CostModel {
        /// Optimal cost per node.
        node_costs: Vec<f64>,
        /// Sum of the per-node optima.
        total_cost: f64,
    },
    /// Sub-community mode: the extracted communities and counts.
    Subcommunity {
        /// Extracted behavioral communities.
        communities: Vec<BehavioralCommunity>,
        /// Aggregate counts.
        diagnostics: SubcommunityDiagnostics,
    },
}

/// A completed tracking run.
#[derive(Debug, Clone)]
pub struct TrackingResult {
    group_colors: GroupColors,
    reported: Array2<ColorId>,
    outcome: ModeOutcome,
    persistence: Vec<usize>,
    highest_color: ColorId,
}

impl TrackingResult {
    /// The covered time range.
    pub fn range(&self) -> TimeRange {
        self.group_colors.range()
    }

    /// The matcher's group-color matrix (before smoothing or stamping).
    pub fn group_colors(&self) -> &GroupColors {
        &self.group_colors
    }

    /// The final `nodes × timesteps` reported-color matrix.
    pub fn reported(&self) -> &Array2<ColorId> {
        &self.reported
    }

    /// One node's final reported sequence.
    pub fn reported_row(&self, node: NodeId) -> ndarray::ArrayView1<'_, ColorId> {
        self.reported.row(node)
    }

    /// Mode-specific outputs.
    pub fn outcome(&self) -> &ModeOutcome {
        &self.outcome
    }

    /// Per-node count of distinct reported colors.
    pub fn persistence(&self) -> &[usize] {
        &self.persistence
    }

    /// Highest color allocated across the whole run.
    pub fn highest_color(&self) -> ColorId {
        self.highest_color
    }

    /// Per-node optimal costs (cost-model mode only).
    pub fn node_costs(&self) -> Option<&[f64]> {
        match &self.outcome {
            ModeOutcome::CostModel { node_costs, .. } => Some(node_costs),
            ModeOutcome::Subcommunity { .. } => None,
        }
    }

    /// Network-wide aggregate cost (cost-model mode only).
    pub fn total_cost(&self) -> Option<f64> {
        match &self.outcome {
            ModeOutcome::CostModel { total_cost, .. } => Some(*total_cost),
            ModeOutcome::Subcommunity { .. } => None,
        }
    }

    /// Extracted communities (sub-community mode only).
    pub fn communities(&self) -> Option<&[BehavioralCommunity]> {
        match &self.outcome {
            ModeOutcome::Subcommunity { communities, .. } => Some(communities),
            ModeOutcome::CostModel { .. } => None,
        }
    }

    /// Sub-community diagnostics (sub-community mode only).
    pub fn diagnostics(&self) -> Option<&SubcommunityDiagnostics> {
        match &self.outcome {
            ModeOutcome::Subcommunity { diagnostics, .. } => Some(diagnostics),
            ModeOutcome::CostModel { .. } => None,
        }
    }

    /// The sub-community color of one node (sub-community mode, extracted
    /// nodes only).
    pub fn community_of(&self, node: NodeId) -> Option<ColorId> {
        self.communities()?
            .iter()
            .find(|c| c.contains(node))
            .map(|c| c.color())
    }
}
