//! # weft
//!
//! Persistent community tracking in temporal networks.
//!
//! A temporal network is a sequence of snapshots. A static detector
//! (Louvain, Leiden, label propagation, ...) partitions each snapshot
//! independently, which leaves two problems on the table: the detected
//! groups carry no identity across time, and individual nodes flicker
//! between groups for reasons as mundane as a missed observation. `weft`
//! solves both on top of any per-snapshot partition:
//!
//! 1. **Group matching** ([`GroupMatcher`]): groups are linked across
//!    timesteps by Jaccard overlap of their member sets, greedily, most
//!    similar pair first, over a bounded lookback window. Linked groups
//!    share a persistent **color**; within one timestep colors are unique.
//! 2. **Cost-minimizing coloring** ([`CostColorer`]): each node's reported
//!    membership sequence is chosen by an exact dynamic program balancing
//!    fidelity to the detected groups against penalties for switching,
//!    visiting, and absence. Suited to social networks, where nodes move
//!    individually.
//! 3. **Behavioral sub-communities** ([`SubcommunityExtractor`]): nodes
//!    with identical color sequences are folded into finer communities,
//!    split into *stable* sets (never move) and *mobile* sets (move in
//!    perfect synchrony). Suited to biological networks, where co-migration
//!    is the signal.
//!
//! [`Tracker`] composes the stages; the individual algorithms are exposed
//! for callers that need only one of them.
//!
//! ## Usage
//!
//! ```rust
//! use weft::{SnapshotPartition, Tracker, TrackingMode};
//!
//! // One partition per timestep, from any static detector. Node 2 drifts
//! // from the first community to the second.
//! let snapshots: Vec<SnapshotPartition> = (0..4)
//!     .map(|t| {
//!         let label2 = if t < 2 { 1 } else { 2 };
//!         SnapshotPartition::from_assignments(
//!             t,
//!             5,
//!             [(0, 1), (1, 1), (2, label2), (3, 2), (4, 2)],
//!         )
//!         .unwrap()
//!     })
//!     .collect();
//!
//! let result = Tracker::new(TrackingMode::CostModel)
//!     .with_switch_cost(1.0)
//!     .run(&snapshots)
//!     .unwrap();
//!
//! // result.reported() holds each node's final community per timestep.
//! assert_eq!(result.reported().nrows(), 5);
//! assert!(result.total_cost().unwrap() >= 0.0);
//! ```
//!
//! ## Features
//!
//! - `parallel`: color nodes with rayon. Nodes are independent in the cost
//!   model, so this is a pure fan-out.
//!
//! ## References
//!
//! - Tantipathananandh, Berger-Wolf, Kempe (2007). "A framework for
//!   community identification in dynamic social networks." KDD 2007.
//! - Greene, Doyle, Cunningham (2010). "Tracking the evolution of
//!   communities in dynamic social networks." ASONAM 2010.
//! - Palla, Barabási, Vicsek (2007). "Quantifying social group evolution."
//!   Nature 446.

pub mod behavior;
pub mod coloring;
/// Error types used across `weft`.
pub mod error;
pub mod matching;
pub mod snapshot;
pub mod tracker;

#[cfg(test)]
mod tracker_tests;

pub use behavior::{
    BehavioralCommunity, CommunityKind, SubcommunityDiagnostics, SubcommunityExtractor,
    SubcommunityOutcome,
};
pub use coloring::{CostColorer, CostColoring};
pub use error::{Error, Result};
pub use matching::{GroupColors, GroupMatcher};
pub use snapshot::{
    ColorId, Group, GroupStructure, NodeId, SnapshotPartition, TimeRange, Timeline,
};
pub use tracker::{ModeOutcome, Tracker, TrackingMode, TrackingResult};
