#[cfg(test)]
mod tests {
    use crate::coloring::CostColorer;
    use crate::matching::{GroupColors, GroupMatcher};
    use crate::snapshot::{ColorId, SnapshotPartition, TimeRange, Timeline};
    use crate::tracker::{Tracker, TrackingMode};
    use crate::Result;

    /// Two communities that persist across three timesteps while node 2
    /// moves from the first to the second.
    fn drifting_snapshots() -> Vec<SnapshotPartition> {
        (0..3)
            .map(|t| {
                let label2 = if t == 0 { 1 } else { 2 };
                SnapshotPartition::from_assignments(
                    t,
                    6,
                    [(0, 1), (1, 1), (2, label2), (3, 2), (4, 2), (5, 2)],
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_cost_model_end_to_end() -> Result<()> {
        let result = Tracker::new(TrackingMode::CostModel)
            .with_switch_cost(3.0)
            .run(&drifting_snapshots())?;

        // Steady nodes incur nothing.
        for node in [0, 1, 3, 4, 5] {
            assert_eq!(result.node_costs().unwrap()[node], 0.0);
            assert_eq!(result.persistence()[node], 1);
        }
        // Node 2's optimum claims its new home from t=0 (visit + absence
        // there), which beats a single switch costing 3.
        assert_eq!(result.node_costs().unwrap()[2], 2.0);
        let total: f64 = result.node_costs().unwrap().iter().sum();
        assert_eq!(result.total_cost().unwrap(), total);
        Ok(())
    }

    #[test]
    fn test_subcommunity_end_to_end() -> Result<()> {
        // A and B migrate together; C trails one step behind.
        let labels = [[1u32, 1, 2], [1, 1, 2], [1, 2, 2]];
        let matrix = ndarray::arr2(&labels);
        let colors = GroupColors::from_matrix(TimeRange::new(0, 3)?, matrix, 2)?;

        let outcome = crate::behavior::SubcommunityExtractor::new().extract(&colors)?;
        let communities = outcome.communities();

        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].kind(), crate::behavior::CommunityKind::Mobile);
        assert!(communities[0].contains(0));
        assert!(communities[0].contains(1));
        assert!(!communities[0].contains(2));

        // One fresh color stamped across all three timesteps of A and B.
        let stamped = communities[0].color();
        assert_eq!(stamped, 3);
        for node in [0, 1] {
            assert!(outcome.reported().row(node).iter().all(|&c| c == stamped));
        }
        Ok(())
    }

    #[test]
    fn test_dp_matches_exhaustive_enumeration() -> Result<()> {
        // Hand-built 3-timestep, 2-label instance with asymmetric costs.
        let row: [ColorId; 3] = [1, 2, 1];
        let matrix = ndarray::arr2(&[[1u32, 2, 1], [2, 2, 2]]);
        let colors = GroupColors::from_matrix(TimeRange::new(0, 3)?, matrix.clone(), 2)?;

        let switch = 0.7;
        let visit = 1.1;
        let absent = 0.9;
        let colorer = CostColorer::new()
            .with_switch_cost(switch)
            .with_visit_cost(visit)
            .with_absent_cost(absent);
        let coloring = colorer.color(&colors)?;

        // Exhaustive: every assignment of {1, 2} over 3 timesteps for node 0.
        let alphabet = [1 as ColorId, 2];
        let present = |c: ColorId, t: usize| matrix.column(t).iter().any(|&x| x == c);
        let step_cost = |t: usize, c: ColorId| {
            let actual = row[t];
            let mut cost = 0.0;
            if actual != 0 && c != actual {
                cost += visit;
            }
            if (actual == 0 || c != actual) && present(c, t) {
                cost += absent;
            }
            cost
        };

        let mut best = f64::INFINITY;
        for &a in &alphabet {
            for &b in &alphabet {
                for &c in &alphabet {
                    let path = [a, b, c];
                    let mut cost = 0.0;
                    for t in 0..3 {
                        cost += step_cost(t, path[t]);
                        if t > 0 && path[t] != path[t - 1] {
                            cost += switch;
                        }
                    }
                    if cost < best {
                        best = cost;
                    }
                }
            }
        }

        assert!((coloring.node_costs()[0] - best).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_zero_cost_configuration_still_completes() -> Result<()> {
        let result = Tracker::new(TrackingMode::CostModel)
            .with_switch_cost(0.0)
            .with_visit_cost(0.0)
            .with_absent_cost(0.0)
            .run(&drifting_snapshots())?;

        assert_eq!(result.total_cost(), Some(0.0));
        // A valid path is still produced: right shape, labels from each
        // node's own alphabet.
        assert_eq!(result.reported().nrows(), 6);
        assert_eq!(result.reported().ncols(), 3);
        for node in 0..6 {
            for &c in result.reported_row(node).iter() {
                assert!(result.group_colors().row(node).iter().any(|&own| own == c));
            }
        }
        Ok(())
    }

    #[test]
    fn test_single_timestep_run() -> Result<()> {
        let snapshot =
            SnapshotPartition::from_assignments(0, 4, [(0, 1), (1, 1), (2, 2), (3, 2)])?;
        let result = Tracker::new(TrackingMode::CostModel).run(&[snapshot])?;

        // Fresh colors, no matching step, every node keeps its own group at
        // zero cost.
        assert_eq!(result.highest_color(), 2);
        assert_eq!(result.total_cost(), Some(0.0));
        for node in 0..4 {
            assert_eq!(
                result.reported_row(node)[0],
                result.group_colors().color(node, 0)
            );
        }
        Ok(())
    }

    #[test]
    fn test_tracking_is_deterministic() -> Result<()> {
        let snapshots = drifting_snapshots();
        let a = Tracker::new(TrackingMode::CostModel).run(&snapshots)?;
        let b = Tracker::new(TrackingMode::CostModel).run(&snapshots)?;
        assert_eq!(a.reported(), b.reported());
        assert_eq!(a.group_colors().matrix(), b.group_colors().matrix());
        assert_eq!(a.total_cost(), b.total_cost());
        Ok(())
    }

    #[test]
    fn test_persistence_counts_distinct_reported_colors() -> Result<()> {
        let result = Tracker::new(TrackingMode::CostModel)
            .with_switch_cost(0.1)
            .run(&drifting_snapshots())?;

        // Cheap switching lets node 2 follow its groups: two communities.
        assert_eq!(result.persistence()[2], 2);
        assert_eq!(result.persistence()[0], 1);
        Ok(())
    }

    #[test]
    fn test_subcommunity_mode_via_tracker() -> Result<()> {
        // Nodes 0 and 1 stay together in one community for the whole run;
        // the tracker surfaces them as one stable community.
        let snapshots: Vec<_> = (0..3)
            .map(|t| {
                SnapshotPartition::from_assignments(t, 4, [(0, 1), (1, 1), (2, 2), (3, 2)])
                    .unwrap()
            })
            .collect();
        let result = Tracker::new(TrackingMode::Subcommunity).run(&snapshots)?;

        let communities = result.communities().unwrap();
        assert_eq!(communities.len(), 2);
        for community in communities {
            assert_eq!(community.kind(), crate::behavior::CommunityKind::Stable);
        }
        let diagnostics = result.diagnostics().unwrap();
        assert_eq!(diagnostics.stable_communities, 2);
        assert_eq!(diagnostics.mobile_communities, 0);
        assert_eq!(diagnostics.unstable_nodes, 0);

        // Sub-community mode reports the group-derived matrix untouched.
        assert_eq!(result.reported(), result.group_colors().matrix());
        Ok(())
    }

    #[test]
    fn test_unlabeled_node_fails_fast() {
        let mut partition = SnapshotPartition::new(0, 3);
        assert!(partition.assign(0, 0).is_err());
    }

    #[test]
    fn test_invalid_configuration_is_rejected_not_clamped() {
        let snapshots = drifting_snapshots();

        assert!(Tracker::new(TrackingMode::CostModel)
            .with_lookback(0)
            .run(&snapshots)
            .is_err());
        assert!(Tracker::new(TrackingMode::CostModel)
            .with_similarity_threshold(2.0)
            .run(&snapshots)
            .is_err());
        assert!(Tracker::new(TrackingMode::CostModel)
            .with_absent_cost(-0.5)
            .run(&snapshots)
            .is_err());
    }

    #[test]
    fn test_timeline_groups_stay_distinct_per_timestep() -> Result<()> {
        // Churny input: communities split, merge, and vanish.
        let snapshots = vec![
            SnapshotPartition::from_assignments(
                0,
                8,
                [(0, 1), (1, 1), (2, 1), (3, 2), (4, 2), (5, 2), (6, 3), (7, 3)],
            )?,
            SnapshotPartition::from_assignments(
                1,
                8,
                [(0, 1), (1, 1), (2, 2), (3, 2), (4, 2), (5, 3), (6, 3), (7, 3)],
            )?,
            SnapshotPartition::from_assignments(
                2,
                8,
                [(0, 1), (1, 2), (2, 2), (3, 2), (4, 1), (5, 3), (6, 3)],
            )?,
        ];

        let mut timeline = Timeline::from_partitions(&snapshots)?;
        let _colors = GroupMatcher::new().run(&mut timeline)?;

        for structure in timeline.structures() {
            let mut seen = std::collections::HashSet::new();
            for group in structure.groups() {
                let color = group.color().unwrap();
                assert!(
                    seen.insert(color),
                    "timestep {}: color {color} duplicated",
                    structure.timestep()
                );
            }
        }
        Ok(())
    }
}
