use std::collections::{BTreeMap, BTreeSet};

use hpcflow::dag::TaskSpec;
use hpcflow::errors::WorkflowError;
use hpcflow_test_utils::builders::freeze_graph;
use proptest::prelude::*;

/// Random acyclic layout: task `i` may only depend on tasks `0..i`.
/// Each dependency is wired either through an artifact or via `after`.
pub fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<(usize, bool)>>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(
            proptest::collection::vec((any::<usize>(), any::<bool>()), 0..4),
            n,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    if i == 0 {
                        return Vec::new();
                    }
                    let mut seen = BTreeSet::new();
                    deps.into_iter()
                        .filter(|(d, _)| seen.insert(d % i))
                        .map(|(d, via_artifact)| (d % i, via_artifact))
                        .collect()
                })
                .collect()
        })
    })
}

pub fn task_name(i: usize) -> String {
    format!("task_{i}")
}

/// Every task `i` produces `out_i`; consumers read it when the dependency
/// is wired through an artifact.
pub fn specs_for(layout: &[Vec<(usize, bool)>]) -> Vec<TaskSpec> {
    layout
        .iter()
        .enumerate()
        .map(|(i, deps)| {
            let mut spec = TaskSpec::new(task_name(i)).output(format!("out_{i}"));
            for &(d, via_artifact) in deps {
                spec = if via_artifact {
                    spec.input(format!("out_{d}"))
                } else {
                    spec.after(task_name(d))
                };
            }
            spec
        })
        .collect()
}

/// Direct predecessors per task, as implied by `layout` plus `extra` edges.
fn predecessors(
    layout: &[Vec<(usize, bool)>],
    extra: &[(usize, usize)],
) -> BTreeMap<String, BTreeSet<String>> {
    let mut preds: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (i, deps) in layout.iter().enumerate() {
        let entry = preds.entry(task_name(i)).or_default();
        for &(d, _) in deps {
            entry.insert(task_name(d));
        }
    }
    for &(from, to) in extra {
        preds.entry(task_name(to)).or_default().insert(task_name(from));
    }
    preds
}

proptest! {
    #[test]
    fn acyclic_layouts_always_freeze(layout in dag_strategy(12)) {
        let graph = freeze_graph(&["local"], &[], specs_for(&layout)).unwrap();
        prop_assert_eq!(graph.len(), layout.len());

        // Topological order respects every edge.
        let position: BTreeMap<&str, usize> = graph
            .topological_order()
            .iter()
            .enumerate()
            .map(|(pos, name)| (name.as_str(), pos))
            .collect();
        for name in graph.tasks() {
            for dep in graph.dependencies_of(name) {
                prop_assert!(position[dep.as_str()] < position[name]);
            }
        }
    }

    #[test]
    fn injected_back_edge_is_reported_as_a_real_cycle(
        layout in dag_strategy(10).prop_filter("need two tasks", |l| l.len() >= 2),
        a in any::<usize>(),
        b in any::<usize>(),
    ) {
        let n = layout.len();
        // Make `hi` a descendant of `lo`, then add `hi -> lo`.
        let lo = a % (n - 1);
        let hi = lo + 1 + b % (n - 1 - lo);

        let mut specs = specs_for(&layout);
        specs[hi] = specs[hi].clone().after(task_name(lo));
        specs[lo] = specs[lo].clone().after(task_name(hi));

        match freeze_graph(&["local"], &[], specs) {
            Err(WorkflowError::Cycle(path)) => {
                let preds = predecessors(&layout, &[(lo, hi), (hi, lo)]);
                prop_assert!(!path.is_empty());
                for i in 0..path.len() {
                    let from = &path[i];
                    let to = &path[(i + 1) % path.len()];
                    prop_assert!(
                        preds[to].contains(from),
                        "{} -> {} is not an edge (path {:?})", from, to, path
                    );
                }
            }
            other => prop_assert!(false, "expected Cycle, got {:?}", other),
        }
    }
}
