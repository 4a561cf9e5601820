use std::collections::{BTreeSet, HashSet};

use hpcflow::dag::{SchedulerView, TaskState};
use hpcflow_test_utils::builders::freeze_graph;
use proptest::prelude::*;

use crate::builder::{dag_strategy, specs_for, task_name};

/// Every transitive dependent of `roots` in the graph.
fn descendants(view: &SchedulerView, roots: &[String]) -> BTreeSet<String> {
    let graph = view.graph();
    let mut seen = BTreeSet::new();
    let mut stack: Vec<String> = roots.to_vec();
    while let Some(name) = stack.pop() {
        for dep in graph.dependents_of(&name) {
            if seen.insert(dep.clone()) {
                stack.push(dep.clone());
            }
        }
    }
    seen
}

proptest! {
    #[test]
    fn all_tasks_eventually_run_when_everything_succeeds(layout in dag_strategy(12)) {
        let graph = freeze_graph(&["local"], &[], specs_for(&layout)).unwrap();
        let mut view = SchedulerView::new(graph);
        let mut ran: HashSet<String> = HashSet::new();

        let mut steps = 0;
        while !view.is_complete() {
            steps += 1;
            prop_assert!(steps <= layout.len(), "no progress after {} steps", steps);

            let ready: Vec<String> = view.poll_ready().map(str::to_string).collect();
            prop_assert!(!ready.is_empty(), "incomplete but nothing ready");

            for task in &ready {
                // Every predecessor is done before a task is offered.
                for dep in view.graph().dependencies_of(task) {
                    prop_assert_eq!(view.state_of(dep), Some(TaskState::Done));
                }
                view.mark_running(task).unwrap();
            }
            for task in ready {
                view.mark_done(&task).unwrap();
                prop_assert!(ran.insert(task), "task ran twice");
            }
        }

        prop_assert_eq!(ran.len(), layout.len());
        prop_assert_eq!(view.counts().done, layout.len());
    }

    #[test]
    fn failures_block_exactly_their_descendants(
        layout in dag_strategy(12),
        failing in proptest::collection::vec(any::<usize>(), 0..4),
    ) {
        let n = layout.len();
        let failing: HashSet<String> = failing.into_iter().map(|i| task_name(i % n)).collect();

        let graph = freeze_graph(&["local"], &[], specs_for(&layout)).unwrap();
        let mut view = SchedulerView::new(graph);
        let mut failed: Vec<String> = Vec::new();
        let mut ran: Vec<String> = Vec::new();

        let mut steps = 0;
        while !view.is_complete() {
            steps += 1;
            prop_assert!(steps <= n, "no progress after {} steps", steps);

            let ready: Vec<String> = view.poll_ready().map(str::to_string).collect();
            prop_assert!(!ready.is_empty(), "incomplete but nothing ready");

            for task in ready {
                view.mark_running(&task).unwrap();
                if failing.contains(&task) {
                    view.mark_failed(&task).unwrap();
                    failed.push(task.clone());
                } else {
                    view.mark_done(&task).unwrap();
                }
                ran.push(task);
            }
        }

        let blocked: BTreeSet<String> = view
            .tasks_in_state(TaskState::Blocked)
            .into_iter()
            .collect();
        let expected: BTreeSet<String> = descendants(&view, &failed)
            .into_iter()
            .filter(|t| !failed.contains(t))
            .collect();
        prop_assert_eq!(&blocked, &expected);

        // Nothing blocked was ever started.
        for task in &ran {
            prop_assert!(!blocked.contains(task));
        }
        let counts = view.counts();
        prop_assert_eq!(counts.done + counts.failed + counts.blocked, n);
    }
}
