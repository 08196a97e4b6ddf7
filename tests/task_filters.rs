use daily_organizer::utils::task_filters::{
    filter_by_complexity, filter_by_urgency, sort_by_complexity, sort_by_urgency, split_by_completion, summarize_sync,
    SyncSummary,
};
use daily_organizer::{Complexity, SyncStatus, Task, TaskWithSyncStatus, Urgency};

fn sample_tasks() -> Vec<Task> {
    vec![
        Task::with_id("1", "Task 1", Complexity::High, Urgency::Low),
        Task::with_id("2", "Task 2", Complexity::Low, Urgency::High),
        Task::with_id("3", "Task 3", Complexity::Medium, Urgency::Medium),
        Task::with_id("4", "Task 4", Complexity::Low, Urgency::Low),
    ]
}

fn ids<T: AsRef<Task>>(tasks: &[T]) -> Vec<&str> {
    tasks.iter().map(|t| t.as_ref().id.as_str()).collect()
}

#[test]
fn test_sort_by_complexity_is_stable() {
    let tasks = sample_tasks();
    let sorted = sort_by_complexity(&tasks);
    assert_eq!(ids(&sorted), vec!["2", "4", "3", "1"]);
    // Input untouched
    assert_eq!(ids(&tasks), vec!["1", "2", "3", "4"]);
}

#[test]
fn test_sort_by_urgency_is_stable() {
    let tasks = sample_tasks();
    let sorted = sort_by_urgency(&tasks);
    assert_eq!(ids(&sorted), vec!["1", "4", "3", "2"]);
}

#[test]
fn test_filter_by_urgency() {
    let tasks = sample_tasks();
    assert_eq!(ids(&filter_by_urgency(&tasks, Urgency::Low)), vec!["1", "4"]);
    assert_eq!(ids(&filter_by_urgency(&tasks, Urgency::High)), vec!["2"]);
}

#[test]
fn test_filter_by_complexity() {
    let tasks = sample_tasks();
    assert_eq!(ids(&filter_by_complexity(&tasks, Complexity::Low)), vec!["2", "4"]);
    assert!(filter_by_complexity(&tasks[..1], Complexity::Low).is_empty());
}

#[test]
fn test_empty_input() {
    let tasks: Vec<Task> = Vec::new();
    assert!(sort_by_complexity(&tasks).is_empty());
    assert!(filter_by_urgency(&tasks, Urgency::High).is_empty());
    let (active, completed) = split_by_completion(&tasks);
    assert!(active.is_empty() && completed.is_empty());
}

#[test]
fn test_split_by_completion() {
    let mut tasks = sample_tasks();
    tasks[1].is_completed = true;
    tasks[3].is_completed = true;

    let (active, completed) = split_by_completion(&tasks);
    assert_eq!(ids(&active), vec!["1", "3"]);
    assert_eq!(ids(&completed), vec!["2", "4"]);
}

#[test]
fn test_views_over_cache_entries() {
    let entries: Vec<TaskWithSyncStatus> = sample_tasks().into_iter().map(TaskWithSyncStatus::from).collect();
    let sorted = sort_by_urgency(&entries);
    assert_eq!(ids(&sorted), vec!["1", "4", "3", "2"]);
}

#[test]
fn test_summarize_sync() {
    let mut entries: Vec<TaskWithSyncStatus> = sample_tasks().into_iter().map(TaskWithSyncStatus::from).collect();
    assert!(summarize_sync(&entries).is_settled());

    entries[0].sync_status = SyncStatus::Pending;
    entries[2].sync_status = SyncStatus::Error;
    let summary = summarize_sync(&entries);
    assert_eq!(
        summary,
        SyncSummary {
            synced: 2,
            pending: 1,
            error: 1
        }
    );
    assert!(!summary.is_settled());
}

const LEVELS: [(Complexity, Urgency); 3] = [
    (Complexity::Low, Urgency::Low),
    (Complexity::Medium, Urgency::Medium),
    (Complexity::High, Urgency::High),
];

/// Every list of `len` tasks over all complexity/urgency combinations. Ids are
/// the input positions so stability can be read back from the output.
fn all_inputs(len: u32) -> Vec<Vec<Task>> {
    let combos = 9usize;
    (0..combos.pow(len))
        .map(|mut code| {
            (0..len)
                .map(|pos| {
                    let pick = code % combos;
                    code /= combos;
                    let complexity = LEVELS[pick / 3].0;
                    let urgency = LEVELS[pick % 3].1;
                    Task::with_id(pos.to_string(), format!("Task {pos}"), complexity, urgency)
                })
                .collect()
        })
        .collect()
}

fn position(task: &Task) -> usize {
    task.id.parse().unwrap()
}

#[test]
fn test_sorts_hold_for_all_small_inputs() {
    for len in 0..=4 {
        for tasks in all_inputs(len) {
            let by_complexity = sort_by_complexity(&tasks);
            let by_urgency = sort_by_urgency(&tasks);
            assert_eq!(by_complexity.len(), tasks.len());
            assert_eq!(by_urgency.len(), tasks.len());

            for pair in by_complexity.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                assert!(a.complexity.rank() <= b.complexity.rank(), "unsorted: {tasks:?}");
                if a.complexity == b.complexity {
                    assert!(position(a) < position(b), "unstable: {tasks:?}");
                }
            }
            for pair in by_urgency.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                assert!(a.urgency.rank() <= b.urgency.rank(), "unsorted: {tasks:?}");
                if a.urgency == b.urgency {
                    assert!(position(a) < position(b), "unstable: {tasks:?}");
                }
            }
        }
    }
}

#[test]
fn test_filters_are_ordered_subsequences_for_all_small_inputs() {
    for len in 0..=4 {
        for tasks in all_inputs(len) {
            for (complexity, urgency) in LEVELS {
                let expected: Vec<&str> =
                    tasks.iter().filter(|t| t.urgency == urgency).map(|t| t.id.as_str()).collect();
                assert_eq!(ids(&filter_by_urgency(&tasks, urgency)), expected);

                let expected: Vec<&str> =
                    tasks.iter().filter(|t| t.complexity == complexity).map(|t| t.id.as_str()).collect();
                assert_eq!(ids(&filter_by_complexity(&tasks, complexity)), expected);
            }
        }
    }
}
