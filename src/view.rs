
use crate::filter::{filter_tasks, DateRange, FilterPatch, FilterSpec};
use crate::models::{TaskPriority, TaskRecord};
use crate::sort::{sort_tasks, SortSpec};
use crate::stats::TaskStats;
use chrono::NaiveDate;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

// Named one-key filters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuickFilter {
    MyTasks,
    Urgent,
    Overdue,
}

// Last write wins; each push restarts the delay
#[derive(Debug)]
pub struct SearchDebounce {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl SearchDebounce {
    pub fn new(delay: Duration) -> Self {
        SearchDebounce {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, text: String, now: Instant) {
        self.pending = Some((text, now + self.delay));
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(text, _)| text),
            _ => None,
        }
    }

    pub fn take_now(&mut self) -> Option<String> {
        self.pending.take().map(|(text, _)| text)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[derive(Debug)]
pub struct TaskView {
    source: Vec<TaskRecord>,
    filters: FilterSpec,
    sort: SortSpec,
    visible: Vec<TaskRecord>,
    stats: TaskStats,
    current_user_id: Option<String>,
    search: SearchDebounce,
}

impl TaskView {
    pub fn new(current_user_id: Option<String>, search_delay: Duration) -> Self {
        TaskView {
            source: Vec::new(),
            filters: FilterSpec::default(),
            sort: SortSpec::default(),
            visible: Vec::new(),
            stats: TaskStats::default(),
            current_user_id,
            search: SearchDebounce::new(search_delay),
        }
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.source
    }

    pub fn visible(&self) -> &[TaskRecord] {
        &self.visible
    }

    pub fn stats(&self) -> TaskStats {
        self.stats
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn current_user_id(&self) -> Option<&str> {
        self.current_user_id.as_deref()
    }

    pub fn active_filter_count(&self) -> usize {
        self.filters.active_filter_count()
    }

    pub fn set_tasks(&mut self, tasks: Vec<TaskRecord>) {
        self.source = tasks;
        self.recompute();
    }

    pub fn set_filters(&mut self, patch: FilterPatch) {
        if patch.search.is_some() {
            self.search.cancel();
        }
        self.filters.apply(patch);
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.search.cancel();
        self.filters = FilterSpec::default();
        self.recompute();
    }

    // false for "my tasks" without a known user
    pub fn apply_quick_filter(&mut self, quick: QuickFilter, today: NaiveDate) -> bool {
        let patch = match quick {
            QuickFilter::MyTasks => match &self.current_user_id {
                Some(user) => FilterPatch::default().assigned_to([user.clone()]),
                None => return false,
            },
            QuickFilter::Urgent => {
                FilterPatch::default().priority([TaskPriority::High, TaskPriority::Urgent])
            }
            QuickFilter::Overdue => FilterPatch::default().date_range(DateRange {
                start: None,
                end: Some(today),
            }),
        };
        self.set_filters(patch);
        true
    }

    pub fn queue_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search.push(text.into(), now);
    }

    pub fn pending_search(&self) -> Option<&str> {
        self.search.pending()
    }

    /// Applies pending search text whose delay has elapsed. Returns whether
    /// the visible list was recomputed.
    pub fn flush_search(&mut self, now: Instant) -> bool {
        match self.search.take_due(now) {
            Some(text) => {
                self.apply_search(text);
                true
            }
            None => false,
        }
    }

    pub fn commit_search(&mut self) -> bool {
        match self.search.take_now() {
            Some(text) => {
                self.apply_search(text);
                true
            }
            None => false,
        }
    }

    fn apply_search(&mut self, text: String) {
        self.filters.search = text;
        self.recompute();
    }

    pub fn replace_task(&mut self, task: TaskRecord) -> bool {
        match self.source.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task;
                self.recompute();
                true
            }
            None => false,
        }
    }

    pub fn insert_task(&mut self, task: TaskRecord) {
        self.source.push(task);
        self.recompute();
    }

    fn recompute(&mut self) {
        let filtered = filter_tasks(&self.source, &self.filters);
        self.stats = TaskStats::project(filtered.iter().copied());
        self.visible = sort_tasks(&filtered, &self.sort)
            .into_iter()
            .cloned()
            .collect();
        debug!(
            total = self.source.len(),
            visible = self.visible.len(),
            active_filters = self.filters.active_filter_count(),
            sort = %self.sort,
            "task view recomputed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::sort::{SortDirection, SortField};
    use crate::test_support::{scenario_board, task};

    fn visible_ids(view: &TaskView) -> Vec<String> {
        view.visible().iter().map(|t| t.id.clone()).collect()
    }

    fn loaded_view() -> TaskView {
        let mut view = TaskView::new(Some("u-1".to_string()), DEFAULT_SEARCH_DEBOUNCE);
        let mut board = scenario_board();
        board[1].assigned_to = Some("u-1".to_string());
        view.set_tasks(board);
        view.set_sort(SortSpec::new(SortField::Unsorted, SortDirection::Asc));
        view
    }

    #[test]
    fn test_empty_view_before_load() {
        let view = TaskView::new(None, DEFAULT_SEARCH_DEBOUNCE);
        assert!(view.visible().is_empty());
        assert_eq!(view.stats(), TaskStats::default());
        assert_eq!(view.sort(), SortSpec::default());
    }

    #[test]
    fn test_filter_then_sort_with_stats_over_filtered() {
        let mut view = loaded_view();
        view.set_filters(FilterPatch::default().status([TaskStatus::Pending]));
        assert_eq!(visible_ids(&view), vec!["1", "3"]);

        view.set_sort(SortSpec::new(SortField::Priority, SortDirection::Desc));
        assert_eq!(visible_ids(&view), vec!["3", "1"]);
        assert_eq!(view.stats().total, 2);
        assert_eq!(view.stats().pending, 2);
        assert_eq!(view.stats().completed, 0);
        assert_eq!(view.tasks().len(), 3);
    }

    #[test]
    fn test_clear_filters_restores_everything() {
        let mut view = loaded_view();
        view.set_filters(
            FilterPatch::default()
                .status([TaskStatus::Pending])
                .priority([TaskPriority::Urgent])
                .search("task"),
        );
        assert_eq!(view.active_filter_count(), 3);
        assert_eq!(visible_ids(&view), vec!["3"]);

        view.clear_filters();
        assert_eq!(view.active_filter_count(), 0);
        assert_eq!(visible_ids(&view), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_quick_filters() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut view = loaded_view();
        assert!(view.apply_quick_filter(QuickFilter::MyTasks, today));
        assert_eq!(visible_ids(&view), vec!["2"]);

        let mut view = loaded_view();
        assert!(view.apply_quick_filter(QuickFilter::Urgent, today));
        assert_eq!(visible_ids(&view), vec!["1", "3"]);

        let mut view = loaded_view();
        assert!(view.apply_quick_filter(QuickFilter::Overdue, today));
        assert_eq!(visible_ids(&view), vec!["2"]);
        assert_eq!(view.filters().date_range.end, Some(today));
    }

    #[test]
    fn test_my_tasks_needs_a_user() {
        let mut view = TaskView::new(None, DEFAULT_SEARCH_DEBOUNCE);
        view.set_tasks(scenario_board());
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(!view.apply_quick_filter(QuickFilter::MyTasks, today));
        assert_eq!(view.active_filter_count(), 0);
        assert_eq!(view.visible().len(), 3);
    }

    #[test]
    fn test_search_is_debounced_last_write_wins() {
        let mut view = loaded_view();
        let mut board = scenario_board();
        board[0].title = "Deploy api".to_string();
        board[2].title = "Design api docs".to_string();
        view.set_tasks(board);

        let start = Instant::now();
        view.queue_search("dep", start);
        view.queue_search("des", start + Duration::from_millis(200));

        assert!(!view.flush_search(start + Duration::from_millis(400)));
        assert_eq!(view.visible().len(), 3);
        assert_eq!(view.pending_search(), Some("des"));

        assert!(view.flush_search(start + Duration::from_millis(500)));
        assert_eq!(visible_ids(&view), vec!["3"]);
        assert_eq!(view.pending_search(), None);
        assert!(!view.flush_search(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_clearing_drops_pending_search() {
        let mut view = loaded_view();
        let start = Instant::now();
        view.queue_search("zzz", start);
        view.clear_filters();
        assert!(!view.flush_search(start + Duration::from_secs(1)));
        assert_eq!(view.visible().len(), 3);
    }

    #[test]
    fn test_commit_search_skips_the_delay() {
        let mut view = loaded_view();
        view.queue_search("task 2", Instant::now());
        assert!(view.commit_search());
        assert_eq!(visible_ids(&view), vec!["2"]);
    }

    #[test]
    fn test_replace_task_recomputes() {
        let mut view = loaded_view();
        view.set_filters(FilterPatch::default().status([TaskStatus::Pending]));
        let mut done = view.tasks()[0].clone();
        done.status = TaskStatus::Completed;
        assert!(view.replace_task(done));
        assert_eq!(visible_ids(&view), vec!["3"]);
        assert_eq!(view.tasks()[0].status, TaskStatus::Completed);

        let stranger = task("99", TaskStatus::Pending, TaskPriority::Low, None);
        assert!(!view.replace_task(stranger.clone()));
        view.insert_task(stranger);
        assert_eq!(visible_ids(&view), vec!["3", "99"]);
    }
}
