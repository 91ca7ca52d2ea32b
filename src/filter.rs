use crate::models::{parse_date, TaskPriority, TaskRecord, TaskStatus};
use chrono::NaiveDate;
use std::collections::BTreeSet;

// Inclusive bounds on the due date
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    // Unparseable bounds stay open
    pub fn from_strs(start: Option<&str>, end: Option<&str>) -> DateRange {
        DateRange {
            start: start.and_then(parse_date),
            end: end.and_then(parse_date),
        }
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    fn bound_count(&self) -> usize {
        usize::from(self.start.is_some()) + usize::from(self.end.is_some())
    }

    // Undated tasks fail any active bound
    fn admits(&self, due: Option<NaiveDate>) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(due) = due else {
            return false;
        };
        self.start.map_or(true, |start| due >= start) && self.end.map_or(true, |end| due <= end)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub status: BTreeSet<TaskStatus>,
    pub priority: BTreeSet<TaskPriority>,
    pub assigned_to: BTreeSet<String>,
    pub projects: BTreeSet<String>,
    pub date_range: DateRange,
    pub search: String,
}

impl FilterSpec {
    // One per selected value, one per date bound, one for any search text
    pub fn active_filter_count(&self) -> usize {
        self.status.len()
            + self.priority.len()
            + self.assigned_to.len()
            + self.projects.len()
            + self.date_range.bound_count()
            + usize::from(!self.search.is_empty())
    }

    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(projects) = patch.projects {
            self.projects = projects;
        }
        if let Some(date_range) = patch.date_range {
            self.date_range = date_range;
        }
        if let Some(search) = patch.search {
            self.search = search;
        }
    }
}

// None keeps the current value, Some replaces it wholesale
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub status: Option<BTreeSet<TaskStatus>>,
    pub priority: Option<BTreeSet<TaskPriority>>,
    pub assigned_to: Option<BTreeSet<String>>,
    pub projects: Option<BTreeSet<String>>,
    pub date_range: Option<DateRange>,
    pub search: Option<String>,
}

impl FilterPatch {
    pub fn is_empty(&self) -> bool {
        *self == FilterPatch::default()
    }

    pub fn status(mut self, values: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.status = Some(values.into_iter().collect());
        self
    }

    pub fn priority(mut self, values: impl IntoIterator<Item = TaskPriority>) -> Self {
        self.priority = Some(values.into_iter().collect());
        self
    }

    pub fn assigned_to<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.assigned_to = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn projects<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.projects = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

// Values within a field are OR'd, fields are AND'd, empty fields pass
pub fn matches(task: &TaskRecord, spec: &FilterSpec) -> bool {
    if !spec.search.is_empty() {
        let needle = spec.search.to_lowercase();
        let in_title = contains_ignore_case(&task.title, &needle);
        let in_description = task
            .description
            .as_deref()
            .is_some_and(|d| contains_ignore_case(d, &needle));
        if !in_title && !in_description {
            return false;
        }
    }

    if !spec.status.is_empty() && !spec.status.contains(&task.status) {
        return false;
    }

    if !spec.priority.is_empty() && !spec.priority.contains(&task.priority) {
        return false;
    }

    if !spec.assigned_to.is_empty() {
        match &task.assigned_to {
            Some(user) if spec.assigned_to.contains(user) => {}
            _ => return false,
        }
    }

    if !spec.projects.is_empty() && !spec.projects.contains(&task.project_id) {
        return false;
    }

    spec.date_range.admits(task.due_date)
}

pub fn filter_tasks<'a>(tasks: &'a [TaskRecord], spec: &FilterSpec) -> Vec<&'a TaskRecord> {
    tasks.iter().filter(|task| matches(task, spec)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ids, scenario_board, task};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_empty_spec_is_identity() {
        let board = scenario_board();
        let filtered = filter_tasks(&board, &FilterSpec::default());
        assert_eq!(ids(&filtered), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_status_filter_keeps_original_order() {
        let board = scenario_board();
        let mut spec = FilterSpec::default();
        spec.apply(FilterPatch::default().status([TaskStatus::Pending]));
        assert_eq!(ids(&filter_tasks(&board, &spec)), vec!["1", "3"]);
    }

    #[test]
    fn test_values_within_a_field_are_alternatives() {
        let board = scenario_board();
        let mut spec = FilterSpec::default();
        spec.apply(FilterPatch::default().priority([TaskPriority::Low, TaskPriority::Urgent]));
        assert_eq!(ids(&filter_tasks(&board, &spec)), vec!["2", "3"]);
    }

    #[test]
    fn test_fields_are_combined() {
        let board = scenario_board();
        let mut spec = FilterSpec::default();
        spec.apply(
            FilterPatch::default()
                .status([TaskStatus::Pending])
                .priority([TaskPriority::High]),
        );
        assert_eq!(ids(&filter_tasks(&board, &spec)), vec!["1"]);
    }

    #[test]
    fn test_membership_law_holds_for_every_status_subset() {
        let board: Vec<TaskRecord> = TaskStatus::ALL
            .iter()
            .enumerate()
            .map(|(i, s)| task(&i.to_string(), *s, TaskPriority::Medium, None))
            .collect();
        for mask in 0u8..16 {
            let selected: BTreeSet<TaskStatus> = TaskStatus::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| *s)
                .collect();
            let spec = FilterSpec {
                status: selected.clone(),
                ..FilterSpec::default()
            };
            for t in &board {
                let expected = selected.is_empty() || selected.contains(&t.status);
                assert_eq!(matches(t, &spec), expected, "mask {} task {}", mask, t.id);
            }
        }
    }

    #[test]
    fn test_unassigned_task_fails_assignee_filter() {
        let mut mine = task("a", TaskStatus::Pending, TaskPriority::Low, None);
        mine.assigned_to = Some("u-1".to_string());
        let unassigned = task("b", TaskStatus::Pending, TaskPriority::Low, None);
        let spec = FilterSpec {
            assigned_to: ["u-1".to_string()].into_iter().collect(),
            ..FilterSpec::default()
        };
        assert!(matches(&mine, &spec));
        assert!(!matches(&unassigned, &spec));
    }

    #[test]
    fn test_project_filter() {
        let mut other = task("b", TaskStatus::Pending, TaskPriority::Low, None);
        other.project_id = "p-2".to_string();
        let board = vec![task("a", TaskStatus::Pending, TaskPriority::Low, None), other];
        let mut spec = FilterSpec::default();
        spec.apply(FilterPatch::default().projects(["p-2"]));
        assert_eq!(ids(&filter_tasks(&board, &spec)), vec!["b"]);
    }

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let board = scenario_board();
        let spec = FilterSpec {
            date_range: DateRange {
                start: Some(date("2024-01-10")),
                end: Some(date("2024-01-20")),
            },
            ..FilterSpec::default()
        };
        assert_eq!(ids(&filter_tasks(&board, &spec)), vec!["1", "2"]);
    }

    #[test]
    fn test_undated_task_fails_any_active_bound() {
        let undated = task("x", TaskStatus::Pending, TaskPriority::Low, None);
        let only_start = FilterSpec {
            date_range: DateRange {
                start: Some(date("2000-01-01")),
                end: None,
            },
            ..FilterSpec::default()
        };
        let only_end = FilterSpec {
            date_range: DateRange {
                start: None,
                end: Some(date("2100-01-01")),
            },
            ..FilterSpec::default()
        };
        assert!(!matches(&undated, &only_start));
        assert!(!matches(&undated, &only_end));
        assert!(matches(&undated, &FilterSpec::default()));
    }

    #[test]
    fn test_malformed_date_bound_is_open() {
        let range = DateRange::from_strs(Some("not-a-date"), Some("2024-01-15"));
        assert_eq!(range.start, None);
        assert_eq!(range.end, Some(date("2024-01-15")));

        let board = scenario_board();
        let spec = FilterSpec {
            date_range: range,
            ..FilterSpec::default()
        };
        assert_eq!(ids(&filter_tasks(&board, &spec)), vec!["2"]);
    }

    #[test]
    fn test_search_matches_title_or_description_ignoring_case() {
        let mut by_title = task("a", TaskStatus::Pending, TaskPriority::Low, None);
        by_title.title = "Fix OAuth callback".to_string();
        let mut by_description = task("b", TaskStatus::Pending, TaskPriority::Low, None);
        by_description.description = Some("Rotate the AUTH tokens".to_string());
        let neither = task("c", TaskStatus::Pending, TaskPriority::Low, None);
        let board = vec![by_title, by_description, neither];

        let mut spec = FilterSpec::default();
        spec.apply(FilterPatch::default().search("auth"));
        assert_eq!(ids(&filter_tasks(&board, &spec)), vec!["a", "b"]);
    }

    #[test]
    fn test_ascii_search_does_not_match_accented_word() {
        let mut spanish = task("a", TaskStatus::Pending, TaskPriority::Low, None);
        spanish.title = "Implementar autenticación".to_string();

        let auth = FilterSpec {
            search: "auth".to_string(),
            ..FilterSpec::default()
        };
        let auten = FilterSpec {
            search: "AUTEN".to_string(),
            ..FilterSpec::default()
        };
        assert!(!matches(&spanish, &auth));
        assert!(matches(&spanish, &auten));
    }

    #[test]
    fn test_active_filter_count() {
        let mut spec = FilterSpec::default();
        assert_eq!(spec.active_filter_count(), 0);

        spec.apply(
            FilterPatch::default()
                .status([TaskStatus::Pending])
                .priority([TaskPriority::High]),
        );
        assert_eq!(spec.active_filter_count(), 2);

        spec.apply(
            FilterPatch::default()
                .assigned_to(["u-1", "u-2"])
                .date_range(DateRange::from_strs(Some("2024-01-01"), Some("2024-02-01")))
                .search("deploy"),
        );
        assert_eq!(spec.active_filter_count(), 7);

        spec.apply(FilterPatch::default().search("   "));
        assert_eq!(spec.active_filter_count(), 7);

        spec.apply(FilterPatch::default().search(""));
        assert_eq!(spec.active_filter_count(), 6);
    }

    #[test]
    fn test_search_text_is_matched_verbatim() {
        let mut board = vec![task("a", TaskStatus::Pending, TaskPriority::Low, None)];
        board[0].title = "Authentication".to_string();

        let trailing = FilterSpec {
            search: "auth ".to_string(),
            ..FilterSpec::default()
        };
        assert!(filter_tasks(&board, &trailing).is_empty());

        let blank = FilterSpec {
            search: " ".to_string(),
            ..FilterSpec::default()
        };
        assert!(filter_tasks(&board, &blank).is_empty());

        board[0].title = "Rotate auth keys".to_string();
        assert_eq!(ids(&filter_tasks(&board, &trailing)), vec!["a"]);
        assert_eq!(ids(&filter_tasks(&board, &blank)), vec!["a"]);
    }

    #[test]
    fn test_patch_replaces_named_fields_only() {
        let mut spec = FilterSpec::default();
        spec.apply(
            FilterPatch::default()
                .status([TaskStatus::Pending, TaskStatus::InProgress])
                .search("api"),
        );
        spec.apply(FilterPatch::default().status([TaskStatus::Completed]));
        assert_eq!(spec.status, [TaskStatus::Completed].into_iter().collect());
        assert_eq!(spec.search, "api");
    }
}
