use crate::filter::{DateRange, FilterPatch};
use crate::models::{parse_date, TaskPriority, TaskStatus};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn priority_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!([A-Za-z]+|\d+)\s*").expect("priority pattern"))
}

fn due_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"due:(\S+)\s*").expect("due pattern"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"))
}

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(status|priority|project|assignee|due):(.*)$").expect("field pattern")
    })
}

fn priority_token(token: &str) -> Option<TaskPriority> {
    match token.parse::<u8>() {
        Ok(rank) => TaskPriority::from_rank(rank),
        Err(_) => TaskPriority::parse(token),
    }
}

#[derive(Debug, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

/// Splits a quick-add line into title, `!priority` and `due:DATE`. The first
/// valid priority wins; every marker is removed from the title.
pub fn parse_task_input(input: &str) -> ParsedTask {
    let mut priority = None;
    for caps in priority_re().captures_iter(input) {
        if let Some(p) = caps.get(1).and_then(|m| priority_token(m.as_str())) {
            if priority.is_none() {
                priority = Some(p);
            }
        }
    }

    let due_date = due_re()
        .captures_iter(input)
        .find_map(|caps| caps.get(1).and_then(|m| parse_date(m.as_str())));

    let title = priority_re().replace_all(input, "");
    let title = due_re().replace_all(&title, "");
    let title = whitespace_re().replace_all(&title, " ").trim().to_string();

    ParsedTask {
        title,
        priority,
        due_date,
    }
}

fn split_values(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|v| !v.is_empty())
}

fn parse_due_range(raw: &str) -> DateRange {
    match raw.split_once("..") {
        Some((start, end)) => DateRange::from_strs(Some(start), Some(end)),
        None => DateRange::from_strs(Some(raw), Some(raw)),
    }
}

/// Parses the filter prompt into a patch that only names the fields the
/// query mentions:
///
/// `status:pending,in_progress priority:high project:p-1 assignee:me|@me
/// due:2024-01-01..2024-01-31 !urgent free text`
///
/// Unknown values are skipped. Leftover words become the search text.
pub fn parse_filter_query(input: &str, current_user: Option<&str>) -> FilterPatch {
    let mut patch = FilterPatch::default();
    let mut words: Vec<&str> = Vec::new();

    let me = |value: &str| -> Option<String> {
        if value == "me" || value == "@me" {
            current_user.map(str::to_string)
        } else {
            Some(value.to_string())
        }
    };

    for token in input.split_whitespace() {
        if token == "@me" {
            if let Some(user) = current_user {
                patch
                    .assigned_to
                    .get_or_insert_with(BTreeSet::new)
                    .insert(user.to_string());
            }
            continue;
        }
        if let Some(shorthand) = token.strip_prefix('!') {
            if let Some(p) = priority_token(shorthand) {
                patch.priority.get_or_insert_with(BTreeSet::new).insert(p);
                continue;
            }
        }
        let Some(caps) = field_re().captures(token) else {
            words.push(token);
            continue;
        };
        let value = &caps[2];
        match &caps[1] {
            "status" => {
                let set = patch.status.get_or_insert_with(BTreeSet::new);
                set.extend(split_values(value).filter_map(TaskStatus::parse));
            }
            "priority" => {
                let set = patch.priority.get_or_insert_with(BTreeSet::new);
                set.extend(split_values(value).filter_map(priority_token));
            }
            "project" => {
                let set = patch.projects.get_or_insert_with(BTreeSet::new);
                set.extend(split_values(value).map(str::to_string));
            }
            "assignee" => {
                let set = patch.assigned_to.get_or_insert_with(BTreeSet::new);
                set.extend(split_values(value).filter_map(&me));
            }
            "due" => patch.date_range = Some(parse_due_range(value)),
            _ => words.push(token),
        }
    }

    if !words.is_empty() {
        patch.search = Some(words.join(" "));
    }
    patch
}
