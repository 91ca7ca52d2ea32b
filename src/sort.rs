use crate::models::TaskRecord;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortField {
    Title,
    Status,
    Priority,
    DueDate,
    CreatedAt,
    UpdatedAt,
    /// Leaves the input order untouched. Unrecognized field names map here.
    Unsorted,
}

impl SortField {
    pub const CYCLE: [SortField; 6] = [
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::DueDate,
        SortField::Priority,
        SortField::Status,
        SortField::Title,
    ];

    pub fn from_name(name: &str) -> SortField {
        match name.trim().to_lowercase().as_str() {
            "title" => SortField::Title,
            "status" => SortField::Status,
            "priority" => SortField::Priority,
            "due_date" | "due" => SortField::DueDate,
            "created_at" | "created" => SortField::CreatedAt,
            "updated_at" | "updated" => SortField::UpdatedAt,
            _ => SortField::Unsorted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
            SortField::DueDate => "due_date",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Unsorted => "none",
        }
    }

    pub fn next(self) -> SortField {
        let position = SortField::CYCLE.iter().position(|f| *f == self);
        match position {
            Some(i) => SortField::CYCLE[(i + 1) % SortField::CYCLE.len()],
            None => SortField::CYCLE[0],
        }
    }

    fn compare(self, a: &TaskRecord, b: &TaskRecord) -> Ordering {
        match self {
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Status => a.status.rank().cmp(&b.status.rank()),
            SortField::Priority => a.priority.rank().cmp(&b.priority.rank()),
            // Undated tasks sort as the earliest possible date.
            SortField::DueDate => a
                .due_date
                .unwrap_or(NaiveDate::MIN)
                .cmp(&b.due_date.unwrap_or(NaiveDate::MIN)),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Unsorted => Ordering::Equal,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_name(name: &str) -> SortDirection {
        if name.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn toggled(self) -> SortDirection {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        SortSpec { field, direction }
    }

    pub fn from_names(field: &str, direction: &str) -> Self {
        SortSpec::new(SortField::from_name(field), SortDirection::from_name(direction))
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec::new(SortField::CreatedAt, SortDirection::Desc)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())
    }
}

/// Returns `tasks` ordered by `spec` as a new vector; the input is not touched.
pub fn sort_tasks<'a>(tasks: &[&'a TaskRecord], spec: &SortSpec) -> Vec<&'a TaskRecord> {
    let mut sorted = tasks.to_vec();
    match spec.direction {
        SortDirection::Asc => sorted.sort_by(|a, b| spec.field.compare(a, b)),
        SortDirection::Desc => sorted.sort_by(|a, b| spec.field.compare(a, b).reverse()),
    }
    sorted
}
