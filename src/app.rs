use crate::config::Settings;
use crate::filter::FilterPatch;
use crate::models::{NewTask, Project, TaskPriority, TaskRecord, TaskStatus};
use crate::parser::{parse_filter_query, parse_task_input};
use crate::source::{FetchScope, TaskSource};
use crate::view::{QuickFilter, TaskView};
use chrono::{Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct App {
    pub source: Arc<dyn TaskSource>,
    pub view: TaskView,
    pub projects: Vec<Project>,
    pub state: ListState,
    pub load_state: LoadState,
    pub input_mode: InputMode,
    pub active_input: ActiveInput,
    pub search_input: String,
    pub search_before: String,
    pub filter_input: String,
    pub new_task_title: String,
    pub new_task_description: String,
    pub default_project_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Search,
    Filter,
    Editing,
    Insert,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActiveInput {
    Title,
    Description,
}

impl App {
    pub fn new(source: Arc<dyn TaskSource>, settings: &Settings) -> App {
        App {
            source,
            view: TaskView::new(settings.user_id.clone(), settings.search_debounce()),
            projects: Vec::new(),
            state: ListState::default(),
            load_state: LoadState::Loading,
            input_mode: InputMode::Normal,
            active_input: ActiveInput::Title,
            search_input: String::new(),
            search_before: String::new(),
            filter_input: String::new(),
            new_task_title: String::new(),
            new_task_description: String::new(),
            default_project_id: settings.default_project_id.clone(),
            message: None,
        }
    }

    /// Fetches tasks and projects. A failed task fetch leaves an empty list
    /// and a message offering a retry.
    pub async fn reload(&mut self) {
        match self.source.fetch_tasks(&FetchScope::default()).await {
            Ok(tasks) => {
                info!(count = tasks.len(), source = self.source.name(), "tasks loaded");
                self.view.set_tasks(tasks);
                self.load_state = LoadState::Ready;
            }
            Err(err) => {
                error!(error = %err, "could not load tasks");
                self.view.set_tasks(Vec::new());
                self.load_state = LoadState::Failed(err.to_string());
            }
        }

        match self.source.fetch_projects().await {
            Ok(projects) => self.projects = projects,
            Err(err) => warn!(error = %err, "could not load projects"),
        }
        self.sync_selection();
    }

    pub fn selected_task(&self) -> Option<&TaskRecord> {
        self.state.selected().and_then(|i| self.view.visible().get(i))
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.project(id).map(|p| p.name.as_str()).unwrap_or(id)
    }

    fn sync_selection(&mut self) {
        let len = self.view.visible().len();
        if len == 0 {
            self.state.select(None);
        } else {
            let i = self.state.selected().unwrap_or(0).min(len - 1);
            self.state.select(Some(i));
        }
    }

    pub fn next(&mut self) {
        let len = self.view.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.view.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    /// Applies debounced search text whose delay has elapsed.
    pub fn tick(&mut self, now: Instant) {
        if self.view.flush_search(now) {
            self.sync_selection();
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn quick_filter(&mut self, quick: QuickFilter) {
        if !self.view.apply_quick_filter(quick, Self::today()) {
            self.message = Some("No user configured for \"my tasks\"".to_string());
        }
        self.sync_selection();
    }

    /// Writes the new status and updates the list once the source confirms.
    pub async fn set_selected_status(&mut self, status: TaskStatus) {
        let Some(id) = self.selected_task().map(|t| t.id.clone()) else {
            return;
        };
        match self.source.update_status(&id, status).await {
            Ok(task) => {
                info!(task = %id, %status, "status updated");
                self.view.replace_task(task);
                self.message = None;
            }
            Err(err) => {
                error!(task = %id, error = %err, "status update failed");
                self.message = Some(format!("Could not update task: {}", err));
            }
        }
        self.sync_selection();
    }

    /// Picks the project for a quick-added task: the single project being
    /// filtered on, then the configured default, then the first known one.
    fn target_project(&self) -> Option<String> {
        let filtered = &self.view.filters().projects;
        if filtered.len() == 1 {
            return filtered.iter().next().cloned();
        }
        self.default_project_id
            .clone()
            .or_else(|| self.projects.first().map(|p| p.id.clone()))
    }

    pub async fn submit_new_task(&mut self) {
        let parsed = parse_task_input(&self.new_task_title);
        if parsed.title.is_empty() {
            self.message = Some("Task title cannot be empty.".to_string());
            return;
        }
        let Some(project_id) = self.target_project() else {
            self.message = Some("No project to add the task to.".to_string());
            return;
        };

        let description = if self.new_task_description.trim().is_empty() {
            None
        } else {
            Some(self.new_task_description.trim().to_string())
        };

        let new_task = NewTask {
            title: parsed.title,
            description,
            status: TaskStatus::Pending,
            priority: parsed.priority.unwrap_or(TaskPriority::Medium),
            project_id,
            assigned_to: self.view.current_user_id().map(str::to_string),
            due_date: parsed.due_date,
        };

        match self.source.create_task(&new_task).await {
            Ok(task) => {
                info!(task = %task.id, "task created");
                self.view.insert_task(task);
                self.new_task_title.clear();
                self.new_task_description.clear();
                self.input_mode = InputMode::Normal;
                self.message = None;
            }
            Err(err) => {
                error!(error = %err, "task creation failed");
                self.message = Some(format!("Could not create task: {}", err));
            }
        }
        self.sync_selection();
    }

    /// Returns true when the application should quit.
    pub async fn handle_input(&mut self, key: KeyEvent) -> bool {
        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Char('/') => {
                    self.search_before = self.view.filters().search.clone();
                    self.search_input = self.search_before.clone();
                    self.input_mode = InputMode::Search;
                }
                KeyCode::Char('f') => {
                    self.filter_input.clear();
                    self.input_mode = InputMode::Filter;
                }
                KeyCode::Char('m') => self.quick_filter(QuickFilter::MyTasks),
                KeyCode::Char('u') => self.quick_filter(QuickFilter::Urgent),
                KeyCode::Char('o') => self.quick_filter(QuickFilter::Overdue),
                KeyCode::Char('c') => {
                    self.view.clear_filters();
                    self.sync_selection();
                }
                KeyCode::Char('s') => {
                    let mut sort = self.view.sort();
                    sort.field = sort.field.next();
                    self.view.set_sort(sort);
                }
                KeyCode::Char('S') => {
                    let mut sort = self.view.sort();
                    sort.direction = sort.direction.toggled();
                    self.view.set_sort(sort);
                }
                KeyCode::Char('x') => self.set_selected_status(TaskStatus::Completed).await,
                KeyCode::Char('X') => self.set_selected_status(TaskStatus::Cancelled).await,
                KeyCode::Char('p') => self.set_selected_status(TaskStatus::InProgress).await,
                KeyCode::Char('R') => self.set_selected_status(TaskStatus::Pending).await,
                KeyCode::Char('r') => {
                    self.load_state = LoadState::Loading;
                    self.reload().await;
                }
                KeyCode::Char('a') => {
                    self.input_mode = InputMode::Editing;
                    self.new_task_title.clear();
                    self.new_task_description.clear();
                    self.active_input = ActiveInput::Title;
                }
                _ => {}
            },

            InputMode::Search => match key.code {
                KeyCode::Char(c) => {
                    self.search_input.push(c);
                    self.view.queue_search(self.search_input.clone(), Instant::now());
                }
                KeyCode::Backspace => {
                    self.search_input.pop();
                    self.view.queue_search(self.search_input.clone(), Instant::now());
                }
                KeyCode::Enter => {
                    self.view.commit_search();
                    self.input_mode = InputMode::Normal;
                    self.sync_selection();
                }
                KeyCode::Esc => {
                    let previous = std::mem::take(&mut self.search_before);
                    self.view.set_filters(FilterPatch::default().search(previous));
                    self.input_mode = InputMode::Normal;
                    self.sync_selection();
                }
                _ => {}
            },

            InputMode::Filter => match key.code {
                KeyCode::Char(c) => self.filter_input.push(c),
                KeyCode::Backspace => {
                    self.filter_input.pop();
                }
                KeyCode::Enter => {
                    let patch = parse_filter_query(&self.filter_input, self.view.current_user_id());
                    if patch.is_empty() {
                        self.message = Some("No filters recognised.".to_string());
                    } else {
                        self.view.set_filters(patch);
                        self.message = None;
                    }
                    self.input_mode = InputMode::Normal;
                    self.sync_selection();
                }
                KeyCode::Esc => self.input_mode = InputMode::Normal,
                _ => {}
            },

            InputMode::Editing => match key.code {
                KeyCode::Char('i') => {
                    self.input_mode = InputMode::Insert;
                }
                KeyCode::Tab => {
                    self.active_input = match self.active_input {
                        ActiveInput::Title => ActiveInput::Description,
                        ActiveInput::Description => ActiveInput::Title,
                    };
                }
                KeyCode::Enter => self.submit_new_task().await,
                KeyCode::Esc => {
                    self.new_task_title.clear();
                    self.new_task_description.clear();
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },

            InputMode::Insert => match key.code {
                KeyCode::Char(c) => match self.active_input {
                    ActiveInput::Title => self.new_task_title.push(c),
                    ActiveInput::Description => self.new_task_description.push(c),
                },
                KeyCode::Backspace => match self.active_input {
                    ActiveInput::Title => {
                        self.new_task_title.pop();
                    }
                    ActiveInput::Description => {
                        self.new_task_description.pop();
                    }
                },
                KeyCode::Esc => {
                    self.input_mode = InputMode::Editing;
                }
                _ => {}
            },
        }
        false
    }
}
