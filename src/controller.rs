//! The single owner of both collections. Every mutating method writes the
//! affected collection back to the store before it returns.

use chrono::{DateTime, Local, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashSet;

use crate::error::{Result, TodoError};
use crate::ids::IdGenerator;
use crate::merge::{Bundle, Identified, merge_by_id, parse_csv_tasks, parse_import};
use crate::model::{NewTask, Recurrence, TASKS_KEY, TEMPLATES_KEY, Task, Template};
use crate::notify::Notifier;
use crate::recurrence::{materialize_due, successor};
use crate::reminder::{ReminderTimers, sweep_reminders};
use crate::storage::{KeyValueStore, load_list, save_list};
use crate::util::{Confirm, truncate_to_minute};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Missing,
    Reopened,
    Completed { successor: Option<u64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Missing,
    Declined,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    NothingCompleted,
    Declined,
    Cleared(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub tasks_read: usize,
    pub templates_read: usize,
    pub tasks_added: usize,
    pub templates_added: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

pub struct TodoApp<S: KeyValueStore> {
    store: S,
    tasks: Vec<Task>,
    templates: Vec<Template>,
    task_ids: IdGenerator,
    template_ids: IdGenerator,
    timers: ReminderTimers,
}

impl<S: KeyValueStore> TodoApp<S> {
    pub fn open(store: S) -> Result<Self> {
        let tasks: Vec<Task> = load_unique(&store, TASKS_KEY)?;
        let templates: Vec<Template> = load_unique(&store, TEMPLATES_KEY)?;
        log::debug!(
            "loaded tasks={} templates={}",
            tasks.len(),
            templates.len()
        );

        Ok(Self {
            task_ids: IdGenerator::seeded(tasks.iter().map(|t| t.id)),
            template_ids: IdGenerator::seeded(templates.iter().map(|t| t.id)),
            store,
            tasks,
            templates,
            timers: ReminderTimers::default(),
        })
    }

    /// Re-reads both collections, picking up writes made by other commands.
    /// Pending timers survive and are validated against the fresh state.
    pub fn reload(&mut self) -> Result<()> {
        self.tasks = load_unique(&self.store, TASKS_KEY)?;
        self.templates = load_unique(&self.store, TEMPLATES_KEY)?;
        for task in &self.tasks {
            self.task_ids.observe(task.id);
        }
        for template in &self.templates {
            self.template_ids.observe(template.id);
        }
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn stats(&self) -> Stats {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        Stats {
            total: self.tasks.len(),
            pending: self.tasks.len() - completed,
            completed,
        }
    }

    /// Adds a task at the front of the list and arms its one-shot reminder.
    pub fn add_task(&mut self, draft: NewTask, now: DateTime<Local>) -> Result<u64> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(TodoError::EmptyText);
        }

        let now_utc = now.with_timezone(&Utc);
        let task = Task {
            id: self.task_ids.next(now_utc).ok_or(TodoError::IdsExhausted)?,
            text: text.to_string(),
            reminder: draft.reminder.and_then(truncate_to_minute),
            priority: draft.priority,
            recurrence: draft.recurrence,
            completed: false,
            created_at: now_utc,
            notified: false,
        };
        let id = task.id;

        self.timers.schedule(&task, now.naive_local());
        self.tasks.insert(0, task);
        self.save_tasks()?;
        log::info!("task added id={id}");
        Ok(id)
    }

    /// Flips completion. Completing a recurring task inserts its successor.
    pub fn toggle_task(&mut self, id: u64, now: DateTime<Local>) -> Result<ToggleOutcome> {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(ToggleOutcome::Missing);
        };

        let task = &mut self.tasks[pos];
        task.completed = !task.completed;
        if !task.completed {
            self.save_tasks()?;
            log::info!("task reopened id={id}");
            return Ok(ToggleOutcome::Reopened);
        }

        let next = successor(task, now, &mut self.task_ids);
        let next_id = next.as_ref().map(|t| t.id);
        if let Some(next) = next {
            self.timers.schedule(&next, now.naive_local());
            self.tasks.insert(0, next);
        }
        self.save_tasks()?;
        log::info!("task completed id={id} successor={next_id:?}");
        Ok(ToggleOutcome::Completed { successor: next_id })
    }

    /// Completes an open task; already completed tasks are left alone.
    pub fn complete_task(&mut self, id: u64, now: DateTime<Local>) -> Result<ToggleOutcome> {
        match self.task(id) {
            None => Ok(ToggleOutcome::Missing),
            Some(task) if task.completed => Ok(ToggleOutcome::Completed { successor: None }),
            Some(_) => self.toggle_task(id, now),
        }
    }

    /// Replaces the text of a task. Returns `false` when the id is unknown.
    pub fn edit_task(&mut self, id: u64, text: &str) -> Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(TodoError::EmptyText);
        }
        task.text = text.to_string();
        self.save_tasks()?;
        log::info!("task edited id={id}");
        Ok(true)
    }

    /// Removes a task after confirmation. A pending timer for it stays armed
    /// and becomes a no-op when it fires.
    pub fn delete_task(&mut self, id: u64, confirm: &mut dyn Confirm) -> Result<RemoveOutcome> {
        if self.task(id).is_none() {
            return Ok(RemoveOutcome::Missing);
        }
        if !confirm.confirm("Delete this task?") {
            return Ok(RemoveOutcome::Declined);
        }
        self.tasks.retain(|t| t.id != id);
        self.save_tasks()?;
        log::info!("task deleted id={id}");
        Ok(RemoveOutcome::Removed)
    }

    pub fn clear_completed(&mut self, confirm: &mut dyn Confirm) -> Result<ClearOutcome> {
        let count = self.tasks.iter().filter(|t| t.completed).count();
        if count == 0 {
            return Ok(ClearOutcome::NothingCompleted);
        }
        if !confirm.confirm(&format!("Clear {count} completed tasks?")) {
            return Ok(ClearOutcome::Declined);
        }
        self.tasks.retain(|t| !t.completed);
        self.save_tasks()?;
        log::info!("cleared completed count={count}");
        Ok(ClearOutcome::Cleared(count))
    }

    pub fn add_template(
        &mut self,
        text: &str,
        interval: Recurrence,
        now: DateTime<Local>,
    ) -> Result<u64> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TodoError::EmptyText);
        }
        let now_utc = now.with_timezone(&Utc);
        let id = self
            .template_ids
            .next(now_utc)
            .ok_or(TodoError::IdsExhausted)?;
        self.templates.push(Template {
            id,
            text: text.to_string(),
            interval,
            last_created: None,
            created_at: now_utc,
        });
        self.save_templates()?;
        log::info!("template added id={id} interval={interval:?}");
        Ok(id)
    }

    pub fn delete_template(&mut self, id: u64, confirm: &mut dyn Confirm) -> Result<RemoveOutcome> {
        if !self.templates.iter().any(|t| t.id == id) {
            return Ok(RemoveOutcome::Missing);
        }
        if !confirm.confirm("Delete this recurring task?") {
            return Ok(RemoveOutcome::Declined);
        }
        self.templates.retain(|t| t.id != id);
        self.save_templates()?;
        log::info!("template deleted id={id}");
        Ok(RemoveOutcome::Removed)
    }

    /// Arms one-shot timers for every task with a future reminder that has
    /// not been armed yet in this process.
    pub fn arm_timers(&mut self, now: DateTime<Local>) -> usize {
        let now = now.naive_local();
        let mut armed = 0;
        for task in &self.tasks {
            if self.timers.schedule(task, now) {
                armed += 1;
            }
        }
        armed
    }

    pub fn fire_timers(&mut self, now: DateTime<Local>, notifier: &mut dyn Notifier) -> Vec<u64> {
        self.timers
            .fire_due(&self.tasks, now.naive_local(), notifier)
    }

    pub fn sweep_reminders(
        &mut self,
        now: DateTime<Local>,
        notifier: &mut dyn Notifier,
    ) -> Result<Vec<u64>> {
        let notified = sweep_reminders(&mut self.tasks, now.naive_local(), notifier);
        log::debug!("reminder sweep notified={}", notified.len());
        if !notified.is_empty() {
            self.save_tasks()?;
        }
        Ok(notified)
    }

    /// Materializes tasks from due templates. Returns the new task ids.
    pub fn sweep_recurrence(&mut self, now: DateTime<Local>) -> Result<Vec<u64>> {
        let created = materialize_due(&mut self.templates, now, &mut self.task_ids);
        log::debug!("recurrence sweep created={}", created.len());
        if created.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<u64> = created.iter().map(|t| t.id).collect();
        for task in &created {
            self.timers.schedule(task, now.naive_local());
        }
        self.tasks.splice(0..0, created);
        self.save_tasks()?;
        self.save_templates()?;
        log::info!("materialized tasks={ids:?}");
        Ok(ids)
    }

    /// Merges a JSON import. On any parse error nothing changes.
    pub fn import_json(&mut self, raw: &str) -> Result<ImportSummary> {
        let bundle = parse_import(raw)?;
        self.apply_import(bundle.todos, bundle.recurring_tasks)
    }

    pub fn import_csv(&mut self, raw: &str) -> Result<ImportSummary> {
        let todos = parse_csv_tasks(raw)?;
        self.apply_import(todos, Vec::new())
    }

    fn apply_import(
        &mut self,
        todos: Vec<Task>,
        templates: Vec<Template>,
    ) -> Result<ImportSummary> {
        let summary = ImportSummary {
            tasks_read: todos.len(),
            templates_read: templates.len(),
            tasks_added: count_new(&todos, &self.tasks),
            templates_added: count_new(&templates, &self.templates),
        };

        for task in &todos {
            self.task_ids.observe(task.id);
        }
        for template in &templates {
            self.template_ids.observe(template.id);
        }

        if !todos.is_empty() {
            let existing = std::mem::take(&mut self.tasks);
            self.tasks = merge_by_id(todos, existing);
            self.save_tasks()?;
        }
        if !templates.is_empty() {
            let existing = std::mem::take(&mut self.templates);
            self.templates = merge_by_id(templates, existing);
            self.save_templates()?;
        }

        log::info!("import {summary:?}");
        Ok(summary)
    }

    pub fn export_bundle(&self, now: DateTime<Local>) -> Bundle {
        Bundle::new(
            self.tasks.clone(),
            self.templates.clone(),
            now.with_timezone(&Utc),
        )
    }

    fn save_tasks(&mut self) -> Result<()> {
        save_list(&mut self.store, TASKS_KEY, &self.tasks)?;
        Ok(())
    }

    fn save_templates(&mut self) -> Result<()> {
        save_list(&mut self.store, TEMPLATES_KEY, &self.templates)?;
        Ok(())
    }
}

/// Loads a list and keeps the first item for each id.
fn load_unique<T, S>(store: &S, key: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned + Identified,
    S: KeyValueStore,
{
    let items: Vec<T> = load_list(store, key)?;
    let stored = items.len();
    let items = merge_by_id(items, Vec::new());
    if items.len() < stored {
        log::warn!("stored `{key}` had {} duplicate ids", stored - items.len());
    }
    Ok(items)
}

/// Distinct incoming ids that are not in `existing`.
fn count_new<T: Identified>(incoming: &[T], existing: &[T]) -> usize {
    let known: HashSet<u64> = existing.iter().map(Identified::id).collect();
    incoming
        .iter()
        .map(Identified::id)
        .filter(|id| !known.contains(id))
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use crate::storage::MemoryStore;
    use crate::util::AssumeYes;
    use chrono::TimeZone;

    struct Decline;

    impl Confirm for Decline {
        fn confirm(&mut self, _prompt: &str) -> bool {
            false
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap()
    }

    fn draft(text: &str) -> NewTask {
        NewTask {
            text: text.to_string(),
            ..NewTask::default()
        }
    }

    #[test]
    fn empty_text_is_rejected_without_writing() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        let err = app.add_task(draft("   "), now()).unwrap_err();
        assert!(matches!(err, TodoError::EmptyText));
        assert!(app.tasks().is_empty());
        assert!(app.store().get(TASKS_KEY).unwrap().is_none());
    }

    #[test]
    fn add_persists_and_prepends() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        let first = app.add_task(draft("first"), now()).unwrap();
        let second = app.add_task(draft(" second "), now()).unwrap();

        assert_ne!(first, second);
        assert_eq!(app.tasks()[0].text, "second");

        let reopened = TodoApp::open(app.store().clone()).unwrap();
        assert_eq!(reopened.tasks().len(), 2);
        assert_eq!(reopened.tasks()[0].priority, Priority::Medium);
    }

    #[test]
    fn missing_ids_are_no_ops() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        assert_eq!(app.toggle_task(99, now()).unwrap(), ToggleOutcome::Missing);
        assert!(!app.edit_task(99, "x").unwrap());
        assert_eq!(
            app.delete_task(99, &mut AssumeYes).unwrap(),
            RemoveOutcome::Missing
        );
    }

    #[test]
    fn declined_delete_keeps_task() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        let id = app.add_task(draft("keep me"), now()).unwrap();
        assert_eq!(app.delete_task(id, &mut Decline).unwrap(), RemoveOutcome::Declined);
        assert_eq!(app.tasks().len(), 1);
    }

    #[test]
    fn clear_reports_when_nothing_completed() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        app.add_task(draft("open"), now()).unwrap();
        assert_eq!(
            app.clear_completed(&mut AssumeYes).unwrap(),
            ClearOutcome::NothingCompleted
        );

        let id = app.add_task(draft("done"), now()).unwrap();
        app.toggle_task(id, now()).unwrap();
        assert_eq!(app.clear_completed(&mut AssumeYes).unwrap(), ClearOutcome::Cleared(1));
        assert_eq!(app.stats().total, 1);
    }

    #[test]
    fn reopening_does_not_spawn_a_successor() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        let id = app
            .add_task(
                NewTask {
                    text: "daily standup".into(),
                    recurrence: Some(Recurrence::Daily),
                    ..NewTask::default()
                },
                now(),
            )
            .unwrap();

        let done = app.toggle_task(id, now()).unwrap();
        assert!(matches!(done, ToggleOutcome::Completed { successor: Some(_) }));
        assert_eq!(app.toggle_task(id, now()).unwrap(), ToggleOutcome::Reopened);
        assert_eq!(app.tasks().len(), 2);
    }

    #[test]
    fn complete_is_idempotent() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        let id = app.add_task(draft("once"), now()).unwrap();
        app.complete_task(id, now()).unwrap();
        app.complete_task(id, now()).unwrap();
        assert!(app.task(id).unwrap().completed);
    }

    #[test]
    fn edit_of_missing_id_is_a_no_op_even_with_blank_text() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        assert!(!app.edit_task(99, "   ").unwrap());

        let id = app.add_task(draft("real"), now()).unwrap();
        assert!(matches!(app.edit_task(id, " "), Err(TodoError::EmptyText)));
        assert_eq!(app.task(id).unwrap().text, "real");
    }

    #[test]
    fn duplicate_stored_ids_are_collapsed_on_open() {
        let mut store = MemoryStore::default();
        store
            .set(
                TASKS_KEY,
                r#"[{"id": 1, "text": "first"}, {"id": 1, "text": "second"}]"#,
            )
            .unwrap();

        let mut app = TodoApp::open(store).unwrap();
        assert_eq!(app.tasks().len(), 1);
        assert_eq!(app.tasks()[0].text, "first");

        let summary = app.import_json(r#"[{"id": 1, "text": "z"}]"#).unwrap();
        assert_eq!(summary.tasks_added, 0);
        assert_eq!(app.tasks().len(), 1);
        assert_eq!(app.tasks()[0].text, "z");
    }

    #[test]
    fn import_counts_only_unseen_ids() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        let id = app.add_task(draft("existing"), now()).unwrap();
        let raw = format!(
            r#"[{{"id": {id}, "text": "replaced"}}, {{"id": 5, "text": "a"}}, {{"id": 5, "text": "b"}}]"#
        );

        let summary = app.import_json(&raw).unwrap();

        assert_eq!(summary.tasks_read, 3);
        assert_eq!(summary.tasks_added, 1);
        assert_eq!(app.tasks().len(), 2);
    }

    #[test]
    fn corrupt_stored_list_fails_open_and_keeps_bytes() {
        let raw = r#"[{"id": 1, "text": "keep me"}, {"id": 2, "text": "x", "priority": "urgent"}]"#;
        let mut store = MemoryStore::default();
        store.set(TASKS_KEY, raw).unwrap();

        let err = TodoApp::open(store.clone()).err().unwrap();
        assert!(matches!(err, TodoError::Storage(_)));
        assert_eq!(store.get(TASKS_KEY).unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn exhausted_ids_are_an_error_not_a_reuse() {
        let mut store = MemoryStore::default();
        store
            .set(TASKS_KEY, r#"[{"id": 18446744073709551615, "text": "last"}]"#)
            .unwrap();
        let mut app = TodoApp::open(store).unwrap();

        let err = app.add_task(draft("one more"), now()).unwrap_err();

        assert!(matches!(err, TodoError::IdsExhausted));
        assert_eq!(app.tasks().len(), 1);
    }

    #[test]
    fn failed_import_leaves_state_untouched() {
        let mut app = TodoApp::open(MemoryStore::default()).unwrap();
        app.add_task(draft("existing"), now()).unwrap();
        let before = app.tasks().to_vec();

        let err = app.import_json(r#"[{"id": 1, "text": "ok"}, {"id": 2}]"#).unwrap_err();

        assert!(matches!(err, TodoError::ImportParse(_)));
        assert_eq!(app.tasks(), before.as_slice());
    }
}
