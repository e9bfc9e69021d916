use chrono::NaiveDateTime;
use std::collections::HashSet;

use crate::model::Task;
use crate::notify::Notifier;

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingReminder {
    task_id: u64,
    fire_at: NaiveDateTime,
}

/// One-shot reminder timers. Entries are never cancelled: deleting or
/// completing a task leaves its entry in place and `fire_due` re-checks the
/// live collection instead. `armed` mirrors the ids still pending.
#[derive(Debug, Default)]
pub struct ReminderTimers {
    pending: Vec<PendingReminder>,
    armed: HashSet<u64>,
}

impl ReminderTimers {
    /// Arms a timer when the reminder is strictly in the future. Each task id
    /// is armed at most once.
    pub fn schedule(&mut self, task: &Task, now: NaiveDateTime) -> bool {
        let Some(fire_at) = task.reminder else {
            return false;
        };
        if fire_at <= now || self.armed.contains(&task.id) {
            return false;
        }

        self.armed.insert(task.id);
        self.pending.push(PendingReminder {
            task_id: task.id,
            fire_at,
        });
        true
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Fires every timer whose time has come. A task that is gone or already
    /// completed at fire time is skipped silently. Returns the notified ids.
    pub fn fire_due(
        &mut self,
        tasks: &[Task],
        now: NaiveDateTime,
        notifier: &mut dyn Notifier,
    ) -> Vec<u64> {
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|entry| entry.fire_at <= now);
        self.pending = waiting;

        let mut fired = Vec::new();
        for entry in due {
            self.armed.remove(&entry.task_id);
            match tasks.iter().find(|t| t.id == entry.task_id) {
                Some(task) if !task.completed => {
                    notifier.notify_task(task);
                    fired.push(task.id);
                }
                Some(_) => log::debug!("timer skipped, task completed id={}", entry.task_id),
                None => log::debug!("timer skipped, task removed id={}", entry.task_id),
            }
        }
        fired
    }
}

/// Notifies every open task whose reminder has passed and marks it notified.
/// Returns the notified ids; the caller persists when the list is non-empty.
pub fn sweep_reminders(
    tasks: &mut [Task],
    now: NaiveDateTime,
    notifier: &mut dyn Notifier,
) -> Vec<u64> {
    let mut notified = Vec::new();
    for task in tasks.iter_mut() {
        if task.completed || task.notified {
            continue;
        }
        let Some(reminder) = task.reminder else {
            continue;
        };
        if now >= reminder {
            notifier.notify_task(task);
            task.notified = true;
            notified.push(task.id);
        }
    }
    notified
}
