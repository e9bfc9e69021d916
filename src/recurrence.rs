//! Recurring work: templates materialize tasks on a coarse cadence, and
//! completing a recurring task spawns its successor immediately.
//!
//! The due check counts fixed days (a month is 30, a year 365) while the
//! reminder of the produced task uses calendar arithmetic. Both rules are
//! kept as they are.

use chrono::{DateTime, Local, NaiveDateTime, Utc};

use crate::ids::IdGenerator;
use crate::model::{Priority, Recurrence, Task, Template};
use crate::util::{advance_by, truncate_to_minute};

impl Recurrence {
    pub fn day_threshold(self) -> i64 {
        match self {
            Recurrence::Daily => 1,
            Recurrence::Weekly => 7,
            Recurrence::Monthly => 30,
            Recurrence::Yearly => 365,
        }
    }
}

pub fn template_is_due(template: &Template, now: DateTime<Utc>) -> bool {
    match template.last_created {
        None => true,
        Some(last) => (now - last).num_days() >= template.interval.day_threshold(),
    }
}

/// Reminder for an occurrence materialized at `now`.
pub fn next_due(now: NaiveDateTime, unit: Recurrence) -> Option<NaiveDateTime> {
    advance_by(now, unit).and_then(truncate_to_minute)
}

/// Materializes one task per due template and stamps `last_created`.
/// Returned tasks are in template order.
pub fn materialize_due(
    templates: &mut [Template],
    now: DateTime<Local>,
    ids: &mut IdGenerator,
) -> Vec<Task> {
    let now_utc = now.with_timezone(&Utc);
    let mut created = Vec::new();

    for template in templates.iter_mut() {
        if !template_is_due(template, now_utc) {
            continue;
        }
        let Some(reminder) = next_due(now.naive_local(), template.interval) else {
            log::warn!("template id={} skipped, due date out of range", template.id);
            continue;
        };
        let Some(id) = ids.next(now_utc) else {
            log::warn!("template id={} skipped, no free ids left", template.id);
            continue;
        };

        created.push(Task {
            id,
            text: template.text.clone(),
            reminder: Some(reminder),
            priority: Priority::Medium,
            recurrence: Some(template.interval),
            completed: false,
            created_at: now_utc,
            notified: false,
        });
        template.last_created = Some(now_utc);
    }

    created
}

/// Next occurrence of a recurring task completed at `now`, or `None` for a
/// one-off task.
pub fn successor(task: &Task, now: DateTime<Local>, ids: &mut IdGenerator) -> Option<Task> {
    let unit = task.recurrence?;
    let reminder = next_due(now.naive_local(), unit)?;
    let now_utc = now.with_timezone(&Utc);

    Some(Task {
        id: ids.next(now_utc)?,
        text: task.text.clone(),
        reminder: Some(reminder),
        priority: task.priority,
        recurrence: Some(unit),
        completed: false,
        created_at: now_utc,
        notified: false,
    })
}
