use std::cmp::Ordering;

use crate::model::{Priority, SortKey, Task};

pub fn sort_tasks(view: &mut [&Task], key: SortKey, desc: bool) {
    view.sort_by(|a, b| compare_tasks(a, b, key, desc));
}

fn compare_tasks(a: &Task, b: &Task, key: SortKey, desc: bool) -> Ordering {
    match key {
        SortKey::Reminder => compare_reminder(a, b, desc)
            .then_with(|| compare_priority(a, b, false))
            .then_with(|| a.id.cmp(&b.id)),
        SortKey::Priority => compare_priority(a, b, desc)
            .then_with(|| compare_reminder(a, b, false))
            .then_with(|| a.id.cmp(&b.id)),
        SortKey::Created => {
            let ord = a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id));
            if desc { ord.reverse() } else { ord }
        }
        SortKey::Id => {
            let ord = a.id.cmp(&b.id);
            if desc { ord.reverse() } else { ord }
        }
    }
}

/// Tasks without a reminder sort last in either direction.
fn compare_reminder(a: &Task, b: &Task, desc: bool) -> Ordering {
    match (a.reminder, b.reminder) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(ar), Some(br)) => {
            if desc {
                br.cmp(&ar)
            } else {
                ar.cmp(&br)
            }
        }
    }
}

fn compare_priority(a: &Task, b: &Task, desc: bool) -> Ordering {
    let ord = priority_rank(a.priority).cmp(&priority_rank(b.priority));
    if desc { ord.reverse() } else { ord }
}

pub fn priority_rank(p: Priority) -> u8 {
    match p {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}
