use chrono::{Local, NaiveDateTime};
use owo_colors::OwoColorize;

use crate::controller::Stats;
use crate::model::{Priority, Task, Template};

pub fn print_task_list(view: &[&Task], now: NaiveDateTime, color: bool) {
    if view.is_empty() {
        println!("No tasks yet, add one!");
        return;
    }

    for task in view {
        for line in task_lines(task, now, color) {
            println!("{line}");
        }
    }
}

fn task_lines(task: &Task, now: NaiveDateTime, color: bool) -> Vec<String> {
    let status = format_status(task.completed, color);
    let id = format_id(task.id, color);
    let text = format_text(&task.text, task.completed, color);
    let mut lines = vec![format!("[{status}] {id}  {text}")];

    let mut meta_parts: Vec<String> = vec![format!(
        "{} {}",
        format_label("priority:", color),
        format_priority(task.priority, color)
    )];
    if let Some(reminder) = task.reminder {
        meta_parts.push(format!(
            "{} {}",
            format_label("reminder:", color),
            format_reminder_colored(reminder, now, task.completed, color)
        ));
    }
    if let Some(unit) = task.recurrence {
        meta_parts.push(format!("{} {unit:?}", format_label("repeat:", color)));
    }
    meta_parts.push(format!(
        "{} {}",
        format_label("created:", color),
        task.created_at.with_timezone(&Local).format("%Y-%m-%d")
    ));

    lines.push(format!("    {}", meta_parts.join(" | ")));
    lines
}

pub fn print_task_view(task: &Task, now: NaiveDateTime, color: bool) {
    println!("{} {}", format_label("ID:", color), format_id(task.id, color));
    println!(
        "{} {}",
        format_label("Text:", color),
        format_text(&task.text, false, color)
    );
    println!(
        "{} {}",
        format_label("Priority:", color),
        format_priority(task.priority, color)
    );
    if let Some(reminder) = task.reminder {
        println!(
            "{} {} ({})",
            format_label("Reminder:", color),
            reminder.format("%Y-%m-%d %H:%M"),
            format_reminder(reminder, now)
        );
        println!(
            "{} {}",
            format_label("Notified:", color),
            if task.notified { "yes" } else { "no" }
        );
    }
    if let Some(unit) = task.recurrence {
        println!("{} {unit:?}", format_label("Repeat:", color));
    }
    println!(
        "{} {}",
        format_label("Status:", color),
        format_status(task.completed, color)
    );
    println!(
        "{} {}",
        format_label("Created:", color),
        task.created_at.with_timezone(&Local).to_rfc3339()
    );
}

pub fn print_template_list(templates: &[Template], color: bool) {
    if templates.is_empty() {
        println!("No recurring tasks.");
        return;
    }

    for template in templates {
        let last = template
            .last_created
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}  {}",
            format_id(template.id, color),
            format_text(&template.text, false, color)
        );
        println!(
            "    {} {:?} | {} {last}",
            format_label("interval:", color),
            template.interval,
            format_label("last created:", color)
        );
    }
}

pub fn print_stats(stats: Stats, color: bool) {
    println!(
        "{} {}  {} {}  {} {}",
        format_label("Total:", color),
        stats.total,
        format_label("Pending:", color),
        stats.pending,
        format_label("Completed:", color),
        stats.completed
    );
}

/// Human distance to a reminder: `overdue`, `in 2d 3h`, `in 4h 10m`, `in 12m`.
pub fn format_reminder(reminder: NaiveDateTime, now: NaiveDateTime) -> String {
    let diff = reminder - now;
    if diff < chrono::Duration::zero() {
        return "overdue".to_string();
    }

    let days = diff.num_days();
    let hours = diff.num_hours() % 24;
    let minutes = diff.num_minutes() % 60;

    if days > 0 {
        format!("in {days}d {hours}h")
    } else if hours > 0 {
        format!("in {hours}h {minutes}m")
    } else {
        format!("in {minutes}m")
    }
}

fn format_reminder_colored(
    reminder: NaiveDateTime,
    now: NaiveDateTime,
    completed: bool,
    color: bool,
) -> String {
    let text = format!("{} ({})", reminder.format("%Y-%m-%d %H:%M"), format_reminder(reminder, now));
    if !color {
        return text;
    }
    if completed {
        format!("{}", text.dimmed())
    } else if reminder < now {
        format!("{}", text.red())
    } else {
        format!("{}", text.cyan())
    }
}

fn format_status(completed: bool, color: bool) -> String {
    if completed {
        if color {
            format!("{}", "done".green())
        } else {
            "done".to_string()
        }
    } else if color {
        format!("{}", "todo".yellow())
    } else {
        "todo".to_string()
    }
}

fn format_id(id: u64, color: bool) -> String {
    let value = format!("#{id}");
    if color {
        format!("{}", value.dimmed())
    } else {
        value
    }
}

fn format_text(text: &str, completed: bool, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    if completed {
        format!("{}", text.strikethrough().dimmed())
    } else {
        format!("{}", text.bold())
    }
}

fn format_label(label: &str, color: bool) -> String {
    if color {
        format!("{}", label.dimmed())
    } else {
        label.to_string()
    }
}

fn format_priority(priority: Priority, color: bool) -> String {
    let text = format!("{priority:?}");
    if !color {
        return text;
    }

    match priority {
        Priority::High => format!("{}", text.red()),
        Priority::Medium => format!("{}", text.yellow()),
        Priority::Low => format!("{}", text.green()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn relative_reminder_text() {
        let base = now();
        assert_eq!(format_reminder(base - Duration::minutes(1), base), "overdue");
        assert_eq!(format_reminder(base + Duration::minutes(12), base), "in 12m");
        assert_eq!(
            format_reminder(base + Duration::minutes(4 * 60 + 10), base),
            "in 4h 10m"
        );
        assert_eq!(
            format_reminder(base + Duration::hours(51), base),
            "in 2d 3h"
        );
    }

    #[test]
    fn plain_lines_carry_metadata() {
        let task = Task {
            id: 5,
            text: "Dentist".into(),
            reminder: Some(now() + Duration::hours(2)),
            priority: Priority::High,
            recurrence: None,
            completed: false,
            created_at: chrono::Utc::now(),
            notified: false,
        };
        let lines = task_lines(&task, now(), false);
        assert_eq!(lines[0], "[todo] #5  Dentist");
        assert!(lines[1].contains("priority: High"));
        assert!(lines[1].contains("reminder: 2024-09-01 12:00 (in 2h 0m)"));
    }
}
