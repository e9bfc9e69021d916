use anyhow::{Context, Result};
use chrono::Local;

use crate::cli::ExportFormat;
use crate::merge::Bundle;

/// Renders the bundle in `format`. JSON output is the same shape `import`
/// reads back.
pub fn render_export(bundle: &Bundle, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(bundle).context("Failed to serialize export")
        }
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for task in &bundle.todos {
                writer.serialize(task).context("Failed to write CSV row")?;
            }
            let bytes = writer.into_inner().context("Failed to finish CSV output")?;
            String::from_utf8(bytes).context("CSV output is not UTF-8")
        }
        ExportFormat::Markdown => Ok(render_markdown(bundle)),
    }
}

fn render_markdown(bundle: &Bundle) -> String {
    let mut out = String::from("# Todos\n\n");
    for task in &bundle.todos {
        let status = if task.completed { "x" } else { " " };
        out.push_str(&format!("- [{status}] {} (#{})\n", task.text, task.id));
        out.push_str(&format!("  - priority: {:?}\n", task.priority));
        if let Some(reminder) = task.reminder {
            out.push_str(&format!("  - reminder: {}\n", reminder.format("%Y-%m-%d %H:%M")));
        }
        if let Some(unit) = task.recurrence {
            out.push_str(&format!("  - repeat: {unit:?}\n"));
        }
    }

    if !bundle.recurring_tasks.is_empty() {
        out.push_str("\n# Recurring\n\n");
        for template in &bundle.recurring_tasks {
            out.push_str(&format!(
                "- {} (#{}) every {:?}\n",
                template.text, template.id, template.interval
            ));
            if let Some(last) = template.last_created {
                out.push_str(&format!(
                    "  - last created: {}\n",
                    last.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                ));
            }
        }
    }
    out
}

pub fn default_export_name(format: ExportFormat) -> String {
    let ext = match format {
        ExportFormat::Json => "json",
        ExportFormat::Csv => "csv",
        ExportFormat::Markdown => "md",
    };
    format!("todos-{}.{ext}", Local::now().format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::parse_import;
    use crate::model::{Priority, Recurrence, Task, Template};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn bundle() -> Bundle {
        let task = Task {
            id: 1,
            text: "Plan trip".into(),
            reminder: chrono::NaiveDate::from_ymd_opt(2024, 8, 1)
                .and_then(|d| d.and_hms_opt(18, 30, 0)),
            priority: Priority::High,
            recurrence: Some(Recurrence::Yearly),
            completed: false,
            created_at: Utc::now(),
            notified: false,
        };
        let template = Template {
            id: 2,
            text: "Backup".into(),
            interval: Recurrence::Weekly,
            last_created: None,
            created_at: Utc::now(),
        };
        Bundle::new(vec![task], vec![template], Utc::now())
    }

    #[test]
    fn json_export_reads_back() {
        let original = bundle();
        let raw = render_export(&original, ExportFormat::Json).unwrap();
        let parsed = parse_import(&raw).unwrap();
        assert_eq!(parsed.todos, original.todos);
        assert_eq!(parsed.recurring_tasks, original.recurring_tasks);
        assert!(raw.contains("\"recurringTasks\""));
        assert!(raw.contains("\"reminder\": \"2024-08-01T18:30\""));
    }

    #[test]
    fn csv_export_has_json_field_names() {
        let raw = render_export(&bundle(), ExportFormat::Csv).unwrap();
        let header = raw.lines().next().unwrap();
        assert_eq!(
            header,
            "id,text,reminder,priority,recurrence,completed,createdAt,notified"
        );
    }

    #[test]
    fn markdown_lists_templates() {
        let raw = render_export(&bundle(), ExportFormat::Markdown).unwrap();
        assert!(raw.contains("- [ ] Plan trip (#1)"));
        assert!(raw.contains("- Backup (#2) every Weekly"));
    }
}
