use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{Result, TodoError};
use crate::ids::MAX_ID;
use crate::model::{Task, Template};

pub const EXPORT_VERSION: u32 = 1;

pub trait Identified {
    fn id(&self) -> u64;
}

impl Identified for Task {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Identified for Template {
    fn id(&self) -> u64 {
        self.id
    }
}

/// Prepends `incoming` to `existing` and drops later items whose id was
/// already seen. Incoming items therefore replace existing ones, and the
/// surviving order is the scan order of the concatenation.
pub fn merge_by_id<T: Identified>(incoming: Vec<T>, existing: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    incoming
        .into_iter()
        .chain(existing)
        .filter(|item| seen.insert(item.id()))
        .collect()
}

/// Both collections as written by `export` and read by `import`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    pub todos: Vec<Task>,
    #[serde(default)]
    pub recurring_tasks: Vec<Template>,
}

fn default_version() -> u32 {
    EXPORT_VERSION
}

impl Bundle {
    pub fn new(todos: Vec<Task>, recurring_tasks: Vec<Template>, now: DateTime<Utc>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: Some(now),
            todos,
            recurring_tasks,
        }
    }
}

/// Parses an import file: the wrapped bundle, or a bare task array from
/// older exports. Any malformed item rejects the whole document.
pub fn parse_import(raw: &str) -> Result<Bundle> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| TodoError::ImportParse(e.to_string()))?;

    let bundle = if value.is_array() {
        let todos: Vec<Task> =
            serde_json::from_value(value).map_err(|e| TodoError::ImportParse(e.to_string()))?;
        Bundle {
            version: EXPORT_VERSION,
            exported_at: None,
            todos,
            recurring_tasks: Vec::new(),
        }
    } else if value.get("todos").is_some() {
        serde_json::from_value(value).map_err(|e| TodoError::ImportParse(e.to_string()))?
    } else {
        return Err(TodoError::ImportParse(
            "expected a task array or an object with `todos`".to_string(),
        ));
    };

    validate_items(&bundle)?;
    Ok(bundle)
}

/// Parses tasks from CSV with the same column names as the JSON fields.
pub fn parse_csv_tasks(raw: &str) -> Result<Vec<Task>> {
    let mut reader = csv::Reader::from_reader(raw.as_bytes());
    let todos = reader
        .deserialize::<Task>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TodoError::ImportParse(e.to_string()))?;

    let bundle = Bundle {
        version: EXPORT_VERSION,
        exported_at: None,
        todos,
        recurring_tasks: Vec::new(),
    };
    validate_items(&bundle)?;
    Ok(bundle.todos)
}

fn validate_items(bundle: &Bundle) -> Result<()> {
    let oversized = bundle
        .todos
        .iter()
        .map(|t| t.id)
        .chain(bundle.recurring_tasks.iter().map(|t| t.id))
        .find(|id| *id > MAX_ID);
    if let Some(id) = oversized {
        return Err(TodoError::ImportParse(format!("id {id} is out of range")));
    }
    if let Some(task) = bundle.todos.iter().find(|t| t.text.trim().is_empty()) {
        return Err(TodoError::ImportParse(format!("task {} has empty text", task.id)));
    }
    if let Some(template) = bundle
        .recurring_tasks
        .iter()
        .find(|t| t.text.trim().is_empty())
    {
        return Err(TodoError::ImportParse(format!(
            "recurring task {} has empty text",
            template.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    struct Item(u64, &'static str);

    impl Identified for Item {
        fn id(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn incoming_wins_and_order_is_stable() {
        let existing = vec![Item(1, "old one"), Item(2, "old two"), Item(3, "old three")];
        let incoming = vec![Item(4, "new four"), Item(2, "new two")];

        let merged = merge_by_id(incoming, existing);

        assert_eq!(
            merged,
            vec![
                Item(4, "new four"),
                Item(2, "new two"),
                Item(1, "old one"),
                Item(3, "old three"),
            ]
        );
    }

    #[test]
    fn duplicates_inside_incoming_keep_the_first() {
        let merged = merge_by_id(vec![Item(5, "a"), Item(5, "b")], Vec::new());
        assert_eq!(merged, vec![Item(5, "a")]);
    }

    #[test]
    fn bare_array_is_accepted() {
        let bundle = parse_import(r#"[{"id":1,"text":"legacy","priority":"low"}]"#).unwrap();
        assert_eq!(bundle.todos.len(), 1);
        assert!(bundle.recurring_tasks.is_empty());
    }

    #[test]
    fn wrapped_document_carries_templates() {
        let raw = r#"{
            "todos": [],
            "recurringTasks": [
                {"id": 9, "text": "Backup", "interval": "weekly", "lastCreated": null,
                 "createdAt": "2024-01-01T00:00:00Z"}
            ]
        }"#;
        let bundle = parse_import(raw).unwrap();
        assert_eq!(bundle.recurring_tasks[0].id, 9);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        for raw in [
            "not json",
            r#"{"tasks": []}"#,
            r#"42"#,
            r#"[{"id":1}]"#,
            r#"[{"id":1,"text":"   "}]"#,
            r#"[{"id":1,"text":"x","priority":"urgent"}]"#,
            r#"[{"id":18446744073709551615,"text":"too big"}]"#,
            r#"{"todos":[],"recurringTasks":[{"id":9007199254740992,"text":"x","interval":"daily"}]}"#,
        ] {
            let err = parse_import(raw).unwrap_err();
            assert!(matches!(err, TodoError::ImportParse(_)), "{raw}");
        }
    }

    #[test]
    fn csv_rows_become_tasks() {
        let raw = "id,text,reminder,priority,recurrence,completed,createdAt,notified\n\
                   11,Stretch,2024-04-01T07:00,high,daily,false,2024-03-01T00:00:00Z,false\n\
                   12,Read,,low,,true,2024-03-01T00:00:00Z,false\n";
        let tasks = parse_csv_tasks(raw).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].recurrence, Some(crate::model::Recurrence::Daily));
        assert_eq!(tasks[1].reminder, None);
        assert_eq!(tasks[1].recurrence, None);
        assert!(tasks[1].completed);
    }
}
