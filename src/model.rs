use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TASKS_KEY: &str = "todos";
pub const TEMPLATES_KEY: &str = "recurringTasks";

fn default_color() -> bool {
    true
}

fn default_system_notifications() -> bool {
    true
}

fn default_reminder_sweep_secs() -> u64 {
    60
}

fn default_recurrence_sweep_secs() -> u64 {
    60 * 60
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_focus_minutes() -> u32 {
    25
}

fn default_short_break_minutes() -> u32 {
    5
}

fn default_long_break_minutes() -> u32 {
    15
}

fn default_long_break_every() -> u32 {
    4
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_color")]
    pub color: bool,
    #[serde(default = "default_system_notifications")]
    pub system_notifications: bool,
    #[serde(default = "default_reminder_sweep_secs")]
    pub reminder_sweep_secs: u64,
    #[serde(default = "default_recurrence_sweep_secs")]
    pub recurrence_sweep_secs: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub default_sort: Option<SortKey>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            system_notifications: default_system_notifications(),
            reminder_sweep_secs: default_reminder_sweep_secs(),
            recurrence_sweep_secs: default_recurrence_sweep_secs(),
            tick_ms: default_tick_ms(),
            default_sort: None,
            log_level: default_log_level(),
            pomodoro: PomodoroConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PomodoroConfig {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// A long break replaces the short one after this many focus sessions.
    #[serde(default = "default_long_break_every")]
    pub long_break_every: u32,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            long_break_every: default_long_break_every(),
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, clap::ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Reminder,
    Priority,
    Created,
    Id,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl ListFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::Pending => !task.completed,
            ListFilter::Completed => task.completed,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, clap::ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Interval unit shared by recurring tasks and templates.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, clap::ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub text: String,
    /// Local wall-clock time, minute precision.
    #[serde(default, with = "reminder_format")]
    pub reminder: Option<NaiveDateTime>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notified: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: u64,
    pub text: String,
    pub interval: Recurrence,
    #[serde(default)]
    pub last_created: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the user when adding a task.
#[derive(Clone, Debug, Default)]
pub struct NewTask {
    pub text: String,
    pub reminder: Option<NaiveDateTime>,
    pub priority: Priority,
    pub recurrence: Option<Recurrence>,
}

pub mod reminder_format {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => serializer.serialize_str(&at.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse(value)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid reminder `{value}`"))),
        }
    }

    /// Accepts `YYYY-MM-DDTHH:MM`, with optional seconds, or RFC 3339.
    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        let naive = NaiveDateTime::parse_from_str(value, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(value)
                    .ok()
                    .map(|at| at.with_timezone(&Local).naive_local())
            })?;
        crate::util::truncate_to_minute(naive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn legacy_task_without_recurrence_or_notified_loads() {
        let raw = r#"{
            "id": 1700000000000,
            "text": "Buy milk",
            "reminder": "2024-05-01T09:30",
            "priority": "high",
            "completed": false,
            "createdAt": "2024-04-30T10:00:00.000Z"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.recurrence, None);
        assert!(!task.notified);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(
            task.reminder,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 30, 0)
        );
    }

    #[test]
    fn reminder_is_written_with_minute_precision() {
        let task = Task {
            id: 7,
            text: "Call".into(),
            reminder: NaiveDate::from_ymd_opt(2024, 2, 3)
                .unwrap()
                .and_hms_opt(8, 5, 0),
            priority: Priority::Low,
            recurrence: Some(Recurrence::Weekly),
            completed: false,
            created_at: Utc::now(),
            notified: false,
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["reminder"], "2024-02-03T08:05");
        assert_eq!(value["recurrence"], "weekly");
        assert_eq!(value["priority"], "low");
    }

    #[test]
    fn reminder_seconds_are_truncated_on_read() {
        let parsed = reminder_format::parse("2024-02-03T08:05:59").unwrap();
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "08:05:00");
    }

    #[test]
    fn null_and_empty_reminders_are_absent() {
        let task: Task =
            serde_json::from_str(r#"{"id":1,"text":"a","reminder":null}"#).unwrap();
        assert_eq!(task.reminder, None);
        let task: Task = serde_json::from_str(r#"{"id":1,"text":"a","reminder":""}"#).unwrap();
        assert_eq!(task.reminder, None);
    }

    #[test]
    fn unknown_recurrence_is_rejected() {
        let result: Result<Task, _> =
            serde_json::from_str(r#"{"id":1,"text":"a","recurrence":"hourly"}"#);
        assert!(result.is_err());
    }
}
