use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::{ListFilter, Priority, Recurrence, SortKey};

#[derive(Parser)]
#[command(name = "todokeep", version, about = "Terminal todo list with reminders")]
pub struct Cli {
    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Directory holding tasks, templates, config and logs
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error, off
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task
    #[command(aliases = ["a", "create"])]
    Add {
        /// Task text, e.g. "Call the bank"
        text: String,

        /// Reminder: "YYYY-MM-DD HH:MM", "today HH:MM", "tomorrow HH:MM", "+30m", "+2h", "+1d"
        #[arg(short = 'r', long = "reminder")]
        reminder: Option<String>,

        /// Priority
        #[arg(short = 'p', long = "priority", value_enum, default_value = "medium")]
        priority: Priority,

        /// Repeat after completion
        #[arg(long = "repeat", value_enum)]
        repeat: Option<Recurrence>,
    },

    /// List tasks
    #[command(aliases = ["l", "ls"])]
    List {
        /// Which tasks to show
        #[arg(short = 'f', long = "filter", value_enum, default_value = "all")]
        filter: ListFilter,

        /// Sort by: reminder, priority, created, id (default: stored order)
        #[arg(short = 's', long = "sort", value_enum)]
        sort: Option<SortKey>,

        /// Sort descending
        #[arg(long = "desc")]
        desc: bool,
    },

    /// View a task by id
    #[command(alias = "v")]
    View { id: u64 },

    /// Toggle a task between open and completed
    #[command(alias = "t")]
    Toggle { id: u64 },

    /// Mark a task as completed
    #[command(alias = "d")]
    Done { id: u64 },

    /// Replace a task's text (prompts when no text is given)
    #[command(alias = "e")]
    Edit { id: u64, text: Option<String> },

    /// Delete a task by id
    #[command(aliases = ["x", "rm", "del"])]
    Delete {
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Remove all completed tasks
    #[command(alias = "clr")]
    Clear {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Show task counts
    #[command(alias = "st")]
    Stats,

    /// Manage recurring tasks
    #[command(aliases = ["tpl", "recurring"])]
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },

    /// Run one reminder sweep and one recurrence sweep, then exit
    Sweep,

    /// Stay running: fire reminders and create recurring tasks on schedule
    #[command(alias = "w")]
    Watch {
        /// Run a single tick and exit
        #[arg(long = "once")]
        once: bool,
    },

    /// Run a pomodoro timer
    #[command(aliases = ["pomo", "focus"])]
    Pomodoro {
        /// Stop after this many focus sessions
        #[arg(short = 'c', long = "cycles", default_value_t = 4)]
        cycles: u32,
    },

    /// Export tasks and recurring tasks
    #[command(aliases = ["ex", "out"])]
    Export {
        /// Export format
        #[arg(value_enum, default_value = "json")]
        format: ExportFormat,

        /// Write to a file instead of stdout ("-" picks todos-<date>.<ext>)
        #[arg(short = 'o', long = "output")]
        output: Option<String>,
    },

    /// Import and merge a file; imported items replace ones with the same id
    #[command(aliases = ["imp", "in"])]
    Import {
        /// Input file path
        file: PathBuf,

        /// Import format
        #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
        format: ImportFormat,
    },

    /// Show or update settings
    #[command(alias = "cfg")]
    Config {
        /// Default color output
        #[arg(long = "color")]
        color: Option<bool>,

        /// Mirror reminders to desktop notifications
        #[arg(long = "system-notifications")]
        system_notifications: Option<bool>,

        /// Seconds between reminder sweeps
        #[arg(long = "reminder-sweep-secs")]
        reminder_sweep_secs: Option<u64>,

        /// Seconds between recurrence sweeps
        #[arg(long = "recurrence-sweep-secs")]
        recurrence_sweep_secs: Option<u64>,

        /// Watch loop tick in milliseconds
        #[arg(long = "tick-ms")]
        tick_ms: Option<u64>,

        /// Default list sort key
        #[arg(long = "default-sort", value_enum)]
        default_sort: Option<SortKey>,

        /// Default log level
        #[arg(long = "default-log-level")]
        log_level: Option<String>,

        /// Pomodoro focus length in minutes
        #[arg(long = "focus-minutes")]
        focus_minutes: Option<u32>,

        /// Pomodoro short break in minutes
        #[arg(long = "short-break-minutes")]
        short_break_minutes: Option<u32>,

        /// Pomodoro long break in minutes
        #[arg(long = "long-break-minutes")]
        long_break_minutes: Option<u32>,

        /// Focus sessions before a long break
        #[arg(long = "long-break-every")]
        long_break_every: Option<u32>,
    },

    /// Generate shell completions
    #[command(aliases = ["comp", "completion"])]
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommand {
    /// Add a recurring task
    #[command(alias = "a")]
    Add {
        text: String,

        /// How often a new task is created
        #[arg(short = 'i', long = "interval", value_enum)]
        interval: Recurrence,
    },

    /// List recurring tasks
    #[command(aliases = ["l", "ls"])]
    List,

    /// Delete a recurring task by id
    #[command(aliases = ["x", "rm"])]
    Delete {
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ExportFormat {
    Json,
    #[value(alias = "md")]
    Markdown,
    Csv,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ImportFormat {
    Json,
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_parses_reminder_and_repeat() {
        let cli = Cli::parse_from([
            "todokeep", "add", "Stretch", "-r", "+10m", "-p", "high", "--repeat", "daily",
        ]);
        match cli.command {
            Commands::Add {
                text,
                reminder,
                priority,
                repeat,
            } => {
                assert_eq!(text, "Stretch");
                assert_eq!(reminder.as_deref(), Some("+10m"));
                assert_eq!(priority, Priority::High);
                assert_eq!(repeat, Some(Recurrence::Daily));
            }
            _ => panic!("expected add"),
        }
    }
}
