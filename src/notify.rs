//! Reminder delivery. Display is fire-and-forget: nothing here reports
//! whether the user actually saw the alert.

#[cfg(any(target_os = "macos", target_os = "linux"))]
use std::process::Command;

use owo_colors::OwoColorize;

use crate::model::Task;

pub trait Notifier {
    fn alert(&mut self, title: &str, body: &str);

    fn notify_task(&mut self, task: &Task) {
        self.alert("Todo reminder", &task.text);
    }
}

/// Prints alerts to the terminal and optionally mirrors them to the desktop.
pub struct TerminalNotifier {
    color: bool,
    system: bool,
}

impl TerminalNotifier {
    pub fn new(color: bool, system: bool) -> Self {
        Self { color, system }
    }
}

impl Notifier for TerminalNotifier {
    fn alert(&mut self, title: &str, body: &str) {
        let stamp = chrono::Local::now().format("%H:%M");
        if self.color {
            println!("{} {} {body}", stamp.dimmed(), format!("[{title}]").yellow().bold());
        } else {
            println!("{stamp} [{title}] {body}");
        }

        if self.system {
            send_system_notification(title, body);
        }
    }

    fn notify_task(&mut self, task: &Task) {
        log::info!("reminder fired id={}", task.id);
        self.alert("Todo reminder", &format!("⏰ {}", task.text));
    }
}

pub fn send_system_notification(title: &str, body: &str) {
    #[cfg(target_os = "macos")]
    {
        let script = format!(
            r#"display notification "{}" with title "{}""#,
            body.replace('"', "\\\""),
            title.replace('"', "\\\"")
        );

        let _ = Command::new("osascript").arg("-e").arg(&script).output();
    }

    #[cfg(target_os = "linux")]
    {
        let _ = Command::new("notify-send").arg(title).arg(body).output();
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = (title, body);
    }
}
