use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use std::io::Write;
use std::path::Path;

use crate::cli::{Cli, Commands, ImportFormat, TemplateCommand};
use crate::controller::{ClearOutcome, RemoveOutcome, TodoApp, ToggleOutcome};
use crate::display::{print_stats, print_task_list, print_task_view, print_template_list};
use crate::export::{default_export_name, render_export};
use crate::logging::init_logging;
use crate::model::{AppConfig, NewTask, Task};
use crate::notify::{Notifier, TerminalNotifier};
use crate::pomodoro::{Phase, Pomodoro, format_countdown};
use crate::sort::sort_tasks;
use crate::storage::{FileStore, config_path, default_data_dir, load_config, save_config};
use crate::ticker::{Cadence, tick_duration};
use crate::util::{AssumeYes, Confirm, TerminalConfirm, parse_reminder, prompt_input};

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let config_file = config_path(&data_dir);
    let mut config = load_config(&config_file);

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    if let Err(err) = init_logging(&level, &data_dir.join("logs")) {
        eprintln!("Logging disabled: {err:#}");
    }

    let color = !cli.no_color && config.color;

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::Config { .. } = cli.command {
        return handle_config(cli.command, &mut config, &config_file);
    }

    let store = FileStore::open(&data_dir)?;
    let mut app = TodoApp::open(store)?;

    match cli.command {
        Commands::Completions { .. } | Commands::Config { .. } => {
            // Handled before the store is opened.
        }

        Commands::Add {
            text,
            reminder,
            priority,
            repeat,
        } => {
            let now = Local::now();
            let reminder = reminder
                .as_deref()
                .map(|value| parse_reminder(value, now.naive_local()))
                .transpose()
                .map_err(|e| anyhow::anyhow!("Invalid reminder: {e}"))?;

            let id = app.add_task(
                NewTask {
                    text,
                    reminder,
                    priority,
                    recurrence: repeat,
                },
                now,
            )?;
            println!("Added task #{id}");
            if reminder.is_some_and(|at| at <= now.naive_local()) {
                eprintln!("Reminder is already due; the next sweep will fire it.");
            }
        }

        Commands::List { filter, sort, desc } => {
            let mut view: Vec<&Task> = app.tasks().iter().filter(|t| filter.matches(t)).collect();
            if let Some(key) = sort.or(config.default_sort) {
                sort_tasks(&mut view, key, desc);
            }
            print_task_list(&view, Local::now().naive_local(), color);
            print_stats(app.stats(), color);
        }

        Commands::View { id } => {
            let Some(task) = app.task(id) else {
                eprintln!("No task with id {id}");
                return Ok(());
            };
            print_task_view(task, Local::now().naive_local(), color);
        }

        Commands::Toggle { id } => {
            let outcome = app.toggle_task(id, Local::now())?;
            report_toggle(id, outcome);
        }

        Commands::Done { id } => {
            let outcome = app.complete_task(id, Local::now())?;
            report_toggle(id, outcome);
        }

        Commands::Edit { id, text } => {
            let Some(task) = app.task(id) else {
                eprintln!("No task with id {id}");
                return Ok(());
            };
            let text = match text {
                Some(text) => text,
                None => prompt_input(&format!("Text [{}]: ", task.text)),
            };
            if text.trim().is_empty() {
                println!("Unchanged #{id}");
                return Ok(());
            }
            if app.edit_task(id, &text)? {
                println!("Updated #{id}");
            }
        }

        Commands::Delete { id, yes } => {
            match app.delete_task(id, confirmer(yes).as_mut())? {
                RemoveOutcome::Missing => eprintln!("No task with id {id}"),
                RemoveOutcome::Declined => println!("Kept #{id}"),
                RemoveOutcome::Removed => println!("Deleted #{id}"),
            }
        }

        Commands::Clear { yes } => match app.clear_completed(confirmer(yes).as_mut())? {
            ClearOutcome::NothingCompleted => eprintln!("No completed tasks"),
            ClearOutcome::Declined => println!("Nothing cleared"),
            ClearOutcome::Cleared(count) => println!("Cleared {count} completed tasks"),
        },

        Commands::Stats => print_stats(app.stats(), color),

        Commands::Template { command } => handle_template(command, &mut app, color)?,

        Commands::Sweep => {
            let now = Local::now();
            let mut notifier = TerminalNotifier::new(color, config.system_notifications);
            let notified = app.sweep_reminders(now, &mut notifier)?;
            let created = app.sweep_recurrence(now)?;
            println!(
                "Sent {} reminders, created {} recurring tasks",
                notified.len(),
                created.len()
            );
        }

        Commands::Watch { once } => watch(&mut app, &config, color, once)?,

        Commands::Pomodoro { cycles } => run_pomodoro(&config, color, cycles)?,

        Commands::Export { format, output } => {
            let bundle = app.export_bundle(Local::now());
            let rendered = render_export(&bundle, format)?;
            match output {
                None => println!("{rendered}"),
                Some(path) => {
                    let path = if path == "-" {
                        default_export_name(format)
                    } else {
                        path
                    };
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {path}"))?;
                    println!("Exported to {path}");
                }
            }
        }

        Commands::Import { file, format } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            let result = match format {
                ImportFormat::Json => app.import_json(&raw),
                ImportFormat::Csv => app.import_csv(&raw),
            };
            let summary = result?;
            println!("Imported {} tasks", summary.tasks_read);
            if summary.templates_read > 0 {
                println!("Imported {} recurring tasks", summary.templates_read);
            }
            let replaced = summary.tasks_read + summary.templates_read
                - summary.tasks_added
                - summary.templates_added;
            if replaced > 0 {
                println!("- Replaced {replaced} existing items with the same id");
            }
        }
    }

    Ok(())
}

fn report_toggle(id: u64, outcome: ToggleOutcome) {
    match outcome {
        ToggleOutcome::Missing => eprintln!("No task with id {id}"),
        ToggleOutcome::Reopened => println!("Reopened #{id}"),
        ToggleOutcome::Completed { successor: None } => println!("Done #{id}"),
        ToggleOutcome::Completed {
            successor: Some(next),
        } => println!("Done #{id}, next occurrence is #{next}"),
    }
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalConfirm)
    }
}

fn handle_template(command: TemplateCommand, app: &mut TodoApp<FileStore>, color: bool) -> Result<()> {
    match command {
        TemplateCommand::Add { text, interval } => {
            let id = app.add_template(&text, interval, Local::now())?;
            println!("Added recurring task #{id} ({interval:?})");
        }
        TemplateCommand::List => print_template_list(app.templates(), color),
        TemplateCommand::Delete { id, yes } => {
            match app.delete_template(id, confirmer(yes).as_mut())? {
                RemoveOutcome::Missing => eprintln!("No recurring task with id {id}"),
                RemoveOutcome::Declined => println!("Kept recurring task #{id}"),
                RemoveOutcome::Removed => println!("Deleted recurring task #{id}"),
            }
        }
    }
    Ok(())
}

/// Single-threaded loop: one-shot timers are checked every tick, the two
/// sweeps on their own cadences. State is re-read each tick so commands run
/// from another shell are picked up.
fn watch(app: &mut TodoApp<FileStore>, config: &AppConfig, color: bool, once: bool) -> Result<()> {
    let mut notifier = TerminalNotifier::new(color, config.system_notifications);
    let mut reminder_sweep = Cadence::every_secs(config.reminder_sweep_secs);
    let mut recurrence_sweep = Cadence::every_secs(config.recurrence_sweep_secs);
    let tick = tick_duration(config.tick_ms);

    let armed = app.arm_timers(Local::now());
    log::info!("watch started armed={armed} data_dir={}", app.store().dir().display());
    if !once {
        println!(
            "Watching {} (reminders every {}s, recurring every {}s). Ctrl-C to stop.",
            app.store().dir().display(),
            config.reminder_sweep_secs,
            config.recurrence_sweep_secs
        );
    }

    loop {
        let now = Local::now();
        if let Err(err) = watch_tick(
            app,
            &mut notifier,
            &mut reminder_sweep,
            &mut recurrence_sweep,
            now,
        ) {
            log::error!("watch tick failed: {err:#}");
            eprintln!("Error: {err:#}");
        }

        if once {
            return Ok(());
        }
        std::thread::sleep(tick);
    }
}

fn watch_tick(
    app: &mut TodoApp<FileStore>,
    notifier: &mut dyn Notifier,
    reminder_sweep: &mut Cadence,
    recurrence_sweep: &mut Cadence,
    now: chrono::DateTime<Local>,
) -> Result<()> {
    app.reload()?;
    app.arm_timers(now);
    app.fire_timers(now, notifier);

    if reminder_sweep.due(now) {
        app.sweep_reminders(now, notifier)?;
    }
    if recurrence_sweep.due(now) {
        let created = app.sweep_recurrence(now)?;
        for id in created {
            if let Some(task) = app.task(id) {
                notifier.alert("Recurring task created", &task.text);
            }
        }
    }
    Ok(())
}

fn run_pomodoro(config: &AppConfig, color: bool, cycles: u32) -> Result<()> {
    if cycles == 0 {
        bail!("cycles must be at least 1");
    }

    let mut notifier = TerminalNotifier::new(color, config.system_notifications);
    let mut timer = Pomodoro::start(config.pomodoro.clone(), Local::now());
    let tick = tick_duration(config.tick_ms.min(1000));
    let mut stdout = std::io::stdout();

    log::info!("pomodoro started cycles={cycles}");
    notifier.alert("Pomodoro", "Focus started");

    loop {
        let now = Local::now();
        if let Some(change) = timer.tick(now) {
            println!();
            if change.focus_done >= cycles && change.to != Phase::Focus {
                notifier.alert("Pomodoro", &format!("Done, {cycles} focus sessions completed"));
                log::info!("pomodoro finished");
                return Ok(());
            }
            notifier.alert(
                "Pomodoro",
                &format!("{} over, {} started", change.from.label(), change.to.label()),
            );
        }

        let _ = write!(
            stdout,
            "\r{:<12} {}  (focus sessions {}/{cycles}) ",
            timer.phase().label(),
            format_countdown(timer.remaining(now)),
            timer.focus_done()
        );
        let _ = stdout.flush();
        std::thread::sleep(tick);
    }
}

fn handle_config(command: Commands, config: &mut AppConfig, path: &Path) -> Result<()> {
    let Commands::Config {
        color,
        system_notifications,
        reminder_sweep_secs,
        recurrence_sweep_secs,
        tick_ms,
        default_sort,
        log_level,
        focus_minutes,
        short_break_minutes,
        long_break_minutes,
        long_break_every,
    } = command
    else {
        return Ok(());
    };

    let mut changed = false;
    if let Some(value) = color {
        config.color = value;
        changed = true;
    }
    if let Some(value) = system_notifications {
        config.system_notifications = value;
        changed = true;
    }
    if let Some(value) = reminder_sweep_secs {
        config.reminder_sweep_secs = value.max(1);
        changed = true;
    }
    if let Some(value) = recurrence_sweep_secs {
        config.recurrence_sweep_secs = value.max(1);
        changed = true;
    }
    if let Some(value) = tick_ms {
        config.tick_ms = value;
        changed = true;
    }
    if let Some(value) = default_sort {
        config.default_sort = Some(value);
        changed = true;
    }
    if let Some(value) = log_level {
        config.log_level = value;
        changed = true;
    }
    if let Some(value) = focus_minutes {
        config.pomodoro.focus_minutes = value.max(1);
        changed = true;
    }
    if let Some(value) = short_break_minutes {
        config.pomodoro.short_break_minutes = value.max(1);
        changed = true;
    }
    if let Some(value) = long_break_minutes {
        config.pomodoro.long_break_minutes = value.max(1);
        changed = true;
    }
    if let Some(value) = long_break_every {
        config.pomodoro.long_break_every = value.max(1);
        changed = true;
    }

    if changed {
        save_config(path, config)?;
        println!("Config updated");
    }
    print_config(config);
    Ok(())
}

fn print_config(config: &AppConfig) {
    println!("color: {}", config.color);
    println!("system_notifications: {}", config.system_notifications);
    println!("reminder_sweep_secs: {}", config.reminder_sweep_secs);
    println!("recurrence_sweep_secs: {}", config.recurrence_sweep_secs);
    println!("tick_ms: {}", config.tick_ms);
    match config.default_sort {
        Some(key) => println!("default_sort: {key:?}"),
        None => println!("default_sort: (stored order)"),
    }
    println!("log_level: {}", config.log_level);
    println!(
        "pomodoro: focus {}m, short break {}m, long break {}m every {} sessions",
        config.pomodoro.focus_minutes,
        config.pomodoro.short_break_minutes,
        config.pomodoro.long_break_minutes,
        config.pomodoro.long_break_every
    );
}
