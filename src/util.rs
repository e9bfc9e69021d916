use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::io::{self, IsTerminal, Write};

use crate::model::Recurrence;

pub fn truncate_to_minute(at: NaiveDateTime) -> Option<NaiveDateTime> {
    at.with_second(0)?.with_nanosecond(0)
}

/// Adds calendar months keeping the day of month, letting days past the end
/// of the target month spill into the following one (Jan 31 + 1 month is
/// Mar 2 or Mar 3, not Feb 28).
pub fn add_calendar_months(at: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    let total = i64::from(at.year()) * 12 + i64::from(at.month0()) + i64::from(months);
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first.checked_add_days(Days::new(u64::from(at.day() - 1)))?;
    Some(date.and_time(at.time()))
}

/// Next occurrence one unit after `from`, on the calendar.
pub fn advance_by(from: NaiveDateTime, unit: Recurrence) -> Option<NaiveDateTime> {
    match unit {
        Recurrence::Daily => from.checked_add_days(Days::new(1)),
        Recurrence::Weekly => from.checked_add_days(Days::new(7)),
        Recurrence::Monthly => add_calendar_months(from, 1),
        Recurrence::Yearly => add_calendar_months(from, 12),
    }
}

/// Parses reminder input relative to `now`.
///
/// Accepted: `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM`, `today HH:MM`,
/// `tomorrow HH:MM`, and offsets `+30m`, `+2h`, `+1d`.
pub fn parse_reminder(s: &str, now: NaiveDateTime) -> Result<NaiveDateTime, String> {
    let raw = s.trim();
    let s = raw.to_lowercase();

    if let Some(offset) = s.strip_prefix('+') {
        let parsed = parse_offset(offset)?;
        return now
            .checked_add_signed(parsed)
            .and_then(truncate_to_minute)
            .ok_or_else(|| "date overflow".to_string());
    }

    let day_word = s
        .strip_prefix("today")
        .map(|rest| (0u64, rest))
        .or_else(|| s.strip_prefix("tomorrow").map(|rest| (1u64, rest)));
    if let Some((days, rest)) = day_word {
        let date = now
            .date()
            .checked_add_days(Days::new(days))
            .ok_or("date overflow")?;
        let time = NaiveTime::parse_from_str(rest.trim(), "%H:%M")
            .map_err(|_| "expected a time like 09:30 after the day".to_string())?;
        return Ok(date.and_time(time));
    }

    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at);
        }
    }

    Err("expected YYYY-MM-DD HH:MM|today HH:MM|tomorrow HH:MM|+N(m|h|d)".into())
}

fn parse_offset(value: &str) -> Result<Duration, String> {
    let Some(unit) = value.chars().last() else {
        return Err("missing offset after `+`".to_string());
    };
    let digits = &value[..value.len() - unit.len_utf8()];
    let amount: i64 = digits
        .parse()
        .map_err(|_| format!("invalid offset `+{value}`"))?;
    let offset = match unit {
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => return Err("offset unit must be m, h or d".to_string()),
    };
    offset.ok_or_else(|| format!("offset `+{value}` is too large"))
}

pub fn prompt_input(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();

    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);
    input.trim_end().to_string()
}

/// Yes/no gate in front of destructive actions.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Asks on the terminal; answers no when stdin is not interactive.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if !io::stdin().is_terminal() {
            return false;
        }

        let mut stdout = io::stdout();
        let _ = write!(stdout, "{prompt} [y/N]: ");
        let _ = stdout.flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return false;
        }

        matches!(input.trim(), "y" | "Y" | "yes" | "YES" | "Yes")
    }
}

pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}
