//! How values are rendered on the pages.

use time::{macros::format_description, Date, OffsetDateTime};

/// Cubic ease-out over `progress` in `[0, 1]`.
pub fn ease_out_cubic(progress: f64) -> f64 {
    let progress = progress.max(0.0).min(1.0);

    1.0 - (1.0 - progress).powi(3)
}

/// The value a counter animating from 0 to `target` shows at `progress`.
pub fn animated_value(target: i64, progress: f64) -> i64 {
    (target as f64 * ease_out_cubic(progress)).floor() as i64
}

/// `1247` → `1,247`.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if value < 0 {
        grouped.push('-');
    }

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    grouped
}

pub fn format_rate(rate: f64) -> String {
    format!("{}%", rate)
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// How long before `now` something happened, in the largest whole unit.
pub fn time_ago(timestamp: OffsetDateTime, now: OffsetDateTime) -> String {
    let minutes = (now - timestamp).whole_minutes();
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        plural(days, "day")
    } else if hours > 0 {
        plural(hours, "hour")
    } else if minutes > 0 {
        plural(minutes, "minute")
    } else {
        "Just now".to_owned()
    }
}

/// Ten-digit numbers are shown as `XXX-XXX-XXXX`; anything else as
/// entered.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();

    if digits.len() == 10 {
        format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        phone.to_owned()
    }
}

pub fn format_last_donation(last_donation: Option<Date>, today: Date) -> String {
    let date = match last_donation {
        Some(date) => date,
        None => return "Never".to_owned(),
    };

    match (today - date).whole_days().abs() {
        0 => "Today".to_owned(),
        1 => "Yesterday".to_owned(),
        days if days < 30 => format!("{} days ago", days),
        _ => date
            .format(format_description!(
                "[month repr:short] [day padding:none], [year]"
            ))
            .unwrap_or_else(|_| date.to_string()),
    }
}

pub fn results_count(count: usize) -> String {
    if count == 1 {
        "1 donor found".to_owned()
    } else {
        format!("{} donors found", count)
    }
}
