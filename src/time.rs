use crate::error::{Result, ScheduleError};

/// Canonicalizes human time text into 24-hour "HH:MM".
///
/// Accepts the forms "10", "10 pm", "10am", "11:15", "18:45", "18:45 pm",
/// "6:45pm". A pm suffix maps the hour through `(h % 12) + 12`, which keeps
/// already-24-hour input like "18:45 pm" unchanged. Suffix-free input is
/// taken as given.
pub fn normalize(text: &str) -> Result<String> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let (body, is_pm) = if let Some(rest) = compact.strip_suffix("pm") {
        (rest, true)
    } else if let Some(rest) = compact.strip_suffix("am") {
        (rest, false)
    } else {
        (compact.as_str(), false)
    };

    let body = if body.contains(':') {
        body.to_string()
    } else {
        format!("{}:00", body)
    };

    let (hour_text, minute_text) = body
        .split_once(':')
        .ok_or_else(|| ScheduleError::Parse(text.to_string()))?;
    let hour = hour_text
        .parse::<u16>()
        .map_err(|_| ScheduleError::Parse(text.to_string()))?;
    let minute = minute_text
        .parse::<u16>()
        .map_err(|_| ScheduleError::Parse(text.to_string()))?;

    let hour = if is_pm { (hour % 12) + 12 } else { hour };

    Ok(format!("{:02}:{:02}", hour, minute))
}

/// Minutes since midnight of the normalized form of `text`. Anything
/// past "24:00" is rejected, so colon-free text like "1200" (normalized
/// to the hour 1200) errors here instead of producing a bogus minute.
pub fn minutes(text: &str) -> Result<u16> {
    let normalized = normalize(text)?;
    let (hour_text, minute_text) = normalized
        .split_once(':')
        .ok_or_else(|| ScheduleError::Parse(text.to_string()))?;
    let hour = hour_text
        .parse::<u32>()
        .map_err(|_| ScheduleError::Parse(text.to_string()))?;
    let minute = minute_text
        .parse::<u32>()
        .map_err(|_| ScheduleError::Parse(text.to_string()))?;
    let total = 60 * hour + minute;
    if total > 1440 {
        return Err(ScheduleError::Parse(text.to_string()));
    }
    Ok(total as u16)
}

pub fn hhmm(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn round_down(minutes: u16, interval: u16) -> u16 {
    (minutes / interval) * interval
}
