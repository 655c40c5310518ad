use crate::error::{Result, ScheduleError};
use crate::slot::{DAY_LETTERS, Slot, SlotConfig, SlotKind};
use crate::time;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Alternate spellings seen in legacy availability files, mapped to the
/// canonical field they mean. Checked against `CANONICAL_FIELDS` once at
/// load time so a bad entry fails loudly instead of silently renaming.
const FIELD_SYNONYMS: &[(&str, &str)] = &[
    ("hours i want to work", "hours"),
    ("hrs", "hours"),
    ("employee", "name"),
    ("employee id", "id"),
    ("kind", "type"),
];

const CANONICAL_FIELDS: &[&str] = &["id", "type", "name", "hours"];

pub fn validate_synonym_table() -> Result<()> {
    for (alias, target) in FIELD_SYNONYMS {
        if !CANONICAL_FIELDS.contains(target) {
            return Err(ScheduleError::Validation(format!(
                "synonym '{}' maps to unknown field '{}'",
                alias, target
            )));
        }
    }
    Ok(())
}

fn canonical_field(key: &str) -> String {
    let folded = key.trim().to_lowercase();
    FIELD_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map(|(_, target)| target.to_string())
        .unwrap_or(folded)
}

fn parse_day_key(key: &str) -> Option<u8> {
    let mut chars = key.chars();
    let first = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    if let Some(digit) = first.to_digit(10) {
        return u8::try_from(digit).ok().filter(|d| *d <= 6);
    }
    DAY_LETTERS
        .iter()
        .position(|l| *l == first.to_ascii_uppercase())
        .map(|p| p as u8)
}

fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A named entity's declared weekly windows, prior to slot expansion.
/// `hours` maps day-in-cycle to comma-separated "start-end" range text.
#[derive(Debug, Clone)]
pub struct AvailabilityRecord {
    pub id: u32,
    pub name: Arc<str>,
    pub kind: SlotKind,
    pub max_hours: Option<u32>,
    pub hours: BTreeMap<u8, String>,
}

impl AvailabilityRecord {
    /// Builds a record from a raw JSON object, normalizing field names
    /// (case folding, synonym renames, legacy day letters). Missing `id`
    /// or `type` after normalization is fatal.
    pub fn sanitize(raw: &Map<String, Value>) -> Result<AvailabilityRecord> {
        let mut id = None;
        let mut kind = None;
        let mut name: Arc<str> = Arc::from("");
        let mut max_hours = None;
        let mut hours = BTreeMap::new();

        for (raw_key, value) in raw {
            let key = canonical_field(raw_key);
            match key.as_str() {
                "id" => id = value_as_u32(value),
                "type" => {
                    kind = value.as_str().and_then(|s| match s.trim().to_lowercase().as_str() {
                        "worker" => Some(SlotKind::Worker),
                        "shift" => Some(SlotKind::Shift),
                        _ => None,
                    })
                }
                "name" => {
                    if let Some(s) = value.as_str() {
                        name = Arc::from(s.trim());
                    }
                }
                "hours" => max_hours = value_as_u32(value),
                other => match (parse_day_key(other), value.as_str()) {
                    (Some(day), Some(text)) => {
                        hours.insert(day, text.trim().to_string());
                    }
                    _ => tracing::debug!(field = other, "ignoring unrecognized field"),
                },
            }
        }

        let id = id.ok_or_else(|| {
            ScheduleError::Validation(format!("record '{}' has no usable 'id' field", name))
        })?;
        let kind = kind.ok_or_else(|| {
            ScheduleError::Validation(format!("record '{}' has no usable 'type' field", name))
        })?;

        Ok(AvailabilityRecord {
            id,
            name,
            kind,
            max_hours,
            hours,
        })
    }

    /// Per-day slot start times, in declaration order within each day.
    /// A day whose range text is malformed is dropped for that day only.
    pub fn expand_week(&self, cfg: &SlotConfig) -> BTreeMap<u8, Vec<u16>> {
        let mut expanded = BTreeMap::new();

        'days: for (day, text) in &self.hours {
            let mut minutes_of_day = Vec::new();
            for range_text in text.split(", ") {
                let Some((start, end)) = range_text.split_once('-') else {
                    tracing::warn!(
                        owner = %self.name,
                        day = *day,
                        range = range_text,
                        "range text has no '-' separator, dropping day"
                    );
                    continue 'days;
                };
                match time_slot_range(start, end, cfg) {
                    Ok(range) => minutes_of_day.extend(range),
                    Err(err) => {
                        tracing::warn!(
                            owner = %self.name,
                            day = *day,
                            range = range_text,
                            %err,
                            "unparseable range, dropping day"
                        );
                        continue 'days;
                    }
                }
            }
            expanded.insert(*day, minutes_of_day);
        }

        expanded
    }

    pub fn to_slots(&self, cfg: &SlotConfig) -> Vec<Slot> {
        self.expand_week(cfg)
            .into_iter()
            .flat_map(|(day, minutes)| {
                minutes.into_iter().map(move |time_of_day| (day, time_of_day))
            })
            .map(|(day_in_cycle, time_of_day)| Slot {
                day_in_cycle,
                owner_id: self.id,
                display_name: self.name.clone(),
                time_of_day,
                kind: self.kind,
                weight: 0,
            })
            .collect()
    }
}

/// Interval-stepped slot starts covering `[start, end)`, both bounds
/// floor-rounded to the interval. Two domain heuristics apply before
/// rounding: a start earlier than the configured first shift is assumed
/// to mean the afternoon (unless `military_time`), and an end at or
/// before the start is assumed to sit across noon; both add 12 hours.
pub fn time_slot_range(start: &str, end: &str, cfg: &SlotConfig) -> Result<Vec<u16>> {
    let mut start_min = time::minutes(start)?;
    let mut end_min = time::minutes(end)?;

    if !cfg.military_time && start_min < cfg.first_shift {
        start_min += 720;
    }
    if end_min <= start_min {
        end_min += 720;
    }

    let start_min = time::round_down(start_min, cfg.interval);
    let end_min = time::round_down(end_min, cfg.interval);

    Ok((start_min..end_min)
        .step_by(cfg.interval as usize)
        .collect())
}
