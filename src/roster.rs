use crate::availability::{AvailabilityRecord, validate_synonym_table};
use crate::error::{Result, ScheduleError};
use crate::matching::{self, Matcher};
use crate::slot::{Slot, SlotConfig, SlotKind};
use crate::table::{ScheduleTable, assemble};
use crate::weight::WeightPolicy;
use serde::Deserialize;
use serde_json::Value;

/// A scheduling scenario: worker availabilities plus the shift template
/// they are matched against.
#[derive(Debug)]
pub struct Roster {
    pub workers: Vec<AvailabilityRecord>,
    pub shifts: Vec<AvailabilityRecord>,
    pub cfg: SlotConfig,
    pub policy: WeightPolicy,
}

pub struct MatchOutcome {
    pub pairs: Vec<(Slot, Slot)>,
    pub table: ScheduleTable,
}

impl Roster {
    pub fn load_from_file(path: &str, cfg: SlotConfig, policy: WeightPolicy) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data, cfg, policy)
    }

    pub fn from_json(data: &str, cfg: SlotConfig, policy: WeightPolicy) -> Result<Self> {
        validate_synonym_table()?;

        #[derive(Deserialize)]
        struct RawData {
            workers: Vec<Value>,
            shifts: Vec<Value>,
        }
        let raw: RawData = serde_json::from_str(data)?;

        let workers = Self::sanitize_section(&raw.workers, SlotKind::Worker)?;
        let shifts = Self::sanitize_section(&raw.shifts, SlotKind::Shift)?;

        Ok(Roster {
            workers,
            shifts,
            cfg,
            policy,
        })
    }

    fn sanitize_section(section: &[Value], expected: SlotKind) -> Result<Vec<AvailabilityRecord>> {
        section
            .iter()
            .map(|value| {
                let object = value.as_object().ok_or_else(|| {
                    ScheduleError::Validation(format!("{} record is not an object", expected))
                })?;
                let record = AvailabilityRecord::sanitize(object)?;
                if record.kind != expected {
                    return Err(ScheduleError::Validation(format!(
                        "record '{}' declares type {} inside the {} section",
                        record.name, record.kind, expected
                    )));
                }
                Ok(record)
            })
            .collect()
    }

    /// Worker slots with the weight policy applied.
    pub fn worker_slots(&self) -> Result<Vec<Slot>> {
        let mut slots: Vec<Slot> = self
            .workers
            .iter()
            .flat_map(|record| record.to_slots(&self.cfg))
            .collect();
        self.policy.apply_all(&mut slots, &self.cfg)?;
        Ok(slots)
    }

    /// Shift slots; weights stay 0, the worker side carries preference.
    pub fn shift_slots(&self) -> Vec<Slot> {
        self.shifts
            .iter()
            .flat_map(|record| record.to_slots(&self.cfg))
            .collect()
    }

    pub fn run(&self, matcher: &dyn Matcher) -> Result<MatchOutcome> {
        let workers = self.worker_slots()?;
        let shifts = self.shift_slots();
        tracing::info!(
            worker_slots = workers.len(),
            shift_slots = shifts.len(),
            "matching roster against shift template"
        );
        let pairs = matching::assign(&workers, &shifts, matcher)?;
        let table = assemble(&pairs, &self.cfg);
        Ok(MatchOutcome { pairs, table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::ReferenceMatcher;
    use std::collections::{BTreeSet, HashMap};

    const SCENARIO: &str = r#"{
        "workers": [
            {
                "Name": "Ben S",
                "id": 1,
                "type": "worker",
                "Hours I want to work": "8",
                "M": "10:00-13:00, 13:00-17:00",
                "T": "10:00-17:00",
                "W": "10:00-12:00, 13:00-17:00",
                "R": "10:00-13:00",
                "F": "10:00-12:00"
            },
            {
                "name": "Shortie",
                "id": 2,
                "type": "worker",
                "hours": "1",
                "M": "10:00-13:00"
            }
        ],
        "shifts": [
            {
                "name": "front desk A", "id": 90, "type": "shift",
                "M": "10:00-17:00", "T": "10:00-17:00", "W": "10:00-17:00",
                "R": "10:00-17:00", "F": "10:00-17:00", "S": "10:00-17:00",
                "U": "10:00-17:00"
            },
            {
                "name": "front desk B", "id": 91, "type": "shift",
                "M": "10:00-17:00", "T": "10:00-17:00", "W": "10:00-17:00",
                "R": "10:00-17:00", "F": "10:00-17:00", "S": "10:00-17:00",
                "U": "10:00-17:00"
            }
        ]
    }"#;

    fn roster() -> Roster {
        Roster::from_json(SCENARIO, SlotConfig::default(), WeightPolicy::LongestBlock).unwrap()
    }

    #[test]
    fn test_from_json_sections() {
        let roster = roster();
        assert_eq!(roster.workers.len(), 2);
        assert_eq!(roster.shifts.len(), 2);
        assert_eq!(roster.workers[0].max_hours, Some(8));
    }

    #[test]
    fn test_kind_must_match_section() {
        let mixed = r#"{
            "workers": [{"name": "x", "id": 1, "type": "shift"}],
            "shifts": []
        }"#;
        let err = Roster::from_json(mixed, SlotConfig::default(), WeightPolicy::Flat).unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[test]
    fn test_worker_slots_carry_block_weights() {
        let slots = roster().worker_slots().unwrap();
        // Ben's Monday ranges abut, so the whole day is one 28-slot run.
        let ben_monday: Vec<&Slot> = slots
            .iter()
            .filter(|s| s.owner_id == 1 && s.day_in_cycle == 0)
            .collect();
        assert_eq!(ben_monday.len(), 28);
        assert!(ben_monday.iter().all(|s| s.weight == 28));
        // Friday is a lone 8-slot block.
        assert!(
            slots
                .iter()
                .filter(|s| s.owner_id == 1 && s.day_in_cycle == 4)
                .all(|s| s.weight == 8)
        );
    }

    #[test]
    fn test_end_to_end_schedule_covers_exactly_the_declared_windows() {
        let roster = roster();
        let outcome = roster.run(&ReferenceMatcher).unwrap();

        // Declared availability per worker, as (day, minute) sets.
        let mut declared: HashMap<u32, BTreeSet<(u8, u16)>> = HashMap::new();
        for record in &roster.workers {
            let entry = declared.entry(record.id).or_default();
            for (day, minutes) in record.expand_week(&roster.cfg) {
                for minute in minutes {
                    entry.insert((day, minute));
                }
            }
        }

        // Every worker got every declared slot, and nothing outside it:
        // the shift template has two copies of every timeslot and at
        // most two workers overlap anywhere.
        let mut matched: HashMap<u32, BTreeSet<(u8, u16)>> = HashMap::new();
        for (worker, shift) in &outcome.pairs {
            assert_eq!(worker.match_key(), shift.match_key());
            matched
                .entry(worker.owner_id)
                .or_default()
                .insert((worker.day_in_cycle, worker.time_of_day));
        }
        assert_eq!(matched, declared);

        // The table holds one non-empty cell per matched pair.
        let filled: usize = outcome
            .table
            .rows
            .iter()
            .map(|row| row.cells.iter().filter(|c| c.is_some()).count())
            .sum();
        assert_eq!(filled, outcome.pairs.len());

        // No cell names an owner outside their declared window.
        for row in &outcome.table.rows {
            for cell in row.cells.iter().flatten() {
                assert!(cell == "Ben S" || cell == "Shortie");
            }
        }
    }

    #[test]
    fn test_outcome_csv_round_trip_shape() {
        let outcome = roster().run(&ReferenceMatcher).unwrap();
        let csv = outcome.table.to_csv().unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Time of Day,"));
        // Ben appears on five days, Shortie on one: six columns.
        assert_eq!(header.split(',').count(), 7);
        // 10:00 through 16:45 is the widest populated band.
        assert_eq!(lines.count(), 28);
    }
}
