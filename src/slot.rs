use std::sync::Arc;

pub const MINUTES_PER_DAY: u16 = 1440;
pub const DAY_LETTERS: [char; 7] = ['M', 'T', 'W', 'R', 'F', 'S', 'U'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotKind {
    Worker,
    Shift,
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotKind::Worker => write!(f, "worker"),
            SlotKind::Shift => write!(f, "shift"),
        }
    }
}

/// The pair that decides whether a worker slot can cover a shift slot.
/// Deliberately blind to kind, owner and weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchKey {
    pub day_in_cycle: u8,
    pub time_of_day: u16,
}

pub type IdentityKey = (u8, u16, SlotKind, u32, Arc<str>);

/// One interval-aligned unit of availability within the weekly cycle.
#[derive(Debug, Clone)]
pub struct Slot {
    pub day_in_cycle: u8,
    pub owner_id: u32,
    pub display_name: Arc<str>,
    pub time_of_day: u16,
    pub kind: SlotKind,
    pub weight: u32,
}

impl Slot {
    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            day_in_cycle: self.day_in_cycle,
            time_of_day: self.time_of_day,
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        (
            self.day_in_cycle,
            self.time_of_day,
            self.kind,
            self.owner_id,
            self.display_name.clone(),
        )
    }

    /// Sort key for deterministic vertex indexing. Not an `Ord` impl:
    /// the four-field ordering would disagree with five-field identity.
    pub fn order_key(&self) -> (u8, u16, SlotKind, u32) {
        (self.day_in_cycle, self.time_of_day, self.kind, self.owner_id)
    }

    /// Cell value for the schedule table: name when present, id otherwise.
    pub fn display_value(&self) -> String {
        if self.display_name.is_empty() {
            self.owner_id.to_string()
        } else {
            self.display_name.to_string()
        }
    }
}

// Identity equality covers the five descriptive fields; weight is a
// policy annotation and never part of identity.
impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.day_in_cycle == other.day_in_cycle
            && self.owner_id == other.owner_id
            && self.display_name == other.display_name
            && self.time_of_day == other.time_of_day
            && self.kind == other.kind
    }
}

impl Eq for Slot {}

#[derive(Debug, Clone, Copy)]
pub struct SlotConfig {
    /// Slot length in minutes; every `time_of_day` is a multiple of this.
    pub interval: u16,
    /// Earliest plausible shift start, in minutes since midnight. Start
    /// times before this are assumed to mean the afternoon.
    pub first_shift: u16,
    /// When set, start times are taken literally and the afternoon
    /// inference is disabled.
    pub military_time: bool,
}

impl Default for SlotConfig {
    fn default() -> Self {
        SlotConfig {
            interval: 15,
            first_shift: 600,
            military_time: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(day: u8, time: u16, kind: SlotKind, owner: u32, name: &str) -> Slot {
        Slot {
            day_in_cycle: day,
            owner_id: owner,
            display_name: Arc::from(name),
            time_of_day: time,
            kind,
            weight: 0,
        }
    }

    #[test]
    fn test_match_key_ignores_kind_and_owner() {
        let worker = slot(2, 600, SlotKind::Worker, 1, "Ben S");
        let shift = slot(2, 600, SlotKind::Shift, 9, "front desk");
        assert_ne!(worker, shift);
        assert_eq!(worker.match_key(), shift.match_key());
    }

    #[test]
    fn test_match_key_differs_across_times() {
        let a = slot(2, 600, SlotKind::Worker, 1, "Ben S");
        let b = slot(2, 615, SlotKind::Worker, 1, "Ben S");
        let c = slot(3, 600, SlotKind::Worker, 1, "Ben S");
        assert_ne!(a.match_key(), b.match_key());
        assert_ne!(a.match_key(), c.match_key());
    }

    #[test]
    fn test_identity_ignores_weight() {
        let mut a = slot(0, 600, SlotKind::Worker, 1, "Ben S");
        let b = a.clone();
        a.weight = 12;
        assert_eq!(a, b);
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_order_key_is_lexicographic() {
        let early = slot(0, 600, SlotKind::Worker, 2, "x");
        let late = slot(0, 615, SlotKind::Worker, 1, "x");
        assert!(early.order_key() < late.order_key());

        let worker = slot(0, 600, SlotKind::Worker, 9, "x");
        let shift = slot(0, 600, SlotKind::Shift, 1, "x");
        assert!(worker.order_key() < shift.order_key());
    }

    #[test]
    fn test_display_value_falls_back_to_id() {
        let named = slot(0, 600, SlotKind::Worker, 7, "Shortie");
        let anonymous = slot(0, 600, SlotKind::Worker, 7, "");
        assert_eq!(named.display_value(), "Shortie");
        assert_eq!(anonymous.display_value(), "7");
    }
}
