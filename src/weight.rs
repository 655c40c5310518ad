use crate::error::{Result, ScheduleError};
use crate::slot::{MINUTES_PER_DAY, Slot, SlotConfig};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WeightPolicy {
    /// Leave every slot at weight 0.
    #[default]
    Flat,
    /// Weight each slot by the length of the uninterrupted block it
    /// belongs to, favoring long shifts in the matching.
    LongestBlock,
}

impl std::fmt::Display for WeightPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightPolicy::Flat => write!(f, "flat"),
            WeightPolicy::LongestBlock => write!(f, "longest-block"),
        }
    }
}

pub fn full_day_grid(cfg: &SlotConfig) -> Vec<u16> {
    (0..MINUTES_PER_DAY).step_by(cfg.interval as usize).collect()
}

/// Splits `values` into maximal runs of consecutive `grid` positions,
/// returned in ascending order. Values are sorted and de-duplicated
/// first. A value that is not on the grid at all cannot happen for
/// slots derived from that grid and is a fatal integrity error.
pub fn group_sequential(grid: &[u16], values: &[u16]) -> Result<Vec<Vec<u16>>> {
    let mut values = values.to_vec();
    values.sort_unstable();
    values.dedup();

    let mut groups = Vec::new();
    let mut run: Vec<u16> = Vec::new();
    let mut grid_pos = 0;

    for value in values {
        loop {
            let Some(grid_value) = grid.get(grid_pos) else {
                return Err(ScheduleError::DataIntegrity(format!(
                    "slot time {} is past the end of the {}-point day grid",
                    value,
                    grid.len()
                )));
            };
            match value.cmp(grid_value) {
                std::cmp::Ordering::Equal => {
                    run.push(value);
                    grid_pos += 1;
                    break;
                }
                std::cmp::Ordering::Greater => {
                    // Gap in the values: the current run is complete.
                    if !run.is_empty() {
                        groups.push(std::mem::take(&mut run));
                    }
                    grid_pos += 1;
                }
                std::cmp::Ordering::Less => {
                    return Err(ScheduleError::DataIntegrity(format!(
                        "slot time {} is not on the day grid",
                        value
                    )));
                }
            }
        }
    }
    if !run.is_empty() {
        groups.push(run);
    }

    Ok(groups)
}

impl WeightPolicy {
    /// Applies the policy to the slots of one owner on one day.
    pub fn apply_day(&self, slots: &mut [Slot], cfg: &SlotConfig) -> Result<()> {
        match self {
            WeightPolicy::Flat => Ok(()),
            WeightPolicy::LongestBlock => {
                let grid = full_day_grid(cfg);
                let times: Vec<u16> = slots.iter().map(|s| s.time_of_day).collect();
                let runs = group_sequential(&grid, &times)?;

                let mut weight_by_time: HashMap<u16, u32> = HashMap::new();
                for run in &runs {
                    for time in run {
                        weight_by_time.insert(*time, run.len() as u32);
                    }
                }
                for slot in slots {
                    slot.weight = weight_by_time[&slot.time_of_day];
                }
                Ok(())
            }
        }
    }

    /// Groups a mixed slot list by `(owner_id, day_in_cycle)` and applies
    /// the policy to each group in place.
    pub fn apply_all(&self, slots: &mut [Slot], cfg: &SlotConfig) -> Result<()> {
        if *self == WeightPolicy::Flat {
            return Ok(());
        }

        let mut by_owner_day: HashMap<(u32, u8), Vec<usize>> = HashMap::new();
        for (idx, slot) in slots.iter().enumerate() {
            by_owner_day
                .entry((slot.owner_id, slot.day_in_cycle))
                .or_default()
                .push(idx);
        }

        for indices in by_owner_day.values() {
            let mut group: Vec<Slot> = indices.iter().map(|i| slots[*i].clone()).collect();
            self.apply_day(&mut group, cfg)?;
            for (slot, idx) in group.into_iter().zip(indices) {
                slots[*idx] = slot;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::SlotKind;
    use std::sync::Arc;

    fn slot(day: u8, time: u16, owner: u32) -> Slot {
        Slot {
            day_in_cycle: day,
            owner_id: owner,
            display_name: Arc::from("w"),
            time_of_day: time,
            kind: SlotKind::Worker,
            weight: 0,
        }
    }

    #[test]
    fn test_group_sequential_three_blocks() {
        let grid: Vec<u16> = (0..100).collect();
        let values: Vec<u16> = (0..35).chain(40..80).chain(90..100).collect();
        let groups = group_sequential(&grid, &values).unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], (0..35).collect::<Vec<u16>>());
        assert_eq!(groups[1], (40..80).collect::<Vec<u16>>());
        assert_eq!(groups[2], (90..100).collect::<Vec<u16>>());
    }

    #[test]
    fn test_group_sequential_handles_unsorted_duplicates() {
        let grid: Vec<u16> = (0..10).collect();
        let groups = group_sequential(&grid, &[3, 1, 2, 2, 7]).unwrap();
        assert_eq!(groups, vec![vec![1, 2, 3], vec![7]]);
    }

    #[test]
    fn test_group_sequential_rejects_off_grid_values() {
        let grid: Vec<u16> = (0..1440).step_by(15).collect();
        let err = group_sequential(&grid, &[600, 607]).unwrap_err();
        assert!(matches!(err, ScheduleError::DataIntegrity(_)));
    }

    #[test]
    fn test_flat_policy_keeps_zero_weights() {
        let cfg = SlotConfig::default();
        let mut slots = vec![slot(0, 600, 1), slot(0, 615, 1)];
        WeightPolicy::Flat.apply_all(&mut slots, &cfg).unwrap();
        assert!(slots.iter().all(|s| s.weight == 0));
    }

    #[test]
    fn test_longest_block_weights_each_run_by_its_own_length() {
        let cfg = SlotConfig::default();
        // Three blocks on one day: 12, 4 and 2 slots long.
        let mut times: Vec<u16> = (600..780).step_by(15).collect();
        times.extend((840..900).step_by(15));
        times.extend((1200..1230).step_by(15));
        let mut slots: Vec<Slot> = times.iter().map(|t| slot(0, *t, 1)).collect();

        WeightPolicy::LongestBlock.apply_day(&mut slots, &cfg).unwrap();

        for s in &slots {
            let expected = match s.time_of_day {
                600..=765 => 12,
                840..=885 => 4,
                _ => 2,
            };
            assert_eq!(s.weight, expected, "time {}", s.time_of_day);
        }
    }

    #[test]
    fn test_apply_all_groups_by_owner_and_day() {
        let cfg = SlotConfig::default();
        let mut slots = vec![
            // Owner 1, Monday: a 2-slot block.
            slot(0, 600, 1),
            slot(0, 615, 1),
            // Owner 1, Tuesday: a lone slot.
            slot(1, 600, 1),
            // Owner 2, Monday: a 3-slot block adjacent to owner 1's.
            slot(0, 630, 2),
            slot(0, 645, 2),
            slot(0, 660, 2),
        ];

        WeightPolicy::LongestBlock.apply_all(&mut slots, &cfg).unwrap();

        assert_eq!(slots[0].weight, 2);
        assert_eq!(slots[1].weight, 2);
        assert_eq!(slots[2].weight, 1);
        assert_eq!(slots[3].weight, 3);
        assert_eq!(slots[4].weight, 3);
        assert_eq!(slots[5].weight, 3);
    }
}
