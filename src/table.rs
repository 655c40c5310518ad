use crate::error::{Result, ScheduleError};
use crate::slot::{DAY_LETTERS, MINUTES_PER_DAY, Slot, SlotConfig};
use crate::time;
use std::collections::BTreeMap;
use tabled::settings::Style;

/// The empty-cell marker pinned by the CSV output format.
const EMPTY_CELL: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub time_of_day: u16,
    pub cells: Vec<Option<String>>,
}

/// Row-major schedule: one column per `(day, owner)` seen on the worker
/// side, one row per grid time that has at least one assignment.
#[derive(Debug, Clone)]
pub struct ScheduleTable {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

/// Drops rows whose cells are all empty, preserving the order of the
/// remaining rows.
pub(crate) fn prune_empty_rows(mut rows: Vec<Row>) -> Vec<Row> {
    rows.retain(|row| row.cells.iter().any(Option::is_some));
    rows
}

fn column_label(day: u8, display: &str) -> String {
    let letter = DAY_LETTERS.get(day as usize).copied().unwrap_or('?');
    format!("{} {}", letter, display)
}

/// Builds the schedule table from matched `(worker, shift)` pairs.
pub fn assemble(pairs: &[(Slot, Slot)], cfg: &SlotConfig) -> ScheduleTable {
    // Sorted distinct columns keyed by (day, owner), labeled from the
    // worker slot's display value.
    let mut columns: BTreeMap<(u8, u32), String> = BTreeMap::new();
    for (worker, _) in pairs {
        columns
            .entry((worker.day_in_cycle, worker.owner_id))
            .or_insert_with(|| worker.display_value());
    }
    let column_keys: Vec<(u8, u32)> = columns.keys().copied().collect();

    let mut header = Vec::with_capacity(column_keys.len() + 1);
    header.push("Time of Day".to_string());
    header.extend(
        columns
            .iter()
            .map(|((day, _), display)| column_label(*day, display)),
    );

    let grid: Vec<u16> = (0..MINUTES_PER_DAY).step_by(cfg.interval as usize).collect();
    let mut rows: Vec<Row> = grid
        .iter()
        .map(|time_of_day| Row {
            time_of_day: *time_of_day,
            cells: vec![None; column_keys.len()],
        })
        .collect();
    let row_of: BTreeMap<u16, usize> = grid.iter().enumerate().map(|(i, t)| (*t, i)).collect();

    for (worker, _) in pairs {
        let column = column_keys
            .binary_search(&(worker.day_in_cycle, worker.owner_id))
            .expect("column set was built from these pairs");
        if let Some(row) = row_of.get(&worker.time_of_day) {
            rows[*row].cells[column] = Some(worker.display_value());
        }
    }

    ScheduleTable {
        header,
        rows: prune_empty_rows(rows),
    }
}

impl ScheduleTable {
    /// CSV rendition: header first, `,`-joined fields, `\n`-joined rows,
    /// empty cells as the literal "None".
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(row.cells.len() + 1);
            record.push(time::hhmm(row.time_of_day));
            record.extend(
                row.cells
                    .iter()
                    .map(|cell| cell.clone().unwrap_or_else(|| EMPTY_CELL.to_string())),
            );
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| ScheduleError::Io(std::io::Error::other(err)))?;
        String::from_utf8(bytes).map_err(|err| ScheduleError::Io(std::io::Error::other(err)))
    }

    /// Terminal rendition for the interactive session.
    pub fn render(&self) -> tabled::Table {
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(self.header.clone());
        for row in &self.rows {
            let mut record = Vec::with_capacity(row.cells.len() + 1);
            record.push(time::hhmm(row.time_of_day));
            record.extend(row.cells.iter().map(|cell| cell.clone().unwrap_or_default()));
            builder.push_record(record);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        table
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
