use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tabled::Tabled;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

mod availability;
mod error;
mod matching;
mod roster;
mod slot;
mod table;
mod time;
mod weight;

use crate::matching::{Matcher, ReferenceMatcher, SubprocessMatcher};
use crate::roster::{MatchOutcome, Roster};
use crate::slot::{DAY_LETTERS, Slot, SlotConfig, SlotKind};
use crate::weight::WeightPolicy;

#[derive(Parser)]
struct Args {
    /// Path to the JSON roster file
    #[arg(short, long, value_name = "FILE", default_value = "data/default.json")]
    roster: PathBuf,

    /// External bipartite matcher executable; omit to use the built-in matcher
    #[arg(short, long, value_name = "EXE")]
    solver: Option<PathBuf>,

    /// Seconds to wait for the external matcher
    #[arg(long, default_value_t = 30)]
    solver_timeout: u64,

    /// Slot length in minutes
    #[arg(long, default_value_t = 15)]
    interval: u16,

    /// Earliest shift start hour, used to disambiguate early start times
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(0..24))]
    first_shift: u16,

    /// Take start times literally instead of inferring the afternoon
    #[arg(long)]
    military_time: bool,

    /// Weighting applied to worker slots
    #[arg(long, value_enum, default_value_t = WeightPolicy::LongestBlock)]
    policy: WeightPolicy,

    /// Default path for the exported schedule CSV
    #[arg(short, long, value_name = "FILE", default_value = "new_schedule.csv")]
    output: PathBuf,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let mut candidates = Vec::new();

        for cmd in &self.commands {
            if cmd.starts_with(line) {
                candidates.push(Pair {
                    display: cmd.clone(),
                    replacement: format!("{} ", cmd),
                });
            }
        }

        Ok((0, candidates))
    }
}

fn paginate(content: String) {
    let mut pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn())
        .expect("Failed to spawn pager");

    let mut stdin = pager.stdin.take().expect("Failed to open stdin for pager");

    if let Err(e) = stdin.write_all(content.as_bytes()) {
        // Broken pipe is common if the user quits the pager early
        if e.kind() != std::io::ErrorKind::BrokenPipe {
            eprintln!("Error writing to pager: {}", e);
        }
    }

    // Wait for the user to close the pager before returning to the ">> " prompt
    let _ = pager.wait();
}

fn show(content: String, rows: usize) {
    if rows > 20 {
        paginate(content);
    } else {
        println!("{}", content);
    }
}

#[derive(Tabled)]
struct RosterRow {
    id: u32,
    name: String,
    kind: SlotKind,
    #[tabled(rename = "max hours")]
    max_hours: String,
    #[tabled(rename = "days declared")]
    days: usize,
}

#[derive(Tabled)]
struct SlotRow {
    day: char,
    time: String,
    owner: String,
    kind: SlotKind,
    weight: u32,
}

fn slot_rows(slots: &[Slot]) -> Vec<SlotRow> {
    slots
        .iter()
        .map(|s| SlotRow {
            day: DAY_LETTERS.get(s.day_in_cycle as usize).copied().unwrap_or('?'),
            time: time::hhmm(s.time_of_day),
            owner: s.display_value(),
            kind: s.kind,
            weight: s.weight,
        })
        .collect()
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("Nothing to show.");
        return;
    }
    let count = rows.len();
    let mut table = tabled::Table::new(&rows);
    table.with(Style::rounded());
    table.with(tabled::settings::Alignment::left());
    show(table.to_string(), count);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    let cfg = SlotConfig {
        interval: args.interval,
        first_shift: args.first_shift * 60,
        military_time: args.military_time,
    };

    let roster = Roster::load_from_file(
        args.roster.to_str().ok_or("roster path is not valid UTF-8")?,
        cfg,
        args.policy,
    )?;
    println!(
        "Loaded {} workers and {} shift templates from {}",
        roster.workers.len(),
        roster.shifts.len(),
        args.roster.display()
    );

    let matcher: Box<dyn Matcher> = match &args.solver {
        Some(exe) => Box::new(SubprocessMatcher::new(
            exe.clone(),
            Duration::from_secs(args.solver_timeout),
        )),
        None => Box::new(ReferenceMatcher),
    };

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: vec![
            "roster".to_string(),
            "slots".to_string(),
            "match".to_string(),
            "table".to_string(),
            "export".to_string(),
            "help".to_string(),
            "exit".to_string(),
        ],
    };

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    let mut outcome: Option<MatchOutcome> = None;

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(trimmed)?;

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                match parts[0] {
                    "roster" => {
                        let rows: Vec<RosterRow> = roster
                            .workers
                            .iter()
                            .chain(roster.shifts.iter())
                            .map(|r| RosterRow {
                                id: r.id,
                                name: r.name.to_string(),
                                kind: r.kind,
                                max_hours: r
                                    .max_hours
                                    .map(|h| h.to_string())
                                    .unwrap_or_else(|| "-".to_string()),
                                days: r.hours.len(),
                            })
                            .collect();
                        print_table(rows);
                    }
                    "slots" => {
                        let sub = parts.get(1).copied().unwrap_or("w");
                        let listed = match sub {
                            "s" | "shift" => Ok(slot_rows(&roster.shift_slots())),
                            _ => roster.worker_slots().map(|slots| slot_rows(&slots)),
                        };
                        match listed {
                            Ok(rows) => print_table(rows),
                            Err(e) => println!("{}", e.to_string().red()),
                        }
                    }
                    "match" => match roster.run(matcher.as_ref()) {
                        Ok(result) => {
                            println!(
                                "{}",
                                format!("Matched {} slot pairs.", result.pairs.len()).green()
                            );
                            outcome = Some(result);
                        }
                        Err(e) => println!("{}", e.to_string().red()),
                    },
                    "table" => match &outcome {
                        Some(result) if !result.table.is_empty() => {
                            let rendered = result.table.render().to_string();
                            let rows = result.table.rows.len();
                            show(rendered, rows);
                        }
                        Some(_) => println!("The last match produced an empty schedule."),
                        None => println!("No schedule yet. Run 'match' first."),
                    },
                    "export" => match &outcome {
                        Some(result) => {
                            let path = parts
                                .get(1)
                                .map(PathBuf::from)
                                .unwrap_or_else(|| args.output.clone());
                            let written = result
                                .table
                                .to_csv()
                                .and_then(|csv| Ok(std::fs::write(&path, csv)?));
                            match written {
                                Ok(()) => println!(
                                    "{}",
                                    format!("Schedule written to {}", path.display()).green()
                                ),
                                Err(e) => println!("{}", e.to_string().red()),
                            }
                        }
                        None => println!("No schedule yet. Run 'match' first."),
                    },
                    "help" | "?" => {
                        println!("\nAvailable Commands:");
                        println!("  roster          - List availability records");
                        println!("  slots [w|s]     - List generated worker or shift slots");
                        println!("  match           - Build the graph and run the matcher");
                        println!("  table           - Show the matched schedule");
                        println!("  export [file]   - Write the schedule as CSV");
                        println!("  help / ?        - Show this help menu");
                        println!("  exit / quit     - Exit\n");
                    }
                    "exit" | "quit" => break,
                    _ => println!("Unknown command: {}", parts[0]),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_shift_hour_is_range_checked() {
        assert!(Args::try_parse_from(["shiftmatch", "--first-shift", "23"]).is_ok());
        assert!(Args::try_parse_from(["shiftmatch", "--first-shift", "24"]).is_err());
    }
}
