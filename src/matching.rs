use crate::error::{Result, ScheduleError};
use crate::slot::{IdentityKey, MatchKey, Slot, SlotKind};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub weight: u32,
}

pub struct Graph {
    pub vertex_count: usize,
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Solver input format: vertex count, edge count, then one
    /// "from to weight" line per edge.
    pub fn serialize(&self) -> String {
        let mut lines = Vec::with_capacity(self.edges.len() + 2);
        lines.push(self.vertex_count.to_string());
        lines.push(self.edges.len().to_string());
        for edge in &self.edges {
            lines.push(format!("{} {} {}", edge.from, edge.to, edge.weight));
        }
        lines.join("\n")
    }
}

pub trait Matcher {
    fn solve(&self, graph: &Graph) -> Result<Vec<(usize, usize)>>;
}

/// Candidate pairs by hash-join on the match key, O(n+m) expected
/// instead of the nested-loop O(n*m).
pub(crate) fn candidate_edges<'a>(
    workers: &'a [Slot],
    shifts: &'a [Slot],
) -> Vec<(&'a Slot, &'a Slot)> {
    let mut join_zone: HashMap<MatchKey, Vec<&Slot>> = HashMap::new();
    for worker in workers {
        join_zone.entry(worker.match_key()).or_default().push(worker);
    }

    let mut pairs = Vec::new();
    for shift in shifts {
        if let Some(matched_workers) = join_zone.get(&shift.match_key()) {
            for worker in matched_workers {
                pairs.push((*worker, shift));
            }
        }
    }
    pairs
}

/// Combines and sorts all slots into the vertex list, then derives the
/// edge set. Vertex indices are a pure function of the sorted input:
/// identical slot sets produce identical indices regardless of input
/// ordering.
pub(crate) fn build_graph(workers: &[Slot], shifts: &[Slot]) -> (Vec<Slot>, Graph) {
    let mut all: Vec<Slot> = workers.iter().chain(shifts.iter()).cloned().collect();
    all.sort_by_key(Slot::order_key);

    let mut vertex_of: HashMap<IdentityKey, usize> = HashMap::new();
    for (index, slot) in all.iter().enumerate() {
        vertex_of.entry(slot.identity_key()).or_insert(index);
    }

    let edges = candidate_edges(workers, shifts)
        .into_iter()
        .map(|(worker, shift)| Edge {
            from: vertex_of[&worker.identity_key()],
            to: vertex_of[&shift.identity_key()],
            // By convention the edge carries the worker slot's weight.
            weight: worker.weight,
        })
        .collect();

    let graph = Graph {
        vertex_count: all.len(),
        edges,
    };
    (all, graph)
}

/// Runs the full matching pipeline and maps the solver's vertex pairs
/// back to `(worker slot, shift slot)`. Output order is unspecified.
pub fn assign(
    workers: &[Slot],
    shifts: &[Slot],
    matcher: &dyn Matcher,
) -> Result<Vec<(Slot, Slot)>> {
    let (all, graph) = build_graph(workers, shifts);
    let matched = matcher.solve(&graph)?;

    let lookup = |vertex: usize| -> Result<&Slot> {
        all.get(vertex).ok_or_else(|| {
            ScheduleError::DataIntegrity(format!(
                "solver returned vertex {} but only {} vertices exist",
                vertex,
                all.len()
            ))
        })
    };

    let mut assignments = Vec::with_capacity(matched.len());
    for (a, b) in matched {
        let slot_a = lookup(a)?;
        let slot_b = lookup(b)?;
        let (worker, shift) = match (slot_a.kind, slot_b.kind) {
            (SlotKind::Worker, SlotKind::Shift) => (slot_a, slot_b),
            (SlotKind::Shift, SlotKind::Worker) => (slot_b, slot_a),
            _ => {
                return Err(ScheduleError::DataIntegrity(format!(
                    "matched pair ({}, {}) does not join a worker to a shift",
                    a, b
                )));
            }
        };
        assignments.push((worker.clone(), shift.clone()));
    }
    Ok(assignments)
}

/// Parses solver stdout: a "label: count" line, one header/blank line,
/// then `count` "v1 v2" lines. Malformed pair lines are filtered out
/// rather than fatal; a resulting shortfall against the reported count
/// is surfaced as a warning.
pub fn parse_solution(output: &str) -> Result<Vec<(usize, usize)>> {
    let mut lines = output.lines();
    let header = lines
        .next()
        .ok_or_else(|| ScheduleError::Matching("solver produced no output".to_string()))?;
    let (_, count_text) = header.split_once(':').ok_or_else(|| {
        ScheduleError::Matching(format!("solver header '{}' has no count", header))
    })?;
    let reported: usize = count_text.trim().parse().map_err(|_| {
        ScheduleError::Matching(format!("solver header count '{}' is not numeric", count_text))
    })?;

    let pairs: Vec<(usize, usize)> = lines
        .skip(1)
        .take(reported)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let a = fields.next()?.parse().ok()?;
            let b = fields.next()?.parse().ok()?;
            if fields.next().is_some() {
                return None;
            }
            Some((a, b))
        })
        .collect();

    if pairs.len() != reported {
        tracing::warn!(
            reported,
            parsed = pairs.len(),
            "solver reported more matched edges than parsed cleanly"
        );
    }
    Ok(pairs)
}

/// Blocking adapter around the external bipartite matching executable.
/// The graph is written to a scoped temp file that is removed when the
/// call returns, on success and failure alike.
pub struct SubprocessMatcher {
    program: PathBuf,
    timeout: Duration,
}

impl SubprocessMatcher {
    const POLL_INTERVAL: Duration = Duration::from_millis(25);

    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        SubprocessMatcher {
            program: program.into(),
            timeout,
        }
    }
}

impl Matcher for SubprocessMatcher {
    fn solve(&self, graph: &Graph) -> Result<Vec<(usize, usize)>> {
        let mut input = tempfile::NamedTempFile::new()?;
        input.write_all(graph.serialize().as_bytes())?;
        input.flush()?;

        tracing::info!(
            program = %self.program.display(),
            vertices = graph.vertex_count,
            edges = graph.edges.len(),
            "invoking external matcher"
        );

        let mut child = Command::new(&self.program)
            .arg("-f")
            .arg(input.path())
            .arg("--max")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                ScheduleError::Matching(format!(
                    "failed to start solver {}: {}",
                    self.program.display(),
                    err
                ))
            })?;

        let mut stdout_pipe = child.stdout.take();
        let reader = std::thread::spawn(move || {
            use std::io::Read;
            let mut buffer = String::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut buffer);
            }
            buffer
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ScheduleError::Matching(format!(
                        "solver exceeded the {}s timeout",
                        self.timeout.as_secs()
                    )));
                }
                None => std::thread::sleep(Self::POLL_INTERVAL),
            }
        };

        let stdout = reader
            .join()
            .map_err(|_| ScheduleError::Matching("failed to collect solver output".to_string()))?;

        if !status.success() {
            return Err(ScheduleError::Matching(format!(
                "solver exited with {}",
                status
            )));
        }
        parse_solution(&stdout)
    }
}

/// In-process matcher for tests and solver-less runs. Augmenting-path
/// matching over the bipartite graph, visiting left vertices in
/// descending weight order. Edge weights here are worker-vertex weights,
/// for which this greedy order yields a maximum-weight matching.
#[derive(Default)]
pub struct ReferenceMatcher;

impl ReferenceMatcher {
    fn augment(
        left: usize,
        adjacency: &HashMap<usize, Vec<usize>>,
        matched_right: &mut HashMap<usize, usize>,
        visited: &mut HashSet<usize>,
    ) -> bool {
        let Some(neighbors) = adjacency.get(&left) else {
            return false;
        };
        for &right in neighbors {
            if !visited.insert(right) {
                continue;
            }
            let displaced = matched_right.get(&right).copied();
            let can_take = match displaced {
                None => true,
                Some(other) => Self::augment(other, adjacency, matched_right, visited),
            };
            if can_take {
                matched_right.insert(right, left);
                return true;
            }
        }
        false
    }
}

impl Matcher for ReferenceMatcher {
    fn solve(&self, graph: &Graph) -> Result<Vec<(usize, usize)>> {
        let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut weight_of: HashMap<usize, u32> = HashMap::new();
        for edge in &graph.edges {
            adjacency.entry(edge.from).or_default().push(edge.to);
            weight_of
                .entry(edge.from)
                .and_modify(|w| *w = (*w).max(edge.weight))
                .or_insert(edge.weight);
        }

        let mut lefts: Vec<usize> = adjacency.keys().copied().collect();
        lefts.sort_by_key(|v| (std::cmp::Reverse(weight_of[v]), *v));

        let mut matched_right: HashMap<usize, usize> = HashMap::new();
        for left in lefts {
            let mut visited = HashSet::new();
            Self::augment(left, &adjacency, &mut matched_right, &mut visited);
        }

        let mut pairs: Vec<(usize, usize)> = matched_right
            .into_iter()
            .map(|(right, left)| (left, right))
            .collect();
        pairs.sort_unstable();
        Ok(pairs)
    }
}
