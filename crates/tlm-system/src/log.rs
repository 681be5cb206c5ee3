//! Sampled node values recorded during a run.

use tlm_core::{NodeId, Real};
use tlm_node::NodeTable;

/// One logged node slot.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSeries {
    pub node: NodeId,
    /// `component.port` of the first attachment of the node.
    pub label: String,
    pub slot: String,
    pub unit: String,
    pub values: Vec<Real>,
}

impl LogSeries {
    /// `label#slot`, the column name used when exporting.
    pub fn key(&self) -> String {
        format!("{}#{}", self.label, self.slot)
    }
}

/// Time axis and every slot of every logged node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataLog {
    time: Vec<Real>,
    series: Vec<LogSeries>,
    /// Step indices (1-based) at which a sample is taken.
    schedule: Vec<usize>,
    cursor: usize,
}

impl DataLog {
    /// Prepare a log over `nodes` for a run of `num_steps` steps.
    ///
    /// `samples` evenly spaced steps are recorded, plus the start sample.
    pub fn new(table: &NodeTable, nodes: &[(NodeId, String)], num_steps: usize, samples: usize) -> Self {
        let schedule = sample_schedule(num_steps, samples);
        let capacity = schedule.len() + 1;
        let mut series = Vec::new();
        for (node, label) in nodes {
            let Some(node_type) = table.node_type(*node) else {
                continue;
            };
            for slot in node_type.slots() {
                series.push(LogSeries {
                    node: *node,
                    label: label.clone(),
                    slot: slot.name.clone(),
                    unit: slot.unit.clone(),
                    values: Vec::with_capacity(capacity),
                });
            }
        }
        Self {
            time: Vec::with_capacity(capacity),
            series,
            schedule,
            cursor: 0,
        }
    }

    /// Record the current values unconditionally.
    pub fn record(&mut self, time: Real, table: &NodeTable) {
        self.time.push(time);
        let mut current: Option<(NodeId, &[Real])> = None;
        let mut slot = 0;
        for series in &mut self.series {
            match current {
                Some((node, _)) if node == series.node => slot += 1,
                _ => {
                    current = Some((series.node, table.node_values(series.node)));
                    slot = 0;
                }
            }
            let value = current
                .and_then(|(_, values)| values.get(slot).copied())
                .unwrap_or(Real::NAN);
            series.values.push(value);
        }
    }

    /// Record if `step` is the next scheduled sample.
    pub fn step(&mut self, step: usize, time: Real, table: &NodeTable) {
        if self.schedule.get(self.cursor) == Some(&step) {
            self.cursor += 1;
            self.record(time, table);
        }
    }

    pub fn time(&self) -> &[Real] {
        &self.time
    }

    pub fn series(&self) -> &[LogSeries] {
        &self.series
    }

    /// Series by `label#slot` key.
    pub fn find(&self, label: &str, slot: &str) -> Option<&LogSeries> {
        self.series
            .iter()
            .find(|s| s.label == label && s.slot == slot)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Distinct steps `round(j * n / samples)` for `j = 1..=samples`.
fn sample_schedule(num_steps: usize, samples: usize) -> Vec<usize> {
    if num_steps == 0 || samples == 0 {
        return Vec::new();
    }
    if samples >= num_steps {
        return (1..=num_steps).collect();
    }
    let mut schedule: Vec<usize> = (1..=samples)
        .map(|j| ((j as f64) * (num_steps as f64) / (samples as f64)).round() as usize)
        .collect();
    schedule.dedup();
    schedule
}
