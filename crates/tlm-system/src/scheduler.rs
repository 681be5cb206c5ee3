//! Runs independent top-level systems across worker threads.
//!
//! Each system is measured for a few steps, the systems are packed into
//! partitions by cost (longest processing time first), and every non-empty
//! partition runs sequentially on its own worker.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tlm_core::Real;

use crate::error::SystemResult;
use crate::system::ComponentSystem;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Worker count; 0 uses the available parallelism, negative runs
    /// everything on the calling thread.
    pub threads: i32,
    /// Steps run per system to estimate its cost.
    pub measure_steps: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            measure_steps: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Initializing,
    Measuring,
    Partitioned,
    Running,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleReport {
    /// System indices per worker, in execution order.
    pub partitions: Vec<Vec<usize>>,
    /// Names of systems that stopped early.
    pub aborted: Vec<String>,
    pub elapsed: Duration,
}

impl ScheduleReport {
    pub fn is_success(&self) -> bool {
        self.aborted.is_empty()
    }
}

/// Greedy longest-processing-time packing of `costs` into `partitions` bins.
///
/// Items are taken by descending cost (ties by index) and each goes to the
/// least loaded bin (ties to the lowest bin).
pub fn partition_by_cost(costs: &[Real], partitions: usize) -> Vec<Vec<usize>> {
    let partitions = partitions.max(1);
    let mut order: Vec<usize> = (0..costs.len()).collect();
    order.sort_by(|a, b| costs[*b].total_cmp(&costs[*a]));

    let mut bins = vec![Vec::new(); partitions];
    let mut loads = vec![0.0; partitions];
    for item in order {
        let mut target = 0;
        for (i, load) in loads.iter().enumerate() {
            if *load < loads[target] {
                target = i;
            }
        }
        bins[target].push(item);
        loads[target] += costs[item];
    }
    bins
}

/// Summed cost of each partition.
pub fn partition_loads(costs: &[Real], partitions: &[Vec<usize>]) -> Vec<Real> {
    partitions
        .iter()
        .map(|p| p.iter().map(|&i| costs[i]).sum())
        .collect()
}

#[derive(Debug)]
pub struct Scheduler {
    options: SchedulerOptions,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(options: SchedulerOptions) -> Self {
        Self {
            options,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// `None` when everything runs on the calling thread.
    fn worker_count(&self) -> Option<usize> {
        match self.options.threads {
            t if t < 0 => None,
            0 => std::thread::available_parallelism()
                .ok()
                .map(std::num::NonZeroUsize::get),
            t => Some(t as usize),
        }
    }

    /// Initialize every system and run each to `stop_time`.
    ///
    /// A system that aborts does not stop the others; it is listed in the
    /// report, which then counts as failed.
    pub fn run(
        &mut self,
        systems: &mut [ComponentSystem],
        start_time: Real,
        stop_time: Real,
    ) -> SystemResult<ScheduleReport> {
        let started = Instant::now();
        self.state = SchedulerState::Initializing;
        for system in systems.iter_mut() {
            if let Err(e) = system.initialize(start_time, stop_time) {
                self.state = SchedulerState::Aborted;
                return Err(e);
            }
        }

        let partitions = match self.worker_count() {
            None => {
                tracing::debug!(systems = systems.len(), "running sequentially");
                self.state = SchedulerState::Running;
                for system in systems.iter_mut() {
                    system.simulate(stop_time)?;
                }
                vec![(0..systems.len()).collect()]
            }
            Some(workers) => {
                self.state = SchedulerState::Measuring;
                let costs = self.measure(systems, start_time, stop_time)?;
                let partitions = partition_by_cost(&costs, workers.min(systems.len()));
                self.state = SchedulerState::Partitioned;
                tracing::debug!(
                    workers,
                    loads = ?partition_loads(&costs, &partitions),
                    "partitioned"
                );
                self.state = SchedulerState::Running;
                run_partitions(systems, &partitions, stop_time)?;
                partitions
            }
        };

        let aborted: Vec<String> = systems
            .iter()
            .filter(|s| s.is_aborted())
            .map(|s| s.name().to_owned())
            .collect();
        self.state = if aborted.is_empty() {
            SchedulerState::Finished
        } else {
            SchedulerState::Aborted
        };
        let elapsed = started.elapsed();
        tracing::info!(systems = systems.len(), ?elapsed, aborted = aborted.len(), "run finished");
        Ok(ScheduleReport {
            partitions,
            aborted,
            elapsed,
        })
    }

    fn measure(
        &self,
        systems: &mut [ComponentSystem],
        start_time: Real,
        stop_time: Real,
    ) -> SystemResult<Vec<Real>> {
        let mut costs = Vec::with_capacity(systems.len());
        for system in systems.iter_mut() {
            let until = (start_time + self.options.measure_steps as Real * system.timestep()).min(stop_time);
            let t0 = Instant::now();
            system.simulate(until)?;
            let cost = t0.elapsed();
            system.set_measured_cost(cost);
            costs.push(cost.as_secs_f64());
        }
        Ok(costs)
    }
}

fn run_group(group: Vec<&mut ComponentSystem>, stop_time: Real) -> SystemResult<()> {
    for system in group {
        system.simulate(stop_time)?;
    }
    Ok(())
}

fn run_partitions(
    systems: &mut [ComponentSystem],
    partitions: &[Vec<usize>],
    stop_time: Real,
) -> SystemResult<()> {
    let mut slots: Vec<Option<&mut ComponentSystem>> = systems.iter_mut().map(Some).collect();
    let groups: Vec<Vec<&mut ComponentSystem>> = partitions
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.iter()
                .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
                .collect()
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(groups.len())
        .thread_name(|i| format!("tlm-worker-{i}"))
        .build();
    let results: Vec<SystemResult<()>> = match pool {
        Ok(pool) => pool.install(|| {
            groups
                .into_par_iter()
                .map(|group| run_group(group, stop_time))
                .collect()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "worker pool unavailable, running sequentially");
            groups
                .into_iter()
                .map(|group| run_group(group, stop_time))
                .collect()
        }
    };
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lpt_balances_example_loads() {
        let costs = [10.0, 7.0, 5.0, 5.0, 3.0];
        let parts = partition_by_cost(&costs, 2);
        assert_eq!(partition_loads(&costs, &parts), vec![15.0, 15.0]);

        let costs = [10.0, 10.0, 10.0];
        let parts = partition_by_cost(&costs, 2);
        assert_eq!(partition_loads(&costs, &parts), vec![20.0, 10.0]);
        assert_eq!(parts, vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn more_bins_than_items_leaves_bins_empty() {
        let parts = partition_by_cost(&[1.0], 3);
        assert_eq!(parts, vec![vec![0], vec![], vec![]]);
        assert_eq!(partition_by_cost(&[], 0), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn worker_count_follows_options() {
        let sequential = Scheduler::new(SchedulerOptions {
            threads: -1,
            ..Default::default()
        });
        assert_eq!(sequential.worker_count(), None);
        let fixed = Scheduler::new(SchedulerOptions {
            threads: 3,
            ..Default::default()
        });
        assert_eq!(fixed.worker_count(), Some(3));
        assert_eq!(fixed.state(), SchedulerState::Idle);
    }

    proptest! {
        #[test]
        fn every_item_is_assigned_once(
            costs in proptest::collection::vec(0.0f64..100.0, 0..40),
            bins in 1usize..8,
        ) {
            let parts = partition_by_cost(&costs, bins);
            prop_assert_eq!(parts.len(), bins);
            let mut seen: Vec<usize> = parts.iter().flatten().copied().collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..costs.len()).collect::<Vec<_>>());
        }

        #[test]
        fn max_load_within_greedy_bound(
            costs in proptest::collection::vec(0.0f64..100.0, 1..40),
            bins in 1usize..8,
        ) {
            let parts = partition_by_cost(&costs, bins);
            let loads = partition_loads(&costs, &parts);
            let total: f64 = costs.iter().sum();
            let largest = costs.iter().copied().fold(0.0, f64::max);
            let max_load = loads.iter().copied().fold(0.0, f64::max);
            prop_assert!(max_load <= total / bins as f64 + largest + 1e-9);
        }
    }
}
