//! Distributed evaluation of the energy gradient.
//!
//! A coordinator broadcasts `Task::Start` once per minimisation and then
//! `Task::Evaluate` for every parameter vector. Worker `rank` evaluates the
//! bra rows `k ≡ rank (mod size)` and sends back its `PartialGradient`. The
//! coordinator waits for all shards, adds them in rank order and applies the
//! natural-orbital correction once.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{FmdError, Result};
use crate::gaussian::GradSlaterDet;
use crate::observables::{Hamiltonian, Interaction};
use crate::operator::{rows_for, PartialGradient};
use crate::parameterization::Parameterization;
use crate::slater::{GradSlaterDetAux, SlaterDet, SlaterDetAux};

/// Messages from the coordinator to the workers.
#[derive(Clone)]
pub enum Task {
    Start {
        interaction: Arc<Interaction>,
        parameterization: Arc<dyn Parameterization>,
    },
    Evaluate {
        params: Arc<Vec<f64>>,
    },
    Finish,
}

type Shard = (usize, Result<PartialGradient>);

/// How often a waiting coordinator checks for dead workers.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Worker threads of one minimisation run.
pub struct WorkerPool {
    tasks: Vec<mpsc::Sender<Task>>,
    results: mpsc::Receiver<Shard>,
    handles: Vec<JoinHandle<()>>,
}

fn evaluate_shard(
    rank: usize,
    size: usize,
    interaction: &Interaction,
    parameterization: &dyn Parameterization,
    params: &[f64],
) -> Result<PartialGradient> {
    let det = parameterization.to_slater_det(params)?;
    let aux = SlaterDetAux::new(&det)?;
    let daux = GradSlaterDetAux::diagonal(&det, &aux);
    let rows = rows_for(det.len(), rank, size);
    Ok(Hamiltonian::new(interaction, &det).partial_gradient(&det, &aux, &daux, &rows))
}

fn run_worker(rank: usize, size: usize, tasks: mpsc::Receiver<Task>, results: mpsc::Sender<Shard>) {
    let mut setup: Option<(Arc<Interaction>, Arc<dyn Parameterization>)> = None;
    for task in tasks {
        match task {
            Task::Start {
                interaction,
                parameterization,
            } => {
                debug!("worker {rank} started for {}", parameterization.name());
                setup = Some((interaction, parameterization));
            }
            Task::Evaluate { params } => {
                let result = match &setup {
                    Some((interaction, parameterization)) => evaluate_shard(
                        rank,
                        size,
                        interaction,
                        parameterization.as_ref(),
                        &params,
                    ),
                    None => Err(FmdError::Dispatch(format!(
                        "worker {rank} received work before the start task"
                    ))),
                };
                if results.send((rank, result)).is_err() {
                    break;
                }
            }
            Task::Finish => break,
        }
    }
    debug!("worker {rank} finished");
}

fn hung_up(rank: usize) -> FmdError {
    FmdError::Dispatch(format!("worker {rank} hung up"))
}

impl WorkerPool {
    pub fn spawn(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(FmdError::Dispatch("pool needs at least one worker".to_string()));
        }
        let (result_tx, result_rx) = mpsc::channel::<Shard>();
        let mut tasks = Vec::with_capacity(size);
        let mut handles = Vec::with_capacity(size);
        for rank in 0..size {
            let (task_tx, task_rx) = mpsc::channel::<Task>();
            let results = result_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("fmd-worker-{rank}"))
                .spawn(move || run_worker(rank, size, task_rx, results))?;
            tasks.push(task_tx);
            handles.push(handle);
        }
        info!("started {size} workers");
        Ok(Self {
            tasks,
            results: result_rx,
            handles,
        })
    }

    pub fn size(&self) -> usize {
        self.tasks.len()
    }

    fn broadcast(&self, task: Task) -> Result<()> {
        for (rank, tx) in self.tasks.iter().enumerate() {
            tx.send(task.clone()).map_err(|_| hung_up(rank))?;
        }
        Ok(())
    }

    pub fn start(
        &self,
        interaction: Arc<Interaction>,
        parameterization: Arc<dyn Parameterization>,
    ) -> Result<()> {
        self.broadcast(Task::Start {
            interaction,
            parameterization,
        })
    }

    /// Sum of all shards for `params`, reduced in rank order.
    pub fn evaluate(&self, params: &[f64]) -> Result<PartialGradient> {
        self.broadcast(Task::Evaluate {
            params: Arc::new(params.to_vec()),
        })?;

        let size = self.size();
        let mut shards: Vec<Option<Result<PartialGradient>>> = (0..size).map(|_| None).collect();
        let mut received = 0;
        while received < size {
            match self.results.recv_timeout(POLL_INTERVAL) {
                Ok((rank, shard)) => {
                    shards[rank] = Some(shard);
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => self.check_alive(&shards)?,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(FmdError::Dispatch("all workers hung up".to_string()))
                }
            }
        }

        let mut total: Option<PartialGradient> = None;
        for (rank, shard) in shards.into_iter().enumerate() {
            let part = shard.ok_or_else(|| hung_up(rank))??;
            total = Some(match total {
                Some(acc) => acc + part,
                None => part,
            });
        }
        total.ok_or_else(|| FmdError::Dispatch("empty pool".to_string()))
    }

    /// A worker only exits after `Task::Finish`, so one that is gone while
    /// its shard is still missing has panicked.
    fn check_alive(&self, shards: &[Option<Result<PartialGradient>>]) -> Result<()> {
        for (rank, handle) in self.handles.iter().enumerate() {
            if shards[rank].is_none() && handle.is_finished() {
                return Err(FmdError::Dispatch(format!(
                    "worker {rank} died before sending its shard"
                )));
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        for tx in &self.tasks {
            // a worker that already left has nothing to finish
            let _ = tx.send(Task::Finish);
        }
        let mut panicked = 0;
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(FmdError::Dispatch(format!("{panicked} workers panicked")));
        }
        Ok(())
    }

    /// Stop all workers and wait for them.
    pub fn finish(mut self) -> Result<()> {
        self.shutdown()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Where the evaluation of one minimisation run happens.
pub struct ExecutionContext {
    pub rank: usize,
    pub size: usize,
    pool: Option<WorkerPool>,
}

impl ExecutionContext {
    pub fn serial() -> Self {
        Self {
            rank: 0,
            size: 1,
            pool: None,
        }
    }

    /// Coordinator with `workers` worker threads; serial for fewer than two.
    pub fn with_workers(workers: usize) -> Result<Self> {
        if workers < 2 {
            return Ok(Self::serial());
        }
        Ok(Self {
            rank: 0,
            size: workers,
            pool: Some(WorkerPool::spawn(workers)?),
        })
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub fn start(
        &self,
        interaction: &Interaction,
        parameterization: Arc<dyn Parameterization>,
    ) -> Result<()> {
        match &self.pool {
            Some(pool) => pool.start(Arc::new(interaction.clone()), parameterization),
            None => Ok(()),
        }
    }

    /// Energy and gradient of the determinant described by `params`.
    pub fn energy_gradient(
        &self,
        hamiltonian: &Hamiltonian,
        params: &[f64],
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> Result<GradSlaterDet> {
        match &self.pool {
            Some(pool) => Ok(pool.evaluate(params)?.finish(aux, daux)),
            None => Ok(hamiltonian.gradient(det, aux, daux)),
        }
    }

    pub fn finish(self) -> Result<()> {
        match self.pool {
            Some(pool) => pool.finish(),
            None => Ok(()),
        }
    }
}
