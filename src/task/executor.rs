use crate::validation::{ValidationJob, ValidationOutcome};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

/// Runs validation jobs on the ambient tokio runtime and hands completions
/// back in the order they resolve. Jobs for different fields never wait on
/// each other.
pub struct ValidationExecutor {
    completion_tx: UnboundedSender<ValidationOutcome>,
    completion_rx: UnboundedReceiver<ValidationOutcome>,
    in_flight: usize,
}

impl ValidationExecutor {
    pub fn new() -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel::<ValidationOutcome>();
        Self {
            completion_tx,
            completion_rx,
            in_flight: 0,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn spawn(&mut self, job: ValidationJob) {
        let completion_tx = self.completion_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = job.run().await;
            let _ = completion_tx.send(outcome);
        });
    }

    pub fn spawn_all(&mut self, jobs: impl IntoIterator<Item = ValidationJob>) {
        for job in jobs {
            self.spawn(job);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Waits for the next completion. `None` once nothing is in flight.
    pub async fn next(&mut self) -> Option<ValidationOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.completion_rx.recv().await;
        if outcome.is_some() {
            self.in_flight -= 1;
        }
        outcome
    }

    pub fn drain_ready(&mut self) -> Vec<ValidationOutcome> {
        let mut out = Vec::<ValidationOutcome>::new();
        loop {
            match self.completion_rx.try_recv() {
                Ok(outcome) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    out.push(outcome);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

impl Default for ValidationExecutor {
    fn default() -> Self {
        Self::new()
    }
}
