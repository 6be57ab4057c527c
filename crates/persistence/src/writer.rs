//! Background autosave.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use sim_core::GameState;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::SaveSlot;

enum Job {
    Save(Box<GameState>),
    Flush(Sender<()>),
}

/// Writes snapshots to a [`SaveSlot`] on a dedicated thread.
///
/// [`submit`](Self::submit) never touches storage. Snapshots that queue up
/// while a write is in flight are coalesced and only the newest is written.
/// Dropping the writer drains the queue and joins the thread.
pub struct AutosaveWriter {
    key: String,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl AutosaveWriter {
    pub fn spawn(slot: SaveSlot) -> Result<Self> {
        let key = slot.key().to_string();
        let (jobs, queue) = unbounded();
        let worker = thread::Builder::new()
            .name(format!("autosave-{key}"))
            .spawn(move || run(slot, queue))
            .context("spawning autosave thread")?;
        Ok(Self {
            key,
            jobs: Some(jobs),
            worker: Some(worker),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Queue a copy of `state` for writing.
    pub fn submit(&self, state: &GameState) {
        self.send(Job::Save(Box::new(state.clone())));
    }

    /// Wait until everything submitted so far has been written or has failed.
    pub fn flush(&self) {
        let (ack, done) = bounded(1);
        if self.send(Job::Flush(ack)) {
            // an error here means the thread died and dropped the ack
            let _ = done.recv();
        }
    }

    fn send(&self, job: Job) -> bool {
        let Some(jobs) = &self.jobs else {
            return false;
        };
        if jobs.send(job).is_err() {
            warn!(key = %self.key, "autosave thread has stopped");
            return false;
        }
        true
    }
}

fn run(mut slot: SaveSlot, queue: Receiver<Job>) {
    while let Ok(first) = queue.recv() {
        let mut latest = None;
        let mut acks = Vec::new();
        for job in std::iter::once(first).chain(queue.try_iter()) {
            match job {
                Job::Save(state) => latest = Some(state),
                Job::Flush(ack) => acks.push(ack),
            }
        }
        if let Some(state) = latest {
            match slot.save(&state) {
                Ok(()) => debug!(key = slot.key(), month = state.month, "autosaved"),
                Err(err) => warn!(error = %err, key = slot.key(), "autosave failed"),
            }
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
}

impl Drop for AutosaveWriter {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(key = %self.key, "autosave thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for AutosaveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveWriter")
            .field("key", &self.key)
            .field("running", &self.jobs.is_some())
            .finish()
    }
}
