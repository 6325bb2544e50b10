//! [`SyncHandle`] confines a [`SyncController`] to one task.
//!
//! Every change to the measurement set and chart happens on the task spawned
//! here. Repository calls run on their own tasks and report back, so a slow
//! store never delays snapshots or draft creation. Callers talk to the task
//! over a command channel and receive replies on oneshot channels, so no
//! caller can observe a half-applied operation.
//!
//! Ordering: at most one repository call is outstanding per entry, and
//! commands for an entry that is busy wait their turn. A reload waits for
//! outstanding writes and holds back further entry commands until it lands.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use tokio::{
  sync::{mpsc, oneshot},
  task::{JoinHandle, JoinSet},
};
use tracing::{debug, warn};
use watertemp_core::{Measurement, store::MeasurementStore};

use crate::{
  Result, SyncError,
  chart::ChartProjection,
  controller::{EditOutcome, FieldEdit, Step, SyncController, Write, Written},
  observer::StateObserver,
  set::{Entry, EntryKey},
};

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<T>;

enum Command {
  Load { reply: Reply<Result<usize>> },
  AddDraft { reply: Reply<EntryKey> },
  SaveOrUpdate { key: EntryKey, record: Measurement, reply: Reply<Result<EntryKey>> },
  Edit { key: EntryKey, edits: Vec<FieldEdit>, reply: Reply<Result<EditOutcome>> },
  Delete { key: EntryKey, reply: Reply<Result<()>> },
  Snapshot { reply: Reply<StateSnapshot> },
}

impl Command {
  /// The entry this command acts on, if any.
  fn key(&self) -> Option<EntryKey> {
    match self {
      Self::SaveOrUpdate { key, .. } | Self::Edit { key, .. } | Self::Delete { key, .. } => {
        Some(*key)
      }
      Self::Load { .. } | Self::AddDraft { .. } | Self::Snapshot { .. } => None,
    }
  }

  fn rekey(&mut self, to: EntryKey) {
    match self {
      Self::SaveOrUpdate { key, .. } | Self::Edit { key, .. } | Self::Delete { key, .. } => {
        *key = to
      }
      Self::Load { .. } | Self::AddDraft { .. } | Self::Snapshot { .. } => {}
    }
  }
}

/// A consistent copy of the table and chart at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
  pub measurements: Vec<Entry>,
  pub chart:        ChartProjection,
}

/// Cheap, cloneable front end to a controller running on its own task.
///
/// The task stops once every handle has been dropped and outstanding writes
/// have settled.
#[derive(Clone)]
pub struct SyncHandle {
  tx: mpsc::Sender<Command>,
}

impl SyncHandle {
  /// Move `controller` onto a new tokio task and return a handle to it.
  pub fn spawn<S, O>(controller: SyncController<S, O>) -> (Self, JoinHandle<()>)
  where
    S: MeasurementStore + 'static,
    O: StateObserver,
  {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(Actor::new(controller).run(rx));
    (Self { tx }, task)
  }

  async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
    let (reply, rx) = oneshot::channel();
    self
      .tx
      .send(make(reply))
      .await
      .map_err(|_| SyncError::Closed)?;
    rx.await.map_err(|_| SyncError::Closed)
  }

  pub async fn load(&self) -> Result<usize> {
    self.request(|reply| Command::Load { reply }).await?
  }

  pub async fn add_draft(&self) -> Result<EntryKey> {
    self.request(|reply| Command::AddDraft { reply }).await
  }

  pub async fn save_or_update(&self, key: EntryKey, record: Measurement) -> Result<EntryKey> {
    self
      .request(|reply| Command::SaveOrUpdate { key, record, reply })
      .await?
  }

  pub async fn edit(&self, key: EntryKey, edits: Vec<FieldEdit>) -> Result<EditOutcome> {
    self.request(|reply| Command::Edit { key, edits, reply }).await?
  }

  pub async fn delete(&self, key: EntryKey) -> Result<()> {
    self.request(|reply| Command::Delete { key, reply }).await?
  }

  pub async fn snapshot(&self) -> Result<StateSnapshot> {
    self.request(|reply| Command::Snapshot { reply }).await
  }
}

// ─── Task ────────────────────────────────────────────────────────────────────

/// Where the result of a write goes once it has settled.
enum WriteReply {
  Save(Reply<Result<EntryKey>>),
  Edit(Reply<Result<EditOutcome>>),
  Delete(Reply<Result<()>>),
}

impl WriteReply {
  // A dropped receiver just means the caller stopped waiting.
  fn send(self, result: Result<EntryKey>) {
    match self {
      Self::Save(tx) => {
        let _ = tx.send(result);
      }
      Self::Edit(tx) => {
        let _ = tx.send(result.map(EditOutcome::Saved));
      }
      Self::Delete(tx) => {
        let _ = tx.send(result.map(|_| ()));
      }
    }
  }
}

/// Someone waiting for the next reload to land.
enum Waiter {
  Load(Reply<Result<usize>>),
  /// A write that hit a missing row; answered with `err` after the reload.
  Write(WriteReply, SyncError),
}

enum Job {
  Write {
    write:  Write,
    result: watertemp_core::Result<Written>,
    reply:  WriteReply,
  },
  Load(watertemp_core::Result<Vec<Measurement>>),
}

struct Actor<S, O> {
  controller: SyncController<S, O>,
  jobs:       JoinSet<Job>,
  /// Entries with a repository call in flight.
  busy:       HashSet<EntryKey>,
  /// Drafts that have since been saved, and the key they moved to.
  promoted:   HashMap<EntryKey, EntryKey>,
  /// Entry commands waiting for their entry or a reload.
  deferred:   VecDeque<Command>,
  waiters:    Vec<Waiter>,
  loading:    bool,
}

impl<S, O> Actor<S, O>
where
  S: MeasurementStore + 'static,
  O: StateObserver,
{
  fn new(controller: SyncController<S, O>) -> Self {
    Self {
      controller,
      jobs: JoinSet::new(),
      busy: HashSet::new(),
      promoted: HashMap::new(),
      deferred: VecDeque::new(),
      waiters: Vec::new(),
      loading: false,
    }
  }

  async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
    let mut open = true;
    loop {
      tokio::select! {
        joined = self.jobs.join_next(), if !self.jobs.is_empty() => match joined {
          Some(Ok(job)) => self.finish(job),
          Some(Err(err)) => warn!(error = %err, "store task failed"),
          None => {}
        },
        command = rx.recv(), if open => match command {
          Some(command) => self.dispatch(command),
          None => open = false,
        },
        else => break,
      }
    }
    debug!("sync task stopped");
  }

  fn reload_pending(&self) -> bool { self.loading || !self.waiters.is_empty() }

  fn blocked(&self, key: EntryKey) -> bool {
    self.reload_pending()
      || self.busy.contains(&key)
      || self.deferred.iter().any(|c| c.key() == Some(key))
  }

  fn dispatch(&mut self, mut command: Command) {
    if let Some(key) = command.key() {
      if let Some(&to) = self.promoted.get(&key) {
        command.rekey(to);
      }
    }
    if let Some(key) = command.key() {
      if self.blocked(key) {
        self.deferred.push_back(command);
        return;
      }
    }

    match command {
      Command::Load { reply } => {
        self.waiters.push(Waiter::Load(reply));
        self.start_load();
      }
      Command::AddDraft { reply } => {
        let _ = reply.send(self.controller.add_draft());
      }
      Command::Snapshot { reply } => {
        let _ = reply.send(StateSnapshot {
          measurements: self.controller.measurements(),
          chart:        self.controller.chart().clone(),
        });
      }
      Command::SaveOrUpdate { key, record, reply } => {
        match self.controller.plan_save(key, record) {
          Ok(write) => self.start_write(write, WriteReply::Save(reply)),
          Err(err) => {
            let _ = reply.send(Err(err));
          }
        }
      }
      Command::Edit { key, edits, reply } => match self.controller.plan_edit(key, &edits) {
        Ok(Step::Pending(write)) => self.start_write(write, WriteReply::Edit(reply)),
        Ok(Step::Done(outcome)) => {
          let _ = reply.send(Ok(outcome));
        }
        Err(err) => {
          let _ = reply.send(Err(err));
        }
      },
      Command::Delete { key, reply } => match self.controller.plan_delete(key) {
        Ok(Step::Pending(write)) => self.start_write(write, WriteReply::Delete(reply)),
        Ok(Step::Done(())) => {
          let _ = reply.send(Ok(()));
        }
        Err(err) => {
          let _ = reply.send(Err(err));
        }
      },
    }
  }

  fn start_write(&mut self, write: Write, reply: WriteReply) {
    self.busy.insert(write.key());
    let repo = self.controller.repository().clone();
    self.jobs.spawn(async move {
      let result = write.execute(&repo).await;
      Job::Write { write, result, reply }
    });
  }

  /// Start the reload once no write is in flight.
  fn start_load(&mut self) {
    if self.loading || !self.busy.is_empty() || self.waiters.is_empty() {
      return;
    }
    self.loading = true;
    let repo = self.controller.repository().clone();
    self.jobs.spawn(async move { Job::Load(repo.get_all().await) });
  }

  fn finish(&mut self, job: Job) {
    match job {
      Job::Write { write, result, reply } => {
        let key = write.key();
        self.busy.remove(&key);
        match self.controller.settle(write, result) {
          Err(err @ SyncError::NotFound(_)) => self.waiters.push(Waiter::Write(reply, err)),
          settled => {
            if let Ok(to) = settled {
              if to != key {
                self.promoted.insert(key, to);
              }
            }
            reply.send(settled);
          }
        }
        self.start_load();
      }
      Job::Load(rows) => {
        self.loading = false;
        let result = self.controller.settle_load(rows);
        for waiter in self.waiters.drain(..) {
          match waiter {
            Waiter::Load(tx) => {
              let _ = tx.send(result.clone());
            }
            Waiter::Write(reply, err) => reply.send(Err(err)),
          }
        }
      }
    }

    for command in std::mem::take(&mut self.deferred) {
      self.dispatch(command);
    }
  }
}
