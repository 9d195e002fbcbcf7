//! The mailbox query surface.
//!
//! A meta-index instance owns its state exclusively. Callers that want to
//! share one instance talk to it through a handle: requests land on a
//! single-consumer queue and a dedicated thread drains them one at a time,
//! each handler running to completion before the next starts. Merges
//! applied in arrival order are observable to all subsequent lookups, and
//! no lookup ever observes a half-applied merge. Cancellation (dropping
//! the handle) takes effect between handlers, never inside one.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use telemark_ast::Expression;
use telemark_error::{Result, TelemarkError};
use telemark_types::PartitionId;

use crate::meta::{MetaIndex, StatusVerbosity};
use crate::metrics::IndexMetricsSnapshot;
use crate::partition::PartitionSynopsis;

/// One message on the meta-index mailbox.
enum Request {
    Merge {
        id: PartitionId,
        synopsis: PartitionSynopsis,
        ack: Sender<()>,
    },
    MergeBulk {
        synopses: Vec<(PartitionId, PartitionSynopsis)>,
        ack: Sender<()>,
    },
    Erase {
        id: PartitionId,
        ack: Sender<()>,
    },
    Lookup {
        expr: Expression,
        reply: Sender<Result<Vec<PartitionId>>>,
    },
    MemoryUsage {
        reply: Sender<u64>,
    },
    Status {
        verbosity: StatusVerbosity,
        reply: Sender<serde_json::Value>,
    },
    Metrics {
        reply: Sender<IndexMetricsSnapshot>,
    },
    Shutdown,
}

/// Handle to a meta-index running on its own thread.
///
/// Dropping the handle shuts the instance down and releases all synopses.
#[derive(Debug)]
pub struct MetaIndexHandle {
    tx: Sender<Request>,
    worker: Option<JoinHandle<MetaIndex>>,
}

impl MetaIndexHandle {
    /// Start an empty meta-index on a dedicated thread.
    #[must_use]
    pub fn spawn() -> Self {
        Self::spawn_with(MetaIndex::new())
    }

    /// Start with pre-existing state, e.g. rebuilt at startup.
    #[must_use]
    pub fn spawn_with(index: MetaIndex) -> Self {
        let (tx, rx) = channel();
        let worker = thread::Builder::new()
            .name("telemark-meta-index".to_owned())
            .spawn(move || run(index, &rx))
            .expect("spawning the meta-index thread");
        Self {
            tx,
            worker: Some(worker),
        }
    }

    fn send(&self, request: Request) -> Result<()> {
        self.tx
            .send(request)
            .map_err(|_| TelemarkError::MailboxClosed)
    }

    /// Merge one partition; returns once the merge is applied.
    pub fn merge(&self, id: PartitionId, synopsis: PartitionSynopsis) -> Result<()> {
        let (ack, done) = channel();
        self.send(Request::Merge { id, synopsis, ack })?;
        done.recv().map_err(|_| TelemarkError::MailboxClosed)
    }

    /// Merge a batch; returns once every entry is applied.
    pub fn merge_bulk(
        &self,
        synopses: impl IntoIterator<Item = (PartitionId, PartitionSynopsis)>,
    ) -> Result<()> {
        let (ack, done) = channel();
        self.send(Request::MergeBulk {
            synopses: synopses.into_iter().collect(),
            ack,
        })?;
        done.recv().map_err(|_| TelemarkError::MailboxClosed)
    }

    /// Erase one partition; absent ids are a no-op.
    pub fn erase(&self, id: PartitionId) -> Result<()> {
        let (ack, done) = channel();
        self.send(Request::Erase { id, ack })?;
        done.recv().map_err(|_| TelemarkError::MailboxClosed)
    }

    /// Candidate partitions for an expression.
    pub fn lookup(&self, expr: Expression) -> Result<Vec<PartitionId>> {
        let (reply, result) = channel();
        self.send(Request::Lookup { expr, reply })?;
        result.recv().map_err(|_| TelemarkError::MailboxClosed)?
    }

    /// Current memory usage in bytes.
    pub fn memory_usage(&self) -> Result<u64> {
        let (reply, result) = channel();
        self.send(Request::MemoryUsage { reply })?;
        result.recv().map_err(|_| TelemarkError::MailboxClosed)
    }

    /// Status document at the given verbosity.
    pub fn status(&self, verbosity: StatusVerbosity) -> Result<serde_json::Value> {
        let (reply, result) = channel();
        self.send(Request::Status { verbosity, reply })?;
        result.recv().map_err(|_| TelemarkError::MailboxClosed)
    }

    /// Operation counter snapshot.
    pub fn metrics(&self) -> Result<IndexMetricsSnapshot> {
        let (reply, result) = channel();
        self.send(Request::Metrics { reply })?;
        result.recv().map_err(|_| TelemarkError::MailboxClosed)
    }

    /// Stop the instance and take back its final state.
    #[must_use]
    pub fn shutdown(mut self) -> MetaIndex {
        let _ = self.tx.send(Request::Shutdown);
        let worker = self.worker.take().expect("worker already joined");
        worker.join().expect("meta-index thread panicked")
    }
}

impl Drop for MetaIndexHandle {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.tx.send(Request::Shutdown);
            let _ = worker.join();
        }
    }
}

/// Drain the mailbox until shutdown, one request at a time, to completion.
fn run(mut index: MetaIndex, rx: &Receiver<Request>) -> MetaIndex {
    while let Ok(request) = rx.recv() {
        // A dropped reply sender means the caller gave up on the result;
        // the state transition still applies.
        match request {
            Request::Merge { id, synopsis, ack } => {
                index.merge(id, synopsis);
                let _ = ack.send(());
            }
            Request::MergeBulk { synopses, ack } => {
                index.merge_bulk(synopses);
                let _ = ack.send(());
            }
            Request::Erase { id, ack } => {
                index.erase(&id);
                let _ = ack.send(());
            }
            Request::Lookup { expr, reply } => {
                let _ = reply.send(index.lookup(&expr));
            }
            Request::MemoryUsage { reply } => {
                let _ = reply.send(index.memory_usage());
            }
            Request::Status { verbosity, reply } => {
                let _ = reply.send(index.status(verbosity));
            }
            Request::Metrics { reply } => {
                let _ = reply.send(index.metrics());
            }
            Request::Shutdown => break,
        }
    }
    index
}
