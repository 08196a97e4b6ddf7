use tokio::sync::watch;

/// What happened to the remote half of a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The write has been dispatched and has not completed yet.
    Pending,
    /// The gateway accepted the write.
    Confirmed,
    /// The gateway rejected the write. Local state is left as is.
    Failed(String),
    /// No remote write was issued (unknown task or no signed-in user).
    Skipped,
}

impl RemoteOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RemoteOutcome::Pending)
    }
}

/// Result of a task mutation.
///
/// The local half is settled by the time the receipt is returned; the remote
/// half can be polled with [`remote_outcome`](Self::remote_outcome) or
/// awaited with [`settled`](Self::settled).
#[derive(Debug)]
pub struct WriteReceipt {
    task_id: String,
    local_applied: bool,
    outcome: watch::Receiver<RemoteOutcome>,
}

impl WriteReceipt {
    pub(crate) fn new(task_id: impl Into<String>, local_applied: bool, outcome: watch::Receiver<RemoteOutcome>) -> Self {
        Self {
            task_id: task_id.into(),
            local_applied,
            outcome,
        }
    }

    pub(crate) fn skipped(task_id: impl Into<String>, local_applied: bool) -> Self {
        let (_tx, rx) = watch::channel(RemoteOutcome::Skipped);
        Self::new(task_id, local_applied, rx)
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Whether the in-memory list was changed.
    pub fn local_applied(&self) -> bool {
        self.local_applied
    }

    /// Current remote outcome without waiting.
    pub fn remote_outcome(&self) -> RemoteOutcome {
        self.outcome.borrow().clone()
    }

    /// Waits until the remote write reaches a terminal outcome.
    pub async fn settled(mut self) -> RemoteOutcome {
        loop {
            let current = self.outcome.borrow_and_update().clone();
            if current.is_terminal() {
                return current;
            }
            if self.outcome.changed().await.is_err() {
                let last = self.outcome.borrow().clone();
                return if last.is_terminal() {
                    last
                } else {
                    RemoteOutcome::Failed("write task ended without reporting".to_string())
                };
            }
        }
    }
}
