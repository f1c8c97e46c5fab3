use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};

use uuid::Uuid;

use crate::error::{Error, Result};

/// Mutex shared between a worker and its spawner for deterministic
/// interleaving. The payload is unit: the lock itself is the resource.
pub type SharedMutex = Arc<Mutex<()>>;

/// Failure reported by a task body, either returned or recovered from a
/// panic.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TaskFailure {
    pub message: String,
    pub panicked: bool,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            panicked: false,
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&'static str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "task panicked".to_string()
        };
        Self {
            message,
            panicked: true,
        }
    }
}

/// What a task body hands back, and `join`'s payload.
pub type TaskOutcome = std::result::Result<(), TaskFailure>;

/// Lifecycle of a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    Finished,
    Joined,
}

/// Runs one task on its own OS thread and hands the outcome back through
/// [`join`](Worker::join).
///
/// Task failures and panics never cross the thread boundary as crashes;
/// they arrive as [`TaskFailure`] values. Dropping an unjoined worker
/// joins it first, so the thread can never outlive its coordinator.
pub struct Worker {
    id: Uuid,
    handle: Option<JoinHandle<TaskOutcome>>,
    joined: bool,
}

impl Worker {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: None,
            joined: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        if self.joined {
            return WorkerState::Joined;
        }
        match &self.handle {
            None => WorkerState::Created,
            Some(handle) if handle.is_finished() => WorkerState::Finished,
            Some(_) => WorkerState::Running,
        }
    }

    /// Spawns `task` on a new thread. A worker runs exactly one task;
    /// starting it twice fails with [`Error::AlreadyStarted`].
    pub fn run<F>(&mut self, task: F) -> Result<()>
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        if self.handle.is_some() || self.joined {
            return Err(Error::AlreadyStarted);
        }
        self.handle = Some(thread::spawn(move || catch_task(task)));
        Ok(())
    }

    /// Spawns `task` with its body wrapped in a scoped acquisition of
    /// `mutex`. The lock is taken on the worker thread, so a spawner
    /// already holding it delays the task body, not the spawn; it is
    /// released when the body finishes, panic included.
    pub fn run_guarded<F>(&mut self, mutex: &SharedMutex, task: F) -> Result<()>
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        let mutex = Arc::clone(mutex);
        self.run(move || {
            // A poisoned lock still provides exclusion.
            let _guard = mutex.lock().unwrap_or_else(PoisonError::into_inner);
            catch_task(task)
        })
    }

    /// Blocks until the task completes and returns its outcome. Fails
    /// with [`Error::NotStarted`] before [`run`](Self::run) and with
    /// [`Error::AlreadyJoined`] on a second call.
    pub fn join(&mut self) -> Result<TaskOutcome> {
        if self.joined {
            return Err(Error::AlreadyJoined);
        }
        let handle = self.handle.take().ok_or(Error::NotStarted)?;
        self.joined = true;
        let outcome = handle
            .join()
            .unwrap_or_else(|payload| Err(TaskFailure::from_panic(payload)));
        Ok(outcome)
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn catch_task<F>(task: F) -> TaskOutcome
where
    F: FnOnce() -> TaskOutcome,
{
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(TaskFailure::from_panic(payload)),
    }
}

/// Identifier of the current thread of execution, uniform across
/// platforms: the thread's name when it has one, its numeric id
/// otherwise.
#[derive(Debug, Clone)]
pub struct ThreadIdent(thread::Thread);

impl ThreadIdent {
    pub fn current() -> Self {
        Self(thread::current())
    }
}

impl fmt::Display for ThreadIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:?}", self.0.id()),
        }
    }
}
