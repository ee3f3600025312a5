use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod kv;
mod memory;
mod migrations;
mod repositories;

pub use kv::KeyValueStore;
pub use memory::MemoryStore;
#[cfg(test)]
pub(crate) use memory::SlowWriteStore;

use migrations::run_migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Closing the channel stops the worker; dropping the last `Database` clone
/// does that and then joins the thread.
struct Worker {
    tasks: Option<mpsc::Sender<DbTask>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        drop(self.tasks.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Storage thread panicked");
            }
        }
    }
}

/// SQLite-backed key-value storage. Every statement runs on one dedicated
/// thread; clones share that thread.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    db_path: Arc<PathBuf>,
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("Failed to enable WAL mode: {err}");
    }
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;

    run_migrations(&mut conn).context("failed to run storage migrations")?;
    Ok(conn)
}

impl Database {
    /// Opens (or creates) the file and migrates it before returning, so a
    /// broken database is reported here rather than on the first read.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create storage directory {}", parent.display())
            })?;
        }

        let (tasks_tx, tasks_rx) = mpsc::channel::<DbTask>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let path = db_path.clone();

        let thread = thread::Builder::new()
            .name("healthtrack-db".into())
            .spawn(move || {
                let mut conn = match open_connection(&path) {
                    Ok(conn) => {
                        let _ = ready_tx.send(Ok(()));
                        conn
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                for task in tasks_rx {
                    task(&mut conn);
                }
                debug!("Storage thread exiting");
            })
            .context("failed to spawn storage thread")?;

        ready_rx
            .recv()
            .context("storage thread exited before opening the database")??;

        info!("Storage ready at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                tasks: Some(tasks_tx),
                thread: Some(thread),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Runs `task` on the storage thread. The task runs to completion even
    /// if the returned future is dropped first.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: DbTask = Box::new(move |conn| {
            let _ = reply_tx.send(task(conn));
        });

        self.worker
            .tasks
            .as_ref()
            .ok_or_else(|| anyhow!("storage thread already stopped"))?
            .send(job)
            .map_err(|_| anyhow!("storage thread is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("storage thread dropped the reply"))?
    }
}
