//! Serialises every write through one dedicated connection.
//!
//! SQLite allows a single writer at a time. Instead of letting pooled
//! connections race for the lock, writes are sent as jobs to an actor that
//! owns one connection and runs each job inside an `IMMEDIATE` transaction.

use super::DbPool;
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::{debug, error};
use smartdecision_core::errors::{DatabaseError, Error, Result};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

const QUEUE_CAPACITY: usize = 1024;

type AnyBox = Box<dyn Any + Send + 'static>;
type Job = Box<dyn FnOnce(&mut SqliteConnection) -> Result<AnyBox> + Send + 'static>;
type Reply = oneshot::Sender<Result<AnyBox>>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(Job, Reply)>,
}

impl WriteHandle {
    /// Runs `job` in its own transaction on the writer connection. An `Err`
    /// from the job rolls the transaction back and is returned unchanged.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (ret_tx, ret_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| job(conn).map(|value| Box::new(value) as AnyBox));

        self.tx
            .send((job, ret_tx))
            .await
            .map_err(|_| writer_gone("Writer actor has stopped"))?;

        let boxed = ret_rx
            .await
            .map_err(|_| writer_gone("Writer actor dropped the reply"))??;

        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::Unexpected("Writer actor returned an unexpected type".to_string()))
    }
}

fn writer_gone(message: &str) -> Error {
    Error::Database(DatabaseError::Internal(message.to_string()))
}

/// Spawns the writer actor on the current Tokio runtime. The actor holds
/// one pooled connection for as long as any `WriteHandle` is alive.
pub fn spawn_writer(pool: DbPool) -> Result<WriteHandle> {
    let mut conn = pool.get().map_err(StorageError::from)?;
    let (tx, mut rx) = mpsc::channel::<(Job, Reply)>(QUEUE_CAPACITY);

    tokio::spawn(async move {
        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<AnyBox> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);

            if let Err(e) = &result {
                debug!("Write transaction rolled back: {}", e);
            }
            // The caller may have been cancelled; its result is simply dropped.
            let _ = reply_tx.send(result);
        }
        error!("Writer actor stopped: all handles dropped");
    });

    Ok(WriteHandle { tx })
}
