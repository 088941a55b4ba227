//! PID request list
//!
//! The list is owned by one task; every caller talks to it over a channel,
//! so concurrent adds and removes are applied one at a time in arrival order
//! and readers always see a consistent snapshot.

use crate::error::SchedulerError;
use obd_protocol::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

const MAILBOX_CAPACITY: usize = 32;

enum ListOp {
    Add(Vec<Command>, oneshot::Sender<usize>),
    Remove(Vec<Command>, oneshot::Sender<usize>),
    Set(Vec<Command>, oneshot::Sender<()>),
    Snapshot(oneshot::Sender<Vec<Command>>),
}

/// Ordered, de-duplicated set of commands to poll.
///
/// Cheap to clone; all clones address the same list. The owner task exits
/// once the last clone is dropped. Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct PidList {
    tx: mpsc::Sender<ListOp>,
}

impl PidList {
    pub fn new() -> Self {
        Self::with_commands(Vec::new())
    }

    pub fn with_commands(initial: Vec<Command>) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let mut entries = Vec::new();
        insert_all(&mut entries, initial);
        tokio::spawn(run_owner(entries, rx));
        Self { tx }
    }

    /// Append commands not already present. Returns how many were added.
    pub async fn add(&self, commands: Vec<Command>) -> Result<usize, SchedulerError> {
        self.call(|reply| ListOp::Add(commands, reply)).await
    }

    /// Remove commands if present. Returns how many were removed.
    pub async fn remove(&self, commands: Vec<Command>) -> Result<usize, SchedulerError> {
        self.call(|reply| ListOp::Remove(commands, reply)).await
    }

    /// Replace the whole list
    pub async fn set(&self, commands: Vec<Command>) -> Result<(), SchedulerError> {
        self.call(|reply| ListOp::Set(commands, reply)).await
    }

    pub async fn clear(&self) -> Result<(), SchedulerError> {
        self.set(Vec::new()).await
    }

    /// Copy of the list as it stands now
    pub async fn snapshot(&self) -> Result<Vec<Command>, SchedulerError> {
        self.call(ListOp::Snapshot).await
    }

    async fn call<T>(
        &self,
        op: impl FnOnce(oneshot::Sender<T>) -> ListOp,
    ) -> Result<T, SchedulerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(op(reply_tx))
            .await
            .map_err(|_| SchedulerError::ListClosed)?;
        reply_rx.await.map_err(|_| SchedulerError::ListClosed)
    }
}

impl Default for PidList {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_all(entries: &mut Vec<Command>, commands: Vec<Command>) -> usize {
    let before = entries.len();
    for command in commands {
        if !entries.contains(&command) {
            entries.push(command);
        }
    }
    entries.len() - before
}

async fn run_owner(mut entries: Vec<Command>, mut rx: mpsc::Receiver<ListOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            ListOp::Add(commands, reply) => {
                let added = insert_all(&mut entries, commands);
                debug!("PID list: {} added, {} total", added, entries.len());
                let _ = reply.send(added);
            }
            ListOp::Remove(commands, reply) => {
                let before = entries.len();
                entries.retain(|c| !commands.contains(c));
                let removed = before - entries.len();
                debug!("PID list: {} removed, {} total", removed, entries.len());
                let _ = reply.send(removed);
            }
            ListOp::Set(commands, reply) => {
                entries.clear();
                insert_all(&mut entries, commands);
                let _ = reply.send(());
            }
            ListOp::Snapshot(reply) => {
                let _ = reply.send(entries.clone());
            }
        }
    }
    debug!("PID list owner stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use obd_protocol::catalog;

    #[tokio::test]
    async fn test_add_deduplicates_and_keeps_order() {
        let list = PidList::new();
        let added = list
            .add(vec![catalog::RPM.clone(), catalog::SPEED.clone(), catalog::RPM.clone()])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(list.add(vec![catalog::SPEED.clone()]).await.unwrap(), 0);

        let snapshot = list.snapshot().await.unwrap();
        assert_eq!(snapshot, vec![catalog::RPM.clone(), catalog::SPEED.clone()]);
    }

    #[tokio::test]
    async fn test_remove_and_set() {
        let list = PidList::with_commands(vec![
            catalog::RPM.clone(),
            catalog::SPEED.clone(),
            catalog::COOLANT_TEMP.clone(),
        ]);
        assert_eq!(list.remove(vec![catalog::SPEED.clone()]).await.unwrap(), 1);
        assert_eq!(list.remove(vec![catalog::SPEED.clone()]).await.unwrap(), 0);
        assert_eq!(
            list.snapshot().await.unwrap(),
            vec![catalog::RPM.clone(), catalog::COOLANT_TEMP.clone()]
        );

        list.set(vec![catalog::MAF.clone()]).await.unwrap();
        assert_eq!(list.snapshot().await.unwrap(), vec![catalog::MAF.clone()]);

        list.clear().await.unwrap();
        assert!(list.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_lose_updates() {
        let list = PidList::new();
        let mut tasks = Vec::new();
        for pid in 0x04u8..0x14 {
            let list = list.clone();
            tasks.push(tokio::spawn(async move {
                let command = catalog::mode1(pid).cloned();
                if let Some(command) = command {
                    list.add(vec![command]).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let expected = (0x04u8..0x14).filter(|p| catalog::mode1(*p).is_some()).count();
        let snapshot = list.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), expected);
    }
}
