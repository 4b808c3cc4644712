use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

/// Bookkeeping for one sent command awaiting its reply.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub command: u8,
    pub issued_at: Instant,
    pub result: Option<Bytes>,
    id: u64,
}

impl PendingRequest {
    pub fn completed(&self) -> bool {
        self.result.is_some()
    }
}

/// Identifies the request a caller registered, so it can wait on exactly that entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub command: u8,
    pub issued_at: Instant,
    id: u64,
}

/// In-flight requests keyed by command identifier.
///
/// At most one request per command exists. Registering a command that is
/// already pending replaces the old entry; a caller still waiting on the
/// replaced ticket never sees it complete and runs into its timeout.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: Mutex<Entries>,
    completed: Condvar,
}

#[derive(Debug, Default)]
struct Entries {
    by_command: HashMap<u8, PendingRequest>,
    next_id: u64,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register (or replace) the request for `command`.
    pub fn register(&self, command: u8) -> Ticket {
        self.register_replacing(command).0
    }

    /// Register the request for `command`, handing back the entry it replaced
    /// so a failed send can [`restore`](Self::restore) it.
    pub fn register_replacing(&self, command: u8) -> (Ticket, Option<PendingRequest>) {
        let mut entries = self.lock();
        entries.next_id += 1;
        let id = entries.next_id;
        let issued_at = Instant::now();

        let replaced = entries.by_command.insert(
            command,
            PendingRequest {
                command,
                issued_at,
                result: None,
                id,
            },
        );
        if matches!(&replaced, Some(old) if !old.completed()) {
            debug!(command, "replacing in-flight request");
        }

        (
            Ticket {
                command,
                issued_at,
                id,
            },
            replaced,
        )
    }

    /// Undo `ticket`'s registration, putting `previous` back in its slot.
    ///
    /// Does nothing if the slot has been taken over by a later registration.
    pub fn restore(&self, ticket: &Ticket, previous: Option<PendingRequest>) {
        let mut entries = self.lock();
        if entries
            .by_command
            .get(&ticket.command)
            .is_none_or(|entry| entry.id != ticket.id)
        {
            return;
        }
        match previous {
            Some(previous) => {
                entries.by_command.insert(ticket.command, previous);
            }
            None => {
                entries.by_command.remove(&ticket.command);
            }
        }
    }

    /// Store a reply for `command`. Returns `false` if nobody asked for it.
    pub fn complete(&self, command: u8, payload: Bytes) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.by_command.get_mut(&command) else {
            return false;
        };
        entry.result = Some(payload);
        drop(entries);
        self.completed.notify_all();
        true
    }

    /// Block until `ticket` completes or `timeout` has passed since it was issued.
    ///
    /// The lock is released while blocked.
    pub fn wait(&self, ticket: &Ticket, timeout: Duration) -> Option<Bytes> {
        let deadline = ticket.issued_at + timeout;
        let mut entries = self.lock();

        loop {
            if let Some(result) = entries
                .by_command
                .get(&ticket.command)
                .filter(|entry| entry.id == ticket.id)
                .and_then(|entry| entry.result.clone())
            {
                return Some(result);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            entries = self
                .completed
                .wait_timeout(entries, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Drop the entry for `ticket`, unless it has already been replaced.
    pub fn remove(&self, ticket: &Ticket) -> Option<PendingRequest> {
        let mut entries = self.lock();
        if entries.by_command.get(&ticket.command)?.id != ticket.id {
            return None;
        }
        entries.by_command.remove(&ticket.command)
    }

    /// Snapshot of the entry for `command`.
    pub fn get(&self, command: u8) -> Option<PendingRequest> {
        self.lock().by_command.get(&command).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().by_command.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn complete_wakes_waiter() {
        let table = Arc::new(PendingTable::new());
        let ticket = table.register(0x01);

        let remote = Arc::clone(&table);
        let completer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            assert!(remote.complete(0x01, Bytes::from_static(&[0x34, 0x02])));
        });

        let result = table.wait(&ticket, Duration::from_secs(5));
        assert_eq!(result.as_deref(), Some(&[0x34, 0x02][..]));
        assert!(table.get(0x01).unwrap().completed());
        completer.join().unwrap();
    }

    #[test]
    fn wait_times_out() {
        let table = PendingTable::new();
        let ticket = table.register(0x01);

        let start = Instant::now();
        assert!(table.wait(&ticket, Duration::from_millis(30)).is_none());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(25));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn complete_without_request_is_ignored() {
        let table = PendingTable::new();
        assert!(!table.complete(0x05, Bytes::new()));
        assert!(table.is_empty());
    }

    #[test]
    fn one_entry_per_command() {
        let table = PendingTable::new();
        table.register(0x01);
        table.register(0x01);
        table.register(0x02);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn resend_replaces_previous_request() {
        let table = PendingTable::new();
        let first = table.register(0x01);
        let second = table.register(0x01);

        table.complete(0x01, Bytes::from_static(b"ok"));

        assert!(table.wait(&first, Duration::from_millis(20)).is_none());
        assert_eq!(
            table.wait(&second, Duration::from_millis(20)).as_deref(),
            Some(&b"ok"[..])
        );
    }

    #[test]
    fn remove_respects_replacement() {
        let table = PendingTable::new();
        let first = table.register(0x01);
        let second = table.register(0x01);

        assert!(table.remove(&first).is_none());
        assert_eq!(table.len(), 1);
        assert!(table.remove(&second).is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn restore_puts_replaced_request_back() {
        let table = PendingTable::new();
        let first = table.register(0x01);
        let (second, replaced) = table.register_replacing(0x01);
        assert_eq!(replaced.as_ref().map(|r| r.command), Some(0x01));

        table.restore(&second, replaced);
        table.complete(0x01, Bytes::from_static(b"ok"));
        assert_eq!(
            table.wait(&first, Duration::from_millis(20)).as_deref(),
            Some(&b"ok"[..])
        );
    }

    #[test]
    fn restore_without_previous_removes_entry() {
        let table = PendingTable::new();
        let (ticket, replaced) = table.register_replacing(0x02);
        assert!(replaced.is_none());
        table.restore(&ticket, replaced);
        assert!(table.is_empty());
    }

    #[test]
    fn restore_leaves_later_registration_alone() {
        let table = PendingTable::new();
        let (stale, replaced) = table.register_replacing(0x01);
        let current = table.register(0x01);

        table.restore(&stale, replaced);
        assert_eq!(table.len(), 1);
        table.complete(0x01, Bytes::from_static(b"ok"));
        assert!(table.wait(&current, Duration::from_millis(20)).is_some());
    }
}
