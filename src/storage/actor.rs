//! Writer actor owning all appends to the store file.
//!
//! Single-writer pattern: one thread receives commands over a bounded MPSC
//! channel and runs guard check + append for each reading before taking the
//! next command, so lines from concurrent ingestion calls never interleave.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};

use crate::reading::{Reading, format_line};
use crate::storage::StorageError;
use crate::storage::guard::ensure_writable;

/// Record terminator written after every line.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Reply channel carried by commands that report back.
pub type Reply = Sender<Result<(), StorageError>>;

/// Commands sent to the writer actor.
#[derive(Debug)]
pub enum Command {
    /// Guard check, then append one reading as one line.
    Append { reading: Reading, reply: Reply },
    /// Guard check only (readiness check).
    Check { reply: Reply },
    /// Graceful shutdown.
    Shutdown,
}

/// Store writer actor.
pub struct StoreActor {
    path: PathBuf,
    rx: Receiver<Command>,
    appended: u64,
}

impl StoreActor {
    /// Spawn the writer actor thread.
    ///
    /// Returns the thread handle and the command sender.
    pub fn spawn(
        path: &Path,
        channel_capacity: usize,
    ) -> Result<(JoinHandle<()>, SyncSender<Command>), StorageError> {
        let (tx, rx) = mpsc::sync_channel(channel_capacity);

        let mut actor = StoreActor {
            path: path.to_path_buf(),
            rx,
            appended: 0,
        };
        let handle = thread::Builder::new()
            .name("store-writer".to_string())
            .spawn(move || actor.run())
            .map_err(|e| StorageError::Internal(format!("failed to spawn writer thread: {e}")))?;

        Ok((handle, tx))
    }

    fn run(&mut self) {
        tracing::info!(path = %self.path.display(), "StoreActor started");

        loop {
            match self.rx.recv() {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break; // Shutdown requested
                    }
                }
                Err(_) => {
                    tracing::warn!("Channel disconnected, shutting down");
                    break;
                }
            }
        }

        tracing::info!(appended = self.appended, "StoreActor stopped");
    }

    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Append { reading, reply } => {
                let result = ensure_writable(&self.path).and_then(|()| self.append(&reading));
                if let Err(e) = &result {
                    tracing::error!(
                        error = %e,
                        message_id = %reading.message_id,
                        "Append failed"
                    );
                }
                // Caller may have given up waiting; nothing to do then.
                let _ = reply.send(result);
            }
            Command::Check { reply } => {
                let _ = reply.send(ensure_writable(&self.path));
            }
            Command::Shutdown => {
                tracing::info!("StoreActor shutting down");
                return true;
            }
        }
        false
    }

    /// Write one complete line with a single `write_all` on an append-mode handle.
    ///
    /// A torn trailing line left by a crash is terminated first, in the same
    /// write, so the new record never merges into the fragment.
    fn append(&mut self, reading: &Reading) -> Result<(), StorageError> {
        let mut file = OpenOptions::new().read(true).append(true).open(&self.path)?;

        let mut line = String::new();
        if ends_mid_line(&mut file)? {
            tracing::warn!(path = %self.path.display(), "Store ends with a torn line, terminating it");
            line.push_str(LINE_SEPARATOR);
        }
        line.push_str(&format_line(reading));
        line.push_str(LINE_SEPARATOR);

        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        self.appended += 1;
        tracing::debug!(message_id = %reading.message_id, "Reading appended");
        Ok(())
    }
}

/// `true` when the file is non-empty and its last byte is not `\n`.
fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::parse;
    use tempfile::tempdir;

    fn send_append(tx: &SyncSender<Command>, line: &str) -> Result<(), StorageError> {
        let (reply, rx) = mpsc::channel();
        tx.send(Command::Append {
            reading: parse(line).unwrap(),
            reply,
        })
        .unwrap();
        rx.recv().unwrap()
    }

    #[test]
    fn test_actor_lifecycle() {
        let dir = tempdir().unwrap();
        let (handle, tx) = StoreActor::spawn(&dir.path().join("store.csv"), 8).unwrap();
        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_append_creates_and_writes_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        let (handle, tx) = StoreActor::spawn(&path, 8).unwrap();

        send_append(&tx, "SM1,+44,1000,21.5,55,312.4,TAG001").unwrap();

        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("SM1,+44,1000,21.5,55,312.4,TAG001{LINE_SEPARATOR}"));
    }

    #[test]
    fn test_append_after_torn_line_starts_new_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        let prior = "SM0,+44,1000,20,50,300,TAG000\nSM0,+44,2000,20,50,30";
        std::fs::write(&path, prior).unwrap();
        let (handle, tx) = StoreActor::spawn(&path, 8).unwrap();

        send_append(&tx, "SM1,+44,1548460799000,21.5,55,312.4,TAG001").unwrap();

        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            format!("{prior}{LINE_SEPARATOR}SM1,+44,1548460799000,21.5,55,312.4,TAG001{LINE_SEPARATOR}")
        );

        let readings = crate::storage::StoreReader::new(&path).read_all().unwrap();
        let ids: Vec<_> = readings.iter().map(|r| r.message_id.as_str()).collect();
        assert_eq!(ids, vec!["SM0", "SM1"]);
        assert_eq!(readings[1].primary_tag_id, "TAG001");
    }

    #[test]
    fn test_append_to_terminated_store_adds_no_blank_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        std::fs::write(&path, "SM0,+44,1000,20,50,300,TAG000\n").unwrap();
        let (handle, tx) = StoreActor::spawn(&path, 8).unwrap();

        send_append(&tx, "SM1,+44,2000,21.5,55,312.4,TAG001").unwrap();

        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!content.contains("\n\n"));
    }

    #[test]
    fn test_append_reports_unavailable_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        std::fs::create_dir(&path).unwrap();
        let (handle, tx) = StoreActor::spawn(&path, 8).unwrap();

        let err = send_append(&tx, "SM1,+44,1000,21.5,55,312.4,TAG001").unwrap_err();
        assert!(err.is_unavailable());

        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_actor_stops_when_senders_dropped() {
        let dir = tempdir().unwrap();
        let (handle, tx) = StoreActor::spawn(&dir.path().join("store.csv"), 8).unwrap();
        drop(tx);
        handle.join().unwrap();
    }
}
