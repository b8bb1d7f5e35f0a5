// JSON-lines record of every handled command and the state it left behind

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::messages::{JournalEntry, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode journal entry: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct Journal {
    out: BufWriter<File>,
}

impl Journal {
    /// Open `path` for appending, creating it if needed
    pub fn create(path: &Path) -> Result<Self, JournalError> {
        info!("Journaling commands to {}", path.display());
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn record(&mut self, command: u8, state: &Snapshot) -> Result<(), JournalError> {
        let entry = JournalEntry {
            command: command as char,
            state: state.clone(),
        };
        serde_json::to_writer(&mut self.out, &entry)?;
        self.out.write_all(b"\n")?;
        // Flush per line so the file is readable while the controller runs
        self.out.flush()?;
        Ok(())
    }
}
