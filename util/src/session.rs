//! Session management
//!
//! A session is a timestamped directory holding the log file and any data saved during one
//! execution.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    epoch: DateTime<Utc>,

    save_sender: Option<Sender<(PathBuf, String)>>,

    save_jh: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (LIMB_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("Cannot start the session save thread: {0}")]
    CannotStartSaveThread(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory, relative to the software root.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        Self::new_in(root.join(sessions_dir), exec_name)
    }

    /// Start a new session inside an explicit parent directory.
    pub fn new_in<P: AsRef<Path>>(parent_dir: P, exec_name: &str) -> Result<Self, SessionError> {
        let epoch = Utc::now();

        // Create the session path
        let path = parent_dir
            .as_ref()
            .join(format!("{}_{}", exec_name, epoch.format(TIMESTAMP_FORMAT)));

        fs::create_dir_all(&path).map_err(SessionError::CannotCreateDir)?;

        // Create the log file path
        let log_file_path = path.join(format!("{}.log", exec_name));

        // Spawn background save thread
        let (tx, rx) = channel();
        let session_root = path.clone();
        let save_jh = thread::Builder::new()
            .name("session::save".into())
            .spawn(move || save_thread(session_root, rx))
            .map_err(SessionError::CannotStartSaveThread)?;

        Ok(Session {
            session_root: path,
            log_file_path,
            epoch,
            save_sender: Some(tx),
            save_jh: Some(save_jh),
        })
    }

    /// The instant the session was started.
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Number of seconds elapsed since the start of the session.
    pub fn elapsed_seconds(&self) -> f64 {
        elapsed_seconds_since(self.epoch)
    }

    /// Saves the given data as pretty JSON to the given session-relative path in a background
    /// thread.
    pub fn save<P: AsRef<Path>, T: Serialize>(&self, path: P, data: &T) {
        let json = match serde_json::to_string_pretty(data) {
            Ok(j) => j,
            Err(e) => {
                warn!("Couldn't serialize data for file {:?}: {}", path.as_ref(), e);
                return;
            }
        };

        let sent = self
            .save_sender
            .as_ref()
            .map(|s| s.send((path.as_ref().to_path_buf(), json)));

        if !matches!(sent, Some(Ok(_))) {
            warn!("Could not send data to be saved to path {:?}", path.as_ref());
        }
    }

    /// Exit the session, waiting for the save thread to finish any pending actions
    pub fn exit(mut self) {
        self.stop_save_thread();
        info!("Save thread exited");
    }

    fn stop_save_thread(&mut self) {
        // Dropping the sender ends the save thread's receive loop once the queue is drained
        self.save_sender.take();

        if let Some(jh) = self.save_jh.take() {
            if jh.join().is_err() {
                warn!("Session save thread panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_save_thread();
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since `epoch`, or NaN on overflow.
pub fn elapsed_seconds_since(epoch: DateTime<Utc>) -> f64 {
    time::duration_to_seconds(Utc::now() - epoch).unwrap_or(std::f64::NAN)
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn save_thread(session_root: PathBuf, receiver: Receiver<(PathBuf, String)>) {
    while let Ok((path, json)) = receiver.recv() {
        let full_path = session_root.join(path);

        // Create the parent path if needed
        if let Some(parent) = full_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Couldn't create parent directory for {:?}: {}", full_path, e);
                continue;
            }
        }

        if let Err(e) = fs::write(&full_path, json) {
            warn!("Couldn't write file {:?}: {}", full_path, e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_session_save() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new_in(dir.path(), "test_exec").unwrap();
        let root = session.session_root.clone();

        assert!(root.starts_with(dir.path()));
        assert_eq!(
            session.log_file_path.file_name().and_then(|f| f.to_str()),
            Some("test_exec.log")
        );

        session.save("data/values.json", &vec![1.0, 2.0]);
        session.exit();

        let saved = fs::read_to_string(root.join("data/values.json")).unwrap();
        let values: Vec<f64> = serde_json::from_str(&saved).unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
    }
}
