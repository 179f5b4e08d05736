//! Per-job run leases
//!
//! At most one run holds a job at a time; a second request is rejected with
//! `Busy` instead of queuing. The lease is released when the guard drops.
//!
//! Leases built with [`JobLeases::with_lock_files`] also create `run.lock` in
//! the job root, so separate processes sharing a storage root exclude each
//! other. The lock file holds the owner's pid; a file whose owner is no longer
//! alive is reclaimed.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::domain::model::JobId;
use crate::error::{PipelineError, PipelineResult};
use crate::utils::path::StorageLayout;

#[derive(Debug, Clone, Default)]
pub struct JobLeases {
    held: Arc<Mutex<HashSet<JobId>>>,
    lock_files: Option<StorageLayout>,
}

impl JobLeases {
    /// Leases visible to this process only
    pub fn new() -> Self {
        Self::default()
    }

    /// Leases backed by a lock file in each job root
    pub fn with_lock_files(layout: StorageLayout) -> Self {
        Self {
            held: Arc::default(),
            lock_files: Some(layout),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<JobId>> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the lease for `id` or fail with `Busy`
    pub fn acquire(&self, id: &JobId) -> PipelineResult<JobLease> {
        if !self.lock().insert(id.clone()) {
            return Err(busy(id));
        }

        let lock_file = match &self.lock_files {
            Some(layout) => match LockFile::create(&layout.lease_path(id), id) {
                Ok(file) => Some(file),
                Err(e) => {
                    self.lock().remove(id);
                    return Err(e);
                }
            },
            None => None,
        };

        debug!("Lease acquired for job {}", id);
        Ok(JobLease {
            id: id.clone(),
            leases: self.clone(),
            _lock_file: lock_file,
        })
    }

    pub fn is_held(&self, id: &JobId) -> bool {
        self.lock().contains(id)
    }
}

fn busy(id: &JobId) -> PipelineError {
    PipelineError::Busy {
        job_id: id.to_string(),
    }
}

/// Held lease; dropping it releases the job
#[derive(Debug)]
pub struct JobLease {
    id: JobId,
    leases: JobLeases,
    _lock_file: Option<LockFile>,
}

impl Drop for JobLease {
    fn drop(&mut self) {
        self.leases.lock().remove(&self.id);
        debug!("Lease released for job {}", self.id);
    }
}

/// `run.lock` owned by this process, removed on drop
#[derive(Debug)]
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn create(path: &Path, id: &JobId) -> PipelineResult<Self> {
        // Second attempt only after reclaiming a stale file
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    writeln!(file, "{}", std::process::id())?;
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if owner_alive(path)? {
                        return Err(busy(id));
                    }
                    warn!("Reclaiming stale run lock {}", path.display());
                    match std::fs::remove_file(path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(PipelineError::not_found(format!("job {}", id)));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(busy(id))
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            // Job deletion removes the whole root while holding the lease
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove run lock {}: {}", self.path.display(), e),
        }
    }
}

/// Whether the process recorded in an existing lock file still runs
fn owner_alive(path: &Path) -> PipelineResult<bool> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        // Released between our create attempt and this read
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let contents = contents.trim();
    // The owner has created the file but not yet written its pid
    if contents.is_empty() {
        return Ok(true);
    }
    match contents.parse::<u32>() {
        Ok(pid) if pid == std::process::id() => Ok(true),
        Ok(pid) if pid > 0 => Ok(process_alive(pid)),
        _ => Ok(false),
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
