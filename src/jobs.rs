//! Background job table. Backed by a growable container with an enforced
//! minimum capacity rather than a fixed-size array.

use std::collections::BTreeMap;

pub const MIN_JOB_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done(i32),
}

#[derive(Debug, Clone)]
pub struct BackgroundJob {
    pub job_id: u32,
    pub pid: u32,
    pub command: String,
    pub status: JobStatus,
}

/// Table of background jobs, keyed by monotonically increasing job id.
/// Capacity is advisory (at least [`MIN_JOB_SLOTS`] must be supported);
/// callers that want a hard cap should check `len() >= capacity` before
/// inserting.
#[derive(Debug, Clone)]
pub struct JobTable {
    jobs: BTreeMap<u32, BackgroundJob>,
    next_id: u32,
    capacity: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        JobTable {
            jobs: BTreeMap::new(),
            next_id: 1,
            capacity: MIN_JOB_SLOTS,
        }
    }
}

impl JobTable {
    pub fn with_capacity(capacity: usize) -> Self {
        JobTable {
            jobs: BTreeMap::new(),
            next_id: 1,
            capacity: capacity.max(MIN_JOB_SLOTS),
        }
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// Register a new background job, returning its job id.
    pub fn spawn(&mut self, pid: u32, command: impl Into<String>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.insert(
            id,
            BackgroundJob {
                job_id: id,
                pid,
                command: command.into(),
                status: JobStatus::Running,
            },
        );
        id
    }

    pub fn get(&self, job_id: u32) -> Option<&BackgroundJob> {
        self.jobs.get(&job_id)
    }

    pub fn get_by_pid(&self, pid: u32) -> Option<&BackgroundJob> {
        self.jobs.values().find(|j| j.pid == pid)
    }

    pub fn set_status(&mut self, job_id: u32, status: JobStatus) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.status = status;
        }
    }

    /// Remove and return jobs that have reached `Done`, for the REPL to
    /// print `[id] Done (code) command` before redisplaying the prompt.
    pub fn drain_done(&mut self) -> Vec<BackgroundJob> {
        let done_ids: Vec<u32> = self
            .jobs
            .iter()
            .filter(|(_, j)| matches!(j.status, JobStatus::Done(_)))
            .map(|(id, _)| *id)
            .collect();
        done_ids
            .into_iter()
            .filter_map(|id| self.jobs.remove(&id))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackgroundJob> {
        self.jobs.values()
    }

    pub fn most_recent_running_or_stopped(&self) -> Option<&BackgroundJob> {
        self.jobs
            .values()
            .rev()
            .find(|j| !matches!(j.status, JobStatus::Done(_)))
    }

    pub fn remove(&mut self, job_id: u32) -> Option<BackgroundJob> {
        self.jobs.remove(&job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_assigns_monotonic_ids() {
        let mut jobs = JobTable::default();
        let a = jobs.spawn(100, "sleep 1");
        let b = jobs.spawn(200, "sleep 2");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn supports_at_least_sixteen_concurrent_jobs() {
        let mut jobs = JobTable::default();
        for i in 0..MIN_JOB_SLOTS {
            jobs.spawn(1000 + i as u32, format!("job{i}"));
        }
        assert_eq!(jobs.len(), MIN_JOB_SLOTS);
        assert!(jobs.is_full());
    }

    #[test]
    fn drain_done_only_removes_done_jobs() {
        let mut jobs = JobTable::default();
        let a = jobs.spawn(1, "a");
        let b = jobs.spawn(2, "b");
        jobs.set_status(a, JobStatus::Done(0));
        let done = jobs.drain_done();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].job_id, a);
        assert!(jobs.get(a).is_none());
        assert!(jobs.get(b).is_some());
    }
}
