use std::collections::BTreeMap;

use crate::{JobId, JobSubmission, ValidationError, WatchJob};

/// In-memory watch jobs keyed by id.
///
/// Ids come from a counter that is never rewound, so an id is not reused
/// after removal. Iteration is in ascending id (creation) order.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: BTreeMap<JobId, WatchJob>,
    next_id: JobId,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores a submission, returning the new id.
    pub fn add(&mut self, submission: JobSubmission) -> Result<JobId, ValidationError> {
        submission.validate()?;
        self.next_id += 1;
        let id = self.next_id;
        self.jobs.insert(id, WatchJob::from_submission(id, submission));
        Ok(id)
    }

    /// Removes a job. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: JobId) -> Option<WatchJob> {
        self.jobs.remove(&id)
    }

    pub fn get(&self, id: JobId) -> Option<&WatchJob> {
        self.jobs.get(&id)
    }

    /// Replaces the record stored under `job.id`, but only while that id is
    /// still present. Returns false when the job was removed meanwhile.
    pub fn replace(&mut self, job: WatchJob) -> bool {
        match self.jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job;
                true
            }
            None => false,
        }
    }

    /// Snapshots of every job the scheduler should poll.
    pub fn pollable(&self) -> Vec<WatchJob> {
        self.jobs
            .values()
            .filter(|job| job.status.is_pollable())
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchJob> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
