//! Screenshot processing queue
//!
//! One job at a time goes through detection, new-item filtering and
//! sequential pricing; every priced item is merged into the inventory as soon
//! as it is known. Finishing (or removing) the active job promotes the next
//! queued one.
//!
//! Job state lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Lock order is queue state, then inventory. Every mutation
//! publishes a [`QueueSnapshot`] on a watch channel.

use crate::detector::{Detection, ItemDetector};
use crate::error::{Result, ScannerError};
use crate::image::{ContentFingerprint, ImageSource};
use crate::inventory::{InventoryStore, SharedInventory};
use crate::merge::combine_best_price;
use crate::pricing::Pricer;
use chrono::Utc;
use plat_common::{DetectedItem, DetectionError};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

/// Lifecycle of one uploaded screenshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Analyzing,
    Fetching,
    Complete,
    Error,
}

impl JobStatus {
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Analyzing | JobStatus::Fetching)
    }
}

struct ImageJob {
    id: String,
    image: Arc<ImageSource>,
    fingerprint: ContentFingerprint,
    status: JobStatus,
    results: Vec<DetectedItem>,
    error: Option<String>,
}

impl ImageJob {
    fn new(id: String, image: ImageSource) -> Self {
        Self {
            id,
            fingerprint: image.fingerprint(),
            image: Arc::new(image),
            status: JobStatus::Queued,
            results: Vec::new(),
            error: None,
        }
    }

    fn view(&self) -> JobView {
        JobView {
            id: self.id.clone(),
            name: self.image.name.clone(),
            mime_type: self.image.mime_type.clone(),
            size: self.image.size(),
            modified_ms: self.image.modified_ms,
            preview: self.image.preview.clone(),
            status: self.status,
            results: self.results.clone(),
            error: self.error.clone(),
        }
    }
}

/// A job as seen from outside, without the image bytes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub modified_ms: i64,
    pub preview: String,
    pub status: JobStatus,
    pub results: Vec<DetectedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Published after every queue mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub jobs: Vec<JobView>,
    pub selected: Option<String>,
    pub processing: Option<String>,
    pub processed: usize,
    pub total: usize,
    pub session_id: Option<String>,
    /// Best-priced result per name across all jobs
    pub combined: Vec<DetectedItem>,
}

impl QueueSnapshot {
    /// Nothing running and nothing waiting
    pub fn is_idle(&self) -> bool {
        self.processing.is_none() && !self.jobs.iter().any(|j| j.status == JobStatus::Queued)
    }

    pub fn job(&self, id: &str) -> Option<&JobView> {
        self.jobs.iter().find(|j| j.id == id)
    }
}

/// Result of an upload: new job ids, and names skipped as already queued
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub accepted: Vec<String>,
    pub duplicates: Vec<String>,
}

#[derive(Default)]
struct QueueState {
    jobs: Vec<ImageJob>,
    selected: Option<String>,
    processing: Option<String>,
    processed: usize,
    total: usize,
    session_id: Option<String>,
}

impl QueueState {
    fn job_mut(&mut self, id: &str) -> Option<&mut ImageJob> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            jobs: self.jobs.iter().map(ImageJob::view).collect(),
            selected: self.selected.clone(),
            processing: self.processing.clone(),
            processed: self.processed,
            total: self.total,
            session_id: self.session_id.clone(),
            combined: combine_best_price(self.jobs.iter().flat_map(|j| j.results.iter())),
        }
    }
}

struct QueueInner {
    state: Mutex<QueueState>,
    detector: Arc<dyn ItemDetector>,
    pricer: Pricer,
    inventory: SharedInventory,
    updates: watch::Sender<QueueSnapshot>,
}

/// Handle to the processing queue. Cheap to clone.
#[derive(Clone)]
pub struct ScanQueue {
    inner: Arc<QueueInner>,
}

impl ScanQueue {
    pub fn new(detector: Arc<dyn ItemDetector>, pricer: Pricer, inventory: SharedInventory) -> Self {
        let (updates, _) = watch::channel(QueueSnapshot::default());
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                detector,
                pricer,
                inventory,
                updates,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn inventory(&self) -> MutexGuard<'_, InventoryStore> {
        self.inner.inventory.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot and send while holding the state lock so snapshots go out in order
    fn publish(&self) {
        let state = self.state();
        self.inner.updates.send_replace(state.snapshot());
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.state().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.detector.is_ready()
    }

    /// Queue screenshots for processing and return immediately.
    ///
    /// Refused outright when the detector has no credentials. A screenshot
    /// whose fingerprint matches a job already in the list is skipped.
    pub fn upload(&self, images: Vec<ImageSource>) -> Result<UploadOutcome> {
        if !self.inner.detector.is_ready() {
            return Err(ScannerError::Configuration(
                "Gemini API key not configured".to_string(),
            ));
        }

        let mut outcome = UploadOutcome::default();
        {
            let mut state = self.state();
            for image in images {
                let fingerprint = image.fingerprint();
                if state.jobs.iter().any(|j| j.fingerprint == fingerprint) {
                    log::info!("Skipping {}: already queued", image.name);
                    outcome.duplicates.push(image.name);
                    continue;
                }

                let id = Uuid::new_v4().to_string();
                log::debug!("Queued {} as {}", image.name, id);
                state.jobs.push(ImageJob::new(id.clone(), image));
                outcome.accepted.push(id);
            }

            state.total += outcome.accepted.len();
            if let Some(first) = outcome.accepted.first() {
                state.selected = Some(first.clone());
            }
        }

        self.advance();
        Ok(outcome)
    }

    /// Choose which job's results are shown
    pub fn select(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state();
            if !state.jobs.iter().any(|j| j.id == id) {
                return Err(ScannerError::UnknownJob(id.to_string()));
            }
            state.selected = Some(id.to_string());
        }
        self.publish();
        Ok(())
    }

    /// Drop a job. Removing the active job promotes the next one at once;
    /// its in-flight calls finish but their results are discarded.
    pub fn remove(&self, id: &str) -> Result<()> {
        {
            let mut guard = self.state();
            let state = &mut *guard;
            let position = state
                .jobs
                .iter()
                .position(|j| j.id == id)
                .ok_or_else(|| ScannerError::UnknownJob(id.to_string()))?;
            let job = state.jobs.remove(position);

            if job.status == JobStatus::Complete {
                state.processed = state.processed.saturating_sub(1);
            }
            state.total = state.total.saturating_sub(1);

            if state.selected.as_deref() == Some(id) {
                state.selected = state.jobs.first().map(|j| j.id.clone());
            }
            if state.processing.as_deref() == Some(id) {
                log::info!("Removed active job {} ({})", id, job.image.name);
                state.processing = None;
            } else {
                log::info!("Removed job {} ({})", id, job.image.name);
            }
        }

        self.advance();
        Ok(())
    }

    /// Resolves once nothing is running and nothing is waiting
    pub async fn wait_idle(&self) {
        let mut updates = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = updates.wait_for(QueueSnapshot::is_idle).await;
    }

    /// Promote the next queued job if nothing is running
    fn advance(&self) {
        let next = {
            let mut guard = self.state();
            let state = &mut *guard;

            if state.processing.is_some() {
                None
            } else if let Some(job) = state
                .jobs
                .iter_mut()
                .find(|j| j.status == JobStatus::Queued)
            {
                job.status = JobStatus::Analyzing;
                if state.session_id.is_none() {
                    let session = format!("scan_{}", Utc::now().timestamp_millis());
                    log::info!("Starting scan session {}", session);
                    state.session_id = Some(session);
                }
                state.processing = Some(job.id.clone());
                state.selected = Some(job.id.clone());
                Some(job.id.clone())
            } else {
                if let Some(session) = state.session_id.take() {
                    log::info!(
                        "Queue idle, closing scan session {} ({}/{} processed)",
                        session,
                        state.processed,
                        state.total
                    );
                }
                None
            }
        };

        self.publish();

        if let Some(id) = next {
            let queue = self.clone();
            tokio::spawn(async move { queue.run_job(id).await });
        }
    }

    async fn run_job(self, id: String) {
        let image = {
            let state = self.state();
            match state.jobs.iter().find(|j| j.id == id) {
                Some(job) => job.image.clone(),
                None => return,
            }
        };

        log::info!("Analyzing {}", image.name);
        let detections = match self.inner.detector.detect(&image).await {
            Ok(detections) => detections,
            Err(DetectionError::NotConfigured(msg)) => {
                self.halt(&id, &msg);
                return;
            }
            Err(e) => {
                log::warn!("Detection failed for {}: {}", image.name, e);
                self.finish_job(&id, Err(e.to_string()));
                return;
            }
        };

        let items = self.new_items(detections);
        if items.is_empty() {
            log::info!("No new items in {}", image.name);
            self.finish_job(&id, Ok(()));
            return;
        }

        {
            let mut state = self.state();
            let Some(job) = state.job_mut(&id) else {
                return;
            };
            job.status = JobStatus::Fetching;
            job.results = items.clone();
        }
        self.publish();
        log::info!("Pricing {} new item(s) from {}", items.len(), image.name);

        for item in items {
            let priced = self.inner.pricer.price(item).await;

            {
                let mut guard = self.state();
                let state = &mut *guard;
                let Some(job) = state.jobs.iter_mut().find(|j| j.id == id) else {
                    log::debug!("Job {} was removed, discarding {}", id, priced.name);
                    return;
                };
                if let Some(slot) = job.results.iter_mut().find(|r| r.name == priced.name) {
                    *slot = priced.clone();
                }
                if priced.is_loaded() {
                    let session = state.session_id.as_deref();
                    self.inventory().upsert(std::slice::from_ref(&priced), session);
                }
            }
            self.publish();
        }

        self.finish_job(&id, Ok(()));
    }

    /// Drop names already in the inventory and repeats within this detection
    fn new_items(&self, detections: Vec<Detection>) -> Vec<DetectedItem> {
        let inventory = self.inventory();
        let mut seen = HashSet::new();
        detections
            .into_iter()
            .filter(|d| seen.insert(d.name.clone()))
            .filter(|d| !inventory.contains(&d.name))
            .map(Detection::into_item)
            .collect()
    }

    fn finish_job(&self, id: &str, outcome: std::result::Result<(), String>) {
        {
            let mut guard = self.state();
            let state = &mut *guard;
            if let Some(job) = state.jobs.iter_mut().find(|j| j.id == id) {
                match outcome {
                    Ok(()) => {
                        job.status = JobStatus::Complete;
                        state.processed += 1;
                        log::info!("Finished {}", job.image.name);
                    }
                    Err(message) => {
                        job.status = JobStatus::Error;
                        job.error = Some(message);
                    }
                }
            }

            if state.processing.as_deref() != Some(id) {
                // Removed while running; the queue has already moved on
                return;
            }
            state.processing = None;
        }

        self.advance();
    }

    /// The detector lost its credentials: fail this job and everything waiting
    fn halt(&self, id: &str, message: &str) {
        {
            let mut state = self.state();
            log::error!("Detector not configured, halting queue: {}", message);
            for job in state
                .jobs
                .iter_mut()
                .filter(|j| j.id == id || j.status == JobStatus::Queued)
            {
                job.status = JobStatus::Error;
                job.error = Some(message.to_string());
            }
            if state.processing.as_deref() == Some(id) {
                state.processing = None;
            }
        }

        self.advance();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
