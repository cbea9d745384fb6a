//! The import queue and its single worker thread.

use super::hasher::ContentHasher;
use super::job::{ImportJob, JobStatus};
use super::source::{download_target, Downloader, HttpDownloader, ImportSource};
use crate::core::histogram::Histogram;
use crate::core::model::{Item, ItemStore, MediaType};
use crate::core::similarity::{find_similar_to, SimilarPair, SimilarityConfig};
use crate::error::ImportError;
use crate::events::{null_sender, Event, EventSender, ImportEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Configuration for the importer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Where URL imports are downloaded to
    pub download_dir: PathBuf,
    /// Near-duplicate thresholds
    pub similarity: SimilarityConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            download_dir: dirs::download_dir().unwrap_or_else(std::env::temp_dir),
            similarity: SimilarityConfig::default(),
        }
    }
}

/// Builder for [`Importer`]
pub struct ImporterBuilder {
    config: ImportConfig,
    events: EventSender,
    downloader: Option<Box<dyn Downloader>>,
    paused: bool,
}

impl ImporterBuilder {
    pub fn new() -> Self {
        Self {
            config: ImportConfig::default(),
            events: null_sender(),
            downloader: None,
            paused: false,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the download directory for URL imports
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    /// Set the near-duplicate thresholds
    pub fn similarity(mut self, similarity: SimilarityConfig) -> Self {
        self.config.similarity = similarity;
        self
    }

    /// Send job events to this channel
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Use a custom downloader instead of HTTP
    pub fn downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Some(Box::new(downloader));
        self
    }

    /// Start with the queue paused
    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// Start the worker thread
    pub fn build(self, store: Arc<dyn ItemStore>) -> Result<Importer, ImportError> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                paused: self.paused,
                shutdown: false,
            }),
        });
        let (signals, wakeups) = unbounded();

        let worker = Worker {
            store,
            config: self.config,
            downloader: self.downloader,
            hasher: ContentHasher::new(),
            events: self.events.clone(),
        };
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("import-worker".to_string())
            .spawn(move || worker.run(&worker_shared, &wakeups))
            .map_err(|e| {
                warn!("Failed to start import worker: {}", e);
                ImportError::WorkerStopped
            })?;

        Ok(Importer {
            shared,
            signals,
            events: self.events,
            worker: Some(handle),
        })
    }
}

impl Default for ImporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

enum Signal {
    Wake,
    Shutdown,
}

struct QueueState {
    jobs: VecDeque<Arc<ImportJob>>,
    paused: bool,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<QueueState>,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// FIFO import queue drained by one worker thread.
///
/// Every method is safe to call from any thread. Dropping the importer stops
/// the worker after its in-flight job and cancels the jobs still waiting.
pub struct Importer {
    shared: Arc<Shared>,
    signals: Sender<Signal>,
    events: EventSender,
    worker: Option<JoinHandle<()>>,
}

impl Importer {
    pub fn builder() -> ImporterBuilder {
        ImporterBuilder::new()
    }

    /// Queue a file or URL for import
    pub fn add_job(&self, source: impl Into<ImportSource>) -> Result<Arc<ImportJob>, ImportError> {
        let job = Arc::new(ImportJob::new(source.into()));
        {
            let mut queue = self.shared.queue();
            if queue.shutdown {
                return Err(ImportError::WorkerStopped);
            }
            queue.jobs.push_back(Arc::clone(&job));
        }

        debug!("Queued import {} for {}", job.id(), job.source());
        self.events.send(Event::Import(ImportEvent::Queued {
            job_id: job.id(),
            source: job.source().to_string(),
        }));
        self.signals
            .send(Signal::Wake)
            .map_err(|_| ImportError::WorkerStopped)?;
        Ok(job)
    }

    /// Remove a waiting job from the queue.
    ///
    /// Returns false if the job has already started (it will run to completion)
    /// or was already cancelled.
    pub fn cancel(&self, job: &ImportJob) -> bool {
        let mut queue = self.shared.queue();
        if !job.mark_cancelled() {
            return false;
        }
        queue.jobs.retain(|queued| queued.id() != job.id());
        drop(queue);

        debug!("Cancelled import {}", job.id());
        self.events
            .send(Event::Import(ImportEvent::Cancelled { job_id: job.id() }));
        true
    }

    /// Stop or resume dequeuing. An in-flight job always completes.
    pub fn set_paused(&self, paused: bool) {
        {
            let mut queue = self.shared.queue();
            if queue.paused == paused {
                return;
            }
            queue.paused = paused;
        }

        info!("Import queue {}", if paused { "paused" } else { "resumed" });
        self.events
            .send(Event::Import(ImportEvent::PausedChanged { paused }));
        if !paused {
            // The worker may be gone already; nothing left to wake then
            let _ = self.signals.send(Signal::Wake);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.shared.queue().paused
    }

    /// Snapshot of jobs still waiting, in queue order
    pub fn queued_jobs(&self) -> Vec<Arc<ImportJob>> {
        self.shared.queue().jobs.iter().cloned().collect()
    }

    /// Stop the worker after its in-flight job and wait for it.
    ///
    /// Jobs still waiting in the queue are cancelled.
    pub fn shutdown(&mut self) {
        let abandoned: Vec<Arc<ImportJob>> = {
            let mut queue = self.shared.queue();
            queue.shutdown = true;
            queue.jobs.drain(..).collect()
        };
        let _ = self.signals.send(Signal::Shutdown);

        for job in abandoned {
            if job.mark_cancelled() {
                debug!("Cancelled import {} on shutdown", job.id());
                self.events
                    .send(Event::Import(ImportEvent::Cancelled { job_id: job.id() }));
            }
        }

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Import worker panicked");
            }
        }
    }
}

impl Drop for Importer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Outcome {
    Duplicate(Arc<Item>),
    Imported {
        item: Arc<Item>,
        similar: Vec<SimilarPair>,
    },
}

struct Worker {
    store: Arc<dyn ItemStore>,
    config: ImportConfig,
    downloader: Option<Box<dyn Downloader>>,
    hasher: ContentHasher,
    events: EventSender,
}

impl Worker {
    fn run(mut self, shared: &Shared, wakeups: &Receiver<Signal>) {
        debug!("Import worker started");
        loop {
            let next = {
                let mut queue = shared.queue();
                if queue.shutdown {
                    break;
                }
                if queue.paused {
                    None
                } else {
                    queue.jobs.pop_front()
                }
            };

            match next {
                Some(job) => self.process(&job),
                // Wake-ups are buffered, so one sent after the check above is not lost
                None => match wakeups.recv() {
                    Ok(Signal::Wake) => continue,
                    Ok(Signal::Shutdown) | Err(_) => break,
                },
            }
        }
        debug!("Import worker stopped");
    }

    fn process(&mut self, job: &ImportJob) {
        if !job.start() {
            debug!("Skipping cancelled import {}", job.id());
            return;
        }
        self.status_changed(job);

        match self.import(job) {
            Ok(Outcome::Duplicate(existing)) => {
                info!("{} is a duplicate of item {}", job.source(), existing.id());
                job.finish_duplicate(existing);
            }
            Ok(Outcome::Imported { item, similar }) => {
                info!(
                    "Imported {} as item {} ({} similar)",
                    job.source(),
                    item.id(),
                    similar.len()
                );
                job.finish_imported(item, similar);
            }
            Err(e) => {
                warn!("Import of {} failed: {}", job.source(), e);
                job.finish_failed(e.to_string());
            }
        }

        self.progress(job, 1.0);
        self.status_changed(job);
    }

    fn import(&mut self, job: &ImportJob) -> Result<Outcome, ImportError> {
        let (path, downloaded) = match job.source() {
            ImportSource::File(path) => (path.clone(), false),
            ImportSource::Url(url) => {
                fs::create_dir_all(&self.config.download_dir).map_err(|e| {
                    ImportError::InvalidSource {
                        source_name: url.to_string(),
                        reason: format!(
                            "cannot create download directory {}: {e}",
                            self.config.download_dir.display()
                        ),
                    }
                })?;
                let destination = download_target(&self.config.download_dir, url);
                let events = self.events.clone();
                let job_id = job.id();
                let report = |fraction: f32| {
                    // Downloading is the first half of the job
                    job.set_progress(fraction * 0.5);
                    events.send(Event::Import(ImportEvent::Progress {
                        job_id,
                        progress: job.progress(),
                    }));
                };
                self.downloader()?.download(url, &destination, &report)?;
                (destination, true)
            }
        };

        let result = self.import_file(job, path.clone());
        if downloaded && !matches!(result, Ok(Outcome::Imported { .. })) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove downloaded file {}: {}", path.display(), e);
            }
        }
        result
    }

    fn import_file(&mut self, job: &ImportJob, path: PathBuf) -> Result<Outcome, ImportError> {
        if !path.is_file() {
            return Err(ImportError::InvalidSource {
                source_name: path.display().to_string(),
                reason: "not a file".to_string(),
            });
        }

        let md5 = self.hasher.hash_file(&path)?;
        self.progress(job, 0.5);

        if let Some(existing) = self.store.item_by_hash(&md5) {
            return Ok(Outcome::Duplicate(existing));
        }

        let histogram = if MediaType::from_path(&path) == MediaType::Image {
            match Histogram::from_file(&path) {
                Ok(histogram) => Some(histogram),
                Err(e) => {
                    warn!("Importing {} without a histogram: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let existing = self.store.all_items();
        let item = Arc::new(Item::media(self.store.reserve_item_id(), path));
        if let Some(media) = item.as_media() {
            media.set_md5(Some(md5));
            media.set_histogram(histogram);
        }
        self.store.add_item(Arc::clone(&item));

        let similar = find_similar_to(&item, &existing, &self.config.similarity);
        if similar.is_empty() {
            if let Some(media) = item.as_media().filter(|media| media.has_histogram()) {
                media.set_no_similar(true);
            }
        } else {
            for pair in &similar {
                for partner in [&pair.first, &pair.second] {
                    if let Some(partner) = partner.as_media() {
                        partner.set_no_similar(false);
                    }
                }
            }
        }

        Ok(Outcome::Imported { item, similar })
    }

    fn downloader(&mut self) -> Result<&dyn Downloader, ImportError> {
        let downloader: Box<dyn Downloader> = match self.downloader.take() {
            Some(downloader) => downloader,
            None => Box::new(HttpDownloader::new()?),
        };
        Ok(&**self.downloader.insert(downloader))
    }

    fn progress(&self, job: &ImportJob, progress: f32) {
        job.set_progress(progress);
        self.events.send(Event::Import(ImportEvent::Progress {
            job_id: job.id(),
            progress,
        }));
    }

    fn status_changed(&self, job: &ImportJob) {
        let status: JobStatus = job.status();
        debug!("Import {} is now {}", job.id(), status);
        self.events.send(Event::Import(ImportEvent::StatusChanged {
            job_id: job.id(),
            status,
        }));
    }
}
