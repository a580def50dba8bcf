//! Descriptor file watcher for re-validation on edit.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::descriptor::error::LoadError;
use crate::descriptor::loader::load_file;
use crate::descriptor::settings::Settings;
use crate::validation::{advisories, validate_with, Advisory, ValidationError, ValidationOptions};

/// Why a reload was not accepted.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{} validation error(s)", .0.len())]
    Invalid(Vec<ValidationError>),
}

/// Result of one reload attempt.
#[derive(Debug)]
pub enum ReloadOutcome {
    Accepted {
        settings: Arc<Settings>,
        advisories: Vec<Advisory>,
    },
    Rejected(Rejection),
}

/// A watcher that re-loads and re-validates a descriptor when it changes.
///
/// The last accepted settings stay available through [`DescriptorWatcher::current`];
/// a rejected reload leaves them untouched.
pub struct DescriptorWatcher {
    path: PathBuf,
    options: ValidationOptions,
    poll_interval: Duration,
    current: Arc<ArcSwapOption<Settings>>,
    update_tx: mpsc::UnboundedSender<ReloadOutcome>,
}

impl DescriptorWatcher {
    /// Create a new watcher.
    ///
    /// Returns the watcher and a receiver for reload outcomes.
    pub fn new(
        path: &Path,
        options: ValidationOptions,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ReloadOutcome>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                options,
                poll_interval,
                current: Arc::new(ArcSwapOption::empty()),
                update_tx,
            },
            update_rx,
        )
    }

    /// Last accepted settings, if any reload has succeeded.
    pub fn current(&self) -> Option<Arc<Settings>> {
        self.current.load_full()
    }

    /// Shared handle to the accepted snapshot, usable after [`run`](Self::run).
    pub fn snapshot(&self) -> Arc<ArcSwapOption<Settings>> {
        Arc::clone(&self.current)
    }

    /// Load and validate the file once.
    ///
    /// The outcome is returned to the caller, not sent on the update channel.
    pub fn reload(&self) -> ReloadOutcome {
        reload_once(&self.path, &self.options, &self.current)
    }

    /// Start watching the file in a background thread.
    ///
    /// The parent directory is watched rather than the file itself, so saves
    /// that replace the file through a rename keep being seen.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| notify::Error::generic("descriptor path has no file name"))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let options = self.options.clone();
        let current = Arc::clone(&self.current);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_descriptor_event(&event, &file_name) {
                        tracing::info!(path = %path.display(), "Descriptor change detected, re-checking");
                        let outcome = reload_once(&path, &options, &current);
                        let _ = tx.send(outcome);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, dir = ?dir, "Descriptor watcher started");
        Ok(watcher)
    }
}

/// A create or modify event (including a rename onto the file) that touches
/// the descriptor itself rather than a sibling in the same directory.
fn is_descriptor_event(event: &Event, file_name: &OsStr) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}

fn reload_once(
    path: &Path,
    options: &ValidationOptions,
    current: &ArcSwapOption<Settings>,
) -> ReloadOutcome {
    let settings = match load_file(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to load descriptor: {}. Keeping last accepted settings.", e);
            return ReloadOutcome::Rejected(Rejection::Load(e));
        }
    };
    if let Err(errors) = validate_with(&settings, options) {
        tracing::error!(
            violations = errors.len(),
            "Descriptor failed validation. Keeping last accepted settings."
        );
        return ReloadOutcome::Rejected(Rejection::Invalid(errors));
    }

    let found = advisories(&settings);
    let settings = Arc::new(settings);
    current.store(Some(Arc::clone(&settings)));
    tracing::info!(keys = settings.len(), advisories = found.len(), "Descriptor accepted");
    ReloadOutcome::Accepted {
        settings,
        advisories: found,
    }
}
