//! Debounced OCI form session.
//!
//! [`OciSession`] owns a [`ParamSynchronizer`] and two independent
//! [`Debouncer`]s:
//!
//! - editing the base URL schedules an extraction (short delay);
//! - editing any structured field or custom row schedules a rebuild
//!   (longer delay).
//!
//! A rebuild that rewrites the base URL schedules an extraction, and an
//! extraction that changes the fields schedules a rebuild. The equality
//! guards in the synchronizer stop that exchange after one round trip.
//! Rebuilds are skipped while a malformed-URL error is showing.
//!
//! Removing a row rebuilds immediately. Resetting, clearing the base URL,
//! closing, or dropping the session cancels anything still pending.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crate::debounce::Debouncer;
use crate::oci::{OciConfig, OciField, ParamField};
use crate::sync::{DEFAULT_ERROR_TTL, Followup, ParamSynchronizer, SyncError};

/// Delays used by an [`OciSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    /// Quiet period before the base URL is re-read into fields.
    pub extract_delay: Duration,
    /// Quiet period before fields are written back into the base URL.
    pub rebuild_delay: Duration,
    /// How long a malformed-URL message stays visible.
    pub error_ttl: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        SyncTiming {
            extract_delay: Duration::from_millis(500),
            rebuild_delay: Duration::from_millis(1000),
            error_ttl: DEFAULT_ERROR_TTL,
        }
    }
}

/// Upper bound on extract/rebuild rounds in [`OciSession::flush`].
const MAX_FLUSH_ROUNDS: usize = 8;

struct Shared {
    sync: Mutex<ParamSynchronizer>,
    extract: Mutex<Debouncer>,
    rebuild: Mutex<Debouncer>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn schedule_extract(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        lock(&self.extract).schedule(move || with_live(&weak, Shared::run_extract));
    }

    fn schedule_rebuild(self: &Arc<Self>) {
        if lock(&self.sync).error().is_some() {
            log::debug!("rebuild skipped while a URL error is showing");
            return;
        }
        let weak = Arc::downgrade(self);
        lock(&self.rebuild).schedule(move || with_live(&weak, Shared::run_rebuild));
    }

    fn schedule(self: &Arc<Self>, followup: Followup) {
        match followup {
            Followup::None => {}
            Followup::Extract => self.schedule_extract(),
            Followup::Rebuild => self.schedule_rebuild(),
        }
    }

    fn run_extract(self: &Arc<Self>) {
        let result = {
            let mut sync = lock(&self.sync);
            let url = sync.config().base_url.clone();
            sync.extract_params_from_url(&url)
        };
        if let Ok(true) = result {
            self.schedule_rebuild();
        }
    }

    fn run_rebuild(self: &Arc<Self>) {
        let result = lock(&self.sync).update_base_url_now();
        match result {
            Ok(true) => self.schedule_extract(),
            Ok(false) => {}
            Err(err) => log::debug!("rebuild skipped: {err}"),
        }
    }

    fn cancel_pending(&self) {
        lock(&self.extract).cancel();
        lock(&self.rebuild).cancel();
    }
}

fn with_live(weak: &Weak<Shared>, run: fn(&Arc<Shared>)) {
    if let Some(shared) = weak.upgrade() {
        run(&shared);
    }
}

/// One OCI form instance with debounced synchronization.
///
/// Editing methods schedule work on the ambient tokio runtime and must be
/// called from within one.
pub struct OciSession {
    shared: Arc<Shared>,
}

impl OciSession {
    /// Starts an empty session.
    pub fn new(timing: SyncTiming) -> Self {
        OciSession::with_synchronizer(
            ParamSynchronizer::with_error_ttl(timing.error_ttl),
            timing,
        )
    }

    /// Starts a session over existing state.
    pub fn with_synchronizer(sync: ParamSynchronizer, timing: SyncTiming) -> Self {
        OciSession {
            shared: Arc::new(Shared {
                sync: Mutex::new(sync),
                extract: Mutex::new(Debouncer::new(timing.extract_delay)),
                rebuild: Mutex::new(Debouncer::new(timing.rebuild_delay)),
            }),
        }
    }

    /// Edits a top-level field. Clearing the base URL resets the form.
    pub fn set_field(&self, field: OciField, value: &str) {
        let followup = lock(&self.shared.sync).handle_change(field, value);
        if field == OciField::BaseUrl && followup == Followup::None && value.trim().is_empty() {
            self.shared.cancel_pending();
            return;
        }
        self.shared.schedule(followup);
    }

    /// Edits the key or value of a custom row.
    pub fn set_custom_param(&self, index: usize, field: ParamField, value: &str) {
        let followup = lock(&self.shared.sync).handle_custom_param_change(index, field, value);
        self.shared.schedule(followup);
    }

    /// Appends a blank custom row.
    pub fn add_custom_param(&self) {
        let followup = lock(&self.shared.sync).handle_add_custom_params();
        self.shared.schedule(followup);
    }

    /// Removes a custom row and rebuilds the URL without waiting.
    pub fn remove_param(&self, index: usize) -> Result<(), SyncError> {
        let changed = lock(&self.shared.sync).handle_remove_param(index)?;
        if changed {
            self.shared.schedule_extract();
        }
        Ok(())
    }

    /// Clears the form and cancels pending work.
    pub fn reset(&self) {
        self.shared.cancel_pending();
        lock(&self.shared.sync).reset();
    }

    /// Copy of the current structured state.
    pub fn snapshot(&self) -> OciConfig {
        lock(&self.shared.sync).config().clone()
    }

    /// The malformed-URL message, while it is still visible.
    pub fn error(&self) -> Option<String> {
        lock(&self.shared.sync).error().map(str::to_owned)
    }

    /// True while an extraction or rebuild is waiting to fire.
    pub fn is_pending(&self) -> bool {
        lock(&self.shared.extract).is_pending() || lock(&self.shared.rebuild).is_pending()
    }

    /// Runs pending work immediately until both directions agree.
    ///
    /// Used when the form is submitted: the payload must reflect the last
    /// edit even if its debounce window has not elapsed.
    pub fn flush(&self) {
        for _ in 0..MAX_FLUSH_ROUNDS {
            if lock(&self.shared.extract).cancel() {
                self.shared.run_extract();
            } else if lock(&self.shared.rebuild).cancel() {
                self.shared.run_rebuild();
            } else {
                return;
            }
        }
        log::warn!("OCI sync did not settle after {MAX_FLUSH_ROUNDS} rounds");
        self.shared.cancel_pending();
    }

    /// Tears the session down, returning the final state.
    pub fn close(self) -> OciConfig {
        self.shared.cancel_pending();
        self.snapshot()
    }
}

impl Drop for OciSession {
    fn drop(&mut self) {
        self.shared.cancel_pending();
    }
}
