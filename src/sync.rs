//! Bidirectional synchronization between an OCI punchout URL and its
//! structured fields.
//!
//! Two one-directional reducers keep [`OciConfig`] consistent:
//!
//! - [`ParamSynchronizer::extract_params_from_url`]: URL drives fields.
//!   Reserved keys are looked up case-insensitively, every other pair
//!   becomes a [`CustomParam`] row.
//! - [`ParamSynchronizer::update_base_url_now`]: fields drive URL. Reserved
//!   parameters come first in fixed order, then custom keys in row order.
//!
//! Each reducer reports whether it changed anything. Extraction leaves the
//! rows untouched when the URL yields the same content, and a rebuilt URL is
//! only written back when it differs, so the pair settles after at most one
//! round trip. Scheduling (debouncing) lives in [`crate::session`].
//!
//! The user-entered casing of the base URL is never altered here; only the
//! reserved-key comparison is case-insensitive.

use std::time::{Duration, Instant};

use url::Url;
use url::form_urlencoded;

use crate::error::PunchoutError;
use crate::oci::{CustomParam, OciConfig, OciField, ParamField, ReservedParam};

/// How long a malformed-URL message stays visible.
pub const DEFAULT_ERROR_TTL: Duration = Duration::from_secs(6);

/// The only recoverable failure of the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The candidate string is not a parseable URL.
    #[error("Invalid URL format")]
    MalformedUrl(#[source] url::ParseError),
}

impl From<SyncError> for PunchoutError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::MalformedUrl(source) => PunchoutError::InvalidUrl {
                message: err.to_string(),
                source: Some(source),
            },
        }
    }
}

/// What an edit requires next. The session turns these into debounced work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    /// Nothing to schedule.
    None,
    /// The base URL changed; re-read fields from it.
    Extract,
    /// A structured field changed; rebuild the base URL.
    Rebuild,
}

#[derive(Debug, Clone)]
struct TransientError {
    message: String,
    raised_at: Instant,
}

/// Owns one form session's [`OciConfig`] and the transient error banner.
#[derive(Debug, Clone)]
pub struct ParamSynchronizer {
    config: OciConfig,
    error: Option<TransientError>,
    error_ttl: Duration,
}

impl Default for ParamSynchronizer {
    fn default() -> Self {
        ParamSynchronizer::new()
    }
}

impl ParamSynchronizer {
    /// An empty form with the default error lifetime.
    pub fn new() -> Self {
        ParamSynchronizer::with_error_ttl(DEFAULT_ERROR_TTL)
    }

    /// An empty form whose malformed-URL message lasts `error_ttl`.
    pub fn with_error_ttl(error_ttl: Duration) -> Self {
        ParamSynchronizer {
            config: OciConfig::default(),
            error: None,
            error_ttl,
        }
    }

    /// Starts from an existing configuration, e.g. one built from CLI flags.
    pub fn from_config(config: OciConfig) -> Self {
        ParamSynchronizer {
            config,
            ..ParamSynchronizer::new()
        }
    }

    /// Current structured state.
    pub fn config(&self) -> &OciConfig {
        &self.config
    }

    /// Consumes the synchronizer, returning its state.
    pub fn into_config(self) -> OciConfig {
        self.config
    }

    /// The current error message, if one was raised within the TTL.
    pub fn error(&self) -> Option<&str> {
        self.error_at(Instant::now())
    }

    /// Same as [`error`](Self::error) against an explicit clock reading.
    pub fn error_at(&self, now: Instant) -> Option<&str> {
        self.error
            .as_ref()
            .filter(|err| now.saturating_duration_since(err.raised_at) < self.error_ttl)
            .map(|err| err.message.as_str())
    }

    /// Hides the malformed-URL message.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn raise(&mut self, err: &SyncError) {
        log::warn!("OCI URL sync failed: {err}");
        self.error = Some(TransientError {
            message: err.to_string(),
            raised_at: Instant::now(),
        });
    }

    /// Reads reserved fields and custom rows out of `url`.
    ///
    /// Returns `Ok(true)` when the structured state changed. An empty string
    /// is a no-op. A malformed URL raises the transient error and leaves the
    /// state as it was.
    pub fn extract_params_from_url(&mut self, url: &str) -> Result<bool, SyncError> {
        if url.is_empty() {
            return Ok(false);
        }
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(source) => {
                let err = SyncError::MalformedUrl(source);
                self.raise(&err);
                return Err(err);
            }
        };
        self.clear_error();

        let mut reserved: [Option<String>; 3] = Default::default();
        let mut custom = Vec::new();
        for (key, value) in parsed.query_pairs() {
            match ReservedParam::from_query_key(&key) {
                Some(param) => {
                    let slot = &mut reserved[reserved_index(param)];
                    if slot.is_none() {
                        *slot = Some(value.into_owned());
                    }
                }
                None => custom.push(CustomParam::synced(key.into_owned(), value.into_owned())),
            }
        }

        let mut changed = false;
        for param in ReservedParam::ALL {
            let value = reserved[reserved_index(param)].take().unwrap_or_default();
            let field = self.config.field_mut(param.into());
            if *field != value {
                *field = value;
                changed = true;
            }
        }

        if custom.is_empty() {
            custom.push(CustomParam::blank());
        }
        let same_rows = custom.len() == self.config.custom_params.len()
            && custom
                .iter()
                .zip(&self.config.custom_params)
                .all(|(new, old)| new.same_content(old));
        if !same_rows {
            self.config.custom_params = custom;
            changed = true;
        }

        if changed {
            log::debug!("extracted OCI parameters from {}", redact(&parsed));
        }
        Ok(changed)
    }

    /// Rewrites the base URL from the structured fields.
    ///
    /// Returns `Ok(true)` when the base URL changed. An empty base URL is a
    /// silent no-op; a malformed one is reported to the caller without
    /// touching any state.
    pub fn update_base_url_now(&mut self) -> Result<bool, SyncError> {
        match rebuild_base_url(&self.config)? {
            Some(rebuilt) if rebuilt != self.config.base_url => {
                log::debug!("rebuilt OCI base URL ({} bytes)", rebuilt.len());
                self.config.base_url = rebuilt;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Applies an edit to a top-level field. Values are trimmed.
    ///
    /// Clearing the base URL resets the whole form.
    pub fn handle_change(&mut self, field: OciField, value: &str) -> Followup {
        let value = value.trim();
        if field == OciField::BaseUrl && value.is_empty() {
            self.reset();
            return Followup::None;
        }
        let slot = self.config.field_mut(field);
        if slot == value {
            return Followup::None;
        }
        *slot = value.to_string();
        match field {
            OciField::BaseUrl => Followup::Extract,
            _ => Followup::Rebuild,
        }
    }

    /// Edits one half of a custom row by position. `prev_key` is left alone.
    pub fn handle_custom_param_change(
        &mut self,
        index: usize,
        field: ParamField,
        value: &str,
    ) -> Followup {
        let Some(row) = self.config.custom_params.get_mut(index) else {
            return Followup::None;
        };
        let slot = match field {
            ParamField::Key => &mut row.key,
            ParamField::Value => &mut row.value,
        };
        *slot = value.trim().to_string();
        Followup::Rebuild
    }

    /// Appends a blank custom row.
    pub fn handle_add_custom_params(&mut self) -> Followup {
        self.config.custom_params.push(CustomParam::blank());
        Followup::Rebuild
    }

    /// Removes a custom row and rebuilds the URL right away.
    ///
    /// The form always keeps at least one row, so removing the last one
    /// leaves a blank row behind.
    pub fn handle_remove_param(&mut self, index: usize) -> Result<bool, SyncError> {
        if index >= self.config.custom_params.len() {
            return Ok(false);
        }
        self.config.custom_params.remove(index);
        if self.config.custom_params.is_empty() {
            self.config.custom_params.push(CustomParam::blank());
        }
        self.update_base_url_now()
    }

    /// Clears every field and leaves a single blank custom row.
    pub fn reset(&mut self) {
        self.config = OciConfig::default();
        self.error = None;
    }
}

fn reserved_index(param: ReservedParam) -> usize {
    match param {
        ReservedParam::Username => 0,
        ReservedParam::Password => 1,
        ReservedParam::HookUrl => 2,
    }
}

/// Computes the base URL implied by `config` without mutating anything.
///
/// `Ok(None)` means the base URL is empty and there is nothing to rebuild.
/// The result is origin + path, followed by the query when any parameter
/// remains:
/// - reserved parameters with a non-empty field, in `username`, `password`,
///   `hook_url` order;
/// - custom rows in row order. A row with both key and value sets it; a row
///   with a key but no value keeps whatever the URL already had for that
///   key. A renamed row (`prev_key != key`) drops its old key.
///
/// Query keys that are neither reserved nor named by any row are purged.
pub fn rebuild_base_url(config: &OciConfig) -> Result<Option<String>, SyncError> {
    if config.base_url.is_empty() {
        return Ok(None);
    }
    let mut url = Url::parse(&config.base_url).map_err(SyncError::MalformedUrl)?;

    let mut existing: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| ReservedParam::from_query_key(key).is_none())
        .collect();
    for row in &config.custom_params {
        if !row.prev_key.is_empty() && row.prev_key != row.key {
            existing.retain(|(key, _)| *key != row.prev_key);
        }
    }

    let mut pairs: Vec<(String, String)> = ReservedParam::ALL
        .into_iter()
        .filter(|param| !config.reserved(*param).is_empty())
        .map(|param| {
            (
                param.query_name().to_string(),
                config.reserved(param).to_string(),
            )
        })
        .collect();
    let first_custom = pairs.len();

    for row in &config.custom_params {
        // Reserved names belong to their dedicated fields.
        if row.key.is_empty() || ReservedParam::from_query_key(&row.key).is_some() {
            continue;
        }
        if let Some(slot) = pairs[first_custom..]
            .iter_mut()
            .find(|(key, _)| *key == row.key)
        {
            if !row.value.is_empty() {
                slot.1.clone_from(&row.value);
            }
            continue;
        }
        if !row.value.is_empty() {
            pairs.push((row.key.clone(), row.value.clone()));
        } else if let Some((_, value)) = existing.iter().find(|(key, _)| *key == row.key) {
            pairs.push((row.key.clone(), value.clone()));
        }
    }

    url.set_fragment(None);
    url.set_query(None);
    // Userinfo is not part of origin + path; these only fail for URLs that
    // cannot carry credentials, which have none to strip.
    let _ = url.set_username("");
    let _ = url.set_password(None);
    if !pairs.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish();
        url.set_query(Some(&query));
    }
    Ok(Some(url.to_string()))
}

/// Origin + path for log lines; query strings carry credentials.
fn redact(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}
