//! Candidate models of one provider and the rotation between them.

use crate::{Admission, ModelLimits, RateLimiter};
use chrono::{DateTime, TimeDelta, Utc};
use derive_getters::Getters;
use std::time::Duration;
use testscribe_core::until;
use tracing::{debug, info, instrument, warn};

/// Cooldown applied after a 429 that carried no retry-after.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Parsed model configuration string.
///
/// `"gemini-2.5-flash"` names one model, `"a,b"` an ordered preference list,
/// `"all"` every model the provider lists, and `"a,all"` prefers `a` before
/// the rest of the discovered models.
///
/// # Examples
///
/// ```
/// use testscribe_rate_limit::ModelPreference;
///
/// let pref = ModelPreference::parse("gemini-2.5-flash, all", "gemini-2.0-flash");
/// assert_eq!(pref.preferred(), &vec!["gemini-2.5-flash".to_string()]);
/// assert!(*pref.discover_all());
///
/// let fallback = ModelPreference::parse("", "gemini-2.0-flash");
/// assert_eq!(fallback.preferred(), &vec!["gemini-2.0-flash".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ModelPreference {
    preferred: Vec<String>,
    discover_all: bool,
}

impl ModelPreference {
    /// Parse a model configuration string.
    pub fn parse(models: &str, default_model: &str) -> Self {
        let mut preferred: Vec<String> = Vec::new();
        let mut discover_all = false;

        for token in models.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.eq_ignore_ascii_case("all") {
                discover_all = true;
            } else if !preferred.iter().any(|m| m == token) {
                preferred.push(token.to_string());
            }
        }

        if preferred.is_empty() && !discover_all {
            preferred.push(default_model.to_string());
        }

        Self {
            preferred,
            discover_all,
        }
    }

    /// Candidate order: preferred models, then discovered ones in discovery
    /// order. Discovered models only join when `all` was requested.
    pub fn order(&self, discovered: &[String]) -> Vec<String> {
        let mut ordered = self.preferred.clone();
        if self.discover_all {
            for model in discovered {
                if !ordered.contains(model) {
                    ordered.push(model.clone());
                }
            }
        }
        ordered
    }
}

/// Rotation state of one model.
#[derive(Debug, Clone, Getters)]
pub struct ModelState {
    /// Model name
    name: String,
    /// Quota windows of this model
    limiter: RateLimiter,
    /// When the daily cap was hit
    exhausted_at: Option<DateTime<Utc>>,
    /// No calls before this instant (set after a 429)
    cooldown_until: Option<DateTime<Utc>>,
}

impl ModelState {
    fn new(name: String, limiter: RateLimiter) -> Self {
        Self {
            name,
            limiter,
            exhausted_at: None,
            cooldown_until: None,
        }
    }

    /// True while the daily cap is spent.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted_at.is_some()
    }
}

/// Outcome of a selection cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Use `model` after sleeping `wait`
    Ready {
        /// Selected model
        model: String,
        /// Time to sleep before calling
        wait: Duration,
    },
    /// Every candidate has spent its daily cap
    Exhausted,
}

/// Ordered candidate models with their quota state.
///
/// The pool is the single owner of every model's rate limiter; callers go
/// through it for admission and commits so the windows stay consistent.
///
/// # Examples
///
/// ```
/// use testscribe_rate_limit::{ModelLimits, ModelPool, ModelPreference, RateLimits, Selection};
/// use chrono::Utc;
///
/// let limits = ModelLimits::uniform(RateLimits::new(Some(10), None, Some(1)));
/// let mut pool = ModelPool::new(ModelPreference::parse("a,b", "a"), limits);
/// let now = Utc::now();
///
/// pool.commit("a", now);
/// match pool.select(100, now) {
///     Selection::Ready { model, .. } => assert_eq!(model, "b"),
///     Selection::Exhausted => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ModelPool {
    models: Vec<ModelState>,
    preference: ModelPreference,
    limits: ModelLimits,
    refreshed_at: Option<DateTime<Utc>>,
    refresh_interval: TimeDelta,
    recovery_period: TimeDelta,
}

impl ModelPool {
    /// Pool seeded with the preferred models; discovered models join on
    /// [`refresh`](Self::refresh).
    pub fn new(preference: ModelPreference, limits: ModelLimits) -> Self {
        let models = preference
            .preferred()
            .iter()
            .map(|name| ModelState::new(name.clone(), RateLimiter::new(limits.for_model(name))))
            .collect();

        Self {
            models,
            preference,
            limits,
            refreshed_at: None,
            refresh_interval: TimeDelta::hours(6),
            recovery_period: TimeDelta::hours(24),
        }
    }

    /// Override the model list refresh interval.
    pub fn with_refresh_interval(mut self, interval: TimeDelta) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Candidates in selection order.
    pub fn models(&self) -> &[ModelState] {
        &self.models
    }

    /// Candidate names in selection order.
    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True when there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// State of one model.
    pub fn model(&self, name: &str) -> Option<&ModelState> {
        self.models.iter().find(|m| m.name == name)
    }

    fn model_mut(&mut self, name: &str) -> Option<&mut ModelState> {
        self.models.iter_mut().find(|m| m.name == name)
    }

    /// Whether the discovered model list is due for a refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        *self.preference.discover_all()
            && self
                .refreshed_at
                .is_none_or(|at| now - at >= self.refresh_interval)
    }

    /// Rebuild the candidate order from a fresh model listing.
    ///
    /// Models that stay listed keep their quota state; new ones start fresh.
    #[instrument(skip(self, discovered), fields(discovered = discovered.len()))]
    pub fn refresh(&mut self, discovered: &[String], now: DateTime<Utc>) {
        let order = self.preference.order(discovered);
        let mut previous = std::mem::take(&mut self.models);

        self.models = order
            .into_iter()
            .map(|name| match previous.iter().position(|m| m.name == name) {
                Some(idx) => previous.swap_remove(idx),
                None => {
                    let limiter = RateLimiter::new(self.limits.for_model(&name));
                    ModelState::new(name, limiter)
                }
            })
            .collect();
        self.refreshed_at = Some(now);

        info!(models = ?self.model_names(), "Refreshed candidate models");
    }

    /// Record a failed listing so the next attempt waits a full interval.
    pub fn mark_refresh_attempted(&mut self, now: DateTime<Utc>) {
        self.refreshed_at = Some(now);
    }

    /// Return models whose daily exhaustion is at least a day old, with
    /// emptied windows.
    pub fn recover(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let period = self.recovery_period;
        let mut recovered = Vec::new();

        for model in &mut self.models {
            if let Some(at) = model.exhausted_at
                && now - at >= period
            {
                model.exhausted_at = None;
                model.cooldown_until = None;
                model.limiter.reset();
                recovered.push(model.name.clone());
            }
        }

        if !recovered.is_empty() {
            info!(models = ?recovered, "Models recovered from daily exhaustion");
        }
        recovered
    }

    /// Pick the model that can be called soonest.
    ///
    /// Exhausted models are skipped; a model whose limiter reports the daily
    /// cap is marked exhausted on the spot. The wait of each candidate is
    /// the longer of its quota wait and its cooldown; ties go to the earlier,
    /// more preferred model.
    #[instrument(skip(self))]
    pub fn select(&mut self, estimated_tokens: u64, now: DateTime<Utc>) -> Selection {
        self.recover(now);

        let mut best: Option<(Duration, usize)> = None;

        for (idx, model) in self.models.iter_mut().enumerate() {
            if model.is_exhausted() {
                continue;
            }

            let quota_wait = match model.limiter.next_available_in(estimated_tokens, now) {
                Admission::DailyExhausted => {
                    warn!(model = %model.name, "Daily quota exhausted, rotating");
                    model.exhausted_at = Some(now);
                    continue;
                }
                admission => admission.wait().unwrap_or_default(),
            };
            let cooldown_wait = model
                .cooldown_until
                .map(|deadline| until(deadline, now))
                .unwrap_or_default();
            let wait = quota_wait.max(cooldown_wait);

            if best.is_none_or(|(best_wait, _)| wait < best_wait) {
                best = Some((wait, idx));
            }
        }

        match best {
            Some((wait, idx)) => {
                let model = self.models[idx].name.clone();
                debug!(%model, wait_ms = wait.as_millis() as u64, "Selected model");
                Selection::Ready { model, wait }
            }
            None => Selection::Exhausted,
        }
    }

    /// Commit one request to `model`'s windows.
    pub fn commit(&mut self, model: &str, now: DateTime<Utc>) {
        if let Some(state) = self.model_mut(model) {
            state.limiter.record_request(now);
        }
    }

    /// Commit the tokens a call to `model` actually used.
    pub fn reconcile_tokens(&mut self, model: &str, tokens: u64, now: DateTime<Utc>) {
        if let Some(state) = self.model_mut(model) {
            state.limiter.record_tokens(tokens, now);
        }
    }

    /// Mark `model` as having spent its daily cap.
    pub fn mark_exhausted(&mut self, model: &str, now: DateTime<Utc>) {
        if let Some(state) = self.model_mut(model) {
            warn!(model, "Marking model exhausted for the day");
            state.exhausted_at = Some(now);
        }
    }

    /// Hold `model` back after a rate-limit response.
    pub fn set_cooldown(&mut self, model: &str, retry_after: Option<Duration>, now: DateTime<Utc>) {
        let delay = retry_after.unwrap_or(DEFAULT_COOLDOWN);
        if let Some(state) = self.model_mut(model) {
            let deadline = TimeDelta::from_std(delay)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(now);
            debug!(model, cooldown_ms = delay.as_millis() as u64, "Cooling down model");
            state.cooldown_until = Some(deadline);
        }
    }

    /// True when every candidate has spent its daily cap.
    pub fn all_exhausted(&self) -> bool {
        self.models.iter().all(ModelState::is_exhausted)
    }
}
