//! Annotation run orchestration.

use crate::SourceContextAssembler;
use derive_getters::Getters;
use serde::Serialize;
use std::path::PathBuf;
use testscribe_cache::{AnnotationCache, AnnotationCacheConfig, hash_source};
use testscribe_core::{Annotation, RunSummary, SharedClock, TestUnit};
use testscribe_error::{ProviderErrorKind, ScribeResult};
use testscribe_interface::{AnnotationProvider, ContextAssembler};
use testscribe_models::provider_from_config;
use testscribe_rate_limit::{Pacer, ScribeConfig};
use tracing::{debug, info, instrument, warn};

/// Error recorded on cache misses after the provider ran out of daily quota.
pub const DAILY_QUOTA_SKIP: &str = "skipped: daily quota exhausted";

/// Progress sink, called with one line after each processed test.
pub type ProgressFn = Box<dyn FnMut(&str) + Send>;

/// Where an [`Annotator`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum RunPhase {
    /// No run started yet
    #[default]
    NotStarted,
    /// Applying opt-out and the test cap
    EnumerateEligible,
    /// Working through eligible tests
    Annotating,
    /// Run finished
    Done,
}

/// A test together with whatever annotation the run attached.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct AnnotatedTest {
    /// The collected test
    test: TestUnit,
    /// Attached annotation; `None` for opt-out, capped or disabled runs
    annotation: Option<Annotation>,
}

impl AnnotatedTest {
    fn pending(test: TestUnit) -> Self {
        Self {
            test,
            annotation: None,
        }
    }

    /// Node id of the test.
    pub fn nodeid(&self) -> &str {
        self.test.nodeid()
    }
}

/// Result of one annotation run, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct AnnotationRun {
    /// Every input test, annotated or not
    tests: Vec<AnnotatedTest>,
    /// Counts and first error
    summary: RunSummary,
}

impl AnnotationRun {
    /// Split into tests and summary.
    pub fn into_parts(self) -> (Vec<AnnotatedTest>, RunSummary) {
        (self.tests, self.summary)
    }
}

/// Drives one sequential annotation run.
///
/// For each eligible test the annotator assembles the source, consults the
/// cache, and on a miss paces, calls the provider and stores a successful
/// result. A failing test gets an [`Annotation`] carrying the error and the
/// run continues.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use testscribe::Annotator;
/// use testscribe_core::{SharedClock, SystemClock, TestUnitBuilder};
/// use testscribe_rate_limit::ScribeConfig;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ScribeConfig::load()?;
/// let mut annotator = Annotator::from_config(&config, ".", Arc::new(SystemClock) as SharedClock)?
///     .with_progress(Box::new(|line: &str| println!("{}", line)));
///
/// let tests = vec![
///     TestUnitBuilder::default()
///         .nodeid("tests/test_math.py::test_add")
///         .source("def test_add():\n    assert 1 + 2 == 3\n")
///         .build()?,
/// ];
/// let run = annotator.run(tests).await;
/// println!("{}", run.summary().headline());
/// # Ok(())
/// # }
/// ```
pub struct Annotator {
    provider: Box<dyn AnnotationProvider>,
    cache: AnnotationCache,
    assembler: Box<dyn ContextAssembler>,
    max_tests: usize,
    pacer: Option<Pacer>,
    progress: Option<ProgressFn>,
    phase: RunPhase,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_name())
            .field("max_tests", &self.max_tests)
            .field("pacer", &self.pacer)
            .field("phase", &self.phase)
            .finish()
    }
}

impl Annotator {
    /// Annotator with no test cap and no pacing.
    pub fn new(
        provider: Box<dyn AnnotationProvider>,
        cache: AnnotationCache,
        assembler: Box<dyn ContextAssembler>,
    ) -> Self {
        Self {
            provider,
            cache,
            assembler,
            max_tests: 0,
            pacer: None,
            progress: None,
            phase: RunPhase::NotStarted,
        }
    }

    /// Build provider, cache and context assembler from configuration.
    ///
    /// A cache directory that cannot be created disables the cache instead
    /// of failing.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings, or the error of
    /// provider or assembler construction.
    #[instrument(skip_all, fields(provider = %config.llm.provider()))]
    pub fn from_config(
        config: &ScribeConfig,
        root: impl Into<PathBuf>,
        clock: SharedClock,
    ) -> ScribeResult<Self> {
        config.validate()?;
        let provider = provider_from_config(config, clock.clone())?;

        let cache_config = AnnotationCacheConfig::from(&config.llm);
        let cache = match AnnotationCache::new(cache_config.clone(), clock.clone()) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Annotation cache unavailable, continuing without it");
                AnnotationCache::new(cache_config.with_enabled(false), clock.clone())?
            }
        };

        let assembler = SourceContextAssembler::from_settings(root, &config.llm)?;

        Ok(Self::new(provider, cache, Box::new(assembler))
            .with_max_tests(*config.llm.max_tests())
            .with_pacing(*config.llm.requests_per_minute(), clock))
    }

    /// Cap on tests processed per run; `0` is unlimited.
    pub fn with_max_tests(mut self, max_tests: usize) -> Self {
        self.max_tests = max_tests;
        self
    }

    /// Pace provider calls to `requests_per_minute`.
    ///
    /// Ignored when `requests_per_minute` is 0 or the provider publishes its
    /// own limits.
    pub fn with_pacing(mut self, requests_per_minute: u32, clock: SharedClock) -> Self {
        self.pacer = (requests_per_minute > 0 && self.provider.rate_limits().is_none())
            .then(|| Pacer::from_rpm(requests_per_minute, clock));
        self
    }

    /// Report progress through `progress`.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Current run phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The configured provider.
    pub fn provider(&self) -> &dyn AnnotationProvider {
        self.provider.as_ref()
    }

    /// Indices of tests that will be processed, in input order.
    fn eligible(&self, tests: &[AnnotatedTest]) -> Vec<usize> {
        let limit = match self.max_tests {
            0 => usize::MAX,
            n => n,
        };
        tests
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.test.opt_out())
            .map(|(idx, _)| idx)
            .take(limit)
            .collect()
    }

    fn report(&mut self, position: usize, total: usize, entry: &AnnotatedTest, status: &str) {
        if let Some(progress) = self.progress.as_mut() {
            let line = match entry.annotation.as_ref().and_then(|a| a.error().as_deref()) {
                Some(error) => format!("[{}/{}] {}: {}", position, total, entry.nodeid(), error),
                None => format!("[{}/{}] {}: {}", position, total, entry.nodeid(), status),
            };
            progress(&line);
        }
    }

    /// Annotate `tests`, returning them in input order with annotations
    /// attached.
    ///
    /// Never fails: per-test errors land in that test's annotation and in
    /// the summary.
    #[instrument(
        skip_all,
        fields(
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            tests = tests.len()
        )
    )]
    pub async fn run(&mut self, tests: Vec<TestUnit>) -> AnnotationRun {
        let mut summary = RunSummary::new(self.provider.provider_name(), self.provider.model_name());
        let mut entries: Vec<AnnotatedTest> = tests.into_iter().map(AnnotatedTest::pending).collect();

        if self.provider.provider_name() == "none" {
            debug!("Annotation disabled");
            self.phase = RunPhase::Done;
            return AnnotationRun {
                tests: entries,
                summary,
            };
        }

        self.phase = RunPhase::EnumerateEligible;
        let eligible = self.eligible(&entries);
        let total = eligible.len();
        info!(eligible = total, collected = entries.len(), "Starting annotation run");

        self.phase = RunPhase::Annotating;
        if let Err(e) = self.provider.check_ready().await {
            let message = e.user_message();
            warn!(error = %message, "Provider not ready, no tests will be annotated");
            for (position, &idx) in eligible.iter().enumerate() {
                summary.record_error(&message, false);
                entries[idx].annotation = Some(Annotation::failed(message.clone()));
                self.report(position + 1, total, &entries[idx], "error");
            }
            return self.finish(entries, summary);
        }

        let mut daily_exhausted = false;
        for (position, &idx) in eligible.iter().enumerate() {
            let (annotation, status) = self
                .annotate_one(&entries[idx].test, &mut summary, &mut daily_exhausted)
                .await;
            entries[idx].annotation = Some(annotation);
            self.report(position + 1, total, &entries[idx], status);
        }

        self.finish(entries, summary)
    }

    fn finish(&mut self, tests: Vec<AnnotatedTest>, summary: RunSummary) -> AnnotationRun {
        self.phase = RunPhase::Done;
        info!(
            cache_hits = summary.cache_hits(),
            live_calls = summary.live_calls(),
            "{}",
            summary.headline()
        );
        AnnotationRun { tests, summary }
    }

    #[instrument(skip_all, fields(nodeid = %test.nodeid()))]
    async fn annotate_one(
        &mut self,
        test: &TestUnit,
        summary: &mut RunSummary,
        daily_exhausted: &mut bool,
    ) -> (Annotation, &'static str) {
        let assembled = match self.assembler.assemble(test) {
            Ok(assembled) => assembled,
            Err(e) => {
                let message = e.user_message();
                warn!(error = %message, "Could not assemble test source");
                summary.record_error(&message, false);
                return (Annotation::failed(message), "error");
            }
        };

        let identity = test.base_nodeid();
        let source_hash = hash_source(assembled.source());
        if let Some(cached) = self.cache.get(identity, &source_hash).await {
            summary.record_cache_hit();
            return (cached, "cached");
        }

        if *daily_exhausted {
            summary.record_error(DAILY_QUOTA_SKIP, false);
            return (Annotation::failed(DAILY_QUOTA_SKIP), "skipped");
        }

        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait().await;
        }

        match self
            .provider
            .annotate(test, assembled.source(), assembled.context())
            .await
        {
            Ok(annotation) => {
                if !annotation.is_error()
                    && let Err(e) = self.cache.set(identity, &source_hash, &annotation).await
                {
                    warn!(error = %e, "Failed to cache annotation");
                }
                summary.record_live_success();
                (annotation, "annotated")
            }
            Err(e) => {
                let message = e.user_message();
                if let Some(ProviderErrorKind::DailyQuotaExhausted(_)) = e.provider_kind() {
                    warn!(error = %message, "Daily quota exhausted, skipping remaining live calls");
                    *daily_exhausted = true;
                } else {
                    warn!(error = %message, "Annotation failed");
                }
                summary.record_error(&message, true);
                (Annotation::failed(message), "error")
            }
        }
    }
}
