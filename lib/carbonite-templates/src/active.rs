use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::{DecodedRecord, GraphiteConfiguration, MatchError, TemplateMatcher, ValidationError};

/// The template matcher currently in use, replaceable at runtime.
///
/// Readers always observe one complete matcher: a reload builds and validates the new matcher fully before swapping it
/// in, so decodes running concurrently with a reload see either the old matcher or the new one, never a mix. Cloning
/// is cheap, and all clones share the same underlying matcher.
#[derive(Clone)]
pub struct ActiveTemplates {
    inner: Arc<ArcSwap<TemplateMatcher>>,
}

impl ActiveTemplates {
    /// Creates a new `ActiveTemplates` starting out with the given matcher.
    pub fn new(matcher: TemplateMatcher) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(matcher)),
        }
    }

    /// Creates a new `ActiveTemplates` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid, an error is returned.
    pub fn from_configuration(config: &GraphiteConfiguration) -> Result<Self, ValidationError> {
        config.build_matcher().map(Self::new)
    }

    /// Returns a snapshot of the current matcher.
    ///
    /// The snapshot is unaffected by later reloads.
    pub fn snapshot(&self) -> Arc<TemplateMatcher> {
        self.inner.load_full()
    }

    /// Decodes the given path using the current matcher.
    ///
    /// # Errors
    ///
    /// If no template can decode the path, an error is returned.
    pub fn matches(&self, path: &str) -> Result<DecodedRecord, MatchError> {
        self.inner.load().matches(path)
    }

    /// Replaces the current matcher with one built from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid, an error is returned and the current matcher is left in place.
    pub fn reload(&self, config: &GraphiteConfiguration) -> Result<(), ValidationError> {
        let matcher = config.build_matcher()?;
        let templates = matcher.template_set().len();
        self.inner.store(Arc::new(matcher));

        info!(templates, "Reloaded Graphite templates.");
        Ok(())
    }
}
