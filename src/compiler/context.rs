//! Per-compilation settings

use crate::config::CompilerConfig;

/// Settings of one compilation, derived from [`CompilerConfig`] and
/// overridable per call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileContext {
    /// Language of translated values
    pub lang: String,
    /// Wrap `like` comparisons in `unaccent()`
    pub unaccent: bool,
    /// Hide archived records
    pub active_test: bool,
    /// Cap on adjacency-list hierarchy rounds
    pub hierarchy_max_iterations: usize,
    pub attachment_table: String,
}

impl Default for CompileContext {
    fn default() -> Self {
        Self::from_config(&CompilerConfig::default())
    }
}

impl CompileContext {
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            lang: config.lang.clone(),
            unaccent: config.unaccent,
            active_test: config.active_test,
            hierarchy_max_iterations: config.hierarchy_max_iterations,
            attachment_table: config.attachment_table.clone(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_active_test(mut self, active_test: bool) -> Self {
        self.active_test = active_test;
        self
    }

    pub fn with_unaccent(mut self, unaccent: bool) -> Self {
        self.unaccent = unaccent;
        self
    }

    pub fn with_hierarchy_max_iterations(mut self, limit: usize) -> Self {
        self.hierarchy_max_iterations = limit;
        self
    }
}
