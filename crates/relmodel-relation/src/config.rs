//! Relation engine configuration.

/// Configuration for a [`RelationContext`](crate::RelationContext).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationConfig {
    /// Warn once one relation has been lazily loaded this many times.
    /// `None` disables N+1 detection.
    pub n1_threshold: Option<usize>,
    /// Log every rendered relation query at debug level instead of trace.
    pub log_sql: bool,
}

impl RelationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn n1_threshold(mut self, threshold: usize) -> Self {
        self.n1_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn log_sql(mut self, value: bool) -> Self {
        self.log_sql = value;
        self
    }
}
