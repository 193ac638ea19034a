/// Configuration options for [`AliasState`](crate::AliasState).
#[derive(Clone, Debug)]
pub struct AliasStateOptions {
    /// Whether the fee sample window is written to the index and reloaded on open.
    pub persist_fee_window: bool,

    /// Whether mempool admissions are recorded as pending claims.
    pub track_pending: bool,
}

impl Default for AliasStateOptions {
    fn default() -> Self {
        Self {
            persist_fee_window: true,
            track_pending: true,
        }
    }
}

impl AliasStateOptions {
    /// Create a builder for configuring alias state options
    pub fn builder() -> AliasStateOptionsBuilder {
        AliasStateOptionsBuilder::default()
    }
}

/// Builder pattern for AliasStateOptions
#[derive(Default)]
pub struct AliasStateOptionsBuilder {
    options: AliasStateOptions,
}

impl AliasStateOptionsBuilder {
    /// Set whether the fee sample window is persisted
    pub fn persist_fee_window(mut self, persist: bool) -> Self {
        self.options.persist_fee_window = persist;
        self
    }

    /// Set whether pending claims are tracked
    pub fn track_pending(mut self, track: bool) -> Self {
        self.options.track_pending = track;
        self
    }

    /// Build the final AliasStateOptions
    pub fn build(self) -> AliasStateOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_state_options_builder() {
        let options = AliasStateOptions::builder()
            .persist_fee_window(false)
            .track_pending(false)
            .build();

        assert!(!options.persist_fee_window);
        assert!(!options.track_pending);
    }

    #[test]
    fn test_alias_state_options_defaults() {
        let options = AliasStateOptions::default();

        assert!(options.persist_fee_window);
        assert!(options.track_pending);
    }
}
