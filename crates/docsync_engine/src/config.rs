//! Configuration for the sync engine.

/// Default document alias that resolves to the authenticated user.
pub const DEFAULT_USER_ID_ALIAS: &str = "UserID";

/// Default bound on how many ancestors are visited when inheriting.
pub const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 256;

/// Configuration for synchronization.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Inherited fields with this alias take the current principal's key
    /// when one is available.
    pub user_id_alias: String,
    /// Whether the document is saved through the content service after the
    /// generated key has been written back to it.
    ///
    /// Hosts that sync from a "saving" hook leave this off: the document is
    /// about to be persisted anyway.
    pub save_document_after_key_writeback: bool,
    /// Maximum number of ancestors walked during inheritance.
    pub max_ancestor_depth: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_id_alias: DEFAULT_USER_ID_ALIAS.to_string(),
            save_document_after_key_writeback: false,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }
}

impl SyncConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the alias that resolves to the current principal.
    #[must_use]
    pub fn with_user_id_alias(mut self, alias: impl Into<String>) -> Self {
        self.user_id_alias = alias.into();
        self
    }

    /// Sets whether the document is saved after the key write-back.
    #[must_use]
    pub fn save_document_after_key_writeback(mut self, value: bool) -> Self {
        self.save_document_after_key_writeback = value;
        self
    }

    /// Sets the maximum ancestor depth.
    #[must_use]
    pub fn with_max_ancestor_depth(mut self, depth: usize) -> Self {
        self.max_ancestor_depth = depth;
        self
    }
}
