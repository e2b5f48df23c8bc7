//! Store configuration
//!
//! All behavioral switches are applied once at construction time and shared
//! by the codec, resolver and orchestrator for the lifetime of the store
//! instance.

/// Configuration for a store instance
///
/// Defaults:
/// - `reserved_key`: `"_jv"`
/// - `follow_relationships_data`: `true`
/// - `preserve_json`: `false`
/// - `action_status_clean_age`: 600 seconds (0 disables cleanup)
/// - `merge_records`: `false`
/// - `clear_on_update`: `false`
/// - `clean_patch`: `false`
/// - `clean_patch_props`: empty
/// - `recurse_relationships`: `false`
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Metadata namespace key used in the flattened external record shape
    pub reserved_key: String,

    /// Resolve relationship views from linkage data on read
    pub follow_relationships_data: bool,

    /// Attach the original wire payload to normalized results
    pub preserve_json: bool,

    /// Seconds after which an action status entry is evicted; 0 disables
    pub action_status_clean_age: u64,

    /// Deep-merge incoming records into existing ones on `add`
    pub merge_records: bool,

    /// Reconcile stale ids after a full collection fetch
    pub clear_on_update: bool,

    /// Strip unchanged attributes from patches before submission
    pub clean_patch: bool,

    /// Metadata sub-keys (`links`, `meta`, `relationships`) retained by
    /// patch cleaning
    pub clean_patch_props: Vec<String>,

    /// Allow relationship resolution to revisit records already on the
    /// resolution path (unbounded; caller must guarantee termination)
    pub recurse_relationships: bool,
}

impl StoreConfig {
    /// Create a configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            reserved_key: "_jv".to_string(),
            follow_relationships_data: true,
            preserve_json: false,
            action_status_clean_age: 600,
            merge_records: false,
            clear_on_update: false,
            clean_patch: false,
            clean_patch_props: Vec::new(),
            recurse_relationships: false,
        }
    }

    /// Set the reserved metadata key
    #[must_use]
    pub fn with_reserved_key(mut self, key: impl Into<String>) -> Self {
        self.reserved_key = key.into();
        self
    }

    /// Enable or disable relationship-following on read
    #[must_use]
    pub const fn with_follow_relationships_data(mut self, follow: bool) -> Self {
        self.follow_relationships_data = follow;
        self
    }

    /// Enable or disable raw payload preservation
    #[must_use]
    pub const fn with_preserve_json(mut self, preserve: bool) -> Self {
        self.preserve_json = preserve;
        self
    }

    /// Set the status eviction age in seconds (0 disables)
    #[must_use]
    pub const fn with_action_status_clean_age(mut self, seconds: u64) -> Self {
        self.action_status_clean_age = seconds;
        self
    }

    /// Enable or disable deep-merging on `add`
    #[must_use]
    pub const fn with_merge_records(mut self, merge: bool) -> Self {
        self.merge_records = merge;
        self
    }

    /// Enable or disable stale-id reconciliation after collection fetches
    #[must_use]
    pub const fn with_clear_on_update(mut self, clear: bool) -> Self {
        self.clear_on_update = clear;
        self
    }

    /// Enable or disable patch cleaning
    #[must_use]
    pub const fn with_clean_patch(mut self, clean: bool) -> Self {
        self.clean_patch = clean;
        self
    }

    /// Set the metadata sub-keys retained by patch cleaning
    #[must_use]
    pub fn with_clean_patch_props(mut self, props: Vec<String>) -> Self {
        self.clean_patch_props = props;
        self
    }

    /// Enable or disable unbounded relationship recursion
    #[must_use]
    pub const fn with_recurse_relationships(mut self, recurse: bool) -> Self {
        self.recurse_relationships = recurse;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
