use serde::{Deserialize, Serialize};

/// How masters enter the destination during one assembly session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterMode {
    /// A slide's master is imported on demand unless a structurally identical
    /// master (same name, same ordered layout names) is already present.
    #[default]
    AutoImport,
    /// Masters are added by the caller up front; slides bind to them by master
    /// and layout name and never pull in a master of their own.
    Explicit,
}

/// What a slide's layout becomes in the destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategy {
    #[default]
    UseSource,
    Merge(MergeOptions),
    ByName(String),
}

/// Properties copied from an incoming placeholder onto the destination
/// placeholder it binds to. Everything else on the destination stays as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeOptions {
    pub copy_fill: bool,
    pub copy_text_format: bool,
}

impl MergeOptions {
    pub fn with_fill(mut self) -> Self {
        self.copy_fill = true;
        self
    }

    pub fn with_text_format(mut self) -> Self {
        self.copy_text_format = true;
        self
    }
}

/// Handling of chart data whose value rows do not match the series count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    #[default]
    Reject,
    /// Cut series and value rows down to the shortest width present.
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblySettings {
    pub master_mode: MasterMode,
    pub default_layout_strategy: LayoutStrategy,
    pub remove_existing_slides: bool,
    pub cleanup_unreferenced_parts: bool,
    pub verify_on_write: bool,
    pub media_name_prefix: Option<String>,
    pub chart_mismatch_policy: MismatchPolicy,
    /// Stamp `dcterms:modified` in the core properties when writing.
    pub update_core_properties: bool,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            master_mode: MasterMode::AutoImport,
            default_layout_strategy: LayoutStrategy::UseSource,
            remove_existing_slides: false,
            cleanup_unreferenced_parts: true,
            verify_on_write: true,
            media_name_prefix: None,
            chart_mismatch_policy: MismatchPolicy::Reject,
            update_core_properties: true,
        }
    }
}

impl AssemblySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_master_mode(mut self, mode: MasterMode) -> Self {
        self.master_mode = mode;
        self
    }

    pub fn with_layout_strategy(mut self, strategy: LayoutStrategy) -> Self {
        self.default_layout_strategy = strategy;
        self
    }

    pub fn with_remove_existing_slides(mut self, remove: bool) -> Self {
        self.remove_existing_slides = remove;
        self
    }

    pub fn with_cleanup_unreferenced_parts(mut self, cleanup: bool) -> Self {
        self.cleanup_unreferenced_parts = cleanup;
        self
    }

    pub fn with_verify_on_write(mut self, verify: bool) -> Self {
        self.verify_on_write = verify;
        self
    }

    pub fn with_media_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.media_name_prefix = Some(prefix.into());
        self
    }

    pub fn with_chart_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.chart_mismatch_policy = policy;
        self
    }

    pub fn with_update_core_properties(mut self, update: bool) -> Self {
        self.update_core_properties = update;
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_have_expected_values() {
        let settings = AssemblySettings::default();

        assert_eq!(settings.master_mode, MasterMode::AutoImport);
        assert_eq!(settings.default_layout_strategy, LayoutStrategy::UseSource);
        assert!(settings.cleanup_unreferenced_parts);
        assert!(settings.verify_on_write);
        assert_eq!(settings.chart_mismatch_policy, MismatchPolicy::Reject);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings = AssemblySettings::from_json(
            r#"{"master_mode":"explicit","default_layout_strategy":{"merge":{"copy_fill":true,"copy_text_format":false}}}"#,
        )
        .unwrap();
        assert_eq!(settings.master_mode, MasterMode::Explicit);
        assert_eq!(
            settings.default_layout_strategy,
            LayoutStrategy::Merge(MergeOptions::default().with_fill())
        );
        assert!(settings.verify_on_write);
    }

    #[test]
    fn serialized_settings_read_back() {
        let settings = AssemblySettings::new()
            .with_layout_strategy(LayoutStrategy::Merge(MergeOptions::default().with_text_format()))
            .with_chart_mismatch_policy(MismatchPolicy::Truncate)
            .with_media_name_prefix("brand");
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains(r#""chart_mismatch_policy":"truncate""#));
        assert_eq!(AssemblySettings::from_json(&json).unwrap(), settings);
    }
}
