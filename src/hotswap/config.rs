//! Configuration for hot-swap passes.

use strum::Display;

/// Default opt-in marker names.
pub const DEFAULT_MARKERS: [&str; 2] = ["HotSwappable", "HotSwappableAttribute"];

/// Default infix of replacement method names.
pub const DEFAULT_REPLACEMENT_SUFFIX: &str = "_HotSwap";

/// What the disk body of a function is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum DiffBaseline {
    /// The disk encoding of the replacement activated last, or the body the host reports if
    /// the function was never replaced.
    #[default]
    LastActivated,
    /// Always the body the host reports. Hosts that keep reporting the original body of a
    /// detoured method will see every replaced function again on each pass.
    HostReflection,
}

/// Configuration for the hot-swap orchestrator.
#[derive(Debug, Clone)]
pub struct HotSwapConfig {
    /// Short names of the custom attributes that opt a type in (exact, case-sensitive).
    pub markers: Vec<String>,

    /// Baseline for change detection (default: [`DiffBaseline::LastActivated`]).
    pub baseline: DiffBaseline,

    /// Infix between the original name and the counter in replacement names
    /// (default: `_HotSwap`).
    pub replacement_suffix: String,

    /// Skip static constructors, which already ran (default: true).
    pub skip_type_initializers: bool,
}

impl Default for HotSwapConfig {
    fn default() -> Self {
        Self {
            markers: DEFAULT_MARKERS.iter().map(ToString::to_string).collect(),
            baseline: DiffBaseline::LastActivated,
            replacement_suffix: DEFAULT_REPLACEMENT_SUFFIX.to_string(),
            skip_type_initializers: true,
        }
    }
}

impl HotSwapConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that recognises only the given markers.
    #[must_use]
    pub fn with_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Creates a configuration that always diffs against the body the host reports.
    #[must_use]
    pub fn host_reflection() -> Self {
        Self {
            baseline: DiffBaseline::HostReflection,
            ..Self::default()
        }
    }

    /// Returns the name of the `counter`-th replacement of `method`.
    #[must_use]
    pub fn replacement_name(&self, method: &str, counter: u64) -> String {
        format!("{method}{}{counter}", self.replacement_suffix)
    }
}
