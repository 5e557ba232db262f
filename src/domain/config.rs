//! Selector configuration
//!
//! Declarative weights, behavior flags and advanced knobs for the selection
//! engine, plus the built-in presets. Loading and saving documents is in
//! [`crate::storage::ConfigStore`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Allowed distance of the dependency-aware weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.1;

/// Selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Oldest task first
    CreationOrder,
    /// Weighted blend of unblock impact, priority, hierarchy and critical path
    #[default]
    DependencyAware,
    /// Highest priority first, dependents break ties
    Priority,
    /// Deepest subtask first
    DepthFirst,
    /// Longest chain of dependents first
    CriticalPath,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::CreationOrder,
        Strategy::DependencyAware,
        Strategy::Priority,
        Strategy::DepthFirst,
        Strategy::CriticalPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CreationOrder => "creation_order",
            Strategy::DependencyAware => "dependency_aware",
            Strategy::Priority => "priority",
            Strategy::DepthFirst => "depth_first",
            Strategy::CriticalPath => "critical_path",
        }
    }

    /// Human-readable name used in selection reasons
    pub fn display_name(&self) -> &'static str {
        match self {
            Strategy::CreationOrder => "creation-order",
            Strategy::DependencyAware => "dependency-aware",
            Strategy::Priority => "priority",
            Strategy::DepthFirst => "depth-first",
            Strategy::CriticalPath => "critical-path",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::CreationOrder => "Work on tasks in the order they were created",
            Strategy::DependencyAware => {
                "Balance unblock impact, priority, hierarchy depth and critical path"
            }
            Strategy::Priority => "Work on the highest priority tasks first",
            Strategy::DepthFirst => "Finish the deepest subtasks before their parents",
            Strategy::CriticalPath => "Shorten the longest chain of dependent work first",
        }
    }

    /// Only the dependency-aware strategy composes weighted terms
    pub fn uses_weights(&self) -> bool {
        matches!(self, Strategy::DependencyAware)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| ConfigError::Parse(format!("unknown strategy '{}'", s)))
    }
}

/// Weights for the dependency-aware strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub dependent_count: f64,
    pub priority: f64,
    pub depth_first: f64,
    pub critical_path: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            dependent_count: 0.4,
            priority: 0.3,
            depth_first: 0.2,
            critical_path: 0.1,
        }
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.dependent_count + self.priority + self.depth_first + self.critical_path
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("dependent_count", self.dependent_count),
            ("priority", self.priority),
            ("depth_first", self.depth_first),
            ("critical_path", self.critical_path),
        ]
    }

    /// Checks the weights for non-negative finite values summing to 1.0 ± 10%
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.named() {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "weight '{}' must be a finite number",
                    name
                )));
            }
            if value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "weight '{}' must not be negative (got {})",
                    name, value
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE + f64::EPSILON {
            return Err(ConfigError::Invalid(format!(
                "weights must sum to 1.0 (±{}), got {:.3}",
                WEIGHT_SUM_TOLERANCE, sum
            )));
        }
        Ok(())
    }
}

/// Selection behavior flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behavior {
    /// Allow selecting a parent while its subtasks are still open
    pub allow_parent_with_subtasks: bool,

    /// Prefer continuing in-progress work over starting new work
    pub prefer_in_progress: bool,

    /// Break score ties by creation time (oldest wins); otherwise by id
    pub break_ties_by_creation: bool,

    /// Missing dependency references block the task instead of being ignored
    pub strict_dependencies: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            allow_parent_with_subtasks: false,
            prefer_in_progress: true,
            break_ties_by_creation: true,
            strict_dependencies: true,
        }
    }
}

/// Advanced knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Advanced {
    /// Traversal bound for depth metrics; 0 disables the bound
    pub max_dependency_depth: u32,

    /// Candidates scoring below this are dropped when it is above zero
    pub score_threshold: f64,

    pub cache_enabled: bool,

    /// Time-to-live of cached graphs, in seconds
    pub cache_duration_secs: u64,
}

impl Default for Advanced {
    fn default() -> Self {
        Self {
            max_dependency_depth: 10,
            score_threshold: 0.0,
            cache_enabled: true,
            cache_duration_secs: 5 * 60,
        }
    }
}

/// Complete selector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SelectorConfig {
    pub strategy: Strategy,
    pub weights: Weights,
    pub behavior: Behavior,
    pub advanced: Advanced,
}

impl SelectorConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Validates the configuration before it is used for selection
    ///
    /// Weight sums are only checked for the dependency-aware strategy; the
    /// other strategies never read the weights.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy.uses_weights() {
            self.weights.validate()?;
        } else {
            for (name, value) in self.weights.named() {
                if value < 0.0 || !value.is_finite() {
                    return Err(ConfigError::Invalid(format!(
                        "weight '{}' must be a non-negative finite number",
                        name
                    )));
                }
            }
        }

        let threshold = self.advanced.score_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "score_threshold must be a non-negative finite number (got {})",
                threshold
            )));
        }

        Ok(())
    }

    /// Stable digest of the configuration, used in cache keys
    pub fn digest(&self) -> String {
        // Serializing plain structs of numbers and bools cannot fail
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex()[..16].to_string()
    }
}

/// Rejects a missing configuration and validates a present one
pub fn validate_config(config: Option<&SelectorConfig>) -> Result<(), ConfigError> {
    match config {
        None => Err(ConfigError::Invalid("configuration is missing".to_string())),
        Some(config) => config.validate(),
    }
}

/// Built-in named configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Default,
    PriorityDriven,
    DepthFirst,
    DependencyFocused,
    CriticalPath,
    LegacyCompatible,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::Default,
        Preset::PriorityDriven,
        Preset::DepthFirst,
        Preset::DependencyFocused,
        Preset::CriticalPath,
        Preset::LegacyCompatible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::PriorityDriven => "priority_driven",
            Preset::DepthFirst => "depth_first",
            Preset::DependencyFocused => "dependency_focused",
            Preset::CriticalPath => "critical_path",
            Preset::LegacyCompatible => "legacy_compatible",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::Default => "Dependency-aware selection with balanced weights",
            Preset::PriorityDriven => "Highest priority first",
            Preset::DepthFirst => "Finish subtasks before moving up the hierarchy",
            Preset::DependencyFocused => "Maximize how much work each task unblocks",
            Preset::CriticalPath => "Attack the longest dependency chain first",
            Preset::LegacyCompatible => "Plain creation order with lenient dependencies",
        }
    }

    pub fn config(&self) -> SelectorConfig {
        let base = SelectorConfig::default();
        match self {
            Preset::Default => base,
            Preset::PriorityDriven => SelectorConfig {
                strategy: Strategy::Priority,
                weights: Weights {
                    dependent_count: 0.2,
                    priority: 0.6,
                    depth_first: 0.1,
                    critical_path: 0.1,
                },
                ..base
            },
            Preset::DepthFirst => SelectorConfig {
                strategy: Strategy::DepthFirst,
                weights: Weights {
                    dependent_count: 0.2,
                    priority: 0.2,
                    depth_first: 0.5,
                    critical_path: 0.1,
                },
                ..base
            },
            Preset::DependencyFocused => SelectorConfig {
                strategy: Strategy::DependencyAware,
                weights: Weights {
                    dependent_count: 0.6,
                    priority: 0.2,
                    depth_first: 0.1,
                    critical_path: 0.1,
                },
                ..base
            },
            Preset::CriticalPath => SelectorConfig {
                strategy: Strategy::CriticalPath,
                weights: Weights {
                    dependent_count: 0.2,
                    priority: 0.2,
                    depth_first: 0.1,
                    critical_path: 0.5,
                },
                ..base
            },
            Preset::LegacyCompatible => SelectorConfig {
                strategy: Strategy::CreationOrder,
                behavior: Behavior {
                    allow_parent_with_subtasks: true,
                    prefer_in_progress: false,
                    break_ties_by_creation: true,
                    strict_dependencies: false,
                },
                advanced: Advanced {
                    cache_enabled: false,
                    ..Advanced::default()
                },
                ..base
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Preset::ALL
            .into_iter()
            .find(|preset| preset.as_str() == normalized)
            .ok_or_else(|| ConfigError::Parse(format!("unknown preset '{}'", s)))
    }
}
