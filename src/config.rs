//! Configuration for source scrambling

use crate::noise::NoiseTemplateCatalog;
use crate::{ScrambleError, ScrambleResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which structural rewrite rules are applied to Python sources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSet {
    /// Rename identifiers through the rename registry
    #[serde(default = "enabled")]
    pub rename: bool,

    /// Wrap binary expression statements as `(expr) + 0` and user calls as `(call)`
    #[serde(default = "enabled")]
    pub wrap_expressions: bool,

    /// Insert an `if False: pass` guard before every conditional
    #[serde(default = "enabled")]
    pub guard_conditionals: bool,

    /// Append decoy module names to `import` statements
    #[serde(default = "enabled")]
    pub decoy_imports: bool,

    /// Append an empty `dummy_function` to the module
    #[serde(default = "enabled")]
    pub dummy_function: bool,
}

fn enabled() -> bool {
    true
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rename: true,
            wrap_expressions: true,
            guard_conditionals: true,
            decoy_imports: true,
            dummy_function: true,
        }
    }
}

impl RuleSet {
    /// All rules switched off; useful to isolate one rule at a time.
    pub fn none() -> Self {
        Self {
            rename: false,
            wrap_expressions: false,
            guard_conditionals: false,
            decoy_imports: false,
            dummy_function: false,
        }
    }
}

/// Settings for the line-oriented noise pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Run the noise pass at all
    #[serde(default = "enabled")]
    pub enabled: bool,

    /// Chance of a dead-code comment line before each line
    #[serde(default = "default_dead_code_probability")]
    pub dead_code_probability: f64,

    /// Chance of a trailing decorative comment on each line
    #[serde(default = "default_trailing_comment_probability")]
    pub trailing_comment_probability: f64,

    /// Shortest run an interior space is expanded to
    #[serde(default = "default_space_run_min")]
    pub space_run_min: usize,

    /// Longest run an interior space is expanded to
    #[serde(default = "default_space_run_max")]
    pub space_run_max: usize,

    /// Insert a dummy assignment after assignment lines (Python only)
    #[serde(default = "enabled")]
    pub dummy_assignments: bool,

    /// Append decoy import calls at the end of the module (Python only)
    #[serde(default = "enabled")]
    pub tail_calls: bool,

    /// Template pools the pass draws from
    #[serde(default)]
    pub catalog: NoiseTemplateCatalog,
}

fn default_dead_code_probability() -> f64 {
    0.7
}

fn default_trailing_comment_probability() -> f64 {
    0.25
}

fn default_space_run_min() -> usize {
    3
}

fn default_space_run_max() -> usize {
    8
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dead_code_probability: default_dead_code_probability(),
            trailing_comment_probability: default_trailing_comment_probability(),
            space_run_min: default_space_run_min(),
            space_run_max: default_space_run_max(),
            dummy_assignments: true,
            tail_calls: true,
            catalog: NoiseTemplateCatalog::default(),
        }
    }
}

impl NoiseConfig {
    /// Noise pass switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Configuration for a scrambling run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrambleConfig {
    /// Seed for the per-file random generator; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,

    /// Structural rules for Python
    #[serde(default)]
    pub rules: RuleSet,

    /// Noise pass settings
    #[serde(default)]
    pub noise: NoiseConfig,

    /// Module names that may be appended to import statements
    #[serde(default = "default_decoy_imports")]
    pub decoy_imports: Vec<String>,

    /// Marker inserted into output file names (`a.py` -> `a.<marker>.py`)
    #[serde(default = "default_output_marker")]
    pub output_marker: String,

    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,
}

fn default_decoy_imports() -> Vec<String> {
    ["math", "os", "sys", "random", "time", "collections", "functools"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_output_marker() -> String {
    "scrambled".to_string()
}

impl Default for ScrambleConfig {
    fn default() -> Self {
        Self {
            seed: None,
            rules: RuleSet::default(),
            noise: NoiseConfig::default(),
            decoy_imports: default_decoy_imports(),
            output_marker: default_output_marker(),
            recursive: false,
        }
    }
}

impl ScrambleConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> ScrambleResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ScrambleError::from_io(e, path))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ScrambleError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Fix the random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the rule set
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the noise settings
    pub fn noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    /// Turn the noise pass off
    pub fn without_noise(mut self) -> Self {
        self.noise.enabled = false;
        self
    }

    /// Set the output marker
    pub fn output_marker(mut self, marker: impl Into<String>) -> Self {
        self.output_marker = marker.into();
        self
    }

    /// Descend into subdirectories
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Reject settings the passes cannot honour
    pub fn validate(&self) -> ScrambleResult<()> {
        let noise = &self.noise;
        for (name, p) in [
            ("dead_code_probability", noise.dead_code_probability),
            ("trailing_comment_probability", noise.trailing_comment_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ScrambleError::Config(format!(
                    "{} must be within 0..=1, got {}",
                    name, p
                )));
            }
        }
        if noise.space_run_min == 0 || noise.space_run_min > noise.space_run_max {
            return Err(ScrambleError::Config(format!(
                "invalid space run range {}..={}",
                noise.space_run_min, noise.space_run_max
            )));
        }
        if self.output_marker.is_empty()
            || self.output_marker.contains(['/', '\\', '.'])
        {
            return Err(ScrambleError::Config(format!(
                "invalid output marker {:?}",
                self.output_marker
            )));
        }
        if let Some(bad) = self
            .decoy_imports
            .iter()
            .find(|m| !crate::names::is_identifier(m))
        {
            return Err(ScrambleError::Config(format!(
                "decoy import {:?} is not a module name",
                bad
            )));
        }
        Ok(())
    }
}
