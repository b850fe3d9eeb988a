//! Aurora Scramble - Source Uglifier
//!
//! Takes program source text and emits a variant that still parses in the
//! same grammar but is deliberately harder to read.
//!
//! ## Strategies
//!
//! ### 1. Structural (Python)
//! Parses into a full-fidelity tree that keeps every whitespace and comment
//! token, rewrites it node by node, splices synthetic statements in place
//! and regenerates text that is checked to re-parse.
//!
//! ```text
//! text ──► PythonParser ──► SourceTree ──► NodeVisitor ──► regenerate ──► NoiseInjector
//!                                             │    ▲
//!                                             ▼    │
//!                                       RenameRegistry / splice
//! ```
//!
//! Rules applied by the visitor:
//! - identifiers renamed consistently (builtins, keywords, attributes and
//!   import paths are left alone)
//! - arithmetic wrapped as `(expr) + 0`, bare calls parenthesized
//! - an `if False: pass` guard before every conditional
//! - one to three unused modules added to `import` statements
//! - a `dummy_function` appended to the module
//!
//! ### 2. Shallow (C/C++, JavaScript/TypeScript, Go)
//! Regex-discovered declarations are renamed outside literals and comments,
//! then the textual noise pass runs with the language's comment marker.
//!
//! ### 3. Rust
//! Left untouched with a notice.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aurora_scramble::{Engine, ScrambleConfig, Scrambler};
//!
//! let mut engine = Engine::new(ScrambleConfig::new().seed(7))?;
//! let ugly = engine.transform("print('Hello, world!')\n")?;
//!
//! // Whole trees: writes into a sibling `src.scrambled` directory
//! let mut scrambler = Scrambler::new(ScrambleConfig::new().recursive(true))?;
//! let report = scrambler.scramble_path("src".as_ref());
//! println!("{}", report.summary());
//! ```

pub mod analysis;
mod config;
pub mod context;
pub mod cst;
mod engine;
mod error;
mod language;
pub mod names;
pub mod noise;
pub mod parser;
pub mod regen;
pub mod scan;
mod scrambler;
pub mod shallow;
pub mod splice;
pub mod visitor;

pub use config::{NoiseConfig, RuleSet, ScrambleConfig};
pub use context::TransformContext;
pub use engine::{transform, transform_shallow, Engine, Outcome};
pub use error::{ScrambleError, ScrambleResult};
pub use language::{Language, RUST_NOTICE};
pub use noise::NoiseTemplateCatalog;
pub use parser::{parse, PythonParser};
pub use regen::render;
pub use scrambler::{BatchReport, ScrambledFile, Scrambler};
pub use visitor::RewriteStats;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
