//! Line-oriented noise over already valid source text
//!
//! Runs after the structural rewrite (Python) or the shallow renamer (other
//! languages). Every edit is gated on the scanner's view of the line so that
//! nothing lands inside a string literal, an open bracket or a backslash
//! continuation.

use crate::config::NoiseConfig;
use crate::names::random_string;
use crate::scan::{classify, line_shapes, Dialect, LineShape, Region};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lines starting with one of these open or continue a compound statement
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "try", "except", "finally", "with", "def", "class",
    "async", "match", "case",
];

/// Template pools the noise pass draws from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoiseTemplateCatalog {
    #[serde(default = "default_emojis")]
    pub emojis: Vec<String>,

    /// Complete statements inserted after assignment lines
    #[serde(default = "default_dummy_assignments")]
    pub dummy_assignments: Vec<String>,

    /// Left-hand sides for commented-out fake assignments
    #[serde(default = "default_nonsense_expressions")]
    pub nonsense_expressions: Vec<String>,

    #[serde(default = "default_declaration_keywords")]
    pub declaration_keywords: Vec<String>,

    #[serde(default = "default_flow_keywords")]
    pub flow_keywords: Vec<String>,

    /// Lines appended to the end of Python output
    #[serde(default = "default_tail_calls")]
    pub tail_calls: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_emojis() -> Vec<String> {
    owned(&["😀", "🔥", "💀", "🚀", "🐍", "🎉", "🤖", "🛠️"])
}

fn default_dummy_assignments() -> Vec<String> {
    owned(&["dummy_var = 0", "temp = 12345", "unused_var = None"])
}

fn default_nonsense_expressions() -> Vec<String> {
    owned(&["a + b", "x * y", "z / w"])
}

fn default_declaration_keywords() -> Vec<String> {
    owned(&["def", "class"])
}

fn default_flow_keywords() -> Vec<String> {
    owned(&["return", "yield"])
}

fn default_tail_calls() -> Vec<String> {
    owned(&[
        "import math",
        "math.sqrt(25)",
        "import os",
        "os.path.exists('/some/path')",
    ])
}

impl Default for NoiseTemplateCatalog {
    fn default() -> Self {
        Self {
            emojis: default_emojis(),
            dummy_assignments: default_dummy_assignments(),
            nonsense_expressions: default_nonsense_expressions(),
            declaration_keywords: default_declaration_keywords(),
            flow_keywords: default_flow_keywords(),
            tail_calls: default_tail_calls(),
        }
    }
}

fn pick<'a, R: Rng + ?Sized>(items: &'a [String], rng: &mut R) -> &'a str {
    items.choose(rng).map(String::as_str).unwrap_or("")
}

/// Bernoulli draw that tolerates out-of-range probabilities
fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    probability > 0.0 && (probability >= 1.0 || rng.gen::<f64>() < probability)
}

fn indent_of(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

fn split_cr(line: &str) -> (&str, &str) {
    match line.strip_suffix('\r') {
        Some(body) => (body, "\r"),
        None => (line, ""),
    }
}

fn first_word(line: &str) -> &str {
    let trimmed = line.trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// A scanned text ready for line-by-line rebuilding
struct Scanned<'t> {
    text: &'t str,
    regions: Vec<Region>,
    shapes: Vec<LineShape>,
}

impl<'t> Scanned<'t> {
    fn new(text: &'t str, dialect: Dialect) -> Self {
        let regions = classify(text, dialect);
        let shapes = line_shapes(text, &regions);
        Self {
            text,
            regions,
            shapes,
        }
    }

    fn line(&self, index: usize) -> &'t str {
        let shape = &self.shapes[index];
        &self.text[shape.start..shape.end]
    }

    /// The empty remainder after a final newline
    fn is_phantom(&self, index: usize) -> bool {
        let shape = &self.shapes[index];
        index > 0 && shape.start == self.text.len()
    }

    fn previous_continues(&self, index: usize) -> bool {
        index > 0 && self.shapes[index - 1].continues
    }

    fn push_separator(&self, index: usize, out: &mut String) {
        if self.shapes[index].end < self.text.len() {
            out.push('\n');
        }
    }
}

/// Applies the noise passes configured in a [`NoiseConfig`]
pub struct NoiseInjector<'a> {
    config: &'a NoiseConfig,
    dialect: Dialect,
}

impl<'a> NoiseInjector<'a> {
    pub fn new(config: &'a NoiseConfig, dialect: Dialect) -> Self {
        Self { config, dialect }
    }

    /// Run every enabled pass over `text`.
    ///
    /// Order: tail calls, dummy assignments, dead-code lines, then trailing
    /// comments and space jitter.
    pub fn apply<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        if !self.config.enabled {
            return text.to_string();
        }
        let python = self.dialect == Dialect::Python;

        let mut out = text.to_string();
        if python && self.config.tail_calls {
            out = self.append_tail_calls(&out);
        }
        if python && self.config.dummy_assignments {
            out = self.insert_dummy_assignments(&out, rng);
        }
        out = self.insert_dead_code(&out, rng);
        self.decorate_lines(&out, rng)
    }

    fn append_tail_calls(&self, text: &str) -> String {
        let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let mut out = text.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(newline);
        }
        for call in &self.config.catalog.tail_calls {
            out.push_str(call);
            out.push_str(newline);
        }
        out
    }

    /// After each complete simple assignment line, add one dummy assignment
    /// at the same indentation.
    fn insert_dummy_assignments<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let templates: Vec<&String> = self
            .config
            .catalog
            .dummy_assignments
            .iter()
            .filter(|template| {
                let target = template.split('=').next().unwrap_or("").trim();
                !target_in_use(text, target)
            })
            .collect();
        if templates.is_empty() {
            return text.to_string();
        }

        let scanned = Scanned::new(text, self.dialect);
        let mut out = String::with_capacity(text.len() * 2);
        for (index, shape) in scanned.shapes.iter().enumerate() {
            let line = scanned.line(index);
            out.push_str(line);

            let trimmed = line.trim_start();
            let eligible = shape.has_assignment
                && shape.is_complete_statement()
                && shape.code_tail != Some(b':')
                && !scanned.previous_continues(index)
                && !trimmed.starts_with('@')
                && !COMPOUND_KEYWORDS.contains(&first_word(trimmed));
            if eligible {
                if let Some(template) = templates.choose(rng) {
                    let (body, cr) = split_cr(line);
                    out.push('\n');
                    out.push_str(indent_of(body));
                    out.push_str(template);
                    out.push_str(cr);
                }
            }
            scanned.push_separator(index, &mut out);
        }
        out
    }

    /// Before each line, with the configured probability, add a comment
    /// holding fake code.
    fn insert_dead_code<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let scanned = Scanned::new(text, self.dialect);
        let mut out = String::with_capacity(text.len() * 2);
        for (index, shape) in scanned.shapes.iter().enumerate() {
            let line = scanned.line(index);
            let eligible = !shape.starts_inside
                && !scanned.previous_continues(index)
                && !scanned.is_phantom(index);
            if eligible && chance(rng, self.config.dead_code_probability) {
                let (body, cr) = split_cr(line);
                out.push_str(indent_of(body));
                out.push_str(&self.dead_code_line(rng));
                out.push_str(cr);
                out.push('\n');
            }
            out.push_str(line);
            scanned.push_separator(index, &mut out);
        }
        out
    }

    /// Trailing comments and interior space jitter
    fn decorate_lines<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let scanned = Scanned::new(text, self.dialect);
        let mut out = String::with_capacity(text.len() * 2);
        for (index, shape) in scanned.shapes.iter().enumerate() {
            if scanned.is_phantom(index) {
                continue;
            }
            let (body, cr) = split_cr(scanned.line(index));
            let indent_len = if shape.starts_inside {
                0
            } else {
                indent_of(body).len()
            };

            for (offset, ch) in body.char_indices() {
                let in_literal = scanned.regions[shape.start + offset] == Region::Literal;
                if ch == ' ' && offset >= indent_len && !in_literal {
                    out.push_str(&" ".repeat(self.space_run(rng)));
                } else {
                    out.push(ch);
                }
            }

            if !shape.ends_inside
                && !shape.continues
                && chance(rng, self.config.trailing_comment_probability)
            {
                out.push_str(&" ".repeat(self.space_run(rng).max(2)));
                out.push_str(self.dialect.comment_marker());
                out.push(' ');
                out.push_str(&random_string(rng));
            }
            out.push_str(cr);
            scanned.push_separator(index, &mut out);
        }
        out
    }

    fn space_run<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let low = self.config.space_run_min.min(self.config.space_run_max).max(1);
        let high = self.config.space_run_max.max(low);
        rng.gen_range(low..=high)
    }

    /// One commented-out line of fake code, in this dialect's comment syntax.
    pub fn dead_code_line<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let catalog = &self.config.catalog;
        let emoji = pick(&catalog.emojis, rng);
        let body = match rng.gen_range(0..7) {
            0..=2 => emoji.to_string(),
            3 => {
                let letter = (b'a' + rng.gen_range(0..26u8)) as char;
                let name = random_string(rng);
                format!(
                    "{}{}_{} = {}",
                    letter,
                    name,
                    rng.gen_range(100..=999),
                    rng.gen_range(1..=100)
                )
            }
            4 => {
                let expression = pick(&catalog.nonsense_expressions, rng);
                format!("{} {} = {}", emoji, expression, rng.gen_range(1..=100))
            }
            5 => {
                let keyword = pick(&catalog.declaration_keywords, rng);
                format!("{} {} {}", emoji, keyword, random_string(rng))
            }
            _ => {
                let keyword = pick(&catalog.flow_keywords, rng);
                format!("{} {} {}", emoji, keyword, random_string(rng))
            }
        };
        format!("{} {}", self.dialect.comment_marker(), body.trim())
    }
}

/// `target` already names something in `text`
fn target_in_use(text: &str, target: &str) -> bool {
    if target.is_empty() {
        return false;
    }
    Regex::new(&format!(r"\b{}\b", regex::escape(target)))
        .map_or(true, |re| re.is_match(text))
}
