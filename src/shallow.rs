//! Textual scrambling for languages without a bundled grammar
//!
//! Much weaker than the Python rewrite: declarations are discovered with
//! regular expressions, renamed everywhere outside strings and comments,
//! and the noise pass runs with the language's comment syntax. No parse
//! happens, so the output is never checked for validity. It is only
//! guaranteed to differ from the input.

use crate::config::NoiseConfig;
use crate::context::TransformContext;
use crate::language::Language;
use crate::names::{random_string, ReservedNameSet};
use crate::noise::NoiseInjector;
use crate::scan::{classify, Dialect, Region};
use crate::{ScrambleError, ScrambleResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Declaration discovery rules for one family of languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShallowGrammar {
    /// C and C++ locals and parameters declared with a builtin type
    CFamily,
    /// `let`/`const`/`var` bindings that are not exported
    JavaScript,
    /// Lower-case `:=` and `var` bindings
    Go,
}

impl ShallowGrammar {
    pub fn for_language(language: Language) -> Option<Self> {
        match language {
            Language::C | Language::Cpp => Some(Self::CFamily),
            Language::JavaScript | Language::TypeScript => Some(Self::JavaScript),
            Language::Go => Some(Self::Go),
            Language::Python | Language::Rust => None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Self::CFamily => Dialect::CLike,
            Self::JavaScript => Dialect::JavaScript,
            Self::Go => Dialect::Go,
        }
    }

    /// Keywords and well-known names that are never renamed
    pub fn reserved(&self) -> &'static ReservedNameSet {
        match self {
            Self::CFamily => &C_FAMILY_RESERVED,
            Self::JavaScript => &JAVASCRIPT_RESERVED,
            Self::Go => &GO_RESERVED,
        }
    }

    fn declaration_pattern(&self) -> &'static str {
        match self {
            Self::CFamily => {
                r"\b(?:int|char|float|double|long|short|unsigned|signed|bool|auto|size_t|void)\b[\s\*&]+([A-Za-z_]\w*)\s*[=;,\[\)]"
            }
            Self::JavaScript => r"(\bexport\s+)?\b(?:let|const|var)\s+([A-Za-z_$][\w$]*)",
            Self::Go => r"\b([a-z_]\w*(?:\s*,\s*[a-z_]\w*)*)\s*:=|\bvar\s+([a-z_]\w*)",
        }
    }

    fn is_ident_byte(&self, b: u8) -> bool {
        b.is_ascii_alphanumeric() || b == b'_' || (*self == Self::JavaScript && b == b'$')
    }
}

/// Renames declared names, then adds comment noise.
pub struct ShallowTransformer<'a> {
    grammar: ShallowGrammar,
    noise: &'a NoiseConfig,
}

impl<'a> ShallowTransformer<'a> {
    pub fn new(grammar: ShallowGrammar, noise: &'a NoiseConfig) -> Self {
        Self { grammar, noise }
    }

    /// Names declared in `text` that are safe to rename, in first-seen order.
    pub fn declared_names(&self, text: &str) -> ScrambleResult<Vec<String>> {
        let pattern = Regex::new(self.grammar.declaration_pattern())
            .map_err(|e| ScrambleError::Pattern(e.to_string()))?;
        let regions = classify(text, self.grammar.dialect());
        let members = self.member_names(text, &regions);

        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for caps in pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if regions[whole.start()] != Region::Code {
                continue;
            }
            let found: Vec<&str> = match self.grammar {
                ShallowGrammar::CFamily => caps.get(1).map(|m| vec![m.as_str()]).unwrap_or_default(),
                ShallowGrammar::JavaScript => {
                    if caps.get(1).is_some() {
                        continue;
                    }
                    caps.get(2).map(|m| vec![m.as_str()]).unwrap_or_default()
                }
                ShallowGrammar::Go => match (caps.get(1), caps.get(2)) {
                    (Some(list), _) => list.as_str().split(',').map(str::trim).collect(),
                    (None, Some(single)) => vec![single.as_str()],
                    (None, None) => Vec::new(),
                },
            };
            for name in found {
                if self.grammar.reserved().contains(name) || members.contains(name) {
                    continue;
                }
                if seen.insert(name.to_string()) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Identifiers reached through `.`, `->` or `::`; renaming them would
    /// break member access on types declared elsewhere.
    fn member_names(&self, text: &str, regions: &[Region]) -> HashSet<String> {
        let mut members = HashSet::new();
        for (start, end) in self.identifier_spans(text, regions) {
            if is_member_access(text.as_bytes(), start) {
                members.insert(text[start..end].to_string());
            }
        }
        members
    }

    /// Byte ranges of identifier tokens inside code regions
    fn identifier_spans(&self, text: &str, regions: &[Region]) -> Vec<(usize, usize)> {
        let bytes = text.as_bytes();
        let mut spans = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if regions[i] != Region::Code || !self.grammar.is_ident_byte(bytes[i]) {
                i += 1;
                continue;
            }
            let start = i;
            while i < bytes.len() && regions[i] == Region::Code && self.grammar.is_ident_byte(bytes[i])
            {
                i += 1;
            }
            // numeric literals such as 0x1f or 1e9 are not identifiers
            if !bytes[start].is_ascii_digit() {
                spans.push((start, i));
            }
        }
        spans
    }

    /// Replace every code occurrence of a declared name, in one pass.
    pub fn rename(&self, text: &str, ctx: &mut TransformContext<'_>) -> ScrambleResult<(String, usize)> {
        let declared = self.declared_names(text)?;
        if declared.is_empty() {
            return Ok((text.to_string(), 0));
        }
        let declared: HashSet<String> = declared.into_iter().collect();

        let regions = classify(text, self.grammar.dialect());
        let spans = self.identifier_spans(text, &regions);
        ctx.registry_mut()
            .mark_taken(spans.iter().map(|&(start, end)| &text[start..end]));

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut renamed = 0;
        for (start, end) in spans {
            let name = &text[start..end];
            if !declared.contains(name) || is_member_access(text.as_bytes(), start) {
                continue;
            }
            out.push_str(&text[last..start]);
            out.push_str(&ctx.rename(name));
            last = end;
            renamed += 1;
        }
        out.push_str(&text[last..]);
        Ok((out, renamed))
    }

    /// Rename, add noise, and make sure something changed.
    pub fn transform(&self, text: &str, ctx: &mut TransformContext<'_>) -> ScrambleResult<String> {
        let (renamed_text, renamed) = self.rename(text, ctx)?;
        let dialect = self.grammar.dialect();
        let mut out = NoiseInjector::new(self.noise, dialect).apply(&renamed_text, ctx.rng());

        if out == text {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(dialect.comment_marker());
            out.push(' ');
            out.push_str(&random_string(ctx.rng()));
            out.push('\n');
        }
        tracing::debug!("Shallow pass renamed {} occurrences", renamed);
        Ok(out)
    }
}

fn is_member_access(bytes: &[u8], start: usize) -> bool {
    let before = &bytes[..start];
    let trimmed_len = before
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |p| p + 1);
    let before = &before[..trimmed_len];
    before.ends_with(b".") || before.ends_with(b"->") || before.ends_with(b"::")
}

static C_FAMILY_RESERVED: Lazy<ReservedNameSet> = Lazy::new(|| {
    ReservedNameSet::from_names([
        "auto", "bool", "break", "case", "char", "class", "const", "continue", "default",
        "delete", "do", "double", "else", "enum", "extern", "false", "float", "for", "goto",
        "if", "inline", "int", "long", "namespace", "new", "nullptr", "private", "protected",
        "public", "register", "return", "short", "signed", "sizeof", "static", "struct",
        "switch", "template", "this", "true", "typedef", "typename", "union", "unsigned",
        "using", "virtual", "void", "volatile", "while", "main", "argc", "argv", "std",
        "printf", "scanf", "malloc", "free", "NULL", "size_t", "string", "vector", "cout",
        "cin", "endl",
    ])
});

static JAVASCRIPT_RESERVED: Lazy<ReservedNameSet> = Lazy::new(|| {
    ReservedNameSet::from_names([
        "await", "break", "case", "catch", "class", "const", "continue", "debugger",
        "default", "delete", "do", "else", "enum", "export", "extends", "false", "finally",
        "for", "function", "if", "import", "in", "instanceof", "let", "new", "null", "of",
        "return", "static", "super", "switch", "this", "throw", "true", "try", "typeof",
        "undefined", "var", "void", "while", "with", "yield", "async", "console", "window",
        "document", "module", "require", "exports", "process", "globalThis", "arguments",
        "JSON", "Math", "Object", "Array", "String", "Number", "Promise", "type",
        "interface",
    ])
});

static GO_RESERVED: Lazy<ReservedNameSet> = Lazy::new(|| {
    ReservedNameSet::from_names([
        "break", "case", "chan", "const", "continue", "default", "defer", "else",
        "fallthrough", "for", "func", "go", "goto", "if", "import", "interface", "map",
        "package", "range", "return", "select", "struct", "switch", "type", "var", "main",
        "init", "_", "err", "nil", "true", "false", "iota", "len", "cap", "make", "new",
        "append", "copy", "delete", "panic", "recover", "print", "println", "string", "int",
        "bool", "byte", "rune", "error", "fmt",
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    fn transformer(grammar: ShallowGrammar, noise: &NoiseConfig) -> ShallowTransformer<'_> {
        ShallowTransformer::new(grammar, noise)
    }

    fn context(grammar: ShallowGrammar, seed: u64) -> TransformContext<'static> {
        TransformContext::new(grammar.reserved(), Some(seed))
    }

    #[test]
    fn test_grammar_for_language() {
        assert_eq!(ShallowGrammar::for_language(Language::Cpp), Some(ShallowGrammar::CFamily));
        assert_eq!(
            ShallowGrammar::for_language(Language::TypeScript),
            Some(ShallowGrammar::JavaScript)
        );
        assert_eq!(ShallowGrammar::for_language(Language::Python), None);
        assert_eq!(ShallowGrammar::for_language(Language::Rust), None);
    }

    #[test]
    fn test_c_declarations() {
        let noise = NoiseConfig::disabled();
        let source = "int add(int a, int b) {\n    int total = a + b;\n    char *label = \"total\";\n    return total;\n}\nint main(void) { return add(1, 2); }\n";
        let names = transformer(ShallowGrammar::CFamily, &noise)
            .declared_names(source)
            .unwrap();
        assert_eq!(names, ["a", "b", "total", "label"]);
    }

    #[test]
    fn test_c_rename_skips_strings_and_members() {
        let noise = NoiseConfig::disabled();
        let source = "struct P { int x; };\nint f(struct P *p) {\n    int y = p->x;\n    int z = 2; // z stays in comments\n    return y + z; /* y */\n}\nconst char *s = \"y\";\n";
        let shallow = transformer(ShallowGrammar::CFamily, &noise);
        let mut ctx = context(ShallowGrammar::CFamily, 1);
        let (out, renamed) = shallow.rename(source, &mut ctx).unwrap();

        let y = ctx.registry().get("y").unwrap().to_string();
        let z = ctx.registry().get("z").unwrap().to_string();
        assert!(ctx.registry().get("x").is_none());
        assert!(out.contains(&format!("int {y} = p->x;")));
        assert!(out.contains(&format!("int {z} = 2; // z stays in comments")));
        assert!(out.contains(&format!("return {y} + {z}; /* y */")));
        let s = ctx.registry().get("s").unwrap();
        assert!(out.contains(&format!("const char *{s} = \"y\";")));
        assert_eq!(renamed, 5);
    }

    #[test]
    fn test_javascript_exports_and_properties() {
        let noise = NoiseConfig::disabled();
        let source = "export const api = 1;\nlet count = 0;\nconst $el = document.body;\nfunction tick(obj) {\n    count += obj.count;\n    return `${count} ticks`;\n}\n";
        let shallow = transformer(ShallowGrammar::JavaScript, &noise);
        let names = shallow.declared_names(source).unwrap();
        // `count` is also read as a property, so it keeps its spelling
        assert_eq!(names, ["$el"]);

        let mut ctx = context(ShallowGrammar::JavaScript, 2);
        let (out, renamed) = shallow.rename(source, &mut ctx).unwrap();
        let el = ctx.registry().get("$el").unwrap();
        assert!(out.contains(&format!("const {el} = document.body;")));
        assert!(out.starts_with("export const api = 1;"));
        assert_eq!(renamed, 1);
    }

    #[test]
    fn test_go_declarations() {
        let noise = NoiseConfig::disabled();
        let source = "package main\n\nvar Exported = 1\nvar hidden = 2\n\nfunc main() {\n    a, b := 1, 2\n    msg := \"x := y\"\n    for i := 0; i < a; i++ {\n        hidden += b\n    }\n    fmt.Println(msg)\n}\n";
        let names = transformer(ShallowGrammar::Go, &noise)
            .declared_names(source)
            .unwrap();
        assert_eq!(names, ["hidden", "a", "b", "msg", "i"]);
    }

    #[test]
    fn test_transform_always_differs() {
        let noise = NoiseConfig::disabled();
        let shallow = transformer(ShallowGrammar::CFamily, &noise);
        let source = "#include <stdio.h>\n";
        let mut ctx = context(ShallowGrammar::CFamily, 3);
        let out = shallow.transform(source, &mut ctx).unwrap();
        assert_ne!(out, source);
        assert!(out.starts_with(source));
        assert!(out.lines().last().unwrap().starts_with("// "));

        let mut ctx = context(ShallowGrammar::CFamily, 3);
        assert_ne!(shallow.transform("", &mut ctx).unwrap(), "");
    }

    #[test]
    fn test_transform_with_noise_is_deterministic() {
        let noise = NoiseConfig::default();
        let shallow = transformer(ShallowGrammar::Go, &noise);
        let source = "package main\n\nfunc main() {\n    total := 0\n    total++\n}\n";

        let first = shallow.transform(source, &mut context(ShallowGrammar::Go, 4)).unwrap();
        let second = shallow.transform(source, &mut context(ShallowGrammar::Go, 4)).unwrap();
        assert_eq!(first, second);
        assert!(!first.contains("total"));
        assert!(first.contains("package"));
        assert!(!first.lines().any(|l| l.trim_start().starts_with('#')));
    }
}
