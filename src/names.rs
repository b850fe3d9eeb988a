//! Reserved names and the per-run rename registry

use once_cell::sync::Lazy;
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Name of the inert function the module-root rule appends
pub const DUMMY_FUNCTION_NAME: &str = "dummy_function";

/// Python reserved names, built once and shared by every run
pub static PYTHON_RESERVED: Lazy<ReservedNameSet> = Lazy::new(|| {
    let mut set = ReservedNameSet::from_names(PYTHON_BUILTINS.iter().copied());
    set.insert(DUMMY_FUNCTION_NAME);
    set
});

/// Identifiers that must never be renamed
#[derive(Debug, Clone, Default)]
pub struct ReservedNameSet {
    names: HashSet<&'static str>,
}

impl ReservedNameSet {
    pub fn from_names(names: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    fn insert(&mut self, name: &'static str) {
        self.names.insert(name);
    }

    /// Listed names plus anything double-underscore prefixed
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name) || is_dunder_style(name)
    }
}

/// `__init__`, `__name__`, `__private` and friends
pub fn is_dunder_style(name: &str) -> bool {
    name.starts_with("__")
}

/// ASCII identifier check used for config values and shallow matching
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Random 7-10 character stem starting with a lowercase letter, plus `_NNN`.
pub fn random_string<R: Rng + ?Sized>(rng: &mut R) -> String {
    const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    const ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    let length = rng.gen_range(7..=10);
    let mut out = String::with_capacity(length + 4);
    out.push(LOWER[rng.gen_range(0..LOWER.len())] as char);
    for _ in 1..length {
        out.push(ALNUM[rng.gen_range(0..ALNUM.len())] as char);
    }
    out.push('_');
    out.push_str(&rng.gen_range(100..=999).to_string());
    out
}

fn name_suffix(original: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    original.hash(&mut hasher);
    hasher.finish() % 1000
}

/// Per-run mapping from original identifier spelling to obfuscated spelling.
///
/// Same original always yields the same replacement; two originals never
/// share one. A freshly generated candidate that clashes with an issued name,
/// a name already present in the source, or a reserved name is re-rolled.
#[derive(Debug)]
pub struct RenameRegistry<'a> {
    reserved: &'a ReservedNameSet,
    /// Names this run must keep (imports, class members, ...)
    preserved: HashSet<String>,
    /// Spellings already used by the source
    taken: HashSet<String>,
    name_map: HashMap<String, String>,
    issued: HashSet<String>,
    rerolls: usize,
}

impl<'a> RenameRegistry<'a> {
    pub fn new(reserved: &'a ReservedNameSet) -> Self {
        Self {
            reserved,
            preserved: HashSet::new(),
            taken: HashSet::new(),
            name_map: HashMap::new(),
            issued: HashSet::new(),
            rerolls: 0,
        }
    }

    /// Add names to preserve
    pub fn preserve(&mut self, names: impl IntoIterator<Item = impl Into<String>>) {
        for name in names {
            self.preserved.insert(name.into());
        }
    }

    /// Mark spellings that generated names must avoid
    pub fn mark_taken(&mut self, names: impl IntoIterator<Item = impl Into<String>>) {
        for name in names {
            self.taken.insert(name.into());
        }
    }

    pub fn reserved(&self) -> &'a ReservedNameSet {
        self.reserved
    }

    /// Check if a name should be renamed
    pub fn should_rename(&self, name: &str) -> bool {
        !self.reserved.contains(name) && !self.preserved.contains(name)
    }

    /// Get or create the obfuscated spelling for `original`
    pub fn resolve<R: Rng + ?Sized>(&mut self, original: &str, rng: &mut R) -> String {
        self.resolve_with(original, |name| {
            format!("{}{}", random_string(&mut *rng), name_suffix(name))
        })
    }

    pub(crate) fn resolve_with(
        &mut self,
        original: &str,
        mut generate: impl FnMut(&str) -> String,
    ) -> String {
        if !self.should_rename(original) {
            return original.to_string();
        }
        if let Some(existing) = self.name_map.get(original) {
            return existing.clone();
        }

        let mut candidate = generate(original);
        while self.is_unavailable(&candidate) {
            self.rerolls += 1;
            tracing::debug!("Rename collision on {}, regenerating", candidate);
            candidate = generate(original);
        }

        self.issued.insert(candidate.clone());
        self.name_map.insert(original.to_string(), candidate.clone());
        candidate
    }

    fn is_unavailable(&self, candidate: &str) -> bool {
        self.issued.contains(candidate)
            || self.taken.contains(candidate)
            || self.reserved.contains(candidate)
    }

    /// Get the name mapping
    pub fn mapping(&self) -> &HashMap<String, String> {
        &self.name_map
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.name_map.get(original).map(String::as_str)
    }

    /// How many generated names were discarded because of collisions
    pub fn rerolls(&self) -> usize {
        self.rerolls
    }
}

/// Python built-in names that should not be renamed
const PYTHON_BUILTINS: &[&str] = &[
    // Built-in functions
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint",
    "bytearray", "bytes", "callable", "chr", "classmethod", "compile", "complex",
    "copyright", "credits", "delattr", "dict", "dir", "divmod", "enumerate",
    "eval", "exec", "exit", "filter", "float", "format", "frozenset", "getattr",
    "globals", "hasattr", "hash", "help", "hex", "id", "input", "int",
    "isinstance", "issubclass", "iter", "len", "license", "list", "locals",
    "map", "max", "memoryview", "min", "next", "object", "oct", "open", "ord",
    "pow", "print", "property", "quit", "range", "repr", "reversed", "round",
    "set", "setattr", "slice", "sorted", "staticmethod", "str", "sum", "super",
    "tuple", "type", "vars", "zip",
    // Built-in constants
    "True", "False", "None", "Ellipsis", "NotImplemented",
    // Built-in exceptions and warnings
    "ArithmeticError", "AssertionError", "AttributeError", "BaseException",
    "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError", "BufferError",
    "BytesWarning", "ChildProcessError", "ConnectionAbortedError",
    "ConnectionError", "ConnectionRefusedError", "ConnectionResetError",
    "DeprecationWarning", "EOFError", "EncodingWarning", "EnvironmentError",
    "Exception", "ExceptionGroup", "FileExistsError", "FileNotFoundError",
    "FloatingPointError", "FutureWarning", "GeneratorExit", "IOError",
    "ImportError", "ImportWarning", "IndentationError", "IndexError",
    "InterruptedError", "IsADirectoryError", "KeyError", "KeyboardInterrupt",
    "LookupError", "MemoryError", "ModuleNotFoundError", "NameError",
    "NotADirectoryError", "NotImplementedError", "OSError", "OverflowError",
    "PendingDeprecationWarning", "PermissionError", "ProcessLookupError",
    "RecursionError", "ReferenceError", "ResourceWarning", "RuntimeError",
    "RuntimeWarning", "StopAsyncIteration", "StopIteration", "SyntaxError",
    "SyntaxWarning", "SystemError", "SystemExit", "TabError", "TimeoutError",
    "TypeError", "UnboundLocalError", "UnicodeDecodeError", "UnicodeEncodeError",
    "UnicodeError", "UnicodeTranslateError", "UnicodeWarning", "UserWarning",
    "ValueError", "Warning", "ZeroDivisionError",
    // Conventional names
    "self", "cls", "args", "kwargs",
    // Soft keywords
    "_", "match", "case",
];
