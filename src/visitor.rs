//! Bottom-up rewrite rules over the owned syntax tree
//!
//! Children are rewritten before their parent, so a parent rule sees the
//! renamed spellings of everything below it. Dispatch is a single match over
//! [`NodeKind`].

use crate::analysis::NameAnalysis;
use crate::config::RuleSet;
use crate::context::TransformContext;
use crate::cst::{Node, NodeKind, SourceTree};
use crate::names::DUMMY_FUNCTION_NAME;
use crate::splice::insert_guard_before;
use crate::ScrambleResult;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Counts of what one rewrite changed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    /// Identifier occurrences whose spelling changed
    pub renamed: usize,
    /// Expression statements wrapped in parentheses
    pub wrapped: usize,
    /// `if False` guards inserted
    pub guards: usize,
    /// Decoy module names appended to imports
    pub decoys: usize,
    /// Dummy functions appended (0 or 1)
    pub dummy_functions: usize,
}

/// Where an identifier sits, as seen from its ancestors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Ordinary reference or binding
    Free,
    /// `attr` in `obj.attr`
    AttributeName,
    /// Module path or imported name
    ImportPath,
}

/// Operand kinds for which `+ 0` is a type error
const NON_NUMERIC_OPERANDS: &[&str] = &[
    "string",
    "concatenated_string",
    "list",
    "tuple",
    "dictionary",
    "set",
    "list_comprehension",
    "dictionary_comprehension",
    "set_comprehension",
    "generator_expression",
];

pub struct NodeVisitor<'c, 'r> {
    ctx: &'c mut TransformContext<'r>,
    rules: &'c RuleSet,
    decoy_pool: &'c [String],
    existing: HashSet<String>,
    has_dummy_function: bool,
    stats: RewriteStats,
}

impl<'c, 'r> NodeVisitor<'c, 'r> {
    /// Prime the context's registry with what the pre-pass found.
    pub fn new(
        ctx: &'c mut TransformContext<'r>,
        rules: &'c RuleSet,
        decoy_pool: &'c [String],
        analysis: NameAnalysis,
    ) -> Self {
        let registry = ctx.registry_mut();
        registry.preserve(analysis.preserved);
        registry.mark_taken(analysis.existing.iter().cloned());

        Self {
            ctx,
            rules,
            decoy_pool,
            existing: analysis.existing,
            has_dummy_function: analysis.has_dummy_function,
            stats: RewriteStats::default(),
        }
    }

    /// Apply every enabled rule to `tree` in place.
    pub fn rewrite(mut self, tree: &mut SourceTree) -> ScrambleResult<RewriteStats> {
        self.visit(&mut tree.root, Position::Free)?;
        if self.rules.dummy_function && !self.has_dummy_function {
            append_dummy_function(tree);
            self.stats.dummy_functions += 1;
        }
        Ok(self.stats)
    }

    fn visit(&mut self, node: &mut Node, position: Position) -> ScrambleResult<()> {
        let kind = node.kind;
        for child in node.children.iter_mut() {
            let child_position = position_of(kind, child.field, position);
            self.visit(child, child_position)?;
        }
        self.leave(node, position)
    }

    fn leave(&mut self, node: &mut Node, position: Position) -> ScrambleResult<()> {
        match node.kind {
            NodeKind::Identifier => {
                if self.rules.rename && position == Position::Free {
                    self.rename_identifier(node);
                }
            }
            NodeKind::ExpressionStatement => {
                if self.rules.wrap_expressions {
                    self.wrap_expression(node);
                }
            }
            NodeKind::ImportStatement => {
                if self.rules.decoy_imports {
                    self.add_decoy_imports(node);
                }
            }
            NodeKind::ModuleRoot | NodeKind::Block => {
                if self.rules.guard_conditionals {
                    self.guard_conditionals(node)?;
                }
            }
            NodeKind::BinaryExpression
            | NodeKind::CallExpression
            | NodeKind::ConditionalStatement
            | NodeKind::ImportFromStatement
            | NodeKind::FunctionDefinition
            | NodeKind::ClassDefinition
            | NodeKind::Attribute
            | NodeKind::KeywordArgument
            | NodeKind::Assignment
            | NodeKind::Parenthesized
            | NodeKind::Other(_) => {}
        }
        Ok(())
    }

    fn rename_identifier(&mut self, node: &mut Node) {
        let Some(original) = node.token.as_ref().map(|tok| tok.text.clone()) else {
            return;
        };
        let renamed = self.ctx.rename(&original);
        if renamed != original {
            if let Some(tok) = node.token.as_mut() {
                tok.text = renamed;
            }
            self.stats.renamed += 1;
        }
    }

    /// `a + b` becomes `(a + b) + 0`, `helper(x)` becomes `(helper(x))`.
    fn wrap_expression(&mut self, statement: &mut Node) {
        let mut named = statement.children.iter().enumerate().filter(|(_, c)| c.named);
        let index = match (named.next(), named.next()) {
            (Some((index, _)), None) => index,
            _ => return,
        };

        let expression = &mut statement.children[index];
        let field = expression.field;
        let wrapped = match expression.kind {
            NodeKind::BinaryExpression if !has_non_numeric_operand(expression) => {
                let inner = parenthesize(expression);
                Node::branch(
                    NodeKind::BinaryExpression,
                    vec![
                        inner.with_field(Some("left")),
                        Node::punct("+", " ").with_field(Some("operator")),
                        Node::leaf(NodeKind::Other("integer"), true, " ", "0")
                            .with_field(Some("right")),
                    ],
                )
            }
            NodeKind::CallExpression if self.calls_user_function(expression) => {
                parenthesize(expression)
            }
            _ => return,
        };
        *expression = wrapped.with_field(field);
        self.stats.wrapped += 1;
    }

    fn calls_user_function(&self, call: &Node) -> bool {
        call.child_by_field("function").is_some_and(|callee| {
            callee.kind == NodeKind::Identifier
                && !self.ctx.registry().reserved().contains(&callee.text())
        })
    }

    /// Append 1-3 pool names to `import a, b` that the file never mentions.
    fn add_decoy_imports(&mut self, import: &mut Node) {
        let mut present = HashSet::new();
        import.walk(&mut |n| {
            if n.kind == NodeKind::Identifier {
                present.insert(n.text());
            }
        });

        let pool = self.decoy_pool;
        let candidates: Vec<&String> = pool
            .iter()
            .filter(|name| !present.contains(*name) && !self.existing.contains(*name))
            .collect();
        if candidates.is_empty() {
            return;
        }

        let rng = self.ctx.rng();
        let count = rng.gen_range(1..=3).min(candidates.len());
        for name in candidates.choose_multiple(rng, count) {
            import.children.push(Node::punct(",", ""));
            import.children.push(
                Node::branch(
                    NodeKind::Other("dotted_name"),
                    vec![Node::leaf(NodeKind::Identifier, true, " ", name.as_str())],
                )
                .with_field(Some("name")),
            );
            self.stats.decoys += 1;
        }
    }

    fn guard_conditionals(&mut self, statements: &mut Node) -> ScrambleResult<()> {
        let mut index = 0;
        while index < statements.children.len() {
            if statements.children[index].kind == NodeKind::ConditionalStatement {
                insert_guard_before(statements, index)?;
                self.stats.guards += 1;
                // skip the guard and the conditional it precedes
                index += 2;
            } else {
                index += 1;
            }
        }
        Ok(())
    }
}

fn position_of(parent: NodeKind, field: Option<&'static str>, inherited: Position) -> Position {
    match (parent, field) {
        (NodeKind::Attribute, Some("attribute")) => Position::AttributeName,
        (NodeKind::ImportStatement, Some("name"))
        | (NodeKind::ImportFromStatement, Some("name" | "module_name"))
        | (NodeKind::Other("future_import_statement"), Some("name")) => Position::ImportPath,
        (NodeKind::Other("aliased_import"), Some("alias")) => Position::Free,
        (NodeKind::Attribute, _) => Position::Free,
        _ => inherited,
    }
}

fn has_non_numeric_operand(expression: &Node) -> bool {
    ["left", "right"].iter().any(|field| {
        expression
            .child_by_field(field)
            .is_some_and(|operand| match operand.kind {
                NodeKind::BinaryExpression | NodeKind::Parenthesized => {
                    has_non_numeric_operand(operand)
                        || operand
                            .named_children()
                            .any(|c| NON_NUMERIC_OPERANDS.contains(&c.kind.grammar_name()))
                }
                kind => NON_NUMERIC_OPERANDS.contains(&kind.grammar_name()),
            })
    })
}

/// Replace `node` with `(node)`, moving its leading trivia onto the `(`.
fn parenthesize(node: &mut Node) -> Node {
    let leading = node.take_leading();
    let inner = std::mem::replace(node, Node::branch(NodeKind::Other("placeholder"), Vec::new()));
    Node::branch(
        NodeKind::Parenthesized,
        vec![
            Node::punct("(", leading),
            inner.with_field(None),
            Node::punct(")", ""),
        ],
    )
}

/// `def dummy_function(): pass` after everything else in the module
fn append_dummy_function(tree: &mut SourceTree) {
    let newline = tree.line_ending();
    let has_statements = !tree.root.children.is_empty();

    let mut leading = std::mem::take(&mut tree.trailing);
    if (has_statements || !leading.is_empty()) && !leading.ends_with('\n') {
        leading.push_str(newline);
    }
    if has_statements {
        leading.push_str(newline);
    }

    let body = Node::branch(
        NodeKind::Block,
        vec![Node::branch(
            NodeKind::Other("pass_statement"),
            vec![Node::punct("pass", format!("{}    ", newline))],
        )],
    );
    tree.root.children.push(Node::branch(
        NodeKind::FunctionDefinition,
        vec![
            Node::punct("def", leading),
            Node::leaf(NodeKind::Identifier, true, " ", DUMMY_FUNCTION_NAME)
                .with_field(Some("name")),
            Node::branch(
                NodeKind::Other("parameters"),
                vec![Node::punct("(", ""), Node::punct(")", "")],
            )
            .with_field(Some("parameters")),
            Node::punct(":", ""),
            body.with_field(Some("body")),
        ],
    ));
    tree.trailing = newline.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrambleConfig;
    use crate::parser::parse;
    use crate::regen::render;
    use std::collections::HashMap;

    struct Outcome {
        text: String,
        stats: RewriteStats,
        mapping: HashMap<String, String>,
    }

    fn rewrite(source: &str, rules: RuleSet, seed: u64) -> Outcome {
        let mut tree = parse(source).unwrap();
        let analysis = NameAnalysis::of(&tree);
        let mut ctx = TransformContext::python(Some(seed));
        let pool = ScrambleConfig::default().decoy_imports;
        let stats = NodeVisitor::new(&mut ctx, &rules, &pool, analysis)
            .rewrite(&mut tree)
            .unwrap();
        Outcome {
            text: render(&tree),
            stats,
            mapping: ctx.registry().mapping().clone(),
        }
    }

    fn only(configure: impl FnOnce(&mut RuleSet)) -> RuleSet {
        let mut rules = RuleSet::none();
        configure(&mut rules);
        rules
    }

    #[test]
    fn test_builtin_call_survives() {
        let source = "print('Hello, world!')\n";
        let out = rewrite(source, RuleSet::default(), 1);
        assert_ne!(out.text, source);
        assert!(out.text.contains("print('Hello, world!')"));
        assert!(parse(&out.text).is_ok());
    }

    #[test]
    fn test_import_gains_decoys() {
        let out = rewrite("import a, b\n", only(|r| r.decoy_imports = true), 2);
        let tree = parse(&out.text).unwrap();
        let import = &tree.root.children[0];
        let names: Vec<String> = import.children_by_field("name").map(|n| n.text()).collect();

        assert_eq!(&names[..2], ["a", "b"]);
        let extra = &names[2..];
        assert!((1..=3).contains(&extra.len()), "got {:?}", names);
        let distinct: HashSet<&String> = extra.iter().collect();
        assert_eq!(distinct.len(), extra.len());
        assert!(extra.iter().all(|n| n != "a" && n != "b"));
        assert_eq!(out.stats.decoys, extra.len());
    }

    #[test]
    fn test_decoys_skip_names_in_use() {
        let source = "import os\nvalue = math.pi + sys.maxsize\n";
        for seed in 0..20 {
            let out = rewrite(source, only(|r| r.decoy_imports = true), seed);
            let import_line = out.text.lines().next().unwrap();
            assert!(import_line.starts_with("import os, "));
            assert!(!import_line.contains("math"));
            assert!(!import_line.contains("sys"));
            assert_eq!(import_line.matches("os").count(), 1);
        }
    }

    #[test]
    fn test_guard_before_conditional() {
        let source = "def check(x):\n    if x > 0:\n        return x\n";
        let out = rewrite(source, RuleSet::default(), 3);
        let x = &out.mapping["x"];
        let check = &out.mapping["check"];

        let expected = format!(
            "def {check}({x}):\n    if False:\n        pass\n    if {x} > 0:\n        return {x}\n"
        );
        assert!(out.text.starts_with(&expected), "got:\n{}", out.text);
        assert_eq!(out.stats.guards, 1);
        assert!(parse(&out.text).is_ok());
    }

    #[test]
    fn test_guards_only_at_statement_level() {
        let source = "if a:\n    if b:\n        pass\nelif c:\n    pass\nelse:\n    pass\n";
        let out = rewrite(source, only(|r| r.guard_conditionals = true), 4);
        assert_eq!(out.stats.guards, 2);
        assert_eq!(out.text.matches("if False:").count(), 2);
        assert!(out.text.contains("\nelif c:\n    pass\nelse:\n    pass\n"));
        assert!(parse(&out.text).is_ok());
    }

    #[test]
    fn test_wrap_expressions() {
        let source = "total = 1\ntotal + 2\nhelper(total)\n'a' + 'b'\nobj.run()\nlen(total)\n";
        let out = rewrite(source, only(|r| r.wrap_expressions = true), 5);
        assert_eq!(
            out.text,
            "total = 1\n(total + 2) + 0\n(helper(total))\n'a' + 'b'\nobj.run()\nlen(total)\n"
        );
        assert_eq!(out.stats.wrapped, 2);
        assert!(parse(&out.text).is_ok());
    }

    #[test]
    fn test_attributes_and_imports_keep_spelling() {
        let source = r#"import os.path
from json import loads as parse_json

value = os.path.join('a', 'b')
result = parse_json(value)

class Box:
    size = 1

    def grow(self, amount):
        self.size += amount
        return self.size
"#;
        let out = rewrite(source, only(|r| r.rename = true), 6);

        assert!(out.text.starts_with("import os.path\nfrom json import loads as "));
        assert!(out.text.contains(" = os.path.join('a', 'b')"));
        assert!(out.text.contains("    size = 1\n"));
        assert!(out.text.contains("self.size += "));
        assert!(out.text.contains("def grow(self, "));

        for renamed in ["value", "result", "parse_json", "Box", "amount"] {
            assert!(out.mapping.contains_key(renamed), "{renamed} should be renamed");
        }
        for kept in ["os", "path", "json", "loads", "join", "size", "grow", "self"] {
            assert!(!out.mapping.contains_key(kept), "{kept} should keep its spelling");
        }
        assert!(parse(&out.text).is_ok());
    }

    #[test]
    fn test_rename_consistent_across_uses() {
        let source = "def scale(count):\n    count = count * 2\n    return count\n\nscale(3)\n";
        let out = rewrite(source, only(|r| r.rename = true), 7);
        let count = &out.mapping["count"];
        let scale = &out.mapping["scale"];

        assert_eq!(out.text.matches(count.as_str()).count(), 4);
        assert_eq!(out.text.matches(scale.as_str()).count(), 2);
        assert!(!out.text.contains("count"));
        assert_eq!(out.stats.renamed, 6);
    }

    #[test]
    fn test_class_pattern_keywords_keep_spelling() {
        let source = "class P:\n    def __init__(self, x):\n        self.x = x\n\nmatch P(0):\n    case P(x=0):\n        print('hit')\n";
        let out = rewrite(source, only(|r| r.rename = true), 4);
        assert!(out.mapping.contains_key("P"));
        assert!(!out.mapping.contains_key("x"));
        let renamed = &out.mapping["P"];
        assert!(out.text.contains(&format!("case {}(x=0):", renamed)));
        assert!(parse(&out.text).is_ok());
    }

    #[test]
    fn test_star_import_names_keep_spelling() {
        let source = "from math import *\n\nvalue = 16\nprint(sqrt(value))\n";
        let out = rewrite(source, only(|r| r.rename = true), 2);
        assert!(out.text.contains("sqrt("));
        assert!(out.mapping.contains_key("value"));
        assert!(!out.text.contains("value"));
    }

    #[test]
    fn test_dummy_function() {
        let rules = only(|r| r.dummy_function = true);
        assert_eq!(
            rewrite("x = 1\n", rules, 8).text,
            "x = 1\n\ndef dummy_function():\n    pass\n"
        );
        assert_eq!(
            rewrite("x = 1", rules, 8).text,
            "x = 1\n\ndef dummy_function():\n    pass\n"
        );
        assert_eq!(rewrite("", rules, 8).text, "def dummy_function():\n    pass\n");

        let existing = "def dummy_function():\n    pass\n";
        let out = rewrite(existing, rules, 8);
        assert_eq!(out.text, existing);
        assert_eq!(out.stats.dummy_functions, 0);
    }

    #[test]
    fn test_same_seed_same_output() {
        let source = "import sys\n\ndef main(argv):\n    total = 0\n    for arg in argv:\n        if arg:\n            total = total + len(arg)\n    total + 1\n    return total\n";
        let first = rewrite(source, RuleSet::default(), 42);
        let second = rewrite(source, RuleSet::default(), 42);
        let other = rewrite(source, RuleSet::default(), 43);

        assert_eq!(first.text, second.text);
        assert_ne!(first.text, other.text);
        assert!(parse(&first.text).is_ok());
    }
}
