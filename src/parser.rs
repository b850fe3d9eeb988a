//! Trivia-preserving Python parser
//!
//! Parses with tree-sitter-python and converts the borrowed tree-sitter tree
//! into an owned [`SourceTree`]. Comments and line continuations are grammar
//! extras; they are not kept as nodes but fall into the leading trivia of the
//! following token, so nothing in the input is lost.

use crate::cst::{Node, NodeKind, SourceTree, Token};
use crate::{ScrambleError, ScrambleResult};

/// Python parser backed by tree-sitter
pub struct PythonParser {
    parser: tree_sitter::Parser,
}

impl PythonParser {
    pub fn new() -> ScrambleResult<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ScrambleError::Config(format!("Failed to load Python grammar: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse `source`, rejecting anything tree-sitter had to recover from.
    pub fn parse(&mut self, source: &str) -> ScrambleResult<SourceTree> {
        let tree = self.parser.parse(source, None).ok_or_else(|| ScrambleError::Parse {
            line: 1,
            column: 1,
            message: "parser returned no tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(describe_error(root));
        }

        let mut builder = TreeBuilder { source, offset: 0 };
        let root = builder.convert(root, None).unwrap_or_else(|| {
            Node::branch(NodeKind::ModuleRoot, Vec::new())
        });
        let trailing = source[builder.offset..].to_string();

        Ok(SourceTree { root, trailing })
    }

    /// Whether `source` parses cleanly
    pub fn is_valid(&mut self, source: &str) -> bool {
        self.parse(source).is_ok()
    }
}

/// Parse with a throwaway parser
pub fn parse(source: &str) -> ScrambleResult<SourceTree> {
    PythonParser::new()?.parse(source)
}

struct TreeBuilder<'s> {
    source: &'s str,
    /// End of the last emitted token
    offset: usize,
}

impl TreeBuilder<'_> {
    fn convert(&mut self, node: tree_sitter::Node<'_>, field: Option<&'static str>) -> Option<Node> {
        if node.is_extra() && node.child_count() == 0 {
            return None;
        }

        let kind = if node.is_named() {
            NodeKind::from_grammar(node.kind())
        } else {
            NodeKind::Other(node.kind())
        };

        if node.child_count() == 0 && !kind.is_statement_list() {
            let start = node.start_byte().max(self.offset);
            let end = node.end_byte().max(start);
            let token = Token {
                leading: self.source[self.offset..start].to_string(),
                text: self.source[start..end].to_string(),
            };
            self.offset = end;
            return Some(Node {
                kind,
                field,
                named: node.is_named(),
                token: Some(token),
                children: Vec::new(),
            });
        }

        let mut children = Vec::with_capacity(node.child_count());
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                let child_field = cursor.field_name();
                if let Some(converted) = self.convert(child, child_field) {
                    children.push(converted);
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }

        Some(Node {
            kind,
            field,
            named: node.is_named(),
            token: None,
            children,
        })
    }
}

fn describe_error(root: tree_sitter::Node<'_>) -> ScrambleError {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            let message = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            return ScrambleError::Parse {
                line: pos.row + 1,
                column: pos.column + 1,
                message,
            };
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).filter(|c| c.has_error()).collect();
        // reversed so the leftmost error is examined first
        stack.extend(children.into_iter().rev());
    }
    let pos = root.start_position();
    ScrambleError::Parse {
        line: pos.row + 1,
        column: pos.column + 1,
        message: "invalid syntax".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regen::render;

    const SAMPLE: &str = r#"# leading comment
import os, sys  # trailing

def greet(name: str = "world") -> str:
    """Docstring stays."""
    total = 1 + \
        2
    return f"Hello, {name}! {total!r}"


class Box:
    def __init__(self, value):
        self.value = value  # keep


if __name__ == "__main__":
    print(greet())
"#;

    #[test]
    fn test_roundtrip_is_byte_identical() {
        let tree = parse(SAMPLE).unwrap();
        assert_eq!(render(&tree), SAMPLE);
    }

    #[test]
    fn test_roundtrip_crlf_and_no_final_newline() {
        let source = "x = 1\r\nif x:\r\n    y = 2\r\nprint(y)";
        let tree = parse(source).unwrap();
        assert_eq!(render(&tree), source);
        assert_eq!(tree.line_ending(), "\r\n");
    }

    #[test]
    fn test_empty_and_comment_only() {
        for source in ["", "\n\n", "# only a comment\n"] {
            let tree = parse(source).unwrap();
            assert_eq!(render(&tree), source);
            assert_eq!(tree.root.kind, NodeKind::ModuleRoot);
        }
    }

    #[test]
    fn test_node_kinds() {
        let tree = parse("import a\nif a:\n    f(a + 1)\n").unwrap();
        let kinds: Vec<NodeKind> = tree.root.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::ImportStatement, NodeKind::ConditionalStatement]
        );

        let mut seen = Vec::new();
        tree.root.walk(&mut |n| {
            if matches!(
                n.kind,
                NodeKind::CallExpression | NodeKind::BinaryExpression | NodeKind::Block
            ) {
                seen.push(n.kind);
            }
        });
        assert_eq!(
            seen,
            vec![NodeKind::Block, NodeKind::CallExpression, NodeKind::BinaryExpression]
        );
    }

    #[test]
    fn test_comments_are_trivia() {
        let tree = parse("x = 1  # note\ny = 2\n").unwrap();
        let mut comment_nodes = 0;
        tree.root.walk(&mut |n| {
            if n.kind == NodeKind::Other("comment") {
                comment_nodes += 1;
            }
        });
        assert_eq!(comment_nodes, 0);
        let second = &tree.root.children[1];
        assert_eq!(second.leading(), "  # note\n");
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse("x = 1\ndef (:\n").unwrap_err();
        match err {
            ScrambleError::Parse { line, column, .. } => {
                assert!((1..=2).contains(&line));
                assert!(column >= 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reused_parser() {
        let mut parser = PythonParser::new().unwrap();
        assert!(parser.is_valid("a = 1\n"));
        assert!(!parser.is_valid("a = (1\n"));
        assert!(parser.is_valid("b = 2\n"));
    }
}
