//! Code regeneration from a [`SourceTree`]

use crate::cst::{Node, SourceTree};
use crate::parser::PythonParser;
use crate::ScrambleResult;

/// Serialize the tree back to text. Never fails.
pub fn render(tree: &SourceTree) -> String {
    let mut out = render_node(&tree.root);
    out.push_str(&tree.trailing);
    out
}

/// Serialize a single subtree, including its leading trivia.
pub fn render_node(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    if let Some(tok) = &node.token {
        out.push_str(&tok.leading);
        out.push_str(&tok.text);
    }
    for child in &node.children {
        write_node(child, out);
    }
}

/// Render and confirm the text parses again.
///
/// A failure here means a rewrite rule produced an illegal tree.
pub fn regenerate(tree: &SourceTree, parser: &mut PythonParser) -> ScrambleResult<String> {
    let text = render(tree);
    if let Err(e) = parser.parse(&text) {
        tracing::error!("Regenerated source no longer parses: {}", e);
        return Err(e);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::{NodeKind, Token};

    #[test]
    fn test_render_tree() {
        let tree = SourceTree {
            root: Node::branch(
                NodeKind::ModuleRoot,
                vec![Node::branch(
                    NodeKind::ExpressionStatement,
                    vec![Node::leaf(NodeKind::Identifier, true, "", "x")],
                )],
            ),
            trailing: "\n".to_string(),
        };
        assert_eq!(render(&tree), "x\n");
        assert_eq!(render_node(&tree.root.children[0]), "x");
    }

    #[test]
    fn test_regenerate_checks_output() {
        let mut parser = PythonParser::new().unwrap();
        let mut tree = parser.parse("value = 1\n").unwrap();
        assert_eq!(regenerate(&tree, &mut parser).unwrap(), "value = 1\n");

        // an assignment with an empty right side
        if let Some(tok) = find_token(&mut tree.root, "1") {
            *tok = Token {
                leading: " ".to_string(),
                text: String::new(),
            };
        }
        assert!(regenerate(&tree, &mut parser).is_err());
    }

    fn find_token<'n>(node: &'n mut Node, text: &str) -> Option<&'n mut Token> {
        if node.token.as_ref().is_some_and(|t| t.text == text) {
            return node.token.as_mut();
        }
        node.children.iter_mut().find_map(|c| find_token(c, text))
    }
}
