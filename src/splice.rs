//! Sibling insertion into statement lists
//!
//! Rewrites that add statements instead of replacing one node go through
//! here. New nodes are built directly and inserted into the parent's
//! children at the matched index; no text is re-parsed.

use crate::cst::{Node, NodeKind};
use crate::{ScrambleError, ScrambleResult};

/// Insert `nodes` into the statement list `parent` before position `index`.
pub fn splice(parent: &mut Node, index: usize, nodes: Vec<Node>) -> ScrambleResult<()> {
    if !parent.kind.is_statement_list() {
        return Err(ScrambleError::Splice(format!(
            "{} does not hold statements",
            parent.kind.grammar_name()
        )));
    }
    if index > parent.children.len() {
        return Err(ScrambleError::Splice(format!(
            "index {} past end of {} statements",
            index,
            parent.children.len()
        )));
    }
    parent.children.splice(index..index, nodes);
    Ok(())
}

/// Put an `if False: pass` guard right before the conditional at `index`.
///
/// The guard takes over the conditional's leading trivia (blank lines,
/// comments, indentation) and the conditional is left on a fresh line at the
/// same indentation.
pub fn insert_guard_before(parent: &mut Node, index: usize) -> ScrambleResult<()> {
    let target = parent.children.get_mut(index).ok_or_else(|| {
        ScrambleError::Splice(format!("no statement at index {}", index))
    })?;
    if target.kind != NodeKind::ConditionalStatement {
        return Err(ScrambleError::Splice(format!(
            "guard target is {}, not a conditional",
            target.kind.grammar_name()
        )));
    }

    let leading = target.take_leading();
    let newline = line_ending(&leading);
    let indent = indentation(&leading).to_string();
    target.set_leading(format!("{}{}", newline, indent));

    let guard = guard_branch(leading, newline, &indent);
    splice(parent, index, vec![guard])
}

/// `if False:` with a `pass` body one level deeper than `indent`
pub fn guard_branch(leading: String, newline: &str, indent: &str) -> Node {
    let body_indent = format!("{}{}{}", newline, indent, indent_unit(indent));
    let pass = Node::branch(
        NodeKind::Other("pass_statement"),
        vec![Node::punct("pass", body_indent)],
    );
    Node::branch(
        NodeKind::ConditionalStatement,
        vec![
            Node::punct("if", leading),
            Node::leaf(NodeKind::Other("false"), true, " ", "False").with_field(Some("condition")),
            Node::punct(":", ""),
            Node::branch(NodeKind::Block, vec![pass]).with_field(Some("consequence")),
        ],
    )
}

/// Whitespace after the last newline of a trivia run
pub fn indentation(trivia: &str) -> &str {
    let last_line = match trivia.rfind('\n') {
        Some(pos) => &trivia[pos + 1..],
        None => trivia,
    };
    let end = last_line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(last_line.len());
    &last_line[..end]
}

/// Tab-indented code gets tabs, everything else four spaces
pub fn indent_unit(indent: &str) -> &'static str {
    if indent.contains('\t') {
        "\t"
    } else {
        "    "
    }
}

pub fn line_ending(trivia: &str) -> &'static str {
    if trivia.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}
