//! Pre-pass collecting names that must keep their spelling
//!
//! Renaming is spelling-based, so a name that has to survive in one position
//! (an imported module, a method looked up as `obj.method`, a keyword
//! argument matched against a foreign signature) is kept everywhere.

use crate::cst::{Node, NodeKind, SourceTree};
use crate::names::DUMMY_FUNCTION_NAME;
use std::collections::HashSet;

/// What the pre-pass learned about a module
#[derive(Debug, Default, Clone)]
pub struct NameAnalysis {
    /// Names the registry must not rename
    pub preserved: HashSet<String>,
    /// Every identifier spelling present in the source
    pub existing: HashSet<String>,
    /// A function named `dummy_function` is already defined
    pub has_dummy_function: bool,
    /// The module contains `from m import *`
    pub has_wildcard_import: bool,
    /// Spellings the module binds itself
    bound: HashSet<String>,
}

impl NameAnalysis {
    pub fn of(tree: &SourceTree) -> Self {
        let mut analysis = Self::default();
        analysis.visit(&tree.root);

        // Anything used but never bound may come from a star import
        if analysis.has_wildcard_import {
            let unbound: Vec<String> = analysis
                .existing
                .difference(&analysis.bound)
                .cloned()
                .collect();
            analysis.preserved.extend(unbound);
        }
        analysis
    }

    fn visit(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Identifier => {
                if let Some(tok) = &node.token {
                    self.existing.insert(tok.text.clone());
                }
            }
            NodeKind::ImportStatement => {
                for name in node.children_by_field("name") {
                    self.preserve_import_path(name);
                    self.bind_alias(name);
                }
            }
            NodeKind::ImportFromStatement => {
                for name in node.children_by_field("name") {
                    self.preserve_import_path(name);
                    self.bind_alias(name);
                }
                if let Some(module) = node.child_by_field("module_name") {
                    self.preserve_import_path(module);
                }
                if node
                    .children
                    .iter()
                    .any(|c| c.kind == NodeKind::Other("wildcard_import"))
                {
                    self.has_wildcard_import = true;
                }
            }
            NodeKind::ClassDefinition => {
                self.bind_field(node, "name");
                if let Some(body) = node.child_by_field("body") {
                    for statement in &body.children {
                        self.preserve_class_member(statement);
                    }
                }
            }
            NodeKind::KeywordArgument => {
                if let Some(name) = node.child_by_field("name") {
                    self.preserved.insert(name.text());
                }
            }
            NodeKind::FunctionDefinition => {
                if node
                    .child_by_field("name")
                    .is_some_and(|n| n.text() == DUMMY_FUNCTION_NAME)
                {
                    self.has_dummy_function = true;
                }
                self.bind_field(node, "name");
                if let Some(parameters) = node.child_by_field("parameters") {
                    self.bind_parameters(parameters);
                }
            }
            NodeKind::Assignment => {
                self.bind_field(node, "left");
                self.preserve_exports(node);
            }
            // `case Point(x=0)` matches against the attribute `x`
            NodeKind::Other("keyword_pattern") => {
                if let Some(key) = node.named_children().next() {
                    if key.kind == NodeKind::Identifier {
                        self.preserved.insert(key.text());
                    }
                }
            }
            NodeKind::Other("augmented_assignment")
            | NodeKind::Other("for_statement")
            | NodeKind::Other("for_in_clause") => self.bind_field(node, "left"),
            NodeKind::Other("named_expression") => self.bind_field(node, "name"),
            NodeKind::Other("as_pattern") | NodeKind::Other("except_clause") => {
                self.bind_field(node, "alias")
            }
            NodeKind::Other("lambda") => {
                if let Some(parameters) = node.child_by_field("parameters") {
                    self.bind_parameters(parameters);
                }
            }
            NodeKind::Other("global_statement") | NodeKind::Other("nonlocal_statement") => {
                for name in node.named_children() {
                    collect_target_names(name, &mut self.bound);
                }
            }
            NodeKind::ModuleRoot
            | NodeKind::Block
            | NodeKind::BinaryExpression
            | NodeKind::CallExpression
            | NodeKind::ExpressionStatement
            | NodeKind::ConditionalStatement
            | NodeKind::Attribute
            | NodeKind::Parenthesized
            | NodeKind::Other(_) => {}
        }

        for child in &node.children {
            self.visit(child);
        }
    }

    fn bind_field(&mut self, node: &Node, field: &str) {
        if let Some(target) = node.child_by_field(field) {
            collect_target_names(target, &mut self.bound);
        }
    }

    fn bind_alias(&mut self, name: &Node) {
        if name.kind == NodeKind::Other("aliased_import") {
            self.bind_field(name, "alias");
        }
    }

    /// Parameter names only; defaults and annotations are references.
    fn bind_parameters(&mut self, parameters: &Node) {
        for parameter in parameters.named_children() {
            match parameter.kind {
                NodeKind::Other("default_parameter") | NodeKind::Other("typed_default_parameter") => {
                    self.bind_field(parameter, "name")
                }
                NodeKind::Other("typed_parameter") => {
                    for child in parameter.named_children().filter(|c| c.field.is_none()) {
                        collect_target_names(child, &mut self.bound);
                    }
                }
                _ => collect_target_names(parameter, &mut self.bound),
            }
        }
    }

    /// Module paths and imported names; an `as` alias stays renameable.
    fn preserve_import_path(&mut self, node: &Node) {
        let path = match node.kind {
            NodeKind::Other("aliased_import") => match node.child_by_field("name") {
                Some(name) => name,
                None => return,
            },
            _ => node,
        };
        path.walk(&mut |n| {
            if n.kind == NodeKind::Identifier {
                self.preserved.insert(n.text());
            }
        });
    }

    /// Methods, nested classes and class-level attributes are reachable via
    /// attribute access, which is never renamed.
    fn preserve_class_member(&mut self, statement: &Node) {
        match statement.kind {
            NodeKind::FunctionDefinition | NodeKind::ClassDefinition => {
                if let Some(name) = statement.child_by_field("name") {
                    self.preserved.insert(name.text());
                }
            }
            NodeKind::Other("decorated_definition") => {
                if let Some(definition) = statement.child_by_field("definition") {
                    self.preserve_class_member(definition);
                }
            }
            NodeKind::ExpressionStatement => {
                for assignment in statement
                    .children
                    .iter()
                    .filter(|c| c.kind == NodeKind::Assignment)
                {
                    self.preserve_assignment_targets(assignment);
                }
            }
            _ => {}
        }
    }

    fn preserve_assignment_targets(&mut self, assignment: &Node) {
        if let Some(left) = assignment.child_by_field("left") {
            collect_target_names(left, &mut self.preserved);
        }
        // chained `a = b = 1` nests the next assignment on the right
        if let Some(right) = assignment.child_by_field("right") {
            if right.kind == NodeKind::Assignment {
                self.preserve_assignment_targets(right);
            }
        }
    }

    /// `__all__ = ["a", "b"]` keeps `a` and `b`
    fn preserve_exports(&mut self, assignment: &Node) {
        let is_all = assignment
            .child_by_field("left")
            .is_some_and(|left| left.kind == NodeKind::Identifier && left.text() == "__all__");
        if !is_all {
            return;
        }
        if let Some(right) = assignment.child_by_field("right") {
            right.walk(&mut |n| {
                if n.kind == NodeKind::Other("string_content") {
                    self.preserved.insert(n.text());
                }
            });
        }
    }
}

fn collect_target_names(target: &Node, out: &mut HashSet<String>) {
    match target.kind {
        NodeKind::Identifier => {
            out.insert(target.text());
        }
        NodeKind::Parenthesized
        | NodeKind::Other("pattern_list")
        | NodeKind::Other("tuple_pattern")
        | NodeKind::Other("list_pattern")
        | NodeKind::Other("list_splat_pattern")
        | NodeKind::Other("dictionary_splat_pattern")
        | NodeKind::Other("as_pattern_target") => {
            for child in target.named_children() {
                collect_target_names(child, out);
            }
        }
        _ => {}
    }
}
