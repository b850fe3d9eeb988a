//! Owned concrete syntax tree with attached trivia
//!
//! Every leaf carries its token text plus the exact source bytes that
//! preceded it (whitespace, newlines, comments, line continuations). Bytes
//! after the last token live in [`SourceTree::trailing`]. Concatenating
//! `leading + text` over all leaves in order, then `trailing`, reproduces the
//! input byte for byte.

/// Node kinds the rewrite rules dispatch on.
///
/// Grammar kinds with no rule of their own are carried as `Other` with the
/// grammar's kind name so they still re-serialize untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    ModuleRoot,
    Block,
    Identifier,
    BinaryExpression,
    CallExpression,
    ExpressionStatement,
    ConditionalStatement,
    ImportStatement,
    ImportFromStatement,
    FunctionDefinition,
    ClassDefinition,
    Attribute,
    KeywordArgument,
    Assignment,
    Parenthesized,
    Other(&'static str),
}

impl NodeKind {
    /// Map a named tree-sitter-python kind.
    pub fn from_grammar(kind: &'static str) -> Self {
        match kind {
            "module" => Self::ModuleRoot,
            "block" => Self::Block,
            "identifier" => Self::Identifier,
            "binary_operator" => Self::BinaryExpression,
            "call" => Self::CallExpression,
            "expression_statement" => Self::ExpressionStatement,
            "if_statement" => Self::ConditionalStatement,
            "import_statement" => Self::ImportStatement,
            "import_from_statement" => Self::ImportFromStatement,
            "function_definition" => Self::FunctionDefinition,
            "class_definition" => Self::ClassDefinition,
            "attribute" => Self::Attribute,
            "keyword_argument" => Self::KeywordArgument,
            "assignment" => Self::Assignment,
            "parenthesized_expression" => Self::Parenthesized,
            other => Self::Other(other),
        }
    }

    /// The tree-sitter-python kind name
    pub fn grammar_name(&self) -> &'static str {
        match self {
            Self::ModuleRoot => "module",
            Self::Block => "block",
            Self::Identifier => "identifier",
            Self::BinaryExpression => "binary_operator",
            Self::CallExpression => "call",
            Self::ExpressionStatement => "expression_statement",
            Self::ConditionalStatement => "if_statement",
            Self::ImportStatement => "import_statement",
            Self::ImportFromStatement => "import_from_statement",
            Self::FunctionDefinition => "function_definition",
            Self::ClassDefinition => "class_definition",
            Self::Attribute => "attribute",
            Self::KeywordArgument => "keyword_argument",
            Self::Assignment => "assignment",
            Self::Parenthesized => "parenthesized_expression",
            Self::Other(name) => name,
        }
    }

    /// Whether nodes of this kind hold a statement sequence
    pub fn is_statement_list(&self) -> bool {
        matches!(self, Self::ModuleRoot | Self::Block)
    }
}

/// A source token and the trivia in front of it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub leading: String,
    pub text: String,
}

/// A tree node. Leaves own a token, inner nodes own their children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Field name this node occupies in its parent (`name`, `left`, ...)
    pub field: Option<&'static str>,
    /// Named grammar node, as opposed to punctuation and keywords
    pub named: bool,
    pub token: Option<Token>,
    pub children: Vec<Node>,
}

impl Node {
    /// A leaf node holding one token.
    pub fn leaf(
        kind: NodeKind,
        named: bool,
        leading: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: None,
            named,
            token: Some(Token {
                leading: leading.into(),
                text: text.into(),
            }),
            children: Vec::new(),
        }
    }

    /// Punctuation or keyword leaf (`(`, `:`, `if`, ...)
    pub fn punct(text: &'static str, leading: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Other(text), false, leading, text)
    }

    /// Inner node over `children`.
    pub fn branch(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            field: None,
            named: true,
            token: None,
            children,
        }
    }

    pub fn with_field(mut self, field: Option<&'static str>) -> Self {
        self.field = field;
        self
    }

    /// First child occupying `field`
    pub fn child_by_field(&self, field: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    /// All children occupying `field`
    pub fn children_by_field<'n>(&'n self, field: &'n str) -> impl Iterator<Item = &'n Node> + 'n {
        self.children.iter().filter(move |c| c.field == Some(field))
    }

    pub fn named_children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|c| c.named)
    }

    /// Token texts concatenated without trivia.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.for_each_token(&mut |tok| out.push_str(&tok.text));
        out
    }

    pub fn for_each_token(&self, f: &mut impl FnMut(&Token)) {
        if let Some(tok) = &self.token {
            f(tok);
        }
        for child in &self.children {
            child.for_each_token(f);
        }
    }

    /// Pre-order walk over this node and its descendants.
    pub fn walk(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    pub fn first_token(&self) -> Option<&Token> {
        if let Some(tok) = &self.token {
            return Some(tok);
        }
        self.children.iter().find_map(|c| c.first_token())
    }

    pub fn first_token_mut(&mut self) -> Option<&mut Token> {
        if self.token.is_some() {
            return self.token.as_mut();
        }
        self.children.iter_mut().find_map(|c| c.first_token_mut())
    }

    /// Trivia in front of the first token
    pub fn leading(&self) -> &str {
        self.first_token().map(|t| t.leading.as_str()).unwrap_or("")
    }

    /// Detach the trivia in front of the first token.
    pub fn take_leading(&mut self) -> String {
        self.first_token_mut()
            .map(|t| std::mem::take(&mut t.leading))
            .unwrap_or_default()
    }

    pub fn set_leading(&mut self, leading: impl Into<String>) {
        if let Some(tok) = self.first_token_mut() {
            tok.leading = leading.into();
        }
    }
}

/// A parsed file: root node plus the trivia after the last token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub root: Node,
    pub trailing: String,
}

impl SourceTree {
    /// Line ending used by the file, `\n` unless it contains `\r\n`.
    pub fn line_ending(&self) -> &'static str {
        let mut crlf = false;
        self.root.for_each_token(&mut |tok| {
            if tok.leading.contains("\r\n") {
                crlf = true;
            }
        });
        if crlf || self.trailing.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::branch(
            NodeKind::ExpressionStatement,
            vec![Node::branch(
                NodeKind::CallExpression,
                vec![
                    Node::leaf(NodeKind::Identifier, true, "\n", "foo").with_field(Some("function")),
                    Node::branch(
                        NodeKind::Other("argument_list"),
                        vec![Node::punct("(", ""), Node::punct(")", "")],
                    )
                    .with_field(Some("arguments")),
                ],
            )],
        )
    }

    #[test]
    fn test_kind_mapping_roundtrip() {
        for name in ["module", "block", "identifier", "call", "if_statement", "attribute"] {
            assert_eq!(NodeKind::from_grammar(name).grammar_name(), name);
        }
        assert_eq!(NodeKind::from_grammar("lambda"), NodeKind::Other("lambda"));
        assert!(NodeKind::Block.is_statement_list());
        assert!(!NodeKind::Identifier.is_statement_list());
    }

    #[test]
    fn test_text_and_leading() {
        let mut node = sample();
        assert_eq!(node.text(), "foo()");
        assert_eq!(node.leading(), "\n");

        let taken = node.take_leading();
        assert_eq!(taken, "\n");
        assert_eq!(node.leading(), "");

        node.set_leading("  ");
        assert_eq!(node.leading(), "  ");
    }

    #[test]
    fn test_field_lookup() {
        let node = sample();
        let call = &node.children[0];
        assert_eq!(call.child_by_field("function").map(|n| n.text()), Some("foo".to_string()));
        assert_eq!(call.children_by_field("arguments").count(), 1);
        assert_eq!(call.named_children().count(), 2);
    }
}
