//! The compiled node tree.
//!
//! Nodes live in an arena owned by [`Program`] and refer to each other by
//! [`NodeId`]. A node owns its children through the arena; its parent link is
//! a plain index used only to walk back up to the root.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, TemplateError};
use crate::expr::Expression;
use crate::fragment::Fragment;

static EACH_MATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^each\s+(?P<item>\w+?)\s+in\s+(?P<iterator>.+?)(?:\s+max\s+(?P<max>.+?))?$")
        .expect("each pattern is valid")
});

/// Index of a node inside its [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of the compiled tree.
#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    /// The node's parent, `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The node's children, in source order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// What the node does.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns `true` if the node opens a scope that a close tag ends.
    pub fn creates_scope(&self) -> bool {
        self.kind.creates_scope()
    }
}

/// The closed set of node types.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The unique top of the tree.
    Root,
    /// Literal text.
    Text(String),
    /// `{{ name|filter }}`
    Variable(Variable),
    /// `{% each item in expr max n %}`
    Each(Each),
    /// `{% if lhs op rhs %}`
    If(If),
    /// `{% else %}`, a branch marker inside `if`.
    Else,
    /// `{% call name args %}`
    Call(Call),
}

impl NodeKind {
    /// Returns `true` for the block types closed by `{% end %}`.
    pub fn creates_scope(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Each(_) | NodeKind::If(_))
    }

    /// Short name of the node type.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Text(_) => "text",
            NodeKind::Variable(_) => "variable",
            NodeKind::Each(_) => "each",
            NodeKind::If(_) => "if",
            NodeKind::Else => "else",
            NodeKind::Call(_) => "call",
        }
    }
}

/// A variable interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// The dotted path to resolve.
    pub name: String,
    /// The explicitly named filter, if any.
    pub filter: Option<String>,
    /// Source text written before the value.
    pub leading: String,
    /// Source text written after the value.
    pub trailing: String,
}

impl Variable {
    /// Splits `name|filter` on the first `|`.
    pub fn parse(fragment: &Fragment<'_>) -> Variable {
        let (name, filter) = match fragment.clean().split_once('|') {
            Some((name, filter)) => (name.trim(), Some(filter.trim().to_string())),
            None => (fragment.clean(), None),
        };
        let (leading, trailing) = fragment.padding();
        Variable {
            name: name.to_string(),
            filter,
            leading: leading.to_string(),
            trailing: trailing.to_string(),
        }
    }
}

/// A loop over a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Each {
    /// Name bound to the current item inside the loop body.
    pub item: String,
    /// Expression producing the sequence.
    pub iterator: Expression,
    /// Optional upper bound on the number of iterations.
    pub max: Option<Expression>,
    /// The iterator expression as written, for error messages.
    pub iterator_source: String,
}

impl Each {
    /// Parses `each <item> in <expr> [max <expr>]`.
    pub fn parse(fragment: &Fragment<'_>) -> Result<Each> {
        let captures = EACH_MATCH
            .captures(fragment.clean())
            .ok_or_else(|| fragment.syntax_error())?;
        let item = captures.name("item").map_or("", |m| m.as_str());
        let iterator = captures.name("iterator").map_or("", |m| m.as_str());

        Ok(Each {
            item: item.to_string(),
            iterator: Expression::parse(iterator),
            max: captures.name("max").map(|m| Expression::parse(m.as_str())),
            iterator_source: iterator.to_string(),
        })
    }
}

/// A conditional block.
///
/// The branches are filled in when the block's scope closes.
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    /// The tested expression, or the left-hand side of a comparison.
    pub lhs: Expression,
    /// Operator spelling and right-hand side of a comparison.
    pub comparison: Option<(String, Expression)>,
    /// Children rendered when the condition holds.
    pub if_branch: Vec<NodeId>,
    /// Children rendered otherwise.
    pub else_branch: Vec<NodeId>,
}

impl If {
    /// Parses `if <expr>` or `if <lhs> <op> <rhs>`.
    pub fn parse(fragment: &Fragment<'_>) -> Result<If> {
        let bits: Vec<&str> = fragment.clean().split_whitespace().skip(1).collect();
        let comparison = match bits.as_slice() {
            [_] => None,
            [_, op, rhs] => Some((op.to_string(), Expression::parse(rhs))),
            _ => return Err(fragment.syntax_error()),
        };
        Ok(If {
            lhs: Expression::parse(bits[0]),
            comparison,
            if_branch: Vec::new(),
            else_branch: Vec::new(),
        })
    }
}

/// An invocation of a context function.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Dotted path of the function to call.
    pub callable: String,
    /// Positional arguments.
    pub args: Vec<Expression>,
    /// Keyword arguments, in tag order.
    pub kwargs: Vec<(String, Expression)>,
}

impl Call {
    /// Parses `call <name> [arg | key=value]...`.
    pub fn parse(fragment: &Fragment<'_>) -> Result<Call> {
        let mut bits = fragment.clean().split_whitespace().skip(1);
        let callable = bits.next().ok_or_else(|| fragment.syntax_error())?;

        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        for param in bits {
            match param.split_once('=') {
                Some((name, value)) => kwargs.push((name.to_string(), Expression::parse(value))),
                None => args.push(Expression::parse(param)),
            }
        }
        Ok(Call {
            callable: callable.to_string(),
            args,
            kwargs,
        })
    }
}

/// A compiled template: the arena of nodes rooted at [`Program::root`].
#[derive(Debug, Clone)]
pub struct Program {
    nodes: Vec<Node>,
}

impl Program {
    pub(crate) fn new() -> Self {
        Program {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Root,
            }],
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the node with the given id.
    ///
    /// Ids are only handed out by the program that owns them.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the program holds only the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Walks parent links from `id` and returns the root it ends at.
    ///
    /// # Errors
    ///
    /// [`TemplateError::DetachedNode`] if the walk ends at a node that is not
    /// a root, or does not end at all.
    pub fn root_of(&self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        for _ in 0..self.nodes.len() {
            let node = self
                .nodes
                .get(current.0)
                .ok_or(TemplateError::DetachedNode(id.0))?;
            match node.parent {
                Some(parent) => current = parent,
                None if matches!(node.kind, NodeKind::Root) => return Ok(current),
                None => break,
            }
        }
        Err(TemplateError::DetachedNode(id.0))
    }

    /// Appends a node as the last child of `parent`.
    pub(crate) fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Hook run when a scope-creating node is pushed onto the scope stack.
    pub(crate) fn enter_scope(&mut self, _id: NodeId) {}

    /// Hook run when a close tag ends the scope of `id`.
    ///
    /// An `if` splits its children at the first `else` marker here, once, so
    /// rendering never has to.
    pub(crate) fn exit_scope(&mut self, id: NodeId) {
        let (if_branch, else_branch) = self.split_branches(id);
        if let NodeKind::If(block) = &mut self.nodes[id.0].kind {
            block.if_branch = if_branch;
            block.else_branch = else_branch;
        }
    }

    fn split_branches(&self, id: NodeId) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut if_branch = Vec::new();
        let mut else_branch = Vec::new();
        let mut in_else = false;
        for &child in &self.nodes[id.0].children {
            if matches!(self.nodes[child.0].kind, NodeKind::Else) {
                in_else = true;
                continue;
            }
            if in_else {
                else_branch.push(child);
            } else {
                if_branch.push(child);
            }
        }
        (if_branch, else_branch)
    }

    #[cfg(test)]
    pub(crate) fn detach(&mut self, id: NodeId) {
        self.nodes[id.0].parent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::fragments;
    use crate::value::Value;

    fn fragment(source: &str) -> Fragment<'_> {
        fragments(source).unwrap().remove(0)
    }

    #[test]
    fn variable_splits_on_first_pipe() {
        let var = Variable::parse(&fragment("{{ item.image | image }}"));
        assert_eq!(var.name, "item.image");
        assert_eq!(var.filter.as_deref(), Some("image"));

        let var = Variable::parse(&fragment("{{ a|b|c }}"));
        assert_eq!(var.name, "a");
        assert_eq!(var.filter.as_deref(), Some("b|c"));

        let var = Variable::parse(&fragment("{{name}}"));
        assert_eq!(var.filter, None);
        assert_eq!((var.leading.as_str(), var.trailing.as_str()), ("", ""));
    }

    #[test]
    fn variable_keeps_text_around_mismatched_tag() {
        let var = Variable::parse(&fragment("  {{ x|raw %}\t"));
        assert_eq!(var.name, "x");
        assert_eq!(var.filter.as_deref(), Some("raw"));
        assert_eq!(var.leading, "  ");
        assert_eq!(var.trailing, "\t");
    }

    #[test]
    fn each_with_and_without_max() {
        let each = Each::parse(&fragment("{% each item in data.result max 3 %}")).unwrap();
        assert_eq!(each.item, "item");
        assert_eq!(each.iterator, Expression::Name("data.result".into()));
        assert_eq!(each.max, Some(Expression::Literal(Value::from(3))));

        let each = Each::parse(&fragment("{% each n in [1, 2, 3] %}")).unwrap();
        assert_eq!(each.iterator, Expression::Literal(Value::from(vec![1, 2, 3])));
        assert_eq!(each.max, None);
    }

    #[test]
    fn each_rejects_malformed_headers() {
        for source in ["{% each item %}", "{% each in xs %}", "{% each a b in xs %}"] {
            let err = Each::parse(&fragment(source)).unwrap_err();
            assert!(err.is_syntax(), "{source}");
        }
    }

    #[test]
    fn if_accepts_one_or_three_tokens() {
        let block = If::parse(&fragment("{% if flag %}")).unwrap();
        assert_eq!(block.comparison, None);

        let block = If::parse(&fragment("{% if a <= 3 %}")).unwrap();
        let (op, rhs) = block.comparison.unwrap();
        assert_eq!(op, "<=");
        assert_eq!(rhs, Expression::Literal(Value::from(3)));

        assert!(If::parse(&fragment("{% if %}")).is_err());
        assert!(If::parse(&fragment("{% if a b %}")).is_err());
        assert!(If::parse(&fragment("{% if a == b c %}")).is_err());
    }

    #[test]
    fn call_parses_args_and_kwargs() {
        let call = Call::parse(&fragment("{% call fmt.join items 2 sep=',' %}")).unwrap();
        assert_eq!(call.callable, "fmt.join");
        assert_eq!(
            call.args,
            vec![
                Expression::Name("items".into()),
                Expression::Literal(Value::from(2))
            ]
        );
        assert_eq!(
            call.kwargs,
            vec![("sep".to_string(), Expression::Literal(Value::from(",")))]
        );

        // arguments are split on whitespace, so quoted spaces break apart
        let call = Call::parse(&fragment("{% call f ', ' %}")).unwrap();
        assert_eq!(call.args.len(), 2);

        assert!(Call::parse(&fragment("{% call %}")).is_err());
    }

    #[test]
    fn root_of_walks_to_root() {
        let mut program = Program::new();
        let root = program.root();
        let each = program.push(
            root,
            NodeKind::Each(Each::parse(&fragment("{% each x in xs %}")).unwrap()),
        );
        let text = program.push(each, NodeKind::Text("t".into()));

        assert_eq!(program.root_of(text).unwrap(), root);
        assert_eq!(program.root_of(root).unwrap(), root);
        assert_eq!(program.node(each).children(), &[text]);
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn detached_node_is_a_structural_error() {
        let mut program = Program::new();
        let root = program.root();
        let each = program.push(
            root,
            NodeKind::Each(Each::parse(&fragment("{% each x in xs %}")).unwrap()),
        );
        let text = program.push(each, NodeKind::Text("t".into()));
        program.detach(each);

        let err = program.root_of(text).unwrap_err();
        assert!(matches!(err, TemplateError::DetachedNode(i) if i == text.index()));
    }

    #[test]
    fn exit_scope_partitions_if_children() {
        let mut program = Program::new();
        let root = program.root();
        let block = program.push(
            root,
            NodeKind::If(If::parse(&fragment("{% if x %}")).unwrap()),
        );
        let a = program.push(block, NodeKind::Text("a".into()));
        program.push(block, NodeKind::Else);
        let b = program.push(block, NodeKind::Text("b".into()));
        program.push(block, NodeKind::Else);
        let c = program.push(block, NodeKind::Text("c".into()));
        program.exit_scope(block);

        match program.node(block).kind() {
            NodeKind::If(block) => {
                assert_eq!(block.if_branch, vec![a]);
                assert_eq!(block.else_branch, vec![b, c]);
            }
            other => panic!("expected if, got {}", other.name()),
        }
    }
}
