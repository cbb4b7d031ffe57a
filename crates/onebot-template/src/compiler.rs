//! Compiles fragments into a [`Program`].
//!
//! Compilation is a single pass with an explicit stack of open scopes. Each
//! fragment becomes a node appended to the innermost open scope; `each` and
//! `if` open a new scope, and a close tag ends the innermost one.

use crate::error::{Result, TemplateError};
use crate::fragment::{fragments, Fragment, FragmentKind};
use crate::node::{Call, Each, If, NodeId, NodeKind, Program, Variable};

/// Builds the node tree for one template source.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'s> {
    source: &'s str,
}

impl<'s> Compiler<'s> {
    pub fn new(source: &'s str) -> Self {
        Compiler { source }
    }

    /// The source split into fragments.
    pub fn fragments(&self) -> Result<Vec<Fragment<'s>>> {
        fragments(self.source)
    }

    /// Compiles the source.
    ///
    /// # Errors
    ///
    /// A syntax error for malformed tags, unknown block commands, close tags
    /// without an open block, and blocks left open at the end of the source.
    pub fn compile(&self) -> Result<Program> {
        let mut program = Program::new();
        // the opening fragment is kept for error reporting
        let mut scopes: Vec<(NodeId, Option<Fragment<'s>>)> = vec![(program.root(), None)];

        for fragment in self.fragments()? {
            if fragment.kind() == FragmentKind::CloseBlock {
                if scopes.len() == 1 {
                    return Err(TemplateError::UnbalancedEnd {
                        fragment: fragment.raw().to_string(),
                        line: fragment.line(),
                    });
                }
                if let Some((closed, _)) = scopes.pop() {
                    program.exit_scope(closed);
                }
                continue;
            }

            let kind = create_node(&fragment)?;
            let opens_scope = kind.creates_scope();
            let parent = scopes.last().map_or(program.root(), |(id, _)| *id);
            let id = program.push(parent, kind);
            if opens_scope {
                program.enter_scope(id);
                scopes.push((id, Some(fragment)));
            }
        }

        if let Some((_, Some(open))) = scopes.pop() {
            return Err(TemplateError::UnclosedBlock {
                fragment: open.raw().to_string(),
                line: open.line(),
            });
        }

        tracing::debug!(nodes = program.len(), len = self.source.len(), "compiled template");
        Ok(program)
    }
}

fn create_node(fragment: &Fragment<'_>) -> Result<NodeKind> {
    match fragment.kind() {
        FragmentKind::Text => Ok(NodeKind::Text(fragment.raw().to_string())),
        FragmentKind::Variable => Ok(NodeKind::Variable(Variable::parse(fragment))),
        FragmentKind::OpenBlock => match fragment.command() {
            Some("each") => Ok(NodeKind::Each(Each::parse(fragment)?)),
            Some("if") => Ok(NodeKind::If(If::parse(fragment)?)),
            Some("else") => Ok(NodeKind::Else),
            Some("call") => Ok(NodeKind::Call(Call::parse(fragment)?)),
            Some(command) => Err(TemplateError::UnknownBlock {
                command: command.to_string(),
                fragment: fragment.raw().to_string(),
                line: fragment.line(),
            }),
            None => Err(fragment.syntax_error()),
        },
        FragmentKind::CloseBlock => Err(fragment.syntax_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(program: &Program, id: NodeId) -> Vec<&'static str> {
        program
            .node(id)
            .children()
            .iter()
            .map(|&child| program.node(child).kind().name())
            .collect()
    }

    #[test]
    fn builds_nested_tree() {
        let program = Compiler::new(
            "Hi {{ name }}\n{% each r in results %}{% if r.ok %}{{ r.v }}{% else %}-{% end %}{% end %}!",
        )
        .compile()
        .unwrap();

        let root = program.root();
        assert_eq!(kinds(&program, root), ["text", "variable", "text", "each", "text"]);

        let each = program.node(root).children()[3];
        assert_eq!(kinds(&program, each), ["if"]);

        let block = program.node(each).children()[0];
        assert_eq!(kinds(&program, block), ["variable", "else", "text"]);
        match program.node(block).kind() {
            NodeKind::If(block) => {
                assert_eq!(block.if_branch.len(), 1);
                assert_eq!(block.else_branch.len(), 1);
            }
            other => panic!("expected if, got {}", other.name()),
        }
    }

    #[test]
    fn any_end_word_closes() {
        let program = Compiler::new("{% if a %}x{% endif %}{% each i in xs %}{% endeach %}")
            .compile()
            .unwrap();
        assert_eq!(kinds(&program, program.root()), ["if", "each"]);
    }

    #[test]
    fn every_node_descends_from_root() {
        let program = Compiler::new("{% each a in xs %}{% each b in ..xs %}{{b}}{% end %}{% end %}")
            .compile()
            .unwrap();
        let mut stack = vec![program.root()];
        let mut seen = 0;
        while let Some(id) = stack.pop() {
            assert_eq!(program.root_of(id).unwrap(), program.root());
            seen += 1;
            stack.extend_from_slice(program.node(id).children());
        }
        assert_eq!(seen, program.len());
    }

    #[test]
    fn empty_source_compiles_to_bare_root() {
        let program = Compiler::new("").compile().unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn unbalanced_end_is_rejected() {
        let err = Compiler::new("text{% end %}").compile().unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnbalancedEnd { ref fragment, line: 1 } if fragment == "{% end %}"
        ));

        let err = Compiler::new("{% if a %}{% end %}\n{% end %}").compile().unwrap_err();
        assert!(matches!(err, TemplateError::UnbalancedEnd { line: 2, .. }));
    }

    #[test]
    fn unclosed_block_is_rejected() {
        let err = Compiler::new("{% each i in xs %}\n{% if i %}x{% end %}")
            .compile()
            .unwrap_err();
        assert_eq!(err.to_string(), "{% each i in xs %} is never closed (line 1)");
    }

    #[test]
    fn unknown_and_empty_commands() {
        let err = Compiler::new("a\n{% for x in y %}").compile().unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnknownBlock { ref command, line: 2, .. } if command == "for"
        ));

        let err = Compiler::new("{% %}").compile().unwrap_err();
        assert!(matches!(err, TemplateError::InvalidSyntax { .. }));
    }

    #[test]
    fn else_outside_if_is_kept_as_marker() {
        let program = Compiler::new("a{% else %}b").compile().unwrap();
        assert_eq!(kinds(&program, program.root()), ["text", "else", "text"]);
    }
}
