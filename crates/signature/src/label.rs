use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Syntactic kind of a signature node.
///
/// The vocabulary is closed: snapshots carrying a name outside of it decode as
/// [`EntityLabel::Method`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityLabel {
    Method,
    Class,
    Field,
    Parameter,
    Arguments,
    Modifiers,
    Block,
    VariableDeclarationStatement,
    Assignment,
    MethodInvocation,
    ClassInstanceCreation,
    PostfixExpression,
    PrefixExpression,
    ExpressionStatement,
    IfStatement,
    ThenStatement,
    ElseStatement,
    ForStatement,
    ForeachStatement,
    WhileStatement,
    DoStatement,
    ReturnStatement,
    ThrowStatement,
    TryStatement,
    CatchClause,
    Finally,
    SwitchStatement,
    SwitchCase,
    SynchronizedStatement,
    BreakStatement,
    ContinueStatement,
    LabeledStatement,
    AssertStatement,
    YieldStatement,
    ConstructorInvocation,
    SuperConstructorInvocation,
}

impl EntityLabel {
    pub const ALL: [Self; 36] = [
        Self::Method,
        Self::Class,
        Self::Field,
        Self::Parameter,
        Self::Arguments,
        Self::Modifiers,
        Self::Block,
        Self::VariableDeclarationStatement,
        Self::Assignment,
        Self::MethodInvocation,
        Self::ClassInstanceCreation,
        Self::PostfixExpression,
        Self::PrefixExpression,
        Self::ExpressionStatement,
        Self::IfStatement,
        Self::ThenStatement,
        Self::ElseStatement,
        Self::ForStatement,
        Self::ForeachStatement,
        Self::WhileStatement,
        Self::DoStatement,
        Self::ReturnStatement,
        Self::ThrowStatement,
        Self::TryStatement,
        Self::CatchClause,
        Self::Finally,
        Self::SwitchStatement,
        Self::SwitchCase,
        Self::SynchronizedStatement,
        Self::BreakStatement,
        Self::ContinueStatement,
        Self::LabeledStatement,
        Self::AssertStatement,
        Self::YieldStatement,
        Self::ConstructorInvocation,
        Self::SuperConstructorInvocation,
    ];

    /// Wire name of the label
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Method => "METHOD",
            Self::Class => "CLASS",
            Self::Field => "FIELD",
            Self::Parameter => "PARAMETER",
            Self::Arguments => "ARGUMENTS",
            Self::Modifiers => "MODIFIERS",
            Self::Block => "BLOCK",
            Self::VariableDeclarationStatement => "VARIABLE_DECLARATION_STATEMENT",
            Self::Assignment => "ASSIGNMENT",
            Self::MethodInvocation => "METHOD_INVOCATION",
            Self::ClassInstanceCreation => "CLASS_INSTANCE_CREATION",
            Self::PostfixExpression => "POSTFIX_EXPRESSION",
            Self::PrefixExpression => "PREFIX_EXPRESSION",
            Self::ExpressionStatement => "EXPRESSION_STATEMENT",
            Self::IfStatement => "IF_STATEMENT",
            Self::ThenStatement => "THEN_STATEMENT",
            Self::ElseStatement => "ELSE_STATEMENT",
            Self::ForStatement => "FOR_STATEMENT",
            Self::ForeachStatement => "FOREACH_STATEMENT",
            Self::WhileStatement => "WHILE_STATEMENT",
            Self::DoStatement => "DO_STATEMENT",
            Self::ReturnStatement => "RETURN_STATEMENT",
            Self::ThrowStatement => "THROW_STATEMENT",
            Self::TryStatement => "TRY_STATEMENT",
            Self::CatchClause => "CATCH_CLAUSE",
            Self::Finally => "FINALLY",
            Self::SwitchStatement => "SWITCH_STATEMENT",
            Self::SwitchCase => "SWITCH_CASE",
            Self::SynchronizedStatement => "SYNCHRONIZED_STATEMENT",
            Self::BreakStatement => "BREAK_STATEMENT",
            Self::ContinueStatement => "CONTINUE_STATEMENT",
            Self::LabeledStatement => "LABELED_STATEMENT",
            Self::AssertStatement => "ASSERT_STATEMENT",
            Self::YieldStatement => "YIELD_STATEMENT",
            Self::ConstructorInvocation => "CONSTRUCTOR_INVOCATION",
            Self::SuperConstructorInvocation => "SUPER_CONSTRUCTOR_INVOCATION",
        }
    }

    /// Resolve a wire name, falling back to `Method` for unknown names
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| {
                log::debug!("Unknown entity label '{name}', assuming METHOD");
                Self::Method
            })
    }

    /// Whether nodes of this kind are statements
    pub const fn is_statement(self) -> bool {
        !matches!(
            self,
            Self::Method
                | Self::Class
                | Self::Field
                | Self::Parameter
                | Self::Arguments
                | Self::Modifiers
                | Self::Block
        )
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EntityLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}
