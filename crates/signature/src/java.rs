use crate::error::{Result, SignatureError};
use crate::label::EntityLabel;
use crate::tree::{Entity, NodeId, Signature, SourceRange};
use tree_sitter::{Node, Parser};

const CLASS_PREFIX: &str = "class __Fixcheck__ {\n";
const BODY_PREFIX: &str = "class __Fixcheck__ {\nvoid __body__() {\n";

/// Builds signatures from Java method or constructor source.
///
/// Accepts a complete declaration (`public int size() { ... }`) or a bare
/// statement list. Bare bodies get an empty root value.
pub struct JavaSignatureBuilder {
    parser: Parser,
}

impl JavaSignatureBuilder {
    pub fn new() -> Result<Self> {
        let language = tree_sitter::Language::from(tree_sitter_java::LANGUAGE);
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| SignatureError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(Self { parser })
    }

    pub fn build(&mut self, source: &str) -> Result<Signature> {
        let source = source.trim();
        if source.is_empty() {
            return Err(SignatureError::parse("Empty source"));
        }

        let declaration = format!("{CLASS_PREFIX}{source}\n}}");
        if let Some(signature) = self.build_wrapped(&declaration, CLASS_PREFIX.len(), false)? {
            return Ok(signature);
        }

        let body = format!("{BODY_PREFIX}{source}\n}}\n}}");
        self.build_wrapped(&body, BODY_PREFIX.len(), true)?
            .ok_or_else(|| SignatureError::parse("No method body found"))
    }

    fn build_wrapped(
        &mut self,
        content: &str,
        offset: usize,
        bare: bool,
    ) -> Result<Option<Signature>> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| SignatureError::parse("Failed to parse source code"))?;
        let root = tree.root_node();
        if root.has_error() {
            if !bare {
                return Ok(None);
            }
            log::debug!("Java body contains syntax errors, building a partial signature");
        }

        let Some(declaration) = find_declaration(root) else {
            return Ok(None);
        };

        let emitter = Emitter { content, offset };
        let value = if bare {
            String::new()
        } else {
            emitter.declaration_name(declaration)
        };
        let mut signature = Signature::with_root(
            Entity::new(EntityLabel::Method, value).with_range(emitter.range(declaration)),
        );
        if let Some(body) = declaration.child_by_field_name("body") {
            let root_id = signature.root();
            emitter.statement(&mut signature, root_id, body);
        }
        Ok(Some(signature))
    }
}

fn find_declaration(root: Node) -> Option<Node> {
    let mut cursor = root.walk();
    let classes: Vec<_> = root.named_children(&mut cursor).collect();
    for class in classes {
        let Some(body) = class.child_by_field_name("body") else {
            continue;
        };
        let mut cursor = body.walk();
        let members: Vec<_> = body.named_children(&mut cursor).collect();
        if let Some(member) = members
            .into_iter()
            .find(|m| matches!(m.kind(), "method_declaration" | "constructor_declaration"))
        {
            return Some(member);
        }
    }
    None
}

struct Emitter<'s> {
    content: &'s str,
    offset: usize,
}

impl Emitter<'_> {
    fn text(&self, node: Node) -> String {
        let raw = self
            .content
            .get(node.start_byte()..node.end_byte())
            .unwrap_or_default();
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn range(&self, node: Node) -> SourceRange {
        SourceRange::new(
            node.start_byte().saturating_sub(self.offset),
            node.end_byte().saturating_sub(self.offset),
        )
    }

    /// Statement text without its terminating semicolon
    fn statement_text(&self, node: Node) -> String {
        let text = self.text(node);
        text.trim_end_matches(';').trim_end().to_string()
    }

    /// Condition text with the surrounding parentheses removed
    fn condition(&self, node: Node) -> String {
        if node.kind() == "parenthesized_expression" {
            if let Some(inner) = node.named_child(0) {
                return self.text(inner);
            }
        }
        self.text(node)
    }

    fn field_condition(&self, node: Node, field: &str) -> String {
        node.child_by_field_name(field)
            .map(|c| self.condition(c))
            .unwrap_or_default()
    }

    fn declaration_name(&self, declaration: Node) -> String {
        let name = declaration
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let mut types = Vec::new();
        if let Some(params) = declaration.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                match param.kind() {
                    "formal_parameter" => types.push(
                        param
                            .child_by_field_name("type")
                            .map(|t| self.text(t))
                            .unwrap_or_else(|| self.text(param)),
                    ),
                    "spread_parameter" => {
                        if let Some(t) = param.named_child(0) {
                            types.push(format!("{}...", self.text(t)));
                        }
                    }
                    _ => {}
                }
            }
        }
        format!("{name}({})", types.join(","))
    }

    fn add(
        &self,
        tree: &mut Signature,
        parent: NodeId,
        label: EntityLabel,
        value: String,
        node: Node,
    ) -> NodeId {
        tree.add_child(parent, Entity::new(label, value).with_range(self.range(node)))
    }

    fn leaf(&self, tree: &mut Signature, parent: NodeId, label: EntityLabel, node: Node) {
        let value = self.statement_text(node);
        self.add(tree, parent, label, value, node);
    }

    fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    }

    fn statements(&self, tree: &mut Signature, parent: NodeId, node: Node) {
        for child in Self::named_children(node) {
            self.statement(tree, parent, child);
        }
    }

    fn statement(&self, tree: &mut Signature, parent: NodeId, node: Node) {
        match node.kind() {
            "block" | "constructor_body" => self.statements(tree, parent, node),
            "line_comment" | "block_comment" => {}
            "local_variable_declaration" => {
                self.leaf(tree, parent, EntityLabel::VariableDeclarationStatement, node);
            }
            "expression_statement" => match node.named_child(0) {
                Some(expr) if expr.kind() == "switch_expression" => {
                    self.switch(tree, parent, expr);
                }
                Some(expr) => {
                    let label = self.expression_label(expr);
                    self.leaf(tree, parent, label, node);
                }
                None => {}
            },
            "if_statement" => self.if_statement(tree, parent, node),
            "for_statement" => {
                let value = self.field_condition(node, "condition");
                let id = self.add(tree, parent, EntityLabel::ForStatement, value, node);
                self.body(tree, id, node);
            }
            "enhanced_for_statement" => {
                let value = self.foreach_header(node);
                let id = self.add(tree, parent, EntityLabel::ForeachStatement, value, node);
                self.body(tree, id, node);
            }
            "while_statement" => {
                let value = self.field_condition(node, "condition");
                let id = self.add(tree, parent, EntityLabel::WhileStatement, value, node);
                self.body(tree, id, node);
            }
            "do_statement" => {
                let value = self.field_condition(node, "condition");
                let id = self.add(tree, parent, EntityLabel::DoStatement, value, node);
                self.body(tree, id, node);
            }
            "try_statement" | "try_with_resources_statement" => {
                self.try_statement(tree, parent, node);
            }
            "switch_expression" | "switch_statement" => self.switch(tree, parent, node),
            "synchronized_statement" => {
                let value = Self::named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "parenthesized_expression")
                    .map(|c| self.condition(c))
                    .unwrap_or_default();
                let id = self.add(tree, parent, EntityLabel::SynchronizedStatement, value, node);
                self.body(tree, id, node);
            }
            "labeled_statement" => {
                let children = Self::named_children(node);
                let value = children
                    .iter()
                    .find(|c| c.kind() == "identifier")
                    .map(|c| self.text(*c))
                    .unwrap_or_default();
                let id = self.add(tree, parent, EntityLabel::LabeledStatement, value, node);
                for child in children.into_iter().filter(|c| c.kind() != "identifier") {
                    self.statement(tree, id, child);
                }
            }
            "return_statement" => self.leaf(tree, parent, EntityLabel::ReturnStatement, node),
            "throw_statement" => self.leaf(tree, parent, EntityLabel::ThrowStatement, node),
            "break_statement" => self.leaf(tree, parent, EntityLabel::BreakStatement, node),
            "continue_statement" => self.leaf(tree, parent, EntityLabel::ContinueStatement, node),
            "assert_statement" => self.leaf(tree, parent, EntityLabel::AssertStatement, node),
            "yield_statement" => self.leaf(tree, parent, EntityLabel::YieldStatement, node),
            "explicit_constructor_invocation" => {
                let label = if self.text(node).starts_with("super") {
                    EntityLabel::SuperConstructorInvocation
                } else {
                    EntityLabel::ConstructorInvocation
                };
                self.leaf(tree, parent, label, node);
            }
            _ if node.is_named() => {
                self.leaf(tree, parent, EntityLabel::ExpressionStatement, node);
            }
            _ => {}
        }
    }

    fn body(&self, tree: &mut Signature, parent: NodeId, node: Node) {
        if let Some(body) = node.child_by_field_name("body") {
            self.statement(tree, parent, body);
        }
    }

    fn expression_label(&self, expr: Node) -> EntityLabel {
        match expr.kind() {
            "assignment_expression" => EntityLabel::Assignment,
            "method_invocation" => EntityLabel::MethodInvocation,
            "object_creation_expression" => EntityLabel::ClassInstanceCreation,
            "update_expression" => {
                let text = self.text(expr);
                if text.starts_with("++") || text.starts_with("--") {
                    EntityLabel::PrefixExpression
                } else {
                    EntityLabel::PostfixExpression
                }
            }
            _ => EntityLabel::ExpressionStatement,
        }
    }

    fn if_statement(&self, tree: &mut Signature, parent: NodeId, node: Node) {
        let condition = self.field_condition(node, "condition");
        let id = self.add(tree, parent, EntityLabel::IfStatement, condition.clone(), node);
        if let Some(consequence) = node.child_by_field_name("consequence") {
            let then = self.add(
                tree,
                id,
                EntityLabel::ThenStatement,
                condition.clone(),
                consequence,
            );
            self.statement(tree, then, consequence);
        }
        if let Some(alternative) = node.child_by_field_name("alternative") {
            let otherwise = self.add(tree, id, EntityLabel::ElseStatement, condition, alternative);
            self.statement(tree, otherwise, alternative);
        }
    }

    fn foreach_header(&self, node: Node) -> String {
        let start = node
            .child_by_field_name("type")
            .map(|t| t.start_byte());
        let end = node
            .child_by_field_name("value")
            .map(|v| v.end_byte());
        match (start, end) {
            (Some(start), Some(end)) if start < end => self
                .content
                .get(start..end)
                .unwrap_or_default()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
            _ => String::new(),
        }
    }

    fn try_statement(&self, tree: &mut Signature, parent: NodeId, node: Node) {
        let resources = node
            .child_by_field_name("resources")
            .map(|r| self.text(r))
            .unwrap_or_default();
        let id = self.add(tree, parent, EntityLabel::TryStatement, resources, node);
        self.body(tree, id, node);

        for child in Self::named_children(node) {
            match child.kind() {
                "catch_clause" => {
                    let value = Self::named_children(child)
                        .into_iter()
                        .find(|c| c.kind() == "catch_formal_parameter")
                        .map(|c| self.text(c))
                        .unwrap_or_default();
                    let catch = self.add(tree, id, EntityLabel::CatchClause, value, child);
                    self.body(tree, catch, child);
                }
                "finally_clause" => {
                    let finally = self.add(tree, id, EntityLabel::Finally, String::new(), child);
                    for block in Self::named_children(child) {
                        self.statement(tree, finally, block);
                    }
                }
                _ => {}
            }
        }
    }

    fn switch(&self, tree: &mut Signature, parent: NodeId, node: Node) {
        let value = self.field_condition(node, "condition");
        let id = self.add(tree, parent, EntityLabel::SwitchStatement, value, node);
        let Some(block) = node.child_by_field_name("body") else {
            return;
        };
        for group in Self::named_children(block) {
            match group.kind() {
                "switch_block_statement_group" => {
                    for child in Self::named_children(group) {
                        if child.kind() == "switch_label" {
                            let label = self.text(child);
                            self.add(tree, id, EntityLabel::SwitchCase, label, child);
                        } else {
                            self.statement(tree, id, child);
                        }
                    }
                }
                "switch_rule" => {
                    let children = Self::named_children(group);
                    let label = children
                        .iter()
                        .find(|c| c.kind() == "switch_label")
                        .map(|c| self.text(*c))
                        .unwrap_or_default();
                    let case = self.add(tree, id, EntityLabel::SwitchCase, label, group);
                    for child in children.into_iter().filter(|c| c.kind() != "switch_label") {
                        self.statement(tree, case, child);
                    }
                }
                _ => {}
            }
        }
    }
}
