use serde::{Deserialize, Serialize};

use crate::query_parsing::{AstNode, CompareOp, Literal, LogicalOp, Operand};

// Referencing either of these in a filter does not name a column; it asks
// for a derived per-row epoch value instead.
pub const RESERVED_EARLIEST: &str = "earliest";
pub const RESERVED_LATEST: &str = "latest";

fn engine_op(op: CompareOp) -> &'static str {
	match op {
		CompareOp::Equal => "==",
		CompareOp::NotEqual => "!=",
		CompareOp::LessThan => "<",
		CompareOp::GreaterThan => ">",
		CompareOp::LessThanOrEqual => "<=",
		CompareOp::GreaterThanOrEqual => ">=",
	}
}

fn render_literal(literal: &Literal) -> String {
	match literal {
		Literal::Str(value) => format!("'{}'", value.replace('\'', "\\'")),
		Literal::Num(value) => value.clone(),
		Literal::Bool(true) => "True".to_string(),
		Literal::Bool(false) => "False".to_string(),
	}
}

fn render_operand(operand: &Operand) -> String {
	match operand {
		Operand::Identifier(name) => name.clone(),
		Operand::Literal(literal) => render_literal(literal),
	}
}

/// Emits the boolean filter expression the tabular engine evaluates:
/// `==`/`!=`/`<`/`>`/`<=`/`>=` comparisons joined with `&` and `|`, and
/// `in [...]` membership lists.
pub fn to_engine_expr(node: &AstNode) -> String {
	match node {
		AstNode::Comparison { op, left, right } => format!(
			"({} {} {})",
			render_operand(left),
			engine_op(*op),
			render_operand(right)
		),
		AstNode::Logical { op, left, right } => {
			let symbol = match op {
				LogicalOp::And => "&",
				LogicalOp::Or => "|",
			};
			format!("({} {} {})", to_engine_expr(left), symbol, to_engine_expr(right))
		}
		AstNode::In { field, values } => {
			let rendered: Vec<String> = values.iter().map(render_literal).collect();
			format!("({} in [{}])", field, rendered.join(", "))
		}
		AstNode::Operand(operand) => render_operand(operand),
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
	pub columns: Vec<String>,
	pub needs_time_filter: bool,
}

/// Collects the distinct column names a filter references, in first-seen
/// order. The reserved temporal identifiers never appear as columns; they
/// flip the time-filter flag instead.
pub fn referenced_fields(node: &AstNode) -> FieldSet {
	let mut fields = FieldSet::default();
	collect(node, &mut fields);
	fields
}

fn collect(node: &AstNode, fields: &mut FieldSet) {
	match node {
		AstNode::Comparison { left, right, .. } => {
			collect_operand(left, fields);
			collect_operand(right, fields);
		}
		AstNode::Logical { left, right, .. } => {
			collect(left, fields);
			collect(right, fields);
		}
		AstNode::In { field, .. } => push_field(field, fields),
		AstNode::Operand(operand) => collect_operand(operand, fields),
	}
}

fn collect_operand(operand: &Operand, fields: &mut FieldSet) {
	if let Operand::Identifier(name) = operand {
		push_field(name, fields);
	}
}

fn push_field(name: &str, fields: &mut FieldSet) {
	if name == RESERVED_EARLIEST || name == RESERVED_LATEST {
		fields.needs_time_filter = true;
	} else if !fields.columns.iter().any(|column| column == name) {
		fields.columns.push(name.to_string());
	}
}
