use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query_parsing::{AstNode, CompareOp, Literal, LogicalOp, Operand};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
	pub column: String,
	pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
	pub cells: Vec<Cell>,
}

impl Record {
	pub fn new(cells: Vec<(String, String)>) -> Record {
		Record {
			cells: cells
				.into_iter()
				.map(|(column, value)| Cell { column, value })
				.collect(),
		}
	}

	pub fn get(&self, column: &str) -> Option<&str> {
		self.cells
			.iter()
			.find(|cell| cell.column == column)
			.map(|cell| cell.value.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
	#[error("cannot order-compare '{0}' against '{1}'")]
	Incomparable(String, String),
}

enum EvalValue<'a> {
	Text(&'a str),
	Num(i64),
	Bool(bool),
}

fn literal_value(literal: &Literal) -> EvalValue<'_> {
	match literal {
		Literal::Str(value) => EvalValue::Text(value),
		// Number literals are digit runs; anything too large for i64 falls
		// back to text comparison.
		Literal::Num(value) => match value.parse::<i64>() {
			Ok(num) => EvalValue::Num(num),
			Err(_) => EvalValue::Text(value),
		},
		Literal::Bool(value) => EvalValue::Bool(*value),
	}
}

fn resolve<'a>(operand: &'a Operand, record: &'a Record) -> Option<EvalValue<'a>> {
	match operand {
		Operand::Identifier(name) => record.get(name).map(EvalValue::Text),
		Operand::Literal(literal) => Some(literal_value(literal)),
	}
}

fn is_equality(op: CompareOp) -> bool {
	matches!(op, CompareOp::Equal | CompareOp::NotEqual)
}

fn cmp_ord<T: PartialOrd>(left: T, right: T, op: CompareOp) -> bool {
	match op {
		CompareOp::Equal => left == right,
		CompareOp::NotEqual => left != right,
		CompareOp::LessThan => left < right,
		CompareOp::GreaterThan => left > right,
		CompareOp::LessThanOrEqual => left <= right,
		CompareOp::GreaterThanOrEqual => left >= right,
	}
}

fn compare(op: CompareOp, left: &EvalValue, right: &EvalValue) -> Result<bool, EvalError> {
	match (left, right) {
		(EvalValue::Num(l), EvalValue::Num(r)) => Ok(cmp_ord(l, r, op)),
		(EvalValue::Text(l), EvalValue::Num(r)) => match l.parse::<i64>() {
			Ok(l) => Ok(cmp_ord(&l, r, op)),
			Err(_) if is_equality(op) => Ok(op == CompareOp::NotEqual),
			Err(_) => Err(EvalError::Incomparable(l.to_string(), r.to_string())),
		},
		(EvalValue::Num(l), EvalValue::Text(r)) => match r.parse::<i64>() {
			Ok(r) => Ok(cmp_ord(l, &r, op)),
			Err(_) if is_equality(op) => Ok(op == CompareOp::NotEqual),
			Err(_) => Err(EvalError::Incomparable(l.to_string(), r.to_string())),
		},
		(EvalValue::Text(l), EvalValue::Text(r)) => Ok(cmp_ord(l, r, op)),
		(EvalValue::Bool(l), EvalValue::Bool(r)) if is_equality(op) => Ok(cmp_ord(l, r, op)),
		(EvalValue::Bool(l), EvalValue::Text(r)) if is_equality(op) => {
			let l = if *l { "True" } else { "False" };
			Ok(cmp_ord(&l, r, op))
		}
		(EvalValue::Text(l), EvalValue::Bool(r)) if is_equality(op) => {
			let r = if *r { "True" } else { "False" };
			Ok(cmp_ord(l, &r, op))
		}
		(EvalValue::Bool(_), EvalValue::Num(_)) | (EvalValue::Num(_), EvalValue::Bool(_))
			if is_equality(op) =>
		{
			Ok(op == CompareOp::NotEqual)
		}
		(l, r) => Err(EvalError::Incomparable(describe(l), describe(r))),
	}
}

fn describe(value: &EvalValue) -> String {
	match value {
		EvalValue::Text(text) => text.to_string(),
		EvalValue::Num(num) => num.to_string(),
		EvalValue::Bool(true) => "True".to_string(),
		EvalValue::Bool(false) => "False".to_string(),
	}
}

fn literal_matches(cell: &str, literal: &Literal) -> bool {
	match literal {
		Literal::Str(value) => cell == value,
		Literal::Num(value) => {
			cell == value
				|| match (cell.parse::<i64>(), value.parse::<i64>()) {
					(Ok(l), Ok(r)) => l == r,
					_ => false,
				}
		}
		Literal::Bool(value) => cell == if *value { "True" } else { "False" },
	}
}

fn truthy(operand: &Operand, record: &Record) -> bool {
	match operand {
		Operand::Identifier(name) => record.get(name).map(|v| !v.is_empty()).unwrap_or(false),
		Operand::Literal(Literal::Str(value)) => !value.is_empty(),
		Operand::Literal(Literal::Num(value)) => value.parse::<i64>().map(|n| n != 0).unwrap_or(true),
		Operand::Literal(Literal::Bool(value)) => *value,
	}
}

/// Evaluates a filter AST against one record. A comparison against a column
/// the record does not have never matches; an ordered comparison between
/// incompatible kinds is an error, which callers treat as "no rows from
/// this source".
pub fn check_record(node: &AstNode, record: &Record) -> Result<bool, EvalError> {
	match node {
		AstNode::Comparison { op, left, right } => {
			match (resolve(left, record), resolve(right, record)) {
				(Some(l), Some(r)) => compare(*op, &l, &r),
				_ => Ok(false),
			}
		}
		AstNode::Logical { op: LogicalOp::And, left, right } => {
			Ok(check_record(left, record)? && check_record(right, record)?)
		}
		AstNode::Logical { op: LogicalOp::Or, left, right } => {
			Ok(check_record(left, record)? || check_record(right, record)?)
		}
		AstNode::In { field, values } => match record.get(field) {
			Some(cell) => Ok(values.iter().any(|value| literal_matches(cell, value))),
			None => Ok(false),
		},
		AstNode::Operand(operand) => Ok(truthy(operand, record)),
	}
}
