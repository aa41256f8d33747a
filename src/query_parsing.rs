use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use regex::Regex;

static IDENTIFIER_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
	Equal,
	NotEqual,
	LessThan,
	GreaterThan,
	LessThanOrEqual,
	GreaterThanOrEqual,
}

impl CompareOp {
	pub fn symbol(&self) -> &'static str {
		match self {
			CompareOp::Equal => "=",
			CompareOp::NotEqual => "!=",
			CompareOp::LessThan => "<",
			CompareOp::GreaterThan => ">",
			CompareOp::LessThanOrEqual => "<=",
			CompareOp::GreaterThanOrEqual => ">=",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
	OpenParen,
	CloseParen,
	Comma,
	And,
	Or,
	In,
	Compare(CompareOp),
	Identifier(String),
	StringLiteral(String),
	NumberLiteral(String),
	BooleanLiteral(bool),
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::OpenParen => write!(f, "("),
			Token::CloseParen => write!(f, ")"),
			Token::Comma => write!(f, ","),
			Token::And => write!(f, "AND"),
			Token::Or => write!(f, "OR"),
			Token::In => write!(f, "IN"),
			Token::Compare(op) => write!(f, "{}", op.symbol()),
			Token::Identifier(name) => write!(f, "{}", name),
			Token::StringLiteral(value) => write!(f, "\"{}\"", value),
			Token::NumberLiteral(value) => write!(f, "{}", value),
			Token::BooleanLiteral(true) => write!(f, "True"),
			Token::BooleanLiteral(false) => write!(f, "False"),
		}
	}
}

/// Classifies raw query tokens into typed tokens. Classification is total:
/// every raw token becomes some token, so the output always has the same
/// length as the input.
pub fn tokenize(raw_tokens: &[String]) -> Vec<Token> {
	raw_tokens.iter().map(|raw| classify(raw)).collect()
}

fn classify(raw: &str) -> Token {
	match raw.to_ascii_uppercase().as_str() {
		"(" => return Token::OpenParen,
		")" => return Token::CloseParen,
		"," => return Token::Comma,
		"AND" => return Token::And,
		"OR" => return Token::Or,
		"IN" => return Token::In,
		"=" => return Token::Compare(CompareOp::Equal),
		"!=" => return Token::Compare(CompareOp::NotEqual),
		"<" => return Token::Compare(CompareOp::LessThan),
		">" => return Token::Compare(CompareOp::GreaterThan),
		"<=" => return Token::Compare(CompareOp::LessThanOrEqual),
		">=" => return Token::Compare(CompareOp::GreaterThanOrEqual),
		_ => {}
	}
	if raw == "True" {
		return Token::BooleanLiteral(true);
	}
	if raw == "False" {
		return Token::BooleanLiteral(false);
	}
	if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
		return Token::StringLiteral(raw[1..raw.len() - 1].to_string());
	}
	if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
		return Token::NumberLiteral(raw.to_string());
	}
	Token::Identifier(raw.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
	Str(String),
	Num(String),
	Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
	Identifier(String),
	Literal(Literal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
	And,
	Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNode {
	Comparison {
		op: CompareOp,
		left: Operand,
		right: Operand,
	},
	Logical {
		op: LogicalOp,
		left: Box<AstNode>,
		right: Box<AstNode>,
	},
	In {
		field: String,
		values: Vec<Literal>,
	},
	Operand(Operand),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("expected ')' to close grouped expression")]
	UnclosedParen,
	#[error("invalid identifier: '{0}'")]
	InvalidIdentifier(String),
	#[error("left side of IN must be a field name")]
	InNeedsIdentifier,
	#[error("expected '(' after IN")]
	InNeedsList,
	#[error("IN list has no values")]
	EmptyInList,
	#[error("unexpected token in IN list: '{0}'")]
	BadInValue(String),
	#[error("unexpected end of input")]
	UnexpectedEnd,
	#[error("unexpected token: '{0}'")]
	UnexpectedToken(String),
	#[error("unexpected input after expression: '{0}'")]
	TrailingInput(String),
}

/// Recursive descent over an immutable token sequence with an explicit
/// cursor. Grammar, low to high precedence: OR, AND (explicit or implied by
/// adjacency), comparison / IN.
pub struct Parser {
	tokens: Vec<Token>,
	pos: usize,
}

impl Parser {
	pub fn new(tokens: Vec<Token>) -> Parser {
		Parser { tokens, pos: 0 }
	}

	/// Parses a whole expression. The entire token sequence must be
	/// consumed; leftovers are an error rather than silently dropped.
	pub fn parse(mut self) -> Result<AstNode, ParseError> {
		let node = self.parse_expression()?;
		if let Some(token) = self.tokens.get(self.pos) {
			return Err(ParseError::TrailingInput(token.to_string()));
		}
		Ok(node)
	}

	fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
		self.parse_or()
	}

	fn parse_or(&mut self) -> Result<AstNode, ParseError> {
		let mut node = self.parse_and()?;
		while self.eat(&Token::Or) {
			let right = self.parse_and()?;
			node = AstNode::Logical {
				op: LogicalOp::Or,
				left: Box::new(node),
				right: Box::new(right),
			};
		}
		Ok(node)
	}

	fn parse_and(&mut self) -> Result<AstNode, ParseError> {
		let mut node = self.parse_comparison()?;
		// Adjacency implies AND: a=1 b=2 conjoins exactly like a=1 AND b=2.
		while self.eat(&Token::And) || self.starts_comparison() {
			let right = self.parse_comparison()?;
			node = AstNode::Logical {
				op: LogicalOp::And,
				left: Box::new(node),
				right: Box::new(right),
			};
		}
		Ok(node)
	}

	fn parse_comparison(&mut self) -> Result<AstNode, ParseError> {
		if self.eat(&Token::OpenParen) {
			let node = self.parse_expression()?;
			if !self.eat(&Token::CloseParen) {
				return Err(ParseError::UnclosedParen);
			}
			return Ok(node);
		}

		let left = self.parse_operand()?;
		match self.tokens.get(self.pos) {
			Some(Token::Compare(op)) => {
				let op = *op;
				self.pos += 1;
				let right = self.parse_operand()?;
				Ok(AstNode::Comparison { op, left, right })
			}
			Some(Token::In) => {
				self.pos += 1;
				let field = match left {
					Operand::Identifier(name) => name,
					_ => return Err(ParseError::InNeedsIdentifier),
				};
				let values = self.parse_in_values()?;
				Ok(AstNode::In { field, values })
			}
			_ => Ok(AstNode::Operand(left)),
		}
	}

	fn parse_operand(&mut self) -> Result<Operand, ParseError> {
		let token = self.next_token().ok_or(ParseError::UnexpectedEnd)?;
		match token {
			Token::Identifier(name) => {
				if !IDENTIFIER_RE.is_match(&name) {
					return Err(ParseError::InvalidIdentifier(name));
				}
				Ok(Operand::Identifier(name))
			}
			Token::StringLiteral(value) => Ok(Operand::Literal(Literal::Str(value))),
			Token::NumberLiteral(value) => Ok(Operand::Literal(Literal::Num(value))),
			Token::BooleanLiteral(value) => Ok(Operand::Literal(Literal::Bool(value))),
			other => Err(ParseError::UnexpectedToken(other.to_string())),
		}
	}

	fn parse_in_values(&mut self) -> Result<Vec<Literal>, ParseError> {
		if !self.eat(&Token::OpenParen) {
			return Err(ParseError::InNeedsList);
		}
		let mut values = Vec::new();
		loop {
			let token = self.next_token().ok_or(ParseError::UnexpectedEnd)?;
			match token {
				Token::CloseParen => break,
				Token::Comma => continue,
				Token::StringLiteral(value) => values.push(Literal::Str(value)),
				Token::NumberLiteral(value) => values.push(Literal::Num(value)),
				Token::BooleanLiteral(value) => values.push(Literal::Bool(value)),
				// A bare word in a value list is taken as a string.
				Token::Identifier(name) => values.push(Literal::Str(name)),
				other => return Err(ParseError::BadInValue(other.to_string())),
			}
		}
		if values.is_empty() {
			return Err(ParseError::EmptyInList);
		}
		Ok(values)
	}

	fn starts_comparison(&self) -> bool {
		matches!(
			self.tokens.get(self.pos),
			Some(Token::Identifier(_))
				| Some(Token::StringLiteral(_))
				| Some(Token::NumberLiteral(_))
				| Some(Token::OpenParen)
		)
	}

	fn eat(&mut self, expected: &Token) -> bool {
		if self.tokens.get(self.pos) == Some(expected) {
			self.pos += 1;
			return true;
		}
		false
	}

	fn next_token(&mut self) -> Option<Token> {
		let token = self.tokens.get(self.pos).cloned()?;
		self.pos += 1;
		Some(token)
	}
}

/// Tokenizes and parses a raw filter token sequence in one step.
pub fn parse_filter_tokens(raw_tokens: &[String]) -> Result<AstNode, ParseError> {
	Parser::new(tokenize(raw_tokens)).parse()
}
