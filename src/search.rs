use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::query_compile::{referenced_fields, to_engine_expr, FieldSet};
use crate::query_parsing::{parse_filter_tokens, AstNode};
use crate::timeparse::parse_time_bound;

/// Pattern searched when a query names no index.
pub const DEFAULT_INDEX_PATTERN: &str = "system_logs/**";

/// Everything the tabular engine needs to run one query: where to look,
/// what to filter on, and which time window applies. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPlan {
	pub index_patterns: Vec<String>,
	pub filter_expr: Option<String>,
	pub filter_ast: Option<AstNode>,
	pub columns: Vec<String>,
	pub earliest: Option<i64>,
	pub latest: Option<i64>,
	pub needs_time_filter: bool,
}

fn unquote(value: &str) -> &str {
	if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
		&value[1..value.len() - 1]
	} else {
		value
	}
}

fn extract_index_patterns(tokens: &[String]) -> (Vec<String>, Vec<String>) {
	let mut patterns = Vec::new();
	let mut rest = Vec::new();
	let mut i = 0;
	while i < tokens.len() {
		if tokens[i] == "index" && i + 2 < tokens.len() && tokens[i + 1] == "=" {
			patterns.push(unquote(&tokens[i + 2]).to_string());
			i += 3;
		} else {
			rest.push(tokens[i].clone());
			i += 1;
		}
	}
	if patterns.is_empty() {
		patterns.push(DEFAULT_INDEX_PATTERN.to_string());
	}
	(patterns, rest)
}

fn extract_time_bounds(tokens: &[String]) -> (Option<i64>, Option<i64>, Vec<String>) {
	let mut earliest = None;
	let mut latest = None;
	let mut rest = Vec::new();
	let mut i = 0;
	while i < tokens.len() {
		let name = tokens[i].as_str();
		if (name == "earliest" || name == "latest")
			&& i + 2 < tokens.len()
			&& tokens[i + 1] == "="
		{
			let value = unquote(&tokens[i + 2]);
			let epoch = parse_time_bound(value);
			if epoch.is_none() {
				warn!("could not resolve {} bound: '{}'", name, value);
			}
			if name == "earliest" {
				earliest = epoch;
			} else {
				latest = epoch;
			}
			i += 3;
		} else {
			rest.push(tokens[i].clone());
			i += 1;
		}
	}
	(earliest, latest, rest)
}

/// Turns a raw query token stream into a search plan. Never fails: a filter
/// that does not parse is logged and dropped, leaving the plan unfiltered,
/// so callers always get something they can run.
pub fn plan_search(raw_tokens: &[String]) -> SearchPlan {
	let (index_patterns, rest) = extract_index_patterns(raw_tokens);
	let (earliest, latest, filter_tokens) = extract_time_bounds(&rest);

	let mut filter_expr = None;
	let mut filter_ast = None;
	let mut fields = FieldSet::default();
	if !filter_tokens.is_empty() {
		match parse_filter_tokens(&filter_tokens) {
			Ok(ast) => {
				fields = referenced_fields(&ast);
				let expr = to_engine_expr(&ast);
				info!("compiled filter expression: {}", expr);
				filter_expr = Some(expr);
				filter_ast = Some(ast);
			}
			Err(err) => {
				warn!("filter parse failed, continuing unfiltered: {}", err);
			}
		}
	}

	let needs_time_filter = fields.needs_time_filter || earliest.is_some() || latest.is_some();

	SearchPlan {
		index_patterns,
		filter_expr,
		filter_ast,
		columns: fields.columns,
		earliest,
		latest,
		needs_time_filter,
	}
}
