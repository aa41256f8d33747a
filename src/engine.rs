use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::query_eval::{check_record, Record};
use crate::search::SearchPlan;
use crate::timeparse::parse_time_bound;

/// Column a source must carry when a query needs time-range filtering; each
/// row's raw value is normalized into an epoch before the bounds apply.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
	pub name: String,
	pub columns: Vec<String>,
	pub rows: Vec<Vec<String>>,
}

impl Table {
	pub fn new(name: &str, columns: &[&str]) -> Table {
		Table {
			name: name.to_string(),
			columns: columns.iter().map(|c| c.to_string()).collect(),
			rows: Vec::new(),
		}
	}

	pub fn push_row(&mut self, row: &[&str]) {
		self.rows.push(row.iter().map(|v| v.to_string()).collect());
	}

	fn record(&self, row: &[String]) -> Record {
		Record::new(
			self.columns
				.iter()
				.cloned()
				.zip(row.iter().cloned())
				.collect(),
		)
	}
}

/// Matches an index pattern against a source name. `*` matches any run of
/// characters, including path separators; everything else is literal.
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
	fn matches(pattern: &[u8], name: &[u8]) -> bool {
		match pattern.split_first() {
			None => name.is_empty(),
			Some((b'*', rest)) => (0..=name.len()).any(|skip| matches(rest, &name[skip..])),
			Some((ch, rest)) => name.first() == Some(ch) && matches(rest, &name[1..]),
		}
	}
	matches(pattern.as_bytes(), name.as_bytes())
}

/// Runs a compiled plan over in-memory tables. Sources that lack a required
/// column are skipped, a source whose filter evaluation fails contributes
/// nothing, and the survivors are concatenated in input order.
pub fn run_plan(plan: &SearchPlan, tables: &[Table]) -> Vec<Record> {
	let mut results = Vec::new();
	for pattern in &plan.index_patterns {
		info!("processing index pattern: {}", pattern);
		for table in tables.iter().filter(|t| pattern_matches(pattern, &t.name)) {
			match scan_table(plan, table) {
				Ok(mut records) => results.append(&mut records),
				Err(err) => {
					warn!(
						"filter failed on '{}', treating as empty: {}",
						table.name, err
					);
				}
			}
		}
	}
	results
}

fn scan_table(plan: &SearchPlan, table: &Table) -> Result<Vec<Record>, crate::query_eval::EvalError> {
	for column in &plan.columns {
		if !table.columns.iter().any(|c| c == column) {
			info!("skipping '{}': missing column '{}'", table.name, column);
			return Ok(Vec::new());
		}
	}

	let timestamp_idx = table.columns.iter().position(|c| c == TIMESTAMP_COLUMN);
	if plan.needs_time_filter && timestamp_idx.is_none() {
		info!(
			"skipping '{}': no '{}' column for time filtering",
			table.name, TIMESTAMP_COLUMN
		);
		return Ok(Vec::new());
	}

	let mut kept = Vec::new();
	for row in &table.rows {
		if plan.needs_time_filter {
			let epoch = timestamp_idx
				.and_then(|idx| row.get(idx))
				.and_then(|value| parse_time_bound(value));
			// Rows whose timestamp cannot be normalized are filtered out.
			let epoch = match epoch {
				Some(epoch) => epoch,
				None => continue,
			};
			if plan.earliest.map_or(false, |lo| epoch < lo) {
				continue;
			}
			if plan.latest.map_or(false, |hi| epoch > hi) {
				continue;
			}
		}

		let record = table.record(row);
		if let Some(ast) = &plan.filter_ast {
			if !check_record(ast, &record)? {
				continue;
			}
		}
		kept.push(record);
	}
	Ok(kept)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::search::plan_search;

	fn raw(tokens: &[&str]) -> Vec<String> {
		tokens.iter().map(|t| t.to_string()).collect()
	}

	fn web_table() -> Table {
		let mut table = Table::new("web_logs/front", &["timestamp", "host", "status", "code"]);
		table.push_row(&["2023-06-01 10:00:00", "web-1", "ok", "200"]);
		table.push_row(&["2023-06-02 10:00:00", "web-2", "fail", "500"]);
		table.push_row(&["2023-06-03 10:00:00", "web-1", "ok", "204"]);
		table
	}

	fn app_table() -> Table {
		let mut table = Table::new("app_logs", &["timestamp", "host", "status"]);
		table.push_row(&["2023-06-02 09:00:00", "app-1", "ok"]);
		table
	}

	#[test]
	fn filters_rows_across_matching_tables() {
		let plan = plan_search(&raw(&["index", "=", "\"*logs*\"", "status", "=", "\"ok\""]));
		let results = run_plan(&plan, &[web_table(), app_table()]);
		assert_eq!(results.len(), 3);
		assert_eq!(results[0].get("host"), Some("web-1"));
		assert_eq!(results[2].get("host"), Some("app-1"));
	}

	#[test]
	fn unmatched_pattern_finds_nothing() {
		let plan = plan_search(&raw(&["index", "=", "\"metrics/**\"", "status", "=", "\"ok\""]));
		assert!(run_plan(&plan, &[web_table()]).is_empty());
	}

	#[test]
	fn table_missing_required_column_is_skipped() {
		let plan = plan_search(&raw(&["index", "=", "\"*\"", "code", "=", "200"]));
		let results = run_plan(&plan, &[web_table(), app_table()]);
		// app_logs has no code column and contributes nothing.
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].get("host"), Some("web-1"));
	}

	#[test]
	fn bounds_cut_the_window() {
		let plan = plan_search(&raw(&[
			"index", "=", "\"web_logs/*\"", "earliest", "=", "\"2023-06-02\"", "latest", "=",
			"\"2023-06-02 23:59:59\"",
		]));
		let results = run_plan(&plan, &[web_table()]);
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].get("host"), Some("web-2"));
	}

	#[test]
	fn unparseable_timestamps_are_dropped_when_time_filtered() {
		let mut table = Table::new("web_logs/bad", &["timestamp", "host"]);
		table.push_row(&["not a time", "web-9"]);
		table.push_row(&["2023-06-01 00:00:00", "web-1"]);
		let plan = plan_search(&raw(&["index", "=", "\"web_logs/*\"", "earliest", "=", "1"]));
		let results = run_plan(&plan, &[table]);
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].get("host"), Some("web-1"));
	}

	#[test]
	fn time_filter_skips_tables_without_timestamp() {
		let mut table = Table::new("web_logs/no_ts", &["host"]);
		table.push_row(&["web-1"]);
		let plan = plan_search(&raw(&["index", "=", "\"web_logs/*\"", "earliest", "=", "1"]));
		assert!(run_plan(&plan, &[table]).is_empty());
	}

	#[test]
	fn integer_timestamps_pass_through_the_fast_path() {
		let mut table = Table::new("web_logs/epochs", &["timestamp", "host"]);
		table.push_row(&["1685577600", "web-1"]);
		table.push_row(&["1685836800", "web-2"]);
		let plan = plan_search(&raw(&[
			"index", "=", "\"web_logs/*\"", "latest", "=", "1685600000",
		]));
		let results = run_plan(&plan, &[table]);
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].get("host"), Some("web-1"));
	}

	#[test]
	fn failing_source_contributes_nothing() {
		// status is not numeric, so the ordered comparison errors out and
		// the whole source degrades to empty instead of aborting the query.
		let plan = plan_search(&raw(&["index", "=", "\"*\"", "status", "<", "5"]));
		let results = run_plan(&plan, &[web_table(), app_table()]);
		assert!(results.is_empty());
	}

	#[test]
	fn unfiltered_plan_returns_everything() {
		let plan = plan_search(&raw(&["index", "=", "\"*\""]));
		let results = run_plan(&plan, &[web_table(), app_table()]);
		assert_eq!(results.len(), 4);
	}

	#[test]
	fn pattern_wildcards() {
		assert!(pattern_matches("web_logs/*", "web_logs/front"));
		assert!(pattern_matches("system_logs/**", "system_logs/2024/app"));
		assert!(pattern_matches("*_logs", "app_logs"));
		assert!(pattern_matches("app_logs", "app_logs"));
		assert!(!pattern_matches("app_logs", "app_logs/extra"));
		assert!(!pattern_matches("web_logs/*", "app_logs"));
	}
}
