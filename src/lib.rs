mod engine;
mod query_compile;
mod query_eval;
mod query_parsing;
mod search;
mod timeparse;

pub use engine::{pattern_matches, run_plan, Table, TIMESTAMP_COLUMN};
pub use query_compile::{
	referenced_fields, to_engine_expr, FieldSet, RESERVED_EARLIEST, RESERVED_LATEST,
};
pub use query_eval::{check_record, Cell, EvalError, Record};
pub use query_parsing::{
	parse_filter_tokens, tokenize, AstNode, CompareOp, Literal, LogicalOp, Operand, ParseError,
	Parser, Token,
};
pub use search::{plan_search, SearchPlan, DEFAULT_INDEX_PATTERN};
pub use timeparse::{parse_datetime_to_epoch, parse_time_bound};
