use chrono::{NaiveDate, NaiveDateTime};

// Ordered fallback chain. Order is load-bearing: ambiguous inputs such as
// 01/02/2023 must resolve month-first, so looser or day-first patterns sit
// after the ones they would otherwise shadow.
const PATTERNS: &[(&str, bool)] = &[
	("%Y-%m-%d %H:%M:%S", false),
	("%m/%d/%Y %H:%M:%S", false),
	("%m-%d-%Y %H:%M:%S", false),
	("%m/%d/%Y", true),
	("%m-%d-%Y", true),
	("%m/%d/%y", true),
	("%m-%d-%y", true),
	("%d-%m-%Y %H:%M:%S", false),
	("%d/%m/%Y %H:%M:%S", false),
	("%Y/%m/%d %H:%M:%S", false),
	("%Y-%m-%d", true),
	("%Y-%m-%dT%H:%M:%S", false),
	("%B %d, %Y %H:%M:%S", false),
	("%d %B %Y %H:%M:%S", false),
	("%m/%d/%Y %I:%M:%S %p", false),
	("%m-%d-%Y %I:%M:%S %p", false),
	("%Y%m%d%H%M%S", false),
	("%Y-W%W-%w %H:%M:%S", false),
	("%Y-W%U-%w %H:%M:%S", false),
];

/// Parses a free-form date string into epoch seconds, interpreting the
/// parsed fields as UTC. A pattern only counts as a match when it consumes
/// the entire string. Returns None when every pattern fails.
pub fn parse_datetime_to_epoch(text: &str) -> Option<i64> {
	let candidate = match text.find('.') {
		Some(pos) => &text[..pos],
		None => text,
	};

	for (pattern, date_only) in PATTERNS {
		let parsed = if *date_only {
			NaiveDate::parse_from_str(candidate, pattern)
				.ok()
				.and_then(|date| date.and_hms_opt(0, 0, 0))
		} else {
			NaiveDateTime::parse_from_str(candidate, pattern).ok()
		};
		if let Some(datetime) = parsed {
			return Some(datetime.and_utc().timestamp());
		}
	}

	log::warn!("failed to parse date: '{}'", text);
	None
}

/// Resolves an earliest/latest style value. A bare digit run is already an
/// epoch and is taken as-is; anything else goes through the pattern chain.
pub fn parse_time_bound(text: &str) -> Option<i64> {
	if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
		if let Ok(epoch) = text.parse::<i64>() {
			return Some(epoch);
		}
	}
	parse_datetime_to_epoch(text)
}
