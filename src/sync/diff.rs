//! Write-back row builders: the unconditional passive snapshot and the
//! changed-fields diff.
//!
//! The diff compares each active field against the `compare_*` baseline the
//! origin sent with the record, so unchanged fields are never re-uploaded and
//! concurrent origin-side edits are not clobbered.

use crate::record::normalize::{parse_bool, parse_int};
use serde_json::{Map, Value};

/// Build the flat passive-snapshot row: the application id plus every
/// configured passive field, absent values included as nulls.
pub fn passive_row(flat: &Map<String, Value>, fields: &[String]) -> Value {
	let mut row = Map::new();
	row.insert("aid".to_string(), flat.get("aid").cloned().unwrap_or(Value::Null));
	for field in fields {
		if field == "aid" {
			continue;
		}
		row.insert(
			field.clone(),
			flat.get(field).cloned().unwrap_or(Value::Null),
		);
	}
	Value::Object(row)
}

/// Build the changed-fields row: only active fields whose value differs from
/// the record's `compare_*` baseline. A record with no changed fields yields
/// no row at all.
pub fn changed_row(flat: &Map<String, Value>, fields: &[String]) -> Option<Value> {
	let mut row = Map::new();
	for field in fields {
		if field == "aid" {
			continue;
		}
		let current = flat.get(field).cloned().unwrap_or(Value::Null);
		let baseline = flat
			.get(&format!("compare_{}", field))
			.cloned()
			.unwrap_or(Value::Null);
		if !values_match(&current, &baseline) {
			row.insert(field.clone(), current);
		}
	}

	if row.is_empty() {
		None
	} else {
		row.insert("aid".to_string(), flat.get("aid").cloned().unwrap_or(Value::Null));
		Some(Value::Object(row))
	}
}

/// Compare a field against its baseline. Normalization coerces active fields
/// to booleans and integers while the `compare_*` baselines arrive as raw
/// tokens, so the baseline is coerced to the current value's type before
/// comparing.
fn values_match(current: &Value, baseline: &Value) -> bool {
	if current == baseline {
		return true;
	}
	match current {
		Value::Bool(b) => parse_bool(baseline) == Some(*b),
		Value::Number(n) => n.as_i64().is_some() && parse_int(baseline) == n.as_i64(),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn flat(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => panic!("expected object"),
		}
	}

	#[test]
	fn passive_row_selects_configured_fields() {
		let flat = flat(json!({
			"aid": "A1",
			"credits": "12",
			"campus_email": "a@b.edu",
			"unrelated": "x"
		}));
		let row = passive_row(&flat, &["credits".into(), "missing".into()]);
		assert_eq!(row, json!({"aid": "A1", "credits": "12", "missing": null}));
	}

	#[test]
	fn changed_row_keeps_only_differing_fields() {
		let flat = flat(json!({
			"aid": "A1",
			"credits": "12",
			"compare_credits": "9",
			"campus_email": "a@b.edu",
			"compare_campus_email": "a@b.edu"
		}));
		let row = changed_row(&flat, &["credits".into(), "campus_email".into()]).unwrap();
		assert_eq!(row, json!({"aid": "A1", "credits": "12"}));
	}

	#[test]
	fn record_with_no_changes_yields_no_row() {
		let flat = flat(json!({
			"aid": "A1",
			"credits": "12",
			"compare_credits": "12"
		}));
		assert_eq!(changed_row(&flat, &["credits".into()]), None);
	}

	#[test]
	fn coerced_fields_with_raw_baselines_are_not_false_positives() {
		use crate::record::normalize::{flatten, normalize};

		// Normalization types the active fields while the baselines stay as
		// the origin's raw tokens; equal values must not count as changes.
		let rec = normalize(flat(json!({
			"aid": "A1",
			"RaceWhite": "1",
			"compare_RaceWhite": "1",
			"Ethnicity": "2",
			"compare_Ethnicity": "2"
		})));
		let view = flatten(&rec);
		assert_eq!(
			changed_row(&view, &["RaceWhite".into(), "Ethnicity".into()]),
			None
		);
	}

	#[test]
	fn coerced_fields_with_differing_baselines_still_diff() {
		use crate::record::normalize::{flatten, normalize};

		let rec = normalize(flat(json!({
			"aid": "A1",
			"RaceWhite": "1",
			"compare_RaceWhite": "0",
			"Ethnicity": "2",
			"compare_Ethnicity": "2"
		})));
		let view = flatten(&rec);
		let row = changed_row(&view, &["RaceWhite".into(), "Ethnicity".into()]).unwrap();
		assert_eq!(row, json!({"aid": "A1", "RaceWhite": true}));
	}

	#[test]
	fn newly_present_field_counts_as_changed() {
		let flat = flat(json!({
			"aid": "A1",
			"campus_email": "a@b.edu"
		}));
		let row = changed_row(&flat, &["campus_email".into()]).unwrap();
		assert_eq!(row, json!({"aid": "A1", "campus_email": "a@b.edu"}));
	}
}
