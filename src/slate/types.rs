use serde::{Deserialize, Serialize};

/// The origin system wraps every feed and upload body in this envelope so the
/// JSON stays convertible to XML on its side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowEnvelope<T> {
	#[serde(default = "Vec::new")]
	pub row: Vec<T>,
}

/// Which origin write-back target a row upload is bound for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
	/// Unconditional flat snapshot of every record.
	Passive,
	/// Only fields whose value differs from the last-known origin value.
	Changed,
	/// Education rows the destination could not match to a school.
	Schools,
}

/// One row of the financial-aid checklist upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FaChecklistRow {
	pub app_id: String,
	pub code: String,
	pub status: String,
	pub date: String,
}

/// Render checklist rows in the tab-separated format the origin importer
/// requires.
pub fn fa_checklist_body(rows: &[FaChecklistRow]) -> String {
	let mut body = String::from("AppID\tCode\tStatus\tDate");
	for row in rows {
		body.push('\n');
		body.push_str(&format!(
			"{}\t{}\t{}\t{}",
			row.app_id, row.code, row.status, row.date
		));
	}
	body
}

/// Error types for origin-system calls
#[derive(Debug, thiserror::Error)]
pub enum SlateError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("upload target '{0}' is not configured")]
	TargetNotConfigured(&'static str),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fa_checklist_renders_tab_separated_lines() {
		let rows = vec![
			FaChecklistRow {
				app_id: "A1".to_string(),
				code: "FAFSA".to_string(),
				status: "Y".to_string(),
				date: "2026-08-01".to_string(),
			},
			FaChecklistRow {
				app_id: "A2".to_string(),
				code: "VERIF".to_string(),
				status: "N".to_string(),
				date: "2026-08-02".to_string(),
			},
		];
		let body = fa_checklist_body(&rows);
		let lines: Vec<&str> = body.lines().collect();
		assert_eq!(lines[0], "AppID\tCode\tStatus\tDate");
		assert_eq!(lines[1], "A1\tFAFSA\tY\t2026-08-01");
		assert_eq!(lines[2], "A2\tVERIF\tN\t2026-08-02");
	}
}
