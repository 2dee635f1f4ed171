use crate::mapping::{CodeMappingTable, MappingError};
use crate::record::CanonicalRecord;
use serde_json::Value;

/// Update payload in the destination's native shape, ready for the
/// demographic/academic stored-procedure updates.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePayload {
	pub application_id: String,
	pub person_code: String,

	pub gender: i64,
	pub ethnicity: Option<i64>,

	pub academic_year: String,
	pub academic_term: String,
	pub academic_session: String,
	pub program: String,
	pub degree: String,
	pub curriculum: String,

	pub primary_citizenship: Option<String>,
	pub secondary_citizenship: Option<String>,
	pub visa: Option<String>,
	pub marital_status: Option<String>,
	pub veteran: Option<String>,

	pub race_american_indian: Option<bool>,
	pub race_asian: Option<bool>,
	pub race_african_american: Option<bool>,
	pub race_native_hawaiian: Option<bool>,
	pub race_white: Option<bool>,

	pub proposed_decision: Option<String>,
	pub create_datetime: Option<String>,
	pub sms_opt_in: Option<String>,
}

/// Sessions are not modeled by the origin system; everything lands in the
/// first session of the term.
const ACADEMIC_SESSION: &str = "01";

/// Project a canonical record into the destination-native update shape.
///
/// Absent optional codes pass through as absent; a present code with no
/// mapping entry for its category is an error.
pub fn project_update(
	rec: &CanonicalRecord,
	person_code: &str,
	table: &CodeMappingTable,
) -> Result<UpdatePayload, MappingError> {
	// Gender values are hardcoded into the destination API; absent and 2 both
	// land on 3.
	let gender = match rec.gender {
		None => 3,
		Some(0) => 1,
		Some(1) => 2,
		Some(2) => 3,
		Some(other) => {
			return Err(MappingError::MissingEntry {
				category: "Gender".to_string(),
				code: other.to_string(),
			});
		}
	};

	let year_term = rec.year_term.as_deref().unwrap_or("");
	let program = rec.program.as_deref().unwrap_or("");
	let degree = rec.degree.as_deref().unwrap_or("");

	let academic_year = table
		.lookup_field("AcademicTerm", "PCYearCodeValue", year_term)?
		.to_string();
	let academic_term = table
		.lookup_field("AcademicTerm", "PCTermCodeValue", year_term)?
		.to_string();
	let mapped_program = table.lookup("AcademicLevel", program)?.to_string();
	let mapped_degree = table
		.lookup_field("AcademicProgram", "PCDegreeCodeValue", degree)?
		.to_string();
	// The curriculum key mirrors the program mapping.
	let curriculum = table.lookup("AcademicLevel", program)?.to_string();

	let primary_citizenship = map_optional(table, "CitizenshipStatus", &rec.citizenship_status)?;
	let secondary_citizenship =
		map_optional(table, "CitizenshipStatus", &rec.secondary_citizenship)?;
	let visa = map_optional(table, "Visa", &rec.visa)?;
	let marital_status = map_optional(table, "MaritalStatus", &rec.marital_status)?;
	let veteran = map_optional(table, "Veteran", &rec.veteran)?;

	let sms_opt_in = rec.extras.get("SMSOptIn").and_then(|v| match v {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	});

	Ok(UpdatePayload {
		application_id: rec.application_id.clone(),
		person_code: person_code.to_string(),
		gender,
		ethnicity: rec.ethnicity,
		academic_year,
		academic_term,
		academic_session: ACADEMIC_SESSION.to_string(),
		program: mapped_program,
		degree: mapped_degree,
		curriculum,
		primary_citizenship,
		secondary_citizenship,
		visa,
		marital_status,
		veteran,
		race_american_indian: rec.race_american_indian,
		race_asian: rec.race_asian,
		race_african_american: rec.race_african_american,
		race_native_hawaiian: rec.race_native_hawaiian,
		race_white: rec.race_white,
		proposed_decision: rec.proposed_decision.clone(),
		create_datetime: rec.create_datetime.clone(),
		sms_opt_in,
	})
}

fn map_optional(
	table: &CodeMappingTable,
	category: &str,
	code: &Option<String>,
) -> Result<Option<String>, MappingError> {
	match code {
		Some(code) => Ok(Some(table.lookup(category, code)?.to_string())),
		None => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::record::normalize::normalize;
	use serde_json::json;

	const SAMPLE_MAPPING: &str = r#"
		<Mappings>
			<AcademicTerm NumberOfPowerCampusFieldsMapped="2" PCFirstField="Year" PCSecondField="Term">
				<Row RCCodeValue="Fall 2024" PCYearCodeValue="2024" PCTermCodeValue="FALL"/>
			</AcademicTerm>
			<AcademicLevel NumberOfPowerCampusFieldsMapped="1">
				<Row RCCodeValue="Undergraduate" PCCodeValue="UNDERG"/>
			</AcademicLevel>
			<AcademicProgram NumberOfPowerCampusFieldsMapped="2" PCFirstField="Degree" PCSecondField="Curriculum">
				<Row RCCodeValue="Bachelor of Science" PCDegreeCodeValue="BS" PCCurriculumCodeValue="GEN"/>
			</AcademicProgram>
			<CitizenshipStatus NumberOfPowerCampusFieldsMapped="1">
				<Row RCCodeValue="US Citizen" PCCodeValue="US"/>
			</CitizenshipStatus>
			<Visa NumberOfPowerCampusFieldsMapped="1">
				<Row RCCodeValue="F-1 Student" PCCodeValue="F1"/>
			</Visa>
			<MaritalStatus NumberOfPowerCampusFieldsMapped="1">
				<Row RCCodeValue="Single" PCCodeValue="S"/>
			</MaritalStatus>
			<Veteran NumberOfPowerCampusFieldsMapped="1">
				<Row RCCodeValue="4" PCCodeValue="VET"/>
			</Veteran>
		</Mappings>
	"#;

	fn table() -> CodeMappingTable {
		CodeMappingTable::from_xml_str(SAMPLE_MAPPING).expect("mapping parse failed")
	}

	fn base_record(extra: serde_json::Value) -> CanonicalRecord {
		let mut map = match json!({
			"aid": "A1",
			"YearTerm": "Fall 2024",
			"Program": "Undergraduate",
			"Degree": "Bachelor of Science"
		}) {
			serde_json::Value::Object(map) => map,
			_ => unreachable!(),
		};
		if let serde_json::Value::Object(extra) = extra {
			map.extend(extra);
		}
		normalize(map)
	}

	#[test]
	fn gender_mapping_is_total_and_fixed() {
		let cases = [(None, 3), (Some("0"), 1), (Some("1"), 2), (Some("2"), 3)];
		for (input, expected) in cases {
			let rec = match input {
				Some(g) => base_record(json!({ "Gender": g })),
				None => base_record(json!({})),
			};
			let payload = project_update(&rec, "P000000001", &table()).unwrap();
			assert_eq!(payload.gender, expected, "gender input {:?}", input);
		}
	}

	#[test]
	fn out_of_table_gender_is_a_mapping_failure() {
		let rec = base_record(json!({"Gender": "7"}));
		let err = project_update(&rec, "P000000001", &table()).unwrap_err();
		assert!(matches!(
			err,
			MappingError::MissingEntry { ref category, .. } if category == "Gender"
		));
	}

	#[test]
	fn academic_selectors_resolve_through_the_table() {
		let rec = base_record(json!({}));
		let payload = project_update(&rec, "P000000001", &table()).unwrap();
		assert_eq!(payload.academic_year, "2024");
		assert_eq!(payload.academic_term, "FALL");
		assert_eq!(payload.academic_session, "01");
		assert_eq!(payload.program, "UNDERG");
		assert_eq!(payload.degree, "BS");
		assert_eq!(payload.curriculum, "UNDERG");
	}

	#[test]
	fn absent_optional_codes_pass_through_absent() {
		let rec = base_record(json!({}));
		let payload = project_update(&rec, "P000000001", &table()).unwrap();
		assert_eq!(payload.visa, None);
		assert_eq!(payload.marital_status, None);
		assert_eq!(payload.veteran, None);
		assert_eq!(payload.primary_citizenship, None);
	}

	#[test]
	fn present_codes_map_or_fail() {
		let rec = base_record(json!({
			"Visa": "F-1 Student",
			"CitizenshipStatus": "US Citizen",
			"MaritalStatus": "Single",
			"Veteran": "4"
		}));
		let payload = project_update(&rec, "P000000001", &table()).unwrap();
		assert_eq!(payload.visa.as_deref(), Some("F1"));
		assert_eq!(payload.primary_citizenship.as_deref(), Some("US"));
		assert_eq!(payload.marital_status.as_deref(), Some("S"));
		assert_eq!(payload.veteran.as_deref(), Some("VET"));

		let rec = base_record(json!({"Visa": "B-2 Visitor"}));
		let err = project_update(&rec, "P000000001", &table()).unwrap_err();
		assert!(matches!(err, MappingError::MissingEntry { .. }));
	}
}
