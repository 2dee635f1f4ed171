use crate::config::Defaults;
use crate::mapping::{CodeMappingTable, MappingError};
use crate::record::CanonicalRecord;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Registration/creation payload in the destination API's intake shape.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreationPayload {
	pub application_number: String,
	pub prospect_id: Option<String>,

	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub email: Option<String>,
	pub campus: Option<String>,
	pub birth_date: Option<String>,
	pub create_date_time: Option<String>,

	pub prefix: Option<String>,
	pub middle_name: Option<String>,
	pub last_name_prefix: Option<String>,
	pub suffix: Option<String>,
	pub nickname: Option<String>,
	pub government_id: Option<String>,
	pub legal_name: Option<String>,
	pub visa: Option<String>,
	pub citizenship_status: Option<String>,
	pub primary_citizenship: Option<String>,
	pub secondary_citizenship: Option<String>,
	pub marital_status: Option<String>,
	pub proposed_decision: Option<String>,
	pub religion: Option<String>,
	pub former_last_name: Option<String>,
	pub former_first_name: Option<String>,
	pub primary_language: Option<String>,
	pub country_of_birth: Option<String>,
	pub disabilities: Option<String>,
	pub college_attend_status: Option<String>,
	pub commitment: Option<String>,
	pub status: Option<String>,

	pub race_american_indian: Option<bool>,
	pub race_asian: Option<bool>,
	pub race_african_american: Option<bool>,
	pub race_native_hawaiian: Option<bool>,
	pub race_white: Option<bool>,
	#[serde(rename = "IsInterestedInCampusHousing")]
	pub interested_in_campus_housing: Option<bool>,
	#[serde(rename = "IsInterestedInFinancialAid")]
	pub interested_in_financial_aid: Option<bool>,

	pub ethnicity: Option<i64>,
	pub gender: Option<i64>,

	pub government_date_of_entry: String,

	// Not computed from the feed; the destination requires the keys.
	pub relationships: Vec<Value>,
	pub activities: Vec<Value>,
	pub emergency_contacts: Vec<Value>,
	pub education: Vec<Value>,

	pub addresses: Vec<AddressPayload>,
	pub phone_numbers: Vec<PhonePayload>,

	pub veteran: i64,
	pub veteran_status: bool,

	pub programs: Vec<ProgramPayload>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AddressPayload {
	#[serde(rename = "Type")]
	pub type_: i64,
	pub line1: Option<String>,
	pub line2: Option<String>,
	pub line3: Option<String>,
	pub line4: Option<String>,
	pub city: Option<String>,
	pub state_province: Option<String>,
	pub postal_code: Option<String>,
	pub county: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PhonePayload {
	#[serde(rename = "Type")]
	pub type_: i64,
	pub country: Option<String>,
	pub number: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ProgramPayload {
	pub program: Option<String>,
	pub degree: Option<String>,
	pub curriculum: Option<String>,
}

/// Strip everything but digits from a phone number and drop a leading US
/// country code.
pub fn format_phone_number(raw: &str) -> String {
	let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
	if digits.len() == 11 && digits.starts_with('1') {
		digits[1..].to_string()
	} else {
		digits
	}
}

/// Project a canonical record into the creation/registration payload.
///
/// Academic selectors that are present must have mapping entries; that check
/// happens here so a record with a broken mapping fails before the intake POST
/// rather than after it.
pub fn project_creation(
	rec: &CanonicalRecord,
	table: &CodeMappingTable,
	defaults: &Defaults,
) -> Result<CreationPayload, MappingError> {
	if let Some(year_term) = &rec.year_term {
		table.lookup_field("AcademicTerm", "PCYearCodeValue", year_term)?;
		table.lookup_field("AcademicTerm", "PCTermCodeValue", year_term)?;
	}
	if let Some(program) = &rec.program {
		table.lookup("AcademicLevel", program)?;
	}
	if let Some(degree) = &rec.degree {
		table.lookup_field("AcademicProgram", "PCDegreeCodeValue", degree)?;
	}

	let (veteran, veteran_status) = match &rec.veteran {
		None => (0, false),
		Some(code) => {
			let parsed = code.trim().parse().map_err(|_| {
				MappingError::Document(format!("veteran code '{}' is not numeric", code))
			})?;
			(parsed, true)
		}
	};

	Ok(CreationPayload {
		application_number: rec.application_id.clone(),
		prospect_id: rec.prospect_id.clone(),

		first_name: rec.first_name.clone(),
		last_name: rec.last_name.clone(),
		email: rec.email.clone(),
		campus: rec.campus.clone(),
		birth_date: rec.birth_date.clone(),
		create_date_time: rec.create_datetime.clone(),

		prefix: rec.prefix.clone(),
		middle_name: rec.middle_name.clone(),
		last_name_prefix: rec.last_name_prefix.clone(),
		suffix: rec.suffix.clone(),
		nickname: rec.nickname.clone(),
		government_id: rec.government_id.clone(),
		legal_name: rec.legal_name.clone(),
		visa: rec.visa.clone(),
		citizenship_status: rec.citizenship_status.clone(),
		primary_citizenship: rec.primary_citizenship.clone(),
		secondary_citizenship: rec.secondary_citizenship.clone(),
		marital_status: rec.marital_status.clone(),
		proposed_decision: rec.proposed_decision.clone(),
		religion: rec.religion.clone(),
		former_last_name: rec.former_last_name.clone(),
		former_first_name: rec.former_first_name.clone(),
		primary_language: rec.primary_language.clone(),
		country_of_birth: rec.country_of_birth.clone(),
		disabilities: rec.disabilities.clone(),
		college_attend_status: rec.college_attend_status.clone(),
		commitment: rec.commitment.clone(),
		status: rec.status.clone(),

		race_american_indian: rec.race_american_indian,
		race_asian: rec.race_asian,
		race_african_american: rec.race_african_american,
		race_native_hawaiian: rec.race_native_hawaiian,
		race_white: rec.race_white,
		interested_in_campus_housing: rec.interested_in_campus_housing,
		interested_in_financial_aid: rec.interested_in_financial_aid,

		ethnicity: rec.ethnicity,
		gender: rec.gender,

		government_date_of_entry: rec.government_date_of_entry.clone(),

		relationships: Vec::new(),
		activities: Vec::new(),
		emergency_contacts: Vec::new(),
		education: Vec::new(),

		addresses: collect_addresses(rec, defaults),
		phone_numbers: collect_phones(rec, defaults),

		veteran,
		veteran_status,

		programs: vec![ProgramPayload {
			program: rec.program.clone(),
			degree: rec.degree.clone(),
			curriculum: None,
		}],
	})
}

/// Capacity of the address and phone sub-record lists.
const MAX_SUB_RECORDS: usize = 10;

fn value_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

/// Restructure flat `Address<N><Field>` keys (1-based, up to 10) into an
/// ordered address list, filling unset sub-fields with defaults.
fn collect_addresses(rec: &CanonicalRecord, defaults: &Defaults) -> Vec<AddressPayload> {
	let mut builders: BTreeMap<usize, AddressPayload> = BTreeMap::new();

	for (key, value) in &rec.extras {
		let Some(rest) = key.strip_prefix("Address") else {
			continue;
		};
		let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
		let Ok(index) = digits.parse::<usize>() else {
			continue;
		};
		if index < 1 || index > MAX_SUB_RECORDS {
			continue;
		}
		let field = &rest[digits.len()..];
		let Some(text) = value_string(value) else {
			continue;
		};

		let entry = builders.entry(index).or_default();
		match field {
			"Type" => entry.type_ = text.trim().parse().unwrap_or(0),
			"Line1" => entry.line1 = Some(text),
			"Line2" => entry.line2 = Some(text),
			"Line3" => entry.line3 = Some(text),
			"Line4" => entry.line4 = Some(text),
			"City" => entry.city = Some(text),
			"StateProvince" => entry.state_province = Some(text),
			"PostalCode" => entry.postal_code = Some(text),
			"County" => entry.county = Some(text),
			_ => {}
		}
	}

	builders
		.into_values()
		.map(|mut address| {
			if address.county.is_none() {
				address.county = defaults.address_country.clone();
			}
			address
		})
		.collect()
}

/// Restructure flat `Phone<N><Field>` keys (0-based, up to 10) into an ordered
/// phone list. Entries without a number are dropped; an empty list collapses
/// to the destination's "no phones" sentinel.
fn collect_phones(rec: &CanonicalRecord, defaults: &Defaults) -> Vec<PhonePayload> {
	#[derive(Default)]
	struct PhoneBuilder {
		type_: Option<i64>,
		country: Option<String>,
		number: Option<String>,
	}

	let mut builders: BTreeMap<usize, PhoneBuilder> = BTreeMap::new();

	for (key, value) in &rec.extras {
		let Some(rest) = key.strip_prefix("Phone") else {
			continue;
		};
		let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
		let Ok(index) = digits.parse::<usize>() else {
			continue;
		};
		if index >= MAX_SUB_RECORDS {
			continue;
		}
		let field = &rest[digits.len()..];
		let Some(text) = value_string(value) else {
			continue;
		};

		let entry = builders.entry(index).or_default();
		match field {
			"Type" => entry.type_ = text.trim().parse().ok(),
			"Country" => entry.country = Some(text),
			"Number" => entry.number = Some(format_phone_number(&text)),
			_ => {}
		}
	}

	let phones: Vec<PhonePayload> = builders
		.into_values()
		.filter(|builder| builder.number.is_some())
		.enumerate()
		.map(|(position, builder)| PhonePayload {
			// Untyped phones take the configured default type, or their
			// output position when none is configured.
			type_: builder
				.type_
				.or(defaults.phone_type)
				.unwrap_or(position as i64),
			country: builder.country.or_else(|| defaults.phone_country.clone()),
			number: builder.number,
		})
		.collect();

	if phones.is_empty() {
		// The destination API requires type -1 when no phones are submitted.
		vec![PhonePayload {
			type_: -1,
			country: None,
			number: None,
		}]
	} else {
		phones
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
		</Mappings>
	"#;

	fn table() -> CodeMappingTable {
		CodeMappingTable::from_xml_str(SAMPLE_MAPPING).expect("mapping parse failed")
	}

	fn record(value: serde_json::Value) -> CanonicalRecord {
		match value {
			serde_json::Value::Object(map) => normalize(map),
			_ => panic!("expected object"),
		}
	}

	fn defaults() -> Defaults {
		Defaults {
			address_country: Some("US".to_string()),
			phone_country: Some("US".to_string()),
			phone_type: None,
		}
	}

	#[test]
	fn address_fields_nest_with_defaults() {
		let rec = record(json!({
			"aid": "A1",
			"Address1Line1": "123 St",
			"Address2Line1": "PO Box 9",
			"Address2City": "Springfield"
		}));
		let payload = project_creation(&rec, &table(), &defaults()).unwrap();

		assert_eq!(payload.addresses.len(), 2);
		let first = &payload.addresses[0];
		assert_eq!(first.line1.as_deref(), Some("123 St"));
		assert_eq!(first.type_, 0);
		assert_eq!(first.line2, None);
		assert_eq!(first.city, None);
		assert_eq!(first.postal_code, None);
		assert_eq!(first.county.as_deref(), Some("US"));
		assert_eq!(payload.addresses[1].city.as_deref(), Some("Springfield"));
	}

	#[test]
	fn no_address_fields_produce_empty_list() {
		let rec = record(json!({"aid": "A1"}));
		let payload = project_creation(&rec, &table(), &defaults()).unwrap();
		assert!(payload.addresses.is_empty());
	}

	#[test]
	fn phone_numbers_nest_and_strip_formatting() {
		let rec = record(json!({
			"aid": "A1",
			"Phone0Number": "(555) 123-4567",
			"Phone1Number": "1-800-555-0199",
			"Phone1Type": "3"
		}));
		let payload = project_creation(&rec, &table(), &defaults()).unwrap();

		assert_eq!(payload.phone_numbers.len(), 2);
		assert_eq!(payload.phone_numbers[0].number.as_deref(), Some("5551234567"));
		assert_eq!(payload.phone_numbers[0].type_, 0);
		assert_eq!(payload.phone_numbers[0].country.as_deref(), Some("US"));
		// Leading US country code stripped from the 11-digit number.
		assert_eq!(payload.phone_numbers[1].number.as_deref(), Some("8005550199"));
		assert_eq!(payload.phone_numbers[1].type_, 3);
	}

	#[test]
	fn untyped_phones_use_the_configured_default_type() {
		let rec = record(json!({
			"aid": "A1",
			"Phone0Number": "(555) 123-4567",
			"Phone1Number": "555-987-6543",
			"Phone1Type": "3"
		}));
		let defaults = Defaults {
			phone_type: Some(4),
			..defaults()
		};
		let payload = project_creation(&rec, &table(), &defaults).unwrap();

		assert_eq!(payload.phone_numbers[0].type_, 4);
		// An explicit type still wins over the default.
		assert_eq!(payload.phone_numbers[1].type_, 3);
	}

	#[test]
	fn missing_phones_collapse_to_sentinel() {
		let rec = record(json!({"aid": "A1"}));
		let payload = project_creation(&rec, &table(), &defaults()).unwrap();
		assert_eq!(
			payload.phone_numbers,
			vec![PhonePayload {
				type_: -1,
				country: None,
				number: None
			}]
		);
	}

	#[test]
	fn veteran_dual_output() {
		let absent = record(json!({"aid": "A1"}));
		let payload = project_creation(&absent, &table(), &defaults()).unwrap();
		assert_eq!(payload.veteran, 0);
		assert!(!payload.veteran_status);

		let present = record(json!({"aid": "A1", "Veteran": "4"}));
		let payload = project_creation(&present, &table(), &defaults()).unwrap();
		assert_eq!(payload.veteran, 4);
		assert!(payload.veteran_status);
	}

	#[test]
	fn unmapped_present_selector_fails_before_any_network_call() {
		let rec = record(json!({"aid": "A1", "Program": "Culinary Arts"}));
		let err = project_creation(&rec, &table(), &defaults()).unwrap_err();
		assert!(matches!(err, MappingError::MissingEntry { .. }));
	}

	#[test]
	fn collections_not_computed_ship_empty() {
		let rec = record(json!({
			"aid": "A1",
			"Program": "Undergraduate",
			"Degree": "Bachelor of Science",
			"YearTerm": "Fall 2024"
		}));
		let payload = project_creation(&rec, &table(), &defaults()).unwrap();
		assert!(payload.relationships.is_empty());
		assert!(payload.education.is_empty());
		assert_eq!(payload.programs.len(), 1);
		assert_eq!(payload.programs[0].program.as_deref(), Some("Undergraduate"));
		assert_eq!(payload.programs[0].curriculum, None);
	}
}
