//! Field normalizer: coerces a raw feed row into the canonical record shape.
//!
//! This is a pure transform with a deliberately lenient input policy: empty
//! strings anywhere in the structure become explicit absence, and malformed
//! boolean tokens degrade to absent rather than raising.

use crate::record::{CanonicalRecord, RawRecord};
use serde_json::{Map, Value};

/// Placeholder the destination API expects when the feed supplies no
/// government date of entry.
pub const DATE_OF_ENTRY_STUB: &str = "0001-01-01T00:00:00";

/// Replace every empty string in a value with null, recursively through
/// objects and arrays.
pub fn blank_to_null(value: Value) -> Value {
	match value {
		Value::String(s) if s.is_empty() => Value::Null,
		Value::Object(map) => Value::Object(
			map.into_iter()
				.map(|(k, v)| (k, blank_to_null(v)))
				.collect(),
		),
		Value::Array(items) => Value::Array(items.into_iter().map(blank_to_null).collect()),
		other => other,
	}
}

/// Parse a truthy/falsy token. Anything unrecognized is absent, not an error.
pub fn parse_bool(value: &Value) -> Option<bool> {
	match value {
		Value::Bool(b) => Some(*b),
		Value::String(s) => match s.to_ascii_lowercase().as_str() {
			"true" | "1" | "y" | "yes" => Some(true),
			"false" | "0" | "n" | "no" => Some(false),
			_ => None,
		},
		_ => None,
	}
}

/// Coerce a string or number to an integer; absent on anything else.
pub fn parse_int(value: &Value) -> Option<i64> {
	match value {
		Value::Number(n) => n.as_i64(),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

fn take(map: &mut RawRecord, key: &str) -> Option<Value> {
	match map.remove(key) {
		None | Some(Value::Null) => None,
		Some(value) => Some(value),
	}
}

fn take_string(map: &mut RawRecord, key: &str) -> Option<String> {
	match take(map, key)? {
		Value::String(s) => Some(s),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn take_bool(map: &mut RawRecord, key: &str) -> Option<bool> {
	take(map, key).as_ref().and_then(parse_bool)
}

fn take_int(map: &mut RawRecord, key: &str) -> Option<i64> {
	take(map, key).as_ref().and_then(parse_int)
}

/// Produce the canonical record for one raw feed row.
///
/// All named fields are removed from the row as they are coerced; whatever
/// remains passes through unchanged in `extras`.
pub fn normalize(raw: RawRecord) -> CanonicalRecord {
	let mut map: RawRecord = raw
		.into_iter()
		.map(|(k, v)| (k, blank_to_null(v)))
		.collect();

	let mut rec = CanonicalRecord {
		application_id: take_string(&mut map, "aid").unwrap_or_default(),
		prospect_id: take_string(&mut map, "pid"),

		first_name: take_string(&mut map, "FirstName"),
		last_name: take_string(&mut map, "LastName"),
		email: take_string(&mut map, "Email"),
		campus: take_string(&mut map, "Campus"),
		birth_date: take_string(&mut map, "BirthDate"),
		create_datetime: take_string(&mut map, "CreateDateTime"),

		prefix: take_string(&mut map, "Prefix"),
		middle_name: take_string(&mut map, "MiddleName"),
		last_name_prefix: take_string(&mut map, "LastNamePrefix"),
		suffix: take_string(&mut map, "Suffix"),
		nickname: take_string(&mut map, "Nickname"),
		government_id: take_string(&mut map, "GovernmentId"),
		legal_name: take_string(&mut map, "LegalName"),
		visa: take_string(&mut map, "Visa"),
		citizenship_status: take_string(&mut map, "CitizenshipStatus"),
		primary_citizenship: take_string(&mut map, "PrimaryCitizenship"),
		secondary_citizenship: take_string(&mut map, "SecondaryCitizenship"),
		marital_status: take_string(&mut map, "MaritalStatus"),
		proposed_decision: take_string(&mut map, "ProposedDecision"),
		religion: take_string(&mut map, "Religion"),
		former_last_name: take_string(&mut map, "FormerLastName"),
		former_first_name: take_string(&mut map, "FormerFirstName"),
		primary_language: take_string(&mut map, "PrimaryLanguage"),
		country_of_birth: take_string(&mut map, "CountryOfBirth"),
		disabilities: take_string(&mut map, "Disabilities"),
		college_attend_status: take_string(&mut map, "CollegeAttendStatus"),
		commitment: take_string(&mut map, "Commitment"),
		status: take_string(&mut map, "Status"),

		race_american_indian: take_bool(&mut map, "RaceAmericanIndian"),
		race_asian: take_bool(&mut map, "RaceAsian"),
		race_african_american: take_bool(&mut map, "RaceAfricanAmerican"),
		race_native_hawaiian: take_bool(&mut map, "RaceNativeHawaiian"),
		race_white: take_bool(&mut map, "RaceWhite"),
		interested_in_campus_housing: take_bool(&mut map, "IsInterestedInCampusHousing"),
		interested_in_financial_aid: take_bool(&mut map, "IsInterestedInFinancialAid"),

		ethnicity: take_int(&mut map, "Ethnicity"),
		gender: take_int(&mut map, "Gender"),

		veteran: take_string(&mut map, "Veteran"),

		year_term: take_string(&mut map, "YearTerm"),
		program: take_string(&mut map, "Program"),
		degree: take_string(&mut map, "Degree"),

		government_date_of_entry: take_string(&mut map, "GovernmentDateOfEntry")
			.unwrap_or_else(|| DATE_OF_ENTRY_STUB.to_string()),

		extras: Map::new(),
	};
	rec.extras = map;
	rec
}

/// Flatten a canonical record back into a map keyed by origin field names.
///
/// This is the inverse of [`normalize`] and the view the write-back uploads
/// select fields from. Absent fields flatten to explicit nulls.
pub fn flatten(rec: &CanonicalRecord) -> Map<String, Value> {
	fn string(v: &Option<String>) -> Value {
		v.as_ref().map_or(Value::Null, |s| Value::String(s.clone()))
	}
	fn boolean(v: &Option<bool>) -> Value {
		v.map_or(Value::Null, Value::Bool)
	}
	fn integer(v: &Option<i64>) -> Value {
		v.map_or(Value::Null, |n| Value::Number(n.into()))
	}

	let mut map = rec.extras.clone();
	map.insert("aid".into(), Value::String(rec.application_id.clone()));
	map.insert("pid".into(), string(&rec.prospect_id));

	map.insert("FirstName".into(), string(&rec.first_name));
	map.insert("LastName".into(), string(&rec.last_name));
	map.insert("Email".into(), string(&rec.email));
	map.insert("Campus".into(), string(&rec.campus));
	map.insert("BirthDate".into(), string(&rec.birth_date));
	map.insert("CreateDateTime".into(), string(&rec.create_datetime));

	map.insert("Prefix".into(), string(&rec.prefix));
	map.insert("MiddleName".into(), string(&rec.middle_name));
	map.insert("LastNamePrefix".into(), string(&rec.last_name_prefix));
	map.insert("Suffix".into(), string(&rec.suffix));
	map.insert("Nickname".into(), string(&rec.nickname));
	map.insert("GovernmentId".into(), string(&rec.government_id));
	map.insert("LegalName".into(), string(&rec.legal_name));
	map.insert("Visa".into(), string(&rec.visa));
	map.insert("CitizenshipStatus".into(), string(&rec.citizenship_status));
	map.insert("PrimaryCitizenship".into(), string(&rec.primary_citizenship));
	map.insert(
		"SecondaryCitizenship".into(),
		string(&rec.secondary_citizenship),
	);
	map.insert("MaritalStatus".into(), string(&rec.marital_status));
	map.insert("ProposedDecision".into(), string(&rec.proposed_decision));
	map.insert("Religion".into(), string(&rec.religion));
	map.insert("FormerLastName".into(), string(&rec.former_last_name));
	map.insert("FormerFirstName".into(), string(&rec.former_first_name));
	map.insert("PrimaryLanguage".into(), string(&rec.primary_language));
	map.insert("CountryOfBirth".into(), string(&rec.country_of_birth));
	map.insert("Disabilities".into(), string(&rec.disabilities));
	map.insert(
		"CollegeAttendStatus".into(),
		string(&rec.college_attend_status),
	);
	map.insert("Commitment".into(), string(&rec.commitment));
	map.insert("Status".into(), string(&rec.status));

	map.insert(
		"RaceAmericanIndian".into(),
		boolean(&rec.race_american_indian),
	);
	map.insert("RaceAsian".into(), boolean(&rec.race_asian));
	map.insert(
		"RaceAfricanAmerican".into(),
		boolean(&rec.race_african_american),
	);
	map.insert(
		"RaceNativeHawaiian".into(),
		boolean(&rec.race_native_hawaiian),
	);
	map.insert("RaceWhite".into(), boolean(&rec.race_white));
	map.insert(
		"IsInterestedInCampusHousing".into(),
		boolean(&rec.interested_in_campus_housing),
	);
	map.insert(
		"IsInterestedInFinancialAid".into(),
		boolean(&rec.interested_in_financial_aid),
	);

	map.insert("Ethnicity".into(), integer(&rec.ethnicity));
	map.insert("Gender".into(), integer(&rec.gender));

	map.insert("Veteran".into(), string(&rec.veteran));

	map.insert("YearTerm".into(), string(&rec.year_term));
	map.insert("Program".into(), string(&rec.program));
	map.insert("Degree".into(), string(&rec.degree));

	map.insert(
		"GovernmentDateOfEntry".into(),
		Value::String(rec.government_date_of_entry.clone()),
	);

	map
}
