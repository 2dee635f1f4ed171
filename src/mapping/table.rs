use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Error types for mapping-table lookups and document loading
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
	#[error("no mapping entry for {category} code '{code}'")]
	MissingEntry { category: String, code: String },

	#[error("unknown mapping category: {0}")]
	UnknownCategory(String),

	#[error("mapping document error: {0}")]
	Document(String),

	#[error("XML error: {0}")]
	Xml(#[from] quick_xml::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// One mapping category. Categories differ in arity: a single-field category
/// maps an origin code to one destination code, a dual-field category maps an
/// origin code to two named destination fields (e.g. year + term).
#[derive(Debug, Clone)]
enum Category {
	Single(HashMap<String, String>),
	Dual(HashMap<String, HashMap<String, String>>),
}

/// Translation table from origin-system codes to destination-system codes,
/// keyed by field category.
#[derive(Debug, Clone, Default)]
pub struct CodeMappingTable {
	categories: HashMap<String, Category>,
}

impl CodeMappingTable {
	/// Load the table from the vendor XML mapping document on disk.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, MappingError> {
		let text = std::fs::read_to_string(path.as_ref())?;
		// The vendor mapping tool writes UTF-8 with a BOM.
		let text = text.trim_start_matches('\u{feff}');
		Self::from_xml_str(text)
	}

	/// Parse the table from XML text.
	///
	/// Each child of the document root is a category element whose
	/// `NumberOfPowerCampusFieldsMapped` attribute selects the arity. Rows carry
	/// the origin code in `RCCodeValue` and destination codes in
	/// `PCCodeValue` (single) or `PC<Field>CodeValue` (dual).
	pub fn from_xml_str(xml: &str) -> Result<Self, MappingError> {
		let mut reader = Reader::from_str(xml);
		reader.config_mut().trim_text(true);

		let mut categories = HashMap::new();
		let mut depth = 0usize;
		// (name, dual field names) for the category currently being read
		let mut current: Option<(String, Option<(String, String)>)> = None;

		loop {
			match reader.read_event()? {
				Event::Start(e) => {
					depth += 1;
					match depth {
						2 => current = Some(Self::open_category(&e, &mut categories)?),
						3 => Self::read_row(&e, current.as_ref(), &mut categories)?,
						_ => {}
					}
				}
				Event::Empty(e) => {
					// Rows are usually self-closing elements.
					if depth + 1 == 3 {
						Self::read_row(&e, current.as_ref(), &mut categories)?;
					} else if depth + 1 == 2 {
						Self::open_category(&e, &mut categories)?;
					}
				}
				Event::End(_) => {
					if depth == 2 {
						current = None;
					}
					depth -= 1;
				}
				Event::Eof => break,
				_ => {}
			}
		}

		debug!("Loaded {} mapping categories", categories.len());
		Ok(Self { categories })
	}

	fn open_category(
		e: &BytesStart<'_>,
		categories: &mut HashMap<String, Category>,
	) -> Result<(String, Option<(String, String)>), MappingError> {
		let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
		let arity = attr(e, "NumberOfPowerCampusFieldsMapped")?.unwrap_or_else(|| "1".to_string());

		if arity == "1" {
			categories.insert(name.clone(), Category::Single(HashMap::new()));
			Ok((name, None))
		} else {
			let first = attr(e, "PCFirstField")?.ok_or_else(|| {
				MappingError::Document(format!("category {} missing PCFirstField", name))
			})?;
			let second = attr(e, "PCSecondField")?.ok_or_else(|| {
				MappingError::Document(format!("category {} missing PCSecondField", name))
			})?;
			let fn1 = format!("PC{}CodeValue", first);
			let fn2 = format!("PC{}CodeValue", second);

			let mut fields = HashMap::new();
			fields.insert(fn1.clone(), HashMap::new());
			fields.insert(fn2.clone(), HashMap::new());
			categories.insert(name.clone(), Category::Dual(fields));
			Ok((name, Some((fn1, fn2))))
		}
	}

	fn read_row(
		e: &BytesStart<'_>,
		current: Option<&(String, Option<(String, String)>)>,
		categories: &mut HashMap<String, Category>,
	) -> Result<(), MappingError> {
		let Some((name, dual_fields)) = current else {
			return Ok(());
		};
		let Some(origin_code) = attr(e, "RCCodeValue")? else {
			return Ok(());
		};

		match categories.get_mut(name) {
			Some(Category::Single(map)) => {
				if let Some(dest) = attr(e, "PCCodeValue")? {
					map.insert(origin_code, dest);
				}
			}
			Some(Category::Dual(fields)) => {
				if let Some((fn1, fn2)) = dual_fields {
					for field_name in [fn1, fn2] {
						if let Some(dest) = attr(e, field_name)? {
							if let Some(map) = fields.get_mut(field_name) {
								map.insert(origin_code.clone(), dest);
							}
						}
					}
				}
			}
			None => {}
		}
		Ok(())
	}

	/// Look up a code in a single-field category.
	pub fn lookup(&self, category: &str, code: &str) -> Result<&str, MappingError> {
		match self.categories.get(category) {
			Some(Category::Single(map)) => {
				map.get(code)
					.map(String::as_str)
					.ok_or_else(|| MappingError::MissingEntry {
						category: category.to_string(),
						code: code.to_string(),
					})
			}
			Some(Category::Dual(_)) => Err(MappingError::Document(format!(
				"category {} maps two fields, use lookup_field",
				category
			))),
			None => Err(MappingError::UnknownCategory(category.to_string())),
		}
	}

	/// Look up a code in one named field of a dual-field category.
	pub fn lookup_field(
		&self,
		category: &str,
		field: &str,
		code: &str,
	) -> Result<&str, MappingError> {
		match self.categories.get(category) {
			Some(Category::Dual(fields)) => fields
				.get(field)
				.and_then(|map| map.get(code))
				.map(String::as_str)
				.ok_or_else(|| MappingError::MissingEntry {
					category: format!("{}.{}", category, field),
					code: code.to_string(),
				}),
			Some(Category::Single(_)) => Err(MappingError::Document(format!(
				"category {} maps one field, use lookup",
				category
			))),
			None => Err(MappingError::UnknownCategory(category.to_string())),
		}
	}

	/// True if the category contains an entry for the code, in any field.
	pub fn contains(&self, category: &str, code: &str) -> bool {
		match self.categories.get(category) {
			Some(Category::Single(map)) => map.contains_key(code),
			Some(Category::Dual(fields)) => fields.values().any(|map| map.contains_key(code)),
			None => false,
		}
	}
}

/// Grow the mapping document from program/degree pairs seen in the feed.
///
/// Pairs whose program has no `AcademicLevel` entry or whose degree has no
/// `AcademicProgram` entry get identity rows appended to the document (the
/// origin and destination share these codes once the destination program
/// exists). Returns whether the document changed; callers reload the table
/// when it did.
pub fn autoconfigure_document(
	path: impl AsRef<Path>,
	pairs: &[(String, String)],
) -> Result<bool, MappingError> {
	let text = std::fs::read_to_string(path.as_ref())?;
	let text = text.trim_start_matches('\u{feff}');
	let table = CodeMappingTable::from_xml_str(text)?;

	let programs: BTreeSet<&str> = pairs
		.iter()
		.map(|(program, _)| program.as_str())
		.filter(|program| !table.contains("AcademicLevel", program))
		.collect();
	let degrees: BTreeSet<&str> = pairs
		.iter()
		.map(|(_, degree)| degree.as_str())
		.filter(|degree| !table.contains("AcademicProgram", degree))
		.collect();
	if programs.is_empty() && degrees.is_empty() {
		return Ok(false);
	}

	let mut reader = Reader::from_str(text);
	let mut writer = Writer::new(Vec::new());
	let mut depth = 0usize;

	loop {
		match reader.read_event()? {
			Event::Start(e) => {
				depth += 1;
				write(&mut writer, Event::Start(e))?;
			}
			Event::End(e) => {
				if depth == 2 {
					let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
					write_new_rows(&mut writer, &name, &programs, &degrees)?;
				}
				depth -= 1;
				write(&mut writer, Event::End(e))?;
			}
			// An empty category element has to be reopened to take rows.
			Event::Empty(e) if depth + 1 == 2 => {
				let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
				write(&mut writer, Event::Start(e.to_owned()))?;
				write_new_rows(&mut writer, &name, &programs, &degrees)?;
				write(&mut writer, Event::End(BytesEnd::new(name.as_str())))?;
			}
			Event::Eof => break,
			event => write(&mut writer, event)?,
		}
	}

	std::fs::write(path.as_ref(), writer.into_inner())?;
	info!(
		"Auto-configured mapping document: {} new programs, {} new degrees",
		programs.len(),
		degrees.len()
	);
	Ok(true)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), MappingError> {
	writer
		.write_event(event)
		.map_err(|err| MappingError::Document(err.to_string()))
}

fn write_new_rows(
	writer: &mut Writer<Vec<u8>>,
	category: &str,
	programs: &BTreeSet<&str>,
	degrees: &BTreeSet<&str>,
) -> Result<(), MappingError> {
	match category {
		"AcademicLevel" => {
			for program in programs {
				let mut row = BytesStart::new("Row");
				row.push_attribute(("RCCodeValue", *program));
				row.push_attribute(("PCCodeValue", *program));
				write(writer, Event::Empty(row))?;
			}
		}
		"AcademicProgram" => {
			for degree in degrees {
				let mut row = BytesStart::new("Row");
				row.push_attribute(("RCCodeValue", *degree));
				row.push_attribute(("PCDegreeCodeValue", *degree));
				row.push_attribute(("PCCurriculumCodeValue", *degree));
				write(writer, Event::Empty(row))?;
			}
		}
		_ => {}
	}
	Ok(())
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, MappingError> {
	for a in e.attributes() {
		let a = a.map_err(|err| MappingError::Document(err.to_string()))?;
		if a.key.as_ref() == name.as_bytes() {
			let value = a
				.unescape_value()
				.map_err(|err| MappingError::Document(err.to_string()))?;
			return Ok(Some(value.into_owned()));
		}
	}
	Ok(None)
}
