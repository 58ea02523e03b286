//! Configuration validation for implementation-specific TOML sections.
//!
//! Every pluggable implementation (account, ledger) receives its own raw
//! `toml::Value` and describes what it expects through a [`Schema`]. The
//! schema is checked before the implementation is constructed so that
//! misconfiguration is reported with the offending field name.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// Array whose elements all have the inner type.
	Array(Box<FieldType>),
	/// Nested table checked against its own schema.
	Table(Schema),
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named, typed field in a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom validator that receives the raw field value.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// Required and optional fields of a configuration table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema.
	///
	/// Required fields must be present; optional fields are checked only when
	/// present. Unknown keys are ignored.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			check_field(field, value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				check_field(field, value)?;
			}
		}

		Ok(())
	}
}

fn check_field(field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
	check_type(&field.name, value, &field.field_type)?;

	if let Some(validator) = &field.validator {
		validator(value).map_err(|message| ValidationError::InvalidValue {
			field: field.name.clone(),
			message,
		})?;
	}

	Ok(())
}

fn check_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = |expected: &str| ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	};

	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch("string"));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value.as_integer().ok_or_else(|| mismatch("integer"))?;
			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}
			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch("boolean"));
			}
		},
		FieldType::Array(inner_type) => {
			let array = value.as_array().ok_or_else(|| mismatch("array"))?;
			for (i, item) in array.iter().enumerate() {
				check_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| match e {
				ValidationError::MissingField(f) => {
					ValidationError::MissingField(format!("{}.{}", field_name, f))
				},
				ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
					field: format!("{}.{}", field_name, field),
					message,
				},
				ValidationError::TypeMismatch {
					field,
					expected,
					actual,
				} => ValidationError::TypeMismatch {
					field: format!("{}.{}", field_name, field),
					expected,
					actual,
				},
			})?;
		},
	}

	Ok(())
}

/// A configuration schema that can validate TOML values.
///
/// Implementations return one of these from `config_schema()` so callers can
/// re-validate configuration without constructing the implementation.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table(src: &str) -> toml::Value {
		toml::from_str::<toml::Table>(src).map(toml::Value::Table).unwrap()
	}

	fn ledger_schema() -> Schema {
		Schema::new(
			vec![Field::new(
				"poll_interval_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(60),
				},
			)],
			vec![Field::new("label", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if !s.is_empty() => Ok(()),
					_ => Err("label cannot be empty".to_string()),
				}
			})],
		)
	}

	#[test]
	fn test_valid_table_passes() {
		let config = table("poll_interval_seconds = 7\nlabel = \"mainnet\"");
		assert!(ledger_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let err = ledger_schema().validate(&table("label = \"x\"")).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "poll_interval_seconds"));
	}

	#[test]
	fn test_bounds_and_types_are_enforced() {
		let err = ledger_schema()
			.validate(&table("poll_interval_seconds = 0"))
			.unwrap_err();
		assert!(err.to_string().contains("less than minimum 1"));

		let err = ledger_schema()
			.validate(&table("poll_interval_seconds = \"7\""))
			.unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { .. }));
	}

	#[test]
	fn test_custom_validator_runs_on_optional_field() {
		let err = ledger_schema()
			.validate(&table("poll_interval_seconds = 7\nlabel = \"\""))
			.unwrap_err();
		assert!(err.to_string().contains("label cannot be empty"));
	}

	#[test]
	fn test_non_table_root_is_rejected() {
		let err = ledger_schema()
			.validate(&toml::Value::Integer(1))
			.unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { field, .. } if field == "root"));
	}

	#[test]
	fn test_nested_array_of_tables_reports_path() {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"items",
				FieldType::Array(Box::new(FieldType::Table(Schema::new(
					vec![Field::new("item_id", FieldType::String)],
					vec![],
				)))),
			)],
		);
		let config = table("[[items]]\nitem_id = \"0x1\"\n\n[[items]]\nclaimer = \"0x2\"");
		let err = schema.validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "items[1].item_id"));
	}
}
