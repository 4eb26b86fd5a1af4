use crate::model::form_field::FormFieldRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Widget kinds the form builder can place on an attendance form.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Select,
    Radio,
    Checkbox,
}

impl FieldType {
    /// Choice widgets carry an options list; everything else must not.
    pub fn takes_options(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }
}

/// One field of a form, as the engine sees it.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub label: String,
    pub field_type: FieldType,
    pub options: Vec<String>,
    pub required: bool,
}

impl FieldDef {
    /// Parse a stored row back into a definition. Rows are validated on the
    /// way in, so a parse failure here means the table was edited by hand.
    pub fn from_row(row: &FormFieldRow) -> Result<Self, String> {
        let field_type = FieldType::from_str(&row.field_type)
            .map_err(|_| format!("field '{}' has unknown type '{}'", row.label, row.field_type))?;

        let options = match &row.options {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| format!("field '{}' has a non-text option", row.label))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(format!("field '{}' has malformed options", row.label)),
        };

        Ok(FieldDef {
            label: row.label.clone(),
            field_type,
            options,
            required: row.required,
        })
    }
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "Skin type")]
    pub field: String,
    #[schema(example = "is required")]
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Checks a field set coming from the form builder. All problems are
/// reported at once so the builder can mark every offending field.
pub fn validate_definitions(fields: &[FieldDef]) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if fields.is_empty() {
        errors.push(FieldError::new("fields", "form needs at least one field"));
        return Err(errors);
    }

    let mut seen = HashSet::new();

    for field in fields {
        let label = field.label.trim();

        if label.is_empty() {
            errors.push(FieldError::new(&field.label, "label must not be empty"));
            continue;
        }

        if label.len() > 120 {
            errors.push(FieldError::new(label, "label is longer than 120 characters"));
        }

        if !seen.insert(label.to_lowercase()) {
            errors.push(FieldError::new(label, "duplicate label"));
        }

        if field.field_type.takes_options() {
            if field.options.is_empty() {
                errors.push(FieldError::new(label, "choice fields need at least one option"));
            }

            let mut opts = HashSet::new();
            for opt in &field.options {
                if opt.trim().is_empty() {
                    errors.push(FieldError::new(label, "options must not be empty"));
                } else if !opts.insert(opt.trim().to_lowercase()) {
                    errors.push(FieldError::new(label, format!("duplicate option '{}'", opt)));
                }
            }
        } else if !field.options.is_empty() {
            errors.push(FieldError::new(
                label,
                format!("{} fields do not take options", field.field_type),
            ));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Validates a responses object against a form's fields: the generic
/// form-filling check behind attendance create/update/complete.
pub fn validate_responses(fields: &[FieldDef], responses: &Value) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    let map = match responses.as_object() {
        Some(m) => m,
        None => {
            errors.push(FieldError::new("responses", "must be a JSON object"));
            return Err(errors);
        }
    };

    for key in map.keys() {
        if !fields.iter().any(|f| f.label == *key) {
            errors.push(FieldError::new(key, "is not a field of this form"));
        }
    }

    for field in fields {
        let value = map.get(&field.label);

        if is_blank(value) {
            if field.required {
                errors.push(FieldError::new(&field.label, "is required"));
            }
            continue;
        }
        let value = value.unwrap(); // blank covers None

        match field.field_type {
            FieldType::Text | FieldType::Textarea => {
                if !value.is_string() {
                    errors.push(FieldError::new(&field.label, "must be text"));
                }
            }
            FieldType::Number => {
                let ok = match value {
                    Value::Number(_) => true,
                    // HTML inputs post numbers as strings
                    Value::String(s) => s.trim().parse::<f64>().is_ok(),
                    _ => false,
                };
                if !ok {
                    errors.push(FieldError::new(&field.label, "must be a number"));
                }
            }
            FieldType::Date => {
                let ok = value
                    .as_str()
                    .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                    .unwrap_or(false);
                if !ok {
                    errors.push(FieldError::new(&field.label, "must be a date (YYYY-MM-DD)"));
                }
            }
            FieldType::Select | FieldType::Radio => match value.as_str() {
                Some(s) if field.options.iter().any(|o| o == s) => {}
                _ => errors.push(FieldError::new(
                    &field.label,
                    "must be one of the configured options",
                )),
            },
            FieldType::Checkbox => match value.as_array() {
                Some(items) => {
                    let mut picked = HashSet::new();
                    for item in items {
                        match item.as_str() {
                            Some(s) if field.options.iter().any(|o| o == s) => {
                                if !picked.insert(s) {
                                    errors.push(FieldError::new(
                                        &field.label,
                                        format!("option '{}' picked twice", s),
                                    ));
                                }
                            }
                            _ => errors.push(FieldError::new(
                                &field.label,
                                "must only contain configured options",
                            )),
                        }
                    }
                }
                None => errors.push(FieldError::new(&field.label, "must be a list of options")),
            },
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Missing, null, "" and [] all count as "not answered".
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(label: &str, field_type: FieldType, options: &[&str], required: bool) -> FieldDef {
        FieldDef {
            label: label.to_string(),
            field_type,
            options: options.iter().map(|s| s.to_string()).collect(),
            required,
        }
    }

    fn intake_fields() -> Vec<FieldDef> {
        vec![
            field("Skin type", FieldType::Select, &["oily", "dry", "mixed"], true),
            field("Allergies", FieldType::Textarea, &[], false),
            field("Age", FieldType::Number, &[], true),
            field("Last visit", FieldType::Date, &[], false),
            field(
                "Areas of concern",
                FieldType::Checkbox,
                &["forehead", "cheeks", "chin"],
                false,
            ),
        ]
    }

    fn messages_for<'a>(errors: &'a [FieldError], field: &str) -> Vec<&'a str> {
        errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    // ---------- responses ----------

    #[test]
    fn accepts_a_complete_valid_submission() {
        let responses = json!({
            "Skin type": "oily",
            "Allergies": "none",
            "Age": 29,
            "Last visit": "2026-03-14",
            "Areas of concern": ["forehead", "chin"]
        });
        assert!(validate_responses(&intake_fields(), &responses).is_ok());
    }

    #[test]
    fn optional_fields_may_be_omitted() {
        let responses = json!({ "Skin type": "dry", "Age": 40 });
        assert!(validate_responses(&intake_fields(), &responses).is_ok());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let responses = json!({ "Skin type": "dry" });
        let errors = validate_responses(&intake_fields(), &responses).unwrap_err();
        assert_eq!(messages_for(&errors, "Age"), vec!["is required"]);
    }

    #[test]
    fn null_empty_string_and_empty_array_count_as_unanswered() {
        let fields = vec![
            field("A", FieldType::Text, &[], true),
            field("B", FieldType::Number, &[], true),
            field("C", FieldType::Checkbox, &["x"], true),
        ];
        let responses = json!({ "A": "", "B": null, "C": [] });
        let errors = validate_responses(&fields, &responses).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.message == "is required"));
    }

    #[test]
    fn blank_optional_values_are_fine() {
        let fields = vec![field("Notes", FieldType::Text, &[], false)];
        assert!(validate_responses(&fields, &json!({ "Notes": "" })).is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let responses = json!({ "Skin type": "dry", "Age": 30, "Eye color": "brown" });
        let errors = validate_responses(&intake_fields(), &responses).unwrap_err();
        assert_eq!(
            messages_for(&errors, "Eye color"),
            vec!["is not a field of this form"]
        );
    }

    #[test]
    fn responses_must_be_an_object() {
        let errors = validate_responses(&intake_fields(), &json!(["nope"])).unwrap_err();
        assert_eq!(errors[0].field, "responses");
    }

    #[test]
    fn number_accepts_numeric_strings() {
        let fields = vec![field("Age", FieldType::Number, &[], true)];
        assert!(validate_responses(&fields, &json!({ "Age": "31" })).is_ok());
        assert!(validate_responses(&fields, &json!({ "Age": " 31.5 " })).is_ok());
    }

    #[test]
    fn number_rejects_non_numeric_values() {
        let fields = vec![field("Age", FieldType::Number, &[], true)];
        for bad in [json!({ "Age": "thirty" }), json!({ "Age": true })] {
            let errors = validate_responses(&fields, &bad).unwrap_err();
            assert_eq!(messages_for(&errors, "Age"), vec!["must be a number"]);
        }
    }

    #[test]
    fn date_must_be_iso_formatted() {
        let fields = vec![field("Last visit", FieldType::Date, &[], true)];
        assert!(validate_responses(&fields, &json!({ "Last visit": "2026-02-28" })).is_ok());

        for bad in ["28/02/2026", "2026-13-01", "yesterday"] {
            let errors =
                validate_responses(&fields, &json!({ "Last visit": bad })).unwrap_err();
            assert_eq!(
                messages_for(&errors, "Last visit"),
                vec!["must be a date (YYYY-MM-DD)"]
            );
        }
    }

    #[test]
    fn select_value_must_match_an_option() {
        let errors =
            validate_responses(&intake_fields(), &json!({ "Skin type": "sparkly", "Age": 1 }))
                .unwrap_err();
        assert_eq!(
            messages_for(&errors, "Skin type"),
            vec!["must be one of the configured options"]
        );
    }

    #[test]
    fn checkbox_rejects_foreign_and_duplicate_options() {
        let fields = intake_fields();

        let foreign = json!({ "Skin type": "dry", "Age": 5, "Areas of concern": ["nose"] });
        let errors = validate_responses(&fields, &foreign).unwrap_err();
        assert_eq!(
            messages_for(&errors, "Areas of concern"),
            vec!["must only contain configured options"]
        );

        let duplicated =
            json!({ "Skin type": "dry", "Age": 5, "Areas of concern": ["chin", "chin"] });
        let errors = validate_responses(&fields, &duplicated).unwrap_err();
        assert_eq!(
            messages_for(&errors, "Areas of concern"),
            vec!["option 'chin' picked twice"]
        );
    }

    #[test]
    fn checkbox_value_must_be_an_array() {
        let fields = intake_fields();
        let responses = json!({ "Skin type": "dry", "Age": 5, "Areas of concern": "chin" });
        let errors = validate_responses(&fields, &responses).unwrap_err();
        assert_eq!(
            messages_for(&errors, "Areas of concern"),
            vec!["must be a list of options"]
        );
    }

    #[test]
    fn all_problems_are_reported_together() {
        let responses = json!({ "Skin type": "sparkly", "Age": "abc", "Extra": 1 });
        let errors = validate_responses(&intake_fields(), &responses).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    // ---------- definitions ----------

    #[test]
    fn accepts_a_valid_field_set() {
        assert!(validate_definitions(&intake_fields()).is_ok());
    }

    #[test]
    fn empty_field_set_is_rejected() {
        let errors = validate_definitions(&[]).unwrap_err();
        assert_eq!(errors[0].field, "fields");
    }

    #[test]
    fn blank_and_duplicate_labels_are_rejected() {
        let fields = vec![
            field("  ", FieldType::Text, &[], false),
            field("Skin type", FieldType::Text, &[], false),
            field("skin TYPE", FieldType::Text, &[], false),
        ];
        let errors = validate_definitions(&fields).unwrap_err();
        assert!(errors.iter().any(|e| e.message == "label must not be empty"));
        assert!(errors.iter().any(|e| e.message == "duplicate label"));
    }

    #[test]
    fn choice_fields_need_options() {
        let fields = vec![field("Skin type", FieldType::Select, &[], true)];
        let errors = validate_definitions(&fields).unwrap_err();
        assert_eq!(
            messages_for(&errors, "Skin type"),
            vec!["choice fields need at least one option"]
        );
    }

    #[test]
    fn plain_fields_must_not_carry_options() {
        let fields = vec![field("Age", FieldType::Number, &["1", "2"], true)];
        let errors = validate_definitions(&fields).unwrap_err();
        assert_eq!(
            messages_for(&errors, "Age"),
            vec!["number fields do not take options"]
        );
    }

    #[test]
    fn empty_or_duplicate_options_are_rejected() {
        let fields = vec![field(
            "Skin type",
            FieldType::Select,
            &["oily", " ", "Oily"],
            true,
        )];
        let errors = validate_definitions(&fields).unwrap_err();
        assert!(errors.iter().any(|e| e.message == "options must not be empty"));
        assert!(errors.iter().any(|e| e.message.starts_with("duplicate option")));
    }

    // ---------- row parsing ----------

    #[test]
    fn parses_a_stored_row() {
        let row = FormFieldRow {
            id: 1,
            form_id: 1,
            label: "Skin type".into(),
            field_type: "select".into(),
            options: Some(json!(["oily", "dry"])),
            required: true,
            position: 0,
        };
        let def = FieldDef::from_row(&row).unwrap();
        assert_eq!(def.field_type, FieldType::Select);
        assert_eq!(def.options, vec!["oily", "dry"]);
    }

    #[test]
    fn rejects_rows_with_unknown_type_or_bad_options() {
        let mut row = FormFieldRow {
            id: 1,
            form_id: 1,
            label: "X".into(),
            field_type: "slider".into(),
            options: None,
            required: false,
            position: 0,
        };
        assert!(FieldDef::from_row(&row).is_err());

        row.field_type = "select".into();
        row.options = Some(json!({"not": "an array"}));
        assert!(FieldDef::from_row(&row).is_err());
    }
}
