use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::request::Payload;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            Self::Text => "a non-empty string",
            Self::Integer => "a whole number",
            Self::Decimal => "a decimal amount",
            Self::Date => "a YYYY-MM-DD date",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Text => value.as_str().is_some_and(|text| !text.trim().is_empty()),
            Self::Integer | Self::Decimal => self.amount(value).is_some(),
            Self::Date => value
                .as_str()
                .is_some_and(|text| NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").is_ok()),
        }
    }

    fn is_positive(&self, value: &Value) -> bool {
        self.amount(value).is_some_and(|amount| amount > Decimal::ZERO)
    }

    /// Numeric value of an integer or decimal field.
    fn amount(&self, value: &Value) -> Option<Decimal> {
        match (self, value) {
            (Self::Integer, Value::Number(number)) => number
                .as_i64()
                .map(Decimal::from)
                .or_else(|| number.as_u64().map(Decimal::from)),
            (Self::Decimal, Value::Number(number)) => parse_decimal(&number.to_string()),
            (Self::Decimal, Value::String(text)) => parse_decimal(text.trim()),
            _ => None,
        }
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Numeric fields only: the value must be greater than zero.
    #[serde(default)]
    pub positive: bool,
}

fn default_required() -> bool {
    true
}

impl FieldRule {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: true, positive: false }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: false, positive: false }
    }

    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }
}

/// Checks `payload` against `rules` and returns every problem found.
///
/// Null values count as absent. Fields without a rule are not inspected.
pub fn validate_payload(rules: &[FieldRule], payload: &Payload) -> Vec<String> {
    let mut problems = Vec::new();

    for rule in rules {
        match payload.get(&rule.name).filter(|value| !value.is_null()) {
            None if rule.required => {
                problems.push(format!("missing required field `{}`", rule.name));
            }
            None => {}
            Some(value) if !rule.kind.accepts(value) => {
                problems.push(format!("field `{}` must be {}", rule.name, rule.kind.describe()));
            }
            Some(value) if rule.positive && !rule.kind.is_positive(value) => {
                problems.push(format!("field `{}` must be greater than zero", rule.name));
            }
            Some(_) => {}
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{validate_payload, FieldKind, FieldRule};
    use crate::domain::request::Payload;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().expect("object payload")
    }

    fn rules() -> Vec<FieldRule> {
        vec![
            FieldRule::required("title", FieldKind::Text),
            FieldRule::required("quantity", FieldKind::Integer).positive(),
            FieldRule::optional("estimated_cost", FieldKind::Decimal).positive(),
            FieldRule::optional("needed_by", FieldKind::Date),
        ]
    }

    #[test]
    fn accepts_complete_payload() {
        let problems = validate_payload(
            &rules(),
            &payload(json!({
                "title": "Organic Chemistry, 3rd ed.",
                "quantity": 12,
                "estimated_cost": "4599.50",
                "needed_by": "2026-11-02",
                "publisher": "ignored by validation"
            })),
        );

        assert!(problems.is_empty(), "unexpected problems: {problems:?}");
    }

    #[test]
    fn reports_every_missing_and_malformed_field() {
        let problems = validate_payload(
            &rules(),
            &payload(json!({
                "title": "   ",
                "estimated_cost": "about a thousand",
                "needed_by": "02/11/2026"
            })),
        );

        assert_eq!(
            problems,
            vec![
                "field `title` must be a non-empty string".to_string(),
                "missing required field `quantity`".to_string(),
                "field `estimated_cost` must be a decimal amount".to_string(),
                "field `needed_by` must be a YYYY-MM-DD date".to_string(),
            ]
        );
    }

    #[test]
    fn null_counts_as_missing() {
        let problems = validate_payload(
            &rules(),
            &payload(json!({ "title": "Lab coats", "quantity": null })),
        );

        assert_eq!(problems, vec!["missing required field `quantity`".to_string()]);
    }

    #[test]
    fn decimal_accepts_json_numbers_and_integer_rejects_fractions() {
        let problems = validate_payload(
            &rules(),
            &payload(json!({ "title": "Vernier calipers", "quantity": 2.5, "estimated_cost": 310.75 })),
        );

        assert_eq!(problems, vec!["field `quantity` must be a whole number".to_string()]);
    }

    #[test]
    fn positive_fields_reject_zero_and_negative_amounts() {
        let problems = validate_payload(
            &rules(),
            &payload(json!({ "title": "Beakers", "quantity": -5, "estimated_cost": "0.00" })),
        );

        assert_eq!(
            problems,
            vec![
                "field `quantity` must be greater than zero".to_string(),
                "field `estimated_cost` must be greater than zero".to_string(),
            ]
        );
        assert_eq!(
            validate_payload(&rules(), &payload(json!({ "title": "Beakers", "quantity": 0 }))),
            vec!["field `quantity` must be greater than zero".to_string()]
        );
    }

    #[test]
    fn decimal_accepts_scientific_notation() {
        let problems = validate_payload(
            &rules(),
            &payload(json!({ "title": "Fume hood", "quantity": 1, "estimated_cost": 1.5e3 })),
        );
        assert!(problems.is_empty(), "unexpected problems: {problems:?}");

        let problems = validate_payload(
            &rules(),
            &payload(json!({ "title": "Fume hood", "quantity": 1, "estimated_cost": "2.75E2" })),
        );
        assert!(problems.is_empty(), "unexpected problems: {problems:?}");
    }
}
