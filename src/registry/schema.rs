//! Field schemas for registered component types, and coercion of untyped
//! document values into typed field values.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(ms|s|m|h)$").expect("valid duration regex"));

static MATCH_RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+\s+\S").expect("valid match rule regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    StringList,
    /// List of `<field> <regex>` rules.
    MatchList,
    Port,
    Bool,
    /// `<digits>(ms|s|m|h)`, e.g. `60s`.
    Duration,
    OneOf(&'static [&'static str]),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("a string"),
            FieldType::StringList => f.write_str("a list of strings"),
            FieldType::MatchList => f.write_str("a list of \"<field> <regex>\" rules"),
            FieldType::Port => f.write_str("a port number (1-65535)"),
            FieldType::Bool => f.write_str("a boolean"),
            FieldType::Duration => f.write_str("a duration such as 30s, 5m or 500ms"),
            FieldType::OneOf(options) => write!(f, "one of [{}]", options.join(", ")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }

    /// Coerce a document value into this field's type.
    ///
    /// Returns `None` when the value cannot be coerced; the caller reports it
    /// with `self.ty` as the expected type. Required lists must not be empty.
    /// Strings never carry control characters, so rendered line-based
    /// formats keep one value per line.
    pub fn coerce(&self, value: &Value) -> Option<FieldValue> {
        match self.ty {
            FieldType::String => scalar_string(value).map(FieldValue::Str),
            FieldType::StringList => self.list(value).map(FieldValue::List),
            FieldType::MatchList => self
                .list(value)
                .filter(|rules| rules.iter().all(|r| MATCH_RULE_RE.is_match(r)))
                .map(FieldValue::List),
            FieldType::Port => integer(value)
                .filter(|p| (1..=65535).contains(p))
                .map(FieldValue::Int),
            FieldType::Bool => match value {
                Value::Bool(b) => Some(FieldValue::Bool(*b)),
                Value::String(s) if s == "true" => Some(FieldValue::Bool(true)),
                Value::String(s) if s == "false" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            FieldType::Duration => scalar_string(value)
                .filter(|s| duration_millis(s).is_some_and(|ms| ms > 0))
                .map(FieldValue::Str),
            FieldType::OneOf(options) => match value {
                Value::String(s) if options.contains(&s.as_str()) => {
                    Some(FieldValue::Str(s.clone()))
                }
                _ => None,
            },
        }
    }

    fn list(&self, value: &Value) -> Option<Vec<String>> {
        let items = match value {
            Value::Array(items) => items
                .iter()
                .map(scalar_string)
                .collect::<Option<Vec<_>>>()?,
            other => vec![scalar_string(other)?],
        };
        if self.required && items.is_empty() {
            return None;
        }
        Some(items)
    }
}

/// Length of a duration accepted by `FieldType::Duration`, in milliseconds.
pub fn duration_millis(s: &str) -> Option<u64> {
    let caps = DURATION_RE.captures(s)?;
    let unit = caps.get(1)?.as_str();
    let n: u64 = s[..s.len() - unit.len()].parse().ok()?;
    let scale = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        _ => return None,
    };
    n.checked_mul(scale)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.chars().any(char::is_control) => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A schema-checked field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    List(Vec<String>),
    Int(i64),
    Bool(bool),
}

/// Typed field map of a validated component, keyed by field name.
pub type Fields = BTreeMap<String, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_accepts_scalars_only() {
        let spec = FieldSpec::optional("listen_host", FieldType::String);
        assert_eq!(
            spec.coerce(&json!("0.0.0.0")),
            Some(FieldValue::Str("0.0.0.0".into()))
        );
        assert_eq!(spec.coerce(&json!(5)), Some(FieldValue::Str("5".into())));
        assert_eq!(spec.coerce(&json!(["a"])), None);
        assert_eq!(spec.coerce(&json!({"a": 1})), None);
    }

    #[test]
    fn string_list_wraps_a_single_scalar() {
        let spec = FieldSpec::optional("exclude_paths", FieldType::StringList);
        assert_eq!(
            spec.coerce(&json!("/var/log/*.gz")),
            Some(FieldValue::List(vec!["/var/log/*.gz".into()]))
        );
        assert_eq!(spec.coerce(&json!([])), Some(FieldValue::List(vec![])));
        assert_eq!(spec.coerce(&json!(["/a", {"b": 1}])), None);
    }

    #[test]
    fn required_list_must_not_be_empty() {
        let spec = FieldSpec::required("include_paths", FieldType::StringList);
        assert_eq!(spec.coerce(&json!([])), None);
    }

    #[test]
    fn port_range_and_numeric_strings() {
        let spec = FieldSpec::required("listen_port", FieldType::Port);
        assert_eq!(spec.coerce(&json!(514)), Some(FieldValue::Int(514)));
        assert_eq!(spec.coerce(&json!("5140")), Some(FieldValue::Int(5140)));
        assert_eq!(spec.coerce(&json!(0)), None);
        assert_eq!(spec.coerce(&json!(70000)), None);
        assert_eq!(spec.coerce(&json!("http")), None);
    }

    #[test]
    fn bool_accepts_literal_strings() {
        let spec = FieldSpec::optional("record_log_file_path", FieldType::Bool);
        assert_eq!(spec.coerce(&json!(true)), Some(FieldValue::Bool(true)));
        assert_eq!(spec.coerce(&json!("false")), Some(FieldValue::Bool(false)));
        assert_eq!(spec.coerce(&json!("yes")), None);
    }

    #[test]
    fn duration_format() {
        let spec = FieldSpec::optional("collection_interval", FieldType::Duration);
        assert!(spec.coerce(&json!("60s")).is_some());
        assert!(spec.coerce(&json!("500ms")).is_some());
        assert!(spec.coerce(&json!("2h")).is_some());
        assert!(spec.coerce(&json!("60")).is_none());
        assert!(spec.coerce(&json!("1.5s")).is_none());
        assert!(spec.coerce(&json!(60)).is_none());
    }

    #[test]
    fn duration_must_fit_and_be_positive() {
        let spec = FieldSpec::optional("wildcard_refresh_interval", FieldType::Duration);
        assert!(spec.coerce(&json!("99999999999999999999s")).is_none());
        assert!(spec.coerce(&json!("0s")).is_none());
        assert!(spec.coerce(&json!("1ms")).is_some());
    }

    #[test]
    fn control_characters_are_rejected() {
        let path = "/var/log/a\n[OUTPUT]\n    Name stdout\n    Match *";
        let list = FieldSpec::required("include_paths", FieldType::StringList);
        assert_eq!(list.coerce(&json!([path])), None);
        assert_eq!(list.coerce(&json!(path)), None);

        let string = FieldSpec::required("regex", FieldType::String);
        assert_eq!(string.coerce(&json!("^a\rb$")), None);
        assert_eq!(string.coerce(&json!("a\tb")), None);
        assert_eq!(
            string.coerce(&json!(r"^(?<message>\S+)\t$")),
            Some(FieldValue::Str(r"^(?<message>\S+)\t$".into()))
        );

        let interval = FieldSpec::optional("collection_interval", FieldType::Duration);
        assert_eq!(interval.coerce(&json!("60s\n")), None);
    }

    #[test]
    fn match_rules_need_a_field_and_a_pattern() {
        let spec = FieldSpec::required("match_any", FieldType::MatchList);
        assert_eq!(
            spec.coerce(&json!(["severity DEBUG", "message  ^health.*"])),
            Some(FieldValue::List(vec![
                "severity DEBUG".into(),
                "message  ^health.*".into()
            ]))
        );
        assert_eq!(spec.coerce(&json!(["DEBUG"])), None);
        assert_eq!(spec.coerce(&json!(["severity "])), None);
        assert_eq!(spec.coerce(&json!([" DEBUG"])), None);
        assert_eq!(spec.coerce(&json!(["severity DEBUG", "INFO"])), None);
        assert_eq!(spec.coerce(&json!([])), None);
    }

    #[test]
    fn duration_millis_scales_units() {
        assert_eq!(duration_millis("500ms"), Some(500));
        assert_eq!(duration_millis("60s"), Some(60_000));
        assert_eq!(duration_millis("5m"), Some(300_000));
        assert_eq!(duration_millis("1h"), Some(3_600_000));
        assert_eq!(duration_millis("1d"), None);
    }

    #[test]
    fn one_of_lists_options_in_message() {
        let ty = FieldType::OneOf(&["tcp", "udp"]);
        let spec = FieldSpec::required("transport_protocol", ty);
        assert!(spec.coerce(&json!("udp")).is_some());
        assert!(spec.coerce(&json!("TCP")).is_none());
        assert_eq!(ty.to_string(), "one of [tcp, udp]");
    }
}
