//! Payload templates, rendered with [`tera`].
//!
//! Each template gets its own [`Tera`] instance holding exactly one template.
//! Autoescaping is off, and the builtin functions that reach outside the
//! binding (`get_env`, `now`, `get_random`) are replaced with ones that fail.
//! A `tojson` filter is registered next to the builtin `json_encode`.
//!
//! The rendered string is handed to the broker as-is; whether it is valid
//! JSON is the template author's concern.

use mqbridge_kernel::{ParameterBinding, TemplateError};
use std::collections::HashMap;
use std::fmt;
use tera::{Context, Tera, Value};

const TEMPLATE_NAME: &str = "payload";

const DISABLED_FUNCTIONS: [&str; 3] = ["get_env", "now", "get_random"];

/// A parsed payload template, ready to render against many bindings.
pub struct PayloadTemplate {
    source: String,
    tera: Tera,
}

impl PayloadTemplate {
    /// Parse the template. Syntax errors are reported with a description.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        for name in DISABLED_FUNCTIONS {
            tera.register_function(
                name,
                move |_: &HashMap<String, Value>| -> tera::Result<Value> {
                    Err(tera::Error::msg(format!(
                        "function '{name}' is not available in payload templates"
                    )))
                },
            );
        }
        tera.register_filter("tojson", tojson);
        tera.add_raw_template(TEMPLATE_NAME, source)
            .map_err(|e| describe(&e))?;

        Ok(Self {
            source: source.to_string(),
            tera,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, binding: &ParameterBinding) -> Result<String, TemplateError> {
        let mut context = Context::new();
        for (name, value) in binding.iter() {
            context.insert(name, value);
        }
        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| render_error(&e))
    }
}

impl fmt::Debug for PayloadTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadTemplate")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

fn tojson(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    serde_json::to_string(value)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(format!("tojson: {e}")))
}

/// Flatten a tera error and its sources into one line.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn render_error(err: &tera::Error) -> TemplateError {
    let message = describe(err);
    match unbound_variable(&message) {
        Some(name) => TemplateError::UnboundVariable(name),
        None => TemplateError::Render(message),
    }
}

// tera reports a missing name as "Variable `name` not found in context ...".
fn unbound_variable(message: &str) -> Option<String> {
    let rest = message.split("Variable `").nth(1)?;
    let (name, tail) = rest.split_once('`')?;
    tail.starts_with(" not found in context")
        .then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqbridge_kernel::ParamValue;

    fn thermostat_binding() -> ParameterBinding {
        [
            ("room", ParamValue::String("bedroom".into())),
            ("target", ParamValue::Float(21.5)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn substitutes_strings_raw_and_numbers_unquoted() {
        let template =
            PayloadTemplate::parse(r#"{"room": "{{room}}", "target_temperature": {{target}}}"#)
                .unwrap();
        assert_eq!(
            template.render(&thermostat_binding()).unwrap(),
            r#"{"room": "bedroom", "target_temperature": 21.5}"#
        );
    }

    #[test]
    fn markup_in_values_is_not_escaped() {
        let template = PayloadTemplate::parse("{{ room }}").unwrap();
        let binding: ParameterBinding = [("room", ParamValue::String("<a & b>".into()))]
            .into_iter()
            .collect();
        assert_eq!(template.render(&binding).unwrap(), "<a & b>");
    }

    #[test]
    fn booleans_render_as_words() {
        let template = PayloadTemplate::parse(r#"{"on": {{ enabled }}}"#).unwrap();
        let binding: ParameterBinding = [("enabled", ParamValue::Bool(false))]
            .into_iter()
            .collect();
        assert_eq!(template.render(&binding).unwrap(), r#"{"on": false}"#);
    }

    #[test]
    fn tojson_quotes_strings_only() {
        let template = PayloadTemplate::parse(r#"[{{ room | tojson }}, {{ target | tojson }}]"#)
            .unwrap();
        assert_eq!(
            template.render(&thermostat_binding()).unwrap(),
            r#"["bedroom", 21.5]"#
        );
    }

    #[test]
    fn conditional_blocks_select_output() {
        let template = PayloadTemplate::parse(
            r#"{"mode": "{% if target > 22 %}cool{% elif target < 18 %}heat{% else %}hold{% endif %}"}"#,
        )
        .unwrap();
        assert_eq!(
            template.render(&thermostat_binding()).unwrap(),
            r#"{"mode": "hold"}"#
        );
    }

    #[test]
    fn arithmetic_on_floats_keeps_sign() {
        let template = PayloadTemplate::parse("{{ target - 24 }}|{{ target + 1 }}").unwrap();
        assert_eq!(template.render(&thermostat_binding()).unwrap(), "-2.5|22.5");
    }

    #[test]
    fn string_literals_may_contain_delimiters() {
        let template = PayloadTemplate::parse(r#"{{ "}}" ~ room }}"#).unwrap();
        assert_eq!(template.render(&thermostat_binding()).unwrap(), "}}bedroom");
    }

    #[test]
    fn optional_fields_can_be_guarded() {
        let template = PayloadTemplate::parse(
            "{\"room\": \"{{ room }}\"\n{%- if duration is defined %}, \"duration\": {{ duration }}{% endif -%}\n}",
        )
        .unwrap();
        assert_eq!(
            template.render(&thermostat_binding()).unwrap(),
            "{\"room\": \"bedroom\"}"
        );
    }

    #[test]
    fn default_filter_fills_missing_values() {
        let template = PayloadTemplate::parse("{{ duration | default(value=60) }}").unwrap();
        assert_eq!(template.render(&thermostat_binding()).unwrap(), "60");
    }

    #[test]
    fn unbound_reference_fails_rendering() {
        let template = PayloadTemplate::parse(r#"{"d": {{ duration }}}"#).unwrap();
        let err = template.render(&thermostat_binding()).unwrap_err();
        assert!(err.to_string().contains("duration"), "{err}");
    }

    #[test]
    fn environment_functions_are_disabled() {
        let template = PayloadTemplate::parse(r#"{{ get_env(name="HOME") }}"#).unwrap();
        let err = template.render(&thermostat_binding()).unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
        assert!(err.to_string().contains("not available"), "{err}");
    }

    #[test]
    fn syntax_errors_are_rejected_at_parse_time() {
        assert!(PayloadTemplate::parse("not json {{ room }").is_err());
        assert!(PayloadTemplate::parse("{% if room %}never closed").is_err());
        assert!(PayloadTemplate::parse("{{ 1 + }}").is_err());
    }

    #[test]
    fn text_outside_delimiters_is_passed_through() {
        let template = PayloadTemplate::parse("room={{ room }}; raw").unwrap();
        assert_eq!(
            template.render(&thermostat_binding()).unwrap(),
            "room=bedroom; raw"
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let template = PayloadTemplate::parse("{{ room | upper }}:{{ target }}").unwrap();
        let binding = thermostat_binding();
        let first = template.render(&binding).unwrap();
        assert_eq!(first, "BEDROOM:21.5");
        assert_eq!(template.render(&binding).unwrap(), first);
    }

    #[test]
    fn unbound_variable_name_is_extracted_from_engine_message() {
        let message = "Failed to render 'payload': \
                       Variable `duration` not found in context while rendering 'payload'";
        assert_eq!(unbound_variable(message), Some("duration".to_string()));
        assert_eq!(unbound_variable("Filter `nope` not found"), None);
    }
}
