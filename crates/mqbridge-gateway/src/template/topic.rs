//! Topic templates: `{name}` placeholder substitution, nothing else.
//!
//! `{{` and `}}` stand for literal braces.

use mqbridge_kernel::{is_identifier, ParameterBinding, TemplateError};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TopicPart {
    Literal(String),
    Placeholder(String),
}

/// A parsed topic template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTemplate {
    source: String,
    parts: Vec<TopicPart>,
}

impl TopicTemplate {
    /// Parse a topic template. Fails on an unterminated `{`, a stray `}`,
    /// or a placeholder that is not an identifier.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err("unterminated '{' in topic template".to_string()),
                        }
                    }
                    if name.is_empty() {
                        return Err("empty placeholder '{}' in topic template".to_string());
                    }
                    if !is_identifier(&name) {
                        return Err(format!("placeholder '{{{name}}}' is not a valid identifier"));
                    }
                    if !literal.is_empty() {
                        parts.push(TopicPart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(TopicPart::Placeholder(name));
                }
                '}' => return Err("single '}' in topic template".to_string()),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(TopicPart::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names referenced by placeholders, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            TopicPart::Placeholder(name) => Some(name.as_str()),
            TopicPart::Literal(_) => None,
        })
    }

    /// Substitute every placeholder with the string form of its bound value.
    pub fn render(&self, binding: &ParameterBinding) -> Result<String, TemplateError> {
        let mut topic = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                TopicPart::Literal(text) => topic.push_str(text),
                TopicPart::Placeholder(name) => {
                    let value = binding
                        .get(name)
                        .ok_or_else(|| TemplateError::UnboundVariable(name.clone()))?;
                    let _ = write!(topic, "{value}");
                }
            }
        }
        Ok(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqbridge_kernel::ParamValue;

    #[test]
    fn renders_placeholders_in_place() {
        let template = TopicTemplate::parse("command/set_temperature/{room}").unwrap();
        let binding: ParameterBinding = [("room", ParamValue::String("bedroom".into()))]
            .into_iter()
            .collect();
        assert_eq!(
            template.render(&binding).unwrap(),
            "command/set_temperature/bedroom"
        );
    }

    #[test]
    fn numbers_render_in_natural_form() {
        let template = TopicTemplate::parse("zone/{id}/level/{level}").unwrap();
        let binding: ParameterBinding = [
            ("id", ParamValue::Int(4)),
            ("level", ParamValue::Float(2.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(template.render(&binding).unwrap(), "zone/4/level/2.0");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let template = TopicTemplate::parse("raw/{{x}}").unwrap();
        assert_eq!(template.placeholders().count(), 0);
        assert_eq!(template.render(&ParameterBinding::new()).unwrap(), "raw/{x}");
    }

    #[test]
    fn unbound_placeholder_is_a_template_error() {
        let template = TopicTemplate::parse("devices/{device}").unwrap();
        assert_eq!(
            template.render(&ParameterBinding::new()),
            Err(TemplateError::UnboundVariable("device".into()))
        );
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert!(TopicTemplate::parse("devices/{device").is_err());
        assert!(TopicTemplate::parse("devices/{}").is_err());
        assert!(TopicTemplate::parse("devices/{a b}").is_err());
        assert!(TopicTemplate::parse("devices/}").is_err());
    }
}
