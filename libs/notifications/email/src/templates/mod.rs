//! Plain-text body templates
//!
//! Placeholders use single braces: `Hello {first_name}`. Literal braces are
//! written doubled (`{{` and `}}`). Every placeholder must resolve; nothing
//! is ever left in the output as a raw token.

use crate::error::TemplateError;
use std::collections::HashMap;

/// Body used when no template file is given
pub const DEFAULT_TEMPLATE: &str = "Hello {first_name},\n\n\
This is an automated message.\n\n\
Best regards,\n\
{sender_name}\n";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed body template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template, rejecting unbalanced braces and empty placeholders
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, next)| next) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, '{')) | None => {
                                return Err(TemplateError::Malformed {
                                    position,
                                    reason: "unclosed '{'",
                                });
                            }
                            Some((_, ch)) => name.push(ch),
                        }
                    }
                    if name.is_empty() {
                        return Err(TemplateError::Malformed {
                            position,
                            reason: "empty placeholder",
                        });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' if chars.peek().map(|&(_, next)| next) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(TemplateError::Malformed {
                        position,
                        reason: "single '}' encountered",
                    });
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// The built-in greeting template
    pub fn builtin() -> Self {
        Self::parse(DEFAULT_TEMPLATE).expect("built-in template is well-formed")
    }

    /// Placeholder names in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Check that every placeholder is one of `known`
    pub fn validate<'a>(
        &self,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), TemplateError> {
        let known: Vec<&str> = known.into_iter().collect();
        match self.placeholders().find(|name| !known.contains(name)) {
            Some(name) => Err(TemplateError::UnknownPlaceholder(name.to_string())),
            None => Ok(()),
        }
    }

    /// Substitute every placeholder from `vars`
    pub fn render(&self, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = vars
                        .get(name)
                        .ok_or_else(|| TemplateError::UnknownPlaceholder(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_builtin_template_renders() {
        let template = Template::builtin();
        let rendered = template
            .render(&vars(&[("first_name", "Ada"), ("sender_name", "Ops Team")]))
            .unwrap();

        assert_eq!(
            rendered,
            "Hello Ada,\n\nThis is an automated message.\n\nBest regards,\nOps Team\n"
        );
    }

    #[test]
    fn test_placeholders_in_order() {
        let template = Template::parse("{email} / {first_name} {last_name}").unwrap();
        let names: Vec<_> = template.placeholders().collect();
        assert_eq!(names, ["email", "first_name", "last_name"]);
    }

    #[test]
    fn test_escaped_braces() {
        let template = Template::parse("{{literal}} for {first_name}").unwrap();
        let rendered = template.render(&vars(&[("first_name", "Bob")])).unwrap();
        assert_eq!(rendered, "{literal} for Bob");
        assert_eq!(template.placeholders().count(), 1);
    }

    #[test]
    fn test_unknown_placeholder_is_error() {
        let template = Template::parse("Hi {nickname}").unwrap();
        let err = template.render(&vars(&[("first_name", "Ada")])).unwrap_err();
        assert_eq!(err, TemplateError::UnknownPlaceholder("nickname".into()));
    }

    #[test]
    fn test_validate_against_known_names() {
        let template = Template::parse("{first_name} {company}").unwrap();
        assert!(template.validate(["first_name", "company"]).is_ok());
        assert_eq!(
            template.validate(["first_name"]).unwrap_err(),
            TemplateError::UnknownPlaceholder("company".into())
        );
    }

    #[test]
    fn test_malformed_templates() {
        assert!(matches!(
            Template::parse("Hello {first_name"),
            Err(TemplateError::Malformed { position: 6, .. })
        ));
        assert!(matches!(
            Template::parse("Hello {}"),
            Err(TemplateError::Malformed { reason: "empty placeholder", .. })
        ));
        assert!(matches!(
            Template::parse("oops }"),
            Err(TemplateError::Malformed { position: 5, .. })
        ));
        assert!(matches!(
            Template::parse("{a{b}}"),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let template = Template::parse("Hi {first_name}").unwrap();
        let rendered = template.render(&vars(&[("first_name", "{email}")])).unwrap();
        assert_eq!(rendered, "Hi {email}");
    }
}
