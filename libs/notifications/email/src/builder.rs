//! Per-recipient message rendering

use crate::error::{BuildError, TemplateError};
use crate::models::{Attachment, OutboundMessage, RecipientRecord};
use crate::templates::Template;
use std::collections::HashMap;
use tracing::warn;

/// Placeholders available to every template regardless of CSV columns
pub const CANONICAL_KEYS: [&str; 4] = ["first_name", "last_name", "email", "sender_name"];

/// Renders outbound messages from recipient records
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    subject: String,
    template: Template,
    from_address: String,
    from_name: Option<String>,
}

impl MessageBuilder {
    pub fn new(
        subject: impl Into<String>,
        template: Template,
        from_address: impl Into<String>,
        from_name: Option<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            template,
            from_address: from_address.into(),
            from_name: from_name.filter(|name| !name.is_empty()),
        }
    }

    /// Value of the `{sender_name}` placeholder
    pub fn sender_name(&self) -> &str {
        self.from_name.as_deref().unwrap_or(&self.from_address)
    }

    /// Check the template against the canonical keys plus the given CSV columns
    pub fn validate(&self, columns: &[String]) -> Result<(), TemplateError> {
        self.template.validate(
            CANONICAL_KEYS
                .iter()
                .copied()
                .chain(columns.iter().map(String::as_str)),
        )
    }

    /// Build the message for one recipient
    ///
    /// A missing or unreadable attachment is logged and skipped; the message
    /// is still built.
    pub fn build(&self, record: &RecipientRecord) -> Result<OutboundMessage, BuildError> {
        let to = record.email().ok_or(BuildError::MissingEmail)?;
        let body = self.template.render(&self.substitutions(record, to))?;

        let attachment = record.attachment().and_then(|path| {
            Attachment::load(path)
                .map_err(|e| {
                    warn!(to = %to, error = %e, "Continuing without attachment");
                })
                .ok()
        });

        Ok(OutboundMessage {
            from_address: self.from_address.clone(),
            from_name: self.from_name.clone(),
            to: to.to_string(),
            subject: self.subject.clone(),
            body,
            attachment,
        })
    }

    fn substitutions(&self, record: &RecipientRecord, to: &str) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = record
            .fields()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let canonical = [
            ("first_name", record.first_name().unwrap_or_default()),
            ("last_name", record.last_name().unwrap_or_default()),
            ("email", to),
            ("sender_name", self.sender_name()),
        ];
        for (key, value) in canonical {
            vars.insert(key.to_string(), value.to_string());
        }

        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> RecipientRecord {
        pairs.iter().copied().collect()
    }

    fn builder(template: &str, from_name: Option<&str>) -> MessageBuilder {
        MessageBuilder::new(
            "Quarterly update",
            Template::parse(template).unwrap(),
            "ops@example.com",
            from_name.map(str::to_string),
        )
    }

    #[test]
    fn test_sender_name_with_display_name() {
        let builder = builder("x", Some("Ops Team"));
        assert_eq!(builder.sender_name(), "Ops Team");

        let message = builder.build(&record(&[("email", "a@example.com")])).unwrap();
        assert_eq!(message.from_address, "ops@example.com");
        assert_eq!(message.from_name.as_deref(), Some("Ops Team"));
        assert_eq!(message.sender_display(), "Ops Team <ops@example.com>");
    }

    #[test]
    fn test_sender_name_without_display_name() {
        let builder = builder("x", None);
        assert_eq!(builder.sender_name(), "ops@example.com");

        let message = builder.build(&record(&[("email", "a@example.com")])).unwrap();
        assert_eq!(message.sender_display(), "ops@example.com");
    }

    #[test]
    fn test_empty_from_name_is_ignored() {
        let builder = builder("x", Some(""));
        let message = builder.build(&record(&[("email", "a@example.com")])).unwrap();
        assert!(message.from_name.is_none());
    }

    #[test]
    fn test_display_name_is_kept_verbatim() {
        let builder = builder("x", Some("Acme, Inc."));
        let message = builder.build(&record(&[("email", "a@example.com")])).unwrap();
        assert_eq!(message.from_name.as_deref(), Some("Acme, Inc."));
        assert_eq!(message.from_address, "ops@example.com");
    }

    #[test]
    fn test_build_renders_body() {
        let builder = builder("Hi {first_name} {last_name} <{email}>, from {sender_name}", None);
        let message = builder
            .build(&record(&[
                ("Email", "ada@example.com"),
                ("FirstName", "Ada"),
                ("LastName", "Lovelace"),
            ]))
            .unwrap();

        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, "Quarterly update");
        assert_eq!(message.from_address, "ops@example.com");
        assert!(message.from_name.is_none());
        assert_eq!(
            message.body,
            "Hi Ada Lovelace <ada@example.com>, from ops@example.com"
        );
        assert!(message.attachment.is_none());
    }

    #[test]
    fn test_missing_names_render_empty() {
        let builder = builder("Hello {first_name}!", None);
        let message = builder.build(&record(&[("email", "x@example.com")])).unwrap();
        assert_eq!(message.body, "Hello !");
    }

    #[test]
    fn test_extra_columns_are_substitutable() {
        let builder = builder("Your plan: {plan}", None);
        assert!(builder.validate(&["email".to_string(), "plan".to_string()]).is_ok());

        let message = builder
            .build(&record(&[("email", "x@example.com"), ("plan", "Pro")]))
            .unwrap();
        assert_eq!(message.body, "Your plan: Pro");
    }

    #[test]
    fn test_validate_rejects_unknown_placeholder() {
        let builder = builder("Hi {nickname}", None);
        let err = builder.validate(&["email".to_string()]).unwrap_err();
        assert_eq!(err, TemplateError::UnknownPlaceholder("nickname".into()));
    }

    #[test]
    fn test_missing_email_fails() {
        let builder = builder("Hi", None);
        let err = builder.build(&record(&[("first_name", "Ada")])).unwrap_err();
        assert!(matches!(err, BuildError::MissingEmail));
    }

    #[test]
    fn test_unreadable_attachment_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        let builder = builder("Hi", None);

        let message = builder
            .build(&record(&[
                ("email", "x@example.com"),
                ("attachment", missing.to_str().unwrap()),
            ]))
            .unwrap();

        assert_eq!(message.to, "x@example.com");
        assert!(message.attachment.is_none());
    }

    #[test]
    fn test_directory_attachment_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder("Hi", None);

        let message = builder
            .build(&record(&[
                ("email", "x@example.com"),
                ("Attachment", dir.path().to_str().unwrap()),
            ]))
            .unwrap();

        assert!(message.attachment.is_none());
    }

    #[test]
    fn test_attachment_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let builder = builder("Hi", Some("Reports"));

        let message = builder
            .build(&record(&[
                ("email", "x@example.com"),
                ("attachment", path.to_str().unwrap()),
            ]))
            .unwrap();

        let attachment = message.attachment.unwrap();
        assert_eq!(attachment.filename, "report.pdf");
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.data, b"%PDF-1.4");
        assert_eq!(message.from_address, "ops@example.com");
        assert_eq!(message.from_name.as_deref(), Some("Reports"));
    }
}
