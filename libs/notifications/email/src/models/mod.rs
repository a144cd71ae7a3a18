use crate::error::AttachmentError;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;

const EMAIL_KEYS: &[&str] = &["email", "Email"];
const FIRST_NAME_KEYS: &[&str] = &["first_name", "FirstName", "first"];
const LAST_NAME_KEYS: &[&str] = &["last_name", "LastName"];
const ATTACHMENT_KEYS: &[&str] = &["attachment", "Attachment"];

/// MIME type used when the extension is unknown
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One row of the recipient list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientRecord {
    fields: BTreeMap<String, String>,
    line: Option<u64>,
}

impl RecipientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source line number (for log output)
    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn line(&self) -> Option<u64> {
        self.line
    }

    /// Non-empty value for an exact column name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn lookup(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|key| self.get(key))
    }

    /// Recipient address (`email` or `Email`)
    pub fn email(&self) -> Option<&str> {
        self.lookup(EMAIL_KEYS)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.lookup(FIRST_NAME_KEYS)
    }

    pub fn last_name(&self) -> Option<&str> {
        self.lookup(LAST_NAME_KEYS)
    }

    /// Attachment path (`attachment` or `Attachment`)
    pub fn attachment(&self) -> Option<&str> {
        self.lookup(ATTACHMENT_KEYS)
    }

    /// All raw columns, including empty ones
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RecipientRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// File attached to an outbound message
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create an attachment, guessing the MIME type from the filename
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Self {
            filename,
            content_type,
            data,
        }
    }

    /// Read an attachment from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => AttachmentError::NotFound(path.to_path_buf()),
            _ => AttachmentError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(filename, data))
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Fully rendered message for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Sender email address
    pub from_address: String,
    /// Optional sender display name
    pub from_name: Option<String>,
    /// Recipient email address
    pub to: String,
    pub subject: String,
    /// Plain text body
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl OutboundMessage {
    /// `Name <addr>` or the bare address, for logs
    pub fn sender_display(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_address),
            None => self.from_address.clone(),
        }
    }
}

/// Running tally for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn record_sent(&mut self) {
        self.total += 1;
        self.sent += 1;
    }

    pub fn record_failed(&mut self) {
        self.total += 1;
        self.failed += 1;
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} sent: {} failed: {}",
            self.total, self.sent, self.failed
        )
    }
}
