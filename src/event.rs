//! Normalized event records
//!
//! Every record has the same flat shape regardless of event kind: fields
//! that do not apply are filled with zero or empty values, never omitted.

use chrono::{DateTime, Local, Utc};
use colored::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::registry::{NO_RESOURCE, ResourceId};
use crate::session::SessionContext;

/// Semantic operation carried by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Open,
    Add,
    Delete,
    Replace,
    Close,
    Save,
    Focus,
    Visible,
    SelectionChange,
    ViewColumnChange,
    WindowFocused,
    WindowBlurred,
    WorkspaceFoldersChange,
    FsCreate,
    FsChange,
    FsDelete,
    Rename,
    Create,
    #[serde(rename = "delete-file")]
    DeleteFile,
    Preview,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Add => "add",
            Operation::Delete => "delete",
            Operation::Replace => "replace",
            Operation::Close => "close",
            Operation::Save => "save",
            Operation::Focus => "focus",
            Operation::Visible => "visible",
            Operation::SelectionChange => "selectionChange",
            Operation::ViewColumnChange => "viewColumnChange",
            Operation::WindowFocused => "windowFocused",
            Operation::WindowBlurred => "windowBlurred",
            Operation::WorkspaceFoldersChange => "workspaceFoldersChange",
            Operation::FsCreate => "fsCreate",
            Operation::FsChange => "fsChange",
            Operation::FsDelete => "fsDelete",
            Operation::Rename => "rename",
            Operation::Create => "create",
            Operation::DeleteFile => "delete-file",
            Operation::Preview => "preview",
        }
    }

    /// Classify a single text edit.
    ///
    /// An empty range receiving text is an insertion, a non-empty range
    /// receiving nothing is a deletion, and everything else is a replacement.
    pub fn from_edit(range: &TextRange, inserted: &str) -> Self {
        match (range.is_empty(), inserted.is_empty()) {
            (true, false) => Operation::Add,
            (false, true) => Operation::Delete,
            _ => Operation::Replace,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero-based line/character range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_line: u32,
    pub start_character: u32,
    pub end_line: u32,
    pub end_character: u32,
}

impl TextRange {
    #[cfg(test)]
    pub fn new(start_line: u32, start_character: u32, end_line: u32, end_character: u32) -> Self {
        Self {
            start_line,
            start_character,
            end_line,
            end_character,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_line == self.end_line && self.start_character == self.end_character
    }
}

/// One captured interaction, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_name: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub machine_id: String,
    pub environment: String,
    pub uri: String,
    pub file_id: ResourceId,
    pub operation: Operation,
    #[serde(serialize_with = "content_or_empty", deserialize_with = "empty_as_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub range: TextRange,
    pub range_offset: u64,
    pub range_length: u64,
}

fn content_or_empty<S: Serializer>(content: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(content.as_deref().unwrap_or(""))
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

impl EventRecord {
    /// Start a resource-less record stamped with the session fields and the current time
    pub fn new(event_name: &str, operation: Operation, session: &SessionContext) -> Self {
        Self {
            event_name: event_name.to_string(),
            timestamp: Utc::now(),
            session_id: session.session_id.clone(),
            machine_id: session.machine_id.clone(),
            environment: session.environment.clone(),
            uri: String::new(),
            file_id: NO_RESOURCE,
            operation,
            content: None,
            range: TextRange::default(),
            range_offset: 0,
            range_length: 0,
        }
    }

    pub fn with_resource(mut self, uri: impl Into<String>, file_id: ResourceId) -> Self {
        self.uri = uri.into();
        self.file_id = file_id;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_range(mut self, range: TextRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_offset(mut self, offset: u64, length: u64) -> Self {
        self.range_offset = offset;
        self.range_length = length;
        self
    }

    /// Copy of this record with the content payload stripped
    pub fn without_content(&self) -> Self {
        Self {
            content: None,
            ..self.clone()
        }
    }

    /// Single-line JSON form used by the file and console exporters
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Format for terminal display
    pub fn format_display(&self) -> String {
        let local_time = self.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        let op = self.operation.as_str();
        let op_colored = match self.operation {
            Operation::Open | Operation::Create | Operation::FsCreate => op.green(),
            Operation::Close | Operation::DeleteFile | Operation::FsDelete | Operation::Delete => op.red(),
            Operation::Add | Operation::Replace | Operation::Save | Operation::FsChange => op.cyan(),
            Operation::WindowFocused | Operation::WindowBlurred | Operation::Focus => op.yellow(),
            _ => op.normal(),
        };

        let mut parts = vec![
            local_time.to_string().dimmed().to_string(),
            self.event_name.bold().to_string(),
            op_colored.to_string(),
        ];

        if !self.uri.is_empty() {
            parts.push(format!("#{} {}", self.file_id, self.uri));
        }

        if !self.range.is_empty() || self.range_length > 0 {
            let r = &self.range;
            parts.push(
                format!("{}:{}-{}:{}", r.start_line, r.start_character, r.end_line, r.end_character)
                    .dimmed()
                    .to_string(),
            );
        }

        if let Some(ref content) = self.content {
            parts.push(format!("({} bytes)", content.len()).dimmed().to_string());
        }

        parts.join(" ")
    }
}
