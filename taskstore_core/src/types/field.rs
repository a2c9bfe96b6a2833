use std::fmt;

/// Logical kind of a task-record column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Dict,
    Buffers,
    Timestamp,
}

impl FieldKind {
    /// Buffer lists are opaque blobs and cannot appear in a filter.
    pub fn is_filterable(self) -> bool {
        !matches!(self, FieldKind::Buffers)
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Dict => "dict",
            FieldKind::Buffers => "buffers",
            FieldKind::Timestamp => "timestamp",
        }
    }
}

/// The 22 columns of a task record, declared in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    MsgId,
    Header,
    Metadata,
    Content,
    Buffers,
    Submitted,
    ClientUuid,
    EngineUuid,
    Started,
    Completed,
    Resubmitted,
    Received,
    ResultHeader,
    ResultMetadata,
    ResultContent,
    ResultBuffers,
    Queue,
    ExecuteInput,
    ExecuteResult,
    Error,
    Stdout,
    Stderr,
}

impl Field {
    pub const ALL: [Field; 22] = [
        Field::MsgId,
        Field::Header,
        Field::Metadata,
        Field::Content,
        Field::Buffers,
        Field::Submitted,
        Field::ClientUuid,
        Field::EngineUuid,
        Field::Started,
        Field::Completed,
        Field::Resubmitted,
        Field::Received,
        Field::ResultHeader,
        Field::ResultMetadata,
        Field::ResultContent,
        Field::ResultBuffers,
        Field::Queue,
        Field::ExecuteInput,
        Field::ExecuteResult,
        Field::Error,
        Field::Stdout,
        Field::Stderr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::MsgId => "msg_id",
            Field::Header => "header",
            Field::Metadata => "metadata",
            Field::Content => "content",
            Field::Buffers => "buffers",
            Field::Submitted => "submitted",
            Field::ClientUuid => "client_uuid",
            Field::EngineUuid => "engine_uuid",
            Field::Started => "started",
            Field::Completed => "completed",
            Field::Resubmitted => "resubmitted",
            Field::Received => "received",
            Field::ResultHeader => "result_header",
            Field::ResultMetadata => "result_metadata",
            Field::ResultContent => "result_content",
            Field::ResultBuffers => "result_buffers",
            Field::Queue => "queue",
            Field::ExecuteInput => "execute_input",
            Field::ExecuteResult => "execute_result",
            Field::Error => "error",
            Field::Stdout => "stdout",
            Field::Stderr => "stderr",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Header
            | Field::Metadata
            | Field::Content
            | Field::ResultHeader
            | Field::ResultMetadata
            | Field::ResultContent => FieldKind::Dict,
            Field::Buffers | Field::ResultBuffers => FieldKind::Buffers,
            Field::Submitted | Field::Started | Field::Completed | Field::Received => {
                FieldKind::Timestamp
            }
            _ => FieldKind::Text,
        }
    }

    /// Position of the column in the table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column identifier ready to splice into SQL. Names come from the closed
    /// catalog above, so quoting is the only escaping needed.
    pub fn quoted(self) -> String {
        format!("\"{}\"", self.name())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn parse_field(name: &str) -> Result<Field, String> {
    Field::ALL
        .iter()
        .copied()
        .find(|f| f.name() == name)
        .ok_or_else(|| format!("Unknown task record field '{name}'"))
}
