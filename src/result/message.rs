use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a message, ordered from harmless to fatal.
///
/// The numeric values are bit flags so severities can be combined into
/// filters; the ordering is what determines the status of a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Unknown = 0,
    Success = 1,
    Info = 2,
    Log = 4,
    Notice = 8,
    Warning = 16,
    Error = 32,
    Exception = 64,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Success => "success",
            Self::Info => "info",
            Self::Log => "log",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Exception => "exception",
        }
    }
}

/// Status code as returned by the Acumulus web service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiStatus {
    /// 0: processed without remarks.
    Success,
    /// 1: not processed, see errors.
    Errors,
    /// 2: processed, see warnings.
    Warnings,
    /// 3: server side exception.
    Exception,
}

impl ApiStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Errors => 1,
            Self::Warnings => 2,
            Self::Exception => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Errors),
            2 => Some(Self::Warnings),
            3 => Some(Self::Exception),
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Success => Severity::Success,
            Self::Errors => Severity::Error,
            Self::Warnings => Severity::Warning,
            Self::Exception => Severity::Exception,
        }
    }
}

/// A single message: local (completor, validation) or remote (Acumulus
/// `error`/`warning` entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    /// Numeric or short code, e.g. "403" for remote messages.
    pub code: Option<String>,
    /// Acumulus code tag (e.g. "XGYBSN000") or a local tag (e.g.
    /// "vatrate-nomatch").
    pub code_tag: Option<String>,
    pub severity: Severity,
    /// Dot-separated path to the field the message is about.
    pub field: Option<String>,
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.severity.label())?;
        match (&self.code, &self.code_tag) {
            (Some(code), Some(tag)) => write!(f, "{code}, {tag}: ")?,
            (Some(code), None) => write!(f, "{code}: ")?,
            (None, Some(tag)) => write!(f, "{tag}: ")?,
            (None, None) => {}
        }
        if let Some(field) = &self.field {
            write!(f, "{field}: ")?;
        }
        write!(f, "{}", self.text)
    }
}

impl Message {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
            code_tag: None,
            severity,
            field: None,
        }
    }

    /// Local message with a code tag.
    pub fn tagged(severity: Severity, code_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code_tag: Some(code_tag.into()),
            ..Self::new(severity, text)
        }
    }

    pub fn error(code_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::tagged(Severity::Error, code_tag, text)
    }

    pub fn warning(code_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::tagged(Severity::Warning, code_tag, text)
    }

    pub fn notice(code_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::tagged(Severity::Notice, code_tag, text)
    }

    pub fn log(code_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::tagged(Severity::Log, code_tag, text)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Build a message from an Acumulus `{code, codetag, message}` object.
    pub fn from_api(value: &Value, severity: Severity) -> Self {
        let text_of = |key: &str| -> Option<String> {
            match value.get(key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            }
        };
        let text = match value {
            Value::String(s) => s.clone(),
            _ => text_of("message").unwrap_or_default(),
        };
        Self {
            text,
            code: text_of("code"),
            code_tag: text_of("codetag"),
            severity,
            field: None,
        }
    }
}
