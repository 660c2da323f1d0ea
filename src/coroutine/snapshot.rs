use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the compiler-generated resumption entry point of a suspend lambda.
pub const INVOKE_SUSPEND: &str = "invokeSuspend";

/// Method identity as reported by the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRef {
    pub declaring_type: String,
    pub name: String,
}

impl MethodRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }

    pub fn is_invoke_suspend(&self) -> bool {
        self.name == INVOKE_SUSPEND
    }
}

/// A source location. `line` is `None` when the target has no line table entry;
/// synthetic code may also report a negative line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub method: MethodRef,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub line: Option<i32>,
}

impl Location {
    pub fn new(method: MethodRef, source_name: Option<&str>, line: Option<i32>) -> Self {
        Self {
            method,
            source_name: source_name.map(str::to_string),
            line,
        }
    }

    /// Line as shown to a user: unknown and negative lines collapse to `None`.
    pub fn display_line(&self) -> Option<u32> {
        self.line.and_then(|l| u32::try_from(l).ok())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.method.declaring_type, self.method.name)?;
        match (&self.source_name, self.line) {
            (Some(source), Some(line)) => write!(f, "({}:{})", source, line),
            (Some(source), None) => write!(f, "({})", source),
            (None, Some(line)) => write!(f, ":{}", line),
            (None, None) => write!(f, ":?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub type_name: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            type_name: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// One restored entry of a coroutine's logical call chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalFrame {
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub spilled_variables: Vec<Variable>,
}

impl LogicalFrame {
    pub fn new(location: Location, spilled_variables: Vec<Variable>) -> Self {
        Self {
            location: Some(location),
            spilled_variables,
        }
    }
}

/// Captured logical call chain of one suspended coroutine, innermost frame first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub frames: Vec<LogicalFrame>,
}

impl TaskSnapshot {
    pub fn new(frames: Vec<LogicalFrame>) -> Self {
        Self { name: None, frames }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> Option<&LogicalFrame> {
        self.frames.first()
    }

    /// Logical frames left once the innermost one is folded into the merged top frame.
    pub fn restored_below_top(&self) -> &[LogicalFrame] {
        self.frames.get(1..).unwrap_or(&[])
    }
}
