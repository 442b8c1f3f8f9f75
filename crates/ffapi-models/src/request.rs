//! Process request definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::storage::S3Config;

/// A declarative processing request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessRequest {
    /// Object storage connection used for `s3` inputs and uploads
    pub s3_config: S3Config,
    /// Named inputs; the name is the file name inside the job workspace
    pub inputs: HashMap<String, Input>,
    /// FFmpeg invocations, run in order
    pub commands: Vec<CommandStep>,
    /// How results are delivered
    pub output: OutputSpec,
}

impl ProcessRequest {
    /// Whether `name` is reserved by an input (and therefore not an output).
    pub fn is_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }
}

/// Source descriptor for a single input.
///
/// On the wire every selector is optional; [`Input::source`] picks the one
/// that is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    /// Object storage address (`s3://bucket/key`)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub s3: String,
    /// Plain HTTP(S) URL
    #[serde(skip_serializing_if = "String::is_empty")]
    pub http: String,
    /// Inline standard base64 payload
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base64: String,
    /// Reserve the name without fetching anything
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub temporary: bool,
}

/// Resolved input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource<'a> {
    Object(&'a str),
    Http(&'a str),
    Inline(&'a str),
    Placeholder,
}

impl InputSource<'_> {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            InputSource::Object(_) => "s3",
            InputSource::Http(_) => "http",
            InputSource::Inline(_) => "base64",
            InputSource::Placeholder => "temporary",
        }
    }
}

impl Input {
    pub fn object(address: impl Into<String>) -> Self {
        Self {
            s3: address.into(),
            ..Self::default()
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self {
            http: url.into(),
            ..Self::default()
        }
    }

    pub fn inline(payload: impl Into<String>) -> Self {
        Self {
            base64: payload.into(),
            ..Self::default()
        }
    }

    pub fn placeholder() -> Self {
        Self {
            temporary: true,
            ..Self::default()
        }
    }

    /// Resolve the selector to use.
    ///
    /// Precedence is object address, HTTP URL, inline payload, placeholder;
    /// the first one that is set wins. Returns `None` when nothing is set.
    pub fn source(&self) -> Option<InputSource<'_>> {
        if !self.s3.is_empty() {
            Some(InputSource::Object(&self.s3))
        } else if !self.http.is_empty() {
            Some(InputSource::Http(&self.http))
        } else if !self.base64.is_empty() {
            Some(InputSource::Inline(&self.base64))
        } else if self.temporary {
            Some(InputSource::Placeholder)
        } else {
            None
        }
    }
}

/// Arguments for one FFmpeg invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandStep(pub Vec<String>);

impl CommandStep {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    pub fn args(&self) -> &[String] {
        &self.0
    }
}

/// Output delivery options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputSpec {
    /// Upload target prefix (`s3://bucket/prefix`)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub s3: String,
    /// Inline each output as base64 in the response
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub base64: bool,
    /// When non-empty, stream the first output with this content type
    #[serde(skip_serializing_if = "String::is_empty")]
    pub inline_content_type: String,
}

impl OutputSpec {
    /// Content type for streaming mode, if streaming was requested.
    pub fn streaming_content_type(&self) -> Option<&str> {
        if self.inline_content_type.is_empty() {
            None
        } else {
            Some(&self.inline_content_type)
        }
    }

    /// Upload target, if one was configured.
    pub fn upload_target(&self) -> Option<&str> {
        if self.s3.is_empty() {
            None
        } else {
            Some(&self.s3)
        }
    }
}
