// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error type shared by the handler and its collaborators

use std::borrow::Cow;
use std::fmt;

/// Cause attached to an [`Error`]
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync>;

/// Category of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Configuration is invalid or refers to inaccessible resources
    ConfigError,
    /// A file could not be opened
    FileOpenError,
    /// Reading from or seeking within a file failed
    FileReadError,
    /// Writing the response to the client failed, for use by transport implementations
    WriteError,
    /// A response header could not be produced
    InvalidHeader,
}

impl ErrorType {
    /// Short description of the error category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "ConfigError",
            Self::FileOpenError => "FileOpenError",
            Self::FileReadError => "FileReadError",
            Self::WriteError => "WriteError",
            Self::InvalidHeader => "InvalidHeader",
        }
    }
}

/// Error produced while handling a request or setting up the handler
#[derive(Debug)]
pub struct Error {
    /// Error category
    pub etype: ErrorType,
    /// Additional human-readable context
    pub context: Option<Cow<'static, str>>,
    /// Underlying error if any
    pub cause: Option<BoxedCause>,
}

impl Error {
    /// Creates an error of the given type without context.
    pub fn new(etype: ErrorType) -> Box<Self> {
        Box::new(Self {
            etype,
            context: None,
            cause: None,
        })
    }

    /// Creates an error of the given type with an explanation.
    pub fn explain(etype: ErrorType, context: impl Into<Cow<'static, str>>) -> Box<Self> {
        Box::new(Self {
            etype,
            context: Some(context.into()),
            cause: None,
        })
    }

    /// Creates an error of the given type caused by another error.
    pub fn because(
        etype: ErrorType,
        context: impl Into<Cow<'static, str>>,
        cause: impl Into<BoxedCause>,
    ) -> Box<Self> {
        Box::new(Self {
            etype,
            context: Some(context.into()),
            cause: Some(cause.into()),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.etype.as_str())?;
        if let Some(context) = &self.context {
            write!(f, " context: {context}")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " cause: {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let cause: &(dyn std::error::Error + 'static) = self.cause.as_deref()?;
        Some(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error as _;
    use std::io;
    use test_log::test;

    #[test]
    fn display() {
        assert_eq!(Error::new(ErrorType::WriteError).to_string(), "WriteError");
        assert_eq!(
            Error::explain(ErrorType::ConfigError, "no root").to_string(),
            "ConfigError context: no root"
        );

        let err = Error::because(
            ErrorType::FileOpenError,
            "failed opening file",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "FileOpenError context: failed opening file cause: denied"
        );
        assert!(err.source().is_some());
    }
}
