//! Error types.
use std::fmt::Display;

#[cfg(feature = "roxmltree")]
use crate::parse::roxmltree::ParseError;

/// An error while wrapping or mutating a tree.
#[derive(Debug)]
pub enum Error {
    /// The parser produced no tree to wrap
    MissingTree,
    #[cfg(feature = "roxmltree")]
    /// The source couldn't be parsed into a tree
    Parse(ParseError),
    /// An attribute record was given without a qualified name
    InvalidAttribute {
        /// The value of the rejected record
        value: String,
    },
    /// A node was inserted into itself or one of its descendants
    HierarchyRequest,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTree => f.write_str("Parse failure: no tree was produced for the source"),
            #[cfg(feature = "roxmltree")]
            Self::Parse(err) => f.write_fmt(format_args!("Parse failure: {err}")),
            Self::InvalidAttribute { value } => f.write_fmt(format_args!(
                "Attempted to add an attribute without a name (value `{value}`)"
            )),
            Self::HierarchyRequest => {
                f.write_str("Attempted to insert a node into itself or one of its descendants")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "roxmltree")]
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(feature = "roxmltree")]
impl From<ParseError> for Error {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}
