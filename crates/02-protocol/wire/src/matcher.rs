use serde::{Deserialize, Serialize};
use std::fmt;

use signal::EventKind;

use crate::message::{EventData, Request};

/// Serializable predicate over requests.
///
/// Conditions carry these instead of bare function pointers so that test
/// cases persist and the result report can describe what was being waited
/// for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RequestMatcher {
    /// Any event of the given kind.
    Event(EventKind),
    /// A print event with exactly this text.
    PrintEquals(String),
    /// A print event containing this text.
    PrintContains(String),
    /// Any output report.
    AnyOutput,
    /// Any input query.
    AnyInput,
    /// Every request matches.
    Always,
    /// No request matches.
    Never,
}

impl RequestMatcher {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            RequestMatcher::Event(kind) => {
                matches!(request, Request::Event(event) if event.kind == *kind)
            }
            RequestMatcher::PrintEquals(text) => print_text(request) == Some(text.as_str()),
            RequestMatcher::PrintContains(text) => {
                print_text(request).is_some_and(|t| t.contains(text.as_str()))
            }
            RequestMatcher::AnyOutput => request.is_output(),
            RequestMatcher::AnyInput => request.is_input(),
            RequestMatcher::Always => true,
            RequestMatcher::Never => false,
        }
    }
}

fn print_text(request: &Request) -> Option<&str> {
    match request {
        Request::Event(event) if event.kind == EventKind::Print => match &event.data {
            Some(EventData::Text(text)) => Some(text),
            _ => None,
        },
        _ => None,
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMatcher::Event(kind) => write!(f, "{kind:?} event"),
            RequestMatcher::PrintEquals(text) => write!(f, "print of {text:?}"),
            RequestMatcher::PrintContains(text) => write!(f, "print containing {text:?}"),
            RequestMatcher::AnyOutput => write!(f, "any output"),
            RequestMatcher::AnyInput => write!(f, "any input"),
            RequestMatcher::Always => write!(f, "anything"),
            RequestMatcher::Never => write!(f, "nothing"),
        }
    }
}
