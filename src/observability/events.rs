//! Observable compiler events
//!
//! Events are explicit and typed. Each carries the severity it is logged at.

use std::fmt;

use super::logger::Severity;

/// Observable events during domain compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Model files loaded into the registry
    SchemasLoaded,
    /// A domain was compiled to SQL
    DomainCompiled,
    /// Leaf on a non-stored field without a search hook, replaced by TRUE
    ComputedFieldNotSearchable,
    /// Attachment-backed binary field compared with anything but an
    /// empty value, leaf replaced by TRUE
    BinarySearchIgnored,
    /// `in` / `not in` used with a boolean instead of a list
    LegacyBooleanIn,
    /// An id of 0 or `false` was passed where record ids were expected
    UnexpectedFalsyId,
    /// A child_of / parent_of walk finished
    HierarchyExpanded,
    /// A field names a search hook that is not registered
    SearchHookMissing,
    /// A request was rejected with an error
    RequestFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::DomainCompiled => "DOMAIN_COMPILED",
            Event::ComputedFieldNotSearchable => "COMPUTED_FIELD_NOT_SEARCHABLE",
            Event::BinarySearchIgnored => "BINARY_SEARCH_IGNORED",
            Event::LegacyBooleanIn => "LEGACY_BOOLEAN_IN",
            Event::UnexpectedFalsyId => "UNEXPECTED_FALSY_ID",
            Event::HierarchyExpanded => "HIERARCHY_EXPANDED",
            Event::SearchHookMissing => "SEARCH_HOOK_MISSING",
            Event::RequestFailed => "REQUEST_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::DomainCompiled | Event::HierarchyExpanded => Severity::Trace,
            Event::SchemasLoaded => Severity::Info,
            Event::RequestFailed => Severity::Error,
            _ => Severity::Warn,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
