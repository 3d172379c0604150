//! Requests accepted on the management socket.

use std::fmt;

use camino::Utf8PathBuf;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A single command line sent by a client.
///
/// ```json
/// {"type":"monitor"}
/// {"type":"update","filters":[{"name":"test_1"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Report the names of the active bindings.
    Monitor,
    /// Replace the active bindings with a candidate set.
    Update {
        /// Candidate bindings; a missing key means "no change".
        #[serde(default, skip_serializing_if = "CandidateSet::is_absent")]
        filters: CandidateSet,
    },
}

impl Request {
    /// Builds an update request.
    #[must_use]
    pub const fn update(filters: CandidateSet) -> Self {
        Self::Update { filters }
    }

    /// Command name used in logs.
    #[must_use]
    pub const fn command(&self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Update { .. } => "update",
        }
    }
}

/// Three-way candidate for an UPDATE.
///
/// `Absent` and `Empty` mean different things: the former leaves the active
/// set alone, the latter removes every binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CandidateSet {
    /// No candidate was supplied.
    #[default]
    Absent,
    /// An explicitly empty candidate.
    Empty,
    /// One or more proposed bindings, in request order.
    List(Vec<BindingProposal>),
}

impl CandidateSet {
    /// Builds a candidate from a list, mapping an empty list to `Empty`.
    #[must_use]
    pub fn from_proposals(proposals: Vec<BindingProposal>) -> Self {
        if proposals.is_empty() {
            Self::Empty
        } else {
            Self::List(proposals)
        }
    }

    /// True when no candidate was supplied.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Proposals carried by the candidate; empty for `Absent` and `Empty`.
    #[must_use]
    pub fn proposals(&self) -> &[BindingProposal] {
        match self {
            Self::List(proposals) => proposals,
            Self::Absent | Self::Empty => &[],
        }
    }
}

impl Serialize for CandidateSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Empty => Vec::<BindingProposal>::new().serialize(serializer),
            Self::List(proposals) => proposals.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CandidateSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let proposals = Option::<Vec<BindingProposal>>::deserialize(deserializer)?;
        Ok(proposals.map_or(Self::Absent, Self::from_proposals))
    }
}

/// A binding as proposed by a client, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingProposal {
    /// Binding name, unique within a candidate.
    pub name: String,
    /// Filter type; defaults to the binding name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Downstream socket address; defaults to `<downstream_dir>/<name>.sock`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    /// Configuration artefact; defaults to `<downstream_dir>/<name>.conf`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Utf8PathBuf>,
}

impl BindingProposal {
    /// Proposal carrying only a name; every other field takes its default.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
            socket: None,
            config: None,
        }
    }

    /// Sets the filter type.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the downstream socket address.
    #[must_use]
    pub fn with_socket(mut self, socket: impl Into<String>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    /// Sets the configuration artefact path.
    #[must_use]
    pub fn with_config(mut self, config: impl Into<Utf8PathBuf>) -> Self {
        self.config = Some(config.into());
        self
    }

    /// Filter type after defaulting.
    #[must_use]
    pub fn filter_type(&self) -> &str {
        self.filter.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Display for BindingProposal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} ({})", self.name, self.filter_type())
    }
}

/// Document shape shared by bootstrap bindings files and `filterctl --from`.
///
/// A document without a `filters` key carries an absent candidate, never an
/// empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingsDocument {
    /// Proposed bindings.
    #[serde(default, skip_serializing_if = "CandidateSet::is_absent")]
    pub filters: CandidateSet,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(r#"{"type":"update"}"#, CandidateSet::Absent)]
    #[case(r#"{"type":"update","filters":null}"#, CandidateSet::Absent)]
    #[case(r#"{"type":"update","filters":[]}"#, CandidateSet::Empty)]
    fn distinguishes_absent_from_empty(#[case] input: &str, #[case] expected: CandidateSet) {
        let request: Request = serde_json::from_str(input).expect("parse update");
        assert_eq!(request, Request::update(expected));
    }

    #[test]
    fn parses_listed_proposals() {
        let input = r#"{"type":"update","filters":[{"name":"test_1","filter":"ftest","config":"/tmp/test_1.conf"},{"name":"test_2"}]}"#;
        let request: Request = serde_json::from_str(input).expect("parse update");
        let Request::Update { filters } = request else {
            panic!("expected update request");
        };
        let proposals = filters.proposals();
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].filter_type(), "ftest");
        assert_eq!(
            proposals[0].config.as_deref().map(camino::Utf8Path::as_str),
            Some("/tmp/test_1.conf")
        );
        assert_eq!(proposals[1].filter_type(), "test_2");
    }

    #[test]
    fn parses_monitor() {
        let request: Request = serde_json::from_str(r#"{"type":"monitor"}"#).expect("parse");
        assert_eq!(request, Request::Monitor);
        assert_eq!(request.command(), "monitor");
    }

    #[test]
    fn absent_candidate_omits_filters_key() {
        let encoded = serde_json::to_string(&Request::update(CandidateSet::Absent)).expect("encode");
        assert_eq!(encoded, r#"{"type":"update"}"#);
    }

    #[test]
    fn empty_candidate_keeps_filters_key() {
        let encoded = serde_json::to_string(&Request::update(CandidateSet::Empty)).expect("encode");
        assert_eq!(encoded, r#"{"type":"update","filters":[]}"#);
    }

    #[test]
    fn rejects_unknown_proposal_fields() {
        let input = r#"{"type":"update","filters":[{"name":"x","colour":"blue"}]}"#;
        assert!(serde_json::from_str::<Request>(input).is_err());
    }

    #[rstest]
    #[case("{}", CandidateSet::Absent)]
    #[case(r#"{"filters":null}"#, CandidateSet::Absent)]
    #[case(r#"{"filters":[]}"#, CandidateSet::Empty)]
    #[case(
        r#"{"filters":[{"name":"test_1"}]}"#,
        CandidateSet::List(vec![BindingProposal::named("test_1")])
    )]
    fn bindings_document_keeps_absent_apart_from_empty(
        #[case] input: &str,
        #[case] expected: CandidateSet,
    ) {
        let document: BindingsDocument = serde_json::from_str(input).expect("parse document");
        assert_eq!(document.filters, expected);
    }

    #[test]
    fn from_proposals_maps_empty_list() {
        assert_eq!(CandidateSet::from_proposals(Vec::new()), CandidateSet::Empty);
    }
}
