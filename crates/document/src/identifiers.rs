//! Document identifiers and their canonical `/document/v1` resource path.
//!
//! A [`DocumentId`] names a document within a namespace and document type,
//! optionally pinned to a group or a numeric location. The textual form is
//!
//! ```text
//! id:<namespace>:<type>:[n=<number>|g=<group>]:<user-specific>
//! ```
//!
//! The user-specific part is everything after the fourth `:`. It is taken
//! verbatim and may itself contain `:` or `/`.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// Path prefix of the document API.
pub const DOCUMENT_API_PREFIX: &str = "/document/v1";

/// Characters escaped in namespace, type and group segments.
///
/// Everything outside the unreserved set and the sub-delimiters that are legal
/// inside a path segment is escaped; in particular `/` becomes `%2F`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

/// Characters escaped in the terminal user-specific segment.
///
/// Only what a URL path cannot carry literally; `:` and `/` pass through.
const USER_SPECIFIC: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Optional location selector of a [`DocumentId`].
///
/// At most one selector can be present, which the enum enforces. An identifier
/// without a selector uses the plain `docid` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// `g=<group>`: the document is stored with other documents of this group.
    Group(String),
    /// `n=<number>`: the document is stored at this numeric location.
    Number(i64),
}

impl Selector {
    fn parse(text: &str, serialized: &str) -> Result<Option<Self>, ParseError> {
        if text.is_empty() {
            return Ok(None);
        }
        let Some((key, value)) = text.split_once('=') else {
            return Err(ParseError::InvalidSelector {
                id: serialized.to_string(),
                selector: text.to_string(),
            });
        };
        match key {
            "n" => value
                .parse::<i64>()
                .map(|n| Some(Self::Number(n)))
                .map_err(|_| ParseError::InvalidNumber {
                    id: serialized.to_string(),
                    value: value.to_string(),
                }),
            "g" if value.is_empty() => Err(ParseError::EmptyGroup {
                id: serialized.to_string(),
            }),
            "g" => Ok(Some(Self::Group(value.to_string()))),
            _ => Err(ParseError::InvalidSelector {
                id: serialized.to_string(),
                selector: text.to_string(),
            }),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(group) => write!(f, "g={group}"),
            Self::Number(number) => write!(f, "n={number}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// Identifies one document in the remote store.
///
/// Immutable once constructed. Build one by parsing the textual form
/// (`"id:ns:type::doc1".parse()`) or with [`DocumentId::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId {
    namespace: String,
    doc_type: String,
    selector: Option<Selector>,
    user_specific: String,
}

impl DocumentId {
    /// Creates an identifier from its parts.
    ///
    /// Returns an error if the namespace, type or user-specific part is empty,
    /// if the selector carries an empty group, or if the namespace, type or
    /// group contains `:`. The user-specific part may contain `:`.
    pub fn new(
        namespace: impl Into<String>,
        doc_type: impl Into<String>,
        selector: Option<Selector>,
        user_specific: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let id = Self {
            namespace: namespace.into(),
            doc_type: doc_type.into(),
            selector,
            user_specific: user_specific.into(),
        };
        if id.namespace.is_empty() {
            return Err(ParseError::EmptyNamespace { id: id.to_string() });
        }
        if id.doc_type.is_empty() {
            return Err(ParseError::EmptyType { id: id.to_string() });
        }
        if matches!(&id.selector, Some(Selector::Group(g)) if g.is_empty()) {
            return Err(ParseError::EmptyGroup { id: id.to_string() });
        }
        let separated = [
            ("namespace", id.namespace.as_str()),
            ("document type", id.doc_type.as_str()),
            ("group", id.group().unwrap_or_default()),
        ];
        if let Some((part, _)) = separated.iter().find(|(_, value)| value.contains(':')) {
            return Err(ParseError::SeparatorInPart {
                id: id.to_string(),
                part: *part,
            });
        }
        if id.user_specific.is_empty() {
            return Err(ParseError::EmptyUserSpecific { id: id.to_string() });
        }
        Ok(id)
    }

    /// Returns the namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the document type.
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Returns the location selector, if any.
    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    /// Returns the group, if the identifier carries `g=<group>`.
    pub fn group(&self) -> Option<&str> {
        match &self.selector {
            Some(Selector::Group(group)) => Some(group),
            _ => None,
        }
    }

    /// Returns the number, if the identifier carries `n=<number>`.
    pub fn number(&self) -> Option<i64> {
        match self.selector {
            Some(Selector::Number(number)) => Some(number),
            _ => None,
        }
    }

    /// Returns the user-specific part.
    pub fn user_specific(&self) -> &str {
        &self.user_specific
    }

    /// Returns the resource path of this document under the document API.
    ///
    /// `/document/v1/{namespace}/{type}/{docid|group/{g}|number/{n}}/{user-specific}`
    pub fn resource_path(&self) -> String {
        let mut path = String::with_capacity(64 + self.user_specific.len());
        path.push_str(DOCUMENT_API_PREFIX);
        path.push('/');
        path.extend(utf8_percent_encode(&self.namespace, PATH_SEGMENT));
        path.push('/');
        path.extend(utf8_percent_encode(&self.doc_type, PATH_SEGMENT));
        match &self.selector {
            None => path.push_str("/docid"),
            Some(Selector::Group(group)) => {
                path.push_str("/group/");
                path.extend(utf8_percent_encode(group, PATH_SEGMENT));
            }
            Some(Selector::Number(number)) => {
                path.push_str("/number/");
                path.push_str(&number.to_string());
            }
        }
        path.push('/');
        path.extend(utf8_percent_encode(&self.user_specific, USER_SPECIFIC));
        path
    }
}

impl FromStr for DocumentId {
    type Err = ParseError;

    fn from_str(serialized: &str) -> Result<Self, Self::Err> {
        let Some(rest) = serialized.strip_prefix("id:") else {
            return Err(ParseError::MissingScheme {
                id: serialized.to_string(),
            });
        };
        let mut parts = rest.splitn(4, ':');
        let (Some(namespace), Some(doc_type), Some(selector), Some(user_specific)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::MissingFields {
                id: serialized.to_string(),
            });
        };
        if namespace.is_empty() {
            return Err(ParseError::EmptyNamespace {
                id: serialized.to_string(),
            });
        }
        if doc_type.is_empty() {
            return Err(ParseError::EmptyType {
                id: serialized.to_string(),
            });
        }
        let selector = Selector::parse(selector, serialized)?;
        if user_specific.is_empty() {
            return Err(ParseError::EmptyUserSpecific {
                id: serialized.to_string(),
            });
        }
        Ok(Self {
            namespace: namespace.to_string(),
            doc_type: doc_type.to_string(),
            selector,
            user_specific: user_specific.to_string(),
        })
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{}:{}:", self.namespace, self.doc_type)?;
        if let Some(selector) = &self.selector {
            write!(f, "{selector}")?;
        }
        write!(f, ":{}", self.user_specific)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(namespace: &str, doc_type: &str, selector: Option<Selector>, user: &str) -> DocumentId {
        DocumentId::new(namespace, doc_type, selector, user).expect("valid id")
    }

    #[test]
    fn parses_plain_identifier() {
        let parsed: DocumentId = "id:ns:type::doc1".parse().unwrap();
        assert_eq!(parsed.namespace(), "ns");
        assert_eq!(parsed.doc_type(), "type");
        assert_eq!(parsed.selector(), None);
        assert_eq!(parsed.user_specific(), "doc1");
    }

    #[test]
    fn parses_number_and_group_selectors() {
        let numbered: DocumentId = "id:ns:type:n=-123:user".parse().unwrap();
        assert_eq!(numbered.number(), Some(-123));
        assert_eq!(numbered.group(), None);

        let grouped: DocumentId = "id:ns:type:g=mygroup:user".parse().unwrap();
        assert_eq!(grouped.group(), Some("mygroup"));
        assert_eq!(grouped.number(), None);
    }

    #[test]
    fn user_specific_tail_is_taken_verbatim() {
        let parsed: DocumentId = "id:ns:type::a:b::c/d".parse().unwrap();
        assert_eq!(parsed.user_specific(), "a:b::c/d");
    }

    #[test]
    fn rejects_malformed_identifiers() {
        let cases = [
            ("ns:type::doc1", "missing scheme"),
            ("id:ns:type", "too few fields"),
            ("id::type::doc1", "empty namespace"),
            ("id:ns:::doc1", "empty type"),
            ("id:ns:type:n=abc:doc1", "non-numeric number"),
            ("id:ns:type:g=:doc1", "empty group"),
            ("id:ns:type:x=1:doc1", "unknown selector"),
            ("id:ns:type:n1:doc1", "selector without value"),
            ("id:ns:type::", "empty user-specific"),
        ];
        for (text, why) in cases {
            assert!(text.parse::<DocumentId>().is_err(), "{why}: {text}");
        }
    }

    #[test]
    fn display_round_trips_textual_form() {
        for text in ["id:ns:type::doc1", "id:ns:type:n=7:x", "id:ns:type:g=g1:a:b"] {
            let parsed: DocumentId = text.parse().unwrap();
            assert_eq!(parsed.to_string(), text);
        }
    }

    #[test]
    fn constructed_ids_reparse_to_themselves() {
        let cases = [
            id("ns", "type", None, "doc1"),
            id("ns", "type", Some(Selector::Number(-4)), "a:b"),
            id("ns", "type", Some(Selector::Group("g1".into())), "::"),
        ];
        for built in cases {
            let reparsed: DocumentId = built.to_string().parse().unwrap();
            assert_eq!(reparsed, built);
            let json = serde_json::to_string(&built).unwrap();
            assert_eq!(serde_json::from_str::<DocumentId>(&json).unwrap(), built);
        }
    }

    #[test]
    fn new_rejects_separator_outside_user_specific() {
        let err = DocumentId::new("a:b", "t", None, "u").unwrap_err();
        assert!(matches!(err, ParseError::SeparatorInPart { part: "namespace", .. }), "{err:?}");
        let err = DocumentId::new("ns", "t:x", None, "u").unwrap_err();
        assert!(matches!(err, ParseError::SeparatorInPart { part: "document type", .. }), "{err:?}");
        let err = DocumentId::new("ns", "t", Some(Selector::Group("g:1".into())), "u").unwrap_err();
        assert!(matches!(err, ParseError::SeparatorInPart { part: "group", .. }), "{err:?}");
    }

    #[test]
    fn resource_path_per_selector() {
        let cases = [
            (
                id("ns-with-/", "type-with-/", None, "user"),
                "/document/v1/ns-with-%2F/type-with-%2F/docid/user",
            ),
            (
                id("ns", "type", Some(Selector::Number(123)), "user"),
                "/document/v1/ns/type/number/123/user",
            ),
            (
                id("ns", "type", Some(Selector::Group("foo".into())), "user"),
                "/document/v1/ns/type/group/foo/user",
            ),
            (
                id("ns", "type", None, "user::specific"),
                "/document/v1/ns/type/docid/user::specific",
            ),
            (id("ns", "type", None, ":"), "/document/v1/ns/type/docid/:"),
            (
                id("ns", "type", None, "a/b c?d"),
                "/document/v1/ns/type/docid/a/b%20c%3Fd",
            ),
        ];
        for (id, want) in cases {
            assert_eq!(id.resource_path(), want, "{id}");
        }
    }

    #[test]
    fn resource_path_is_stable_across_calls() {
        let parsed: DocumentId = "id:ns-with-/:type-with-/::user".parse().unwrap();
        let first = parsed.resource_path();
        assert_eq!(first, "/document/v1/ns-with-%2F/type-with-%2F/docid/user");
        assert_eq!(parsed.resource_path(), first);
    }

    #[test]
    fn deserializes_from_textual_form() {
        let parsed: DocumentId = serde_json::from_str("\"id:ns:type:n=1:doc\"").unwrap();
        assert_eq!(parsed.number(), Some(1));
        assert!(serde_json::from_str::<DocumentId>("\"nope\"").is_err());
    }
}
