//! Protocol atoms carried by wire messages.
//!
//! The byte-level encoding is owned by the transport; the tree only deals in
//! these decoded arguments and in opaque [`Peer`] identifiers.

use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;

/// One typed argument of a wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Int(i32),
    Float(f32),
    Str(String),
    Bool(bool),
    /// Explicit "unset" sentinel.
    Null,
}

impl Argument {
    /// Single-character type tag, as used in address-pattern protocols.
    pub fn type_tag(&self) -> char {
        match self {
            Argument::Int(_) => 'i',
            Argument::Float(_) => 'f',
            Argument::Str(_) => 's',
            Argument::Bool(true) => 'T',
            Argument::Bool(false) => 'F',
            Argument::Null => 'N',
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Argument::Null)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Argument::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Argument::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// JSON rendering of the atom. Non-finite floats become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Argument::Int(v) => Json::from(*v),
            Argument::Float(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Argument::Str(v) => Json::String(v.clone()),
            Argument::Bool(v) => Json::Bool(*v),
            Argument::Null => Json::Null,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Int(v) => write!(f, "{v}"),
            Argument::Float(v) => write!(f, "{v}"),
            Argument::Str(v) => write!(f, "{v:?}"),
            Argument::Bool(v) => write!(f, "{v}"),
            Argument::Null => write!(f, "null"),
        }
    }
}

impl From<i32> for Argument {
    fn from(v: i32) -> Self {
        Argument::Int(v)
    }
}

impl From<f32> for Argument {
    fn from(v: f32) -> Self {
        Argument::Float(v)
    }
}

impl From<bool> for Argument {
    fn from(v: bool) -> Self {
        Argument::Bool(v)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Argument::Str(v.to_string())
    }
}

impl From<String> for Argument {
    fn from(v: String) -> Self {
        Argument::Str(v)
    }
}

/// Opaque identifier of a remote endpoint.
///
/// Inbound messages carry the peer they came from; replies are directed back
/// at it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Peer(Rc<str>);

impl Peer {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Rc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({})", self.0)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_tags() {
        assert_eq!(Argument::Int(1).type_tag(), 'i');
        assert_eq!(Argument::Float(1.0).type_tag(), 'f');
        assert_eq!(Argument::from("x").type_tag(), 's');
        assert_eq!(Argument::Bool(true).type_tag(), 'T');
        assert_eq!(Argument::Bool(false).type_tag(), 'F');
        assert_eq!(Argument::Null.type_tag(), 'N');
    }

    #[test]
    fn test_accessors_reject_other_types() {
        assert_eq!(Argument::Int(3).as_int(), Some(3));
        assert_eq!(Argument::Int(3).as_float(), None);
        assert_eq!(Argument::from("a").as_str(), Some("a"));
        assert_eq!(Argument::Null.as_bool(), None);
    }

    #[test]
    fn test_json_rendering() {
        assert_eq!(Argument::Int(-2).to_json(), json!(-2));
        assert_eq!(Argument::Float(0.5).to_json(), json!(0.5));
        assert_eq!(Argument::Float(f32::NAN).to_json(), json!(null));
        assert_eq!(Argument::from("ch").to_json(), json!("ch"));
        assert_eq!(Argument::Null.to_json(), json!(null));
    }

    #[test]
    fn test_peer_identity() {
        let a = Peer::new("10.0.0.2:10023");
        assert_eq!(a, Peer::new("10.0.0.2:10023"));
        assert_ne!(a, Peer::new("10.0.0.3:10023"));
        assert_eq!(a.to_string(), "10.0.0.2:10023");
    }
}
