use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Route method key: the fixed HTTP verb set plus the `all` wildcard.
///
/// `All` is valid on both sides of a match — as a registration verb
/// ("this route answers every method") and, in principle, as a request
/// method (any concrete verb matches an `All` registration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
    Connect,
    All,
}

impl MethodKind {
    /// Every registrable verb, wildcard last.
    pub const ALL_VERBS: [MethodKind; 10] = [
        MethodKind::Get,
        MethodKind::Post,
        MethodKind::Put,
        MethodKind::Delete,
        MethodKind::Patch,
        MethodKind::Head,
        MethodKind::Options,
        MethodKind::Trace,
        MethodKind::Connect,
        MethodKind::All,
    ];

    /// Wildcard match: `All` on either side matches anything.
    pub fn matches(self, other: MethodKind) -> bool {
        self == other || self == MethodKind::All || other == MethodKind::All
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::Get => "get",
            MethodKind::Post => "post",
            MethodKind::Put => "put",
            MethodKind::Delete => "delete",
            MethodKind::Patch => "patch",
            MethodKind::Head => "head",
            MethodKind::Options => "options",
            MethodKind::Trace => "trace",
            MethodKind::Connect => "connect",
            MethodKind::All => "all",
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodKind {
    type Err = UnknownMethod;

    /// Case-insensitive, so `"GET"` from a wire request parses too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(MethodKind::Get),
            "post" => Ok(MethodKind::Post),
            "put" => Ok(MethodKind::Put),
            "delete" => Ok(MethodKind::Delete),
            "patch" => Ok(MethodKind::Patch),
            "head" => Ok(MethodKind::Head),
            "options" => Ok(MethodKind::Options),
            "trace" => Ok(MethodKind::Trace),
            "connect" => Ok(MethodKind::Connect),
            "all" => Ok(MethodKind::All),
            other => Err(UnknownMethod(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_both_directions() {
        assert!(MethodKind::All.matches(MethodKind::Get));
        assert!(MethodKind::Post.matches(MethodKind::All));
        assert!(MethodKind::All.matches(MethodKind::All));
    }

    #[test]
    fn concrete_verbs_only_match_themselves() {
        assert!(MethodKind::Get.matches(MethodKind::Get));
        assert!(!MethodKind::Get.matches(MethodKind::Post));
    }

    #[test]
    fn every_verb_round_trips_through_its_name() {
        for verb in MethodKind::ALL_VERBS {
            assert_eq!(verb.as_str().parse::<MethodKind>().unwrap(), verb);
        }
    }

    #[test]
    fn parses_wire_casing() {
        assert_eq!("GET".parse::<MethodKind>().unwrap(), MethodKind::Get);
        assert_eq!("delete".parse::<MethodKind>().unwrap(), MethodKind::Delete);
        assert!("BREW".parse::<MethodKind>().is_err());
    }
}
