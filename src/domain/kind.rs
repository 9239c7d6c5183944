use std::fmt;

use serde::{Deserialize, Serialize};

/// Resource categories an admin can attach to an upload.
///
/// Each variant contributes one tag to the stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Flag,
    Tourist,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Flag, ResourceKind::Tourist];

    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Flag => "flag",
            ResourceKind::Tourist => "tourist",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ResourceKind::Flag => "Flag",
            ResourceKind::Tourist => "Tourist",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            ResourceKind::Flag => "🚩",
            ResourceKind::Tourist => "📸",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.display_name())
    }
}
