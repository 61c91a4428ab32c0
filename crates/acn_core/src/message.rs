pub use ego_tree::NodeId;
use serde::{Deserialize, Serialize};

/// Author of a message as far as the outline is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Ai,
}

impl Role {
    /// Maps a free-form role label to a role. Unknown labels count as AI.
    pub fn normalize(raw: &str) -> Self {
        let value = raw.to_lowercase();
        if value.contains("user") || value.contains("human") || value.contains("you") {
            return Role::User;
        }
        Role::Ai
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Ai => "ai",
        }
    }
}

/// One normalized message discovered in the page tree.
///
/// `element` and `highlight` are lookup-only handles into the page tree; the
/// node they name may be detached by the time they are used, so callers check
/// liveness first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub element: NodeId,
    pub highlight: NodeId,
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn role_labels_normalize() {
        assert_eq!(Role::normalize("user"), Role::User);
        assert_eq!(Role::normalize("Human"), Role::User);
        assert_eq!(Role::normalize("You said"), Role::User);
        assert_eq!(Role::normalize("assistant"), Role::Ai);
        assert_eq!(Role::normalize("true"), Role::Ai);
        assert_eq!(Role::normalize(""), Role::Ai);
    }
}
