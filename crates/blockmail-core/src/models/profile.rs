use serde::{Deserialize, Serialize};

/// Per-address profile metadata from the contract's profile registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: Option<String>,
    /// Avatar URI or embedded image reference
    pub avatar: Option<String>,
    /// Whether the address has ever set a profile
    pub exists: bool,
}

impl Profile {
    /// Build from the raw contract tuple, where unset fields are empty strings.
    pub fn from_contract(name: String, avatar: String, exists: bool) -> Self {
        Self {
            name: non_empty(name),
            avatar: non_empty(avatar),
            exists,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
