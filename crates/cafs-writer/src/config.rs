use serde::{Deserialize, Serialize};

/// Which part of the path map a hook's transform gets to see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookVisibility {
    /// Only the hook's declared dependencies.
    #[default]
    Declared,
    /// Every path written so far.
    Full,
}

/// Tunables for a [`TreeWriter`](crate::TreeWriter).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub hook_visibility: HookVisibility,
    /// Recursively pin the root once every node is stored.
    pub pin_root: bool,
}
