/// Prefix the game uses for packs loaded from the `resourcepacks/` folder.
const FILE_PREFIX: &str = "file/";

/// An entry of the `resourcePacks` option.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourcePack {
    /// A zip or folder the user added, by file name.
    File(String),
    /// A pack shipped by the game or a mod loader (e.g. `vanilla`, `fabric`).
    BuiltIn(String),
}

impl ResourcePack {
    /// The value as stored in `options.txt`.
    pub fn to_value(&self) -> String {
        match self {
            ResourcePack::File(name) => format!("{FILE_PREFIX}{name}"),
            ResourcePack::BuiltIn(name) => name.clone(),
        }
    }

    /// Parse a stored value. The `file/` prefix is matched case-insensitively.
    pub fn from_value(value: &str) -> Self {
        match value.get(..FILE_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(FILE_PREFIX) => {
                ResourcePack::File(value[FILE_PREFIX.len()..].to_string())
            }
            _ => ResourcePack::BuiltIn(value.to_string()),
        }
    }
}

impl std::fmt::Display for ResourcePack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_value())
    }
}
