use serde::Deserialize;

/// Substring tokens that mark an executable as a companion tool rather
/// than the game itself.
///
/// Install directories are full of launchers, patchers, crash handlers
/// and redistributable installers. Matching by install directory alone
/// would treat all of them as the game, so directory scans filter any
/// file name containing one of these tokens.
#[derive(Debug, Clone)]
pub struct ExclusionList {
    /// Lowercase substrings compared against lowercase file names.
    tokens: Vec<String>,
}

impl ExclusionList {
    /// Load an exclusion list from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: ExclusionFile = serde_json::from_str(json)?;
        let tokens = file
            .tokens
            .into_iter()
            .map(|token| token.to_lowercase())
            .collect();

        Ok(Self { tokens })
    }

    /// Load the bundled default exclusion list.
    ///
    /// Covers the common offenders (installers, unpackers, mod tools,
    /// crash reporters). Users can extend or replace this with custom JSON.
    pub fn bundled() -> Self {
        const DEFAULT_JSON: &str = include_str!("default_exclusions.json");
        Self::from_json(DEFAULT_JSON).expect("bundled exclusion list is invalid JSON")
    }

    /// Create an empty list that excludes nothing.
    pub fn empty() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Whether a file name matches any exclusion token (case-insensitive).
    ///
    /// Tokens match as substrings, so `"setup"` excludes `setup.exe` and
    /// `dxsetup.exe` alike.
    pub fn excludes(&self, file_name: &str) -> bool {
        let folded = file_name.to_lowercase();
        self.tokens.iter().any(|token| folded.contains(token.as_str()))
    }

    /// Get the number of tokens in the list.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[derive(Deserialize)]
struct ExclusionFile {
    tokens: Vec<String>,
}
