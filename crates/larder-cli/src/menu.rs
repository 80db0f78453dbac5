//! Interactive menu selections

/// One selection at the console prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Upload,
    Vectorize,
    Query,
    Help,
    Quit,
}

impl MenuChoice {
    /// Parse a line typed at the menu prompt; `None` for anything unrecognised
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "upload" => Some(Self::Upload),
            "2" | "vectorize" => Some(Self::Vectorize),
            "3" | "query" => Some(Self::Query),
            "help" | "?" => Some(Self::Help),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }

    /// Operation name used in status and failure messages
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Upload => "upload documents",
            Self::Vectorize => "vectorize and index corpus",
            Self::Query => "query",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}
