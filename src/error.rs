use std::fmt;

#[derive(Debug)]
pub enum SkillTagsError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Font(String),
    Window(String),
    Surface(String),
    Tray(String),
}

impl fmt::Display for SkillTagsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Font(msg) => write!(f, "Font error: {msg}"),
            Self::Window(msg) => write!(f, "Window error: {msg}"),
            Self::Surface(msg) => write!(f, "Surface error: {msg}"),
            Self::Tray(msg) => write!(f, "Tray error: {msg}"),
        }
    }
}

impl std::error::Error for SkillTagsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SkillTagsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for SkillTagsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
