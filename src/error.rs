use std::fmt;

#[derive(Debug)]
pub enum AquamarkError {
    DocumentDecode(String),
    ImageDecode(String),
    Encode(String),
    Archive(String),
    DocumentAssemble(String),
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for AquamarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AquamarkError::DocumentDecode(message) => {
                write!(f, "document decode error: {}", message)
            }
            AquamarkError::ImageDecode(message) => {
                write!(f, "image decode error: {}", message)
            }
            AquamarkError::Encode(message) => write!(f, "page encode error: {}", message),
            AquamarkError::Archive(message) => write!(f, "archive error: {}", message),
            AquamarkError::DocumentAssemble(message) => {
                write!(f, "document assemble error: {}", message)
            }
            AquamarkError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            AquamarkError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for AquamarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AquamarkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AquamarkError {
    fn from(value: std::io::Error) -> Self {
        AquamarkError::Io(value)
    }
}
