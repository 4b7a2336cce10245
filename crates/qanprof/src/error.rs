use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NoData(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const BACKEND_UNAVAILABLE: i32 = 3;
    pub const NO_DATA: i32 = 4;
    pub const DATABASE_ERROR: i32 = 6;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Http(_) | Error::Backend(_) => exit_code::BACKEND_UNAVAILABLE,
            Error::NoData(_) => exit_code::NO_DATA,
            Error::Database(_) => exit_code::DATABASE_ERROR,
            Error::InvalidArgument(_) | Error::Config(_) => exit_code::INVALID_ARGUMENTS,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            Error::InvalidArgument("x".into()).exit_code(),
            exit_code::INVALID_ARGUMENTS
        );
        assert_eq!(Error::NoData("x".into()).exit_code(), exit_code::NO_DATA);
        assert_eq!(
            Error::Backend("down".into()).exit_code(),
            exit_code::BACKEND_UNAVAILABLE
        );
    }
}
