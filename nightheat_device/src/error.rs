use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("vendor api returned {code}: {body}")]
    Status { code: u16, body: String },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile file parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("profile file encode: {0}")]
    Encode(#[from] toml::ser::Error),
    #[cfg(feature = "http")]
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
