use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("At least one accepted highway tag is required")]
    EmptyHighwayTags,
    #[error("Distance threshold must be a positive number of meters, got {0}")]
    InvalidDistanceThreshold(f64),
    #[error("Angle threshold must be within (0, 180) degrees, got {0}")]
    InvalidAngleThreshold(f64),
    #[error("Invalid config file: {0}")]
    ConfigFile(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protobuf decoding error: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Invalid UTF-8 in string table: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Unsupported required feature: {0}")]
    UnsupportedFeature(String),
}

pub type Result<T> = std::result::Result<T, Error>;
