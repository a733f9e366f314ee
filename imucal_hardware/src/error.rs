use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("unit {0} is not attached")]
    UnitNotAttached(&'static str),
    #[error("sensor bus error: {0}")]
    Bus(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
