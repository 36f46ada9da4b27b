use thiserror::Error;

/// Errors raised around the totals engine: storage, templates, and record edits.
///
/// The arithmetic itself never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid invoice data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid settings file: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("could not write settings: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("no {kind} with id '{id}'")]
    NotFound { kind: &'static str, id: String },

    #[error("cannot remove the last {kind}")]
    LastEntry { kind: &'static str },

    #[error("invalid colour '{0}', expected #rgb or #rrggbb")]
    InvalidColor(String),

    #[error("unknown template '{0}'")]
    InvalidTemplate(String),

    #[error("unknown currency '{0}'")]
    InvalidCurrency(String),

    #[error("unknown field label '{0}'")]
    InvalidLabel(String),

    #[error("unknown override policy '{0}', expected 'non-zero' or 'explicit'")]
    InvalidPolicy(String),
}

pub type Result<T> = std::result::Result<T, Error>;
