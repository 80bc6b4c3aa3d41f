use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv(csv::Error),
    Json(serde_json::Error),
    MissingColumn {
        column: String,
    },
    Shape(String),
    Empty {
        source: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            LoadError::Csv(err) => write!(f, "CSV parse error: {err}"),
            LoadError::Json(err) => write!(f, "JSON parse error: {err}"),
            LoadError::MissingColumn { column } => write!(f, "missing column: {column:?}"),
            LoadError::Shape(msg) => write!(f, "unexpected data shape: {msg}"),
            LoadError::Empty { source } => write!(f, "no usable observations in {source}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Csv(err) => Some(err),
            LoadError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::Csv(err)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Json(err)
    }
}
