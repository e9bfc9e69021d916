use thiserror::Error;

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("task text must not be empty")]
    EmptyText,

    #[error("no free ids left")]
    IdsExhausted,

    #[error("import failed, file format error: {0}")]
    ImportParse(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TodoError>;
