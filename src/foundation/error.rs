pub type CasecraftResult<T> = Result<T, CasecraftError>;

#[derive(thiserror::Error, Debug)]
pub enum CasecraftError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("compositing error: {0}")]
    Compositing(String),

    #[error("save error: {0}")]
    Save(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CasecraftError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn compositing(msg: impl Into<String>) -> Self {
        Self::Compositing(msg.into())
    }

    pub fn save(msg: impl Into<String>) -> Self {
        Self::Save(msg.into())
    }
}
