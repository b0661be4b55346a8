pub type BoothResult<T> = Result<T, BoothError>;

#[derive(thiserror::Error, Debug)]
pub enum BoothError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("camera error: {0}")]
    Camera(String),

    #[error("detection error: {0}")]
    Detection(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoothError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn camera(msg: impl Into<String>) -> Self {
        Self::Camera(msg.into())
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }
}
