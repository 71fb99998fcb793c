pub type ReeflineResult<T> = Result<T, ReeflineError>;

#[derive(thiserror::Error, Debug)]
pub enum ReeflineError {
    #[error("invalid shape data: {0}")]
    InvalidShapeData(String),

    #[error("unknown shape: {0}")]
    UnknownShape(String),

    #[error("non-monotonic frame: {0}")]
    NonMonotonicFrame(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReeflineError {
    pub fn invalid_shape_data(msg: impl Into<String>) -> Self {
        Self::InvalidShapeData(msg.into())
    }

    pub fn unknown_shape(msg: impl Into<String>) -> Self {
        Self::UnknownShape(msg.into())
    }

    pub fn non_monotonic_frame(msg: impl Into<String>) -> Self {
        Self::NonMonotonicFrame(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ReeflineError::invalid_shape_data("x")
                .to_string()
                .contains("invalid shape data:")
        );
        assert!(
            ReeflineError::unknown_shape("x")
                .to_string()
                .contains("unknown shape:")
        );
        assert!(
            ReeflineError::non_monotonic_frame("x")
                .to_string()
                .contains("non-monotonic frame:")
        );
        assert!(
            ReeflineError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            ReeflineError::store("x")
                .to_string()
                .contains("store error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ReeflineError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
