use placescout_browser::DriverError;
use thiserror::Error;

/// Why one candidate could not be turned into a place.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("detail view did not render after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("entry handle went stale after {attempts} attempt(s)")]
    StaleHandle { attempts: u32 },

    #[error("no place name in detail view{}", describe_found(.found))]
    NameNotFound { found: Option<String> },

    #[error("driver error: {0}")]
    Driver(DriverError),
}

impl ExtractionError {
    /// Whether another attempt on the same candidate may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::StaleHandle { .. })
    }

    /// Record the total number of attempts made on a transient failure.
    #[must_use]
    pub(crate) fn with_attempts(self, attempts: u32) -> Self {
        match self {
            Self::Timeout { .. } => Self::Timeout { attempts },
            Self::StaleHandle { .. } => Self::StaleHandle { attempts },
            other => other,
        }
    }
}

impl From<DriverError> for ExtractionError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Timeout(_) => Self::Timeout { attempts: 1 },
            DriverError::StaleHandle(_) => Self::StaleHandle { attempts: 1 },
            other => Self::Driver(other),
        }
    }
}

fn describe_found(found: &Option<String>) -> String {
    found
        .as_deref()
        .map(|name| format!(" (found '{name}')"))
        .unwrap_or_default()
}

/// Failures that abort a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("search surface did not load: {0}")]
    Navigation(String),

    #[error("browser session unavailable: {0}")]
    SessionUnavailable(#[source] DriverError),

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

impl From<placescout_core::ConfigError> for PipelineError {
    fn from(err: placescout_core::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_mapping() {
        let err: ExtractionError = DriverError::Timeout("detail_panel".into()).into();
        assert!(matches!(err, ExtractionError::Timeout { attempts: 1 }));

        let err: ExtractionError = DriverError::StaleHandle("h1".into()).into();
        assert!(err.is_transient());

        let err: ExtractionError = DriverError::Chromium("socket closed".into()).into();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("socket closed"));
    }

    #[test]
    fn test_with_attempts() {
        let err = ExtractionError::Timeout { attempts: 1 }.with_attempts(3);
        assert_eq!(err.to_string(), "detail view did not render after 3 attempt(s)");

        let err = ExtractionError::NameNotFound { found: None }.with_attempts(3);
        assert!(matches!(err, ExtractionError::NameNotFound { .. }));
    }

    #[test]
    fn test_name_not_found_display() {
        let err = ExtractionError::NameNotFound {
            found: Some("Results".into()),
        };
        assert_eq!(err.to_string(), "no place name in detail view (found 'Results')");
        assert_eq!(
            ExtractionError::NameNotFound { found: None }.to_string(),
            "no place name in detail view"
        );
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::Navigation("results feed never rendered".into());
        assert!(err.to_string().contains("results feed never rendered"));
    }
}
