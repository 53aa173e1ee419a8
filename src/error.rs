//! Error types for the agriscan library

use thiserror::Error;

/// Result type alias for agriscan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Error types for calibration, classification and the refinement session
#[derive(Error, Debug)]
pub enum ScanError {
    /// Source image could not be decoded or has an unsupported format
    #[error("Failed to load image: {message}")]
    UnreadableImage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No candidate region for the reference marker was found
    #[error("Marker not found: {reason}")]
    MarkerNotFound { reason: String },

    /// Scale factor requested from a calibration with no reference pixels
    #[error("Calibration has no reference pixels; scale factor is undefined")]
    CalibrationMissing,

    /// Color-range or denoise bounds outside their documented ranges
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Result sink rejected a commit
    #[error("Failed to save result: {message}")]
    PersistenceFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Display collaborator could not show a frame
    #[error("Display error: {message}")]
    DisplayFailure { message: String },

    /// Configuration file could not be read or written
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Refinement loop was ticked after it terminated
    #[error("Refinement session has already terminated")]
    SessionTerminated,
}

impl ScanError {
    /// Create an unreadable image error with context
    pub fn unreadable_image<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::UnreadableImage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a persistence failure with context
    pub fn persistence<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::PersistenceFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Check if this error leaves the refinement session usable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidParameter { .. }
                | ScanError::PersistenceFailure { .. }
                | ScanError::DisplayFailure { .. }
        )
    }

    /// Get operator-facing error description
    pub fn user_message(&self) -> String {
        match self {
            ScanError::UnreadableImage { .. } => {
                "Could not load the image. Please make sure you select a .png or .jpg file.".to_string()
            }
            ScanError::MarkerNotFound { .. } => {
                "Marker not found! Please make sure the white reference marker is visible in the photo.".to_string()
            }
            ScanError::CalibrationMissing => {
                "The image has not been calibrated, so no damage area can be computed.".to_string()
            }
            ScanError::InvalidParameter { parameter, value } => {
                format!("The value {} for {} is out of range and was ignored.", value, parameter)
            }
            ScanError::PersistenceFailure { .. } => "Unable to save file!".to_string(),
            _ => "Damage analysis failed. Please try again.".to_string(),
        }
    }
}
