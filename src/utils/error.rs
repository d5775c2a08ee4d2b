use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoldError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Malformed order file {file}: {message}")]
    MalformedRecord { file: String, message: String },

    #[error("Input directory unavailable: {path} ({source})")]
    InputUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to archive {file}: {source}")]
    ArchiveError {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HoldError {
    pub fn malformed(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError(_) | Self::InputUnavailable { .. } | Self::ArchiveError { .. } => {
                ErrorCategory::Io
            }
            Self::XmlError(_) | Self::SerializationError(_) | Self::MalformedRecord { .. } => {
                ErrorCategory::Data
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一檔案的問題不影響整批處理
            Self::XmlError(_) | Self::MalformedRecord { .. } => ErrorSeverity::Low,
            Self::IoError(_) | Self::ArchiveError { .. } => ErrorSeverity::Medium,
            Self::SerializationError(_) => ErrorSeverity::High,
            Self::InputUnavailable { .. }
            | Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::IoError(_) => "Check file permissions and free disk space, then re-run",
            Self::XmlError(_) | Self::MalformedRecord { .. } => {
                "Inspect the order export; the file was archived untouched"
            }
            Self::SerializationError(_) => "Disable the JSON report companion and re-run",
            Self::InputUnavailable { .. } => "Verify paths.input_dir exists and is readable",
            Self::ArchiveError { .. } => {
                "Move the file to the archive directory by hand before the next run"
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => "Fix the configuration file and re-run",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Data => format!("Order data problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, HoldError>;
