use std::error::Error;
use std::fmt::{Display, Formatter};

pub type VibroResult<T> = Result<T, VibroError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl ErrorCategory {
    pub const fn exit_status(self) -> ExitStatus {
        match self {
            Self::Success => ExitStatus {
                exit_code: 0,
                category_name: "Success",
                severity_class: "SUCCESS",
            },
            Self::InputValidationError => ExitStatus {
                exit_code: 2,
                category_name: "InputValidationError",
                severity_class: "INPUT_FATAL",
            },
            Self::IoSystemError => ExitStatus {
                exit_code: 3,
                category_name: "IoSystemError",
                severity_class: "IO_FATAL",
            },
            Self::ComputationError => ExitStatus {
                exit_code: 4,
                category_name: "ComputationError",
                severity_class: "RUN_FATAL",
            },
            Self::InternalError => ExitStatus {
                exit_code: 5,
                category_name: "InternalError",
                severity_class: "SYS_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_status().exit_code
    }

    pub const fn category_name(self) -> &'static str {
        self.exit_status().category_name
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub exit_code: i32,
    pub category_name: &'static str,
    pub severity_class: &'static str,
}

/// Every failure the plugin core can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadMode,
    InvalidLatticeKind,
    BadCustomPath,
    BadPolarization,
    BadPhonopyInput,
    CorruptForceConstants,
    NeedsEigenvectors,
    NeedsForceConstants,
    UpstreamFailed,
    KernelInternalError,
    InvalidInput,
    Io,
}

impl ErrorKind {
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::BadMode => "INPUT.BAD_MODE",
            Self::InvalidLatticeKind => "INPUT.INVALID_LATTICE_KIND",
            Self::BadCustomPath => "INPUT.BAD_CUSTOM_PATH",
            Self::BadPolarization => "INPUT.BAD_POLARIZATION",
            Self::BadPhonopyInput => "INPUT.BAD_PHONOPY_INPUT",
            Self::CorruptForceConstants => "IO.CORRUPT_FORCE_CONSTANTS",
            Self::NeedsEigenvectors => "RUN.NEEDS_EIGENVECTORS",
            Self::NeedsForceConstants => "RUN.NEEDS_FORCE_CONSTANTS",
            Self::UpstreamFailed => "RUN.UPSTREAM_FAILED",
            Self::KernelInternalError => "SYS.KERNEL_INTERNAL",
            Self::InvalidInput => "INPUT.INVALID",
            Self::Io => "IO.SYSTEM",
        }
    }

    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::BadMode
            | Self::InvalidLatticeKind
            | Self::BadCustomPath
            | Self::BadPolarization
            | Self::BadPhonopyInput
            | Self::InvalidInput => ErrorCategory::InputValidationError,
            Self::CorruptForceConstants | Self::Io => ErrorCategory::IoSystemError,
            Self::NeedsEigenvectors | Self::NeedsForceConstants | Self::UpstreamFailed => {
                ErrorCategory::ComputationError
            }
            Self::KernelInternalError => ErrorCategory::InternalError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibroError {
    kind: ErrorKind,
    message: String,
}

impl VibroError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_mode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadMode, message)
    }

    pub fn invalid_lattice_kind(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidLatticeKind, message)
    }

    pub fn bad_custom_path(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadCustomPath, message)
    }

    pub fn bad_polarization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadPolarization, message)
    }

    pub fn bad_phonopy_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadPhonopyInput, message)
    }

    pub fn corrupt_force_constants(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CorruptForceConstants, message)
    }

    pub fn needs_eigenvectors(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NeedsEigenvectors, message)
    }

    pub fn needs_force_constants(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NeedsForceConstants, message)
    }

    pub fn upstream_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamFailed, message)
    }

    pub fn kernel_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::KernelInternalError, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub const fn placeholder(&self) -> &'static str {
        self.kind.placeholder()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.kind.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category().is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder(), self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category()
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for VibroError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category().category_name(),
            self.placeholder(),
            self.message
        )
    }
}

impl Error for VibroError {}

#[cfg(test)]
mod tests {
    use super::{ErrorCategory, ErrorKind, VibroError};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (ErrorCategory::Success, 0, "Success", "SUCCESS"),
            (
                ErrorCategory::InputValidationError,
                2,
                "InputValidationError",
                "INPUT_FATAL",
            ),
            (ErrorCategory::IoSystemError, 3, "IoSystemError", "IO_FATAL"),
            (
                ErrorCategory::ComputationError,
                4,
                "ComputationError",
                "RUN_FATAL",
            ),
            (ErrorCategory::InternalError, 5, "InternalError", "SYS_FATAL"),
        ];

        for (category, exit_code, name, class) in cases {
            let status = category.exit_status();
            assert_eq!(status.exit_code, exit_code);
            assert_eq!(status.category_name, name);
            assert_eq!(status.severity_class, class);
        }
    }

    #[test]
    fn kinds_map_to_expected_categories() {
        assert_eq!(
            ErrorKind::BadCustomPath.category(),
            ErrorCategory::InputValidationError
        );
        assert_eq!(
            ErrorKind::CorruptForceConstants.category(),
            ErrorCategory::IoSystemError
        );
        assert_eq!(
            ErrorKind::NeedsEigenvectors.category(),
            ErrorCategory::ComputationError
        );
        assert_eq!(
            ErrorKind::KernelInternalError.category(),
            ErrorCategory::InternalError
        );
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = VibroError::bad_mode("simulation_mode must be one of 1..4, got 7");

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.BAD_MODE] simulation_mode must be one of 1..4, got 7"
        );
        assert_eq!(error.fatal_exit_line().as_deref(), Some("FATAL EXIT CODE: 2"));
    }
}
