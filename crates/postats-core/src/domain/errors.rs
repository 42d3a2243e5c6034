use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PoStatsResult<T> = Result<T, PoStatsError>;
pub type ServiceResult<T> = PoStatsResult<T>;

/// Failure class of a [`PoStatsError`]; each maps to one process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoStatsErrorCategory {
    InputValidationError,
    NotFound,
    IoSystemError,
    InternalError,
}

impl PoStatsErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::NotFound => 3,
            Self::IoSystemError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::NotFound => "NotFound",
            Self::IoSystemError => "IoSystemError",
            Self::InternalError => "InternalError",
        }
    }
}

/// Error shared by every service-level operation.
///
/// The placeholder is a stable dotted code (`NOT_FOUND.RUN`, `IO.STORE`, ...)
/// that callers can match on without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoStatsError {
    category: PoStatsErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl PoStatsError {
    pub fn new(
        category: PoStatsErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            PoStatsErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn not_found(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PoStatsErrorCategory::NotFound, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PoStatsErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PoStatsErrorCategory::InternalError, placeholder, message)
    }

    pub fn run_not_found(run_number: u32) -> Self {
        Self::not_found(
            "NOT_FOUND.RUN",
            format!("cannot find POStats run number {}", run_number),
        )
    }

    pub const fn category(&self) -> PoStatsErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for PoStatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for PoStatsError {}

#[cfg(test)]
mod tests {
    use super::{PoStatsError, PoStatsErrorCategory};

    #[test]
    fn categories_map_to_distinct_failure_exit_codes() {
        let codes = [
            PoStatsErrorCategory::InputValidationError,
            PoStatsErrorCategory::NotFound,
            PoStatsErrorCategory::IoSystemError,
            PoStatsErrorCategory::InternalError,
        ]
        .map(PoStatsErrorCategory::exit_code);

        assert_eq!(codes, [2, 3, 4, 5]);
    }

    #[test]
    fn run_not_found_renders_diagnostic_lines() {
        let error = PoStatsError::run_not_found(1234);

        assert_eq!(error.category(), PoStatsErrorCategory::NotFound);
        assert_eq!(error.exit_code(), 3);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [NOT_FOUND.RUN] cannot find POStats run number 1234"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 3");
    }

    #[test]
    fn display_includes_category_and_placeholder() {
        let error = PoStatsError::input_validation("INPUT.AUTHOR", "author must not be empty");
        assert_eq!(
            error.to_string(),
            "InputValidationError [INPUT.AUTHOR] author must not be empty"
        );
    }
}
