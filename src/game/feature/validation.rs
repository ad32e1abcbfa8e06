// Content validation results for feature actions

/// Outcome of validating content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataValidationResult {
    Valid,
    Invalid,
    #[default]
    NotValidated,
}

impl DataValidationResult {
    /// Merge two results: Invalid wins, then Valid, then NotValidated
    pub fn combine(self, other: DataValidationResult) -> DataValidationResult {
        use DataValidationResult::*;
        match (self, other) {
            (Invalid, _) | (_, Invalid) => Invalid,
            (Valid, _) | (_, Valid) => Valid,
            _ => NotValidated,
        }
    }
}

/// Validation result plus the error messages that explain it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValidation {
    pub result: DataValidationResult,
    pub errors: Vec<String>,
}

impl DataValidation {
    pub fn valid() -> Self {
        Self {
            result: DataValidationResult::Valid,
            errors: Vec::new(),
        }
    }

    pub fn not_validated() -> Self {
        Self::default()
    }

    /// Record an error and mark the result invalid
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.result = self.result.combine(DataValidationResult::Invalid);
        self.errors.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.result == DataValidationResult::Valid
    }
}
