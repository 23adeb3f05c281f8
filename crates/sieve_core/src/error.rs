use thiserror::Error;

#[derive(Debug, Error)]
pub enum SieveError {
    #[error("unknown table: {table}")]
    UnknownTable { table: String },
    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidFilterValue {
        field: String,
        value: String,
        reason: String,
    },
    #[error("limit exceeded: {message}")]
    LimitExceeded { message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl SieveError {
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFilterValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn limit(message: impl Into<String>) -> Self {
        Self::LimitExceeded {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFilterValue { .. } | Self::LimitExceeded { .. } | Self::InvalidInput { .. }
        )
    }
}

pub type SieveResult<T> = Result<T, SieveError>;

impl From<sea_orm::DbErr> for SieveError {
    fn from(value: sea_orm::DbErr) -> Self {
        SieveError::storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::SieveError;

    #[test]
    fn helper_constructors_set_variants() {
        let err = SieveError::unknown_table("widgets");
        assert!(matches!(err, SieveError::UnknownTable { .. }));
        let err = SieveError::invalid_value("id", "abc", "not a number");
        assert!(matches!(err, SieveError::InvalidFilterValue { .. }));
        let err = SieveError::limit("too many");
        assert!(matches!(err, SieveError::LimitExceeded { .. }));
        let err = SieveError::invalid("bad");
        assert!(matches!(err, SieveError::InvalidInput { .. }));
        let err = SieveError::storage("disk");
        assert!(matches!(err, SieveError::Storage { .. }));
    }

    #[test]
    fn invalid_value_carries_field_and_raw_value() {
        let err = SieveError::invalid_value("sameEditCount", "lots", "invalid digit");
        assert_eq!(
            err.to_string(),
            "invalid value 'lots' for field 'sameEditCount': invalid digit"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn unknown_table_is_not_a_client_error() {
        assert!(!SieveError::unknown_table("nope").is_client_error());
        assert!(!SieveError::storage("down").is_client_error());
    }
}
