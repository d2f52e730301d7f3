use thiserror::Error;

#[derive(Debug, Error)]
pub enum EbdError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown age group: {0}")]
    UnknownAgeGroup(String),

    #[error("invalid student id {value:?} in attendance row {row}")]
    InvalidStudentId { row: String, value: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("class id {id} already belongs to {existing:?}, cannot rename it to {incoming:?}")]
    ClassIdConflict {
        id: uuid::Uuid,
        existing: String,
        incoming: String,
    },
}

pub type Result<T> = std::result::Result<T, EbdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = EbdError::Config("DATABASE_URL is not set".into());
        assert_eq!(err.to_string(), "configuration error: DATABASE_URL is not set");
    }

    #[test]
    fn invalid_student_id_display() {
        let err = EbdError::InvalidStudentId {
            row: "evt-1".into(),
            value: "abc".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid student id \"abc\" in attendance row evt-1"
        );
    }

    #[test]
    fn io_error_names_the_path() {
        let err = EbdError::Io {
            path: "alunos.csv".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "failed to open alunos.csv: not found");
    }

    #[test]
    fn class_id_conflict_display() {
        let id = uuid::Uuid::nil();
        let err = EbdError::ClassIdConflict {
            id,
            existing: "Adultos".into(),
            incoming: "Casais".into(),
        };
        assert_eq!(
            err.to_string(),
            format!("class id {id} already belongs to \"Adultos\", cannot rename it to \"Casais\"")
        );
    }
}
