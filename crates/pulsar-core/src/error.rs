use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum CompileReason {
    #[error("rule parse error")]
    Parse,
    #[error("rule validation error")]
    Validation,
    #[error("dependency analysis error")]
    Dependency,
    #[error("sensor catalog error")]
    Catalog,
    #[error("artifact emission error")]
    Emission,
    #[error("configuration error")]
    Configuration,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CompileReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Parse => 2001,
            Self::Validation => 2002,
            Self::Dependency => 2003,
            Self::Catalog => 2004,
            Self::Emission => 2005,
            Self::Configuration => 2006,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CompileError = StructError<CompileReason>;
pub type CompileResult<T> = Result<T, CompileError>;
