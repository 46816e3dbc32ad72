use thiserror::Error;

/// Coarse classification of every failure the engine and its bindings can report.
///
/// Each concrete error type of the workspace maps onto exactly one kind, so callers can
/// branch on the kind without matching on crate-specific enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value is not the canonical encoding of a field element.
    InvalidFieldElement,
    /// Inversion of, or division by, zero.
    DivisionByZero,
    /// The requested evaluation domain is larger than the field supports.
    DomainSizeExceeded,
    /// A declared input signal was not provided.
    MissingInput,
    /// The provided inputs could not be decoded.
    MalformedInput,
    /// The witness violates a constraint.
    ConstraintUnsatisfied,
    /// The proving key does not fit the constraint system.
    ProvingKeyMismatch,
    /// The witness does not have the length the constraint system expects.
    WitnessSizeMismatch,
    /// The number of public inputs does not fit the verifying key.
    PublicInputCountMismatch,
    /// A point, proof or key could not be decoded.
    InvalidEncoding,
    /// The proving context was already released.
    ContextClosed,
}

/// Errors of the Groth16 engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Groth16Error {
    /// See [`ErrorKind::InvalidFieldElement`].
    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),
    /// See [`ErrorKind::DivisionByZero`].
    #[error("division by zero")]
    DivisionByZero,
    /// See [`ErrorKind::DomainSizeExceeded`].
    #[error("domain of size {required} exceeds the maximum of {max}")]
    DomainSizeExceeded {
        /// Requested number of elements.
        required: usize,
        /// Largest supported size.
        max: usize,
    },
    /// The lowest violated constraint row.
    #[error("constraint {index} is not satisfied")]
    ConstraintUnsatisfied {
        /// Row index.
        index: usize,
    },
    /// See [`ErrorKind::ProvingKeyMismatch`].
    #[error("proving key does not match the constraint system: {0}")]
    ProvingKeyMismatch(String),
    /// See [`ErrorKind::WitnessSizeMismatch`].
    #[error("expected a witness of length {expected}, got {actual}")]
    WitnessSizeMismatch {
        /// Number of wires of the constraint system.
        expected: usize,
        /// Length of the witness.
        actual: usize,
    },
    /// See [`ErrorKind::PublicInputCountMismatch`].
    #[error("expected {expected} public inputs, got {actual}")]
    PublicInputCountMismatch {
        /// Inputs the verifying key expects.
        expected: usize,
        /// Inputs provided.
        actual: usize,
    },
    /// See [`ErrorKind::InvalidEncoding`].
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    /// Bases and scalars of an MSM differ in length. Reported as
    /// [`ErrorKind::ProvingKeyMismatch`].
    #[error("msm over {bases} bases but {scalars} scalars")]
    MsmLengthMismatch {
        /// Number of bases.
        bases: usize,
        /// Number of scalars.
        scalars: usize,
    },
}

impl Groth16Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Groth16Error::InvalidFieldElement(_) => ErrorKind::InvalidFieldElement,
            Groth16Error::DivisionByZero => ErrorKind::DivisionByZero,
            Groth16Error::DomainSizeExceeded { .. } => ErrorKind::DomainSizeExceeded,
            Groth16Error::ConstraintUnsatisfied { .. } => ErrorKind::ConstraintUnsatisfied,
            Groth16Error::ProvingKeyMismatch(_) | Groth16Error::MsmLengthMismatch { .. } => {
                ErrorKind::ProvingKeyMismatch
            }
            Groth16Error::WitnessSizeMismatch { .. } => ErrorKind::WitnessSizeMismatch,
            Groth16Error::PublicInputCountMismatch { .. } => ErrorKind::PublicInputCountMismatch,
            Groth16Error::InvalidEncoding(_) => ErrorKind::InvalidEncoding,
        }
    }
}

impl From<ark_serialize::SerializationError> for Groth16Error {
    fn from(value: ark_serialize::SerializationError) -> Self {
        Groth16Error::InvalidEncoding(value.to_string())
    }
}

/// Result type of the engine.
pub type Result<T, E = Groth16Error> = std::result::Result<T, E>;
