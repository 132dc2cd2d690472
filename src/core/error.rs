//! Errors surfaced at the mutation boundary.

use uuid::Uuid;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Category,
    Event,
    Reminder,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Category => write!(f, "category"),
            EntityKind::Event => write!(f, "event"),
            EntityKind::Reminder => write!(f, "reminder"),
        }
    }
}

/// Rejection reasons for create/update/delete requests.
///
/// Nothing is written to the store when one of these is returned.
#[derive(Debug)]
pub enum TrackerError {
    /// A required field is missing or empty
    Validation(String),
    /// The category does not exist or belongs to another user
    InvalidCategory(Uuid),
    /// Unknown id, or a record the caller does not own
    NotFound { kind: EntityKind, id: Uuid },
    /// Email or username already taken
    Conflict(String),
    /// The store backend failed
    Store(anyhow::Error),
}

impl TrackerError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        TrackerError::NotFound { kind, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::NotFound { .. })
    }
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::Validation(msg) => write!(f, "validation failed: {msg}"),
            TrackerError::InvalidCategory(id) => write!(f, "invalid category {id}"),
            TrackerError::NotFound { kind, id } => write!(f, "{kind} {id} not found"),
            TrackerError::Conflict(msg) => write!(f, "conflict: {msg}"),
            TrackerError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Store(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Referential rejections raised inside the store come back as themselves;
/// anything else is a backend failure.
impl From<anyhow::Error> for TrackerError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<TrackerError>() {
            Ok(rejection) => rejection,
            Err(err) => TrackerError::Store(err),
        }
    }
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
