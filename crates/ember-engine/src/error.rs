use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum StreakError {
    /// Caller passed a nil user id. Nothing was read or written.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Persistence failure, propagated without retry.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The row kept moving underneath the read-modify-write cycle.
    #[error("streak row for {user_id} still contended after {attempts} attempts")]
    Contention { user_id: Uuid, attempts: u32 },
}
