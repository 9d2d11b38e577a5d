use pair_core::Viewer;

/// A resultId that does not decode under the current layout. Callers treat it
/// as corrupt or foreign and show a "no result" state; it is never retried.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResultIdError {
    #[error("personal type {value} for side {side:?} is out of range")]
    TypeOutOfRange { side: Viewer, value: u32 },
    #[error("unsupported result layout version {0}")]
    UnsupportedVersion(u32),
    #[error("reserved bits set in result id {0}")]
    ReservedBits(u32),
}
