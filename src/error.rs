use core::fmt;

/// Errors surfaced by the control core.
///
/// The domain has no user-facing failures: out-of-range values are
/// normalized where they enter. What remains are storage faults, which the
/// main loop reports and retries on the next persistence request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The storage medium never reported ready within the spin bound.
    StorageTimeout,
    /// The storage driver rejected the access.
    Storage,
    /// An access fell outside the storage capacity.
    OutOfRange,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StorageTimeout => f.write_str("storage did not become ready"),
            Error::Storage => f.write_str("storage access failed"),
            Error::OutOfRange => f.write_str("storage address out of range"),
        }
    }
}
