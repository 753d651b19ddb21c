//! Error types.

use std::ffi::NulError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving or forwarding to harness hooks.
#[derive(Debug, Error)]
pub enum HookError {
    /// A forwarding call was made but the harness does not define the symbol
    #[error("The harness does not define {0}")]
    Missing(&'static str),

    /// The harness shared object could not be opened
    #[error("Could not load harness {}: {source}", path.display())]
    Load {
        /// Path that was passed to dlopen()
        path: PathBuf,
        /// Error reported by the dynamic loader
        source: libloading::Error,
    },

    /// [`install`](crate::hooks::install) was called after the registry had been populated
    #[error("The hook registry has already been initialized")]
    AlreadyInstalled,

    /// A command line argument could not be turned into a C string
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] NulError),

    /// A size argument does not fit into the buffer it describes
    #[error("Size {size} exceeds buffer capacity {capacity}")]
    SizeOutOfBounds {
        /// The size that was requested
        size: usize,
        /// The number of bytes actually available
        capacity: usize,
    },
}

#[cfg(feature = "components")]
impl From<HookError> for libafl::Error {
    fn from(err: HookError) -> Self {
        libafl::Error::illegal_state(err.to_string())
    }
}
