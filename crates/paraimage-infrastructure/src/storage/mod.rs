//! Low-level file storage with atomic writes and file locking.

mod atomic_file;

pub use atomic_file::{AtomicFile, AtomicFileError, FileFormat};
