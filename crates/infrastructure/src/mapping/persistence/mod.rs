mod file;
mod format;
mod v1;
mod v2;

pub use file::FileMappingPersistence;
pub use format::{FileVersion, SUPPORTED_FEATURES};
