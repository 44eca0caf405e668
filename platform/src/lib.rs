// OS-facing collaborators: raw volume access, host directory
// enumeration, and the bulk copy used for before/after comparisons.

pub mod copy;
pub mod host;
pub mod volume;

pub use copy::{copy_directory, CopyStats};
pub use host::StdHostEnumerator;
pub use volume::{PlatformVolumeScanner, RawVolume};
