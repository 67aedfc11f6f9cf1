//! Read-only handles onto named shared memory regions
//!
//! The connection manager never touches the OS directly. It asks a
//! [`RegionOpener`] for a [`SharedRegion`] by name and copies a snapshot out of
//! it on every poll. Backends:
//!
//! - [`WindowsOpener`]: the plugin's native named file mappings (Windows only)
//! - [`ShmDirOpener`]: files exported under a directory such as `/dev/shm` by a
//!   Wine/Proton bridge, mapped with `memmap2` (Unix only)
//! - [`MemoryRegistry`]: in-process buffers for tests, replay tooling and
//!   benchmarks
//!
//! [`PlatformOpener`] names the native backend for the current target.

mod memory;
#[cfg(unix)]
mod mapped_unix;
#[cfg(windows)]
mod mapped_windows;

pub use memory::{MemoryRegion, MemoryRegistry, RegionWriter};
#[cfg(unix)]
pub use mapped_unix::{MappedFileRegion, ShmDirOpener};
#[cfg(windows)]
pub use mapped_windows::{MappedViewRegion, WindowsOpener};

use crate::Result;
use crate::config::ReaderConfig;

/// An open, read-only view onto one named region.
pub trait SharedRegion: Send {
    /// Well-known name the region was opened with.
    fn name(&self) -> &str;

    /// Number of bytes a snapshot returns.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the current contents out of the region.
    ///
    /// Always returns the full length. Fails with
    /// [`TelemetryError::RegionClosed`](crate::TelemetryError::RegionClosed)
    /// after [`close`](Self::close).
    fn snapshot(&self) -> Result<Vec<u8>>;

    /// Release the underlying mapping. Idempotent.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Opens regions by name.
pub trait RegionOpener {
    type Region: SharedRegion;

    /// Open `name`, expecting a region of `expected_size` bytes.
    ///
    /// A missing OS object yields
    /// [`TelemetryError::RegionNotFound`](crate::TelemetryError::RegionNotFound).
    fn open(&self, name: &str, expected_size: usize) -> Result<Self::Region>;
}

impl<O: RegionOpener + ?Sized> RegionOpener for &O {
    type Region = O::Region;

    fn open(&self, name: &str, expected_size: usize) -> Result<Self::Region> {
        (**self).open(name, expected_size)
    }
}

/// Native backend for the current target.
#[cfg(windows)]
pub type PlatformOpener = WindowsOpener;

/// Native backend for the current target.
#[cfg(unix)]
pub type PlatformOpener = ShmDirOpener;

/// Native backend for the current target.
#[cfg(not(any(windows, unix)))]
pub type PlatformOpener = UnsupportedOpener;

/// Opener for targets without a shared memory backend.
#[cfg(not(any(windows, unix)))]
#[derive(Debug, Clone, Default)]
pub struct UnsupportedOpener;

#[cfg(not(any(windows, unix)))]
impl RegionOpener for UnsupportedOpener {
    type Region = MemoryRegion;

    fn open(&self, _name: &str, _expected_size: usize) -> Result<Self::Region> {
        Err(crate::TelemetryError::unsupported_platform("Shared memory mapping", "Windows or Unix"))
    }
}

#[cfg(not(any(windows, unix)))]
impl From<&ReaderConfig> for UnsupportedOpener {
    fn from(_: &ReaderConfig) -> Self {
        UnsupportedOpener
    }
}

/// Build the native opener described by `config`.
pub fn platform_opener(config: &ReaderConfig) -> PlatformOpener {
    PlatformOpener::from(config)
}
