//! Native plugin mappings on Windows

use std::ptr::NonNull;
use tracing::{debug, trace};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
};
use windows::core::PCWSTR;

use super::{RegionOpener, SharedRegion};
use crate::config::ReaderConfig;
use crate::{Result, TelemetryError};

/// Opens the named file mappings created by the plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsOpener;

impl From<&ReaderConfig> for WindowsOpener {
    fn from(_: &ReaderConfig) -> Self {
        WindowsOpener
    }
}

impl RegionOpener for WindowsOpener {
    type Region = MappedViewRegion;

    fn open(&self, name: &str, expected_size: usize) -> Result<MappedViewRegion> {
        trace!(region = %name, expected_size, "Opening file mapping");

        let wide_name = wide_string(name);
        let mapping = unsafe {
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr()))
                .map_err(|e| TelemetryError::region_not_found_with_source(name, Box::new(e)))?
        };

        // A mapping smaller than the layout cannot be viewed at full size. That
        // is a plugin version mismatch, reported as a non-retryable WindowsApi.
        let view = unsafe { MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, expected_size) };
        let Some(base) = NonNull::new(view.Value as *mut u8) else {
            let win_err = windows::core::Error::from_thread();
            unsafe {
                let _ = CloseHandle(mapping);
            }
            return Err(TelemetryError::windows_api_error("MapViewOfFile", win_err));
        };

        debug!(region = %name, len = expected_size, "Mapped plugin region");
        Ok(MappedViewRegion {
            name: name.to_string(),
            mapping,
            view: Some(base),
            len: expected_size,
        })
    }
}

/// Read-only view of a plugin mapping.
pub struct MappedViewRegion {
    name: String,
    mapping: HANDLE,
    view: Option<NonNull<u8>>,
    len: usize,
}

impl std::fmt::Debug for MappedViewRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedViewRegion")
            .field("name", &self.name)
            .field("len", &self.len)
            .field("closed", &self.view.is_none())
            .finish()
    }
}

impl SharedRegion for MappedViewRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        if self.view.is_some() { self.len } else { 0 }
    }

    fn snapshot(&self) -> Result<Vec<u8>> {
        let base = self.view.ok_or_else(|| TelemetryError::RegionClosed { name: self.name.clone() })?;

        let mut bytes = vec![0u8; self.len];
        // SAFETY: the view maps exactly `len` readable bytes until close().
        unsafe {
            std::ptr::copy_nonoverlapping(base.as_ptr(), bytes.as_mut_ptr(), self.len);
        }
        Ok(bytes)
    }

    fn close(&mut self) {
        let Some(base) = self.view.take() else {
            return;
        };

        unsafe {
            let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: base.as_ptr() as *mut _ };
            let _ = UnmapViewOfFile(addr);
            let _ = CloseHandle(self.mapping);
        }
        trace!(region = %self.name, "Unmapped plugin region");
    }

    fn is_closed(&self) -> bool {
        self.view.is_none()
    }
}

impl Drop for MappedViewRegion {
    fn drop(&mut self) {
        self.close();
    }
}

// SAFETY: the region only holds a mapping handle and a pointer into a read-only
// view; both may be used from any thread.
unsafe impl Send for MappedViewRegion {}

fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}
