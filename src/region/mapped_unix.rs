//! File-backed regions under a shared memory directory

use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::{RegionOpener, SharedRegion};
use crate::config::ReaderConfig;
use crate::{Result, TelemetryError};

/// Opens regions as files named after the region inside `root`.
///
/// Bridges that forward the plugin's Windows mappings to a Linux host expose
/// them as `/dev/shm/$rFactor2SMMP_Telemetry$` and so on.
#[derive(Debug, Clone)]
pub struct ShmDirOpener {
    root: PathBuf,
}

impl ShmDirOpener {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ShmDirOpener {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SHM_ROOT)
    }
}

impl From<&ReaderConfig> for ShmDirOpener {
    fn from(config: &ReaderConfig) -> Self {
        Self::new(&config.shm_root)
    }
}

impl RegionOpener for ShmDirOpener {
    type Region = MappedFileRegion;

    fn open(&self, name: &str, expected_size: usize) -> Result<MappedFileRegion> {
        let path = self.root.join(name);
        trace!(path = %path.display(), expected_size, "Opening mapped region");

        let file = File::open(&path)
            .map_err(|e| TelemetryError::region_not_found_with_source(name, Box::new(e)))?;
        let file_len = file
            .metadata()
            .map_err(|e| TelemetryError::region_not_found_with_source(name, Box::new(e)))?
            .len();

        if file_len == 0 {
            return Err(TelemetryError::region_not_found(name));
        }

        // Never map past end of file: a short file is mapped whole and the
        // decoder rejects it on size.
        let map_len = usize::try_from(file_len).unwrap_or(usize::MAX).min(expected_size);
        if map_len < expected_size {
            warn!(region = %name, file_len, expected_size, "Region file is shorter than the layout");
        }

        // SAFETY: the mapping is read-only and only ever copied out of. The
        // writer may change the contents concurrently, which can tear a
        // snapshot but cannot violate memory safety.
        let mmap = unsafe { MmapOptions::new().len(map_len).map(&file) }
            .map_err(|e| TelemetryError::region_not_found_with_source(name, Box::new(e)))?;

        debug!(region = %name, len = map_len, "Mapped region file");
        Ok(MappedFileRegion { name: name.to_string(), mmap: Some(mmap) })
    }
}

/// Read-only mapping of one region file.
#[derive(Debug)]
pub struct MappedFileRegion {
    name: String,
    mmap: Option<Mmap>,
}

impl SharedRegion for MappedFileRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.mmap.as_ref().map_or(0, |m| m.len())
    }

    fn snapshot(&self) -> Result<Vec<u8>> {
        let mmap = self
            .mmap
            .as_ref()
            .ok_or_else(|| TelemetryError::RegionClosed { name: self.name.clone() })?;
        Ok(mmap.to_vec())
    }

    fn close(&mut self) {
        if self.mmap.take().is_some() {
            trace!(region = %self.name, "Unmapped region file");
        }
    }

    fn is_closed(&self) -> bool {
        self.mmap.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rf2-capture-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_files_are_region_not_found() {
        let opener = ShmDirOpener::new(scratch_dir("missing"));
        let err = opener.open("$rFactor2SMMP_Scoring$", 16).unwrap_err();
        assert!(matches!(err, TelemetryError::RegionNotFound { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn maps_exactly_the_expected_size() {
        let dir = scratch_dir("exact");
        let mut file = File::create(dir.join("$Region$")).unwrap();
        file.write_all(&[7u8; 32]).unwrap();
        file.sync_all().unwrap();

        let opener = ShmDirOpener::new(&dir);
        let mut region = opener.open("$Region$", 16).unwrap();
        assert_eq!(region.len(), 16);
        assert_eq!(region.snapshot().unwrap(), vec![7u8; 16]);

        region.close();
        region.close();
        assert!(matches!(region.snapshot(), Err(TelemetryError::RegionClosed { .. })));
    }

    #[test]
    fn short_files_map_whole() {
        let dir = scratch_dir("short");
        std::fs::write(dir.join("$Region$"), [1u8; 8]).unwrap();

        let region = ShmDirOpener::new(&dir).open("$Region$", 64).unwrap();
        assert_eq!(region.snapshot().unwrap().len(), 8);
    }

    #[test]
    fn empty_files_are_not_regions_yet() {
        let dir = scratch_dir("empty");
        std::fs::write(dir.join("$Region$"), b"").unwrap();

        let result = ShmDirOpener::new(&dir).open("$Region$", 64);
        assert!(matches!(result, Err(TelemetryError::RegionNotFound { .. })));
    }
}
