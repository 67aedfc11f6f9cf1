//! In-process shared regions

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

use super::{RegionOpener, SharedRegion};
use crate::layout;
use crate::types::{StructSchema, Value};
use crate::{Result, TelemetryError};

type Buffer = Arc<RwLock<Vec<u8>>>;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Named byte buffers shared between writers and readers in one process.
///
/// Cloning the registry shares the same namespace, so a fixture can keep a
/// clone to publish or withdraw regions while a connection reads through
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    regions: Arc<RwLock<HashMap<String, Buffer>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` openable with `bytes` as its initial contents.
    ///
    /// Publishing an existing name replaces the buffer; readers that already
    /// opened the old one keep seeing it.
    pub fn publish(&self, name: impl Into<String>, bytes: Vec<u8>) -> RegionWriter {
        let name = name.into();
        let buffer = Arc::new(RwLock::new(bytes));
        debug!(region = %name, len = read(&buffer).len(), "Publishing in-memory region");
        write(&self.regions).insert(name.clone(), Arc::clone(&buffer));
        RegionWriter { name, buffer }
    }

    /// Remove `name`; subsequent opens fail with `RegionNotFound`.
    pub fn withdraw(&self, name: &str) -> bool {
        let removed = write(&self.regions).remove(name).is_some();
        debug!(region = %name, removed, "Withdrawing in-memory region");
        removed
    }

    /// Writer for an already published region.
    pub fn writer(&self, name: &str) -> Option<RegionWriter> {
        read(&self.regions)
            .get(name)
            .map(|buffer| RegionWriter { name: name.to_string(), buffer: Arc::clone(buffer) })
    }

    pub fn contains(&self, name: &str) -> bool {
        read(&self.regions).contains_key(name)
    }
}

impl RegionOpener for MemoryRegistry {
    type Region = MemoryRegion;

    fn open(&self, name: &str, expected_size: usize) -> Result<MemoryRegion> {
        let buffer = read(&self.regions)
            .get(name)
            .cloned()
            .ok_or_else(|| TelemetryError::region_not_found(name))?;

        let len = read(&buffer).len();
        if len != expected_size {
            debug!(region = %name, len, expected_size, "In-memory region size differs from layout");
        }

        Ok(MemoryRegion { name: name.to_string(), buffer: Some(buffer) })
    }
}

/// Reader handle returned by [`MemoryRegistry`].
#[derive(Debug)]
pub struct MemoryRegion {
    name: String,
    buffer: Option<Buffer>,
}

impl SharedRegion for MemoryRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, |buffer| read(buffer).len())
    }

    fn snapshot(&self) -> Result<Vec<u8>> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or_else(|| TelemetryError::RegionClosed { name: self.name.clone() })?;
        let bytes = read(buffer).clone();
        trace!(region = %self.name, len = bytes.len(), "Snapshot");
        Ok(bytes)
    }

    fn close(&mut self) {
        if self.buffer.take().is_some() {
            trace!(region = %self.name, "Closed in-memory region");
        }
    }

    fn is_closed(&self) -> bool {
        self.buffer.is_none()
    }
}

/// Writer side of an in-memory region, standing in for the simulator plugin.
#[derive(Debug, Clone)]
pub struct RegionWriter {
    name: String,
    buffer: Buffer,
}

impl RegionWriter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        read(&self.buffer).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole contents.
    pub fn write(&self, bytes: &[u8]) {
        let mut buffer = write(&self.buffer);
        buffer.clear();
        buffer.extend_from_slice(bytes);
    }

    /// Mutate the contents in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        f(&mut write(&self.buffer))
    }

    /// Encode one field at `path`, as the plugin would on an update.
    pub fn write_field(&self, schema: &StructSchema, path: &str, value: &Value) -> Result<()> {
        layout::write_field(&mut write(&self.buffer), schema, path, value)
    }
}
