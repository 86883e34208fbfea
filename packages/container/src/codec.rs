//! The container codec seam.

use std::path::Path;

use crate::{Bindings, ContainerError};

/// Reads and writes named engine values to a container file.
///
/// The session only ever talks to the container through this trait, so an
/// alternative on-disk format can be swapped in without touching the bridge.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn ContainerCodec>`.
pub trait ContainerCodec: Send + Sync {
    /// Read every binding stored in `path`.
    fn read(&self, path: &Path) -> Result<Bindings, ContainerError>;

    /// Replace the content of `path` with `bindings`.
    fn write(&self, path: &Path, bindings: &Bindings) -> Result<(), ContainerError>;

    /// File extension (without the dot) that the engine recognises.
    fn extension(&self) -> &'static str;
}

impl<T: ContainerCodec + ?Sized> ContainerCodec for Box<T> {
    fn read(&self, path: &Path) -> Result<Bindings, ContainerError> {
        self.as_ref().read(path)
    }

    fn write(&self, path: &Path, bindings: &Bindings) -> Result<(), ContainerError> {
        self.as_ref().write(path, bindings)
    }

    fn extension(&self) -> &'static str {
        self.as_ref().extension()
    }
}

impl<T: ContainerCodec + ?Sized> ContainerCodec for std::sync::Arc<T> {
    fn read(&self, path: &Path) -> Result<Bindings, ContainerError> {
        self.as_ref().read(path)
    }

    fn write(&self, path: &Path, bindings: &Bindings) -> Result<(), ContainerError> {
        self.as_ref().write(path, bindings)
    }

    fn extension(&self) -> &'static str {
        self.as_ref().extension()
    }
}
