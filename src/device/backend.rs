//! Trait abstraction over the host input subsystem to enable testing

use std::path::Path;

use super::layout::DeviceSpec;
use super::virtual_device::{EvdevVirtualDevice, VirtualOutput};
use crate::error::{CreationError, SourceUnavailable};
use crate::joystick::source::{FrameSource, JoystickSource};

/// Acquires the relay's resources: source nodes and the virtual device
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send + Sync {
    /// Open a source joystick node for non-blocking reads.
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, SourceUnavailable>;

    /// Create the virtual output device.
    fn create_device(&self, spec: &DeviceSpec) -> Result<Box<dyn VirtualOutput>, CreationError>;
}

/// Real Linux backend: `/dev/input/jsN` sources and a uinput device
#[derive(Debug, Default, Clone, Copy)]
pub struct EvdevBackend;

impl Backend for EvdevBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, SourceUnavailable> {
        Ok(Box::new(JoystickSource::open(path)?))
    }

    fn create_device(&self, spec: &DeviceSpec) -> Result<Box<dyn VirtualOutput>, CreationError> {
        Ok(Box::new(EvdevVirtualDevice::create(spec)?))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evdev_backend_reports_missing_source() {
        let result = EvdevBackend.open_source(Path::new("/dev/input/nonexistent_js_54321"));
        match result {
            Err(err) => assert_eq!(err.path, Path::new("/dev/input/nonexistent_js_54321")),
            Ok(_) => panic!("Expected SourceUnavailable"),
        }
    }
}
