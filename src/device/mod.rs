//! # Device Module
//!
//! The synthesized output joystick and the seam to the host input subsystem.
//!
//! This module handles:
//! - Output axis identities and the two supported device layouts
//! - Creating a uinput device with axes plus placeholder buttons
//! - Emitting axis/button updates, each followed by a sync report
//! - Abstracting device creation so the relay can run against mocks

pub mod backend;
pub mod layout;
pub mod virtual_device;

pub use backend::{Backend, EvdevBackend};
pub use layout::{DeviceLayout, DeviceSpec, OutputAxis, OutputEvent};
pub use virtual_device::{EvdevVirtualDevice, VirtualOutput};
