//! Virtual joystick device using evdev/uinput
//!
//! Creates a synthetic racing device that the kernel exposes as both
//! `/dev/input/eventX` and `/dev/input/jsN`, so games pick it up like real
//! hardware.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AttributeSet, BusType, EventType, InputEvent, InputId, Key, UinputAbsSetup,
};
use tracing::{debug, info};

use super::layout::{DeviceSpec, OutputEvent};
use crate::error::{CreationError, WriteError};
use crate::joystick::codec::{AXIS_MAX, AXIS_MIN};

/// Sink for synthesized events
///
/// Every successful `emit` is followed by a sync report, so each update is
/// delivered to readers on its own.
pub trait VirtualOutput: Send {
    /// Write one update.
    fn emit(&mut self, event: OutputEvent) -> Result<(), WriteError>;

    /// Release the device node. Idempotent.
    fn close(&mut self);
}

/// uinput-backed virtual joystick
pub struct EvdevVirtualDevice {
    device: Option<VirtualDevice>,
    spec: DeviceSpec,
}

impl std::fmt::Debug for EvdevVirtualDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevVirtualDevice")
            .field("spec", &self.spec)
            .field("open", &self.device.is_some())
            .finish()
    }
}

impl EvdevVirtualDevice {
    /// Create the virtual device
    ///
    /// Declares every axis of `spec.layout` ranged `-32767..=32767` and
    /// `spec.buttons` placeholder buttons starting at `BTN_JOYSTICK`.
    ///
    /// # Errors
    ///
    /// Returns [`CreationError`] if `/dev/uinput` is missing or not writable.
    pub fn create(spec: &DeviceSpec) -> Result<Self, CreationError> {
        let device = Self::build(spec).map_err(|source| CreationError {
            name: spec.name.clone(),
            source,
        })?;

        info!(
            "Created virtual device '{}' ({:04x}:{:04x}, {} axes, {} buttons)",
            spec.name,
            spec.vendor_id,
            spec.product_id,
            spec.layout.axes().len(),
            spec.buttons
        );

        Ok(Self {
            device: Some(device),
            spec: spec.clone(),
        })
    }

    fn build(spec: &DeviceSpec) -> std::io::Result<VirtualDevice> {
        let mut keys = AttributeSet::<Key>::new();
        for index in 0..spec.buttons {
            if let Ok(index) = u8::try_from(index) {
                if let Some(code) = spec.button_code(index) {
                    keys.insert(Key::new(code));
                }
            }
        }

        let mut builder = VirtualDeviceBuilder::new()?
            .name(&spec.name)
            .input_id(InputId::new(
                BusType::BUS_USB,
                spec.vendor_id,
                spec.product_id,
                spec.version,
            ))
            .with_keys(&keys)?;

        for &axis in spec.layout.axes() {
            if let Some(code) = spec.layout.axis_code(axis) {
                let info = AbsInfo::new(0, i32::from(AXIS_MIN), i32::from(AXIS_MAX), 0, 0, 0);
                builder = builder.with_absolute_axis(&UinputAbsSetup::new(code, info))?;
            }
        }

        builder.build()
    }

    pub fn spec(&self) -> &DeviceSpec {
        &self.spec
    }

    fn to_input_event(&self, event: OutputEvent) -> Option<InputEvent> {
        match event {
            OutputEvent::Axis(axis, value) => {
                let code = self.spec.layout.axis_code(axis)?;
                Some(InputEvent::new(EventType::ABSOLUTE, code.0, value))
            }
            OutputEvent::Button(index, pressed) => {
                let code = self.spec.button_code(index)?;
                Some(InputEvent::new(EventType::KEY, code, i32::from(pressed)))
            }
        }
    }
}

impl VirtualOutput for EvdevVirtualDevice {
    fn emit(&mut self, event: OutputEvent) -> Result<(), WriteError> {
        let Some(input_event) = self.to_input_event(event) else {
            debug!("Event {:?} not declared by this layout; dropped", event);
            return Ok(());
        };
        let device = self.device.as_mut().ok_or(WriteError::Closed)?;

        // emit() appends SYN_REPORT after the batch
        device.emit(&[input_event]).map_err(WriteError::Io)
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            info!("Closed virtual device '{}'", self.spec.name);
        }
    }
}
