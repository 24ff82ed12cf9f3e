//! # Output Layouts
//!
//! Which axes and buttons the virtual device declares, and which evdev codes
//! they use.
//!
//! | Layout | Steering | Gas | Brake | Clutch | Buttons |
//! |--------|----------|-----|-------|--------|---------|
//! | Merged | ABS_X | ABS_Y | ABS_Z | ABS_RX | 16 |
//! | PedalsOnly | - | ABS_X | ABS_Y | ABS_Z | 4 |
//!
//! Axis codes are assigned in ascending order so that the kernel's joydev
//! numbering (`js` axis 0, 1, 2, ...) matches the table left to right.
//! Buttons start at `BTN_JOYSTICK` and are never pressed by the pedals
//! themselves; some games only list devices that report buttons.

use evdev::AbsoluteAxisType;

use crate::calibration::Pedal;

/// First joystick button code (`BTN_JOYSTICK`, a.k.a. `BTN_TRIGGER`)
pub const BTN_JOYSTICK: u16 = 0x120;

/// Default vendor ID for synthesized devices
pub const DEFAULT_VENDOR_ID: u16 = 0xDDFD;

/// Output axis identity on the virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputAxis {
    Steering,
    Gas,
    Brake,
    Clutch,
}

impl OutputAxis {
    /// The calibrated pedal behind this axis; `None` for steering.
    #[must_use]
    pub fn pedal(self) -> Option<Pedal> {
        match self {
            OutputAxis::Steering => None,
            OutputAxis::Gas => Some(Pedal::Gas),
            OutputAxis::Brake => Some(Pedal::Brake),
            OutputAxis::Clutch => Some(Pedal::Clutch),
        }
    }
}

/// One update to be written to the virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    Axis(OutputAxis, i32),
    /// Button offset from `BTN_JOYSTICK` and its pressed state
    Button(u8, bool),
}

/// Capability layout of the virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceLayout {
    /// Wheelbase steering merged with the three pedals
    Merged,
    /// Pedals only, with placeholder buttons added
    PedalsOnly,
}

impl DeviceLayout {
    /// Declared axes in code order
    #[must_use]
    pub fn axes(self) -> &'static [OutputAxis] {
        match self {
            DeviceLayout::Merged => &[
                OutputAxis::Steering,
                OutputAxis::Gas,
                OutputAxis::Brake,
                OutputAxis::Clutch,
            ],
            DeviceLayout::PedalsOnly => &[OutputAxis::Gas, OutputAxis::Brake, OutputAxis::Clutch],
        }
    }

    /// evdev code of `axis`, or `None` if this layout does not declare it
    #[must_use]
    pub fn axis_code(self, axis: OutputAxis) -> Option<AbsoluteAxisType> {
        match (self, axis) {
            (DeviceLayout::Merged, OutputAxis::Steering) => Some(AbsoluteAxisType::ABS_X),
            (DeviceLayout::Merged, OutputAxis::Gas) => Some(AbsoluteAxisType::ABS_Y),
            (DeviceLayout::Merged, OutputAxis::Brake) => Some(AbsoluteAxisType::ABS_Z),
            (DeviceLayout::Merged, OutputAxis::Clutch) => Some(AbsoluteAxisType::ABS_RX),
            (DeviceLayout::PedalsOnly, OutputAxis::Steering) => None,
            (DeviceLayout::PedalsOnly, OutputAxis::Gas) => Some(AbsoluteAxisType::ABS_X),
            (DeviceLayout::PedalsOnly, OutputAxis::Brake) => Some(AbsoluteAxisType::ABS_Y),
            (DeviceLayout::PedalsOnly, OutputAxis::Clutch) => Some(AbsoluteAxisType::ABS_Z),
        }
    }

    /// Default identity of a device with this layout
    #[must_use]
    pub fn default_spec(self) -> DeviceSpec {
        match self {
            DeviceLayout::Merged => DeviceSpec {
                name: "Virtual Racing Device".to_string(),
                vendor_id: DEFAULT_VENDOR_ID,
                product_id: 0x6011,
                version: 1,
                buttons: 16,
                layout: self,
            },
            DeviceLayout::PedalsOnly => DeviceSpec {
                name: "Enhanced Racing Pedals".to_string(),
                vendor_id: DEFAULT_VENDOR_ID,
                product_id: 0x6012,
                version: 2,
                buttons: 4,
                layout: self,
            },
        }
    }
}

/// Everything needed to create the virtual device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
    /// Number of placeholder buttons starting at `BTN_JOYSTICK`
    pub buttons: u16,
    pub layout: DeviceLayout,
}

impl DeviceSpec {
    /// Button code for offset `index`, if the device declares it
    #[must_use]
    pub fn button_code(&self, index: u8) -> Option<u16> {
        (u16::from(index) < self.buttons).then(|| BTN_JOYSTICK + u16::from(index))
    }
}
