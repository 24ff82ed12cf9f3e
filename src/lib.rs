//! # Pedal Relay Library
//!
//! Merge a sim-racing wheelbase and pedal set into one calibrated virtual
//! joystick.
//!
//! This library reads raw Linux joystick events from one or two physical
//! devices, applies a per-pedal calibration transform, and re-emits the result
//! on a uinput device that games see as ordinary hardware.

pub mod calibration;
pub mod config;
pub mod device;
pub mod error;
pub mod joystick;
pub mod relay;
