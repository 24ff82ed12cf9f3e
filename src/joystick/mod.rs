//! # Joystick Module
//!
//! Linux joystick (`/dev/input/jsN`) input handling.
//!
//! This module handles:
//! - Decoding and encoding the fixed 8-byte `js_event` frame
//! - Opening joystick nodes in non-blocking mode
//! - Polling one frame at a time without ever blocking the relay loop

pub mod codec;
pub mod source;
