//! # Joystick Event Codec
//!
//! Encodes and decodes the kernel joystick event frame (`struct js_event`).
//!
//! ## Frame Structure
//!
//! ```text
//! [Timestamp u32][Value i16][Type u8][Number u8]
//!     4 bytes       2 bytes    1 byte    1 byte
//! ```
//!
//! - **Timestamp**: event time in milliseconds (little-endian)
//! - **Value**: axis position `-32767..=32767`, or `0`/`1` for buttons
//! - **Type**: `0x01` button, `0x02` axis, optionally OR'ed with `0x80`
//!   when the kernel replays the initial state after open
//! - **Number**: axis or button index local to the source device

use bytes::{Buf, BufMut};

use crate::error::DecodeError;

/// Size of one `js_event` frame in bytes
pub const JS_EVENT_SIZE: usize = 8;

/// Button event type
pub const JS_EVENT_BUTTON: u8 = 0x01;

/// Axis event type
pub const JS_EVENT_AXIS: u8 = 0x02;

/// Synthetic "initial state" flag
pub const JS_EVENT_INIT: u8 = 0x80;

/// Lowest legal axis value
pub const AXIS_MIN: i16 = -32767;

/// Highest legal axis value
pub const AXIS_MAX: i16 = 32767;

/// Event classification after masking the init flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Button,
    Axis,
    /// Any other type byte; the relay ignores these
    Other(u8),
}

impl EventKind {
    fn from_type(raw: u8) -> Self {
        match raw & !JS_EVENT_INIT {
            JS_EVENT_BUTTON => EventKind::Button,
            JS_EVENT_AXIS => EventKind::Axis,
            other => EventKind::Other(other),
        }
    }

    fn to_type(self) -> u8 {
        match self {
            EventKind::Button => JS_EVENT_BUTTON,
            EventKind::Axis => JS_EVENT_AXIS,
            EventKind::Other(raw) => raw,
        }
    }
}

/// One decoded joystick event
///
/// `value` and `index` are passed through unvalidated; the router decides
/// whether an index is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAxisEvent {
    pub timestamp: u32,
    pub value: i16,
    pub kind: EventKind,
    pub index: u8,
    /// Set when the kernel synthesized this event to report initial state
    pub init: bool,
}

impl RawAxisEvent {
    /// Creates a live (non-init) axis event.
    #[must_use]
    pub fn axis(index: u8, value: i16) -> Self {
        Self {
            timestamp: 0,
            value,
            kind: EventKind::Axis,
            index,
            init: false,
        }
    }

    /// Creates a live (non-init) button event.
    #[must_use]
    pub fn button(index: u8, pressed: bool) -> Self {
        Self {
            timestamp: 0,
            value: i16::from(pressed),
            kind: EventKind::Button,
            index,
            init: false,
        }
    }
}

/// Decode one joystick event frame
///
/// # Arguments
///
/// * `frame` - Bytes read from the joystick node; only the first 8 are used
///
/// # Errors
///
/// Returns [`DecodeError::ShortRead`] if fewer than 8 bytes are available.
/// Callers treat this as "no complete event yet".
///
/// # Examples
///
/// ```
/// use pedal_relay::joystick::codec::{decode, EventKind};
///
/// let frame = [0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x82, 0x01];
/// let event = decode(&frame).unwrap();
/// assert_eq!(event.kind, EventKind::Axis);
/// assert_eq!(event.index, 1);
/// assert!(event.init);
/// ```
pub fn decode(frame: &[u8]) -> Result<RawAxisEvent, DecodeError> {
    if frame.len() < JS_EVENT_SIZE {
        return Err(DecodeError::ShortRead { len: frame.len() });
    }

    let mut buf = &frame[..JS_EVENT_SIZE];
    let timestamp = buf.get_u32_le();
    let value = buf.get_i16_le();
    let raw_type = buf.get_u8();
    let index = buf.get_u8();

    Ok(RawAxisEvent {
        timestamp,
        value,
        kind: EventKind::from_type(raw_type),
        index,
        init: raw_type & JS_EVENT_INIT != 0,
    })
}

/// Encode an event into a joystick frame
///
/// The inverse of [`decode`]. Used to replay captured input and to feed
/// synthetic sources.
#[must_use]
pub fn encode(event: &RawAxisEvent) -> [u8; JS_EVENT_SIZE] {
    let mut frame = [0u8; JS_EVENT_SIZE];
    let mut buf = &mut frame[..];

    let mut raw_type = event.kind.to_type();
    if event.init {
        raw_type |= JS_EVENT_INIT;
    }

    buf.put_u32_le(event.timestamp);
    buf.put_i16_le(event.value);
    buf.put_u8(raw_type);
    buf.put_u8(event.index);

    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_axis_frame() {
        // timestamp=0x01020304, value=-32767 (0x8001), type=axis, index=2
        let frame = [0x04, 0x03, 0x02, 0x01, 0x01, 0x80, 0x02, 0x02];
        let event = decode(&frame).unwrap();

        assert_eq!(event.timestamp, 0x0102_0304);
        assert_eq!(event.value, -32767);
        assert_eq!(event.kind, EventKind::Axis);
        assert_eq!(event.index, 2);
        assert!(!event.init);
    }

    #[test]
    fn test_decode_button_frame() {
        let frame = [0, 0, 0, 0, 0x01, 0x00, 0x01, 0x05];
        let event = decode(&frame).unwrap();

        assert_eq!(event.kind, EventKind::Button);
        assert_eq!(event.value, 1);
        assert_eq!(event.index, 5);
    }

    #[test]
    fn test_init_flag_is_masked() {
        let frame = [0, 0, 0, 0, 0x00, 0x40, JS_EVENT_AXIS | JS_EVENT_INIT, 0];
        let event = decode(&frame).unwrap();

        assert_eq!(event.kind, EventKind::Axis);
        assert!(event.init);
        assert_eq!(event.value, 0x4000);

        let frame = [0, 0, 0, 0, 0, 0, JS_EVENT_BUTTON | JS_EVENT_INIT, 3];
        assert_eq!(decode(&frame).unwrap().kind, EventKind::Button);
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let frame = [0, 0, 0, 0, 0, 0, 0x04, 0];
        assert_eq!(decode(&frame).unwrap().kind, EventKind::Other(0x04));
    }

    #[test]
    fn test_out_of_range_index_not_validated() {
        let frame = [0, 0, 0, 0, 0xFF, 0x7F, JS_EVENT_AXIS, 200];
        let event = decode(&frame).unwrap();
        assert_eq!(event.index, 200);
        assert_eq!(event.value, AXIS_MAX);
    }

    #[test]
    fn test_short_read() {
        assert_eq!(decode(&[]), Err(DecodeError::ShortRead { len: 0 }));
        assert_eq!(
            decode(&[1, 2, 3, 4, 5, 6, 7]),
            Err(DecodeError::ShortRead { len: 7 })
        );
    }

    #[test]
    fn test_extra_bytes_ignored() {
        let mut frame = encode(&RawAxisEvent::axis(1, 1234)).to_vec();
        frame.extend_from_slice(&[0xAA; 4]);
        let event = decode(&frame).unwrap();
        assert_eq!(event, RawAxisEvent::axis(1, 1234));
    }

    #[test]
    fn test_encode_layout() {
        let event = RawAxisEvent {
            timestamp: 1000,
            value: -1,
            kind: EventKind::Axis,
            index: 1,
            init: true,
        };
        let frame = encode(&event);
        assert_eq!(frame, [0xE8, 0x03, 0x00, 0x00, 0xFF, 0xFF, 0x82, 0x01]);
        assert_eq!(decode(&frame).unwrap(), event);
    }
}
