//! # Axis Router
//!
//! Maps a source device's local axis number to an output axis.
//!
//! | Role | Local axis | Output |
//! |------|------------|--------|
//! | Wheelbase | 0 | Steering |
//! | Pedals | 0 | Gas |
//! | Pedals | 1 | Brake |
//! | Pedals | 2 | Clutch |
//!
//! Tables are fixed per role. Any other index routes to `None` and the event
//! is dropped.

use std::fmt;

use crate::device::OutputAxis;

const WHEELBASE_ROUTES: &[OutputAxis] = &[OutputAxis::Steering];

const PEDAL_ROUTES: &[OutputAxis] = &[OutputAxis::Gas, OutputAxis::Brake, OutputAxis::Clutch];

/// Role of a source device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRole {
    Wheelbase,
    Pedals,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRole::Wheelbase => f.write_str("wheelbase"),
            SourceRole::Pedals => f.write_str("pedals"),
        }
    }
}

/// Static routing table for one source device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRouter {
    role: SourceRole,
}

impl AxisRouter {
    #[must_use]
    pub fn new(role: SourceRole) -> Self {
        Self { role }
    }

    pub fn role(&self) -> SourceRole {
        self.role
    }

    /// Output axis for `local_index`, or `None` if unrouted
    #[must_use]
    pub fn route(&self, local_index: u8) -> Option<OutputAxis> {
        route(self.role, local_index)
    }
}

/// Pure lookup against the fixed per-role tables
///
/// # Examples
///
/// ```
/// use pedal_relay::device::OutputAxis;
/// use pedal_relay::relay::router::{route, SourceRole};
///
/// assert_eq!(route(SourceRole::Pedals, 1), Some(OutputAxis::Brake));
/// assert_eq!(route(SourceRole::Wheelbase, 1), None);
/// ```
#[must_use]
pub fn route(role: SourceRole, local_index: u8) -> Option<OutputAxis> {
    let table = match role {
        SourceRole::Wheelbase => WHEELBASE_ROUTES,
        SourceRole::Pedals => PEDAL_ROUTES,
    };
    table.get(usize::from(local_index)).copied()
}
