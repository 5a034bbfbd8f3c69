//! Privilege levels.

use std::fmt;

/// The current privilege level of the hart.
///
/// Encoded per the privileged spec: User=0b00, Supervisor=0b01, Machine=0b11
/// (the reserved Hypervisor encoding 0b10 is never produced by this core).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrivilegeMode {
    /// User mode (0b00).
    User = 0b00,
    /// Supervisor mode (0b01).
    Supervisor = 0b01,
    /// Machine mode (0b11).
    Machine = 0b11,
}

impl PrivilegeMode {
    /// Decodes a 2-bit privilege encoding. Returns `Machine` for the
    /// reserved `0b10` encoding, matching hardware that treats it as M-mode.
    #[must_use]
    pub fn from_u8(val: u8) -> Self {
        match val & 0b11 {
            0b00 => PrivilegeMode::User,
            0b01 => PrivilegeMode::Supervisor,
            _ => PrivilegeMode::Machine,
        }
    }

    /// Returns the 2-bit hardware encoding of this privilege level.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PrivilegeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrivilegeMode::User => "U",
            PrivilegeMode::Supervisor => "S",
            PrivilegeMode::Machine => "M",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        for mode in [
            PrivilegeMode::User,
            PrivilegeMode::Supervisor,
            PrivilegeMode::Machine,
        ] {
            assert_eq!(PrivilegeMode::from_u8(mode.to_u8()), mode);
        }
    }

    #[test]
    fn ordering_matches_privilege_level() {
        assert!(PrivilegeMode::User < PrivilegeMode::Supervisor);
        assert!(PrivilegeMode::Supervisor < PrivilegeMode::Machine);
    }
}
