use std::fmt;

/// A RAMSES-II device address in `TT:DDDDDD` form.
///
/// The type field is two decimal digits, the unit id six. The address
/// `--:------` is the unset/broadcast sentinel ([`Address::UNSET`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub dev_type: u8,
    pub dev_id: u32,
}

impl Address {
    /// The `--:------` sentinel used as the destination of broadcasts.
    pub const UNSET: Address = Address {
        dev_type: 0xFF,
        dev_id: 0x00FF_FFFF,
    };

    pub const UNSET_TOKEN: &'static str = "--:------";

    pub fn new(dev_type: u8, dev_id: u32) -> Option<Self> {
        if dev_type > 99 || dev_id > 999_999 {
            return None;
        }
        Some(Self { dev_type, dev_id })
    }

    /// Parse a `TT:DDDDDD` token; `--:------` yields [`Address::UNSET`].
    pub fn parse(token: &str) -> Option<Self> {
        if token == Self::UNSET_TOKEN {
            return Some(Self::UNSET);
        }
        let (dev_type, dev_id) = token.split_once(':')?;
        if dev_type.len() != 2 || dev_id.len() != 6 {
            return None;
        }
        let dev_type = dev_type.parse::<u8>().ok()?;
        let dev_id = dev_id.parse::<u32>().ok()?;
        Self::new(dev_type, dev_id)
    }

    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    /// Pack to the 4-byte form used by the frame checksum: type, id be24.
    pub fn packed(&self) -> [u8; 4] {
        let id = self.dev_id.to_be_bytes();
        [self.dev_type, id[1], id[2], id[3]]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            write!(f, "{}", Self::UNSET_TOKEN)
        } else {
            write!(f, "{:02}:{:06}", self.dev_type, self.dev_id)
        }
    }
}

/// Closed set of device classes, inferred from the address type prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceClass {
    Controller,
    UfhController,
    Radiator,
    DhwSensor,
    OtBridge,
    Relay,
    Gateway,
    Programmer,
    Ventilation,
    Thermostat,
    Unknown,
}

impl DeviceClass {
    /// Pure classification over the address type prefix; no runtime
    /// inspection of traffic is involved.
    pub fn from_address(addr: &Address) -> Self {
        match addr.dev_type {
            1 => Self::Controller,
            2 => Self::UfhController,
            4 => Self::Radiator,
            7 => Self::DhwSensor,
            10 => Self::OtBridge,
            13 => Self::Relay,
            18 => Self::Gateway,
            23 => Self::Programmer,
            30 => Self::Ventilation,
            3 | 12 | 22 | 34 => Self::Thermostat,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::UfhController => "ufh_controller",
            Self::Radiator => "radiator_actuator",
            Self::DhwSensor => "dhw_sensor",
            Self::OtBridge => "ot_bridge",
            Self::Relay => "relay",
            Self::Gateway => "gateway",
            Self::Programmer => "programmer",
            Self::Ventilation => "ventilation",
            Self::Thermostat => "thermostat",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::{Address, DeviceClass};

    #[test]
    fn parse_and_display_round_trip() {
        let addr = Address::parse("01:123456").unwrap();
        assert_eq!(addr.dev_type, 1);
        assert_eq!(addr.dev_id, 123_456);
        assert_eq!(addr.to_string(), "01:123456");
    }

    #[test]
    fn parse_unset_sentinel() {
        let addr = Address::parse("--:------").unwrap();
        assert!(addr.is_unset());
        assert_eq!(addr.to_string(), "--:------");
    }

    #[test]
    fn parse_rejects_bad_tokens() {
        assert!(Address::parse("1:123456").is_none());
        assert!(Address::parse("01:12345").is_none());
        assert!(Address::parse("01-123456").is_none());
        assert!(Address::parse("xx:123456").is_none());
        assert!(Address::parse("01:1234567").is_none());
    }

    #[test]
    fn packed_is_type_then_be24_id() {
        let addr = Address::parse("04:654321").unwrap();
        assert_eq!(addr.packed(), [0x04, 0x09, 0xFB, 0xF1]);
    }

    #[test]
    fn classify_known_prefixes() {
        let ctl = Address::parse("01:145038").unwrap();
        assert_eq!(DeviceClass::from_address(&ctl), DeviceClass::Controller);
        let trv = Address::parse("04:654321").unwrap();
        assert_eq!(DeviceClass::from_address(&trv), DeviceClass::Radiator);
        let relay = Address::parse("13:049798").unwrap();
        assert_eq!(DeviceClass::from_address(&relay), DeviceClass::Relay);
        let odd = Address::parse("99:000001").unwrap();
        assert_eq!(DeviceClass::from_address(&odd), DeviceClass::Unknown);
    }
}
