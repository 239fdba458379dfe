use std::str::FromStr;

pub const LED_PAYLOAD_LEN: usize = 4;

const LED_MODE_CONSTANT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedStatus {
    Connected,
    Recording,
}

impl LedStatus {
    fn color(&self) -> (u8, u8, u8) {
        match self {
            LedStatus::Connected => (0, 255, 0),
            LedStatus::Recording => (255, 0, 0),
        }
    }

    pub fn encode(&self) -> [u8; LED_PAYLOAD_LEN] {
        let (r, g, b) = self.color();
        [LED_MODE_CONSTANT, r, g, b]
    }
}

impl FromStr for LedStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(LedStatus::Connected),
            "recording" => Ok(LedStatus::Recording),
            _ => Err(()),
        }
    }
}

/// Returns `None` for statuses that have no LED representation, in which
/// case nothing should be written to the peripheral.
pub fn encode_led_status(status: &str) -> Option<[u8; LED_PAYLOAD_LEN]> {
    status.parse::<LedStatus>().ok().map(|status| status.encode())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_known_statuses() {
        assert_eq!(encode_led_status("connected"), Some([0x01, 0x00, 0xff, 0x00]));
        assert_eq!(encode_led_status("recording"), Some([0x01, 0xff, 0x00, 0x00]));
    }

    #[test]
    fn test_unknown_status_is_noop() {
        assert_eq!(encode_led_status("unknown"), None);
        assert_eq!(encode_led_status(""), None);
        assert_eq!(encode_led_status("Connected"), None);
    }
}
