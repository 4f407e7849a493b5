use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumString,
};

/// Channel profile requested from the media provider when a session is created.
#[derive(Debug, Default, Clone, Copy, Display, EnumString, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Rtc,
    Live,
}

#[derive(Debug, Default, Clone, Copy, Display, EnumString, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CodecHint {
    #[default]
    H264,
    Vp8,
}

/// Which local capture tracks the local media handle is created with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaTracks {
    pub audio: bool,
    pub video: bool,
    pub screen: bool,
}

impl Default for MediaTracks {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
            screen: false,
        }
    }
}

impl MediaTracks {
    /// Tracks requested when subscribing to a remote stream.
    pub const fn remote() -> Self {
        Self {
            audio: true,
            video: true,
            screen: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn parse_lowercase_names() {
        assert_eq!(SessionMode::from_str("live").unwrap(), SessionMode::Live);
        assert_eq!(CodecHint::from_str("vp8").unwrap(), CodecHint::Vp8);
        assert_eq!(CodecHint::default().to_string(), "h264");
        assert!(SessionMode::from_str("broadcast").is_err());
    }
}
