use base64::{
    engine::general_purpose::STANDARD,
    Engine as _,
};
use derive_more::Display;
use eyre::{
    Context as _,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Free text describing the meeting, passed base64 encoded next to the join code.
#[derive(Debug, Display, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingDetails(String);

impl MeetingDetails {
    /// A missing parameter yields empty details.
    pub fn decode(encoded: Option<&str>) -> Result<Self> {
        let Some(encoded) = encoded.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(Self::default());
        };
        let bytes = STANDARD
            .decode(encoded)
            .context("meeting details are not valid base64")?;
        let text = String::from_utf8(bytes).context("meeting details are not valid utf-8")?;
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_details() {
        let details = MeetingDetails::decode(Some("V2Vla2x5IHN5bmM=")).unwrap();
        assert_eq!(details.as_str(), "Weekly sync");
    }

    #[test]
    fn missing_details_are_empty() {
        assert!(MeetingDetails::decode(None).unwrap().is_empty());
        assert!(MeetingDetails::decode(Some("")).unwrap().is_empty());
    }

    #[test]
    fn malformed_details_are_rejected() {
        assert!(MeetingDetails::decode(Some("not base64!")).is_err());
    }
}
