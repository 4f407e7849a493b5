use crate::identity::{
    IdentityStrategy,
    LocalUid,
};
use serde::{
    Deserialize,
    Serialize,
};

pub const DEFAULT_DISPLAY_NAME: &str = "You";

/// Everything needed for one join attempt. A new one is built for every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub join_code: String,
    pub display_name: String,
    pub local_uid: LocalUid,
}

impl SessionConfig {
    pub fn new<I>(join_code: impl ToString, display_name: impl ToString, identity: &mut I) -> Self
    where
        I: IdentityStrategy + ?Sized,
    {
        Self {
            join_code: join_code.to_string(),
            display_name: display_name.to_string(),
            local_uid: identity.next_uid(),
        }
    }

    pub fn has_join_code(&self) -> bool {
        !self.join_code.is_empty()
    }
}

/// Raw user input for a join: the code from the route, the code typed into the
/// form and the display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRequest {
    pub route_code: Option<String>,
    pub form_code: Option<String>,
    pub display_name: Option<String>,
}

impl JoinRequest {
    /// The form code wins over the route code. Blank names fall back to
    /// [`DEFAULT_DISPLAY_NAME`]. The join code may still be empty afterwards, the
    /// controller rejects it.
    pub fn resolve<I>(&self, identity: &mut I) -> SessionConfig
    where
        I: IdentityStrategy + ?Sized,
    {
        let join_code = non_blank(&self.form_code)
            .or_else(|| non_blank(&self.route_code))
            .unwrap_or_default();
        let display_name = non_blank(&self.display_name).unwrap_or(DEFAULT_DISPLAY_NAME);
        SessionConfig::new(join_code, display_name, identity)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FixedIdentity;
    use pretty_assertions::assert_eq;

    #[test]
    fn form_code_wins_over_route_code() {
        let request = JoinRequest {
            route_code: Some("ROUTE".to_string()),
            form_code: Some(" FORM ".to_string()),
            display_name: None,
        };
        let config = request.resolve(&mut FixedIdentity(LocalUid(42)));
        assert_eq!(
            config,
            SessionConfig {
                join_code: "FORM".to_string(),
                display_name: "You".to_string(),
                local_uid: LocalUid(42),
            }
        );
    }

    #[test]
    fn route_code_used_when_form_is_blank() {
        let request = JoinRequest {
            route_code: Some("ABC123".to_string()),
            form_code: Some("   ".to_string()),
            display_name: Some("Ada".to_string()),
        };
        let config = request.resolve(&mut FixedIdentity(LocalUid(1)));
        assert_eq!(config.join_code, "ABC123");
        assert_eq!(config.display_name, "Ada");
        assert!(config.has_join_code());
    }

    #[test]
    fn only_an_empty_code_is_missing() {
        let mut identity = FixedIdentity(LocalUid(1));
        assert!(!SessionConfig::new("", "You", &mut identity).has_join_code());
        assert!(SessionConfig::new("   ", "You", &mut identity).has_join_code());
    }

    #[test]
    fn missing_codes_resolve_to_empty() {
        let config = JoinRequest::default().resolve(&mut FixedIdentity(LocalUid(1)));
        assert!(!config.has_join_code());
    }
}
