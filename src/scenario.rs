use conference_session::{
    events::MediaPermission,
    simulated::SimulatedBehavior,
    ProviderEvent,
};
use eyre::{
    Context as _,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Join again with a freshly generated uid.
    Join,
    Leave,
    ToggleAudio,
    ToggleVideo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioAction {
    User { action: UserAction },
    Provider(ProviderEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Delay relative to the previous step.
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBehavior {
    #[serde(default)]
    pub media_permission: Option<MediaPermission>,
    #[serde(default)]
    pub confirm_join: Option<bool>,
    #[serde(default)]
    pub confirm_subscriptions: Option<bool>,
}

impl From<&ProviderBehavior> for SimulatedBehavior {
    fn from(behavior: &ProviderBehavior) -> Self {
        let defaults = SimulatedBehavior::default();
        Self {
            media_permission: behavior.media_permission.unwrap_or(defaults.media_permission),
            confirm_join: behavior.confirm_join.unwrap_or(defaults.confirm_join),
            confirm_subscriptions: behavior
                .confirm_subscriptions
                .unwrap_or(defaults.confirm_subscriptions),
        }
    }
}

/// Scripted run: what the user typed into the join form and what the remote
/// side does afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Join code typed into the form, wins over `--join-code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Base64 encoded meeting details, used when `--details` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub provider: ProviderBehavior,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
    /// How long to keep the session after the last step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
}

impl Scenario {
    /// One remote peer shows up right after joining.
    pub fn single_peer() -> Self {
        Self {
            steps: vec![ScenarioStep {
                after_ms: 0,
                action: ScenarioAction::Provider(ProviderEvent::RemoteStreamAdded { peer: 1u64.into() }),
            }],
            ..Default::default()
        }
    }
}

pub fn parse_scenario(path: &Path) -> Result<Scenario> {
    let content = std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read scenario {path:?}"))?;
    serde_yml::from_str::<Scenario>(&content).wrap_err_with(|| format!("Failed to parse scenario {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conference_session::events::ProviderErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_mixed_steps() {
        let scenario: Scenario = serde_yml::from_str(
            r#"
join_code: ABC123
provider:
  media_permission: denied
steps:
  - event: remote_stream_added
    peer: 1
  - after_ms: 1500
    action: toggle_audio
  - after_ms: 100
    event: error
    kind: DYNAMIC_KEY_TIMEOUT
  - action: leave
"#,
        )
        .unwrap();

        assert_eq!(scenario.join_code.as_deref(), Some("ABC123"));
        assert_eq!(
            SimulatedBehavior::from(&scenario.provider).media_permission,
            MediaPermission::Denied
        );
        assert_eq!(
            scenario.steps,
            vec![
                ScenarioStep {
                    after_ms: 0,
                    action: ScenarioAction::Provider(ProviderEvent::RemoteStreamAdded { peer: 1u64.into() }),
                },
                ScenarioStep {
                    after_ms: 1500,
                    action: ScenarioAction::User {
                        action: UserAction::ToggleAudio
                    },
                },
                ScenarioStep {
                    after_ms: 100,
                    action: ScenarioAction::Provider(ProviderEvent::Error {
                        kind: ProviderErrorKind::DynamicKeyTimeout
                    }),
                },
                ScenarioStep {
                    after_ms: 0,
                    action: ScenarioAction::User {
                        action: UserAction::Leave
                    },
                },
            ]
        );
    }

    #[test]
    fn empty_scenario_uses_defaults() {
        let scenario: Scenario = serde_yml::from_str("{}").unwrap();
        assert_eq!(scenario, Scenario::default());
        assert_eq!(SimulatedBehavior::from(&scenario.provider), SimulatedBehavior::default());
    }
}
