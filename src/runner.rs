use crate::scenario::{
    parse_scenario,
    Scenario,
    ScenarioAction,
    UserAction,
};
use conference_config::{
    identity::identity_from_seed,
    Args,
    Config,
    JoinRequest,
    MeetingDetails,
    SessionConfig,
};
use conference_session::{
    call::messages::CallLogMessage,
    simulated::{
        SimulatedBehavior,
        SimulatedProvider,
    },
    CallSession,
    ControllerSettings,
    SessionSnapshot,
};
use eyre::{
    eyre,
    Context as _,
    Result,
};
use serde::Serialize;
use std::time::Duration;
use tokio::time::{
    sleep,
    timeout,
};

/// Grace added on top of the playback delay before the final snapshot.
const SETTLE_MARGIN: Duration = Duration::from_millis(100);
/// How long a join may take until the provider session exists.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub snapshot: SessionSnapshot,
    pub details: MeetingDetails,
    pub messages: Vec<CallLogMessage>,
}

pub async fn run(config: &Config, args: &Args) -> Result<RunOutcome> {
    let scenario = match &args.scenario {
        Some(path) => parse_scenario(path)?,
        None => Scenario::single_peer(),
    };
    run_scenario(config, args, scenario).await
}

#[instrument(level = "debug", skip_all)]
pub async fn run_scenario(config: &Config, args: &Args, scenario: Scenario) -> Result<RunOutcome> {
    let details = MeetingDetails::decode(args.details.as_deref().or(scenario.details.as_deref()))
        .context("Failed to read the meeting details")?;
    if !details.is_empty() {
        info!(%details, "Meeting details");
    }

    let mut identity = identity_from_seed(args.seed);
    let request = JoinRequest {
        route_code: args.join_code.clone(),
        form_code: scenario.join_code.clone(),
        display_name: args.name.clone().or_else(|| scenario.name.clone()),
    };
    let session_config = request.resolve(identity.as_mut());

    let provider = SimulatedProvider::new(SimulatedBehavior::from(&scenario.provider));
    let remote = provider.remote();
    let (mut session, mut logs) = CallSession::spawn(
        &session_config.display_name,
        ControllerSettings::from(config),
        provider,
        details.clone(),
    );
    let log_task = tokio::spawn(async move {
        let mut messages = Vec::new();
        while let Some(message) = logs.recv().await {
            messages.push(message);
        }
        messages
    });

    session.wait_for(|s| s.running).await?;
    join(&mut session, session_config).await?;

    for (index, step) in scenario.steps.iter().enumerate() {
        sleep(Duration::from_millis(step.after_ms)).await;
        debug!(index, action = ?step.action, "Replaying scenario step");
        match &step.action {
            ScenarioAction::User { action } => match action {
                UserAction::Join => {
                    if let Err(err) = join(&mut session, request.resolve(identity.as_mut())).await {
                        warn!(index, "Scenario join had no effect: {err}");
                    }
                }
                UserAction::Leave => session.leave(),
                UserAction::ToggleAudio => session.toggle_audio(),
                UserAction::ToggleVideo => session.toggle_video(),
            },
            ScenarioAction::Provider(event) => {
                if !remote.emit(event.clone()) {
                    warn!(index, %event, "Scenario event could not be delivered");
                }
            }
        }
    }

    let settle = scenario
        .settle_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.playback_delay() + SETTLE_MARGIN);
    sleep(settle).await;

    let snapshot = session.snapshot();
    info!(state = %snapshot.state, admitted = snapshot.admitted.len(), "Scenario finished");
    session.close().await;
    let messages = log_task.await?;

    Ok(RunOutcome {
        snapshot,
        details,
        messages,
    })
}

/// Joins and waits until the worker created the provider session, so remote
/// events replayed afterwards have a session to land in.
async fn join(session: &mut CallSession, config: SessionConfig) -> Result<()> {
    let before = session.snapshot().generation;
    session.join(config)?;
    timeout(
        JOIN_TIMEOUT,
        session.wait_for(|s| s.generation > before && s.joined == Some(true)),
    )
    .await
    .map_err(|_| eyre!("The call session did not start joining"))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conference_session::{
        ParticipantId,
        SessionState,
    };
    use pretty_assertions::assert_eq;

    fn args(join_code: &str) -> Args {
        Args {
            join_code: Some(join_code.to_string()),
            seed: Some(1),
            ..Default::default()
        }
    }

    fn scenario(yaml: &str) -> Scenario {
        serde_yml::from_str(yaml).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn single_peer_is_admitted() {
        let outcome = run_scenario(&Config::default(), &args("ABC123"), Scenario::single_peer())
            .await
            .unwrap();
        let snapshot = outcome.snapshot;
        assert_eq!(snapshot.state, SessionState::SinglePeerLocked);
        assert_eq!(snapshot.admitted, vec![ParticipantId::from(1u64)]);
        assert_eq!(snapshot.display_name, "You");
        assert!(!snapshot.flags.waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn second_peer_reports_ongoing_meeting() {
        let outcome = run_scenario(
            &Config::default(),
            &args("ABC123"),
            scenario(
                r#"
steps:
  - event: remote_stream_added
    peer: 1
  - after_ms: 10
    event: remote_stream_added
    peer: 2
"#,
            ),
        )
        .await
        .unwrap();
        assert_eq!(outcome.snapshot.state, SessionState::Idle);
        assert_eq!(outcome.snapshot.flags.ongoing_meeting, Some(true));
        assert!(outcome.messages.iter().any(|m| m.level == "warn"));
    }

    #[tokio::test(start_paused = true)]
    async fn first_step_reaches_the_new_session() {
        let outcome = run_scenario(
            &Config::default(),
            &args("ABC123"),
            scenario(
                r#"
settle_ms: 10
steps:
  - event: remote_stream_added
    peer: 7
"#,
            ),
        )
        .await
        .unwrap();
        assert_eq!(outcome.snapshot.admitted, vec![ParticipantId::from(7u64)]);
        assert!(!outcome.messages.iter().any(|m| m.level == "warn"));
    }

    #[tokio::test(start_paused = true)]
    async fn rejoin_step_starts_a_fresh_session() {
        let outcome = run_scenario(
            &Config::default(),
            &args("ABC123"),
            scenario(
                r#"
steps:
  - event: remote_stream_added
    peer: 1
  - after_ms: 10
    action: leave
  - action: join
  - event: remote_stream_added
    peer: 2
"#,
            ),
        )
        .await
        .unwrap();
        assert_eq!(outcome.snapshot.state, SessionState::SinglePeerLocked);
        assert_eq!(outcome.snapshot.admitted, vec![ParticipantId::from(2u64)]);
        assert_eq!(outcome.snapshot.generation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn details_are_decoded() {
        let args = Args {
            details: Some("V2Vla2x5IHN5bmM=".to_string()),
            ..args("ABC123")
        };
        let outcome = run_scenario(&Config::default(), &args, Scenario::default())
            .await
            .unwrap();
        assert_eq!(outcome.details.as_str(), "Weekly sync");
        assert_eq!(outcome.snapshot.state, SessionState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_join_code_fails() {
        let result = run_scenario(&Config::default(), &Args::default(), Scenario::default()).await;
        assert!(result.is_err());
    }
}
