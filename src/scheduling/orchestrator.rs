//! Drives one submission end to end.
//!
//! Per submission the flow is: validate the form into a `MeetingRequest`,
//! create the calendar event (mandatory), then create the deal activity or
//! to-do (only when a deal was resolved). The calendar call always comes
//! first; if it fails the activity is never attempted. Nothing is retried
//! and nothing is rolled back: a calendar event that was created before a
//! later failure stays in the portal and the user re-submits or reconciles
//! by hand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::bitrix::{Bridge, methods};
use crate::core::config::{ActivityKind, FormVariant, TimeInputMode, TimeWireFormat};
use crate::core::error::ScheduleError;
use crate::scheduling::deal::{self, DealId};
use crate::scheduling::time::{self, TimeWindow};

pub type UserId = u64;

/// Raw form fields as the embedded page submits them. Everything is
/// optional at the wire level; what is actually required depends on the
/// configured `FormVariant` and is enforced during validation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormValues {
    /// Meeting type from the select ("R1", "R2", "RA", ...). Drives the subject.
    pub kind: Option<String>,
    /// Combined `datetime-local` value, for `TimeInputMode::Combined`.
    pub datetime: Option<String>,
    /// Separate date and time-of-day, for `TimeInputMode::Split`.
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration: Option<String>,
    /// Explicitly typed deal id.
    pub deal_id: Option<String>,
    /// Pasted deal card URL.
    pub deal_link: Option<String>,
    /// Placement options forwarded by the embedding frame.
    pub placement: Option<Map<String, Value>>,
    pub client_email: Option<String>,
    pub meet_link: Option<String>,
    pub notes: Option<String>,
}

/// What one submission amounted to. Drives the status line in the form.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome {
    /// Calendar event created; no deal reference was resolved so no CRM
    /// activity was attempted. Valid, not an error.
    CalendarOnly,
    /// Calendar event created and an activity filed on the deal.
    CalendarAndActivity { deal_id: DealId },
    Failed { message: String },
}

/// A validated submission, built once per click and discarded after the
/// remote calls complete or fail.
#[derive(Clone, Debug)]
pub struct MeetingRequest {
    pub subject: String,
    pub window: TimeWindow,
    pub description: String,
    pub deal: Option<DealId>,
    pub owner_id: Option<UserId>,
}

/// Owns the per-page state: the bridge to the portal, the variant
/// configuration, the acting user resolved at host-ready time, and the
/// in-flight latch that keeps a double-click from racing two submissions.
pub struct Orchestrator {
    bridge: Arc<dyn Bridge>,
    variant: FormVariant,
    current_user: RwLock<Option<UserId>>,
    in_flight: AtomicBool,
}

impl Orchestrator {
    pub fn new(bridge: Arc<dyn Bridge>, variant: FormVariant) -> Self {
        Self {
            bridge,
            variant,
            current_user: RwLock::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn variant(&self) -> FormVariant {
        self.variant
    }

    pub fn current_user(&self) -> Option<UserId> {
        *self.current_user.read().unwrap()
    }

    /// Record the acting user once the host session is known.
    pub fn host_ready(&self, user_id: UserId) {
        *self.current_user.write().unwrap() = Some(user_id);
    }

    /// Resolve the acting user through `user.current` and cache it. Safe to
    /// call repeatedly; the portal is only asked while the id is unknown.
    pub async fn connect(&self) -> Result<UserId, ScheduleError> {
        if let Some(id) = self.current_user() {
            return Ok(id);
        }

        let data = self.bridge.invoke(methods::USER_CURRENT, json!({})).await?;
        // Portals disagree on the casing of the id field
        let id = ["ID", "Id", "id"]
            .iter()
            .find_map(|key| data.get(*key).and_then(user_id_value))
            .ok_or_else(|| ScheduleError::RemoteCall {
                method: methods::USER_CURRENT.to_string(),
                message: "response is missing the user id".to_string(),
            })?;

        self.host_ready(id);
        tracing::info!(user_id = id, "resolved acting user");
        Ok(id)
    }

    /// The form's single entry point. Never panics and never leaks an `Err`:
    /// every failure becomes `OperationOutcome::Failed` with the message the
    /// status line shows verbatim.
    pub async fn handle_submit(&self, values: &FormValues) -> OperationOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return OperationOutcome::Failed {
                message: ScheduleError::Busy.to_string(),
            };
        }

        // Released on drop, so even a panic below cannot leave the latch
        // set and refuse every later submission
        let _guard = InFlightGuard(&self.in_flight);

        match self.run(values).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("submission failed: {}", e);
                OperationOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn run(&self, values: &FormValues) -> Result<OperationOutcome, ScheduleError> {
        let request = self.validate(values)?;
        let (from, to) = match self.variant.time_wire_format {
            TimeWireFormat::Local => request.window.local_format(),
            TimeWireFormat::Instant => request.window.instant_format(),
        };

        tracing::info!(subject = %request.subject, %from, %to, "creating calendar event");
        self.bridge
            .invoke(
                methods::CALENDAR_EVENT_ADD,
                methods::calendar_event_add(
                    request.owner_id,
                    &request.subject,
                    &from,
                    &to,
                    &request.description,
                ),
            )
            .await?;

        let Some(deal_id) = request.deal else {
            tracing::info!("no deal reference resolved, skipping the CRM activity");
            return Ok(OperationOutcome::CalendarOnly);
        };

        tracing::info!(deal_id, "filing activity on the deal");
        let (method, params) = match self.variant.activity_kind {
            ActivityKind::Meeting => (
                methods::CRM_ACTIVITY_ADD,
                methods::activity_add(deal_id, &request.subject, &from, &to, &request.description),
            ),
            ActivityKind::Todo => (
                methods::CRM_ACTIVITY_TODO_ADD,
                methods::todo_add(deal_id, &request.subject, &from, &request.description),
            ),
        };
        self.bridge.invoke(method, params).await?;

        self.log_client_invite(deal_id, values).await;

        Ok(OperationOutcome::CalendarAndActivity { deal_id })
    }

    /// Fail fast on anything wrong with the input, before the portal is
    /// touched at all.
    fn validate(&self, values: &FormValues) -> Result<MeetingRequest, ScheduleError> {
        let owner_id = if self.variant.requires_owner_id {
            Some(self.current_user().ok_or(ScheduleError::HostNotReady)?)
        } else {
            None
        };

        let duration = values.duration.as_deref();
        let window = match self.variant.time_input_mode {
            TimeInputMode::Combined => {
                let datetime = values
                    .datetime
                    .as_deref()
                    .ok_or_else(|| ScheduleError::Validation("fill in the date and time".to_string()))?;
                time::combined_window(datetime, duration)?
            }
            TimeInputMode::Split => {
                let date = values.date.as_deref().unwrap_or("");
                let tod = values.time.as_deref().unwrap_or("");
                time::split_window(date, tod, duration)?
            }
        };

        let explicit_id = if self.variant.allows_explicit_deal_id {
            values.deal_id.as_deref()
        } else {
            None
        };
        let deal = deal::resolve(explicit_id, values.deal_link.as_deref(), values.placement.as_ref());

        let kind = values.kind.as_deref().map(str::trim).filter(|k| !k.is_empty());
        let subject = format!("{} - Meeting", kind.unwrap_or("R1"));

        Ok(MeetingRequest {
            subject,
            window,
            description: description_text(values),
            deal,
            owner_id,
        })
    }

    /// Best-effort note recording the client invite address on the deal
    /// timeline. Only runs once the event and the activity both exist; its
    /// own failure is logged, not surfaced, since the meeting is booked.
    async fn log_client_invite(&self, deal_id: DealId, values: &FormValues) {
        let Some(email) = trimmed(values.client_email.as_deref()) else {
            return;
        };

        let params = methods::client_invite_note(deal_id, email, trimmed(values.meet_link.as_deref()));
        if let Err(e) = self.bridge.invoke(methods::CRM_ACTIVITY_ADD, params).await {
            tracing::warn!(deal_id, "could not record the client invite: {}", e);
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn description_text(values: &FormValues) -> String {
    let mut parts = Vec::new();
    if let Some(meet) = trimmed(values.meet_link.as_deref()) {
        parts.push(format!("Meet: {}", meet));
    }
    if let Some(email) = trimmed(values.client_email.as_deref()) {
        parts.push(format!("Client: {}", email));
    }
    if let Some(notes) = trimmed(values.notes.as_deref()) {
        parts.push(format!("Notes: {}", notes));
    }
    parts.join("\n")
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn user_id_value(value: &Value) -> Option<UserId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    /// Records every invocation and can be told to fail specific methods or
    /// to hold each call open for a while.
    #[derive(Default)]
    struct StubBridge {
        calls: Mutex<Vec<(String, Value)>>,
        fail_methods: Vec<&'static str>,
        delay: Option<Duration>,
    }

    impl StubBridge {
        fn failing(methods: Vec<&'static str>) -> Self {
            Self {
                fail_methods: methods,
                ..Default::default()
            }
        }

        fn methods_called(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(m, _)| m.clone())
                .collect()
        }

        fn params_for(&self, method: &str) -> Option<Value> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(m, _)| m == method)
                .map(|(_, p)| p.clone())
        }
    }

    #[async_trait]
    impl Bridge for StubBridge {
        async fn invoke(&self, method: &str, params: Value) -> Result<Value, ScheduleError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params));
            if self.fail_methods.contains(&method) {
                return Err(ScheduleError::RemoteCall {
                    method: method.to_string(),
                    message: "stubbed failure".to_string(),
                });
            }
            Ok(json!({"id": 1}))
        }
    }

    fn orchestrator(bridge: StubBridge, variant: FormVariant) -> (Arc<StubBridge>, Orchestrator) {
        let bridge = Arc::new(bridge);
        let orchestrator = Orchestrator::new(bridge.clone(), variant);
        orchestrator.host_ready(1);
        (bridge, orchestrator)
    }

    fn classic_values() -> FormValues {
        FormValues {
            kind: Some("R1".to_string()),
            datetime: Some("2024-06-10T14:00".to_string()),
            duration: Some("30".to_string()),
            deal_link: Some("https://acme.bitrix24.com/crm/deal/details/777/".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn calendar_call_always_precedes_the_activity_call() {
        let (bridge, orchestrator) = orchestrator(StubBridge::default(), FormVariant::classic());

        let outcome = orchestrator.handle_submit(&classic_values()).await;

        assert_eq!(outcome, OperationOutcome::CalendarAndActivity { deal_id: 777 });
        assert_eq!(
            bridge.methods_called(),
            vec!["calendar.event.add", "crm.activity.add"]
        );
    }

    #[tokio::test]
    async fn end_to_end_scenario_r1_at_14h_for_30_minutes() {
        let (bridge, orchestrator) = orchestrator(StubBridge::default(), FormVariant::classic());

        let outcome = orchestrator.handle_submit(&classic_values()).await;
        assert_eq!(outcome, OperationOutcome::CalendarAndActivity { deal_id: 777 });

        let event = bridge.params_for("calendar.event.add").unwrap();
        assert_eq!(event["name"], "R1 - Meeting");
        assert_eq!(event["from"], "2024-06-10 14:00:00");
        assert_eq!(event["to"], "2024-06-10 14:30:00");
        assert_eq!(event["ownerId"], "1");

        let activity = bridge.params_for("crm.activity.add").unwrap();
        assert_eq!(activity["fields"]["OWNER_ID"], 777);
        assert_eq!(activity["fields"]["START_TIME"], "2024-06-10 14:00:00");
        assert_eq!(activity["fields"]["END_TIME"], "2024-06-10 14:30:00");
    }

    #[tokio::test]
    async fn calendar_failure_aborts_before_the_activity() {
        let (bridge, orchestrator) = orchestrator(
            StubBridge::failing(vec!["calendar.event.add"]),
            FormVariant::classic(),
        );

        let outcome = orchestrator.handle_submit(&classic_values()).await;

        assert!(matches!(outcome, OperationOutcome::Failed { .. }));
        assert_eq!(bridge.methods_called(), vec!["calendar.event.add"]);
    }

    #[tokio::test]
    async fn activity_failure_surfaces_when_a_deal_was_resolved() {
        let (_, orchestrator) = orchestrator(
            StubBridge::failing(vec!["crm.activity.add"]),
            FormVariant::classic(),
        );

        let outcome = orchestrator.handle_submit(&classic_values()).await;
        match outcome {
            OperationOutcome::Failed { message } => {
                assert!(message.contains("crm.activity.add"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn without_a_deal_the_activity_is_never_attempted() {
        // The activity stub is set to fail, but it must not matter
        let (bridge, orchestrator) = orchestrator(
            StubBridge::failing(vec!["crm.activity.add"]),
            FormVariant::classic(),
        );

        let values = FormValues {
            deal_link: None,
            ..classic_values()
        };
        let outcome = orchestrator.handle_submit(&values).await;

        assert_eq!(outcome, OperationOutcome::CalendarOnly);
        assert_eq!(bridge.methods_called(), vec!["calendar.event.add"]);
    }

    #[tokio::test]
    async fn missing_start_time_makes_no_remote_calls() {
        let (bridge, orchestrator) = orchestrator(StubBridge::default(), FormVariant::classic());

        let values = FormValues {
            datetime: None,
            ..classic_values()
        };
        let outcome = orchestrator.handle_submit(&values).await;

        assert!(matches!(outcome, OperationOutcome::Failed { .. }));
        assert!(bridge.methods_called().is_empty());
    }

    #[tokio::test]
    async fn owner_variant_refuses_to_submit_before_host_ready() {
        let bridge = Arc::new(StubBridge::default());
        let orchestrator = Orchestrator::new(bridge.clone(), FormVariant::classic());
        // No host_ready call

        let outcome = orchestrator.handle_submit(&classic_values()).await;

        assert_eq!(
            outcome,
            OperationOutcome::Failed {
                message: ScheduleError::HostNotReady.to_string()
            }
        );
        assert!(bridge.methods_called().is_empty());
    }

    #[tokio::test]
    async fn placement_variant_ignores_the_explicit_id() {
        let (bridge, orchestrator) = orchestrator(StubBridge::default(), FormVariant::placement());

        let placement = json!({"ENTITY_ID": "55"});
        let values = FormValues {
            deal_id: Some("500".to_string()),
            deal_link: None,
            placement: placement.as_object().cloned(),
            ..classic_values()
        };
        let outcome = orchestrator.handle_submit(&values).await;

        assert_eq!(outcome, OperationOutcome::CalendarAndActivity { deal_id: 55 });
        // Instant wire format for this variant
        let event = bridge.params_for("calendar.event.add").unwrap();
        assert_eq!(event["from"], "2024-06-10T14:00:00Z");
        assert!(event.get("ownerId").is_none());
    }

    #[tokio::test]
    async fn grid_variant_snaps_and_files_a_todo() {
        let (bridge, orchestrator) = orchestrator(StubBridge::default(), FormVariant::grid());

        let values = FormValues {
            datetime: None,
            date: Some("2024-06-10".to_string()),
            time: Some("14:07".to_string()),
            ..classic_values()
        };
        let outcome = orchestrator.handle_submit(&values).await;

        assert_eq!(outcome, OperationOutcome::CalendarAndActivity { deal_id: 777 });
        assert_eq!(
            bridge.methods_called(),
            vec!["calendar.event.add", "crm.activity.todo.add"]
        );
        let todo = bridge.params_for("crm.activity.todo.add").unwrap();
        assert_eq!(todo["deadline"], "2024-06-10 14:15:00");
        assert_eq!(todo["ownerId"], 777);
    }

    #[tokio::test]
    async fn client_email_adds_a_best_effort_invite_note() {
        let (bridge, orchestrator) = orchestrator(StubBridge::default(), FormVariant::classic());

        let values = FormValues {
            client_email: Some("client@example.com".to_string()),
            meet_link: Some("https://meet.example/x".to_string()),
            ..classic_values()
        };
        let outcome = orchestrator.handle_submit(&values).await;

        assert_eq!(outcome, OperationOutcome::CalendarAndActivity { deal_id: 777 });
        assert_eq!(
            bridge.methods_called(),
            vec!["calendar.event.add", "crm.activity.add", "crm.activity.add"]
        );
    }

    #[tokio::test]
    async fn invite_note_failure_does_not_fail_the_submission() {
        // Use the todo variant so crm.activity.add is only the invite note;
        // failing it must not touch the outcome.
        let (_, orchestrator) = orchestrator(
            StubBridge::failing(vec!["crm.activity.add"]),
            FormVariant::grid(),
        );

        let values = FormValues {
            datetime: None,
            date: Some("2024-06-10".to_string()),
            time: Some("14:00".to_string()),
            client_email: Some("client@example.com".to_string()),
            ..classic_values()
        };
        let outcome = orchestrator.handle_submit(&values).await;

        assert_eq!(outcome, OperationOutcome::CalendarAndActivity { deal_id: 777 });
    }

    #[tokio::test]
    async fn oversized_duration_fails_cleanly_and_frees_the_latch() {
        let (bridge, orchestrator) = orchestrator(StubBridge::default(), FormVariant::classic());

        let values = FormValues {
            duration: Some(i64::MAX.to_string()),
            ..classic_values()
        };
        let outcome = orchestrator.handle_submit(&values).await;
        assert!(matches!(outcome, OperationOutcome::Failed { .. }));
        assert!(bridge.methods_called().is_empty());

        // The failed submission must not wedge the latch; a well-formed
        // retry goes through
        let outcome = orchestrator.handle_submit(&classic_values()).await;
        assert_eq!(outcome, OperationOutcome::CalendarAndActivity { deal_id: 777 });
    }

    #[tokio::test]
    async fn second_click_while_in_flight_is_rejected() {
        let bridge = Arc::new(StubBridge {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let orchestrator = Arc::new(Orchestrator::new(bridge.clone(), FormVariant::classic()));
        orchestrator.host_ready(1);

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.handle_submit(&classic_values()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = orchestrator.handle_submit(&classic_values()).await;
        assert_eq!(
            second,
            OperationOutcome::Failed {
                message: ScheduleError::Busy.to_string()
            }
        );

        let first = first.await.unwrap();
        assert_eq!(first, OperationOutcome::CalendarAndActivity { deal_id: 777 });
        // Only the first submission reached the portal
        assert_eq!(
            bridge.methods_called(),
            vec!["calendar.event.add", "crm.activity.add"]
        );
    }

    #[tokio::test]
    async fn connect_reads_the_user_id_whatever_its_casing() {
        struct UserBridge(Value);

        #[async_trait]
        impl Bridge for UserBridge {
            async fn invoke(&self, _method: &str, _params: Value) -> Result<Value, ScheduleError> {
                Ok(self.0.clone())
            }
        }

        for payload in [json!({"ID": "9"}), json!({"Id": 9}), json!({"id": "9"})] {
            let orchestrator =
                Orchestrator::new(Arc::new(UserBridge(payload)), FormVariant::classic());
            assert_eq!(orchestrator.connect().await.unwrap(), 9);
            assert_eq!(orchestrator.current_user(), Some(9));
        }
    }

    #[tokio::test]
    async fn connect_without_a_user_id_is_an_error() {
        struct EmptyBridge;

        #[async_trait]
        impl Bridge for EmptyBridge {
            async fn invoke(&self, _method: &str, _params: Value) -> Result<Value, ScheduleError> {
                Ok(json!({"NAME": "nobody"}))
            }
        }

        let orchestrator = Orchestrator::new(Arc::new(EmptyBridge), FormVariant::classic());
        let err = orchestrator.connect().await.unwrap_err();
        assert!(matches!(err, ScheduleError::RemoteCall { .. }));
    }

    #[test]
    fn description_joins_the_optional_lines() {
        let values = FormValues {
            meet_link: Some("https://meet.example/x".to_string()),
            client_email: Some("client@example.com".to_string()),
            notes: Some("agenda attached".to_string()),
            ..Default::default()
        };
        assert_eq!(
            description_text(&values),
            "Meet: https://meet.example/x\nClient: client@example.com\nNotes: agenda attached"
        );
        assert_eq!(description_text(&FormValues::default()), "");
    }
}
