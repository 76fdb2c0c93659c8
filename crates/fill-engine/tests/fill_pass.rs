use std::sync::Arc;

use async_trait::async_trait;
use fill_engine::{
    DisplayMessage, FieldStatus, FieldTask, FillEngineBuilder, FillOutcome, FillPolicy,
    FillRequest, ProfileClass, ReportSink, TaskList,
};
use form_driver::{Catalog, DriverCall, MemoryForm, Query, Signal};
use formpilot_core_types::FieldId;
use parking_lot::Mutex;

#[derive(Default)]
struct RecordingSink {
    outcomes: Mutex<Vec<FillOutcome>>,
    displays: Mutex<Vec<DisplayMessage>>,
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn outcome(&self, outcome: &FillOutcome) {
        self.outcomes.lock().push(outcome.clone());
    }

    async fn display(&self, message: &DisplayMessage) {
        self.displays.lock().push(message.clone());
    }
}

fn id(raw: &str) -> FieldId {
    FieldId::parse(raw).unwrap()
}

fn codes(latency_ms: u64) -> Catalog {
    Catalog::new(["Код", "Наименование"])
        .row(["1", "Плановая"])
        .row(["2", "Экстренная"])
        .row(["21", "Неотложная"])
        .latency_ms(latency_ms)
}

/// A trimmed-down hospitalization form: two references, a date and plain inputs.
fn case_form() -> Arc<MemoryForm> {
    Arc::new(
        MemoryForm::builder()
            .reference("VidMpV008", codes(700))
            .reference(
                "HospitalizationInfoSubdivision",
                Catalog::new(["Краткое наименование"])
                    .row(["Хирургия"])
                    .row(["Терапия"])
                    .latency_ms(300),
            )
            .input("DateBirth")
            .input("Enp")
            .input("CardNumber")
            .build(),
    )
}

fn case_tasks() -> TaskList {
    TaskList::new(vec![
        FieldTask::reference(id("VidMpV008"), "Код").mandatory(),
        FieldTask::reference(id("HospitalizationInfoSubdivision"), "Краткое наименование")
            .mandatory(),
        FieldTask::date(id("DateBirth")).profile(ProfileClass::Fast),
        FieldTask::plain(id("Enp")).profile(ProfileClass::Fast),
        FieldTask::plain(id("Gender")).profile(ProfileClass::Fast),
        FieldTask::plain(id("CardNumber")).profile(ProfileClass::Fast),
    ])
    .unwrap()
}

/// Order in which fields were first addressed by the engine.
fn touch_order(form: &MemoryForm, candidates: &[&str]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    for call in form.calls() {
        for name in candidates {
            if call.touches(name) && !order.iter().any(|seen| seen == name) {
                order.push(name.to_string());
            }
        }
    }
    order
}

#[tokio::test(start_paused = true)]
async fn fills_in_task_order_regardless_of_request_order() {
    let form = case_form();
    let sink = Arc::new(RecordingSink::default());
    let engine = FillEngineBuilder::new(FillPolicy::default())
        .with_tasks(case_tasks())
        .with_driver(form.clone())
        .with_sink(sink.clone())
        .build()
        .unwrap();

    let request = FillRequest::from_json(
        r#"{
            "CardNumber": "A-100",
            "Enp": "7751234567890123",
            "input[name='DateBirth']": "01.02.1980",
            "input[name='HospitalizationInfoSubdivision']": "Хирургия",
            "input[name='VidMpV008']": "2"
        }"#,
    )
    .unwrap();

    let outcome = engine.fill(&request).await;

    assert!(outcome.success(), "{:?}", outcome.error());
    assert!(outcome.all_fields_resolved());
    assert_eq!(form.field_value("VidMpV008").as_deref(), Some("2"));
    assert_eq!(
        form.field_value("HospitalizationInfoSubdivision").as_deref(),
        Some("Хирургия")
    );
    assert_eq!(form.field_value("DateBirth").as_deref(), Some("01.02.1980"));
    assert_eq!(
        touch_order(
            &form,
            &["VidMpV008", "HospitalizationInfoSubdivision", "DateBirth", "Enp", "CardNumber"]
        ),
        vec!["VidMpV008", "HospitalizationInfoSubdivision", "DateBirth", "Enp", "CardNumber"]
    );
    assert_eq!(sink.outcomes.lock().len(), 1);
    assert!(sink.displays.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn absent_fields_are_never_queried_and_filled_fields_once() {
    let form = case_form();
    let engine = FillEngineBuilder::new(FillPolicy::default())
        .with_tasks(case_tasks())
        .with_driver(form.clone())
        .build()
        .unwrap();
    let request = FillRequest::new().with_value(id("Enp"), "7751234567890123");

    let outcome = engine.fill(&request).await;

    assert!(outcome.success());
    assert_eq!(outcome.fields().len(), 1);
    for name in ["VidMpV008", "HospitalizationInfoSubdivision", "DateBirth", "Gender", "CardNumber"] {
        assert!(
            !form.calls().iter().any(|call| call.touches(name)),
            "{name} was queried"
        );
    }
    let set_calls = form
        .calls()
        .iter()
        .filter(|call| matches!(call, DriverCall::SetValue(el, _) if el.0 == "field:Enp"))
        .count();
    assert_eq!(set_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn optional_plain_field_missing_from_form_is_not_fatal() {
    let form = case_form();
    let engine = FillEngineBuilder::new(FillPolicy::default())
        .with_tasks(case_tasks())
        .with_driver(form.clone())
        .build()
        .unwrap();
    let request = FillRequest::new()
        .with_value(id("Enp"), "7751234567890123")
        .with_value(id("Gender"), "М");

    let outcome = engine.fill(&request).await;

    assert!(outcome.success());
    assert!(!outcome.all_fields_resolved());
    let gender = outcome
        .fields()
        .iter()
        .find(|report| report.field == id("Gender"))
        .unwrap();
    assert_eq!(gender.status, FieldStatus::NotFound);
    assert_eq!(form.field_value("Enp").as_deref(), Some("7751234567890123"));
}

#[tokio::test(start_paused = true)]
async fn mandatory_reference_without_matching_rows_fails_the_pass() {
    let form = case_form();
    let sink = Arc::new(RecordingSink::default());
    let engine = FillEngineBuilder::new(FillPolicy::default())
        .with_tasks(case_tasks())
        .with_driver(form.clone())
        .with_sink(sink.clone())
        .build()
        .unwrap();
    let request = FillRequest::from_json(
        r#"{"VidMpV008": "77", "Enp": "7751234567890123", "operations": [{"code": "A1", "name": "x"}]}"#,
    )
    .unwrap();

    let outcome = engine.fill(&request).await;

    assert!(!outcome.success());
    assert_eq!(outcome.error_kind(), Some("protocol_violation"));
    assert!(outcome.error().unwrap().contains("VidMpV008"));
    assert!(outcome.secondary().is_none());
    assert_eq!(form.field_value("Enp").as_deref(), Some(""));
    assert!(sink.displays.lock().is_empty());
    assert_eq!(sink.outcomes.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn lone_plain_fields_never_open_a_picker() {
    let form = Arc::new(MemoryForm::builder().input("field.lastName").build());
    let tasks = TaskList::new(vec![
        FieldTask::plain(id("field.lastName")),
        FieldTask::plain(id("field.cardNumber")),
    ])
    .unwrap();
    let engine = FillEngineBuilder::new(FillPolicy::default())
        .with_tasks(tasks)
        .with_driver(form.clone())
        .build()
        .unwrap();
    let request =
        FillRequest::from_json(r#"{"field.lastName": "Petrov", "field.cardNumber": ""}"#).unwrap();

    let outcome = engine.fill(&request).await;

    assert!(outcome.success());
    assert!(!outcome.all_fields_resolved());
    assert_eq!(form.field_value("field.lastName").as_deref(), Some("Petrov"));
    assert_eq!(
        form.field_signals("field.lastName"),
        vec![Signal::Input, Signal::Change, Signal::Blur]
    );
    assert!(!form.calls().iter().any(|call| matches!(
        call,
        DriverCall::Find(Query::Modal { .. })
            | DriverCall::Find(Query::ColumnFilter { .. })
            | DriverCall::Count(Query::GridRows)
    )));
}

#[tokio::test(start_paused = true)]
async fn repeated_pass_is_idempotent() {
    let form = case_form();
    let sink = Arc::new(RecordingSink::default());
    let engine = FillEngineBuilder::new(FillPolicy::default())
        .with_tasks(case_tasks())
        .with_driver(form.clone())
        .with_sink(sink.clone())
        .build()
        .unwrap();
    let request = FillRequest::from_json(
        r#"{
            "VidMpV008": "21",
            "Enp": "7751234567890123",
            "Gender": "Ж",
            "diagnoses": [{"code": "K35.8", "name": "Острый аппендицит"}]
        }"#,
    )
    .unwrap();

    let first = engine.fill(&request).await;
    let values = form.values();
    let second = engine.fill(&request).await;

    assert_eq!(first.success(), second.success());
    assert_eq!(first.all_fields_resolved(), second.all_fields_resolved());
    assert_eq!(first.fields(), second.fields());
    assert_ne!(first.pass_id(), second.pass_id());
    assert_eq!(form.values(), values);
    assert_eq!(form.field_value("VidMpV008").as_deref(), Some("21"));

    let displays = sink.displays.lock();
    assert_eq!(displays.len(), 2);
    assert_eq!(displays[0].title, "Форма заполнена");
    assert_eq!(displays[0].diagnoses[0].code, "K35.8");
}

#[tokio::test]
async fn builder_rejects_invalid_policy_and_missing_driver() {
    let mut policy = FillPolicy::default();
    policy.profiles.slow.stable_delay_ms = policy.profiles.slow.timeout_ms;
    let form = Arc::new(MemoryForm::builder().build());
    let err = FillEngineBuilder::new(policy)
        .with_driver(form)
        .build()
        .err()
        .unwrap();
    assert!(err.to_string().contains("slow"));

    let err = FillEngineBuilder::new(FillPolicy::default())
        .build()
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "a form driver is required");
}
