//! Scripted in-memory form
//!
//! [`MemoryForm`] behaves like the hosted form closely enough to exercise the
//! fill engine end to end: reference pickers open behind a loading mask,
//! filtered grids reload in stages (empty, partial, full), combo triggers
//! open option lists and every driver call is logged.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::trace;

use crate::contract::UiContract;
use crate::errors::DriverError;
use crate::model::{ElementRef, ElementState, Key, Query, Signal};
use crate::ports::FormDriver;

fn default_latency_ms() -> u64 {
    300
}

/// Server-backed list behind a reference field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    /// Round trip of one load (opening the picker or applying a filter)
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Grid rendered without the row checker column
    #[serde(default)]
    pub without_checkers: bool,
    /// Delay before a clicked row is marked selected
    #[serde(default)]
    pub select_latency_ms: u64,
    /// Delay between confirming and the modal closing, half a load when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_latency_ms: Option<u64>,
}

impl Catalog {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            latency_ms: default_latency_ms(),
            without_checkers: false,
            select_latency_ms: 0,
            close_latency_ms: None,
        }
    }

    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn without_checkers(mut self) -> Self {
        self.without_checkers = true;
        self
    }

    pub fn select_latency_ms(mut self, select_latency_ms: u64) -> Self {
        self.select_latency_ms = select_latency_ms;
        self
    }

    pub fn close_latency_ms(mut self, close_latency_ms: u64) -> Self {
        self.close_latency_ms = Some(close_latency_ms);
        self
    }

    fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    fn close_latency(&self) -> Duration {
        self.close_latency_ms
            .map_or(self.latency() / 2, Duration::from_millis)
    }

    fn column(&self, header: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == header)
    }

    fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }
}

/// Declarative description of a form, loadable from YAML.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FormFixture {
    /// Keep a loading mask displayed for this long after the form is built
    #[serde(default)]
    pub mask_ms: u64,
    #[serde(default)]
    pub fields: Vec<FieldFixture>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldFixture {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Catalog>,
}

/// One call received by a [`MemoryForm`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverCall {
    Find(Query),
    Count(Query),
    State(ElementRef),
    SetValue(ElementRef, String),
    Dispatch(ElementRef, Signal),
}

impl DriverCall {
    /// Whether this call addressed the named field or one of its parts.
    pub fn touches(&self, field: &str) -> bool {
        match self {
            DriverCall::Find(query) | DriverCall::Count(query) => match query {
                Query::Field { name } | Query::FieldTrigger { name } => name == field,
                _ => false,
            },
            DriverCall::State(element)
            | DriverCall::SetValue(element, _)
            | DriverCall::Dispatch(element, _) => matches!(
                Target::parse(element),
                Some(Target::Field(name)) | Some(Target::Trigger(name)) if name == field
            ),
        }
    }
}

#[derive(Clone, Debug)]
enum Widget {
    Input,
    Combo(Vec<String>),
    Reference(Catalog),
}

#[derive(Clone, Debug)]
struct Field {
    value: String,
    widget: Widget,
    signals: Vec<Signal>,
}

#[derive(Debug)]
struct Picker {
    field: String,
    catalog: Catalog,
    opened_at: Instant,
    filter: Option<(usize, String)>,
    /// Catalog indices currently listed by the grid
    listed: Vec<usize>,
    reload_started: Option<Instant>,
    /// Clicked row and the instant it shows as selected
    selected: Option<(usize, Instant)>,
    closing_at: Option<Instant>,
}

impl Picker {
    fn ready(&self, now: Instant) -> bool {
        now >= self.opened_at + self.catalog.latency()
            && self.closing_at.map_or(true, |at| now < at)
    }

    fn loading(&self, now: Instant) -> bool {
        let latency = self.catalog.latency();
        now < self.opened_at + latency
            || self
                .reload_started
                .map_or(false, |started| now < started + latency)
    }

    fn row_count(&self, now: Instant) -> usize {
        if !self.ready(now) {
            return 0;
        }
        let full = self.listed.len();
        match self.reload_started {
            Some(started) => {
                let elapsed = now.saturating_duration_since(started);
                let latency = self.catalog.latency();
                if elapsed < latency / 2 {
                    0
                } else if elapsed < latency {
                    (full + 1) / 2
                } else {
                    full
                }
            }
            None => full,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Field(String),
    Trigger(String),
    Mask,
    Modal,
    Rows,
    Checker(usize),
    Filter(String),
    Button(String),
    OptionList,
    Option(String),
}

impl Target {
    fn parse(element: &ElementRef) -> Option<Self> {
        let raw = element.0.as_str();
        let target = match raw.split_once(':') {
            Some(("field", name)) => Target::Field(name.to_string()),
            Some(("trigger", name)) => Target::Trigger(name.to_string()),
            Some(("checker", index)) => Target::Checker(index.parse().ok()?),
            Some(("filter", header)) => Target::Filter(header.to_string()),
            Some(("button", label)) => Target::Button(label.to_string()),
            Some(("option", text)) => Target::Option(text.to_string()),
            _ => match raw {
                "mask" => Target::Mask,
                "modal" => Target::Modal,
                "rows" => Target::Rows,
                "option-list" => Target::OptionList,
                _ => return None,
            },
        };
        Some(target)
    }

    fn to_ref(&self) -> ElementRef {
        let raw = match self {
            Target::Field(name) => format!("field:{name}"),
            Target::Trigger(name) => format!("trigger:{name}"),
            Target::Mask => "mask".to_string(),
            Target::Modal => "modal".to_string(),
            Target::Rows => "rows".to_string(),
            Target::Checker(index) => format!("checker:{index}"),
            Target::Filter(header) => format!("filter:{header}"),
            Target::Button(label) => format!("button:{label}"),
            Target::OptionList => "option-list".to_string(),
            Target::Option(text) => format!("option:{text}"),
        };
        ElementRef(raw)
    }
}

#[derive(Debug)]
struct FormState {
    fields: BTreeMap<String, Field>,
    picker: Option<Picker>,
    option_list: Option<String>,
    mask_until: Option<Instant>,
    calls: Vec<DriverCall>,
}

impl FormState {
    fn tick(&mut self, now: Instant) {
        let closed = self
            .picker
            .as_ref()
            .and_then(|picker| picker.closing_at)
            .map_or(false, |at| now >= at);
        if closed {
            self.picker = None;
        }
        if self.mask_until.map_or(false, |until| now >= until) {
            self.mask_until = None;
        }
    }

    fn mask_visible(&self, now: Instant) -> bool {
        self.mask_until.is_some() || self.picker.as_ref().map_or(false, |p| p.loading(now))
    }

    fn ready_picker(&self, now: Instant) -> Option<&Picker> {
        self.picker.as_ref().filter(|picker| picker.ready(now))
    }

    fn options(&self) -> Option<&[String]> {
        let field = self.fields.get(self.option_list.as_deref()?)?;
        match &field.widget {
            Widget::Combo(options) => Some(options),
            _ => None,
        }
    }

    /// Every element currently matching the query, in document order.
    fn resolve(&self, query: &Query, contract: &UiContract, now: Instant) -> Vec<Target> {
        match query {
            Query::Field { name } => self
                .fields
                .get(name)
                .map(|_| vec![Target::Field(name.clone())])
                .unwrap_or_default(),
            Query::FieldTrigger { name } => match self.fields.get(name) {
                Some(Field {
                    widget: Widget::Combo(_),
                    ..
                }) => vec![Target::Trigger(name.clone())],
                _ => Vec::new(),
            },
            Query::LoadMask => {
                if self.mask_visible(now) {
                    vec![Target::Mask]
                } else {
                    Vec::new()
                }
            }
            Query::Modal { title } => {
                if self.ready_picker(now).is_some() && contract.picker_title.contains(title.as_str())
                {
                    vec![Target::Modal]
                } else {
                    Vec::new()
                }
            }
            Query::GridRows => {
                let count = self.picker.as_ref().map_or(0, |p| p.row_count(now));
                vec![Target::Rows; count]
            }
            Query::RowChecker { index } => {
                let count = self
                    .picker
                    .as_ref()
                    .filter(|p| !p.catalog.without_checkers)
                    .map_or(0, |p| p.row_count(now));
                if *index < count {
                    vec![Target::Checker(*index)]
                } else {
                    Vec::new()
                }
            }
            Query::ColumnFilter { header } => match self.ready_picker(now) {
                Some(picker) if picker.catalog.column(header).is_some() => {
                    vec![Target::Filter(header.clone())]
                }
                _ => Vec::new(),
            },
            Query::Button { label } => {
                if self.ready_picker(now).is_some() && *label == contract.confirm_label {
                    vec![Target::Button(label.clone())]
                } else {
                    Vec::new()
                }
            }
            Query::OptionList => {
                if self.option_list.is_some() {
                    vec![Target::OptionList]
                } else {
                    Vec::new()
                }
            }
            Query::Option { text } => self
                .options()
                .unwrap_or_default()
                .iter()
                .filter(|option| option.trim() == text)
                .map(|_| Target::Option(text.clone()))
                .take(1)
                .collect(),
        }
    }

    fn attached(&self, target: &Target, contract: &UiContract, now: Instant) -> bool {
        let query = match target {
            Target::Field(name) => Query::Field { name: name.clone() },
            Target::Trigger(name) => Query::FieldTrigger { name: name.clone() },
            Target::Mask => Query::LoadMask,
            Target::Modal => Query::Modal {
                title: contract.picker_title.clone(),
            },
            Target::Rows => Query::GridRows,
            Target::Checker(index) => Query::RowChecker { index: *index },
            Target::Filter(header) => Query::ColumnFilter {
                header: header.clone(),
            },
            Target::Button(label) => Query::Button {
                label: label.clone(),
            },
            Target::OptionList => Query::OptionList,
            Target::Option(text) => Query::Option { text: text.clone() },
        };
        !self.resolve(&query, contract, now).is_empty()
    }

    fn apply(&mut self, target: Target, signal: Signal, now: Instant) {
        match (target, signal) {
            (Target::Field(name), signal) => {
                let Some(field) = self.fields.get_mut(&name) else {
                    return;
                };
                field.signals.push(signal);
                match (&field.widget, signal) {
                    (Widget::Reference(catalog), Signal::Click) if self.picker.is_none() => {
                        self.picker = Some(Picker {
                            field: name,
                            catalog: catalog.clone(),
                            opened_at: now,
                            filter: None,
                            listed: (0..catalog.rows.len()).collect(),
                            reload_started: None,
                            selected: None,
                            closing_at: None,
                        });
                    }
                    (Widget::Combo(_), Signal::KeyDown(Key::Escape)) => {
                        self.option_list = None;
                    }
                    _ => {}
                }
            }
            (Target::Trigger(name), Signal::Click) => {
                self.option_list = Some(name);
            }
            (Target::Filter(_), Signal::KeyUp(Key::Enter)) => {
                if let Some(picker) = self.picker.as_mut() {
                    let listed = match &picker.filter {
                        Some((column, text)) => (0..picker.catalog.rows.len())
                            .filter(|row| {
                                picker
                                    .catalog
                                    .cell(*row, *column)
                                    .map_or(false, |cell| cell.contains(text.as_str()))
                            })
                            .collect(),
                        None => (0..picker.catalog.rows.len()).collect(),
                    };
                    picker.listed = listed;
                    picker.selected = None;
                    picker.reload_started = Some(now);
                }
            }
            (Target::Checker(index), Signal::Click) => {
                if let Some(picker) = self.picker.as_mut() {
                    let shown_at = now + Duration::from_millis(picker.catalog.select_latency_ms);
                    picker.selected = Some((index, shown_at));
                }
            }
            (Target::Button(_), Signal::Click) => {
                let Some(picker) = self.picker.as_mut() else {
                    return;
                };
                let Some(row) = picker
                    .selected
                    .and_then(|(index, _)| picker.listed.get(index))
                else {
                    return;
                };
                let column = picker.filter.as_ref().map_or(0, |(column, _)| *column);
                let value = picker.catalog.cell(*row, column).unwrap_or_default().to_string();
                picker.closing_at = Some(now + picker.catalog.close_latency());
                let field_name = picker.field.clone();
                if let Some(field) = self.fields.get_mut(&field_name) {
                    field.value = value;
                }
            }
            (Target::Option(text), Signal::Click) => {
                if let Some(name) = self.option_list.take() {
                    if let Some(field) = self.fields.get_mut(&name) {
                        field.value = text;
                    }
                }
            }
            _ => {}
        }
    }
}

/// In-memory [`FormDriver`] with simulated server latency.
///
/// Time is read from `tokio::time`, so tests running with a paused clock
/// see loads complete deterministically.
pub struct MemoryForm {
    contract: UiContract,
    state: Mutex<FormState>,
}

impl MemoryForm {
    pub fn builder() -> MemoryFormBuilder {
        MemoryFormBuilder::default()
    }

    pub fn from_fixture(fixture: &FormFixture, contract: UiContract) -> Self {
        let mut builder = MemoryForm::builder().contract(contract);
        for field in &fixture.fields {
            builder = match (&field.reference, &field.options) {
                (Some(catalog), _) => builder.reference(field.name.clone(), catalog.clone()),
                (None, Some(options)) => builder.combo(field.name.clone(), options.clone()),
                (None, None) => builder.input(field.name.clone()),
            };
            if !field.value.is_empty() {
                builder = builder.value(field.name.clone(), field.value.clone());
            }
        }
        if fixture.mask_ms > 0 {
            builder = builder.mask_for(Duration::from_millis(fixture.mask_ms));
        }
        builder.build()
    }

    pub fn field_value(&self, name: &str) -> Option<String> {
        self.state.lock().fields.get(name).map(|field| field.value.clone())
    }

    /// Signals delivered to the field's own input, in order.
    pub fn field_signals(&self, name: &str) -> Vec<Signal> {
        self.state
            .lock()
            .fields
            .get(name)
            .map(|field| field.signals.clone())
            .unwrap_or_default()
    }

    /// Current values of every field, by name.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.state
            .lock()
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect()
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn picker_open(&self) -> bool {
        let mut state = self.state.lock();
        state.tick(Instant::now());
        state.picker.is_some()
    }

    fn locked(&self, call: DriverCall) -> parking_lot::MutexGuard<'_, FormState> {
        let mut state = self.state.lock();
        state.tick(Instant::now());
        trace!(?call, "memory form call");
        state.calls.push(call);
        state
    }

    fn target(&self, element: &ElementRef) -> Result<Target, DriverError> {
        Target::parse(element).ok_or_else(|| DriverError::Detached(element.0.clone()))
    }
}

#[async_trait]
impl FormDriver for MemoryForm {
    async fn find(&self, query: &Query) -> Result<Option<ElementRef>, DriverError> {
        let state = self.locked(DriverCall::Find(query.clone()));
        let found = state.resolve(query, &self.contract, Instant::now());
        Ok(found.first().map(Target::to_ref))
    }

    async fn count(&self, query: &Query) -> Result<usize, DriverError> {
        let state = self.locked(DriverCall::Count(query.clone()));
        Ok(state.resolve(query, &self.contract, Instant::now()).len())
    }

    async fn state(&self, element: &ElementRef) -> Result<ElementState, DriverError> {
        let target = self.target(element)?;
        let state = self.locked(DriverCall::State(element.clone()));
        let now = Instant::now();
        let attached = state.attached(&target, &self.contract, now);
        let selected = match target {
            Target::Checker(index) => state
                .picker
                .as_ref()
                .and_then(|picker| picker.selected)
                .map_or(false, |(row, shown_at)| row == index && now >= shown_at),
            _ => false,
        };
        Ok(ElementState {
            attached,
            visible: attached,
            selected,
        })
    }

    async fn set_value(&self, element: &ElementRef, value: &str) -> Result<(), DriverError> {
        let target = self.target(element)?;
        let mut state = self.locked(DriverCall::SetValue(element.clone(), value.to_string()));
        if !state.attached(&target, &self.contract, Instant::now()) {
            return Err(DriverError::Detached(element.0.clone()));
        }
        match target {
            Target::Field(name) => {
                if let Some(field) = state.fields.get_mut(&name) {
                    field.value = value.to_string();
                }
            }
            Target::Filter(header) => {
                if let Some(picker) = state.picker.as_mut() {
                    if let Some(column) = picker.catalog.column(&header) {
                        picker.filter = Some((column, value.to_string()));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn dispatch(&self, element: &ElementRef, signal: Signal) -> Result<(), DriverError> {
        let target = self.target(element)?;
        let mut state = self.locked(DriverCall::Dispatch(element.clone(), signal));
        let now = Instant::now();
        if !state.attached(&target, &self.contract, now) {
            return Err(DriverError::Detached(element.0.clone()));
        }
        state.apply(target, signal, now);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFormBuilder {
    contract: UiContract,
    fields: BTreeMap<String, Field>,
    mask_for: Option<Duration>,
}

impl MemoryFormBuilder {
    pub fn contract(mut self, contract: UiContract) -> Self {
        self.contract = contract;
        self
    }

    fn field(mut self, name: impl Into<String>, widget: Widget) -> Self {
        self.fields.insert(
            name.into(),
            Field {
                value: String::new(),
                widget,
                signals: Vec::new(),
            },
        );
        self
    }

    pub fn input(self, name: impl Into<String>) -> Self {
        self.field(name, Widget::Input)
    }

    pub fn combo<I, S>(self, name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        self.field(name, Widget::Combo(options))
    }

    pub fn reference(self, name: impl Into<String>, catalog: Catalog) -> Self {
        self.field(name, Widget::Reference(catalog))
    }

    /// Pre-populate a declared field.
    pub fn value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(field) = self.fields.get_mut(&name.into()) {
            field.value = value.into();
        }
        self
    }

    /// Keep a loading mask displayed for `duration` after `build`.
    pub fn mask_for(mut self, duration: Duration) -> Self {
        self.mask_for = Some(duration);
        self
    }

    pub fn build(self) -> MemoryForm {
        let now = Instant::now();
        MemoryForm {
            contract: self.contract,
            state: Mutex::new(FormState {
                fields: self.fields,
                picker: None,
                option_list: None,
                mask_until: self.mask_for.map(|duration| now + duration),
                calls: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, sleep};

    fn field(name: &str) -> Query {
        Query::Field { name: name.into() }
    }

    async fn press(form: &MemoryForm, element: &ElementRef) {
        for signal in [Signal::MouseDown, Signal::MouseUp, Signal::Click] {
            form.dispatch(element, signal).await.unwrap();
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(["Код", "Наименование"])
            .row(["1", "Первичная"])
            .row(["12", "Повторная"])
            .row(["3", "Экстренная"])
            .latency_ms(400)
    }

    #[tokio::test(start_paused = true)]
    async fn inputs_record_values_and_signals() {
        let form = MemoryForm::builder().input("Enp").build();
        let el = form.find(&field("Enp")).await.unwrap().unwrap();
        form.set_value(&el, "7751").await.unwrap();
        form.dispatch(&el, Signal::Input).await.unwrap();
        form.dispatch(&el, Signal::Blur).await.unwrap();

        assert_eq!(form.field_value("Enp").as_deref(), Some("7751"));
        assert_eq!(form.field_signals("Enp"), vec![Signal::Input, Signal::Blur]);
        assert!(form.find(&field("Missing")).await.unwrap().is_none());
        assert!(form.calls().iter().any(|call| call.touches("Missing")));
    }

    #[tokio::test(start_paused = true)]
    async fn picker_opens_behind_mask_then_lists_rows() {
        let form = MemoryForm::builder().reference("VidMpV008", catalog()).build();
        let el = form.find(&field("VidMpV008")).await.unwrap().unwrap();
        press(&form, &el).await;

        assert_eq!(form.count(&Query::LoadMask).await.unwrap(), 1);
        assert_eq!(form.count(&Query::GridRows).await.unwrap(), 0);
        advance(Duration::from_millis(400)).await;
        assert_eq!(form.count(&Query::LoadMask).await.unwrap(), 0);
        let modal = Query::Modal {
            title: "Выбор элемента".into(),
        };
        assert!(form.find(&modal).await.unwrap().is_some());
        assert_eq!(form.count(&Query::GridRows).await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn filter_reload_passes_through_empty_and_partial_states() {
        let form = MemoryForm::builder().reference("VidMpV008", catalog()).build();
        let el = form.find(&field("VidMpV008")).await.unwrap().unwrap();
        press(&form, &el).await;
        sleep(Duration::from_millis(400)).await;

        let filter = form
            .find(&Query::ColumnFilter {
                header: "Код".into(),
            })
            .await
            .unwrap()
            .unwrap();
        form.set_value(&filter, "1").await.unwrap();
        form.dispatch(&filter, Signal::KeyUp(Key::Enter)).await.unwrap();

        assert_eq!(form.count(&Query::GridRows).await.unwrap(), 0);
        advance(Duration::from_millis(250)).await;
        assert_eq!(form.count(&Query::GridRows).await.unwrap(), 1);
        advance(Duration::from_millis(200)).await;
        assert_eq!(form.count(&Query::GridRows).await.unwrap(), 2);

        let checker = form
            .find(&Query::RowChecker { index: 0 })
            .await
            .unwrap()
            .unwrap();
        press(&form, &checker).await;
        assert!(form.state(&checker).await.unwrap().selected);

        let confirm = form
            .find(&Query::Button {
                label: "Выбрать".into(),
            })
            .await
            .unwrap()
            .unwrap();
        press(&form, &confirm).await;
        assert_eq!(form.field_value("VidMpV008").as_deref(), Some("1"));
        advance(Duration::from_millis(200)).await;
        assert!(!form.picker_open());
    }

    #[tokio::test(start_paused = true)]
    async fn combo_offers_exact_options_only() {
        let form = MemoryForm::builder()
            .combo("Gender", ["Мужской", "Женский"])
            .build();
        let trigger = form
            .find(&Query::FieldTrigger {
                name: "Gender".into(),
            })
            .await
            .unwrap()
            .unwrap();
        press(&form, &trigger).await;
        assert!(form.find(&Query::OptionList).await.unwrap().is_some());
        assert!(form
            .find(&Query::Option {
                text: "мужской".into()
            })
            .await
            .unwrap()
            .is_none());

        let option = form
            .find(&Query::Option {
                text: "Женский".into(),
            })
            .await
            .unwrap()
            .unwrap();
        press(&form, &option).await;
        assert_eq!(form.field_value("Gender").as_deref(), Some("Женский"));
        assert!(form.find(&Query::OptionList).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_refs_are_detached() {
        let form = MemoryForm::builder().input("Enp").build();
        let err = form
            .dispatch(&ElementRef("checker:0".into()), Signal::Click)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Detached(_)));
        let err = form
            .set_value(&ElementRef("garbage".into()), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Detached(_)));
    }

    #[test]
    fn fixture_loads_from_yaml() {
        let yaml = r#"
fields:
  - name: Enp
  - name: Gender
    options: [Мужской, Женский]
  - name: VidMpV008
    reference:
      columns: [Код]
      rows: [["1"], ["2"]]
"#;
        let fixture: FormFixture = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(fixture.fields.len(), 3);
        let catalog = fixture.fields[2].reference.as_ref().unwrap();
        assert_eq!(catalog.latency_ms, 300);
        assert_eq!(catalog.rows.len(), 2);
    }
}
