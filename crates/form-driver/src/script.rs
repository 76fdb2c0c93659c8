//! Script-backed driver
//!
//! Every driver call becomes one self-contained expression evaluated in the
//! page that embeds the form. Located elements are tagged with
//! [`UiContract::ref_attribute`] so later calls can address them again
//! without holding remote object handles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::contract::UiContract;
use crate::errors::DriverError;
use crate::model::{ElementRef, ElementState, Query, Signal};
use crate::ports::{FormDriver, ScriptPort};

const HELPERS: &str = r#"
const frame = document.querySelector(C.frame_selector) || document.querySelector('iframe');
const doc = (frame && frame.contentWindow && frame.contentWindow.document) || document;
const view = doc.defaultView || window;
const shown = (el) => {
    if (!el) { return false; }
    const style = view.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return style.display !== 'none' && style.visibility !== 'hidden'
        && (rect.width > 0 || rect.height > 0 || el.getClientRects().length > 0);
};
const all = (selector, root) => Array.from((root || doc).querySelectorAll(selector));
const fields = (name) => all('input[name="' + CSS.escape(name) + '"]');
const collect = (q) => {
    switch (q.kind) {
        case 'field':
            return fields(q.name);
        case 'field_trigger':
            return fields(q.name)
                .map((el) => { const box = el.closest(C.field_container); return box ? box.querySelector(C.trigger) : null; })
                .filter(Boolean);
        case 'load_mask':
            return all(C.load_mask).filter((el) => view.getComputedStyle(el).display !== 'none');
        case 'modal':
            return all(C.window).filter((el) => el.offsetParent !== null && (el.innerText || '').includes(q.title));
        case 'grid_rows':
            return all(C.grid_row);
        case 'row_checker': {
            const row = all(C.grid_row)[q.index];
            const cell = row ? row.querySelector(C.row_checker) : null;
            return cell ? [cell] : [];
        }
        case 'column_filter':
            return all(C.header_container + " input[type='text']").filter((input) => {
                const table = input.closest('table');
                const header = input.closest(C.column_header)
                    || (table && table.parentElement ? table.parentElement.closest(C.column_header) : null);
                const label = header ? header.querySelector(C.column_header_text) : null;
                return !!label && label.textContent.trim() === q.header;
            });
        case 'button':
            return all(C.button_label)
                .filter((span) => span.textContent.trim() === q.label)
                .map((span) => span.closest(C.button))
                .filter(Boolean);
        case 'option_list':
            return all(C.option_list).filter(shown);
        case 'option':
            return all(C.option_list).filter(shown)
                .flatMap((list) => all(C.option_item, list))
                .filter((item) => item.textContent.trim() === q.text);
        default:
            throw new Error('unknown query kind: ' + q.kind);
    }
};
const byRef = (id) => doc.querySelector('[' + C.ref_attribute + '="' + CSS.escape(id) + '"]');
"#;

/// Event construction details shipped to the page for one [`Signal`].
#[derive(Serialize)]
struct EventSpec {
    name: &'static str,
    family: &'static str,
    key: Option<&'static str>,
    key_code: Option<u32>,
}

impl From<Signal> for EventSpec {
    fn from(signal: Signal) -> Self {
        let family = match signal {
            Signal::Focus => "focus_call",
            Signal::Blur => "focus",
            Signal::Input | Signal::Change => "event",
            Signal::MouseDown | Signal::MouseUp | Signal::Click => "mouse",
            Signal::KeyDown(_) | Signal::KeyPress(_) | Signal::KeyUp(_) => "keyboard",
        };
        Self {
            name: signal.event_name(),
            family,
            key: signal.key().map(|key| key.name()),
            key_code: signal.key().map(|key| key.key_code()),
        }
    }
}

pub struct ScriptDriver {
    port: Arc<dyn ScriptPort>,
    contract: UiContract,
    contract_literal: String,
    ref_prefix: String,
    next_ref: AtomicU64,
}

impl ScriptDriver {
    pub fn new(port: Arc<dyn ScriptPort>, contract: UiContract) -> Result<Self, DriverError> {
        let contract_literal = literal(&contract)?;
        let session = uuid::Uuid::new_v4().simple().to_string();
        Ok(Self {
            port,
            contract,
            contract_literal,
            ref_prefix: format!("fp-{}", &session[..8]),
            next_ref: AtomicU64::new(1),
        })
    }

    pub fn contract(&self) -> &UiContract {
        &self.contract
    }

    fn wrap(&self, body: &str) -> String {
        format!(
            "(() => {{\nconst C = {contract};\n{helpers}\n{body}\n}})()",
            contract = self.contract_literal,
            helpers = HELPERS,
            body = body,
        )
    }

    fn allocate_ref(&self) -> String {
        let n = self.next_ref.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.ref_prefix, n)
    }

    async fn run(&self, body: &str) -> Result<Value, DriverError> {
        let script = self.wrap(body);
        trace!(len = script.len(), "evaluating driver script");
        let value = self.port.evaluate(&script).await?;
        if !value.is_object() {
            return Err(DriverError::Protocol(format!(
                "expected an object, got {}",
                value
            )));
        }
        Ok(value)
    }
}

fn literal<T: Serialize + ?Sized>(value: &T) -> Result<String, DriverError> {
    serde_json::to_string(value)
        .map_err(|err| DriverError::Internal(format!("failed to encode script literal: {}", err)))
}

fn find_body(query: &Query, candidate_ref: &str) -> Result<String, DriverError> {
    Ok(format!(
        "const el = collect({query})[0];\n\
         if (!el) {{ return {{ found: false }}; }}\n\
         let id = el.getAttribute(C.ref_attribute);\n\
         if (!id) {{ id = {id}; el.setAttribute(C.ref_attribute, id); }}\n\
         return {{ found: true, ref: id }};",
        query = literal(query)?,
        id = literal(candidate_ref)?,
    ))
}

fn flag(value: &Value, name: &str) -> bool {
    value.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn ensure_ok(value: &Value, element: &ElementRef) -> Result<(), DriverError> {
    if flag(value, "ok") {
        Ok(())
    } else {
        Err(DriverError::Detached(element.0.clone()))
    }
}

#[async_trait]
impl FormDriver for ScriptDriver {
    async fn find(&self, query: &Query) -> Result<Option<ElementRef>, DriverError> {
        let candidate = self.allocate_ref();
        let value = self.run(&find_body(query, &candidate)?).await?;
        if !flag(&value, "found") {
            return Ok(None);
        }
        let id = value
            .get("ref")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol(format!("found {} without ref", query)))?;
        debug!(%query, element = id, "located element");
        Ok(Some(ElementRef(id.to_string())))
    }

    async fn count(&self, query: &Query) -> Result<usize, DriverError> {
        let body = format!("return {{ count: collect({}).length }};", literal(query)?);
        let value = self.run(&body).await?;
        value
            .get("count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| DriverError::Protocol(format!("count of {} missing", query)))
    }

    async fn state(&self, element: &ElementRef) -> Result<ElementState, DriverError> {
        let body = format!(
            "const el = byRef({id});\n\
             if (!el) {{ return {{ attached: false, visible: false, selected: false }}; }}\n\
             const row = el.closest(C.grid_row) || el;\n\
             const selected = row.classList.contains(C.selected_row_class) || row.getAttribute('aria-selected') === 'true';\n\
             return {{ attached: true, visible: shown(el), selected }};",
            id = literal(&element.0)?,
        );
        let value = self.run(&body).await?;
        Ok(ElementState {
            attached: flag(&value, "attached"),
            visible: flag(&value, "visible"),
            selected: flag(&value, "selected"),
        })
    }

    async fn set_value(&self, element: &ElementRef, value: &str) -> Result<(), DriverError> {
        let body = format!(
            "const el = byRef({id});\n\
             if (!el) {{ return {{ ok: false }}; }}\n\
             if (typeof el.focus === 'function') {{ el.focus(); }}\n\
             el.value = {value};\n\
             return {{ ok: true }};",
            id = literal(&element.0)?,
            value = literal(value)?,
        );
        let result = self.run(&body).await?;
        ensure_ok(&result, element)
    }

    async fn dispatch(&self, element: &ElementRef, signal: Signal) -> Result<(), DriverError> {
        let body = format!(
            "const el = byRef({id});\n\
             if (!el) {{ return {{ ok: false }}; }}\n\
             const S = {spec};\n\
             if (S.family === 'focus_call') {{ el.focus(); return {{ ok: true }}; }}\n\
             if (S.name === 'blur' && doc.activeElement === el && typeof el.blur === 'function') {{ el.blur(); return {{ ok: true }}; }}\n\
             let event;\n\
             if (S.family === 'mouse') {{ event = new view.MouseEvent(S.name, {{ bubbles: true, cancelable: true, view }}); }}\n\
             else if (S.family === 'keyboard') {{ event = new view.KeyboardEvent(S.name, {{ key: S.key, code: S.key, keyCode: S.key_code, which: S.key_code, bubbles: true, cancelable: true }}); }}\n\
             else if (S.family === 'focus') {{ event = new view.FocusEvent(S.name, {{ bubbles: true }}); }}\n\
             else {{ event = new view.Event(S.name, {{ bubbles: true }}); }}\n\
             el.dispatchEvent(event);\n\
             return {{ ok: true }};",
            id = literal(&element.0)?,
            spec = literal(&EventSpec::from(signal))?,
        );
        let result = self.run(&body).await?;
        ensure_ok(&result, element)
    }
}
