use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to an element located by [`crate::FormDriver::find`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic lookups understood by every driver.
///
/// Selectors live in [`crate::UiContract`], not here, so the engine can say
/// *what* it is looking for without knowing how the foreign UI spells it.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Query {
    /// Input addressed by its `name` attribute
    Field { name: String },
    /// Drop-down trigger attached to a combo field
    FieldTrigger { name: String },
    /// A loading mask that is currently displayed
    LoadMask,
    /// A visible modal window whose text contains `title`
    Modal { title: String },
    /// Rendered grid rows
    GridRows,
    /// Selection checker cell of the grid row at `index`
    RowChecker { index: usize },
    /// Filter input under the column header labelled `header`
    ColumnFilter { header: String },
    /// Button identified by its visible label
    Button { label: String },
    /// A rendered, visible option list
    OptionList,
    /// Option whose visible text equals `text`
    Option { text: String },
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Field { name } => write!(f, "field '{name}'"),
            Query::FieldTrigger { name } => write!(f, "trigger of '{name}'"),
            Query::LoadMask => f.write_str("load mask"),
            Query::Modal { title } => write!(f, "modal '{title}'"),
            Query::GridRows => f.write_str("grid rows"),
            Query::RowChecker { index } => write!(f, "row checker #{index}"),
            Query::ColumnFilter { header } => write!(f, "filter of column '{header}'"),
            Query::Button { label } => write!(f, "button '{label}'"),
            Query::OptionList => f.write_str("option list"),
            Query::Option { text } => write!(f, "option '{text}'"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    pub attached: bool,
    pub visible: bool,
    /// Selection indicator of the element's row (or the element itself)
    pub selected: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Enter,
    Tab,
    Escape,
}

impl Key {
    pub fn name(self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Tab => "Tab",
            Key::Escape => "Escape",
        }
    }

    pub fn key_code(self) -> u32 {
        match self {
            Key::Enter => 13,
            Key::Tab => 9,
            Key::Escape => 27,
        }
    }
}

/// One synthetic notification delivered to an element.
///
/// Mouse and keyboard phases are separate signals; the foreign framework
/// listens for each phase on its own.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "signal", content = "key", rename_all = "snake_case")]
pub enum Signal {
    Focus,
    Input,
    Change,
    Blur,
    MouseDown,
    MouseUp,
    Click,
    KeyDown(Key),
    KeyPress(Key),
    KeyUp(Key),
}

impl Signal {
    /// DOM event type name
    pub fn event_name(self) -> &'static str {
        match self {
            Signal::Focus => "focus",
            Signal::Input => "input",
            Signal::Change => "change",
            Signal::Blur => "blur",
            Signal::MouseDown => "mousedown",
            Signal::MouseUp => "mouseup",
            Signal::Click => "click",
            Signal::KeyDown(_) => "keydown",
            Signal::KeyPress(_) => "keypress",
            Signal::KeyUp(_) => "keyup",
        }
    }

    pub fn key(self) -> Option<Key> {
        match self {
            Signal::KeyDown(key) | Signal::KeyPress(key) | Signal::KeyUp(key) => Some(key),
            _ => None,
        }
    }
}
