use serde::{Deserialize, Serialize};

/// Structural assumptions about the foreign UI.
///
/// None of this is owned by us; it mirrors how the hosted form renders today
/// and is configurable so a markup change does not need a rebuild.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiContract {
    /// Frame hosting the form; the first iframe is used when this is absent
    pub frame_selector: String,
    pub load_mask: String,
    pub window: String,
    /// Title substring identifying reference picker modals
    pub picker_title: String,
    pub grid_row: String,
    pub header_container: String,
    pub column_header: String,
    pub column_header_text: String,
    pub row_checker: String,
    pub selected_row_class: String,
    pub button: String,
    pub button_label: String,
    /// Visible label of the picker confirm button
    pub confirm_label: String,
    pub field_container: String,
    pub trigger: String,
    pub option_list: String,
    pub option_item: String,
    /// Attribute used to tag located elements between script calls
    pub ref_attribute: String,
}

impl Default for UiContract {
    fn default() -> Self {
        Self {
            frame_selector: "iframe[name='mainFrame']".to_string(),
            load_mask: ".x-mask-msg".to_string(),
            window: ".x-window".to_string(),
            picker_title: "Выбор элемента".to_string(),
            grid_row: "tr.x-grid-row".to_string(),
            header_container: ".x-grid-header-ct".to_string(),
            column_header: ".x-column-header".to_string(),
            column_header_text: ".x-column-header-text".to_string(),
            row_checker: "td.x-grid-cell-row-checker".to_string(),
            selected_row_class: "x-grid-item-selected".to_string(),
            button: ".x-btn".to_string(),
            button_label: "span.x-btn-inner".to_string(),
            confirm_label: "Выбрать".to_string(),
            field_container: ".x-field".to_string(),
            trigger: ".x-form-trigger".to_string(),
            option_list: ".x-boundlist".to_string(),
            option_item: ".x-boundlist-item".to_string(),
            ref_attribute: "data-formpilot-ref".to_string(),
        }
    }
}
