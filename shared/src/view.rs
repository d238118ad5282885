use serde::Serialize;

use crate::directory::{Level, NodeId};
use crate::locale::{Language, TranslationTable};
use crate::model::{Model, Route, Toast};
use crate::workflow::{LevelList, LocationWorkflow};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LanguageOption {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    pub selected: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PickerItem {
    pub id: NodeId,
    pub label: String,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PickerView {
    pub step: u8,
    pub level: Level,
    pub title: &'static str,
    pub filter: String,
    pub loading: bool,
    pub locating: bool,
    pub failed: bool,
    pub items: Vec<PickerItem>,
    pub breadcrumbs: Vec<String>,
    pub can_use_current_location: bool,
    pub show_no_results: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub route: Route,
    pub language: Language,
    pub languages: Vec<LanguageOption>,
    pub strings: TranslationTable,
    pub location_label: Option<String>,
    pub greeting_name: Option<String>,
    pub is_offline: bool,
    pub is_ready: bool,
    pub picker: Option<PickerView>,
    pub toast: Option<Toast>,
}

impl ViewModel {
    pub fn build(model: &Model) -> Self {
        let state = model.preferences.state();
        let language = state.language;

        Self {
            route: model.route,
            language,
            languages: Language::ALL
                .into_iter()
                .map(|lang| LanguageOption {
                    code: lang.code(),
                    name: lang.english_name(),
                    native_name: lang.native_name(),
                    selected: lang == language,
                })
                .collect(),
            strings: state.translations.clone(),
            location_label: state.location.display_label(),
            greeting_name: state.user.name.clone(),
            is_offline: state.is_offline,
            is_ready: model.rehydrated,
            picker: model
                .picker
                .as_ref()
                .map(|picker| PickerView::build(picker, language, state.translations)),
            toast: model.toast.clone(),
        }
    }
}

impl PickerView {
    fn build(picker: &LocationWorkflow, language: Language, strings: &TranslationTable) -> Self {
        let level = picker.level();
        let items: Vec<PickerItem> = picker
            .visible_nodes(language)
            .into_iter()
            .map(|node| PickerItem {
                id: node.id.clone(),
                label: node.display_name(language).to_string(),
            })
            .collect();
        let loading = picker.is_loading();

        Self {
            step: level.step(),
            level,
            title: match level {
                Level::State => strings.location.select_state,
                Level::District => strings.location.select_district,
                Level::Taluka => strings.location.select_taluka,
                Level::Village => strings.location.select_village,
            },
            filter: picker.filter().to_string(),
            loading,
            locating: picker.is_locating(),
            failed: matches!(picker.list(), LevelList::Failed(_)),
            show_no_results: !loading && items.is_empty(),
            items,
            breadcrumbs: picker.breadcrumbs(language),
            can_use_current_location: level == Level::State && !picker.is_locating(),
        }
    }
}
