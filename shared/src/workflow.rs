//! Four-step location picker: State → District → Taluka → Village.
//!
//! The workflow never performs I/O. Each transition that needs data returns a
//! [`DirectoryQuery`] stamped with a [`FetchTicket`]; responses carrying any
//! other ticket are stale and dropped.

use thiserror::Error;
use tracing::{debug, warn};

use crate::capabilities::GeolocationError;
use crate::directory::{DirectoryError, DirectoryQuery, FetchTicket, Level, LocationNode, NodeId};
use crate::locale::Language;
use crate::model::{Coordinates, LocationPatch};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{0:?} list is not loaded yet")]
    NotReady(Level),

    #[error("no {level:?} with id {id}")]
    UnknownNode { level: Level, id: NodeId },

    #[error("current location is only offered while choosing a state")]
    GeolocationNotOffered,

    #[error("location request already in progress")]
    GeolocationInProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelList {
    Loading,
    Loaded(Vec<LocationNode>),
    Failed(DirectoryError),
}

impl LevelList {
    pub fn nodes(&self) -> &[LocationNode] {
        match self {
            Self::Loaded(nodes) => nodes,
            Self::Loading | Self::Failed(_) => &[],
        }
    }
}

/// Chosen nodes for the completed steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionProgress {
    pub state: Option<LocationNode>,
    pub district: Option<LocationNode>,
    pub taluka: Option<LocationNode>,
}

impl SelectionProgress {
    fn parent_of(&self, level: Level) -> Option<&LocationNode> {
        match level {
            Level::State => None,
            Level::District => self.state.as_ref(),
            Level::Taluka => self.district.as_ref(),
            Level::Village => self.taluka.as_ref(),
        }
    }

    /// Records `node` at `level` and forgets everything deeper.
    fn record(&mut self, level: Level, node: LocationNode) {
        match level {
            Level::State => {
                self.state = Some(node);
                self.district = None;
                self.taluka = None;
            }
            Level::District => {
                self.district = Some(node);
                self.taluka = None;
            }
            Level::Taluka => self.taluka = Some(node),
            Level::Village => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Fetch(DirectoryQuery),
    Commit(LocationPatch),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeolocationOutcome {
    Commit(LocationPatch),
    Failed(GeolocationError),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationWorkflow {
    level: Level,
    progress: SelectionProgress,
    list: LevelList,
    filter: String,
    generation: u64,
    locating: bool,
}

impl LocationWorkflow {
    /// New workflow at the state step, plus the query for the state list.
    /// Tickets continue after `last_generation` so replies addressed to an
    /// earlier workflow never match this one.
    pub fn start(last_generation: u64) -> (Self, DirectoryQuery) {
        let mut workflow = Self {
            level: Level::State,
            progress: SelectionProgress::default(),
            list: LevelList::Loading,
            filter: String::new(),
            generation: last_generation,
            locating: false,
        };
        let query = workflow.issue(None);
        (workflow, query)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn progress(&self) -> &SelectionProgress {
        &self.progress
    }

    pub fn list(&self) -> &LevelList {
        &self.list
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.list, LevelList::Loading)
    }

    pub fn is_locating(&self) -> bool {
        self.locating
    }

    pub fn current_ticket(&self) -> FetchTicket {
        FetchTicket { level: self.level, generation: self.generation }
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter = text.into();
    }

    /// Nodes of the current level that match the filter, in service order.
    pub fn visible_nodes(&self, language: Language) -> Vec<&LocationNode> {
        let needle = self.filter.to_lowercase();
        self.list
            .nodes()
            .iter()
            .filter(|node| node.matches(&needle, language))
            .collect()
    }

    /// Display names of the chosen nodes, shallowest first.
    pub fn breadcrumbs(&self, language: Language) -> Vec<String> {
        [&self.progress.state, &self.progress.district, &self.progress.taluka]
            .into_iter()
            .flatten()
            .map(|node| node.display_name(language).to_string())
            .collect()
    }

    pub fn choose(&mut self, id: &NodeId, language: Language) -> Result<Transition, WorkflowError> {
        let node = match &self.list {
            LevelList::Loaded(nodes) => nodes
                .iter()
                .find(|node| &node.id == id)
                .cloned()
                .ok_or_else(|| WorkflowError::UnknownNode { level: self.level, id: id.clone() })?,
            LevelList::Loading | LevelList::Failed(_) => {
                return Err(WorkflowError::NotReady(self.level));
            }
        };

        let Some(next) = self.level.next() else {
            return self.commit(&node, language);
        };

        debug!(level = ?self.level, id = %node.id, "location node chosen");
        let parent = node.id.clone();
        self.progress.record(self.level, node);
        self.level = next;
        self.filter.clear();
        self.locating = false;
        Ok(Transition::Fetch(self.issue(Some(parent))))
    }

    /// Applies a directory response. Returns `false` when the response is
    /// stale and was dropped.
    pub fn apply_directory(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<LocationNode>, DirectoryError>,
    ) -> bool {
        if ticket != self.current_ticket() {
            debug!(?ticket, current = ?self.current_ticket(), "dropping stale directory response");
            return false;
        }
        self.list = match result {
            Ok(nodes) => LevelList::Loaded(nodes),
            Err(e) => {
                warn!(level = ?self.level, error = %e, "directory fetch failed");
                LevelList::Failed(e)
            }
        };
        true
    }

    /// Re-requests the current level after a failed fetch.
    pub fn retry(&mut self) -> Option<DirectoryQuery> {
        if !matches!(self.list, LevelList::Failed(_)) {
            return None;
        }
        let parent = self.progress.parent_of(self.level).map(|node| node.id.clone());
        Some(self.issue(parent))
    }

    /// Back to the state step with a fresh state list.
    pub fn restart(&mut self) -> DirectoryQuery {
        self.level = Level::State;
        self.progress = SelectionProgress::default();
        self.filter.clear();
        self.locating = false;
        self.issue(None)
    }

    pub fn begin_geolocation(&mut self) -> Result<(), WorkflowError> {
        if self.level != Level::State {
            return Err(WorkflowError::GeolocationNotOffered);
        }
        if self.locating {
            return Err(WorkflowError::GeolocationInProgress);
        }
        self.locating = true;
        Ok(())
    }

    pub fn finish_geolocation(
        &mut self,
        result: Result<Coordinates, GeolocationError>,
    ) -> GeolocationOutcome {
        if !self.locating || self.level != Level::State {
            debug!("dropping geolocation result for an abandoned request");
            return GeolocationOutcome::Ignored;
        }
        self.locating = false;
        match result {
            Ok(coordinates) => GeolocationOutcome::Commit(LocationPatch::coordinates(coordinates)),
            Err(e) => {
                warn!(error = %e, "device location unavailable");
                GeolocationOutcome::Failed(e)
            }
        }
    }

    fn commit(&self, village: &LocationNode, language: Language) -> Result<Transition, WorkflowError> {
        let name = |node: Option<&LocationNode>, level: Level| {
            node.map(|n| n.display_name(language).to_string())
                .ok_or(WorkflowError::NotReady(level))
        };
        let patch = LocationPatch::named(
            name(self.progress.state.as_ref(), Level::State)?,
            name(self.progress.district.as_ref(), Level::District)?,
            name(self.progress.taluka.as_ref(), Level::Taluka)?,
            village.display_name(language),
        );
        debug!(village = %village.id, "location resolved");
        Ok(Transition::Commit(patch))
    }

    fn issue(&mut self, parent: Option<NodeId>) -> DirectoryQuery {
        self.generation += 1;
        self.list = LevelList::Loading;
        DirectoryQuery { level: self.level, parent, ticket: self.current_ticket() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn states() -> Vec<LocationNode> {
        vec![
            LocationNode::new("1", "Karnataka").with_localized(Language::Hi, "कर्नाटक"),
            LocationNode::new("2", "Maharashtra").with_localized(Language::Mr, "महाराष्ट्र"),
        ]
    }

    fn fetch(transition: Transition) -> DirectoryQuery {
        match transition {
            Transition::Fetch(query) => query,
            Transition::Commit(patch) => panic!("unexpected commit {patch:?}"),
        }
    }

    fn loaded_at_state() -> LocationWorkflow {
        let (mut workflow, query) = LocationWorkflow::start(0);
        assert!(workflow.apply_directory(query.ticket, Ok(states())));
        workflow
    }

    #[test]
    fn starts_loading_states() {
        let (workflow, query) = LocationWorkflow::start(0);
        assert_eq!(workflow.level(), Level::State);
        assert!(workflow.is_loading());
        assert_eq!(query.level, Level::State);
        assert_eq!(query.parent, None);
        assert_eq!(query.ticket, workflow.current_ticket());
    }

    #[test]
    fn full_walk_commits_once_with_all_names() {
        let mut wf = loaded_at_state();
        let lang = Language::En;

        let q = fetch(wf.choose(&"1".into(), lang).unwrap());
        assert_eq!((q.level, q.parent.clone()), (Level::District, Some(NodeId::from("1"))));
        assert!(wf.apply_directory(q.ticket, Ok(vec![LocationNode::new("10", "Belgaum")])));

        let q = fetch(wf.choose(&"10".into(), lang).unwrap());
        assert_eq!(q.parent, Some(NodeId::from("10")));
        assert!(wf.apply_directory(q.ticket, Ok(vec![LocationNode::new("100", "Chikodi")])));

        let q = fetch(wf.choose(&"100".into(), lang).unwrap());
        assert_eq!(q.level, Level::Village);
        assert!(wf.apply_directory(q.ticket, Ok(vec![LocationNode::new("1000", "Soundalga")])));

        let commit = wf.choose(&"1000".into(), lang).unwrap();
        assert_eq!(
            commit,
            Transition::Commit(LocationPatch::named("Karnataka", "Belgaum", "Chikodi", "Soundalga"))
        );
        assert_eq!(wf.breadcrumbs(lang), vec!["Karnataka", "Belgaum", "Chikodi"]);
    }

    #[test]
    fn commit_uses_localized_names_with_fallback() {
        let mut wf = loaded_at_state();
        let lang = Language::Hi;
        let q = fetch(wf.choose(&"1".into(), lang).unwrap());
        wf.apply_directory(q.ticket, Ok(vec![LocationNode::new("10", "Belgaum").with_localized(Language::Hi, "बेलगाम")]));
        let q = fetch(wf.choose(&"10".into(), lang).unwrap());
        wf.apply_directory(q.ticket, Ok(vec![LocationNode::new("100", "Athani")]));
        let q = fetch(wf.choose(&"100".into(), lang).unwrap());
        wf.apply_directory(q.ticket, Ok(vec![LocationNode::new("1000", "Soundalga").with_localized(Language::Mr, "सौंदलगा")]));

        let Transition::Commit(patch) = wf.choose(&"1000".into(), lang).unwrap() else {
            panic!("expected commit");
        };
        assert_eq!(patch, LocationPatch::named("कर्नाटक", "बेलगाम", "Athani", "Soundalga"));
        assert_eq!(patch.coordinates, None);
    }

    #[test]
    fn choosing_resets_filter_and_marks_loading() {
        let mut wf = loaded_at_state();
        wf.set_filter("kar");
        let _ = wf.choose(&"1".into(), Language::En).unwrap();
        assert_eq!(wf.filter(), "");
        assert!(wf.is_loading());
        assert!(wf.visible_nodes(Language::En).is_empty());
    }

    #[test]
    fn cannot_choose_before_list_loads_or_unknown_ids() {
        let (mut wf, _) = LocationWorkflow::start(0);
        assert_eq!(wf.choose(&"1".into(), Language::En), Err(WorkflowError::NotReady(Level::State)));

        let mut wf = loaded_at_state();
        assert_eq!(
            wf.choose(&"99".into(), Language::En),
            Err(WorkflowError::UnknownNode { level: Level::State, id: "99".into() })
        );
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut wf = loaded_at_state();
        let district_query = fetch(wf.choose(&"1".into(), Language::En).unwrap());
        let retried = {
            wf.apply_directory(district_query.ticket, Err(DirectoryError::Transport("offline".into())));
            wf.retry().unwrap()
        };
        assert_ne!(retried.ticket, district_query.ticket);

        // The first request answers late: ignored.
        assert!(!wf.apply_directory(district_query.ticket, Ok(vec![LocationNode::new("66", "Stale")])));
        assert!(matches!(wf.list(), LevelList::Loading));

        assert!(wf.apply_directory(retried.ticket, Ok(vec![LocationNode::new("10", "Belgaum")])));
        assert_eq!(wf.list().nodes().len(), 1);
    }

    #[test]
    fn response_for_abandoned_level_is_dropped() {
        let mut wf = loaded_at_state();
        let districts = fetch(wf.choose(&"1".into(), Language::En).unwrap());
        let restarted = wf.restart();
        assert!(!wf.apply_directory(districts.ticket, Ok(vec![LocationNode::new("10", "Belgaum")])));
        assert!(wf.apply_directory(restarted.ticket, Ok(states())));
        assert_eq!(wf.level(), Level::State);
        assert!(wf.progress().state.is_none());
    }

    #[test]
    fn reopened_workflow_rejects_tickets_of_the_previous_one() {
        let mut first = loaded_at_state();
        let karnataka_districts = fetch(first.choose(&"1".into(), Language::En).unwrap());

        let (mut second, states_query) = LocationWorkflow::start(karnataka_districts.ticket.generation);
        assert!(second.apply_directory(states_query.ticket, Ok(states())));
        let maharashtra_districts = fetch(second.choose(&"2".into(), Language::En).unwrap());

        assert_ne!(karnataka_districts.ticket, maharashtra_districts.ticket);
        assert!(!second.apply_directory(
            karnataka_districts.ticket,
            Ok(vec![LocationNode::new("10", "Belgaum")])
        ));
        assert!(second.is_loading());
    }

    #[test]
    fn whitespace_filter_is_a_plain_substring() {
        let (mut wf, query) = LocationWorkflow::start(0);
        wf.apply_directory(
            query.ticket,
            Ok(vec![LocationNode::new("1", "Tamil Nadu"), LocationNode::new("2", "Kerala")]),
        );
        wf.set_filter(" ");
        let names: Vec<_> = wf.visible_nodes(Language::En).iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, vec!["Tamil Nadu"]);
    }

    #[test]
    fn failure_leaves_empty_list_and_offers_retry() {
        let (mut wf, query) = LocationWorkflow::start(0);
        assert_eq!(wf.retry(), None);
        wf.apply_directory(query.ticket, Err(DirectoryError::Status { status: 503 }));
        assert!(wf.visible_nodes(Language::En).is_empty());
        assert_eq!(wf.level(), Level::State);
        let again = wf.retry().unwrap();
        assert_eq!((again.level, again.parent), (Level::State, None));
    }

    #[test]
    fn rechoosing_a_state_clears_deeper_progress() {
        let mut wf = loaded_at_state();
        let q = fetch(wf.choose(&"1".into(), Language::En).unwrap());
        wf.apply_directory(q.ticket, Ok(vec![LocationNode::new("10", "Belgaum")]));
        let _ = wf.choose(&"10".into(), Language::En).unwrap();
        assert!(wf.progress().district.is_some());

        let q = wf.restart();
        wf.apply_directory(q.ticket, Ok(states()));
        let _ = wf.choose(&"2".into(), Language::En).unwrap();
        assert_eq!(wf.progress().state.as_ref().map(|n| n.name.as_str()), Some("Maharashtra"));
        assert_eq!(wf.progress().district, None);
        assert_eq!(wf.progress().taluka, None);
        assert_eq!(wf.level(), Level::District);
    }

    #[test]
    fn filter_matches_canonical_and_localized() {
        let mut wf = loaded_at_state();
        wf.set_filter("KAR");
        let names: Vec<_> = wf.visible_nodes(Language::En).iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, vec!["Karnataka"]);

        wf.set_filter("महा");
        assert_eq!(wf.visible_nodes(Language::Mr).len(), 1);
        assert!(wf.visible_nodes(Language::En).is_empty());
    }

    #[test]
    fn geolocation_only_from_state_step() {
        let mut wf = loaded_at_state();
        assert_eq!(wf.begin_geolocation(), Ok(()));
        assert_eq!(wf.begin_geolocation(), Err(WorkflowError::GeolocationInProgress));

        let coords = Coordinates::new(16.5, 74.5).unwrap();
        assert_eq!(
            wf.finish_geolocation(Ok(coords)),
            GeolocationOutcome::Commit(LocationPatch::coordinates(coords))
        );

        let _ = wf.choose(&"1".into(), Language::En).unwrap();
        assert_eq!(wf.begin_geolocation(), Err(WorkflowError::GeolocationNotOffered));
    }

    #[test]
    fn geolocation_failure_keeps_state_step() {
        let mut wf = loaded_at_state();
        wf.begin_geolocation().unwrap();
        assert_eq!(
            wf.finish_geolocation(Err(GeolocationError::PermissionDenied)),
            GeolocationOutcome::Failed(GeolocationError::PermissionDenied)
        );
        assert_eq!(wf.level(), Level::State);
        assert!(!wf.is_locating());
        assert_eq!(wf.list().nodes().len(), 2);
    }

    #[test]
    fn late_geolocation_after_moving_on_is_ignored() {
        let mut wf = loaded_at_state();
        wf.begin_geolocation().unwrap();
        let _ = wf.choose(&"1".into(), Language::En).unwrap();
        let coords = Coordinates::new(16.5, 74.5).unwrap();
        assert_eq!(wf.finish_geolocation(Ok(coords)), GeolocationOutcome::Ignored);
    }

    proptest! {
        #[test]
        fn clearing_the_filter_restores_the_list(filter in "\\PC{0,6}") {
            let wf = loaded_at_state();
            let original: Vec<LocationNode> = wf.visible_nodes(Language::Hi).into_iter().cloned().collect();

            let mut filtered = wf.clone();
            filtered.set_filter(filter);
            let narrowed = filtered.visible_nodes(Language::Hi).len();
            prop_assert!(narrowed <= original.len());

            filtered.set_filter("");
            let restored: Vec<LocationNode> = filtered.visible_nodes(Language::Hi).into_iter().cloned().collect();
            prop_assert_eq!(restored, original);
        }
    }
}
