//! AR plane detection state
//!
//! The AR toolkit reports the full set of tracked planes on every frame. The
//! detector filters them by the configured plane types and diffs each snapshot
//! against the previous one to produce added/updated/removed events.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::PlaneError;
use crate::event::SceneEvent;
use crate::props::Properties;

pub const PLANE_TYPE: &str = "planeType";
pub const PLANE_TYPE_HORIZONTAL: &str = "horizontal";
pub const PLANE_TYPE_VERTICAL: &str = "vertical";

/// Orientation of a detected plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneType {
    #[serde(rename = "HORIZONTAL_UPWARD_FACING")]
    HorizontalUpward,
    #[serde(rename = "HORIZONTAL_DOWNWARD_FACING")]
    HorizontalDownward,
    #[serde(rename = "VERTICAL")]
    Vertical,
}

impl PlaneType {
    pub const ALL: &'static [PlaneType] = &[
        PlaneType::Vertical,
        PlaneType::HorizontalUpward,
        PlaneType::HorizontalDownward,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaneType::HorizontalUpward => "HORIZONTAL_UPWARD_FACING",
            PlaneType::HorizontalDownward => "HORIZONTAL_DOWNWARD_FACING",
            PlaneType::Vertical => "VERTICAL",
        }
    }
}

/// A tracked plane in world coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub id: String,
    #[serde(rename = "type")]
    pub plane_type: PlaneType,
    pub center: [f32; 3],
    /// Polygon outline, already transformed to world space
    #[serde(default)]
    pub vertices: Vec<[f32; 3]>,
}

impl Plane {
    /// Script-facing payload (`{id, type, center, vertices}`)
    pub fn payload(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("type".to_string(), Value::String(self.plane_type.as_str().to_string()));
        map.insert("center".to_string(), json!(self.center));
        map.insert("vertices".to_string(), json!(self.vertices));
        map
    }
}

/// Set of plane types to report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneConfig {
    pub types: Vec<PlaneType>,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self::all()
    }
}

impl PlaneConfig {
    pub fn all() -> Self {
        Self {
            types: PlaneType::ALL.to_vec(),
        }
    }

    /// Parse from `{planeType: ["horizontal", "vertical"]}`
    ///
    /// An absent key selects every type; unknown names are skipped.
    pub fn from_props(props: &Properties) -> Self {
        match props.read_str_list(PLANE_TYPE) {
            Some(names) => Self::from_names(names.as_slice()),
            None => Self::all(),
        }
    }

    /// Parse a list of `"horizontal"` / `"vertical"` names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut types = Vec::new();
        for name in names {
            let expanded: &[PlaneType] = match name.as_ref() {
                PLANE_TYPE_HORIZONTAL => &[PlaneType::HorizontalDownward, PlaneType::HorizontalUpward],
                PLANE_TYPE_VERTICAL => &[PlaneType::Vertical],
                _ => &[],
            };
            for plane_type in expanded {
                if !types.contains(plane_type) {
                    types.push(*plane_type);
                }
            }
        }
        Self { types }
    }

    pub fn accepts(&self, plane_type: PlaneType) -> bool {
        self.types.contains(&plane_type)
    }
}

/// Kind of plane event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneEventKind {
    #[serde(rename = "onPlaneDetected")]
    Added,
    #[serde(rename = "onPlaneUpdated")]
    Updated,
    #[serde(rename = "onPlaneRemoved")]
    Removed,
    #[serde(rename = "onPlaneTapped")]
    Tapped,
}

impl PlaneEventKind {
    pub const ALL: &'static [PlaneEventKind] = &[
        PlaneEventKind::Added,
        PlaneEventKind::Updated,
        PlaneEventKind::Removed,
        PlaneEventKind::Tapped,
    ];

    pub fn event_name(&self) -> &'static str {
        match self {
            PlaneEventKind::Added => "onPlaneDetected",
            PlaneEventKind::Updated => "onPlaneUpdated",
            PlaneEventKind::Removed => "onPlaneRemoved",
            PlaneEventKind::Tapped => "onPlaneTapped",
        }
    }

    /// Parse the event name or the `addOn<Name>EventHandler` method name
    pub fn parse(name: &str) -> Option<PlaneEventKind> {
        let name = name
            .strip_prefix("add")
            .and_then(|n| n.strip_suffix("EventHandler"))
            .map(|n| n.replacen("On", "on", 1))
            .unwrap_or_else(|| name.to_string());
        PlaneEventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.event_name() == name)
    }
}

impl std::fmt::Display for PlaneEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

/// A change in the set of tracked planes
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneEvent {
    pub kind: PlaneEventKind,
    pub plane: Plane,
    /// Hit point, taps only
    pub point: Option<[f32; 3]>,
}

impl PlaneEvent {
    fn new(kind: PlaneEventKind, plane: Plane) -> Self {
        Self {
            kind,
            plane,
            point: None,
        }
    }

    pub fn payload(&self) -> Map<String, Value> {
        let mut map = self.plane.payload();
        if let Some(point) = self.point {
            map.insert("point".to_string(), json!(point));
        }
        map
    }

    pub fn to_scene_event(&self) -> SceneEvent {
        SceneEvent::global(self.kind.event_name(), self.payload())
    }
}

/// Tracks the last plane snapshot and the detection configuration
#[derive(Debug, Default)]
pub struct PlaneDetector {
    detecting: bool,
    config: PlaneConfig,
    /// Last filtered snapshot, `None` until the first non-empty update
    last: Option<Vec<Plane>>,
}

impl PlaneDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_detecting(&mut self, config: PlaneConfig) {
        info!(types = ?config.types, "Plane detection started");
        self.config = config;
        self.detecting = true;
    }

    pub fn stop_detecting(&mut self) {
        if self.detecting {
            info!("Plane detection stopped");
        }
        self.detecting = false;
    }

    pub fn is_detecting(&self) -> bool {
        self.detecting
    }

    pub fn config(&self) -> &PlaneConfig {
        &self.config
    }

    /// Diff a new frame of tracked planes against the previous one
    pub fn on_planes_update(&mut self, planes: Vec<Plane>) -> Vec<PlaneEvent> {
        if planes.is_empty() {
            return Vec::new();
        }

        let filtered: Vec<Plane> = planes
            .into_iter()
            .filter(|p| self.config.accepts(p.plane_type))
            .collect();

        let previous = match self.last.take() {
            Some(previous) => previous,
            None => {
                let events = filtered
                    .iter()
                    .cloned()
                    .map(|p| PlaneEvent::new(PlaneEventKind::Added, p))
                    .collect();
                self.last = Some(filtered);
                return events;
            }
        };

        let mut events = Vec::new();
        for plane in &filtered {
            match previous.iter().find(|p| p.id == plane.id) {
                None => events.push(PlaneEvent::new(PlaneEventKind::Added, plane.clone())),
                Some(old) if old != plane => {
                    events.push(PlaneEvent::new(PlaneEventKind::Updated, plane.clone()))
                }
                Some(_) => {}
            }
        }
        for old in &previous {
            if !filtered.iter().any(|p| p.id == old.id) {
                events.push(PlaneEvent::new(PlaneEventKind::Removed, old.clone()));
            }
        }

        if !events.is_empty() {
            debug!(events = events.len(), tracked = filtered.len(), "Planes changed");
        }
        self.last = Some(filtered);
        events
    }

    pub fn on_plane_tapped(&self, plane: Plane, point: [f32; 3]) -> PlaneEvent {
        PlaneEvent {
            kind: PlaneEventKind::Tapped,
            plane,
            point: Some(point),
        }
    }

    /// Planes of the last snapshot matching `config`
    pub fn all_planes(&self, config: &PlaneConfig) -> Result<Vec<Plane>, PlaneError> {
        if !self.detecting {
            return Err(PlaneError::NotDetecting);
        }
        match &self.last {
            Some(planes) if !planes.is_empty() => Ok(planes
                .iter()
                .filter(|p| config.accepts(p.plane_type))
                .cloned()
                .collect()),
            _ => Err(PlaneError::NoPlanes),
        }
    }

    /// Forget the tracked planes, detection state is kept
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Release the AR session state
    pub fn destroy(&mut self) {
        self.last = None;
        self.detecting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(id: &str, plane_type: PlaneType, x: f32) -> Plane {
        Plane {
            id: id.to_string(),
            plane_type,
            center: [x, 0.0, 0.0],
            vertices: vec![[x, 0.0, 1.0], [x + 2.0, 0.0, 3.0]],
        }
    }

    fn kinds(events: &[PlaneEvent]) -> Vec<(PlaneEventKind, String)> {
        events.iter().map(|e| (e.kind, e.plane.id.clone())).collect()
    }

    #[test]
    fn test_config_from_props() {
        let props = Properties::from_json(serde_json::json!({"planeType": ["horizontal"]})).unwrap();
        let config = PlaneConfig::from_props(&props);
        assert!(config.accepts(PlaneType::HorizontalUpward));
        assert!(config.accepts(PlaneType::HorizontalDownward));
        assert!(!config.accepts(PlaneType::Vertical));

        assert_eq!(PlaneConfig::from_props(&Properties::new()), PlaneConfig::all());
    }

    #[test]
    fn test_first_update_reports_all_added() {
        let mut detector = PlaneDetector::new();
        detector.start_detecting(PlaneConfig::all());

        assert!(detector.on_planes_update(Vec::new()).is_empty());

        let events = detector.on_planes_update(vec![
            plane("a", PlaneType::Vertical, 0.0),
            plane("b", PlaneType::HorizontalUpward, 1.0),
        ]);
        assert_eq!(
            kinds(&events),
            vec![
                (PlaneEventKind::Added, "a".to_string()),
                (PlaneEventKind::Added, "b".to_string())
            ]
        );
    }

    #[test]
    fn test_later_updates_are_diffed() {
        let mut detector = PlaneDetector::new();
        detector.start_detecting(PlaneConfig::all());
        detector.on_planes_update(vec![
            plane("a", PlaneType::Vertical, 0.0),
            plane("b", PlaneType::Vertical, 1.0),
        ]);

        let events = detector.on_planes_update(vec![
            plane("a", PlaneType::Vertical, 0.0),
            plane("b", PlaneType::Vertical, 5.0),
            plane("c", PlaneType::Vertical, 2.0),
        ]);
        assert_eq!(
            kinds(&events),
            vec![
                (PlaneEventKind::Updated, "b".to_string()),
                (PlaneEventKind::Added, "c".to_string())
            ]
        );

        let events = detector.on_planes_update(vec![plane("c", PlaneType::Vertical, 2.0)]);
        assert_eq!(
            kinds(&events),
            vec![
                (PlaneEventKind::Removed, "a".to_string()),
                (PlaneEventKind::Removed, "b".to_string())
            ]
        );
    }

    #[test]
    fn test_updates_filtered_by_config() {
        let mut detector = PlaneDetector::new();
        detector.start_detecting(PlaneConfig::from_names(&["vertical"]));

        let events = detector.on_planes_update(vec![
            plane("floor", PlaneType::HorizontalUpward, 0.0),
            plane("wall", PlaneType::Vertical, 1.0),
        ]);
        assert_eq!(kinds(&events), vec![(PlaneEventKind::Added, "wall".to_string())]);
    }

    #[test]
    fn test_all_planes_errors() {
        let mut detector = PlaneDetector::new();
        assert_eq!(
            detector.all_planes(&PlaneConfig::all()),
            Err(PlaneError::NotDetecting)
        );

        detector.start_detecting(PlaneConfig::all());
        assert_eq!(detector.all_planes(&PlaneConfig::all()), Err(PlaneError::NoPlanes));

        detector.on_planes_update(vec![
            plane("floor", PlaneType::HorizontalUpward, 0.0),
            plane("wall", PlaneType::Vertical, 1.0),
        ]);
        let walls = detector
            .all_planes(&PlaneConfig::from_names(&["vertical"]))
            .unwrap();
        assert_eq!(walls.len(), 1);
        assert_eq!(walls[0].id, "wall");

        detector.destroy();
        assert!(!detector.is_detecting());
        assert_eq!(
            detector.all_planes(&PlaneConfig::all()),
            Err(PlaneError::NotDetecting)
        );
    }

    #[test]
    fn test_tap_payload_has_point() {
        let detector = PlaneDetector::new();
        let event = detector.on_plane_tapped(plane("a", PlaneType::Vertical, 0.0), [1.0, 2.0, 3.0]);
        let scene_event = event.to_scene_event();

        assert_eq!(scene_event.name, "onPlaneTapped");
        assert_eq!(scene_event.args["type"], "VERTICAL");
        assert_eq!(scene_event.args["point"], serde_json::json!([1.0, 2.0, 3.0]));
        assert_eq!(scene_event.args["vertices"][1], serde_json::json!([2.0, 0.0, 3.0]));
    }
}
