use serde::Serialize;

use crate::engine::Phase;
use crate::geo::GeoCoordinate;

/// Snapshot of the compass handed to the presentation layer.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CompassView {
    pub phase: Phase,
    /// Signed bearing toward the Kaaba; `None` until a location is known.
    pub qibla_bearing: Option<f64>,
    pub location: Option<GeoCoordinate>,
    pub compass_direction_label: &'static str,
    /// Screen-aligned heading in whole degrees.
    pub heading_degrees: f64,
    pub compass_rotate: f64,
    /// `None` until a location is known.
    pub target_rotate: Option<f64>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub using_fallback_location: bool,
}

impl CompassView {
    /// The text lines of the compass screen, top to bottom.
    pub fn render_lines(&self) -> Vec<String> {
        if self.is_loading {
            return vec!["Loading...".to_owned()];
        }

        let mut lines = Vec::with_capacity(4);
        if let Some(error) = &self.error {
            lines.push(format!("Error: {error}"));
        }
        lines.push(self.compass_direction_label.to_owned());
        lines.push(format!("{}°", self.heading_degrees));
        if let Some(bearing) = self.qibla_bearing {
            lines.push(format!("Qibla {bearing:.2}°"));
        }
        lines
    }
}
