use std::collections::HashMap;

use tracing::{info, warn};

use crate::color::{Domain, Rgb, SequentialScale, NO_DATA_FILL};
use crate::data::{Dataset, Metadata};
use crate::grid::Grid;

/// Which rendering of the active dataset is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    Flux,
    Change,
    HeightMap,
}

/// The installed dataset and everything derived from it.
///
/// A dataset is swapped in atomically: the grid and its color domain are
/// computed first and assigned together, so a renderer never sees a new
/// grid with a stale domain. A grid whose valid subset is empty installs
/// with no domain; renderers then have nothing to color and the legend is
/// suppressed, but the rest of the UI keeps working.
pub struct VisualizationSession {
    pub mode: MapMode,
    grid: Option<Grid>,
    domain: Option<Domain>,
    pub metadata: Option<Metadata>,
    pub dataset_name: Option<String>,
    /// Resting fill per country, recorded by the last change-mode paint.
    pub country_colors: HashMap<String, Rgb>,
}

impl VisualizationSession {
    pub fn new() -> Self {
        Self {
            mode: MapMode::Flux,
            grid: None,
            domain: None,
            metadata: None,
            dataset_name: None,
            country_colors: HashMap::new(),
        }
    }

    pub fn install(&mut self, dataset: Dataset) {
        let domain = match Domain::from_values(dataset.grid.values()) {
            Ok(domain) => Some(domain),
            Err(e) => {
                warn!(dataset = %dataset.name, error = %e, "dataset has no valid samples");
                None
            }
        };
        info!(
            dataset = %dataset.name,
            valid = dataset.grid.valid_values().count(),
            ?domain,
            "dataset installed"
        );
        self.grid = Some(dataset.grid);
        self.domain = domain;
        self.metadata = dataset.metadata;
        self.dataset_name = Some(dataset.name);
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn domain(&self) -> Option<Domain> {
        self.domain
    }

    pub fn sequential_scale(&self) -> Option<SequentialScale> {
        self.domain.map(SequentialScale::new)
    }

    /// The color a country rests at in the current mode, used to repaint
    /// after a hover or selection highlight. Only the change choropleth
    /// has per-country resting fills.
    pub fn resting_fill_of(&self, name: &str) -> Option<Rgb> {
        match self.mode {
            MapMode::Change => Some(
                self.country_colors
                    .get(name)
                    .copied()
                    .unwrap_or(NO_DATA_FILL),
            ),
            MapMode::Flux | MapMode::HeightMap => None,
        }
    }
}

impl Default for VisualizationSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SENTINEL;

    fn bytes(vals: &[f32]) -> Vec<u8> {
        vals.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn dataset(vals: &[f32]) -> Dataset {
        let grid = Grid::from_payloads(
            &bytes(&[-45.0, 45.0]),
            &bytes(&[-90.0, 90.0]),
            &bytes(vals),
        )
        .unwrap();
        Dataset {
            name: "test".into(),
            grid,
            metadata: None,
        }
    }

    #[test]
    fn test_install_computes_domain() {
        let mut session = VisualizationSession::new();
        session.install(dataset(&[1.0, SENTINEL, 3.0, f32::NAN]));
        assert_eq!(session.domain(), Some(Domain { min: 1.0, max: 3.0 }));
        assert!(session.grid().is_some());
    }

    #[test]
    fn test_all_invalid_installs_without_domain() {
        let mut session = VisualizationSession::new();
        session.install(dataset(&[SENTINEL, SENTINEL, f32::NAN, SENTINEL]));
        assert!(session.grid().is_some());
        assert_eq!(session.domain(), None);
        assert!(session.sequential_scale().is_none());
    }

    #[test]
    fn test_reinstall_replaces_domain_with_grid() {
        let mut session = VisualizationSession::new();
        session.install(dataset(&[1.0, 2.0, 3.0, 4.0]));
        session.install(dataset(&[10.0, 20.0, 30.0, 40.0]));
        assert_eq!(session.domain(), Some(Domain { min: 10.0, max: 40.0 }));
    }

    #[test]
    fn test_resting_fill_only_in_change_mode() {
        let mut session = VisualizationSession::new();
        session
            .country_colors
            .insert("Squareland".into(), Rgb(1, 2, 3));
        assert_eq!(session.resting_fill_of("Squareland"), None);
        session.mode = MapMode::Change;
        assert_eq!(session.resting_fill_of("Squareland"), Some(Rgb(1, 2, 3)));
        assert_eq!(session.resting_fill_of("Atlantis"), Some(NO_DATA_FILL));
    }
}
