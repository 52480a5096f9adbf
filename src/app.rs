use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{error, info};

use crate::canvas::PixelCanvas;
use crate::color::{DivergingScale, Domain, Rgb};
use crate::data::{self, CountryShape, CountryYear};
use crate::map::geometry::fill_rings;
use crate::map::heightfield::HeightField;
use crate::map::projection::{Projector, NATIVE_HEIGHT, NATIVE_WIDTH};
use crate::map::raster;
use crate::map::scene::HeightFieldScene;
use crate::map::spatial::{point_in_rings, FeatureGrid};
use crate::map::viewport::Viewport;
use crate::session::{MapMode, VisualizationSession};

/// Index cell size in degrees for the country lookup grid.
const INDEX_CELL_DEGREES: f64 = 10.0;
/// Hover highlight fill in the change choropleth.
const HOVER_FILL: Rgb = Rgb(255, 165, 0);

/// Details of the country the user last clicked.
pub struct SelectedCountry {
    pub name: String,
    pub change_pct: Option<f64>,
    pub emissions: Option<f64>,
    pub prev_emissions: Option<f64>,
}

/// Application state.
pub struct App {
    pub session: VisualizationSession,
    pub viewport: Viewport,
    projector: Projector,
    /// Native-resolution raster the viewport samples from.
    pub surface: PixelCanvas,
    countries: Vec<CountryShape>,
    country_index: FeatureGrid,
    /// Country rings pre-projected to native pixels, parallel to `countries`.
    projected_rings: Vec<Vec<Vec<(f64, f64)>>>,
    /// The same rings flattened, for the border overlay.
    pub borders_native: Vec<Vec<(f64, f64)>>,
    hovered: Option<usize>,
    changes: HashMap<String, f64>,
    /// Domain of the percent-change values; the choropleth and its legend
    /// anchor here, not on the flux grid's domain.
    change_domain: Option<Domain>,
    country_year: HashMap<String, CountryYear>,
    pub scene: Option<HeightFieldScene>,
    datasets: Vec<PathBuf>,
    dataset_idx: usize,
    pub selected: Option<SelectedCountry>,
    /// Marker in (lon, lat), shared by the 2-D and 3-D views.
    pub marker: Option<(f64, f64)>,
    pub notice: Option<String>,
    /// Mouse position in map pixel coordinates.
    pub mouse_px: Option<(f64, f64)>,
    /// Map widget pixel size, recorded at render time for mouse mapping.
    pub map_pixel_size: (f64, f64),
    /// Map widget origin in terminal cells, recorded at render time.
    pub map_origin: (u16, u16),
    fitted: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(data_root: &Path) -> Result<Self> {
        let datasets = data::discover_datasets(data_root);
        if datasets.is_empty() {
            return Err(anyhow!(
                "no datasets under {} (expected fluxes.bin alongside lat.bin and lon.bin)",
                data_root.display()
            ));
        }

        let mut session = VisualizationSession::new();
        let first = data::load_dataset(&datasets[0])
            .with_context(|| format!("loading {}", datasets[0].display()))?;
        session.install(first);

        let mut notice = None;
        let countries = match data::load_world(&data_root.join("world.geojson")) {
            Ok(countries) => countries,
            Err(e) => {
                error!(error = %e, "world polygons unavailable");
                notice = Some("world.geojson missing: borders and picking disabled".to_string());
                Vec::new()
            }
        };
        let country_index =
            FeatureGrid::build(countries.iter().map(|c| c.bbox), INDEX_CELL_DEGREES);
        let changes = data::load_changes(&data_root.join("yearly_change.json")).unwrap_or_default();
        let change_domain = changes
            .values()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| {
                Some(match acc {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                })
            })
            .map(|(lo, hi)| Domain {
                min: lo as f32,
                max: hi as f32,
            });
        let country_year =
            data::load_country_year(&data_root.join("country_year.json")).unwrap_or_default();

        let projector = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        let projected_rings: Vec<Vec<Vec<(f64, f64)>>> = countries
            .iter()
            .map(|c| {
                c.rings
                    .iter()
                    .map(|ring| {
                        ring.iter()
                            .map(|&(lon, lat)| projector.project(lon, lat))
                            .collect()
                    })
                    .collect()
            })
            .collect();
        let borders_native = projected_rings.iter().flatten().cloned().collect();

        let mut app = Self {
            session,
            viewport: Viewport::new(),
            projector,
            surface: PixelCanvas::new(NATIVE_WIDTH, NATIVE_HEIGHT),
            countries,
            country_index,
            projected_rings,
            borders_native,
            hovered: None,
            changes,
            change_domain,
            country_year,
            scene: None,
            datasets,
            dataset_idx: 0,
            selected: None,
            marker: None,
            notice,
            mouse_px: None,
            map_pixel_size: (0.0, 0.0),
            map_origin: (0, 0),
            fitted: false,
            should_quit: false,
        };
        app.repaint();
        Ok(app)
    }

    /// Repaint the native surface for the current mode. The relief mode
    /// renders per frame from its scene instead of the shared surface.
    pub fn repaint(&mut self) {
        self.hovered = None;
        match self.session.mode {
            MapMode::Flux => {
                let (Some(grid), Some(scale)) = (self.session.grid(), self.session.sequential_scale())
                else {
                    self.surface.clear();
                    return;
                };
                raster::paint_flux(&mut self.surface, grid, &scale, &self.projector);
            }
            MapMode::Change => {
                let Some(domain) = self.change_domain else {
                    self.surface.clear();
                    return;
                };
                let scale = DivergingScale::new(domain);
                raster::paint_change(
                    &mut self.surface,
                    &self.countries,
                    &self.changes,
                    &scale,
                    &self.projector,
                    &mut self.session.country_colors,
                );
            }
            MapMode::HeightMap => {}
        }
    }

    /// Switch mode, building or dropping the 3-D scene as needed. A grid
    /// too small to mesh refuses the switch and leaves the current view up.
    pub fn set_mode(&mut self, mode: MapMode) {
        if mode == self.session.mode {
            return;
        }
        if mode == MapMode::HeightMap {
            let (Some(grid), Some(scale)) = (self.session.grid(), self.session.sequential_scale())
            else {
                self.notice = Some("no colorable data to build a relief from".to_string());
                return;
            };
            let border_lines: Vec<Vec<(f64, f64)>> = self
                .countries
                .iter()
                .flat_map(|c| c.rings.clone())
                .collect();
            match HeightField::build_preferred(grid, &scale) {
                Ok(mesh) => {
                    self.scene = Some(HeightFieldScene::new(mesh, &border_lines, self.marker));
                }
                Err(e) => {
                    error!(error = %e, "relief unavailable");
                    self.notice = Some(format!("relief unavailable: {e}"));
                    return;
                }
            }
        } else {
            self.scene = None;
        }
        self.session.mode = mode;
        self.notice = None;
        self.repaint();
    }

    /// Load the next dataset in discovery order. On failure the previous
    /// dataset stays installed and on screen.
    pub fn cycle_dataset(&mut self) {
        if self.datasets.len() < 2 {
            return;
        }
        let next = (self.dataset_idx + 1) % self.datasets.len();
        match data::load_dataset(&self.datasets[next]) {
            Ok(dataset) => {
                self.dataset_idx = next;
                self.session.install(dataset);
                self.selected = None;
                self.notice = None;
                if self.session.mode == MapMode::HeightMap {
                    // Rebuild the mesh for the new grid, dropping back to
                    // the flux view if the new grid cannot be meshed.
                    self.scene = None;
                    self.session.mode = MapMode::Flux;
                    self.set_mode(MapMode::HeightMap);
                }
                self.repaint();
                info!(idx = next, "switched dataset");
            }
            Err(e) => {
                error!(path = %self.datasets[next].display(), error = %e, "dataset load failed");
                self.notice = Some(format!("load failed, keeping current dataset: {e:#}"));
            }
        }
    }

    /// Fit the 2-D view on first draw and on explicit reset.
    pub fn ensure_fitted(&mut self, view_w: f64, view_h: f64) {
        if !self.fitted && view_w > 0.0 && view_h > 0.0 {
            self.viewport
                .fit(view_w, view_h, NATIVE_WIDTH as f64, NATIVE_HEIGHT as f64);
            self.fitted = true;
        }
    }

    pub fn reset_view(&mut self) {
        self.fitted = false;
        if let Some(scene) = &mut self.scene {
            scene.camera = Default::default();
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.mouse_px = Some((x, y));
        // The relief view orbits instead of panning; its drags never touch
        // the 2-D transform, so the pan state survives a round trip.
        if self.session.mode != MapMode::HeightMap {
            self.viewport.pointer_down(x, y);
        }
    }

    pub fn pointer_drag(&mut self, x: f64, y: f64) {
        let prev = self.mouse_px.replace((x, y));
        if self.session.mode == MapMode::HeightMap {
            if let (Some(scene), Some((px, py))) = (&mut self.scene, prev) {
                scene.camera.rotate_drag(x - px, y - py);
            }
        } else {
            self.viewport.pointer_move(x, y);
        }
    }

    /// Release the pointer; a release without movement is a pick.
    pub fn pointer_up(&mut self, x: f64, y: f64) {
        let moved = self.viewport.pointer_up();
        if !moved && self.session.mode != MapMode::HeightMap {
            self.pick_country(x, y);
        }
    }

    pub fn pointer_leave(&mut self) {
        self.mouse_px = None;
        self.viewport.pointer_leave();
    }

    pub fn wheel(&mut self, x: f64, y: f64, zoom_in: bool) {
        if self.session.mode == MapMode::HeightMap {
            if let Some(scene) = &mut self.scene {
                scene.camera.dolly(zoom_in);
            }
        } else {
            self.viewport.wheel(x, y, zoom_in);
        }
    }

    /// Track the mouse and, in the change choropleth, highlight the country
    /// under it. Leaving a country repaints it with its resting fill.
    pub fn hover(&mut self, pixel: Option<(f64, f64)>) {
        self.mouse_px = pixel;
        if self.session.mode != MapMode::Change || self.change_domain.is_none() {
            return;
        }
        let hit = pixel.and_then(|(x, y)| {
            let (nx, ny) = self.viewport.screen_to_native(x, y);
            let (lon, lat) = self.projector.unproject(nx, ny)?;
            self.country_index
                .query_point(lon, lat)
                .iter()
                .copied()
                .find(|&idx| point_in_rings(lon, lat, &self.countries[idx].rings))
        });
        if hit == self.hovered {
            return;
        }
        if let Some(prev) = self.hovered.take() {
            if let Some(color) = self.session.resting_fill_of(&self.countries[prev].name) {
                fill_rings(&mut self.surface, &self.projected_rings[prev], color);
            }
        }
        if let Some(idx) = hit {
            fill_rings(&mut self.surface, &self.projected_rings[idx], HOVER_FILL);
        }
        self.hovered = hit;
    }

    /// Drop or move the location marker to the current mouse position.
    pub fn place_marker(&mut self) {
        let Some((x, y)) = self.mouse_px else {
            return;
        };
        if self.session.mode == MapMode::HeightMap {
            return;
        }
        let (nx, ny) = self.viewport.screen_to_native(x, y);
        if let Some((lon, lat)) = self.projector.unproject(nx, ny) {
            self.marker = Some((lon, lat));
            if let Some(scene) = &mut self.scene {
                scene.set_marker(self.marker);
            }
        }
    }

    fn pick_country(&mut self, x: f64, y: f64) {
        let (nx, ny) = self.viewport.screen_to_native(x, y);
        let Some((lon, lat)) = self.projector.unproject(nx, ny) else {
            self.selected = None;
            return;
        };
        let hit = self
            .country_index
            .query_point(lon, lat)
            .iter()
            .copied()
            .find(|&idx| point_in_rings(lon, lat, &self.countries[idx].rings));
        self.selected = hit.map(|idx| {
            let name = self.countries[idx].name.clone();
            let year = self.country_year.get(&name);
            SelectedCountry {
                change_pct: self.changes.get(&name).copied(),
                emissions: year.and_then(|y| y.emissions),
                prev_emissions: year.and_then(|y| y.prev_emissions),
                name,
            }
        });
    }

    /// Keyboard panning. In the relief view the same keys orbit the camera.
    pub fn pan_key(&mut self, dx: f64, dy: f64) {
        if self.session.mode == MapMode::HeightMap {
            if let Some(scene) = &mut self.scene {
                scene.camera.rotate_drag(dx, dy);
            }
        } else {
            self.viewport.pan(dx, dy);
        }
    }

    /// Keyboard zoom, anchored at the map center.
    pub fn zoom_key(&mut self, zoom_in: bool) {
        let (w, h) = self.map_pixel_size;
        self.wheel(w / 2.0, h / 2.0, zoom_in);
    }

    pub fn change_domain(&self) -> Option<Domain> {
        self.change_domain
    }

    /// (lon, lat) to native surface pixels.
    pub fn project_native(&self, lon: f64, lat: f64) -> (f64, f64) {
        self.projector.project(lon, lat)
    }

    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
