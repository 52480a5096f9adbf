use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geojson::{GeoJson, Value};
use serde::Deserialize;
use tracing::{info, warn};

use crate::grid::Grid;

/// Per-dataset metadata exported alongside the binary payloads.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Metadata {
    pub substance: Option<String>,
    pub year: Option<i32>,
    pub release: Option<String>,
    pub global_total: Option<f64>,
    pub units: Option<String>,
    #[serde(rename = "ChunkSizes")]
    pub chunk_sizes: Option<Vec<u64>>,
}

/// Emissions for a country in the dataset's year and the year before.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CountryYear {
    pub emissions: Option<f64>,
    pub prev_emissions: Option<f64>,
}

/// A country polygon set: all rings (exteriors and holes) flattened, plus
/// the lon/lat bounding box for spatial indexing.
pub struct CountryShape {
    pub name: String,
    pub rings: Vec<Vec<(f64, f64)>>,
    pub bbox: (f64, f64, f64, f64),
}

/// A fully decoded dataset, ready to install into the session.
pub struct Dataset {
    pub name: String,
    pub grid: Grid,
    pub metadata: Option<Metadata>,
}

/// Read and join the three binary payloads of one dataset directory.
/// The Grid is only constructed once all three have decoded, so no
/// consumer can ever observe a partially populated dataset.
pub fn load_dataset(dir: &Path) -> Result<Dataset> {
    let lat = fs::read(dir.join("lat.bin")).context("reading lat.bin")?;
    let lon = fs::read(dir.join("lon.bin")).context("reading lon.bin")?;
    let values = fs::read(dir.join("fluxes.bin")).context("reading fluxes.bin")?;
    let grid = Grid::from_payloads(&lat, &lon, &values).context("decoding payloads")?;

    let metadata = match fs::read(dir.join("metadata.json")) {
        Ok(mut bytes) => match simd_json::serde::from_slice::<Metadata>(&mut bytes) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "unreadable metadata.json, ignoring");
                None
            }
        },
        Err(_) => None,
    };

    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    info!(
        dataset = %name,
        height = grid.height(),
        width = grid.width(),
        "dataset loaded"
    );
    Ok(Dataset {
        name,
        grid,
        metadata,
    })
}

/// Dataset directories under the root: the root itself when it carries a
/// value payload, plus any immediate subdirectory that does, sorted by name.
pub fn discover_datasets(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if root.join("fluxes.bin").exists() {
        found.push(root.to_path_buf());
    }
    if let Ok(entries) = fs::read_dir(root) {
        let mut subs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir() && p.join("fluxes.bin").exists())
            .collect();
        subs.sort();
        found.extend(subs);
    }
    found
}

/// Load world country polygons from GeoJSON.
pub fn load_world(path: &Path) -> Result<Vec<CountryShape>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_world(&content)
}

pub fn parse_world(content: &str) -> Result<Vec<CountryShape>> {
    let geojson: GeoJson = content.parse().context("parsing world GeoJSON")?;
    let mut countries = Vec::new();

    if let GeoJson::FeatureCollection(fc) = geojson {
        for feature in fc.features {
            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get("ADMIN").or_else(|| p.get("name")))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string();

            let Some(geometry) = feature.geometry else {
                continue;
            };
            let mut rings: Vec<Vec<(f64, f64)>> = Vec::new();
            match geometry.value {
                Value::Polygon(polygon) => collect_rings(&polygon, &mut rings),
                Value::MultiPolygon(polygons) => {
                    for polygon in &polygons {
                        collect_rings(polygon, &mut rings);
                    }
                }
                _ => continue,
            }
            if rings.is_empty() {
                continue;
            }

            let mut bbox = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
            for ring in &rings {
                for &(lon, lat) in ring {
                    bbox.0 = bbox.0.min(lon);
                    bbox.1 = bbox.1.min(lat);
                    bbox.2 = bbox.2.max(lon);
                    bbox.3 = bbox.3.max(lat);
                }
            }
            countries.push(CountryShape { name, rings, bbox });
        }
    }
    Ok(countries)
}

fn collect_rings(polygon: &[Vec<Vec<f64>>], rings: &mut Vec<Vec<(f64, f64)>>) {
    for ring in polygon {
        let pts: Vec<(f64, f64)> = ring
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect();
        if pts.len() >= 3 {
            rings.push(pts);
        }
    }
}

/// Year-indexed change map: country name -> percent change in emissions.
pub fn load_changes(path: &Path) -> Result<HashMap<String, f64>> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    simd_json::serde::from_slice(&mut bytes).context("parsing change map")
}

/// Per-country emissions for the dataset's year.
pub fn load_country_year(path: &Path) -> Result<HashMap<String, CountryYear>> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    simd_json::serde::from_slice(&mut bytes).context("parsing country-year data")
}
