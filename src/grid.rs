use thiserror::Error;

/// Sentinel used by the exporter to mark cells with no data.
pub const SENTINEL: f32 = -99.0;

/// A sample is valid when it is neither the sentinel nor NaN.
#[inline(always)]
pub fn is_valid(v: f32) -> bool {
    v != SENTINEL && !v.is_nan()
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("payload length {0} is not a multiple of 4 bytes")]
    Misaligned(usize),
    #[error("value grid has {values} samples, expected {expected} ({lats} lats x {lons} lons)")]
    ShapeMismatch {
        values: usize,
        expected: usize,
        lats: usize,
        lons: usize,
    },
}

/// Decode a densely packed sequence of little-endian IEEE-754 f32s.
pub fn decode_axis(bytes: &[u8]) -> Result<Vec<f32>, DecodeError> {
    if bytes.len() % 4 != 0 {
        return Err(DecodeError::Misaligned(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// A decoded global grid: latitude axis, longitude axis, and a row-major
/// (lat-major, lon-minor) value plane.
///
/// The invariant `values.len() == lats.len() * lons.len()` holds for every
/// constructed Grid; a grid can only exist fully populated, so no renderer
/// can ever observe a partial one.
#[derive(Debug)]
pub struct Grid {
    lats: Vec<f32>,
    lons: Vec<f32>,
    values: Vec<f32>,
}

impl Grid {
    /// Decode the three binary payloads of a dataset and validate the shape.
    pub fn from_payloads(lat: &[u8], lon: &[u8], values: &[u8]) -> Result<Self, DecodeError> {
        let lats = decode_axis(lat)?;
        let lons = decode_axis(lon)?;
        let values = decode_axis(values)?;
        let expected = lats.len() * lons.len();
        if values.len() != expected {
            return Err(DecodeError::ShapeMismatch {
                values: values.len(),
                expected,
                lats: lats.len(),
                lons: lons.len(),
            });
        }
        Ok(Self { lats, lons, values })
    }

    pub fn height(&self) -> usize {
        self.lats.len()
    }

    pub fn width(&self) -> usize {
        self.lons.len()
    }

    #[inline(always)]
    pub fn lat(&self, lat_idx: usize) -> f64 {
        self.lats[lat_idx] as f64
    }

    #[inline(always)]
    pub fn lon(&self, lon_idx: usize) -> f64 {
        self.lons[lon_idx] as f64
    }

    #[inline(always)]
    pub fn value_at(&self, lat_idx: usize, lon_idx: usize) -> f32 {
        self.values[lat_idx * self.lons.len() + lon_idx]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// The samples that carry data, sentinel and NaN cells excluded.
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied().filter(|&v| is_valid(v))
    }
}
