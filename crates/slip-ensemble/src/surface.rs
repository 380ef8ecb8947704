//! Seafloor deformation surfaces derived from subfault slips.
//!
//! The built-in [`SubfaultSurface`] is a smooth deterministic surrogate of an
//! elastic half-space solution. Production deformation models plug in through
//! [`SurfaceGenerator`].

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use slip_core::errors::ErrorInfo;
use slip_core::ParameterVector;

const METRES_PER_DEGREE: f64 = 111_320.0;
const MAX_GRID_POINTS: usize = 4_000_000;

/// Planar fault shared by every run; each parameter component is the slip
/// (metres) of one subfault, subfaults laid out along strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultGeometry {
    /// Longitude of the fault centroid projected to the surface (degrees).
    pub longitude: f64,
    /// Latitude of the fault centroid projected to the surface (degrees).
    pub latitude: f64,
    /// Strike, clockwise from north (degrees).
    pub strike: f64,
    /// Dip below horizontal (degrees).
    pub dip: f64,
    /// Rake (degrees); 90 is pure thrust.
    pub rake: f64,
    /// Depth of the top edge (metres).
    pub depth: f64,
    /// Along-strike length of the whole fault (metres).
    pub length: f64,
    /// Down-dip width (metres).
    pub width: f64,
    /// Shear modulus used for the seismic moment (Pa).
    pub rigidity: f64,
}

impl Default for FaultGeometry {
    fn default() -> Self {
        Self {
            longitude: 143.0,
            latitude: 38.3,
            strike: 195.0,
            dip: 14.0,
            rake: 90.0,
            depth: 5_000.0,
            length: 300_000.0,
            width: 100_000.0,
            rigidity: 4.0e10,
        }
    }
}

/// One along-strike segment of the fault.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subfault {
    /// Along-strike offset of the segment centre from the fault centroid (metres).
    pub offset: f64,
    /// Along-strike length (metres).
    pub length: f64,
    /// Slip (metres).
    pub slip: f64,
}

impl FaultGeometry {
    /// Splits the fault into one subfault per parameter component.
    pub fn subfaults(&self, params: &ParameterVector) -> Vec<Subfault> {
        let count = params.dim().max(1) as f64;
        let segment = self.length / count;
        params
            .values()
            .iter()
            .enumerate()
            .map(|(idx, &slip)| Subfault {
                offset: -self.length / 2.0 + (idx as f64 + 0.5) * segment,
                length: segment,
                slip,
            })
            .collect()
    }

    /// Seismic moment `Mo = mu * sum(area * slip)` in N m.
    pub fn seismic_moment(&self, params: &ParameterVector) -> f64 {
        self.subfaults(params)
            .iter()
            .map(|sub| self.rigidity * sub.length * self.width * sub.slip)
            .sum()
    }

    fn centroid_depth(&self) -> f64 {
        self.depth + 0.5 * self.width * self.dip.to_radians().sin()
    }

    fn half_surface_width(&self) -> f64 {
        0.5 * self.width * self.dip.to_radians().cos()
    }

    fn along_unit(&self) -> (f64, f64) {
        let strike = self.strike.to_radians();
        (strike.sin(), strike.cos())
    }

    fn down_dip_unit(&self) -> (f64, f64) {
        let strike = self.strike.to_radians();
        (strike.cos(), -strike.sin())
    }

    fn to_local(&self, lon: f64, lat: f64) -> (f64, f64) {
        let east = (lon - self.longitude) * METRES_PER_DEGREE * self.latitude.to_radians().cos();
        let north = (lat - self.latitude) * METRES_PER_DEGREE;
        (east, north)
    }

    fn to_geographic(&self, east: f64, north: f64) -> (f64, f64) {
        let lon = self.longitude + east / (METRES_PER_DEGREE * self.latitude.to_radians().cos());
        let lat = self.latitude + north / METRES_PER_DEGREE;
        (lon, lat)
    }
}

/// Moment magnitude `Mw = 2/3 (log10 Mo - 9.05)`; `None` for non-positive moments.
pub fn moment_magnitude(moment: f64) -> Option<f64> {
    (moment > 0.0 && moment.is_finite()).then(|| 2.0 / 3.0 * (moment.log10() - 9.05))
}

/// Resolution of the generated surface grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Grid spacing in degrees (both directions).
    pub spacing: f64,
    /// Margin added around the fault footprint (degrees).
    pub padding: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            spacing: 0.05,
            padding: 1.0,
        }
    }
}

/// Gridded vertical displacement, one frame per time.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    /// Number of grid columns.
    pub mx: usize,
    /// Number of grid rows.
    pub my: usize,
    /// Longitude of the western edge.
    pub xlower: f64,
    /// Latitude of the southern edge.
    pub ylower: f64,
    /// Column spacing (degrees).
    pub dx: f64,
    /// Row spacing (degrees).
    pub dy: f64,
    /// Frame times (seconds).
    pub times: Vec<f64>,
    /// Row-major frames, southern row first.
    pub frames: Vec<Vec<f64>>,
}

impl Surface {
    /// Checks that the grid is non-empty and every frame covers it exactly.
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if self.mx == 0 || self.my == 0 {
            return Err(ErrorInfo::new("surface-shape", "surface grid has no points")
                .with_context("mx", self.mx.to_string())
                .with_context("my", self.my.to_string()));
        }
        if self.frames.is_empty() || self.times.len() != self.frames.len() {
            return Err(ErrorInfo::new(
                "surface-shape",
                format!(
                    "{} frame times for {} frames",
                    self.times.len(),
                    self.frames.len()
                ),
            ));
        }
        let points = self.mx * self.my;
        if let Some((idx, frame)) = self
            .frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.len() != points)
        {
            return Err(ErrorInfo::new(
                "surface-shape",
                format!("frame has {} values, grid has {points}", frame.len()),
            )
            .with_context("frame", idx.to_string()));
        }
        Ok(())
    }

    /// Writes the surface in the `dtopo_type=3` text layout.
    ///
    /// A surface that fails [`Surface::validate`] is rejected with
    /// `InvalidData` before anything is written.
    pub fn write_dtopo3<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.validate()
            .map_err(|info| io::Error::new(io::ErrorKind::InvalidData, info.to_string()))?;
        let t0 = self.times[0];
        let dt = if self.times.len() > 1 {
            self.times[1] - self.times[0]
        } else {
            0.0
        };
        writeln!(out, "{:<20}mx", self.mx)?;
        writeln!(out, "{:<20}my", self.my)?;
        writeln!(out, "{:<20}mt", self.times.len())?;
        writeln!(out, "{:<20.10e}xlower", self.xlower)?;
        writeln!(out, "{:<20.10e}ylower", self.ylower)?;
        writeln!(out, "{:<20.10e}t0", t0)?;
        writeln!(out, "{:<20.10e}dx", self.dx)?;
        writeln!(out, "{:<20.10e}dy", self.dy)?;
        writeln!(out, "{:<20.10e}dt", dt)?;
        for frame in &self.frames {
            // dtopo files list the northern row first
            for row in frame.chunks(self.mx).rev() {
                let line = row
                    .iter()
                    .map(|dz| format!("{:.6e}", dz + 0.0))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }

    /// Serializes the surface into an owned buffer.
    pub fn to_dtopo3_bytes(&self) -> Result<Vec<u8>, ErrorInfo> {
        self.validate()?;
        let mut bytes = Vec::new();
        self.write_dtopo3(&mut bytes)
            .map_err(|err| ErrorInfo::new("surface-encode", err.to_string()))?;
        Ok(bytes)
    }
}

/// Pure function `parameters -> surface`.
pub trait SurfaceGenerator: Send + Sync {
    /// Derives the deformation surface for one run.
    fn generate(&self, params: &ParameterVector) -> Result<Surface, ErrorInfo>;
}

/// Surrogate deformation model over a [`FaultGeometry`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubfaultSurface {
    /// Fault shared by every run.
    pub fault: FaultGeometry,
    /// Output grid.
    pub grid: GridSpec,
}

impl SubfaultSurface {
    /// Creates a generator for the given fault and grid.
    pub fn new(fault: FaultGeometry, grid: GridSpec) -> Self {
        Self { fault, grid }
    }

    fn footprint(&self) -> (f64, f64, f64, f64) {
        let (ae, an) = self.fault.along_unit();
        let (de, dn) = self.fault.down_dip_unit();
        let half_length = 0.5 * self.fault.length;
        let half_width = self.fault.half_surface_width();
        let mut bounds = (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for (s, c) in [
            (-half_length, -half_width),
            (-half_length, half_width),
            (half_length, -half_width),
            (half_length, half_width),
        ] {
            let (lon, lat) = self.fault.to_geographic(s * ae + c * de, s * an + c * dn);
            bounds.0 = bounds.0.min(lon);
            bounds.1 = bounds.1.max(lon);
            bounds.2 = bounds.2.min(lat);
            bounds.3 = bounds.3.max(lat);
        }
        bounds
    }

    fn displacement(&self, subfaults: &[Subfault], east: f64, north: f64) -> f64 {
        let (ae, an) = self.fault.along_unit();
        let (de, dn) = self.fault.down_dip_unit();
        let half_width = self.fault.half_surface_width();
        let scale = self.fault.centroid_depth().max(1_000.0);
        let spread = (0.6 * half_width).max(scale);
        let vertical = self.fault.rake.to_radians().sin()
            * (2.0 * self.fault.dip.to_radians()).sin().abs().max(0.1);
        let mut dz = 0.0;
        for sub in subfaults {
            let ce = sub.offset * ae;
            let cn = sub.offset * an;
            let (re, rn) = (east - ce, north - cn);
            let along = re * ae + rn * an;
            let across = re * de + rn * dn;
            let overhang = (along.abs() - 0.5 * sub.length).max(0.0) / scale;
            let taper = (-overhang * overhang).exp();
            let uplift = (-((across + 0.5 * half_width) / spread).powi(2)).exp();
            let subsidence = (-((across - 1.2 * half_width) / spread).powi(2)).exp();
            dz += sub.slip * vertical * taper * (uplift - 0.4 * subsidence);
        }
        dz
    }
}

impl SurfaceGenerator for SubfaultSurface {
    fn generate(&self, params: &ParameterVector) -> Result<Surface, ErrorInfo> {
        if params.dim() == 0 {
            return Err(ErrorInfo::new("surface-empty", "no subfault slips supplied"));
        }
        if let Some(idx) = params.values().iter().position(|slip| !slip.is_finite()) {
            return Err(ErrorInfo::new("surface-nonfinite", "subfault slip is not finite")
                .with_context("subfault", idx.to_string())
                .with_context("slip", format!("{:?}", params.values()[idx])));
        }
        let spacing = self.grid.spacing;
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(ErrorInfo::new("surface-grid", "grid spacing must be positive")
                .with_context("spacing", spacing.to_string()));
        }

        let (west, east, south, north) = self.footprint();
        let xlower = west - self.grid.padding;
        let ylower = south - self.grid.padding;
        let mx = ((east + self.grid.padding - xlower) / spacing).ceil() as usize + 1;
        let my = ((north + self.grid.padding - ylower) / spacing).ceil() as usize + 1;
        if mx.saturating_mul(my) > MAX_GRID_POINTS {
            return Err(ErrorInfo::new("surface-grid", "surface grid too large")
                .with_context("mx", mx.to_string())
                .with_context("my", my.to_string())
                .with_hint("increase grid.spacing or reduce grid.padding"));
        }

        let subfaults = self.fault.subfaults(params);
        let mut deformed = Vec::with_capacity(mx * my);
        for j in 0..my {
            let lat = ylower + j as f64 * spacing;
            for i in 0..mx {
                let lon = xlower + i as f64 * spacing;
                let (e, n) = self.fault.to_local(lon, lat);
                deformed.push(self.displacement(&subfaults, e, n));
            }
        }

        Ok(Surface {
            mx,
            my,
            xlower,
            ylower,
            dx: spacing,
            dy: spacing,
            times: vec![0.0, 1.0],
            frames: vec![vec![0.0; mx * my], deformed],
        })
    }
}
