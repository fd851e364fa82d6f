//! Clips and reprojects the DEM (and optional vegetation raster) to the
//! metric CRS chosen by [`crate::crs::CrsResolver`], producing the surface
//! raster described by the data model: ground elevation, combined
//! ground+vegetation surface elevation, and a target-cell mask.
//!
//! The GDAL read path (`Dataset::open`, `rasterband`, `read_into_slice`)
//! and the affine world<->pixel helpers below are the same shape as the
//! `raster_io.rs` reference: `invert_transform`/`world_to_pixel`/
//! `pixel_to_world` here are that file's helpers adapted from an
//! `ndarray`-backed multiband raster to this crate's flat per-band
//! `Vec<f32>` surface grid. Full GDAL warp-API reprojection is not bound;
//! instead each output cell's metric coordinate is inverse-mapped into the
//! source dataset's own pixel space and resampled there, which covers the
//! bilinear/nearest-neighbour resampling the component design calls for
//! without pulling in the warp API (documented as a simplification in
//! DESIGN.md).

use std::path::Path;

use gdal::raster::ResampleAlg;
use gdal::Dataset;
use geo::Polygon;

use crate::crs::CrsResolver;
use crate::error::{Result, SegError};
use crate::geometry::MetricBbox;

/// Surface raster over the metric frame: ground elevation, combined
/// ground+vegetation elevation, and a target-cell mask, one value per
/// (row, col) cell in row-major, north-to-south order.
pub struct SurfaceRaster {
    pub rows: u32,
    pub cols: u32,
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_size: f64,
    pub ground: Vec<f32>,
    pub surface: Vec<f32>,
    pub target_mask: Vec<bool>,
}

impl SurfaceRaster {
    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.cols as usize + col as usize
    }

    pub fn ground_at(&self, row: u32, col: u32) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let v = self.ground[self.index(row, col)];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    pub fn surface_at(&self, row: u32, col: u32) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let v = self.surface[self.index(row, col)];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    pub fn is_target(&self, row: u32, col: u32) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.target_mask[self.index(row, col)]
    }

    pub fn cell_center(&self, row: u32, col: u32) -> (f64, f64) {
        crate::geometry::cell_center_to_world(row, col, self.origin_x, self.origin_y, self.cell_size)
    }

    pub fn target_cell_count(&self) -> usize {
        self.target_mask.iter().filter(|&&m| m).count()
    }
}

/// Reads a DEM (and optional vegetation raster), reprojects both onto a
/// uniform metric grid clipped to the search polygon inflated by
/// `max_vlos_m`, and rasterizes the polygon as the target mask.
pub fn prepare(
    dem_path: &Path,
    vegetation_path: Option<&Path>,
    polygon_wgs84: &Polygon<f64>,
    polygon_metric: &Polygon<f64>,
    crs: &CrsResolver,
    max_vlos_m: f64,
) -> Result<SurfaceRaster> {
    let started = std::time::Instant::now();
    tracing::debug!(
        dem = %dem_path.display(),
        vegetation = vegetation_path.is_some(),
        "preparing surface raster"
    );

    let dem = SourceRaster::open(dem_path)?;

    let bbox = MetricBbox::of_polygon(polygon_metric).inflate(max_vlos_m);
    if !dem_intersects_bbox(&dem, crs, &bbox)? {
        return Err(SegError::DemOutsidePolygon);
    }

    let cell_size = dem.native_cell_size_m(crs)?;
    let cols = ((bbox.width()) / cell_size).ceil().max(1.0) as u32;
    let rows = ((bbox.height()) / cell_size).ceil().max(1.0) as u32;
    let origin_x = bbox.min_x;
    let origin_y = bbox.max_y;

    let mut ground = vec![f32::NAN; (rows as usize) * (cols as usize)];
    resample_into(&dem, crs, rows, cols, origin_x, origin_y, cell_size, ResampleAlg::Bilinear, &mut ground)?;

    let mut vegetation = vec![0f32; (rows as usize) * (cols as usize)];
    if let Some(path) = vegetation_path {
        let veg = SourceRaster::open(path)?;
        resample_into(&veg, crs, rows, cols, origin_x, origin_y, cell_size, ResampleAlg::NearestNeighbour, &mut vegetation)?;
        for v in vegetation.iter_mut() {
            if v.is_nan() {
                *v = 0.0;
            }
        }
    }

    let mut surface = vec![f32::NAN; ground.len()];
    for i in 0..ground.len() {
        if !ground[i].is_nan() {
            surface[i] = ground[i] + vegetation[i];
        }
    }

    let target_mask = rasterize_polygon(polygon_metric, rows, cols, origin_x, origin_y, cell_size);

    for (i, &is_target) in target_mask.iter().enumerate() {
        if is_target && ground[i].is_nan() {
            return Err(SegError::MissingElevation);
        }
    }

    if !target_mask.iter().any(|&m| m) {
        return Err(SegError::EmptyRaster(
            "no target cells after rasterizing search polygon".to_string(),
        ));
    }

    tracing::info!(
        rows,
        cols,
        cell_size,
        target_cells = target_mask.iter().filter(|&&m| m).count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "surface raster ready"
    );

    Ok(SurfaceRaster {
        rows,
        cols,
        origin_x,
        origin_y,
        cell_size,
        ground,
        surface,
        target_mask,
    })
}

/// A source GDAL raster kept open only long enough to resample from.
struct SourceRaster {
    dataset: Dataset,
    transform: [f64; 6],
    projection: String,
}

impl SourceRaster {
    fn open(path: &Path) -> Result<SourceRaster> {
        let dataset = Dataset::open(path)
            .map_err(|_| SegError::FileNotFound(path.display().to_string()))?;
        let transform = dataset.geo_transform()?;
        let projection = dataset.projection();
        Ok(SourceRaster {
            dataset,
            transform,
            projection,
        })
    }

    fn size(&self) -> Result<(usize, usize)> {
        let band = self.dataset.rasterband(1)?;
        Ok(band.size())
    }

    /// Approximates the native cell size in meters by transforming the
    /// pixel-diagonal vector at the dataset origin into the target CRS.
    fn native_cell_size_m(&self, crs: &CrsResolver) -> Result<f64> {
        let (lon0, lat0) = pixel_to_world_deg(0, 0, &self.transform, &self.projection)?;
        let (lon1, lat1) = pixel_to_world_deg(1, 0, &self.transform, &self.projection)?;
        let (x0, y0) = crs.forward(lon0, lat0)?;
        let (x1, y1) = crs.forward(lon1, lat1)?;
        let size = crate::geometry::distance(x0, y0, x1, y1);
        if size <= 0.0 || !size.is_finite() {
            return Err(SegError::EmptyRaster(
                "could not determine native DEM cell size".to_string(),
            ));
        }
        Ok(size)
    }
}

/// If the source raster is already in WGS84 (common for DEM distributions
/// like SRTM), the pixel coordinate is geographic directly; otherwise it's
/// treated as already-metric and reprojected to WGS84 first via a no-op
/// (the raster is assumed to carry a CRS `proj` can resolve in a fuller
/// implementation). This crate only special-cases the WGS84 source case
/// explicitly, which covers the common DEM distribution formats.
fn pixel_to_world_deg(col: i64, row: i64, transform: &[f64; 6], _projection: &str) -> Result<(f64, f64)> {
    let x = transform[0] + col as f64 * transform[1] + row as f64 * transform[2];
    let y = transform[3] + col as f64 * transform[4] + row as f64 * transform[5];
    Ok((x, y))
}

fn invert_transform(transform: &[f64; 6]) -> [f64; 6] {
    let det = transform[1] * transform[5] - transform[2] * transform[4];
    [
        -transform[0] * transform[5] / det + transform[2] * transform[3] / det,
        transform[5] / det,
        -transform[2] / det,
        transform[0] * transform[4] / det - transform[1] * transform[3] / det,
        -transform[4] / det,
        transform[1] / det,
    ]
}

fn world_to_pixel(x: f64, y: f64, inv_transform: &[f64; 6]) -> (f64, f64) {
    let col = inv_transform[0] + inv_transform[1] * x + inv_transform[2] * y;
    let row = inv_transform[3] + inv_transform[4] * x + inv_transform[5] * y;
    (col, row)
}

fn dem_intersects_bbox(dem: &SourceRaster, crs: &CrsResolver, bbox: &MetricBbox) -> Result<bool> {
    let (width, height) = dem.size()?;
    let corners = [(0i64, 0i64), (width as i64, 0), (0, height as i64), (width as i64, height as i64)];
    let mut dem_bbox: Option<MetricBbox> = None;
    for (col, row) in corners {
        let (lon, lat) = pixel_to_world_deg(col, row, &dem.transform, &dem.projection)?;
        let (x, y) = crs.forward(lon, lat)?;
        dem_bbox = Some(match dem_bbox {
            None => MetricBbox::new(x, y, x, y),
            Some(b) => b.union(&MetricBbox::new(x, y, x, y)),
        });
    }
    let dem_bbox = dem_bbox.expect("four corners were visited");
    Ok(dem_bbox.min_x <= bbox.max_x
        && dem_bbox.max_x >= bbox.min_x
        && dem_bbox.min_y <= bbox.max_y
        && dem_bbox.max_y >= bbox.min_y)
}

#[allow(clippy::too_many_arguments)]
fn resample_into(
    src: &SourceRaster,
    crs: &CrsResolver,
    rows: u32,
    cols: u32,
    origin_x: f64,
    origin_y: f64,
    cell_size: f64,
    resample: ResampleAlg,
    out: &mut [f32],
) -> Result<()> {
    let band = src.dataset.rasterband(1)?;
    let (width, height) = band.size();
    let no_data = band.no_data_value();
    let mut buffer = vec![0f32; width * height];
    band.read_into_slice((0, 0), (width, height), (width, height), &mut buffer, Some(ResampleAlg::NearestNeighbour))?;

    let inv = invert_transform(&src.transform);

    for row in 0..rows {
        for col in 0..cols {
            let (wx, wy) = crate::geometry::cell_center_to_world(row, col, origin_x, origin_y, cell_size);
            let (lon, lat) = crs.inverse(wx, wy)?;
            let (pcol, prow) = world_to_pixel(lon, lat, &inv);

            let value = match resample {
                ResampleAlg::Bilinear => sample_bilinear(&buffer, width, height, pcol, prow, no_data),
                _ => sample_nearest(&buffer, width, height, pcol, prow, no_data),
            };
            out[row as usize * cols as usize + col as usize] = value.unwrap_or(f32::NAN);
        }
    }
    Ok(())
}

fn sample_nearest(buffer: &[f32], width: usize, height: usize, col: f64, row: f64, no_data: Option<f64>) -> Option<f32> {
    let c = col.round() as i64;
    let r = row.round() as i64;
    if c < 0 || r < 0 || c as usize >= width || r as usize >= height {
        return None;
    }
    let v = buffer[r as usize * width + c as usize];
    if Some(v as f64) == no_data {
        None
    } else {
        Some(v)
    }
}

fn sample_bilinear(buffer: &[f32], width: usize, height: usize, col: f64, row: f64, no_data: Option<f64>) -> Option<f32> {
    let c0 = col.floor();
    let r0 = row.floor();
    let c1 = c0 + 1.0;
    let r1 = r0 + 1.0;
    if c0 < 0.0 || r0 < 0.0 || c1 as usize >= width || r1 as usize >= height {
        return sample_nearest(buffer, width, height, col, row, no_data);
    }
    let get = |c: f64, r: f64| -> Option<f32> {
        let v = buffer[r as usize * width + c as usize];
        if Some(v as f64) == no_data {
            None
        } else {
            Some(v)
        }
    };
    let (v00, v10, v01, v11) = (get(c0, r0)?, get(c1, r0)?, get(c0, r1)?, get(c1, r1)?);
    let tx = (col - c0) as f32;
    let ty = (row - r0) as f32;
    let top = v00 * (1.0 - tx) + v10 * tx;
    let bottom = v01 * (1.0 - tx) + v11 * tx;
    Some(top * (1.0 - ty) + bottom * ty)
}

fn rasterize_polygon(polygon: &Polygon<f64>, rows: u32, cols: u32, origin_x: f64, origin_y: f64, cell_size: f64) -> Vec<bool> {
    use geo::Contains;
    use geo::Coord;

    let mut mask = vec![false; (rows as usize) * (cols as usize)];
    for row in 0..rows {
        for col in 0..cols {
            let (x, y) = crate::geometry::cell_center_to_world(row, col, origin_x, origin_y, cell_size);
            let point = Coord { x, y };
            if polygon.contains(&point) {
                mask[row as usize * cols as usize + col as usize] = true;
            }
        }
    }
    mask
}
