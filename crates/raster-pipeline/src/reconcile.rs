//! Global extrema across a family.

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::family::{Family, Phase};
use crate::metadata::{self, info_path_for, RasterMetadata};
use crate::normalize::Extent;

/// Min of mins and max of maxes. `None` for an empty input.
pub fn reconcile<I>(extents: I) -> Option<Extent>
where
    I: IntoIterator<Item = Extent>,
{
    extents.into_iter().reduce(Extent::union)
}

/// Read every metadata record of a family.
///
/// Fails if any raster of the family has no `.info` sidecar, or with
/// `NoData` when the family has no records at all.
pub fn read_family(dir: &Path, family: &Family) -> Result<Vec<(PathBuf, RasterMetadata)>> {
    for raster in family.rasters(dir)? {
        let info = info_path_for(&raster);
        if !info.exists() {
            return Err(PipelineError::metadata(&info, "raster has no metadata record"));
        }
    }

    let records = family
        .info_files(dir)?
        .into_iter()
        .map(|path| RasterMetadata::read(&path).map(|meta| (path, meta)))
        .collect::<Result<Vec<_>>>()?;

    if records.is_empty() {
        return Err(PipelineError::no_data(&family.parameter, &family.level));
    }
    Ok(records)
}

/// Global extrema of a family's original local extrema. Read only.
pub fn family_extent(dir: &Path, family: &Family) -> Result<Extent> {
    let records = read_family(dir, family)?;
    reconcile(records.iter().map(|(_, meta)| meta.local))
        .ok_or_else(|| PipelineError::no_data(&family.parameter, &family.level))
}

/// Reconcile a family and write `Global Min` / `Global Max` into every record.
///
/// All records are read before any is written. Writing stops at the first
/// failure; records already written keep the new globals and the phase
/// file is left untouched, so a rerun repeats the whole step.
pub fn normalize_family(dir: &Path, family: &Family) -> Result<Extent> {
    let records = read_family(dir, family)?;
    let global = reconcile(records.iter().map(|(_, meta)| meta.local))
        .ok_or_else(|| PipelineError::no_data(&family.parameter, &family.level))?;

    let fields = metadata::global_fields(global);
    for (path, _) in &records {
        metadata::append(path, &fields)?;
    }
    family.write_phase(dir, Phase::Reconciled(global))?;

    tracing::info!(
        family = %family,
        records = records.len(),
        global_min = global.min,
        global_max = global.max,
        "Reconciled family extrema"
    );
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(min: f64, max: f64) -> Extent {
        Extent::new(min, max)
    }

    #[test]
    fn test_reconcile_any_order() {
        let extents = [e(1.0, 5.0), e(0.0, 10.0), e(2.0, 3.0)];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let global = reconcile(order.iter().map(|&i| extents[i])).unwrap();
            assert_eq!(global, e(0.0, 10.0));
        }
    }

    #[test]
    fn test_reconcile_empty() {
        assert_eq!(reconcile(std::iter::empty()), None);
    }

    #[test]
    fn test_reconcile_single() {
        assert_eq!(reconcile([e(-3.5, 7.25)]), Some(e(-3.5, 7.25)));
    }
}
