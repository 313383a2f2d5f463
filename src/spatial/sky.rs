//! Angular geometry on the celestial sphere, in degrees.

use crate::constants::{ArcSec, Degree, ARCSEC_PER_DEG, RADEG};

/// Great-circle separation between two sky positions, in arcseconds.
///
/// Haversine form: well conditioned at the sub-arcsecond separations used for matching,
/// where the `acos` of a dot product loses most of its digits.
pub fn angular_separation_arcsec(ra1: Degree, dec1: Degree, ra2: Degree, dec2: Degree) -> ArcSec {
    let (dec1, dec2) = (dec1 * RADEG, dec2 * RADEG);
    let half_ddec = 0.5 * (dec2 - dec1);
    let half_dra = 0.5 * (ra2 - ra1) * RADEG;

    let h = half_ddec.sin().powi(2) + dec1.cos() * dec2.cos() * half_dra.sin().powi(2);
    let sep = 2.0 * h.sqrt().min(1.0).asin();
    sep / RADEG * ARCSEC_PER_DEG
}

/// Half-width, in degrees of right ascension, of the window containing every point within
/// `tolerance` of a target at declination `dec`.
///
/// Returns `None` when the cap reaches a pole and every right ascension qualifies. For small
/// tolerances the width tends to `tolerance / cos(dec)` and is never below it.
pub fn ra_half_window(dec: Degree, tolerance: ArcSec) -> Option<Degree> {
    let r = tolerance / ARCSEC_PER_DEG * RADEG;
    let cos_dec = (dec * RADEG).cos();
    let sin_r = r.sin();
    if sin_r >= cos_dec {
        return None;
    }
    Some((sin_r / cos_dec).asin() / RADEG)
}

/// Right ascension intervals, within `[0, 360)`, covering `[ra - half, ra + half]`.
///
/// A window crossing 0°/360° is split in two.
pub fn ra_intervals(ra: Degree, half: Option<Degree>) -> Vec<(Degree, Degree)> {
    let Some(half) = half.filter(|h| *h < 180.0) else {
        return vec![(f64::NEG_INFINITY, f64::INFINITY)];
    };
    let (lo, hi) = (ra - half, ra + half);
    let mut intervals = vec![(lo, hi)];
    if lo < 0.0 {
        intervals.push((lo + 360.0, hi + 360.0));
    }
    if hi >= 360.0 {
        intervals.push((lo - 360.0, hi - 360.0));
    }
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_separation_along_meridian() {
        let sep = angular_separation_arcsec(4.74852, -26.23583, 4.74852, -26.23583 + 1.0 / 3600.0);
        assert_relative_eq!(sep, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_separation_along_parallel_shrinks_with_dec() {
        let at_equator = angular_separation_arcsec(10.0, 0.0, 10.0 + 1.0 / 3600.0, 0.0);
        let at_sixty = angular_separation_arcsec(10.0, 60.0, 10.0 + 1.0 / 3600.0, 60.0);
        assert_relative_eq!(at_equator, 1.0, epsilon = 1e-6);
        assert_relative_eq!(at_sixty, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_separation_across_ra_origin() {
        let sep = angular_separation_arcsec(359.9999, 0.0, 0.0001, 0.0);
        assert_relative_eq!(sep, 0.72, epsilon = 1e-6);
    }

    #[test]
    fn test_ra_half_window() {
        let w = ra_half_window(0.0, 3600.0).unwrap();
        assert_relative_eq!(w, 1.0, epsilon = 1e-9);

        let w = ra_half_window(60.0, 2.0).unwrap();
        assert!(w >= 2.0 / 3600.0 / 0.5);
        assert_relative_eq!(w, 2.0 / 3600.0 / 0.5, epsilon = 1e-12);

        assert_eq!(ra_half_window(90.0, 2.0), None);
    }

    #[test]
    fn test_ra_intervals_wrap() {
        assert_eq!(ra_intervals(180.0, Some(1.0)), vec![(179.0, 181.0)]);
        assert_eq!(
            ra_intervals(0.5, Some(1.0)),
            vec![(-0.5, 1.5), (359.5, 361.5)]
        );
        assert_eq!(
            ra_intervals(359.5, Some(1.0)),
            vec![(358.5, 360.5), (-1.5, 0.5)]
        );
        assert_eq!(ra_intervals(10.0, None).len(), 1);
    }
}
