//! # Lightcurve time series
//!
//! The data lines following a record header, parsed into [`Epoch`] values. A [`Lightcurve`] is
//! never stored in an index; it is materialized on demand by the
//! [`accessor`](crate::records::accessor) and dropped by the caller.
//!
//! Data line layout (whitespace separated, trailing columns optional):
//!
//! ```text
//! hmjd        mag     magerr  clrcoeff  catflags
//! 58204.4614  18.354  0.062   -0.0512   0
//! ```
use ordered_float::OrderedFloat;

use crate::constants::HMJD;
use crate::photometry::magnitude_to_flux;

/// One sample of a lightcurve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epoch {
    pub hmjd: HMJD,
    pub mag: f64,
    pub mag_err: f64,
    pub clrcoeff: Option<f64>,
    pub catflags: Option<u32>,
}

impl Epoch {
    /// Parse a data line; `None` if it is not a well-formed sample.
    pub fn from_data_line(line: &str) -> Option<Epoch> {
        let mut fields = line.split_whitespace();
        let hmjd = fields.next()?.parse::<f64>().ok()?;
        let mag = fields.next()?.parse::<f64>().ok()?;
        let mag_err = fields.next()?.parse::<f64>().ok()?;
        let clrcoeff = match fields.next() {
            Some(v) => Some(v.parse::<f64>().ok()?),
            None => None,
        };
        let catflags = match fields.next() {
            Some(v) => Some(v.parse::<u32>().ok()?),
            None => None,
        };
        if fields.next().is_some() || !hmjd.is_finite() {
            return None;
        }
        Some(Epoch {
            hmjd,
            mag,
            mag_err,
            clrcoeff,
            catflags,
        })
    }

    /// True when the catalog flags mark the epoch as clean (or are absent).
    pub fn is_clean(&self) -> bool {
        self.catflags.unwrap_or(0) == 0
    }
}

/// Time series of one record, sorted by date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lightcurve {
    epochs: Vec<Epoch>,
}

impl Lightcurve {
    /// Build a lightcurve from samples in any order.
    pub fn new(mut epochs: Vec<Epoch>) -> Self {
        epochs.sort_by_key(|e| OrderedFloat(e.hmjd));
        Lightcurve { epochs }
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Drop epochs whose catalog flags are non-zero.
    pub fn quality_masked(self) -> Self {
        Lightcurve {
            epochs: self.epochs.into_iter().filter(Epoch::is_clean).collect(),
        }
    }

    pub fn hmjd(&self) -> Vec<HMJD> {
        self.epochs.iter().map(|e| e.hmjd).collect()
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.mag).collect()
    }

    /// Fluxes and flux errors of every epoch for the given zero point.
    pub fn fluxes(&self, zero_point: f64) -> Vec<(f64, f64)> {
        self.epochs
            .iter()
            .map(|e| magnitude_to_flux(e.mag, e.mag_err, zero_point))
            .collect()
    }

    pub fn magnitude_median(&self) -> Option<f64> {
        median(self.magnitudes())
    }

    pub fn magnitude_std(&self) -> Option<f64> {
        std_dev(&self.magnitudes())
    }

    pub fn flux_median(&self, zero_point: f64) -> Option<f64> {
        median(self.fluxes(zero_point).into_iter().map(|(f, _)| f).collect())
    }

    pub fn flux_std(&self, zero_point: f64) -> Option<f64> {
        let fluxes: Vec<f64> = self.fluxes(zero_point).into_iter().map(|(f, _)| f).collect();
        std_dev(&fluxes)
    }

    /// Epoch of minimum magnitude (brightest sample).
    pub fn peak(&self) -> Option<&Epoch> {
        self.epochs.iter().min_by_key(|e| OrderedFloat(e.mag))
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by_key(|v| OrderedFloat(*v));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(0.5 * (values[mid - 1] + values[mid]))
    } else {
        Some(values[mid])
    }
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn epoch(hmjd: f64, mag: f64, catflags: u32) -> Epoch {
        Epoch {
            hmjd,
            mag,
            mag_err: 0.05,
            clrcoeff: Some(0.1),
            catflags: Some(catflags),
        }
    }

    #[test]
    fn test_parse_data_line() {
        assert_eq!(
            Epoch::from_data_line("58204.4614  18.354  0.062   -0.0512   0\n"),
            Some(Epoch {
                hmjd: 58204.4614,
                mag: 18.354,
                mag_err: 0.062,
                clrcoeff: Some(-0.0512),
                catflags: Some(0),
            })
        );
        assert_eq!(
            Epoch::from_data_line("58204.4614 18.354 0.062").map(|e| e.catflags),
            Some(None)
        );
        assert_eq!(Epoch::from_data_line("58204.4614 18.354"), None);
        assert_eq!(Epoch::from_data_line("# 1 2 1 245 0 1.0 2.0"), None);
        assert_eq!(Epoch::from_data_line("1 2 3 4 5 6"), None);
    }

    #[test]
    fn test_sorted_and_masked() {
        let lc = Lightcurve::new(vec![
            epoch(3.0, 18.0, 0),
            epoch(1.0, 17.0, 32768),
            epoch(2.0, 19.0, 0),
        ]);
        assert_eq!(lc.hmjd(), vec![1.0, 2.0, 3.0]);

        let masked = lc.quality_masked();
        assert_eq!(masked.hmjd(), vec![2.0, 3.0]);
        assert_eq!(masked.peak().map(|e| e.hmjd), Some(3.0));
    }

    #[test]
    fn test_statistics() {
        let lc = Lightcurve::new(vec![
            epoch(1.0, 18.0, 0),
            epoch(2.0, 20.0, 0),
            epoch(3.0, 19.0, 0),
            epoch(4.0, 21.0, 0),
        ]);
        assert_relative_eq!(lc.magnitude_median().unwrap(), 19.5);
        assert_relative_eq!(lc.magnitude_std().unwrap(), 1.25_f64.sqrt());
        assert!(Lightcurve::default().magnitude_median().is_none());
        assert!(lc.flux_median(22.0).unwrap() > 0.0);
    }
}
