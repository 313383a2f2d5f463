//! Magnitude ↔ flux conversions.
//!
//! A magnitude measured with a Gaussian error maps to a log-normally distributed flux. The
//! conversions below return the mean and standard deviation of that distribution, and the
//! inverse mapping.

use crate::constants::DEFAULT_ZERO_POINT;

/// `2.5 · log10(e)`, the scale between magnitudes and natural-log flux.
const MAG_LN_SCALE: f64 = 2.5 * std::f64::consts::LOG10_E;

/// Convert a magnitude and its error into the mean and standard deviation of the flux.
///
/// Arguments
/// -----------------
/// * `mag` – Mean magnitude.
/// * `mag_err` – Standard deviation of the magnitude.
/// * `zero_point` – Magnitude of a unit flux.
///
/// Return
/// ----------
/// * `(flux, flux_err)` for the log-normal flux distribution.
pub fn magnitude_to_flux(mag: f64, mag_err: f64, zero_point: f64) -> (f64, f64) {
    let mu_ln_f = (zero_point - mag) / MAG_LN_SCALE;
    let sig_ln_f = mag_err / MAG_LN_SCALE;
    let var_ln_f = sig_ln_f * sig_ln_f;

    let flux = (mu_ln_f + 0.5 * var_ln_f).exp();
    let flux_err = ((var_ln_f.exp() - 1.0) * (2.0 * mu_ln_f + var_ln_f).exp()).sqrt();
    (flux, flux_err)
}

/// Inverse of [`magnitude_to_flux`].
pub fn flux_to_magnitude(flux: f64, flux_err: f64, zero_point: f64) -> (f64, f64) {
    let ratio = flux_err * flux_err / (flux * flux);
    let mag_err = MAG_LN_SCALE * (ratio + 1.0).ln().sqrt();
    let mag = zero_point - MAG_LN_SCALE * (flux.ln() - 0.5 * (1.0 + ratio).ln());
    (mag, mag_err)
}

/// [`magnitude_to_flux`] with the default zero point.
pub fn magnitude_to_flux_default(mag: f64, mag_err: f64) -> (f64, f64) {
    magnitude_to_flux(mag, mag_err, DEFAULT_ZERO_POINT)
}
