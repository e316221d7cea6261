//! Sampled spectra and operations on them.

use crate::{constants::CLIGHT_ANGSTROM, grid::fgd};

/// Spectral luminosity density sampled on a wavelength grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    /// Wavelengths [Å].
    pub wavelength: Vec<fgd>,
    /// Luminosity per unit frequency [erg/s/Hz].
    pub luminosity_density: Vec<fgd>,
}

impl Spectrum {
    pub fn new(wavelength: Vec<fgd>, luminosity_density: Vec<fgd>) -> Self {
        assert_eq!(
            wavelength.len(),
            luminosity_density.len(),
            "Wavelength and luminosity density must have the same length"
        );
        Self {
            wavelength,
            luminosity_density,
        }
    }

    /// Computes the bolometric luminosity [erg/s] by integrating over frequency.
    pub fn bolometric_luminosity(&self) -> fgd {
        bolometric_luminosity(&self.wavelength, &self.luminosity_density)
    }
}

/// Sample of the three continuum components at a single wavelength [erg/s/Hz].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContinuumSample {
    pub incident: fgd,
    pub nebular: fgd,
    pub transmitted: fgd,
}

impl ContinuumSample {
    pub fn scaled(&self, factor: fgd) -> Self {
        Self {
            incident: self.incident * factor,
            nebular: self.nebular * factor,
            transmitted: self.transmitted * factor,
        }
    }
}

/// The continuum components emerging from one simulation run, sorted by
/// ascending wavelength. A component the run did not produce is empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContinuumSpectrum {
    /// Wavelengths [Å].
    pub wavelength: Vec<fgd>,
    /// Incident luminosity density [erg/s/Hz].
    pub incident: Vec<fgd>,
    /// Transmitted luminosity density [erg/s/Hz].
    pub transmitted: Vec<fgd>,
    /// Diffuse (nebular) luminosity density [erg/s/Hz].
    pub nebular: Vec<fgd>,
}

impl ContinuumSpectrum {
    /// Returns the incident component as a spectrum, if it was produced.
    pub fn incident_spectrum(&self) -> Option<Spectrum> {
        if self.incident.is_empty() {
            None
        } else {
            Some(Spectrum::new(self.wavelength.clone(), self.incident.clone()))
        }
    }

    /// Linearly interpolates every component onto the given wavelength.
    /// Components that were not produced give zero.
    pub fn sample_at(&self, wavelength: fgd) -> ContinuumSample {
        let sample = |values: &[fgd]| {
            if values.is_empty() {
                0.0
            } else {
                interp1d(wavelength, &self.wavelength, values)
            }
        };
        ContinuumSample {
            incident: sample(&self.incident),
            nebular: sample(&self.nebular),
            transmitted: sample(&self.transmitted),
        }
    }

    /// Returns the ratio of transmitted to incident luminosity density at each
    /// wavelength, or `None` if either component is missing.
    pub fn transmission(&self) -> Option<Vec<fgd>> {
        if self.incident.is_empty() || self.transmitted.is_empty() {
            None
        } else {
            Some(
                self.transmitted
                    .iter()
                    .zip(&self.incident)
                    .map(|(transmitted, incident)| transmitted / incident)
                    .collect(),
            )
        }
    }
}

/// Evaluates the piecewise linear function through `(xp, fp)` at `x`.
///
/// `xp` must be increasing. Values outside the sampled range are clamped to the
/// first or last sample.
pub fn interp1d(x: fgd, xp: &[fgd], fp: &[fgd]) -> fgd {
    assert_eq!(xp.len(), fp.len(), "Sample coordinates and values must match");
    assert!(!xp.is_empty(), "Cannot interpolate without samples");

    let n = xp.len();
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    let upper = xp.partition_point(|&coord| coord <= x);
    let lower = upper - 1;
    let dx = xp[upper] - xp[lower];
    if dx == 0.0 {
        return fp[lower];
    }
    let weight = (x - xp[lower]) / dx;
    fp[lower] + weight * (fp[upper] - fp[lower])
}

/// Integrates the luminosity density over frequency with the trapezoidal rule.
///
/// `wavelength` is in Å and `luminosity_density` in erg/s/Hz. The result does not
/// depend on whether the samples are ordered by increasing or decreasing wavelength.
pub fn bolometric_luminosity(wavelength: &[fgd], luminosity_density: &[fgd]) -> fgd {
    wavelength
        .windows(2)
        .zip(luminosity_density.windows(2))
        .map(|(lam, lnu)| {
            let dnu = (CLIGHT_ANGSTROM / lam[1] - CLIGHT_ANGSTROM / lam[0]).abs();
            0.5 * (lnu[0] + lnu[1]) * dnu
        })
        .sum()
}
