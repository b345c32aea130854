use serde::Serialize;
use thiserror::Error;

/// Fixed dimensionality of every face descriptor in the system.
pub const DESCRIPTOR_DIMENSIONS: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("face descriptor must contain exactly {DESCRIPTOR_DIMENSIONS} numeric values, got {0}")]
    WrongLength(usize),
    #[error("face descriptor component {0} is not a finite number")]
    NonFinite(usize),
}

/// Face descriptor vector (128-dimensional, as produced by the client-side
/// extractor).
///
/// Construction validates length and finiteness, so two descriptors can
/// always be compared without a length check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Descriptor(Vec<f64>);

impl Descriptor {
    /// Validate and wrap a raw component vector.
    pub fn new(values: Vec<f64>) -> Result<Self, DescriptorError> {
        if values.len() != DESCRIPTOR_DIMENSIONS {
            return Err(DescriptorError::WrongLength(values.len()));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(DescriptorError::NonFinite(i));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Compute Euclidean distance to another descriptor.
    pub fn distance(&self, other: &Descriptor) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl TryFrom<Vec<f64>> for Descriptor {
    type Error = DescriptorError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(fill: f64) -> Descriptor {
        Descriptor::new(vec![fill; DESCRIPTOR_DIMENSIONS]).unwrap()
    }

    #[test]
    fn test_rejects_short_vector() {
        let err = Descriptor::new(vec![0.0; 127]).unwrap_err();
        assert_eq!(err, DescriptorError::WrongLength(127));
    }

    #[test]
    fn test_rejects_long_vector() {
        let err = Descriptor::new(vec![0.0; 129]).unwrap_err();
        assert_eq!(err, DescriptorError::WrongLength(129));
    }

    #[test]
    fn test_rejects_non_finite_component() {
        let mut values = vec![0.0; DESCRIPTOR_DIMENSIONS];
        values[7] = f64::NAN;
        assert_eq!(
            Descriptor::new(values).unwrap_err(),
            DescriptorError::NonFinite(7)
        );

        let mut values = vec![0.0; DESCRIPTOR_DIMENSIONS];
        values[42] = f64::INFINITY;
        assert_eq!(
            Descriptor::new(values).unwrap_err(),
            DescriptorError::NonFinite(42)
        );
    }

    #[test]
    fn test_distance_identity() {
        let a = desc(0.25);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_distance_non_negative_and_symmetric() {
        let a = desc(0.1);
        let b = desc(-0.3);
        assert!(a.distance(&b) > 0.0);
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn test_distance_known_value() {
        // Differ by 0.1 in every one of 128 components:
        // sqrt(128 * 0.01) = sqrt(1.28)
        let a = desc(0.0);
        let b = desc(0.1);
        assert!((a.distance(&b) - 1.28f64.sqrt()).abs() < 1e-12);
    }
}
