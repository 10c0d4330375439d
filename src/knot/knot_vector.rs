use std::ops::Index;

use itertools::Itertools;
use nalgebra::convert;
use simba::scalar::SupersetOf;

use crate::error::{DomainError, ValidationError};
use crate::knot::KnotMultiplicity;
use crate::misc::{log_rejection, FloatingPoint};

/// Knot vector of a B-spline of a given degree
///
/// A constructed knot vector always satisfies:
/// - every knot is finite and `knots[i] <= knots[i + 1]`
/// - `len >= 2 * degree + 2`, so at least `degree + 1` control points fit
/// - the domain `[knots[degree], knots[len - degree - 1]]` has positive width
#[derive(Clone, Debug, PartialEq)]
pub struct KnotVector<T> {
    degree: usize,
    knots: Vec<T>,
}

impl<T: FloatingPoint> KnotVector<T> {
    /// Create a knot vector of `degree` from non-decreasing knot values
    /// # Failures
    /// - if there are fewer than `2 * degree + 2` knots
    /// - if a knot is not finite or the knots are not non-decreasing
    /// - if the domain has zero width
    ///
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// let knots = KnotVector::try_new(3, vec![0., 0., 0., 0., 1., 1., 1., 1.]);
    /// assert!(knots.is_ok());
    ///
    /// let knots = KnotVector::try_new(1, vec![0., 1., 0.5, 2.]);
    /// assert!(matches!(knots, Err(ValidationError::Decreasing { index: 1, .. })));
    /// ```
    pub fn try_new(degree: usize, knots: Vec<T>) -> Result<Self, ValidationError> {
        Self::validate(degree, &knots)
            .map(|_| Self { degree, knots })
            .inspect_err(|err| log_rejection("rejected knot vector", err))
    }

    fn validate(degree: usize, knots: &[T]) -> Result<(), ValidationError> {
        let required = degree
            .checked_mul(2)
            .and_then(|d| d.checked_add(2))
            .ok_or(ValidationError::DegreeTooLarge { degree })?;
        if knots.len() < required {
            return Err(ValidationError::TooFewKnots {
                degree,
                required,
                provided: knots.len(),
            });
        }

        if let Some(index) = knots.iter().position(|k| !k.is_finite()) {
            return Err(ValidationError::NonFiniteKnot { index });
        }

        if let Some((index, (previous, next))) = knots
            .iter()
            .tuple_windows()
            .find_position(|(previous, next)| previous > next)
        {
            return Err(ValidationError::Decreasing {
                index,
                previous: previous.to_f64_lossy(),
                next: next.to_f64_lossy(),
            });
        }

        let (start, end) = (knots[degree], knots[knots.len() - degree - 1]);
        if start >= end {
            return Err(ValidationError::EmptyDomain {
                start: start.to_f64_lossy(),
                end: end.to_f64_lossy(),
            });
        }

        Ok(())
    }

    /// Create a clamped knot vector with unit spacing between interior knots
    /// the first and last knots have a `degree + 1` multiplicity
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// let knots: KnotVector<f64> = KnotVector::clamped_uniform(2, 5).unwrap();
    /// assert_eq!(knots.to_vec(), vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// assert!(knots.is_clamped());
    /// ```
    pub fn clamped_uniform(
        degree: usize,
        control_point_count: usize,
    ) -> Result<Self, ValidationError> {
        if control_point_count <= degree {
            let err = ValidationError::TooFewControlPoints {
                degree,
                provided: control_point_count,
            };
            log_rejection("rejected clamped knot vector", &err);
            return Err(err);
        }

        let Some(len) = control_point_count
            .checked_add(degree)
            .and_then(|n| n.checked_add(1))
        else {
            let err = ValidationError::DegreeTooLarge { degree };
            log_rejection("rejected clamped knot vector", &err);
            return Err(err);
        };

        let spans = control_point_count - degree;
        let mut knots = Vec::with_capacity(len);
        knots.extend(std::iter::repeat_n(T::zero(), degree + 1));
        knots.extend((1..spans).map(|i| convert::<f64, T>(i as f64)));
        knots.extend(std::iter::repeat_n(
            convert::<f64, T>(spans as f64),
            degree + 1,
        ));
        Self::try_new(degree, knots)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// Number of control points a curve over this knot vector must have
    pub fn control_point_count(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.knots.clone()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.knots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.knots.iter()
    }

    /// Get the parameter domain `[knots[degree], knots[len - degree - 1]]`
    pub fn domain(&self) -> (T, T) {
        (
            self.knots[self.degree],
            self.knots[self.knots.len() - self.degree - 1],
        )
    }

    /// Check if the parameter lies in the closed domain
    pub fn contains(&self, t: T) -> bool {
        let (start, end) = self.domain();
        start <= t && t <= end
    }

    pub(crate) fn ensure_contains(&self, t: T) -> Result<(), DomainError> {
        if self.contains(t) {
            Ok(())
        } else {
            let (start, end) = self.domain();
            let err = DomainError::OutOfDomain {
                parameter: t.to_f64_lossy(),
                start: start.to_f64_lossy(),
                end: end.to_f64_lossy(),
            };
            log_rejection("parameter rejected", &err);
            Err(err)
        }
    }

    /// Clamp the parameter into the domain
    /// Evaluation never clamps on its own, this is the explicit opt-in
    pub fn clamp(&self, t: T) -> T {
        let (start, end) = self.domain();
        t.clamp(start, end)
    }

    /// Map a fraction in `[0, 1]` linearly onto the domain
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// let knots = KnotVector::try_new(1, vec![2., 2., 3., 6., 6.]).unwrap();
    /// assert_eq!(knots.parameter_at(0.5).unwrap(), 4.);
    /// assert!(knots.parameter_at(1.5).is_err());
    /// ```
    pub fn parameter_at(&self, fraction: T) -> Result<T, DomainError> {
        if !(fraction >= T::zero() && fraction <= T::one()) {
            let err = DomainError::FractionOutOfRange(fraction.to_f64_lossy());
            log_rejection("fraction rejected", &err);
            return Err(err);
        }
        let (start, end) = self.domain();
        if fraction == T::one() {
            Ok(end)
        } else {
            Ok((start + (end - start) * fraction).min(end))
        }
    }

    /// Find the knot span index `i` such that `knots[i] <= t < knots[i + 1]` by binary search
    ///
    /// Among repeated knots the rightmost span with positive width is chosen.
    /// At the end of the domain the last non-empty span is returned.
    ///
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// let knots = KnotVector::try_new(2, vec![0., 0., 0., 1., 2., 3., 3., 3.]).unwrap();
    /// assert_eq!(knots.find_span(2.5).unwrap(), 4);
    /// assert_eq!(knots.find_span(1.).unwrap(), 3);
    /// assert_eq!(knots.find_span(3.).unwrap(), 4);
    /// assert!(knots.find_span(3.1).is_err());
    /// ```
    pub fn find_span(&self, t: T) -> Result<usize, DomainError> {
        self.ensure_contains(t)?;
        let (_, end) = self.domain();
        let candidates = &self.knots[self.degree..self.control_point_count()];
        let count = if t < end {
            candidates.partition_point(|k| *k <= t)
        } else {
            candidates.partition_point(|k| *k < end)
        };
        Ok(self.degree + count - 1)
    }

    /// Get the multiplicity of each distinct knot value
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// let knots = KnotVector::try_new(2, vec![0., 0., 0., 1., 2., 3., 3., 3.]).unwrap();
    /// let knot_multiplicity = knots.multiplicity();
    /// assert_eq!(knot_multiplicity[0].multiplicity(), 3);
    /// assert_eq!(knot_multiplicity[1].multiplicity(), 1);
    /// assert_eq!(knot_multiplicity[2].multiplicity(), 1);
    /// assert_eq!(knot_multiplicity[3].multiplicity(), 3);
    /// ```
    pub fn multiplicity(&self) -> Vec<KnotMultiplicity<T>> {
        self.knots
            .iter()
            .dedup_with_count()
            .map(|(count, knot)| KnotMultiplicity::new(*knot, count))
            .collect()
    }

    /// Check if the knot vector is clamped
    /// `clamped` means the first and last knots have a multiplicity greater than the degree
    pub fn is_clamped(&self) -> bool {
        let multiplicity = self.multiplicity();
        match (multiplicity.first(), multiplicity.last()) {
            (Some(start), Some(end)) => {
                start.multiplicity() > self.degree && end.multiplicity() > self.degree
            }
            _ => false,
        }
    }

    /// Compute the `degree + 1` non-vanishing basis functions at `t`
    /// `basis[j]` weights control point `find_span(t) - degree + j`
    pub fn basis_functions(&self, t: T) -> Result<Vec<T>, DomainError> {
        let span = self.find_span(t)?;
        Ok(self.basis_functions_at_span(span, t))
    }

    pub(crate) fn basis_functions_at_span(&self, span: usize, t: T) -> Vec<T> {
        let degree = self.degree;
        let mut basis = vec![T::zero(); degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        basis[0] = T::one();

        for j in 1..=degree {
            left[j] = t - self.knots[span + 1 - j];
            right[j] = self.knots[span + j] - t;
            let mut saved = T::zero();

            for r in 0..j {
                let denominator = right[r + 1] + left[j - r];
                // zero-width support contributes nothing
                let temp = if denominator == T::zero() {
                    T::zero()
                } else {
                    basis[r] / denominator
                };
                basis[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }

            basis[j] = saved;
        }

        basis
    }

    /// Knot vector of the derivative curve, trimmed by one knot at each end
    /// Returns `None` for degree 0
    pub fn derivative(&self) -> Option<Self> {
        if self.degree == 0 {
            return None;
        }
        Some(Self {
            degree: self.degree - 1,
            knots: self.knots[1..self.knots.len() - 1].to_vec(),
        })
    }

    /// Cast the knot vector to another floating point type
    /// Fails if the conversion collapses the domain
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> Result<KnotVector<F>, ValidationError> {
        KnotVector::try_new(
            self.degree,
            self.knots.iter().map(|v| convert(*v)).collect(),
        )
    }
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.knots[index]
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for KnotVector<T>
where
    T: FloatingPoint + serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("KnotVector", 2)?;
        state.serialize_field("degree", &self.degree)?;
        state.serialize_field("knots", &self.knots)?;
        state.end()
    }
}

/// Deserialized knot vectors are validated like `try_new`
#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for KnotVector<T>
where
    T: FloatingPoint + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(rename = "KnotVector")]
        struct Unchecked<T> {
            degree: usize,
            knots: Vec<T>,
        }

        let unchecked = Unchecked::<T>::deserialize(deserializer)?;
        Self::try_new(unchecked.degree, unchecked.knots).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::KnotVector;
    use crate::error::{DomainError, ValidationError};

    #[test]
    fn reject_too_few_knots() {
        let err = KnotVector::try_new(3, vec![0., 0., 0., 1., 1., 1.]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooFewKnots {
                degree: 3,
                required: 8,
                provided: 6
            }
        );
    }

    #[test]
    fn reject_overflowing_degree() {
        let err = KnotVector::try_new(usize::MAX, vec![0., 1.]).unwrap_err();
        assert_eq!(err, ValidationError::DegreeTooLarge { degree: usize::MAX });
        let err = KnotVector::try_new(usize::MAX / 2, vec![0., 1.]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DegreeTooLarge {
                degree: usize::MAX / 2
            }
        );

        let err = KnotVector::<f64>::clamped_uniform(usize::MAX - 1, usize::MAX).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DegreeTooLarge {
                degree: usize::MAX - 1
            }
        );
    }

    #[test]
    fn reject_non_monotonic() {
        let err = KnotVector::try_new(1, vec![0., 1., 0.5, 2.]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Decreasing {
                index: 1,
                previous: 1.,
                next: 0.5
            }
        );
    }

    #[test]
    fn reject_non_finite() {
        let err = KnotVector::try_new(0, vec![0., f64::NAN]).unwrap_err();
        assert_eq!(err, ValidationError::NonFiniteKnot { index: 1 });
        let err = KnotVector::try_new(0, vec![f64::NEG_INFINITY, 0.]).unwrap_err();
        assert_eq!(err, ValidationError::NonFiniteKnot { index: 0 });
    }

    #[test]
    fn reject_empty_domain() {
        let err = KnotVector::try_new(1, vec![0., 1., 1., 2.]).unwrap_err();
        assert_eq!(err, ValidationError::EmptyDomain { start: 1., end: 1. });
    }

    #[test]
    fn clamped_uniform_layout() {
        let knots = KnotVector::<f64>::clamped_uniform(3, 4).unwrap();
        assert_eq!(knots.to_vec(), vec![0., 0., 0., 0., 1., 1., 1., 1.]);
        assert_eq!(knots.control_point_count(), 4);

        let knots = KnotVector::<f32>::clamped_uniform(0, 3).unwrap();
        assert_eq!(knots.to_vec(), vec![0., 1., 2., 3.]);

        assert_eq!(
            KnotVector::<f64>::clamped_uniform(3, 3).unwrap_err(),
            ValidationError::TooFewControlPoints {
                degree: 3,
                provided: 3
            }
        );
    }

    #[test]
    fn span_in_interior() {
        let knots = KnotVector::try_new(2, vec![0., 0., 0., 1., 2., 3., 3., 3.]).unwrap();
        assert_eq!(knots.find_span(0.).unwrap(), 2);
        assert_eq!(knots.find_span(0.5).unwrap(), 2);
        assert_eq!(knots.find_span(1.).unwrap(), 3);
        assert_eq!(knots.find_span(1.999).unwrap(), 3);
        assert_eq!(knots.find_span(2.).unwrap(), 4);
        assert_eq!(knots.find_span(3.).unwrap(), 4);
    }

    #[test]
    fn span_with_repeated_interior_knot() {
        let knots = KnotVector::try_new(2, vec![0., 0., 0., 1., 1., 2., 2., 2.]).unwrap();
        // [1, 1) is empty, t = 1 falls into [1, 2)
        assert_eq!(knots.find_span(1.).unwrap(), 4);
        assert_eq!(knots.find_span(0.999).unwrap(), 2);
        assert_eq!(knots.find_span(2.).unwrap(), 4);
    }

    #[test]
    fn span_for_unclamped_knots() {
        let knots = KnotVector::try_new(1, vec![0., 1., 2., 3., 4.]).unwrap();
        assert_eq!(knots.domain(), (1., 3.));
        assert_eq!(knots.find_span(1.).unwrap(), 1);
        assert_eq!(knots.find_span(2.5).unwrap(), 2);
        assert_eq!(knots.find_span(3.).unwrap(), 2);
    }

    #[test]
    fn span_outside_domain() {
        let knots = KnotVector::try_new(3, vec![0., 0., 0., 0., 1., 1., 1., 1.]).unwrap();
        assert_eq!(
            knots.find_span(-0.1).unwrap_err(),
            DomainError::OutOfDomain {
                parameter: -0.1,
                start: 0.,
                end: 1.
            }
        );
        assert!(knots.find_span(1.1).is_err());
        assert!(knots.find_span(f64::NAN).is_err());
    }

    #[test]
    fn basis_is_partition_of_unity() {
        let knots = KnotVector::try_new(3, vec![0., 0., 0., 0., 0.5, 1.5, 2., 2., 2., 2.]).unwrap();
        for i in 0..=40 {
            let t = i as f64 / 20.;
            let basis = knots.basis_functions(t).unwrap();
            assert_eq!(basis.len(), 4);
            assert!(basis.iter().all(|b| *b >= -1e-12));
            assert_relative_eq!(basis.iter().sum::<f64>(), 1., epsilon = 1e-12);
        }
    }

    #[test]
    fn derivative_knots() {
        let knots = KnotVector::try_new(2, vec![0., 0., 0., 1., 2., 2., 2.]).unwrap();
        let derivative = knots.derivative().unwrap();
        assert_eq!(derivative.degree(), 1);
        assert_eq!(derivative.to_vec(), vec![0., 0., 1., 2., 2.]);
        assert_eq!(derivative.domain(), knots.domain());

        let constant = KnotVector::try_new(0, vec![0., 1.]).unwrap();
        assert!(constant.derivative().is_none());
    }

    #[test]
    fn clamp_and_fraction() {
        let knots = KnotVector::try_new(1, vec![0., 1., 2., 3.]).unwrap();
        assert_eq!(knots.clamp(-4.), 1.);
        assert_eq!(knots.clamp(9.), 2.);
        assert_eq!(knots.clamp(1.5), 1.5);
        assert_eq!(knots.parameter_at(0.).unwrap(), 1.);
        assert_eq!(knots.parameter_at(1.).unwrap(), 2.);
        assert_eq!(
            knots.parameter_at(-0.5).unwrap_err(),
            DomainError::FractionOutOfRange(-0.5)
        );
    }

    #[test]
    fn not_clamped() {
        let knots = KnotVector::try_new(2, vec![0., 1., 2., 3., 4., 5.]).unwrap();
        assert!(!knots.is_clamped());
        assert_eq!(knots.multiplicity().len(), 6);
    }

    #[test]
    fn cast_precision() {
        let knots = KnotVector::try_new(1, vec![0., 0., 0.25, 1., 1.]).unwrap();
        let single = knots.cast::<f32>().unwrap();
        assert_eq!(single.to_vec(), vec![0_f32, 0., 0.25, 1., 1.]);
    }
}
