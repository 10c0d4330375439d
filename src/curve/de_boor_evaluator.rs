use nalgebra::allocator::Allocator;
use nalgebra::{convert, Const, DefaultAllocator, DimName, OPoint, OVector};
use simba::scalar::SupersetOf;

use crate::error::{DomainError, ValidationError};
use crate::knot::KnotVector;
use crate::misc::{log_rejection, FloatingPoint};

/// B-spline curve evaluated by De Boor's algorithm
/// By generics, control points live in any dimension `D` with f32 or f64 scalar types
///
/// Immutable after construction: every evaluation is a pure function of
/// the parameter, the knots and the control points.
#[derive(Clone, Debug, PartialEq)]
pub struct DeBoorEvaluator<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// knot vector carrying the degree of the curve
    knots: KnotVector<T>,
    /// `knots.len() - degree - 1` control points, order defines the curve
    control_points: Vec<OPoint<T, D>>,
}

/// Scalar function (1D curve) alias
pub type DeBoorEvaluator1D<T> = DeBoorEvaluator<T, Const<1>>;

/// 2D curve alias
pub type DeBoorEvaluator2D<T> = DeBoorEvaluator<T, Const<2>>;

/// 3D curve alias
pub type DeBoorEvaluator3D<T> = DeBoorEvaluator<T, Const<3>>;

impl<T: FloatingPoint, D: DimName> DeBoorEvaluator<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new curve from a validated knot vector
    /// # Failures
    /// - the number of control points is not equal to `knots.len() - degree - 1`
    ///
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// use nalgebra::Point2;
    ///
    /// let knots = KnotVector::try_new(3, vec![0., 0., 0., 0., 1., 1., 1., 1.]).unwrap();
    /// let control_points = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(0., 1.),
    ///     Point2::new(1., 1.),
    ///     Point2::new(1., 0.),
    /// ];
    /// let curve = DeBoorEvaluator::try_new(knots.clone(), control_points.clone());
    /// assert!(curve.is_ok());
    ///
    /// let curve = DeBoorEvaluator::try_new(knots, control_points[1..].to_vec());
    /// assert!(curve.is_err());
    /// ```
    pub fn try_new(
        knots: KnotVector<T>,
        control_points: Vec<OPoint<T, D>>,
    ) -> Result<Self, ValidationError> {
        let expected = knots.control_point_count();
        if control_points.len() != expected {
            let err = ValidationError::ControlPointCount {
                expected,
                provided: control_points.len(),
            };
            log_rejection("rejected control points", &err);
            return Err(err);
        }

        Ok(Self {
            knots,
            control_points,
        })
    }

    /// Create a curve over a clamped uniform knot vector,
    /// so that the curve starts at the first and ends at the last control point
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// use nalgebra::Point2;
    ///
    /// let curve = DeBoorEvaluator2D::try_clamped(
    ///     2,
    ///     vec![
    ///         Point2::new(0., 0.),
    ///         Point2::new(1., 2.),
    ///         Point2::new(3., 2.),
    ///         Point2::new(4., 0.),
    ///     ],
    /// )
    /// .unwrap();
    /// assert_eq!(curve.domain(), (0., 2.));
    /// assert_eq!(curve.evaluate(2.).unwrap(), Point2::new(4., 0.));
    /// ```
    pub fn try_clamped(
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
    ) -> Result<Self, ValidationError> {
        let knots = KnotVector::clamped_uniform(degree, control_points.len())?;
        Self::try_new(knots, control_points)
    }

    pub fn degree(&self) -> usize {
        self.knots.degree()
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    pub fn control_points(&self) -> &[OPoint<T, D>] {
        &self.control_points
    }

    pub fn domain(&self) -> (T, T) {
        self.knots.domain()
    }

    /// Evaluate the curve at a given parameter to get a point
    /// Fails if `t` is outside of the domain, no extrapolation is done
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// let knots = KnotVector::try_new(3, vec![0., 0., 0., 0., 1., 1., 1., 1.]).unwrap();
    /// let curve = DeBoorEvaluator::try_new(
    ///     knots,
    ///     vec![
    ///         Point2::new(0., 0.),
    ///         Point2::new(0., 1.),
    ///         Point2::new(1., 1.),
    ///         Point2::new(1., 0.),
    ///     ],
    /// )
    /// .unwrap();
    /// assert_relative_eq!(curve.evaluate(0.5).unwrap(), Point2::new(0.5, 0.75));
    /// assert!(curve.evaluate(1.1).is_err());
    /// ```
    pub fn evaluate(&self, t: T) -> Result<OPoint<T, D>, DomainError> {
        let span = self.knots.find_span(t)?;
        Ok(OPoint::from(self.derivative_at_span(span, t, 0)))
    }

    /// Evaluate the curve after clamping `t` into the domain
    pub fn evaluate_clamped(&self, t: T) -> Result<OPoint<T, D>, DomainError> {
        self.evaluate(self.knots.clamp(t))
    }

    /// Evaluate the `order`-th derivative of the curve at a given parameter
    ///
    /// The control polygon is differentiated `order` times locally,
    /// then the reduced-degree curve is evaluated over the trimmed knots.
    /// Derivatives of an order greater than the degree vanish.
    ///
    /// # Example
    /// ```
    /// use deboor::prelude::*;
    /// use nalgebra::{Point2, Vector2};
    /// use approx::assert_relative_eq;
    ///
    /// let knots = KnotVector::try_new(3, vec![0., 0., 0., 0., 1., 1., 1., 1.]).unwrap();
    /// let curve = DeBoorEvaluator::try_new(
    ///     knots,
    ///     vec![
    ///         Point2::new(0., 0.),
    ///         Point2::new(0., 1.),
    ///         Point2::new(1., 1.),
    ///         Point2::new(1., 0.),
    ///     ],
    /// )
    /// .unwrap();
    /// assert_relative_eq!(curve.derivative(0., 1).unwrap(), Vector2::new(0., 3.));
    /// assert_relative_eq!(curve.derivative(0.5, 4).unwrap(), Vector2::zeros());
    /// ```
    pub fn derivative(&self, t: T, order: usize) -> Result<OVector<T, D>, DomainError> {
        let span = self.knots.find_span(t)?;
        Ok(self.derivative_at_span(span, t, order))
    }

    /// Evaluate the first derivative (tangent vector) at a given parameter
    pub fn tangent_at(&self, t: T) -> Result<OVector<T, D>, DomainError> {
        self.derivative(t, 1)
    }

    /// Evaluate the point and the derivatives up to `order` at a given parameter
    /// the first element is the position as a vector
    pub fn derivatives(&self, t: T, order: usize) -> Result<Vec<OVector<T, D>>, DomainError> {
        let span = self.knots.find_span(t)?;
        Ok((0..=order)
            .map(|k| self.derivative_at_span(span, t, k))
            .collect())
    }

    /// Differentiate the local control polygon `order` times and run De Boor on the result
    fn derivative_at_span(&self, span: usize, t: T, order: usize) -> OVector<T, D> {
        let degree = self.degree();
        if order > degree {
            return OVector::<T, D>::zeros();
        }

        let knots = self.knots.as_slice();
        let mut window: Vec<OVector<T, D>> = self.control_points[span - degree..=span]
            .iter()
            .map(|p| p.coords.clone())
            .collect();

        for m in 1..=order {
            let scale: T = convert((degree - m + 1) as f64);
            for j in 0..=(degree - m) {
                let i = span - degree + j;
                let width = knots[i + degree + 1] - knots[i + m];
                // nonzero whenever the span has positive width
                window[j] = if width == T::zero() {
                    OVector::<T, D>::zeros()
                } else {
                    (&window[j + 1] - &window[j]) * (scale / width)
                };
            }
        }
        window.truncate(degree - order + 1);

        de_boor(
            &knots[order..knots.len() - order],
            degree - order,
            span - order,
            t,
            window,
        )
    }

    /// Returns the derivative curve of self, of one degree lower with one control point less
    ///
    /// Its control points are
    /// `Q_i = degree * (P_{i+1} - P_i) / (knots[i + degree + 1] - knots[i + 1])`
    /// over the knot vector trimmed by one knot at each end.
    /// Returns `None` for a curve of degree 0.
    pub fn hodograph(&self) -> Option<Self> {
        let knots = self.knots.derivative()?;
        let degree = self.degree();
        let scale: T = convert(degree as f64);
        let control_points = self
            .control_points
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let width = self.knots[i + degree + 1] - self.knots[i + 1];
                let coords = if width == T::zero() {
                    OVector::<T, D>::zeros()
                } else {
                    (&pair[1].coords - &pair[0].coords) * (scale / width)
                };
                OPoint::from(coords)
            })
            .collect();

        Some(Self {
            knots,
            control_points,
        })
    }

    /// Sample the curve at a given number of evenly spaced parameters between `start` and `end`
    /// both ends are included when `samples >= 2`
    pub fn sample_regular_range(
        &self,
        start: T,
        end: T,
        samples: usize,
    ) -> Result<Vec<OPoint<T, D>>, DomainError> {
        self.knots.ensure_contains(start)?;
        self.knots.ensure_contains(end)?;

        match samples {
            0 => Ok(vec![]),
            1 => Ok(vec![self.evaluate(start)?]),
            _ => {
                let last = samples - 1;
                let step = (end - start) / convert::<f64, T>(last as f64);
                (0..samples)
                    .map(|i| {
                        let t = if i == last {
                            end
                        } else {
                            start + step * convert::<f64, T>(i as f64)
                        };
                        self.evaluate(t)
                    })
                    .collect()
            }
        }
    }

    /// Sample the curve at a given number of evenly spaced parameters over the whole domain
    pub fn sample(&self, samples: usize) -> Result<Vec<OPoint<T, D>>, DomainError> {
        let (start, end) = self.domain();
        self.sample_regular_range(start, end, samples)
    }

    /// Cast the curve to a curve with another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(
        &self,
    ) -> Result<DeBoorEvaluator<F, D>, ValidationError> {
        DeBoorEvaluator::try_new(
            self.knots.cast()?,
            self.control_points
                .iter()
                .map(|p| p.clone().cast::<F>())
                .collect(),
        )
    }
}

/// Iterative De Boor recurrence over `degree + 1` working values
///
/// `d[j]` starts as control point `span - degree + j`. Level `r` blends
/// `d[j - 1]` and `d[j]` in place from right to left, so `d[degree]` holds
/// the curve value after the last level. A zero-width knot interval keeps
/// the left value.
fn de_boor<T: FloatingPoint, D: DimName>(
    knots: &[T],
    degree: usize,
    span: usize,
    t: T,
    mut d: Vec<OVector<T, D>>,
) -> OVector<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let lower = knots[span - degree + j];
            let width = knots[span + j - r + 1] - lower;
            // nonzero whenever the span has positive width
            let alpha = if width == T::zero() {
                T::zero()
            } else {
                (t - lower) / width
            };
            let blended = &d[j - 1] * (T::one() - alpha) + &d[j] * alpha;
            d[j] = blended;
        }
    }
    d.swap_remove(degree)
}

#[cfg(feature = "serde")]
impl<T, D: DimName> serde::Serialize for DeBoorEvaluator<T, D>
where
    T: FloatingPoint + serde::Serialize,
    DefaultAllocator: Allocator<D>,
    OPoint<T, D>: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DeBoorEvaluator", 2)?;
        state.serialize_field("knots", &self.knots)?;
        state.serialize_field("control_points", &self.control_points)?;
        state.end()
    }
}

/// Deserialized curves are validated like `try_new`
#[cfg(feature = "serde")]
impl<'de, T, D: DimName> serde::Deserialize<'de> for DeBoorEvaluator<T, D>
where
    T: FloatingPoint + serde::Deserialize<'de>,
    DefaultAllocator: Allocator<D>,
    OPoint<T, D>: serde::Deserialize<'de>,
{
    fn deserialize<S>(deserializer: S) -> Result<Self, S::Error>
    where
        S: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(rename = "DeBoorEvaluator")]
        #[serde(bound(
            deserialize = "KnotVector<T>: serde::Deserialize<'de>, OPoint<T, D>: serde::Deserialize<'de>"
        ))]
        struct Unchecked<T: FloatingPoint, D: DimName>
        where
            DefaultAllocator: Allocator<D>,
        {
            knots: KnotVector<T>,
            control_points: Vec<OPoint<T, D>>,
        }

        let unchecked = Unchecked::<T, D>::deserialize(deserializer)?;
        Self::try_new(unchecked.knots, unchecked.control_points).map_err(serde::de::Error::custom)
    }
}
