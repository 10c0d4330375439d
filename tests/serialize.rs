#![cfg(feature = "serde")]

use deboor::prelude::*;
use nalgebra::Point2;

#[test]
fn round_trip() -> anyhow::Result<()> {
    let curve = DeBoorEvaluator2D::try_clamped(
        2,
        vec![
            Point2::new(0., 0.),
            Point2::new(1., 2.),
            Point2::new(3., 2.),
            Point2::new(4., 0.),
        ],
    )?;
    let json = serde_json::to_string_pretty(&curve)?;
    let restored: DeBoorEvaluator2D<f64> = serde_json::from_str(&json)?;
    assert_eq!(restored, curve);
    assert_eq!(restored.evaluate(1.5)?, curve.evaluate(1.5)?);
    Ok(())
}

#[test]
fn knot_vector_layout() -> anyhow::Result<()> {
    let knots = KnotVector::try_new(1, vec![0., 0., 1., 1.])?;
    assert_eq!(
        serde_json::to_string(&knots)?,
        r#"{"degree":1,"knots":[0.0,0.0,1.0,1.0]}"#
    );
    Ok(())
}

#[test]
fn invalid_input_is_rejected() {
    let decreasing = r#"{"degree":1,"knots":[0.0,1.0,0.5,2.0]}"#;
    assert!(serde_json::from_str::<KnotVector<f64>>(decreasing).is_err());

    let huge_degree = r#"{"degree":18446744073709551615,"knots":[0.0,1.0]}"#;
    let err = serde_json::from_str::<KnotVector<f64>>(huge_degree).unwrap_err();
    assert!(err.to_string().contains("too large"));

    let mismatch = r#"{
        "knots": {"degree": 1, "knots": [0.0, 0.0, 1.0, 1.0]},
        "control_points": [[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]
    }"#;
    let err = serde_json::from_str::<DeBoorEvaluator2D<f64>>(mismatch).unwrap_err();
    assert!(err
        .to_string()
        .contains("Invalid number of control points, got 3, expected 2"));
}
