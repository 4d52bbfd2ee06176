use gradix_core::error::{Error, Result};
use gradix_engine::Engine;

#[test]
fn equal_shapes_add_elementwise() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = engine.tensor(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2])?;
    let b = engine.tensor(vec![10.0f32, 20.0, 30.0, 40.0], &[2, 2])?;
    let y = engine.add(&a, &b)?;
    assert_eq!(y.shape(), &[2, 2]);
    assert_eq!(engine.read_f32(&y)?, vec![11.0, 22.0, 33.0, 44.0]);
    Ok(())
}

#[test]
fn incompatible_shapes_fail_without_side_effects() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = engine.tensor(vec![0.0f32; 6], &[2, 3])?;
    let transposed = engine.tensor(vec![0.0f32; 6], &[3, 2])?;
    let short = engine.tensor(vec![0.0f32; 2], &[1, 2])?;
    let before = engine.storage_count();

    let err = engine.add(&a, &transposed).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
    let err = engine.add(&a, &short).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));

    // A failed dispatch leaves no allocation behind, and a later
    // differentiation sees no trace of it on the tape.
    assert_eq!(engine.storage_count(), before);
    let grads = engine.gradients(
        |eng| {
            let bad = eng.add(&a, &transposed);
            assert!(bad.is_err());
            eng.sum(&a)
        },
        &[&a],
    )?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![1.0; 6]);
    Ok(())
}

#[test]
fn rank3_broadcast_reduces_every_stretched_dim() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = engine.tensor(vec![1.0f32; 24], &[2, 3, 4])?;
    let b = engine.tensor(vec![1.0f32, 2.0, 3.0], &[3, 1])?;

    let y = engine.add(&a, &b)?;
    assert_eq!(y.shape(), &[2, 3, 4]);

    let grads = engine.gradients(
        |eng| {
            let y = eng.add(&a, &b)?;
            eng.sum(&y)
        },
        &[&a, &b],
    )?;
    assert_eq!(grads[0].shape(), &[2, 3, 4]);
    assert_eq!(engine.read_f32(&grads[0])?, vec![1.0; 24]);
    // Each [3,1] entry was stretched over 2 * 4 positions.
    assert_eq!(grads[1].shape(), &[3, 1]);
    assert_eq!(engine.read_f32(&grads[1])?, vec![8.0, 8.0, 8.0]);
    Ok(())
}

#[test]
fn rank4_broadcast_reduces_leading_and_unit_dims() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = engine.tensor(vec![0.5f32; 48], &[2, 3, 2, 4])?;
    let b = engine.tensor(vec![1.0f32; 8], &[1, 2, 4])?;

    let y = engine.mul(&a, &b)?;
    assert_eq!(y.shape(), &[2, 3, 2, 4]);

    let grads = engine.gradients(
        |eng| {
            let y = eng.mul(&a, &b)?;
            eng.sum(&y)
        },
        &[&b],
    )?;
    // b was stretched over the leading 2 and the 3 in dim 1.
    assert_eq!(grads[0].shape(), &[1, 2, 4]);
    assert_eq!(engine.read_f32(&grads[0])?, vec![3.0; 8]);
    Ok(())
}

#[test]
fn scalar_broadcasts_against_anything() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = engine.tensor(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?;
    let s = engine.scalar(10.0)?;
    let y = engine.mul(&a, &s)?;
    assert_eq!(y.shape(), &[2, 3]);
    assert_eq!(
        engine.read_f32(&y)?,
        vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]
    );
    Ok(())
}

#[test]
fn mixed_dtypes_promote_before_dispatch() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = engine.tensor(vec![1.0f32, 2.0], &[2])?;
    let b = engine.tensor(vec![3i32, 4], &[2])?;
    let y = engine.add(&a, &b)?;
    assert_eq!(y.dtype(), gradix_core::dtype::DType::F32);
    assert_eq!(engine.read_f32(&y)?, vec![4.0, 6.0]);
    Ok(())
}
