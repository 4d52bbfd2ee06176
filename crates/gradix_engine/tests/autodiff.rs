use gradix_core::error::{Error, Result};
use gradix_engine::{Engine, Tensor};

fn setup_vec(engine: &mut Engine, data: Vec<f32>, shape: &[usize]) -> Result<Tensor> {
    engine.tensor(data, shape)
}

#[test]
fn add_vjp_passes_seed_through_both_inputs() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = setup_vec(&mut engine, vec![1.0, 2.0, 3.0], &[3])?;
    let b = setup_vec(&mut engine, vec![3.0, 4.0, 5.0], &[3])?;

    let y = engine.add(&a, &b)?;
    assert_eq!(engine.read_f32(&y)?, vec![4.0, 6.0, 8.0]);

    let seed = setup_vec(&mut engine, vec![6.0, 7.0, 8.0], &[3])?;
    let grads = engine.vjp(|eng| eng.add(&a, &b), &[&a, &b], &seed)?;

    assert_eq!(engine.read_f32(&grads[0])?, vec![6.0, 7.0, 8.0]);
    assert_eq!(engine.read_f32(&grads[1])?, vec![6.0, 7.0, 8.0]);
    Ok(())
}

#[test]
fn scalar_broadcast_gradient_sums_every_entry() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = setup_vec(&mut engine, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?;
    let b = engine.scalar(2.0)?;

    let y = engine.add(&a, &b)?;
    assert_eq!(y.shape(), &[2, 3]);
    assert_eq!(engine.read_f32(&y)?, vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

    let seed = setup_vec(&mut engine, vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0], &[2, 3])?;
    let grads = engine.vjp(|eng| eng.add(&a, &b), &[&a, &b], &seed)?;

    assert_eq!(
        engine.read_f32(&grads[0])?,
        vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]
    );
    assert_eq!(grads[1].shape(), &[] as &[usize]);
    assert_eq!(engine.read_f32(&grads[1])?, vec![42.0]);
    Ok(())
}

#[test]
fn row_broadcast_gradient_sums_columnwise() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = setup_vec(&mut engine, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?;
    let b = setup_vec(&mut engine, vec![0.0, 1.0, 0.0], &[1, 3])?;

    let y = engine.add(&a, &b)?;
    assert_eq!(engine.read_f32(&y)?, vec![1.0, 3.0, 3.0, 4.0, 6.0, 6.0]);

    let seed = setup_vec(&mut engine, vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0], &[2, 3])?;
    let grads = engine.vjp(|eng| eng.add(&a, &b), &[&a, &b], &seed)?;

    assert_eq!(
        engine.read_f32(&grads[0])?,
        vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]
    );
    assert_eq!(grads[1].shape(), &[1, 3]);
    assert_eq!(engine.read_f32(&grads[1])?, vec![10.0, 14.0, 18.0]);
    Ok(())
}

#[test]
fn product_gradients_swap_operands() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup_vec(&mut engine, vec![1.0, 2.0, 3.0], &[3])?;
    let w = setup_vec(&mut engine, vec![3.0, 4.0, 5.0], &[3])?;

    let grads = engine.gradients(
        |eng| {
            let prod = eng.mul(&x, &w)?;
            eng.sum(&prod)
        },
        &[&x, &w],
    )?;

    assert_eq!(engine.read_f32(&grads[0])?, vec![3.0, 4.0, 5.0]);
    assert_eq!(engine.read_f32(&grads[1])?, vec![1.0, 2.0, 3.0]);
    Ok(())
}

#[test]
fn fan_out_accumulates_both_contributions() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup_vec(&mut engine, vec![1.0, 2.0, 3.0], &[3])?;

    // y = sum(x + x): each element contributes twice.
    let grads = engine.gradients(
        |eng| {
            let doubled = eng.add(&x, &x)?;
            eng.sum(&doubled)
        },
        &[&x],
    )?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![2.0, 2.0, 2.0]);

    // y = sum(x * x): the product rule doubles as well.
    let grads = engine.gradients(
        |eng| {
            let squared = eng.mul(&x, &x)?;
            eng.sum(&squared)
        },
        &[&x],
    )?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![2.0, 4.0, 6.0]);
    Ok(())
}

#[test]
fn dead_branches_are_skipped() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = setup_vec(&mut engine, vec![1.0, 2.0], &[2])?;
    let b = setup_vec(&mut engine, vec![3.0, 4.0], &[2])?;

    // The product is recorded but never reaches the output; only the
    // direct path from `a` carries gradient.
    let grads = engine.gradients(
        |eng| {
            let _unused = eng.mul(&a, &b)?;
            eng.sum(&a)
        },
        &[&a],
    )?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![1.0, 1.0]);

    let err = engine
        .gradients(
            |eng| {
                let _unused = eng.mul(&a, &b)?;
                eng.sum(&a)
            },
            &[&b],
        )
        .unwrap_err();
    assert!(matches!(err, Error::MissingGradient { .. }));
    Ok(())
}

#[test]
fn non_scalar_output_is_rejected() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup_vec(&mut engine, vec![1.0, 2.0, 3.0], &[3])?;

    let err = engine
        .gradients(|eng| eng.add(&x, &x), &[&x])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidGradientTarget { shape } if shape == vec![3]));
    Ok(())
}

#[test]
fn single_element_vector_output_is_rejected() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup_vec(&mut engine, vec![4.0], &[1])?;

    // A [1]-shaped output holds one value but is not rank 0; only vjp
    // with an explicit seed may differentiate it.
    let err = engine
        .gradients(|eng| eng.add(&x, &x), &[&x])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidGradientTarget { shape } if shape == vec![1]));

    let seed = setup_vec(&mut engine, vec![1.0], &[1])?;
    let grads = engine.vjp(|eng| eng.add(&x, &x), &[&x], &seed)?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![2.0]);
    Ok(())
}

#[test]
fn unrelated_target_reports_missing_gradient() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup_vec(&mut engine, vec![1.0, 2.0], &[2])?;
    let stranger = setup_vec(&mut engine, vec![5.0], &[1])?;

    let err = engine
        .gradients(|eng| eng.sum(&x), &[&stranger])
        .unwrap_err();
    assert!(matches!(err, Error::MissingGradient { .. }));
    Ok(())
}

#[test]
fn second_order_gradient_of_square() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = engine.scalar(3.0)?;

    let second = engine.gradients(
        |eng| {
            let first = eng.gradients(|inner| inner.square(&x), &[&x])?;
            Ok(first[0].clone())
        },
        &[&x],
    )?;

    // d²(x²)/dx² = 2
    assert_eq!(engine.read_f32(&second[0])?, vec![2.0]);
    Ok(())
}

#[test]
fn chained_ops_compose_through_the_tape() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup_vec(&mut engine, vec![1.0, 2.0], &[2])?;

    // y = sum((2x + 1)^2), dy/dx = 2 * (2x + 1) * 2
    let grads = engine.gradients(
        |eng| {
            let two = eng.scalar(2.0)?;
            let one = eng.scalar(1.0)?;
            let scaled = eng.mul(&x, &two)?;
            let shifted = eng.add(&scaled, &one)?;
            let squared = eng.square(&shifted)?;
            eng.sum(&squared)
        },
        &[&x],
    )?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![12.0, 20.0]);
    Ok(())
}

#[test]
fn value_and_gradients_returns_forward_value() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup_vec(&mut engine, vec![1.0, 2.0, 3.0], &[3])?;

    let (value, grads) = engine.value_and_gradients(
        |eng| {
            let squared = eng.square(&x)?;
            eng.sum(&squared)
        },
        &[&x],
    )?;
    assert_eq!(engine.read_scalar(&value)?, 14.0);
    assert_eq!(engine.read_f32(&grads[0])?, vec![2.0, 4.0, 6.0]);
    Ok(())
}

#[test]
fn variable_gradients_cover_every_registered_variable() -> Result<()> {
    let mut engine = Engine::cpu();
    let w_init = engine.tensor(vec![1.0f32, 2.0], &[2])?;
    let b_init = engine.tensor(vec![0.5f32], &[1])?;
    let w = engine.variable("w", w_init)?;
    let b = engine.variable("b", b_init)?;

    let (value, grads) = engine.variable_gradients(|eng| {
        let w = eng.variables()[0].value()?;
        let b = eng.variables()[1].value()?;
        let weighted = eng.mul(&w, &w)?;
        let total = eng.sum(&weighted)?;
        let biased = eng.add(&total, &b)?;
        eng.sum(&biased)
    })?;

    assert_eq!(engine.read_scalar(&value)?, 5.5);
    assert_eq!(engine.read_f32(&grads["w"])?, vec![2.0, 4.0]);
    assert_eq!(engine.read_f32(&grads["b"])?, vec![1.0]);
    assert_eq!(w.name(), "w");
    assert_eq!(b.name(), "b");
    Ok(())
}
