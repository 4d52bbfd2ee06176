use gradix_core::{dtype::DType, error::Result};
use gradix_engine::{Engine, Tensor};

fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "element {i}: {a} vs {e}"
        );
    }
}

fn setup(engine: &mut Engine, data: Vec<f32>, shape: &[usize]) -> Result<Tensor> {
    engine.tensor(data, shape)
}

#[test]
fn unary_forward_values() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![-2.0, 0.0, 3.0], &[3])?;

    let negated = engine.neg(&x)?;
    assert_eq!(engine.read_f32(&negated)?, vec![2.0, 0.0, -3.0]);
    let magnitude = engine.abs(&x)?;
    assert_eq!(engine.read_f32(&magnitude)?, vec![2.0, 0.0, 3.0]);
    let rectified = engine.relu(&x)?;
    assert_eq!(engine.read_f32(&rectified)?, vec![0.0, 0.0, 3.0]);
    let stepped = engine.step(&x)?;
    assert_eq!(engine.read_f32(&stepped)?, vec![0.0, 0.0, 1.0]);
    let squared = engine.square(&x)?;
    assert_eq!(engine.read_f32(&squared)?, vec![4.0, 0.0, 9.0]);
    Ok(())
}

#[test]
fn exp_log_gradients() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![1.0, 2.0], &[2])?;

    let grads = engine.gradients(
        |eng| {
            let e = eng.exp(&x)?;
            eng.sum(&e)
        },
        &[&x],
    )?;
    assert_close(&engine.read_f32(&grads[0])?, &[1.0f32.exp(), 2.0f32.exp()], 1e-5);

    let grads = engine.gradients(
        |eng| {
            let l = eng.log(&x)?;
            eng.sum(&l)
        },
        &[&x],
    )?;
    assert_close(&engine.read_f32(&grads[0])?, &[1.0, 0.5], 1e-6);
    Ok(())
}

#[test]
fn sigmoid_tanh_gradients() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![0.0], &[1])?;

    let grads = engine.gradients(
        |eng| {
            let s = eng.sigmoid(&x)?;
            eng.sum(&s)
        },
        &[&x],
    )?;
    // sigmoid'(0) = 0.25
    assert_close(&engine.read_f32(&grads[0])?, &[0.25], 1e-6);

    let grads = engine.gradients(
        |eng| {
            let t = eng.tanh(&x)?;
            eng.sum(&t)
        },
        &[&x],
    )?;
    // tanh'(0) = 1
    assert_close(&engine.read_f32(&grads[0])?, &[1.0], 1e-6);
    Ok(())
}

#[test]
fn reductions_over_axes() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?;

    let rows = engine.sum_axes(&x, &[1], false)?;
    assert_eq!(rows.shape(), &[2]);
    assert_eq!(engine.read_f32(&rows)?, vec![6.0, 15.0]);

    let cols = engine.sum_axes(&x, &[0], true)?;
    assert_eq!(cols.shape(), &[1, 3]);
    assert_eq!(engine.read_f32(&cols)?, vec![5.0, 7.0, 9.0]);

    let peak = engine.max(&x)?;
    assert_eq!(engine.read_scalar(&peak)?, 6.0);
    let trough = engine.min(&x)?;
    assert_eq!(engine.read_scalar(&trough)?, 1.0);

    let mean = engine.mean(&x)?;
    assert_close(&[engine.read_scalar(&mean)?], &[3.5], 1e-6);

    let arg = engine.arg_max(&x, 1)?;
    assert_eq!(arg.dtype(), DType::I32);
    assert_eq!(engine.read(&arg)?.as_i32()?, &[2, 2]);
    Ok(())
}

#[test]
fn max_gradient_flows_to_the_peak() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![1.0, 5.0, 3.0], &[3])?;
    let grads = engine.gradients(|eng| eng.max(&x), &[&x])?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![0.0, 1.0, 0.0]);
    Ok(())
}

#[test]
fn mean_gradient_is_uniform() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![1.0, 2.0, 3.0, 4.0], &[4])?;
    let grads = engine.gradients(|eng| eng.mean(&x), &[&x])?;
    assert_close(&engine.read_f32(&grads[0])?, &[0.25; 4], 1e-6);
    Ok(())
}

#[test]
fn matmul_forward_and_gradients() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = setup(&mut engine, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?;
    let b = setup(&mut engine, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], &[3, 2])?;

    let y = engine.matmul(&a, &b)?;
    assert_eq!(y.shape(), &[2, 2]);
    assert_eq!(engine.read_f32(&y)?, vec![58.0, 64.0, 139.0, 154.0]);

    let grads = engine.gradients(
        |eng| {
            let y = eng.matmul(&a, &b)?;
            eng.sum(&y)
        },
        &[&a, &b],
    )?;
    // da = ones(2,2) @ b^T, db = a^T @ ones(2,2)
    assert_eq!(
        engine.read_f32(&grads[0])?,
        vec![15.0, 19.0, 23.0, 15.0, 19.0, 23.0]
    );
    assert_eq!(
        engine.read_f32(&grads[1])?,
        vec![5.0, 5.0, 7.0, 7.0, 9.0, 9.0]
    );
    Ok(())
}

#[test]
fn shape_ops_round_trip_gradients() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?;

    let reshaped = engine.reshape(&x, &[3, 2])?;
    assert_eq!(reshaped.shape(), &[3, 2]);
    assert_eq!(engine.read_f32(&reshaped)?, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    let transposed = engine.transpose(&x, &[1, 0])?;
    assert_eq!(transposed.shape(), &[3, 2]);
    assert_eq!(engine.read_f32(&transposed)?, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

    let sliced = engine.slice(&x, &[0, 1], &[2, 2])?;
    assert_eq!(engine.read_f32(&sliced)?, vec![2.0, 3.0, 5.0, 6.0]);

    // Gradient of a slice scatters back into the source shape.
    let grads = engine.gradients(
        |eng| {
            let part = eng.slice(&x, &[0, 1], &[2, 2])?;
            eng.sum(&part)
        },
        &[&x],
    )?;
    assert_eq!(
        engine.read_f32(&grads[0])?,
        vec![0.0, 1.0, 1.0, 0.0, 1.0, 1.0]
    );

    let padded = engine.pad(&x, &[(0, 0), (1, 0)])?;
    assert_eq!(padded.shape(), &[2, 4]);
    assert_eq!(
        engine.read_f32(&padded)?,
        vec![0.0, 1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0]
    );

    let other = setup(&mut engine, vec![7.0, 8.0, 9.0], &[1, 3])?;
    let joined = engine.concat(&x, &other, 0)?;
    assert_eq!(joined.shape(), &[3, 3]);
    assert_eq!(
        engine.read_f32(&joined)?,
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
    );

    let grads = engine.gradients(
        |eng| {
            let joined = eng.concat(&x, &other, 0)?;
            eng.sum(&joined)
        },
        &[&x, &other],
    )?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![1.0; 6]);
    assert_eq!(engine.read_f32(&grads[1])?, vec![1.0; 3]);
    Ok(())
}

#[test]
fn select_routes_gradients_by_mask() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = setup(&mut engine, vec![1.0, 2.0, 3.0], &[3])?;
    let b = setup(&mut engine, vec![10.0, 20.0, 30.0], &[3])?;
    let cond = engine.tensor(vec![true, false, true], &[3])?;

    let y = engine.select(&cond, &a, &b)?;
    assert_eq!(engine.read_f32(&y)?, vec![1.0, 20.0, 3.0]);

    let grads = engine.gradients(
        |eng| {
            let y = eng.select(&cond, &a, &b)?;
            eng.sum(&y)
        },
        &[&a, &b],
    )?;
    assert_eq!(engine.read_f32(&grads[0])?, vec![1.0, 0.0, 1.0]);
    assert_eq!(engine.read_f32(&grads[1])?, vec![0.0, 1.0, 0.0]);
    Ok(())
}

#[test]
fn comparisons_produce_bool_masks() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = setup(&mut engine, vec![1.0, 2.0, 3.0], &[3])?;
    let b = setup(&mut engine, vec![2.0, 2.0, 2.0], &[3])?;

    let gt = engine.greater(&a, &b)?;
    assert_eq!(gt.dtype(), DType::BOOL);
    assert_eq!(engine.read(&gt)?.into_bool()?, vec![false, false, true]);

    let eq = engine.equal(&a, &b)?;
    assert_eq!(engine.read_f32(&eq)?, vec![0.0, 1.0, 0.0]);

    let both = engine.logical_and(&gt, &eq)?;
    assert_eq!(engine.read_f32(&both)?, vec![0.0, 0.0, 0.0]);
    let either = engine.logical_or(&gt, &eq)?;
    assert_eq!(engine.read_f32(&either)?, vec![0.0, 1.0, 1.0]);
    Ok(())
}

#[test]
fn softmax_rows_sum_to_one() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![1.0, 2.0, 3.0, 1.0, 1.0, 1.0], &[2, 3])?;
    let y = engine.softmax(&x)?;
    let values = engine.read_f32(&y)?;
    assert_close(&[values[0] + values[1] + values[2]], &[1.0], 1e-5);
    assert_close(&[values[3], values[4], values[5]], &[1.0 / 3.0; 3], 1e-5);
    assert!(values[2] > values[1] && values[1] > values[0]);
    Ok(())
}

#[test]
fn batch_norm_normalizes_to_unit_scale() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![2.0, 4.0, 6.0], &[3])?;
    let mean = engine.scalar(4.0)?;
    let variance = engine.scalar(4.0)?;
    let y = engine.batch_norm(&x, &mean, &variance, None, None, 0.0)?;
    assert_close(&engine.read_f32(&y)?, &[-1.0, 0.0, 1.0], 1e-5);

    let scale = engine.scalar(2.0)?;
    let offset = engine.scalar(10.0)?;
    let y = engine.batch_norm(&x, &mean, &variance, Some(&scale), Some(&offset), 0.0)?;
    assert_close(&engine.read_f32(&y)?, &[8.0, 10.0, 12.0], 1e-5);
    Ok(())
}

#[test]
fn conv2d_identity_filter_preserves_input() -> Result<()> {
    let mut engine = Engine::cpu();
    // 1x3x3x1 input, 1x1 filter of weight 1: convolution is identity.
    let x = setup(
        &mut engine,
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
        &[1, 3, 3, 1],
    )?;
    let filter = setup(&mut engine, vec![1.0], &[1, 1, 1, 1])?;
    let y = engine.conv2d(&x, &filter, (1, 1), (0, 0))?;
    assert_eq!(y.shape(), &[1, 3, 3, 1]);
    assert_eq!(
        engine.read_f32(&y)?,
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
    );
    Ok(())
}

#[test]
fn conv2d_sums_window_and_gradients_match() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(&mut engine, vec![1.0; 16], &[1, 4, 4, 1])?;
    let filter = setup(&mut engine, vec![1.0; 4], &[2, 2, 1, 1])?;

    let y = engine.conv2d(&x, &filter, (1, 1), (0, 0))?;
    assert_eq!(y.shape(), &[1, 3, 3, 1]);
    assert_eq!(engine.read_f32(&y)?, vec![4.0; 9]);

    let grads = engine.gradients(
        |eng| {
            let y = eng.conv2d(&x, &filter, (1, 1), (0, 0))?;
            eng.sum(&y)
        },
        &[&x, &filter],
    )?;
    // Corner pixels feed one window, edges two, the center four.
    assert_eq!(
        engine.read_f32(&grads[0])?,
        vec![
            1.0, 2.0, 2.0, 1.0, //
            2.0, 4.0, 4.0, 2.0, //
            2.0, 4.0, 4.0, 2.0, //
            1.0, 2.0, 2.0, 1.0,
        ]
    );
    // Every filter tap sees all nine windows over an all-ones input.
    assert_eq!(engine.read_f32(&grads[1])?, vec![9.0; 4]);
    Ok(())
}

#[test]
fn pooling_forward_and_gradients() -> Result<()> {
    let mut engine = Engine::cpu();
    let x = setup(
        &mut engine,
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0],
        &[1, 4, 4, 1],
    )?;

    let pooled = engine.max_pool(&x, (2, 2), (2, 2), (0, 0))?;
    assert_eq!(pooled.shape(), &[1, 2, 2, 1]);
    assert_eq!(engine.read_f32(&pooled)?, vec![6.0, 8.0, 14.0, 16.0]);

    let grads = engine.gradients(
        |eng| {
            let pooled = eng.max_pool(&x, (2, 2), (2, 2), (0, 0))?;
            eng.sum(&pooled)
        },
        &[&x],
    )?;
    assert_eq!(
        engine.read_f32(&grads[0])?,
        vec![
            0.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 1.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 1.0,
        ]
    );

    let averaged = engine.avg_pool(&x, (2, 2), (2, 2), (0, 0))?;
    assert_eq!(engine.read_f32(&averaged)?, vec![3.5, 5.5, 11.5, 13.5]);

    let grads = engine.gradients(
        |eng| {
            let averaged = eng.avg_pool(&x, (2, 2), (2, 2), (0, 0))?;
            eng.sum(&averaged)
        },
        &[&x],
    )?;
    assert_close(&engine.read_f32(&grads[0])?, &[0.25; 16], 1e-6);
    Ok(())
}

#[test]
fn lstm_cell_with_zero_weights_halves_the_state() -> Result<()> {
    let mut engine = Engine::cpu();
    let hidden = 2;
    // Zero kernel and bias: every gate preactivation is zero.
    let kernel = engine.zeros(&[3, 4 * hidden])?;
    let bias = engine.zeros(&[4 * hidden])?;
    let data = engine.ones(&[1, 1])?;
    let c = engine.ones(&[1, hidden])?;
    let h = engine.zeros(&[1, hidden])?;

    let (new_c, new_h) = engine.basic_lstm_cell(0.0, &kernel, &bias, &data, &c, &h)?;
    // f = sigmoid(0) = 0.5 keeps half of c; i * tanh(j) = 0.5 * 0 adds
    // nothing; o = 0.5 reads half of tanh(new_c).
    assert_close(&engine.read_f32(&new_c)?, &[0.5, 0.5], 1e-5);
    let expected_h = 0.5 * 0.5f32.tanh();
    assert_close(&engine.read_f32(&new_h)?, &[expected_h, expected_h], 1e-5);
    Ok(())
}

#[test]
fn multi_rnn_cell_threads_hidden_state_through_layers() -> Result<()> {
    let mut engine = Engine::cpu();
    let hidden = 2;
    let kernel0 = engine.zeros(&[1 + hidden, 4 * hidden])?;
    let bias0 = engine.zeros(&[4 * hidden])?;
    let kernel1 = engine.zeros(&[2 * hidden, 4 * hidden])?;
    let bias1 = engine.zeros(&[4 * hidden])?;
    let data = engine.ones(&[1, 1])?;
    let c = vec![engine.ones(&[1, hidden])?, engine.ones(&[1, hidden])?];
    let h = vec![engine.zeros(&[1, hidden])?, engine.zeros(&[1, hidden])?];

    let cell0 = move |eng: &mut Engine, data: &Tensor, c: &Tensor, h: &Tensor| {
        eng.basic_lstm_cell(0.0, &kernel0, &bias0, data, c, h)
    };
    let cell1 = move |eng: &mut Engine, data: &Tensor, c: &Tensor, h: &Tensor| {
        eng.basic_lstm_cell(0.0, &kernel1, &bias1, data, c, h)
    };

    let (new_c, new_h) = engine.multi_rnn_cell(&[&cell0, &cell1], &data, &c, &h)?;
    assert_eq!(new_c.len(), 2);
    assert_eq!(new_h.len(), 2);
    assert_close(&engine.read_f32(&new_c[0])?, &[0.5, 0.5], 1e-5);
    assert_close(&engine.read_f32(&new_c[1])?, &[0.5, 0.5], 1e-5);
    Ok(())
}

#[test]
fn pow_and_extremum_gradients() -> Result<()> {
    let mut engine = Engine::cpu();
    let a = setup(&mut engine, vec![2.0, 3.0], &[2])?;
    let b = setup(&mut engine, vec![3.0, 2.0], &[2])?;

    let y = engine.pow(&a, &b)?;
    assert_close(&engine.read_f32(&y)?, &[8.0, 9.0], 1e-5);

    let grads = engine.gradients(
        |eng| {
            let y = eng.pow(&a, &b)?;
            eng.sum(&y)
        },
        &[&a],
    )?;
    // d(a^b)/da = b * a^(b-1)
    assert_close(&engine.read_f32(&grads[0])?, &[12.0, 6.0], 1e-4);

    let grads = engine.gradients(
        |eng| {
            let y = eng.maximum(&a, &b)?;
            eng.sum(&y)
        },
        &[&a, &b],
    )?;
    // max(2,3) takes b, max(3,2) takes a.
    assert_eq!(engine.read_f32(&grads[0])?, vec![0.0, 1.0]);
    assert_eq!(engine.read_f32(&grads[1])?, vec![1.0, 0.0]);
    Ok(())
}
