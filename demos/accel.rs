use gradix::prelude::*;

fn main() -> Result<()> {
    let mut engine = Engine::accel();

    let x = engine.randn(&[64, 64], 0.0, 1.0)?;
    let w = engine.randn(&[64, 64], 0.0, 0.1)?;

    let (loss, grads) = engine.value_and_gradients(
        |eng| {
            let y = eng.matmul(&x, &w)?;
            let activated = eng.tanh(&y)?;
            let squared = eng.square(&activated)?;
            eng.mean(&squared)
        },
        &[&w],
    )?;

    println!("loss: {}", engine.read_scalar(&loss)?);

    // Readback overlaps with any still-queued device work.
    let dw = engine.read_async(&grads[0]).wait()?;
    println!("dw[0..4]: {:?}", &dw.to_f32_vec()[..4]);

    Ok(())
}
