use gradix::prelude::*;

fn main() -> Result<()> {
    let mut engine = Engine::cpu();

    let a = engine.tensor(vec![1.0, 2.0, 3.0], &[3])?;
    let b = engine.tensor(vec![4.0, 5.0, 6.0], &[3])?;
    let c = engine.tensor(vec![7.0, 8.0, 9.0], &[3])?;

    let (d, grads) = engine.value_and_gradients(
        |eng| {
            let ab = eng.mul(&a, &b)?;
            let ac = eng.mul(&a, &c)?;
            let bc = eng.mul(&b, &c)?;
            let sum = eng.add(&a, &ab)?;
            let sum = eng.add(&sum, &ac)?;
            let sum = eng.add(&sum, &bc)?;
            eng.sum(&sum)
        },
        &[&a, &b, &c],
    )?;

    println!("d: {:?}", engine.read_f32(&d)?);
    println!("a.grad: {:?}", engine.read_f32(&grads[0])?);
    println!("b.grad: {:?}", engine.read_f32(&grads[1])?);
    println!("c.grad: {:?}", engine.read_f32(&grads[2])?);

    Ok(())
}
