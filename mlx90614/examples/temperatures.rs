use std::env;
use std::thread::sleep;
use std::time::Duration;

use anyhow::Context;

use mlx90614::{Config, Mlx90614};

fn main() -> anyhow::Result<()> {
    let bus_number: u8 = match env::var("MLX90614_BUS") {
        Ok(bus) => bus
            .parse()
            .with_context(|| format!("MLX90614_BUS must be a bus number, not {:?}", bus))?,
        Err(_) => 1,
    };
    let mut sensor = match Mlx90614::open(bus_number, Config::default()) {
        Ok(sensor) => sensor,
        Err(err) => {
            let (cause, _) = err.into_parts();
            return Err(cause).context("MLX90614 did not initialize");
        }
    };
    println!("MLX90614 initialized on /dev/i2c-{}", bus_number);
    println!("ID: {:016X}", sensor.id()?);
    println!("PWM control: {:#06X}", sensor.power_management_control()?);
    sensor.set_object_temperature_min_max(0.0, 150.0)?;
    println!(
        "Object range: {:.2} ℃ to {:.2} ℃",
        sensor.object_temperature_min()?,
        sensor.object_temperature_max()?
    );
    sensor.set_object_emissivity_coefficient(1.0)?;
    println!("Emissivity: {:.4}", sensor.object_emissivity_coefficient()?);

    let delay = Duration::from_millis(500);
    loop {
        sleep(delay);
        // Keep going if a single reading fails.
        match (sensor.object_temperature_1(), sensor.ambient_temperature()) {
            (Ok(object), Ok(ambient)) => {
                println!("Object: {:7.3} ℃  Ambient: {:7.3} ℃", object, ambient)
            }
            (Err(err), _) | (_, Err(err)) => eprintln!("Reading failed: {}", err),
        }
    }
}
