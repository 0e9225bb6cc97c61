//! Display a synthetic image in a running DS9
//!
//! Sends a gradient image, zooms to fit and reads a few settings back.
//!
//! # Usage
//!
//! ```bash
//! # Default template DS9:*
//! cargo run --example display_image
//!
//! # Specific access point
//! RUST_LOG=debug cargo run --example display_image DS9:ds9
//! ```

use ds9_rust::command;
use ds9_rust::error::Result;
use ds9_rust::io::SessionBuilder;
use ndarray::Array2;
use std::env;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let target = env::args().nth(1).unwrap_or_else(|| "DS9:*".to_string());

    let mut ds9 = SessionBuilder::new().xpa_tools().target(target).build();
    println!("[INFO] Connected to DS9 {}", ds9.version()?);

    let image = Array2::<f32>::from_shape_fn((300, 400), |(y, x)| {
        ((x as f32 / 40.0).sin() + (y as f32 / 30.0).cos()) * 100.0
    });
    ds9.set_array(&image)?;
    ds9.set(&command!("zoom", "to", "fit"))?;
    ds9.set_cmap("heat")?;

    let size = ds9.image_size()?;
    println!("[INFO] Image size: {:?}, bitpix {}", size, ds9.bitpix()?);
    println!("[INFO] Zoom: {}, pan: {:?}", ds9.zoom()?, ds9.pan()?);

    match ds9.get_image_as::<f32>()? {
        Some(shown) => println!("[INFO] Read back {} pixels", shown.len()),
        None => println!("[INFO] Frame is empty"),
    }
    Ok(())
}
