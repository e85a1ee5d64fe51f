use clap::Parser;
use color_eyre::eyre::bail;
use color_eyre::Result;
use log::info;

use chamber_sweep::patch_grid::{patch_label, patch_positions, rotate, Rotation};

/// Prints the patch layout of one array tile before and after rotation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct GridParams {
    /// Patches along X
    #[arg(long, default_value_t = 4)]
    nx: usize,

    /// Patches along Y
    #[arg(long, default_value_t = 4)]
    ny: usize,

    /// Tile column within the array
    #[arg(long, default_value_t = 1)]
    column: u16,

    /// Tile row within the array
    #[arg(long, default_value_t = 1)]
    row: u16,

    /// Patch spacing
    #[arg(long, default_value_t = 10.0)]
    spacing: f64,

    /// Rotations to show, in degrees (0, 90, 180 or 270)
    #[arg(short = 'r', long, num_args = 1.., default_values_t = [90u16, 180, 270])]
    rotations: Vec<u16>,
}

fn print_grid(title: &str, labels: &[String], nx: usize) {
    println!("{title}:");
    for row in labels.chunks(nx) {
        println!("[{}]", row.join(", "));
    }
    println!();
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;
    let params = GridParams::parse();
    if params.nx == 0 || params.ny == 0 {
        bail!("grid dimensions must be non-zero, got {}x{}", params.nx, params.ny);
    }

    let poses = patch_positions(params.column, params.row, params.nx, params.ny, params.spacing);
    for (i, pose) in poses.iter().enumerate() {
        info!("patch {}: t_x {}, t_y {}", i, pose.t_x, pose.t_y);
    }

    let labels: Vec<String> = (0..params.nx * params.ny).map(patch_label).collect();
    print_grid("Original positions", &labels, params.nx);

    for degrees in &params.rotations {
        let rotation = Rotation::try_from(*degrees)?;
        let (rotated, rx, _) = rotate(&labels, params.nx, params.ny, rotation)?;
        print_grid(&format!("Positions after {degrees}' rotation"), &rotated, rx);
    }
    Ok(())
}

