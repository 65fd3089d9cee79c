//! Stellar locus axis calculator
//!
//! Converts a linear stellar-locus fit in color-color space (slope and
//! intercept of the principal line, plus the chosen axis origin) into the
//! P1/P2 coefficient vectors of Ivezic et al. 2004 and prints the recovered
//! axis geometry alongside the display equations.

use clap::Parser;
use locus_math::{lines_from_p2_p1_coeffs, make_eqn_str, p2p1_coeffs_from_linear_fit};

#[derive(Parser, Debug)]
#[command(
    name = "Locus Axes Calculator",
    about = "Derives P1/P2 axis coefficients from a linear stellar-locus fit",
    long_about = None
)]
struct Args {
    /// Slope of the fitted locus line (y = slope*x + intercept)
    #[arg(long)]
    slope: f64,

    /// Intercept of the fitted locus line
    #[arg(long)]
    intercept: f64,

    /// Color-color x coordinate of the P1 origin
    #[arg(long, default_value_t = 0.0)]
    x0: f64,

    /// Color-color y coordinate of the P1 origin
    #[arg(long, default_value_t = 0.0)]
    y0: f64,

    /// Band names for the three magnitudes entering the colors
    #[arg(long, value_delimiter = ',', default_values = ["g", "r", "i"])]
    bands: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let fit = p2p1_coeffs_from_linear_fit(args.slope, args.intercept, args.x0, args.y0)?;
    let axes = lines_from_p2_p1_coeffs(&fit.p2_coeffs, &fit.p1_coeffs)?;

    let labels: Vec<&str> = args
        .bands
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(""))
        .collect();
    let p2_eqn = make_eqn_str("P2", &fit.p2_coeffs, &labels)?;
    let p1_eqn = make_eqn_str("P1", &fit.p1_coeffs, &labels)?;

    println!("Stellar Locus Axis Calculator");
    println!("=============================");
    println!();
    println!(
        "Input fit: y = {:.4}*x + {:.4}, origin at ({:.4}, {:.4})",
        args.slope, args.intercept, args.x0, args.y0
    );
    println!();
    println!("{}", p2_eqn);
    println!("{}", p1_eqn);
    println!();
    println!("{:<10} {:<15} {:<15}", "Axis", "Slope", "Intercept");
    println!("{:-<40}", "");
    println!("{:<10} {:<15.6} {:<15.6}", "P1", axes.m_p1, axes.b_p1);
    println!("{:<10} {:<15.6} {:<15.6}", "P2", axes.m_p2, axes.b_p2);
    println!();
    println!("Axis origin: ({:.6}, {:.6})", axes.x0, axes.y0);

    Ok(())
}
