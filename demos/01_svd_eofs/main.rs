//! Example 01: SVD EOFs of a Gridded Field
//!
//! Builds a synthetic monthly anomaly field on a small lat/lon grid,
//! decomposes it with SVD EOFs, and runs the North, Bartlett and
//! Monte-Carlo significance tests on the result.

use climate_eof::config::{McTestConfig, PcScaling};
use climate_eof::{Field, SvdEofs};
use rand::prelude::*;
use rand_distr::Normal;
use std::f64::consts::PI;

fn synthetic_field(records: usize, nlat: usize, nlon: usize, seed: u64) -> Field {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.3).unwrap();
    let mut data = Vec::with_capacity(records * nlat * nlon);
    for t in 0..records {
        // ENSO-like index and an annual cycle
        let enso = 2.0 * (2.0 * PI * t as f64 / 43.0).sin();
        let annual = (2.0 * PI * t as f64 / 12.0).cos();
        for i in 0..nlat {
            let lat = -60.0 + 120.0 * i as f64 / (nlat - 1) as f64;
            for j in 0..nlon {
                let lon = 360.0 * j as f64 / nlon as f64;
                let dipole = (lon.to_radians()).cos() * (-(lat / 20.0).powi(2)).exp();
                let seasonal = (lat.to_radians()).sin();
                data.push(enso * dipole + annual * seasonal + rng.sample(noise));
            }
        }
    }
    Field::new(data, records, &[nlat, nlon]).unwrap()
}

fn main() {
    tracing_subscriber::fmt::init();
    println!("=== Example 01: SVD EOFs of a Gridded Field ===\n");

    let (records, nlat, nlon) = (240, 9, 12);
    let field = synthetic_field(records, nlat, nlon, 42);
    println!("  Field shape: {:?}", field.shape());

    let eofs = SvdEofs::new(&field).unwrap();

    // --- Section 1: Eigenvalues ---
    println!("\n--- Leading Eigenvalues ---");
    let frac = eofs.variance_fraction();
    let north = eofs.north_test();
    for k in 0..5 {
        println!(
            "  mode {}: lambda={:.4} +/- {:.4}  ({:.1}% of variance)",
            k + 1,
            eofs.eigenvalues()[k],
            north[k],
            100.0 * frac[k]
        );
    }
    println!("  Total anomaly variance: {:.4}", eofs.total_anomaly_variance());

    // --- Section 2: Patterns ---
    println!("\n--- EOF Patterns ---");
    let patterns = eofs.eofs(PcScaling::UnitVariance).unwrap();
    println!("  Patterns shape: {:?}", patterns.shape());
    let corr = eofs.eofs_as_correlation().unwrap();
    let max_corr = corr.mode(0).iter().fold(0.0_f64, |a, v| a.max(v.abs()));
    println!("  Max |correlation| of PC 1 with a grid point: {max_corr:.3}");
    let explained = eofs.eofs_as_explained_variance().unwrap();
    println!(
        "  Variance explained by mode 1 at the equator/dateline: {:.3}",
        explained.get(&[nlat / 2, 0], 0).unwrap_or(f64::NAN)
    );

    // --- Section 3: Truncated reconstruction ---
    println!("\n--- Truncated Reconstruction ---");
    for k in [1, 2, 5, 20] {
        let rest = eofs.unreconstructed_field(k, None).unwrap();
        let values = rest.as_slice();
        let rms = (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt();
        println!("  {k:>2} modes: residual RMS {rms:.4}");
    }

    // --- Section 4: Significance ---
    println!("\n--- Bartlett Test ---");
    let bartlett = eofs.bartlett_test();
    for k in 0..4 {
        println!(
            "  modes {}..: chi={:.2}, p={:.3e}",
            k + 1,
            bartlett.chi[k],
            bartlett.prob[k]
        );
    }

    println!("\n--- Monte-Carlo Congruence (100 subsamples of 180 records) ---");
    let cfg = McTestConfig {
        subsamples: 100,
        length: 180,
        neofs: Some(3),
        seed: 7,
    };
    let cc = eofs.mc_test(&cfg).unwrap();
    for k in 0..cc.ncols() {
        let col = cc.column(k);
        let mean = col.iter().sum::<f64>() / col.len() as f64;
        let min = col.iter().cloned().fold(f64::INFINITY, f64::min);
        println!("  EOF {}: mean congruence {:.3}, min {:.3}", k + 1, mean, min);
    }

    println!("\n=== Done ===");
}
