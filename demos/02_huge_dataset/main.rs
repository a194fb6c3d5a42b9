//! Example 02: EOFs of a Dataset That Does Not Fit in Memory
//!
//! Implements `RecordSource` for a generator that synthesizes each record on
//! request, standing in for a file-backed store. The covariance matrix is
//! accumulated in one or two passes and only one record is resident at a
//! time.

use climate_eof::config::{PcScaling, ScatterKind};
use climate_eof::{HdsEofs, RecordSource};
use std::f64::consts::PI;

/// Records generated from their index: a standing wave plus a trend.
struct WaveStore {
    records: usize,
    grid: Vec<usize>,
}

impl RecordSource for WaveStore {
    fn len(&self) -> usize {
        self.records
    }

    fn grid(&self) -> &[usize] {
        &self.grid
    }

    fn read_record(&self, index: usize, out: &mut [f64]) -> climate_eof::Result<()> {
        let t = index as f64;
        let m = out.len() as f64;
        for (j, v) in out.iter_mut().enumerate() {
            let x = j as f64 / m;
            *v = 280.0
                + 3.0 * (2.0 * PI * x).sin() * (2.0 * PI * t / 30.0).cos()
                + 1.0 * (6.0 * PI * x).cos() * (2.0 * PI * t / 7.0).sin()
                + 0.001 * t;
        }
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    println!("=== Example 02: Huge Dataset EOFs ===\n");

    let store = WaveStore {
        records: 5000,
        grid: vec![64],
    };
    println!("  {} records x {} channels", store.len(), store.channels());

    // --- Section 1: Single vs double traversal ---
    println!("\n--- Single vs Double Pass ---");
    let single = HdsEofs::single_pass(&store, None, ScatterKind::Covariance).unwrap();
    let double = HdsEofs::double_pass(&store, None, ScatterKind::Covariance).unwrap();
    println!("  decomposed yet? {}", double.is_ready());
    let ls = single.eigenvalues().unwrap();
    let ld = double.eigenvalues().unwrap();
    for k in 0..3 {
        println!("  lambda {}: single={:.6}  double={:.6}", k + 1, ls[k], ld[k]);
    }
    println!("  decomposed yet? {}", double.is_ready());

    // --- Section 2: Correlation-matrix EOFs ---
    println!("\n--- Correlation Matrix EOFs ---");
    let corr = HdsEofs::double_pass(&store, None, ScatterKind::Correlation).unwrap();
    let frac = corr.variance_fraction().unwrap();
    println!(
        "  variance fractions: {:.3} {:.3} {:.3}",
        frac[0], frac[1], frac[2]
    );

    // --- Section 3: PCs read back from the store ---
    println!("\n--- Principal Components ---");
    let pcs = double.whole_pcs(2, &store, PcScaling::UnitVariance).unwrap();
    println!("  PC matrix: {}", pcs);
    println!("  record 0 PCs: {:?}", double.pcs(2, &store, 0, PcScaling::UnitVariance).unwrap());

    // --- Section 4: Stability on subsamples ---
    println!("\n--- Monte-Carlo Congruence ---");
    let cc = double.mc_test(2, &store, 10, 2500, 3).unwrap();
    for k in 0..2 {
        let col = cc.column(k);
        let mean = col.iter().sum::<f64>() / col.len() as f64;
        println!("  EOF {}: mean congruence {:.4}", k + 1, mean);
    }

    println!("\n=== Done ===");
}
