//! Example 03: Analog Search in EOF Space
//!
//! Searches a small library for the closest analogs of a query pattern in
//! the space of its leading unit-variance PCs, then prints the averaged
//! reconstructions and the text report.

use climate_eof::config::{EofConfig, PcScaling};
use climate_eof::{AnalogSelector, AnalogSpace, EofAnalog, Field};

fn main() {
    tracing_subscriber::fmt::init();
    println!("=== Example 03: Analog Search ===\n");

    let library = Field::from_records(
        &[
            vec![1.2, 3.4, 5.7, 9.0],
            vec![6.8, 9.7, -4.8, 7.2],
            vec![6.9, 4.7, 2.8, 1.2],
            vec![2.8, 3.7, -0.8, 9.2],
            vec![5.8, 9.7, -5.8, 0.2],
            vec![9.8, 9.3, 4.8, 1.2],
            vec![1.1, -8.8, 0.9, 6.3],
        ],
        &[4],
    )
    .unwrap();

    let config = EofConfig {
        scaling: PcScaling::UnitVariance,
        truncation: Some(3),
        ..EofConfig::default()
    };
    let space = EofAnalog::new(&library, &config).unwrap();
    println!("  Search space: {} modes, eigenvalues {:?}", space.neofs(), space.eigenvalues());

    // --- Section 1: Single query ---
    println!("\n--- Nearest Analogs ---");
    let query = [0.7, -1.9, 2.4, -3.1];
    for (idx, sq) in space.find_n_analogs(&query, 3).unwrap() {
        println!("  record {idx}: distance {:.4}", sq.sqrt());
    }

    // --- Section 2: Selector over several patterns ---
    println!("\n--- Analog Selector ---");
    let patterns = Field::from_records(
        &[query.to_vec(), vec![-2.0, 1.0, 0.5, 4.0]],
        &[4],
    )
    .unwrap();
    let selector = AnalogSelector::new(&space, &patterns, 3, config.weight_exponent).unwrap();
    for i in 0..selector.patterns() {
        println!("  pattern {i}: analogs {:?}", selector.analogs(i));
    }

    let avg = selector.return_average(None).unwrap();
    let wavg = selector.return_weighted_average(None).unwrap();
    println!("  average of pattern 0:          {:?}", avg.record(0));
    println!("  weighted average of pattern 0: {:?}", wavg.record(0));

    // --- Section 3: Report ---
    println!("\n--- Report ---");
    selector.write_report(std::io::stdout()).unwrap();

    println!("\n=== Done ===");
}
