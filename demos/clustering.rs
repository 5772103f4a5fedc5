//! K-means, silhouette sweep, label alignment and PCA on a synthetic two-class dataset.
//!
//! Run with `RUST_LOG=debug` to see per-iteration progress.

use kclust::{align, best_by_silhouette, Config, Dataset};
use rand::prelude::*;

/// Two classes in 10-D: 200 samples around the origin (label 1) and 120 samples
/// shifted along every axis (label 0).
fn two_class_dataset(seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (label, count, shift) in [(1usize, 200usize, 0.0f64), (0, 120, 4.0)] {
        for _ in 0..count {
            rows.push(
                (0..10)
                    .map(|d| shift * (1.0 + d as f64 * 0.1) + rng.random_range(-1.5..1.5))
                    .collect(),
            );
            labels.push(label);
        }
    }
    Dataset::new(rows)
        .and_then(|ds| ds.with_labels(labels))
        .expect("synthetic dataset is well-formed")
}

fn main() -> kclust::Result<()> {
    env_logger::init();

    let config = Config::default();
    config.validate()?;
    let data = two_class_dataset(config.seed);
    println!(
        "dataset: {} samples, {} features, label counts {:?}",
        data.len(),
        data.dim(),
        data.label_counts().unwrap_or_default()
    );

    // --- K-means (k=2) ---
    let fit = config.kmeans().fit(&data)?;
    let eval = config.evaluator().evaluate(&data, &fit)?;
    println!("\n=== K-means (k={}) ===", fit.k());
    println!("  iterations: {} (converged: {})", fit.iterations(), fit.converged());
    println!("  cluster sizes: {:?}", fit.cluster_sizes());
    println!("  silhouette: {:.4}", eval.silhouette);
    println!("  wss: {:.2}", eval.wss);

    // --- Sweep ---
    let results = config.sweep().run(&data)?;
    println!("\n=== Sweep k={}..={} ===", config.k_min, config.k_max);
    for e in &results {
        println!("  k={:2}  silhouette {:.4}  wss {:10.2}", e.k, e.silhouette, e.wss);
    }
    if let Some(best) = best_by_silhouette(&results) {
        println!("  best k by silhouette: {}", best.k);
    }

    // --- Alignment with ground truth ---
    let labels = data.labels().unwrap_or_default();
    let alignment = align(&fit, labels)?;
    println!("\n=== Alignment ===");
    println!("  mapping (cluster -> label): {:?}", alignment.mapping);
    println!("  matched {} of {}", alignment.matches, alignment.total);
    println!("  confusion (rows actual, cols predicted): {:?}", alignment.confusion);

    // --- PCA, then cluster again ---
    let pca = config.pca().fit(&data)?;
    let reduced = pca.transform(&data)?;
    let reduced_fit = config.kmeans().fit(&reduced)?;
    let reduced_eval = config.evaluator().evaluate(&reduced, &reduced_fit)?;
    let reduced_alignment = align(&reduced_fit, labels)?;
    println!("\n=== PCA ({} components) ===", pca.num_components());
    println!("  explained variance ratio: {:?}", pca.explained_variance_ratio());
    println!("  silhouette: {:.4}", reduced_eval.silhouette);
    println!("  matched {} of {}", reduced_alignment.matches, reduced_alignment.total);

    println!("\n=== JSON ===");
    match serde_json::to_string_pretty(&results) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize sweep results: {e}"),
    }

    Ok(())
}
