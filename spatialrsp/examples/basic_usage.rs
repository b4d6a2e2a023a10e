use spatialrsp::{
    PointTable, RspConfig, RspMode, angular_significance, cartesian_to_polar, centroid,
    compute_rsp, error::Result, split_by_label,
};

/// Example demonstrating an RSP analysis on a synthetic embedding
fn main() -> Result<()> {
    println!("=== spatialrsp example ===\n");

    // 1. Build a synthetic embedding: a ring of cells plus a cluster in the north-east
    let table = create_synthetic_embedding()?;
    let umap = spatialrsp::EmbeddingData::embedding_2d(&table, "X_umap")?;
    println!("Cells: {}", umap.nrows());

    // 2. Use the centroid as vantage point
    let vantage = centroid(umap.view())?;
    println!("Vantage point: ({:.3}, {:.3})\n", vantage[0], vantage[1]);

    // 3. Angles of the background and of each labelled group
    let background = cartesian_to_polar(umap.view(), &vantage)?.angles;
    let groups = split_by_label(&table, "X_umap", "cell_type", &["cluster", "ring"])?;
    let foregrounds = groups
        .iter()
        .map(|(label, coords)| {
            cartesian_to_polar(coords.view(), &vantage).map(|p| (label.clone(), p.angles))
        })
        .collect::<Result<Vec<_>>>()?;

    // 4. RSP curves in absolute mode
    let config = RspConfig {
        resolution: 72,
        mode: RspMode::Absolute,
        ..Default::default()
    };
    let curves = compute_rsp(&background, &foregrounds, &config)?;

    println!("=== RSP results ===");
    for ((label, rmsd), (_, coverage)) in curves
        .rmsd_against_expected()?
        .into_iter()
        .zip(curves.coverage()?)
    {
        println!("  {:<8} RMSD {:>7.3}  coverage {:.2}", label, rmsd, coverage);
    }

    // 5. Per-angle enrichment of the cluster, BH corrected
    let significance = angular_significance(&background, &foregrounds[0].1, &config)?;
    println!(
        "\nCluster enriched at {} of {} angles (q < 0.05)",
        significance.n_significant(0.05),
        significance.n_tests()
    );

    Ok(())
}

fn create_synthetic_embedding() -> Result<PointTable> {
    let mut points = Vec::new();
    let mut labels = Vec::new();

    for i in 0..720 {
        let theta = i as f64 * std::f64::consts::TAU / 720.0;
        let radius = 4.0 + (i % 7) as f64 * 0.1;
        points.push([radius * theta.cos(), radius * theta.sin()]);
        labels.push("ring".to_string());
    }
    for i in 0..80 {
        let jitter = (i as f64 * 0.61).sin() * 0.4;
        points.push([2.5 + jitter, 2.5 - jitter]);
        labels.push("cluster".to_string());
    }

    PointTable::from_points("X_umap", &points)?.with_labels("cell_type", labels)
}
