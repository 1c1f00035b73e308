use anyhow::Result;
use plotters::prelude::*;
use resolve::LinkageMode;

use crate::benchmark::{BenchmarkResults, SweepPoint};

const SERIES: [(LinkageMode, &str, RGBColor); 2] = [
    (LinkageMode::ConnectedComponents, "Connected components", BLUE),
    (LinkageMode::CompleteLinkage, "Complete linkage", RED),
];

pub fn generate_plots(results: &BenchmarkResults, output_dir: &str) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    plot_precision_recall(results, &format!("{}/precision_recall.png", output_dir))?;
    plot_f1_by_threshold(results, &format!("{}/f1_by_threshold.png", output_dir))?;

    Ok(())
}

fn points_for(results: &BenchmarkResults, linkage: LinkageMode) -> Vec<&SweepPoint> {
    results.runs.iter().filter(|p| p.linkage == linkage).collect()
}

fn plot_precision_recall(results: &BenchmarkResults, path: &str) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Pairwise Precision vs Recall", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..1.05f64, 0f64..1.05f64)?;

    chart.configure_mesh()
        .x_desc("Recall")
        .y_desc("Precision")
        .draw()?;

    for (linkage, label, color) in SERIES {
        let points: Vec<(f64, f64)> = points_for(results, linkage)
            .iter()
            .map(|p| (p.scores.recall, p.scores.precision))
            .collect();

        chart.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
    }

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    println!("Saved precision/recall plot to {}", path);
    Ok(())
}

fn plot_f1_by_threshold(results: &BenchmarkResults, path: &str) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let (min_t, max_t) = results
        .runs
        .iter()
        .fold((1.0f64, 0.0f64), |(lo, hi), p| (lo.min(p.threshold), hi.max(p.threshold)));
    let (min_t, max_t) = if min_t < max_t { (min_t, max_t) } else { (0.0, 1.0) };

    let mut chart = ChartBuilder::on(&root)
        .caption("F1 by Similarity Threshold", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((min_t - 0.02)..(max_t + 0.02), 0f64..1.05f64)?;

    chart.configure_mesh()
        .x_desc("Threshold")
        .y_desc("F1")
        .draw()?;

    for (linkage, label, color) in SERIES {
        let points: Vec<(f64, f64)> = points_for(results, linkage)
            .iter()
            .map(|p| (p.threshold, p.scores.f1))
            .collect();

        chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    println!("Saved F1 plot to {}", path);
    Ok(())
}
