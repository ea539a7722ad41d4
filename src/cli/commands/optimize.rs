//! Optimize command.

use crate::cli::Output;
use crate::studio::{OptimizeRequest, Studio};
use anyhow::Result;
use console::style;

/// Run the optimize command.
pub async fn run_optimize(request: OptimizeRequest, variations: Option<u32>, studio: &Studio) -> Result<()> {
    Output::info(&format!("Optimizing for {} ({})", request.goal, request.domain));
    let spinner = Output::spinner("Analysing and rewriting...");
    let report = studio.optimize_prompt(&request).await;
    spinner.finish_and_clear();
    let report = report?;

    let scores = &report.analysis.scores;
    Output::header("Analysis");
    Output::kv("Clarity", &format!("{}/10", scores.clarity));
    Output::kv("Specificity", &format!("{}/10", scores.specificity));
    Output::kv("Structure", &format!("{}/10", scores.structure));
    Output::kv("Completeness", &format!("{}/10", scores.completeness));
    Output::kv("Actionability", &format!("{}/10", scores.actionability));
    Output::kv("Overall", &format!("{}/10", scores.overall));
    for issue in &report.analysis.main_issues {
        Output::list_item(issue);
    }

    Output::header("Optimized prompt");
    println!("\n{}\n", style(report.optimized.optimized_prompt.trim()).green());
    for improvement in &report.optimized.improvements {
        Output::list_item(&format!("{}: {}", improvement.aspect, improvement.reason));
    }
    Output::saved(&report.path);

    if let Some(count) = variations {
        let spinner = Output::spinner("Writing variations...");
        let result = studio.prompt_variations(&report.optimized.optimized_prompt, count).await;
        spinner.finish_and_clear();
        let result = result?;

        Output::header("Variations");
        for v in &result.variations {
            Output::list_item(&format!("{}. {}", v.id, v.prompt));
        }
        Output::saved(&result.path);
    }
    Ok(())
}
