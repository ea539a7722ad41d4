//! Image command.

use crate::cli::Output;
use crate::studio::{ImageRequest, Studio};
use anyhow::Result;

/// Run the image command.
pub async fn run_image(request: ImageRequest, studio: &Studio) -> Result<()> {
    Output::info(&format!("Generating {} image(s) of '{}'", request.count, request.prompt));
    let spinner = Output::spinner("Generating...");
    let report = studio.generate_image(&request).await;
    spinner.finish_and_clear();
    let report = report?;

    if let Some(err) = &report.optimize_error {
        Output::warning(&format!("Prompt rewrite failed, used the original prompt: {}", err));
    }
    Output::kv("Prompt", &report.final_prompt);
    for revised in &report.revised_prompts {
        Output::kv("Revised by provider", revised);
    }
    Output::generated_by(&report.metadata);
    for path in &report.paths {
        Output::saved(path);
    }
    Ok(())
}
