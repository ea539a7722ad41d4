//! Article, novel chapter and outline commands.

use crate::cli::Output;
use crate::studio::{Article, ArticleRequest, ChapterRequest, OutlineRequest, Studio};
use anyhow::Result;

/// Run the article command.
pub async fn run_article(request: ArticleRequest, studio: &Studio) -> Result<()> {
    Output::info(&format!(
        "Writing a {} {} article about '{}'",
        request.length, request.style, request.topic
    ));
    let spinner = Output::spinner("Generating...");
    let article = studio.write_article(&request).await;
    spinner.finish_and_clear();

    print_article(&article?);
    Ok(())
}

/// Run the novel command.
pub async fn run_novel(request: ChapterRequest, studio: &Studio) -> Result<()> {
    Output::info(&format!("Writing chapter {}", request.chapter));
    let spinner = Output::spinner("Generating...");
    let chapter = studio.write_chapter(&request).await;
    spinner.finish_and_clear();

    print_article(&chapter?);
    Ok(())
}

/// Run the outline command.
pub async fn run_outline(request: OutlineRequest, studio: &Studio) -> Result<()> {
    Output::info(&format!("Outlining a {} {} about '{}'", request.genre, request.length, request.theme));
    let spinner = Output::spinner("Generating...");
    let outline = studio.write_outline(&request).await;
    spinner.finish_and_clear();

    print_article(&outline?);
    Ok(())
}

fn print_article(article: &Article) {
    Output::header(&article.title);
    Output::preview(&article.content, 600);
    Output::generated_by(&article.metadata);
    Output::kv("Characters", &article.content.chars().count().to_string());
    Output::saved(&article.path);
}
