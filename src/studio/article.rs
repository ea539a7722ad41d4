//! Articles, novel chapters and story outlines.

use super::{language_or_default, Studio};
use crate::config::{vars, Prompts};
use crate::error::Result;
use crate::gateway::{GenerationOptions, Length, ResultMetadata};
use crate::output_store::OutputKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, instrument};

/// Tone of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStyle {
    #[default]
    Informative,
    Narrative,
    Persuasive,
    Technical,
    Casual,
}

impl ArticleStyle {
    pub fn describe(&self) -> &'static str {
        match self {
            ArticleStyle::Informative => "informative and educational",
            ArticleStyle::Narrative => "narrative and story-driven",
            ArticleStyle::Persuasive => "persuasive and opinionated",
            ArticleStyle::Technical => "technical and professional",
            ArticleStyle::Casual => "relaxed and conversational",
        }
    }
}

impl std::str::FromStr for ArticleStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "informative" => Ok(ArticleStyle::Informative),
            "narrative" => Ok(ArticleStyle::Narrative),
            "persuasive" => Ok(ArticleStyle::Persuasive),
            "technical" => Ok(ArticleStyle::Technical),
            "casual" => Ok(ArticleStyle::Casual),
            _ => Err(format!(
                "Unknown style: {}. Use informative, narrative, persuasive, technical, or casual.",
                s
            )),
        }
    }
}

impl std::fmt::Display for ArticleStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArticleStyle::Informative => "informative",
            ArticleStyle::Narrative => "narrative",
            ArticleStyle::Persuasive => "persuasive",
            ArticleStyle::Technical => "technical",
            ArticleStyle::Casual => "casual",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRequest {
    pub topic: String,
    #[serde(default)]
    pub style: ArticleStyle,
    #[serde(default = "default_length")]
    pub length: Length,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_length() -> Length {
    Length::Medium
}

impl ArticleRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            style: ArticleStyle::default(),
            length: default_length(),
            language: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRequest {
    pub plot: String,
    #[serde(default)]
    pub characters: Option<String>,
    #[serde(default)]
    pub setting: Option<String>,
    #[serde(default = "first_chapter")]
    pub chapter: u32,
    #[serde(default)]
    pub language: Option<String>,
}

fn first_chapter() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineRequest {
    pub theme: String,
    #[serde(default = "default_genre")]
    pub genre: String,
    /// Free-form length, e.g. "novella".
    #[serde(default = "default_outline_length")]
    pub length: String,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_genre() -> String {
    "contemporary".to_string()
}

fn default_outline_length() -> String {
    "novella".to_string()
}

/// A written piece and where it was saved.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub title: String,
    pub content: String,
    pub path: PathBuf,
    pub metadata: ResultMetadata,
}

impl Studio {
    /// Write an article on a topic.
    #[instrument(skip(self, request), fields(topic = %request.topic, style = %request.style, length = %request.length))]
    pub async fn write_article(&self, request: &ArticleRequest) -> Result<Article> {
        let language = language_or_default(request.language.as_deref());
        let prompt = self.prompts.render_with_custom(
            &self.prompts.writing.article,
            &vars([
                ("topic", request.topic.clone()),
                ("style", request.style.describe().to_string()),
                ("length", request.length.describe().to_string()),
                ("language", language.clone()),
            ]),
        );
        let options = GenerationOptions::default()
            .with_system(self.prompts.writing.system.clone())
            .with_length(request.length)
            .with_style(request.style.to_string())
            .with_language(language);

        let generated = self.generate_text(prompt, options).await?;
        let title = format!("Article: {}", request.topic.trim());
        let metadata_lines = vec![
            ("topic", request.topic.clone()),
            ("style", request.style.to_string()),
            ("length", request.length.to_string()),
        ];

        self.save_article(title, generated.text, metadata_lines, generated.metadata)
            .await
    }

    /// Write one chapter of a novel.
    #[instrument(skip(self, request), fields(chapter = request.chapter))]
    pub async fn write_chapter(&self, request: &ChapterRequest) -> Result<Article> {
        let prompt = chapter_prompt(&self.prompts, request);
        let options = GenerationOptions::default()
            .with_system(self.prompts.writing.system.clone())
            .with_temperature(0.8)
            .with_max_tokens(4000);

        let generated = self.generate_text(prompt, options).await?;
        let title = format!("Chapter {}", request.chapter);
        let metadata_lines = vec![
            ("chapter", request.chapter.to_string()),
            ("plot", request.plot.clone()),
            ("characters", request.characters.clone().unwrap_or_default()),
            ("setting", request.setting.clone().unwrap_or_default()),
        ];

        self.save_article(title, generated.text, metadata_lines, generated.metadata)
            .await
    }

    /// Outline a novel.
    #[instrument(skip(self, request), fields(theme = %request.theme, genre = %request.genre))]
    pub async fn write_outline(&self, request: &OutlineRequest) -> Result<Article> {
        let prompt = self.prompts.render_with_custom(
            &self.prompts.writing.story_outline,
            &vars([
                ("theme", request.theme.clone()),
                ("genre", request.genre.clone()),
                ("length", request.length.clone()),
                ("language", language_or_default(request.language.as_deref())),
            ]),
        );
        let options = GenerationOptions::default()
            .with_system(self.prompts.writing.system.clone())
            .with_max_tokens(3000);

        let generated = self.generate_text(prompt, options).await?;
        let title = format!("Outline: {}", request.theme.trim());
        let metadata_lines = vec![
            ("theme", request.theme.clone()),
            ("genre", request.genre.clone()),
            ("length", request.length.clone()),
        ];

        self.save_article(title, generated.text, metadata_lines, generated.metadata)
            .await
    }

    async fn save_article(
        &self,
        title: String,
        content: String,
        mut metadata_lines: Vec<(&str, String)>,
        metadata: ResultMetadata,
    ) -> Result<Article> {
        metadata_lines.extend([
            ("provider", metadata.provider.to_string()),
            ("model", metadata.model.clone()),
            ("generated_at", metadata.created_at.to_rfc3339()),
            ("characters_count", content.chars().count().to_string()),
        ]);
        let markdown = render_markdown(&title, &content, &metadata_lines);
        let path = self
            .store
            .save_text(OutputKind::Articles, &title, "md", &markdown)
            .await?;
        info!("Saved {}", path.display());

        Ok(Article {
            title,
            content,
            path,
            metadata,
        })
    }
}

fn chapter_prompt(prompts: &Prompts, request: &ChapterRequest) -> String {
    let line = |label: &str, value: &Option<String>| match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => format!("{}: {}\n", label, v),
        _ => String::new(),
    };

    prompts.render_with_custom(
        &prompts.writing.novel_chapter,
        &vars([
            ("chapter_number", request.chapter.to_string()),
            ("plot", request.plot.clone()),
            ("characters_line", line("Main characters", &request.characters)),
            ("setting_line", line("Setting", &request.setting)),
            ("language", language_or_default(request.language.as_deref())),
        ]),
    )
}

/// `# title`, the content, then a metadata list.
fn render_markdown(title: &str, content: &str, metadata: &[(&str, String)]) -> String {
    let mut out = format!("# {}\n\n{}\n\n---\n\n## Metadata\n", title, content.trim());
    for (key, value) in metadata {
        out.push_str(&format!("- **{}**: {}\n", key, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::gateway::testing::{FakeFactory, Reply};
    use crate::gateway::{Payload, ProviderId};
    use crate::studio::test_support::{files_in, studio};
    use std::sync::Arc;

    #[test]
    fn test_style_parse() {
        assert_eq!("Technical".parse::<ArticleStyle>().unwrap(), ArticleStyle::Technical);
        assert!("poetic".parse::<ArticleStyle>().is_err());
    }

    #[test]
    fn test_render_markdown() {
        let md = render_markdown("T", "  body  ", &[("topic", "AI".to_string())]);
        assert_eq!(md, "# T\n\nbody\n\n---\n\n## Metadata\n- **topic**: AI\n");
    }

    #[test]
    fn test_chapter_prompt_skips_empty_lines() {
        let prompts = Prompts::default();
        let request = ChapterRequest {
            plot: "a heist".to_string(),
            characters: Some("Ana, Bo".to_string()),
            setting: Some("  ".to_string()),
            chapter: 3,
            language: None,
        };
        let prompt = chapter_prompt(&prompts, &request);
        assert!(prompt.contains("chapter 3"));
        assert!(prompt.contains("Main characters: Ana, Bo"));
        assert!(!prompt.contains("Setting:"));
    }

    #[tokio::test]
    async fn test_write_article_saves_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(FakeFactory::new().reply(ProviderId::DeepSeek, Reply::text("AI keeps growing.")));
        let studio = studio(&factory, dir.path());

        let mut request = ArticleRequest::new("trends in AI");
        request.length = Length::Long;
        let article = studio.write_article(&request).await.unwrap();

        assert_eq!(article.metadata.provider, ProviderId::DeepSeek);
        let saved = std::fs::read_to_string(&article.path).unwrap();
        assert!(saved.starts_with("# Article: trends in AI\n\nAI keeps growing."));
        assert!(saved.contains("- **provider**: deepseek"));
        assert!(saved.contains("- **characters_count**: 17"));
        assert!(article.path.starts_with(dir.path().join("articles")));

        let calls = factory.calls();
        assert_eq!(calls[0].options.effective_max_tokens(0), 4000);
        match &calls[0].payload {
            Payload::Text(prompt) => assert!(prompt.contains("2000-3000 words")),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chapter_uses_creative_settings() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(FakeFactory::new());
        let studio = studio(&factory, dir.path());

        let request = ChapterRequest {
            plot: "the storm".to_string(),
            characters: None,
            setting: None,
            chapter: 2,
            language: Some("English".to_string()),
        };
        let chapter = studio.write_chapter(&request).await.unwrap();

        assert_eq!(chapter.title, "Chapter 2");
        let opts = &factory.calls()[0].options;
        assert_eq!(opts.temperature, Some(0.8));
        assert_eq!(opts.max_tokens, Some(4000));
    }

    #[tokio::test]
    async fn test_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(
            FakeFactory::new().reply(ProviderId::DeepSeek, Reply::ProviderError("HTTP 500".into())),
        );
        let studio = studio(&factory, dir.path());

        let err = studio
            .write_outline(&OutlineRequest {
                theme: "time travel".to_string(),
                genre: default_genre(),
                length: default_outline_length(),
                language: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert!(files_in(&dir.path().join("articles")).is_empty());
    }
}
