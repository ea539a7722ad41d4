//! Prompt templates for Muse.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory
//! (`writing.toml`, `speech.toml`, `prompting.toml`, `video.toml`, `image.toml`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub writing: WritingPrompts,
    pub speech: SpeechPrompts,
    pub prompting: PromptingPrompts,
    pub video: VideoPrompts,
    pub image: ImagePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for articles and fiction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WritingPrompts {
    pub system: String,
    pub article: String,
    pub novel_chapter: String,
    pub story_outline: String,
}

impl Default for WritingPrompts {
    fn default() -> Self {
        Self {
            system: "You are an experienced writer and editor. Write original, well-structured content and reply with the content only.".to_string(),

            article: r#"Write an article that meets the following requirements.

Topic: {{topic}}
Style: {{style}}
Length: {{length}}
Language: {{language}}

Requirements:
1. A clear structure with an introduction, a body and a conclusion
2. Original content with a clear point of view
3. Fluent language and sound logic
4. Use headings and paragraphs where they help the reader
5. Keep the content accurate and valuable

Output the article directly:"#.to_string(),

            novel_chapter: r#"Write chapter {{chapter_number}} of a novel.

Plot summary: {{plot}}
{{characters_line}}{{setting_line}}
Requirements:
1. Roughly 2000-3000 words
2. The plot develops plausibly, with rises and falls
3. Distinct characters and natural dialogue
4. Vivid, visual descriptions
5. Keep the story coherent and engaging
6. End the chapter on suspense or a twist

Language: {{language}}

Output the chapter directly:"#.to_string(),

            story_outline: r#"Create a detailed outline for a novel.

Theme: {{theme}}
Genre: {{genre}}
Length: {{length}}

Include:
1. Story overview (about 200 words)
2. Main characters (3-5, with name, personality and background)
3. Setting (time, place, social background)
4. Chapter outline (8-12 chapters, a short plot for each)
5. Main conflicts and turning points
6. The ending

Language: {{language}}

Output in a structured format:"#.to_string(),
        }
    }
}

/// Prompts for summarizing transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechPrompts {
    pub brief: String,
    pub detailed: String,
    pub key_points: String,
    pub meeting_minutes: String,
}

impl Default for SpeechPrompts {
    fn default() -> Self {
        Self {
            brief: "Provide a brief summary (100-200 words) of the following text. Answer in {{language}}.\n\n{{text}}".to_string(),

            detailed: r#"Provide a detailed analysis and summary of the following text. Answer in {{language}}.

Content:
{{text}}

Please include:
1. Main content overview (200-300 words)
2. Key points list (3-5 points)
3. Important information extraction
4. Summary recommendations or action items (if applicable)

Present it in a structured format:"#.to_string(),

            key_points: "Extract the key points from the following text as a list. Answer in {{language}}.\n\n{{text}}".to_string(),

            meeting_minutes: r#"Organize the following meeting transcription into formal meeting minutes. Answer in {{language}}.

Transcription:
{{text}}

Please include:
1. Meeting topic and time
2. Participants (if identifiable)
3. Discussion points
4. Decisions made
5. Action items
6. Next meeting arrangements (if any)

Use a professional meeting minutes format:"#.to_string(),
        }
    }
}

/// Prompts for analyzing and improving prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptingPrompts {
    pub analyze: String,
    pub optimize: String,
    pub variations: String,
}

impl Default for PromptingPrompts {
    fn default() -> Self {
        Self {
            analyze: r#"Analyze the quality and structure of the following prompt.

Original prompt:
{{prompt}}

Evaluate these aspects:
1. Clarity - is the prompt clearly expressed
2. Specificity - does it contain enough concrete information
3. Structure - is the logical structure sound
4. Completeness - does it include the necessary elements
5. Actionability - can an AI understand and execute it

Score each aspect from 1 to 10 with a short justification, and point out the main issues and room for improvement.

Return the analysis as JSON:
{
    "clarity_score": 0,
    "clarity_comment": "",
    "specificity_score": 0,
    "specificity_comment": "",
    "structure_score": 0,
    "structure_comment": "",
    "completeness_score": 0,
    "completeness_comment": "",
    "actionability_score": 0,
    "actionability_comment": "",
    "overall_score": 0,
    "main_issues": ["issue 1", "issue 2"],
    "improvement_areas": ["area 1", "area 2"]
}"#.to_string(),

            optimize: r#"Optimize the following prompt so it is more effective and professional.

Original prompt:
{{prompt}}

Optimization goal: {{goal}}
Target domain: {{domain}}

Provide:
1. The optimized prompt (complete version)
2. The main improvements
3. Why each change helps
4. Expected benefits
5. Usage tips

Principles:
- Keep the original intent
- Add the necessary context
- Give clear format requirements
- Add concrete evaluation criteria
- Include a role when useful
- Give output format guidance

Return JSON:
{
    "optimized_prompt": "the complete optimized prompt",
    "improvements": [
        {"aspect": "", "before": "", "after": "", "reason": ""}
    ],
    "expected_benefits": ["benefit 1"],
    "usage_tips": ["tip 1"],
    "confidence_score": 0
}"#.to_string(),

            variations: r#"Based on the following prompt, write {{count}} distinct variations.

Base prompt:
{{prompt}}

For each variation provide the prompt, what sets it apart, suitable use cases and the expected output style. Keep the core goal, vary the wording or emphasis, and cover different scenarios.

Return JSON:
{
    "base_prompt": "",
    "variations": [
        {"id": 1, "prompt": "", "characteristics": "", "use_cases": "", "output_style": ""}
    ]
}"#.to_string(),
        }
    }
}

/// Prompts for video script writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoPrompts {
    pub script: String,
}

impl Default for VideoPrompts {
    fn default() -> Self {
        Self {
            script: r#"Write a detailed script for a {{duration}}-second video.

Topic: {{prompt}}
Style: {{style}}
Duration: {{duration}} seconds
Language: {{language}}

Include an engaging title, a 3-5 second opening, main segments of 5-10 seconds each with visuals and narration, a 3-5 second closing, the full narration, a music suggestion and a visual style.

Return only JSON with these fields:
{
    "title": "video title",
    "duration": {{duration}},
    "scenes": [
        {
            "start_time": 0,
            "end_time": 5,
            "visual_description": "opening visuals",
            "narration": "opening narration",
            "transition": "fade in"
        }
    ],
    "full_narration": "the complete narration",
    "music_style": "light and upbeat",
    "visual_style": "modern and clean"
}

Scenes must be in order, must not overlap and must end at {{duration}} seconds."#.to_string(),
        }
    }
}

/// Prompts for image prompt rewriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePrompts {
    pub optimize: String,
}

impl Default for ImagePrompts {
    fn default() -> Self {
        Self {
            optimize: r#"Rewrite the following description as an English prompt for an AI image generator.

Description: {{prompt}}

Requirements:
1. A detailed English description
2. Concrete visual elements (colors, lighting, composition)
3. Quality keywords such as high quality, detailed, 8k
4. Keep the original meaning
5. Separate elements with commas

Return only the rewritten prompt:"#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            if let Some(content) = read_optional(&custom_path.join("writing.toml"))? {
                prompts.writing = toml::from_str(&content)?;
            }
            if let Some(content) = read_optional(&custom_path.join("speech.toml"))? {
                prompts.speech = toml::from_str(&content)?;
            }
            if let Some(content) = read_optional(&custom_path.join("prompting.toml"))? {
                prompts.prompting = toml::from_str(&content)?;
            }
            if let Some(content) = read_optional(&custom_path.join("video.toml"))? {
                prompts.video = toml::from_str(&content)?;
            }
            if let Some(content) = read_optional(&custom_path.join("image.toml"))? {
                prompts.image = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

fn read_optional(path: &std::path::Path) -> crate::error::Result<Option<String>> {
    if path.exists() {
        Ok(Some(std::fs::read_to_string(path)?))
    } else {
        Ok(None)
    }
}

/// Build a variable map from string pairs.
pub fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
