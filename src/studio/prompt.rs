//! Prompt analysis, optimisation, variations and structured prompts.

use super::{extract_json_object, Studio};
use crate::config::vars;
use crate::error::{MuseError, Result};
use crate::gateway::{GenerationOptions, ResultMetadata};
use crate::output_store::OutputKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, info, instrument};

const ANALYSIS_MAX_TOKENS: u32 = 1500;
const OPTIMIZE_MAX_TOKENS: u32 = 2500;
const MAX_VARIATIONS: u32 = 10;

/// What an optimisation should improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationGoal {
    #[default]
    Comprehensive,
    Clarity,
    Specificity,
    Structure,
    Actionability,
}

impl OptimizationGoal {
    pub fn describe(&self) -> &'static str {
        match self {
            OptimizationGoal::Comprehensive => "improve clarity, specificity, structure and actionability together",
            OptimizationGoal::Clarity => "make the wording clear and unambiguous",
            OptimizationGoal::Specificity => "add concrete details, constraints and context",
            OptimizationGoal::Structure => "organise the prompt into a logical structure",
            OptimizationGoal::Actionability => "make the expected output and steps easy to act on",
        }
    }
}

impl std::str::FromStr for OptimizationGoal {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comprehensive" => Ok(OptimizationGoal::Comprehensive),
            "clarity" => Ok(OptimizationGoal::Clarity),
            "specificity" => Ok(OptimizationGoal::Specificity),
            "structure" => Ok(OptimizationGoal::Structure),
            "actionability" => Ok(OptimizationGoal::Actionability),
            _ => Err(format!(
                "Unknown goal: {}. Use comprehensive, clarity, specificity, structure, or actionability.",
                s
            )),
        }
    }
}

impl std::fmt::Display for OptimizationGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OptimizationGoal::Comprehensive => "comprehensive",
            OptimizationGoal::Clarity => "clarity",
            OptimizationGoal::Specificity => "specificity",
            OptimizationGoal::Structure => "structure",
            OptimizationGoal::Actionability => "actionability",
        };
        write!(f, "{}", name)
    }
}

/// Field the prompt will be used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    #[default]
    General,
    Writing,
    Analysis,
    Creative,
    Technical,
    Education,
    Marketing,
}

impl Domain {
    pub fn describe(&self) -> &'static str {
        match self {
            Domain::General => "general purpose",
            Domain::Writing => "writing and editing",
            Domain::Analysis => "data and business analysis",
            Domain::Creative => "creative work",
            Domain::Technical => "software and engineering",
            Domain::Education => "teaching and learning",
            Domain::Marketing => "marketing and communication",
        }
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(Domain::General),
            "writing" => Ok(Domain::Writing),
            "analysis" => Ok(Domain::Analysis),
            "creative" => Ok(Domain::Creative),
            "technical" => Ok(Domain::Technical),
            "education" => Ok(Domain::Education),
            "marketing" => Ok(Domain::Marketing),
            _ => Err(format!(
                "Unknown domain: {}. Use general, writing, analysis, creative, technical, education, or marketing.",
                s
            )),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Domain::General => "general",
            Domain::Writing => "writing",
            Domain::Analysis => "analysis",
            Domain::Creative => "creative",
            Domain::Technical => "technical",
            Domain::Education => "education",
            Domain::Marketing => "marketing",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub prompt: String,
    #[serde(default)]
    pub goal: OptimizationGoal,
    #[serde(default)]
    pub domain: Domain,
}

impl OptimizeRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            goal: OptimizationGoal::default(),
            domain: Domain::default(),
        }
    }
}

/// Scores from 0 to 10. Zero means the model gave none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromptScores {
    pub clarity: u8,
    pub specificity: u8,
    pub structure: u8,
    pub completeness: u8,
    pub actionability: u8,
    pub overall: u8,
}

const ASPECTS: [&str; 6] = [
    "clarity",
    "specificity",
    "structure",
    "completeness",
    "actionability",
    "overall",
];

impl PromptScores {
    fn set(&mut self, aspect: &str, score: u8) {
        let slot = match aspect {
            "clarity" => &mut self.clarity,
            "specificity" => &mut self.specificity,
            "structure" => &mut self.structure,
            "completeness" => &mut self.completeness,
            "actionability" => &mut self.actionability,
            "overall" => &mut self.overall,
            _ => return,
        };
        *slot = score.min(10);
    }

    fn rows(&self) -> [(&'static str, u8); 6] {
        [
            ("Clarity", self.clarity),
            ("Specificity", self.specificity),
            ("Structure", self.structure),
            ("Completeness", self.completeness),
            ("Actionability", self.actionability),
            ("Overall", self.overall),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptAnalysis {
    pub scores: PromptScores,
    pub main_issues: Vec<String>,
    pub improvement_areas: Vec<String>,
    /// Model output, kept when it was not JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl PromptAnalysis {
    /// Parse the model's answer. JSON first, then "clarity ... 7" style text.
    pub fn parse(text: &str) -> Self {
        if let Some(value) = extract_json_object(text).and_then(|j| serde_json::from_str::<Value>(j).ok()) {
            let mut scores = PromptScores::default();
            for aspect in ASPECTS {
                if let Some(score) = json_score(&value[format!("{}_score", aspect)]) {
                    scores.set(aspect, score);
                }
            }
            return Self {
                scores,
                main_issues: string_list(&value["main_issues"]),
                improvement_areas: string_list(&value["improvement_areas"]),
                raw: None,
            };
        }

        let mut scores = PromptScores::default();
        for (aspect, pattern) in TEXT_SCORE_PATTERNS.iter() {
            if let Some(score) = text_score(text, pattern) {
                scores.set(aspect, score);
            }
        }
        Self {
            scores,
            raw: Some(text.trim().to_string()),
            ..Self::default()
        }
    }
}

fn json_score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(n.round().clamp(0.0, 10.0) as u8)
}

/// "clarity ... 7" patterns, one per aspect.
static TEXT_SCORE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ASPECTS
        .iter()
        .filter_map(|aspect| {
            let pattern = format!(r"(?is)\b{}\b\D{{0,40}}?(\d{{1,2}})", aspect);
            Regex::new(&pattern).ok().map(|re| (*aspect, re))
        })
        .collect()
});

fn text_score(text: &str, pattern: &Regex) -> Option<u8> {
    let score: u8 = pattern.captures(text)?.get(1)?.as_str().parse().ok()?;
    Some(score.min(10))
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Improvement {
    pub aspect: String,
    pub before: String,
    pub after: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizedPrompt {
    pub optimized_prompt: String,
    pub improvements: Vec<Improvement>,
    pub expected_benefits: Vec<String>,
    pub usage_tips: Vec<String>,
    pub confidence_score: Option<f64>,
}

impl OptimizedPrompt {
    /// Parse the model's answer; anything that is not the expected JSON is the prompt itself.
    pub fn parse(text: &str) -> Self {
        extract_json_object(text)
            .and_then(|j| serde_json::from_str::<OptimizedPrompt>(j).ok())
            .filter(|p| !p.optimized_prompt.trim().is_empty())
            .unwrap_or_else(|| OptimizedPrompt {
                optimized_prompt: text.trim().to_string(),
                ..Self::default()
            })
    }
}

/// Result of [`Studio::optimize_prompt`].
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub original: String,
    pub goal: OptimizationGoal,
    pub domain: Domain,
    pub analysis: PromptAnalysis,
    pub optimized: OptimizedPrompt,
    pub path: PathBuf,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptVariation {
    pub id: u32,
    pub prompt: String,
    pub characteristics: String,
    pub use_cases: String,
    pub output_style: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptVariations {
    pub base_prompt: String,
    pub variations: Vec<PromptVariation>,
    pub path: PathBuf,
}

#[derive(Deserialize)]
struct VariationsReply {
    #[serde(default)]
    variations: Vec<PromptVariation>,
}

impl Studio {
    /// Analyse a prompt and produce an optimised version.
    #[instrument(skip(self, request), fields(goal = %request.goal, domain = %request.domain))]
    pub async fn optimize_prompt(&self, request: &OptimizeRequest) -> Result<OptimizationReport> {
        if request.prompt.trim().is_empty() {
            return Err(MuseError::InvalidRequest("prompt must not be empty".to_string()));
        }

        let analyze = self.prompts.render_with_custom(
            &self.prompts.prompting.analyze,
            &vars([("prompt", request.prompt.clone())]),
        );
        let optimize = self.prompts.render_with_custom(
            &self.prompts.prompting.optimize,
            &vars([
                ("prompt", request.prompt.clone()),
                ("goal", request.goal.describe().to_string()),
                ("domain", request.domain.describe().to_string()),
            ]),
        );

        let (analysis, optimized) = futures::try_join!(
            self.generate_text(
                analyze,
                GenerationOptions::default()
                    .with_temperature(0.3)
                    .with_max_tokens(ANALYSIS_MAX_TOKENS),
            ),
            self.generate_text(
                optimize,
                GenerationOptions::default().with_max_tokens(OPTIMIZE_MAX_TOKENS),
            ),
        )?;

        let parsed = PromptAnalysis::parse(&analysis.text);
        debug!(overall = parsed.scores.overall, json = parsed.raw.is_none(), "Parsed analysis");
        let improved = OptimizedPrompt::parse(&optimized.text);

        let title = format!("optimized_{}", super::truncate_chars(request.prompt.trim(), 30));
        let markdown = render_report(request, &parsed, &improved);
        let path = self
            .store
            .save_text(OutputKind::Prompts, &title, "md", &markdown)
            .await?;
        info!("Saved {}", path.display());

        Ok(OptimizationReport {
            original: request.prompt.clone(),
            goal: request.goal,
            domain: request.domain,
            analysis: parsed,
            optimized: improved,
            path,
            metadata: optimized.metadata,
        })
    }

    /// Write `count` variations of a prompt and save them as JSON.
    #[instrument(skip(self, prompt))]
    pub async fn prompt_variations(&self, prompt: &str, count: u32) -> Result<PromptVariations> {
        if count == 0 || count > MAX_VARIATIONS {
            return Err(MuseError::InvalidRequest(format!(
                "variation count {} outside 1..={}",
                count, MAX_VARIATIONS
            )));
        }

        let rendered = self.prompts.render_with_custom(
            &self.prompts.prompting.variations,
            &vars([("prompt", prompt.to_string()), ("count", count.to_string())]),
        );
        let generated = self
            .generate_text(rendered, GenerationOptions::default().with_temperature(0.9))
            .await?;

        let mut variations = extract_json_object(&generated.text)
            .and_then(|j| serde_json::from_str::<VariationsReply>(j).ok())
            .map(|r| r.variations)
            .unwrap_or_default();
        variations.retain(|v| !v.prompt.trim().is_empty());
        variations.truncate(count as usize);
        for (i, v) in variations.iter_mut().enumerate() {
            v.id = i as u32 + 1;
        }
        if variations.is_empty() {
            return Err(MuseError::provider(
                generated.metadata.provider,
                "response contained no usable variations",
            ));
        }

        let document = serde_json::json!({
            "base_prompt": prompt,
            "variations": variations,
            "provider": generated.metadata.provider,
            "model": generated.metadata.model,
            "generated_at": generated.metadata.created_at,
        });
        let title = format!("variations_{}", super::truncate_chars(prompt.trim(), 30));
        let path = self
            .store
            .save_text(
                OutputKind::Prompts,
                &title,
                "json",
                &serde_json::to_string_pretty(&document)?,
            )
            .await?;

        Ok(PromptVariations {
            base_prompt: prompt.to_string(),
            variations,
            path,
        })
    }
}

fn render_report(request: &OptimizeRequest, analysis: &PromptAnalysis, optimized: &OptimizedPrompt) -> String {
    let mut out = String::from("# Prompt optimization\n\n");
    out.push_str(&format!(
        "- **Goal**: {}\n- **Domain**: {}\n\n",
        request.goal, request.domain
    ));
    out.push_str(&format!("## Original prompt\n\n{}\n\n", request.prompt.trim()));

    out.push_str("## Analysis\n\n| Aspect | Score |\n|---|---|\n");
    for (aspect, score) in analysis.scores.rows() {
        out.push_str(&format!("| {} | {}/10 |\n", aspect, score));
    }
    out.push('\n');
    push_list(&mut out, "Main issues", &analysis.main_issues);
    push_list(&mut out, "Improvement areas", &analysis.improvement_areas);
    if let Some(raw) = &analysis.raw {
        out.push_str(&format!("### Notes\n\n{}\n\n", raw));
    }

    out.push_str(&format!(
        "## Optimized prompt\n\n```\n{}\n```\n\n",
        optimized.optimized_prompt.trim()
    ));
    if !optimized.improvements.is_empty() {
        out.push_str("### Improvements\n\n");
        for imp in &optimized.improvements {
            out.push_str(&format!("- **{}**: {}\n", imp.aspect, imp.reason));
        }
        out.push('\n');
    }
    push_list(&mut out, "Expected benefits", &optimized.expected_benefits);
    push_list(&mut out, "Usage tips", &optimized.usage_tips);
    out
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("### {}\n\n", heading));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

/// A prompt assembled from parts. No provider call involved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredPrompt {
    pub task: String,
    pub output_format: Option<String>,
    pub role: Option<String>,
    pub constraints: Vec<String>,
    pub examples: Vec<String>,
}

impl StructuredPrompt {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn render(&self) -> String {
        let mut sections = vec![format!("## Task\n{}", self.task.trim())];

        if let Some(role) = non_blank(&self.role) {
            sections.push(format!("## Role\nYou are {}.", role));
        }
        if !self.constraints.is_empty() {
            let list = self
                .constraints
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{}. {}", i + 1, c.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("## Constraints\n{}", list));
        }
        if let Some(format) = non_blank(&self.output_format) {
            sections.push(format!("## Output format\n{}", format));
        }
        if !self.examples.is_empty() {
            let list = self
                .examples
                .iter()
                .enumerate()
                .map(|(i, e)| format!("Example {}:\n{}", i + 1, e.trim()))
                .collect::<Vec<_>>()
                .join("\n\n");
            sections.push(format!("## Examples\n{}", list));
        }
        sections.push("Complete the task following the requirements above.".to_string());

        sections.join("\n\n")
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
