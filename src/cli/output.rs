use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{OutputFormat, QueryResponse};
use crate::services::IngestStats;

pub trait Formatter {
    fn format_answer(&self, response: &QueryResponse) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_ingest_stats(&self, stats: &IngestStats) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: Option<String>,
    pub index_dir: String,
    pub index_exists: bool,
    pub indexed_chunks: Option<usize>,
    pub dimension: Option<usize>,
    /// Set when the artifacts exist but could not be loaded
    pub index_error: Option<String>,
    pub embedding_model: String,
    pub embedding_url: String,
    pub llm_model: String,
    pub llm_url: String,
    pub top_k: u32,
    pub min_score: f32,
}

/// Run a writer closure into a fresh `String`.
fn render(f: impl FnOnce(&mut String) -> std::fmt::Result) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = f(&mut output);
    output
}

fn preview(text: &str, limit: usize) -> String {
    let head: String = text.chars().take(limit).collect();
    if text.chars().count() > limit {
        format!("{}...", head)
    } else {
        head
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_answer(&self, response: &QueryResponse) -> String {
        render(|output| {
            writeln!(output, "Question: {}", response.question)?;
            writeln!(output)?;
            writeln!(output, "{}", response.answer)?;

            if response.contexts.is_empty() {
                return Ok(());
            }

            writeln!(output)?;
            writeln!(
                output,
                "Sources ({} in {}ms):",
                response.contexts.len(),
                response.duration_ms
            )?;
            for (i, context) in response.contexts.iter().enumerate() {
                writeln!(output, "{}. [Score: {:.3}] {}", i + 1, context.score, context.source)?;
                for line in preview(&context.text, 200).lines() {
                    writeln!(output, "   {}", line)?;
                }
            }
            Ok(())
        })
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        render(|output| {
            writeln!(output, "Status")?;
            writeln!(output, "------")?;
            writeln!(
                output,
                "Config:        {}",
                status.config_path.as_deref().unwrap_or("(defaults)")
            )?;
            writeln!(output)?;

            let index_status = match (&status.index_error, status.index_exists) {
                (Some(_), _) => "[CORRUPT]",
                (None, true) => "[READY]",
                (None, false) => "[MISSING]",
            };
            writeln!(output, "Index:         {}", index_status)?;
            writeln!(output, "  Location:    {}", status.index_dir)?;
            if let Some(chunks) = status.indexed_chunks {
                writeln!(output, "  Chunks:      {}", chunks)?;
            }
            if let Some(dim) = status.dimension {
                writeln!(output, "  Dimension:   {}", dim)?;
            }
            if let Some(ref err) = status.index_error {
                writeln!(output, "  Error:       {}", err)?;
            }
            writeln!(output)?;

            writeln!(output, "Embedding:     {}", status.embedding_model)?;
            writeln!(output, "  URL:         {}", status.embedding_url)?;
            writeln!(output, "LLM:           {}", status.llm_model)?;
            writeln!(output, "  URL:         {}", status.llm_url)?;
            writeln!(output, "Retrieval:     top_k={} min_score={}", status.top_k, status.min_score)?;
            Ok(())
        })
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        render(|output| {
            writeln!(output, "Ingest Complete")?;
            writeln!(output, "---------------")?;
            writeln!(output, "Documents: {}", stats.documents)?;
            writeln!(output, "Chunks:    {}", stats.chunks)?;
            writeln!(output, "Batches:   {}", stats.batches)?;
            writeln!(output, "Skipped:   {}", stats.skipped_documents)?;
            writeln!(output, "Duration:  {}ms", stats.duration_ms)?;
            Ok(())
        })
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_json<T: Serialize>(&self, value: &T) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        result.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_answer(&self, response: &QueryResponse) -> String {
        self.to_json(response)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.to_json(status)
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        self.to_json(stats)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_answer(&self, response: &QueryResponse) -> String {
        render(|output| {
            writeln!(output, "## Answer\n")?;
            writeln!(output, "**Question:** {}\n", response.question)?;
            writeln!(output, "{}\n", response.answer)?;

            if response.contexts.is_empty() {
                return Ok(());
            }

            writeln!(output, "### Sources\n")?;
            for (i, context) in response.contexts.iter().enumerate() {
                writeln!(
                    output,
                    "{}. `{}` (score {:.3})",
                    i + 1,
                    context.source,
                    context.score
                )?;
            }
            writeln!(output)?;
            for context in &response.contexts {
                writeln!(output, "```")?;
                writeln!(output, "{}", context.text)?;
                writeln!(output, "```\n")?;
            }
            Ok(())
        })
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        render(|output| {
            writeln!(output, "## Status\n")?;

            let index_status = if status.index_exists && status.index_error.is_none() {
                "✅"
            } else {
                "❌"
            };
            writeln!(output, "### Index {}\n", index_status)?;
            writeln!(output, "- **Location:** `{}`", status.index_dir)?;
            if let Some(chunks) = status.indexed_chunks {
                writeln!(output, "- **Chunks:** {}", chunks)?;
            }
            if let Some(dim) = status.dimension {
                writeln!(output, "- **Dimension:** {}", dim)?;
            }
            if let Some(ref err) = status.index_error {
                writeln!(output, "- **Error:** {}", err)?;
            }
            writeln!(output)?;

            writeln!(output, "### Models\n")?;
            writeln!(
                output,
                "- **Embedding:** {} (`{}`)",
                status.embedding_model, status.embedding_url
            )?;
            writeln!(output, "- **LLM:** {} (`{}`)", status.llm_model, status.llm_url)?;
            writeln!(
                output,
                "- **Retrieval:** top_k={}, min_score={}",
                status.top_k, status.min_score
            )?;
            Ok(())
        })
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        render(|output| {
            writeln!(output, "## Ingest Complete\n")?;
            writeln!(output, "| Metric | Value |")?;
            writeln!(output, "|--------|-------|")?;
            writeln!(output, "| Documents | {} |", stats.documents)?;
            writeln!(output, "| Chunks | {} |", stats.chunks)?;
            writeln!(output, "| Batches | {} |", stats.batches)?;
            writeln!(output, "| Skipped | {} |", stats.skipped_documents)?;
            writeln!(output, "| Duration | {}ms |", stats.duration_ms)?;
            Ok(())
        })
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RetrievedContext;
    use crate::services::LOW_CONFIDENCE_ANSWER;

    fn response(contexts: Vec<RetrievedContext>) -> QueryResponse {
        QueryResponse {
            question: "What is Rust?".to_string(),
            answer: "A systems language.".to_string(),
            contexts,
            duration_ms: 7,
        }
    }

    fn context() -> RetrievedContext {
        RetrievedContext {
            score: 0.75,
            source: "docs/rust.md".to_string(),
            text: "Rust is a systems programming language.".to_string(),
        }
    }

    #[test]
    fn test_text_answer_lists_sources() {
        let out = TextFormatter.format_answer(&response(vec![context()]));
        assert!(out.contains("A systems language."));
        assert!(out.contains("1. [Score: 0.750] docs/rust.md"));
    }

    #[test]
    fn test_text_low_confidence_has_no_sources() {
        let mut resp = response(Vec::new());
        resp.answer = LOW_CONFIDENCE_ANSWER.to_string();
        let out = TextFormatter.format_answer(&resp);
        assert!(out.contains(LOW_CONFIDENCE_ANSWER));
        assert!(!out.contains("Sources"));
    }

    #[test]
    fn test_json_answer_shape() {
        let out = JsonFormatter::new(false).format_answer(&response(vec![context()]));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["question"], "What is Rust?");
        assert_eq!(value["contexts"][0]["source"], "docs/rust.md");
        assert_eq!(value["contexts"][0]["score"], 0.75);
    }

    #[test]
    fn test_markdown_ingest_table() {
        let stats = IngestStats {
            documents: 3,
            chunks: 10,
            batches: 1,
            skipped_documents: 0,
            duration_ms: 42,
        };
        let out = MarkdownFormatter.format_ingest_stats(&stats);
        assert!(out.contains("| Chunks | 10 |"));
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("hi", 5), "hi");
    }

    #[test]
    fn test_error_formats() {
        assert_eq!(TextFormatter.format_error("boom"), "Error: boom\n");
        assert_eq!(
            JsonFormatter::new(true).format_error("boom"),
            r#"{"error":"boom"}"#
        );
    }
}
