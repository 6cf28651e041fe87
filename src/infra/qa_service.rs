// ============================================================
// Layer 6 — QA Generation Client
// ============================================================
// Talks to any OpenAI-compatible chat-completions endpoint.
// One request per chunk, using a combined prompt that asks for
// three question types at once:
//
//   fact_single — a single fact stated in the passage
//   summary     — combines several facts from the passage
//   reasoning   — an inference drawn from the passage
//
// The model answers with a dictionary:
//   {"fact_single": .., "fact_single_answer": .., "summary": .., ...}
//
// Each question with a non-empty answer becomes one QaRecord
// line in the output artifact. Transport and HTTP failures abort
// the whole invocation; a reply that cannot be parsed yields no
// pairs for that chunk and is counted in the returned status.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::data::dataset::append_jsonl;
use crate::domain::chunk::Chunk;
use crate::domain::qa_pair::{QaPair, QaRecord};
use crate::domain::traits::{GenerationStatus, QaGenerator};

pub const QUESTION_TYPES: &[&str] = &["fact_single", "summary", "reasoning"];

const PROMPT_HEAD: &str = "I will provide you a text passage. I need you to generate three questions that \
must be answered only with information contained in this passage, and nothing else.\n\
The first question is of type \"fact_single\", which means that the answer to this question is a simple, \
single piece of factual information contained in the context.\n\
The second question is of type \"summary\", which means that the answer to this question summarizes \
different pieces of factual information contained in the context.\n\
The third question is of type \"reasoning\", which is a question that requires the reader to think \
critically and make an inference or draw a conclusion based on the information provided in the passage.\n\
Make sure that the three questions are different. Make sure that every question has a provided answer\n\n";

const PROMPT_TAIL: &str = "You will format your generation as a python dictionary, such as:\n\n\
{\"fact_single\": <The \"fact_single\" type question you thought of>, \
\"fact_single_answer\": <Answer to the \"fact_single\" question>, \
\"summary\": <the \"summary\" type question you thought of>, \
\"summary_answer\": <Answer to the \"summary\" question>, \
\"reasoning\": <the \"reasoning\" type question you thought of>, \
\"reasoning_answer\": <Answer to the \"reasoning\" question>}\n\n\
Only provide the python dictionary as your output. Make sure you provide an answer for each question.\n\n";

/// Connection settings for the generation endpoint.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub api_url:       String,
    pub api_key:       String,
    pub model_id:      String,
    /// Stylistic directive inserted into the prompt
    pub customization: Option<String>,
    pub timeout:       Option<Duration>,
}

pub struct OpenAiLikeGenerator {
    client:        reqwest::blocking::Client,
    endpoint:      String,
    api_key:       String,
    model_id:      String,
    customization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiLikeGenerator {
    pub fn new(settings: GeneratorSettings) -> Result<Self> {
        // None disables the blocking client's 30s default
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Cannot build HTTP client")?;

        Ok(Self {
            client,
            endpoint:      chat_endpoint(&settings.api_url),
            api_key:       settings.api_key,
            model_id:      settings.model_id,
            customization: settings.customization,
        })
    }

    pub fn prompt(&self, context: &str) -> String {
        let mut prompt = String::from(PROMPT_HEAD);
        if let Some(custom) = &self.customization {
            prompt.push_str(custom);
            prompt.push_str("\n\n");
        }
        prompt.push_str(PROMPT_TAIL);
        prompt.push_str("Context: ");
        prompt.push_str(context);
        prompt
    }

    fn request_body(&self, context: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model_id,
            "messages": [
                { "role": "user", "content": self.prompt(context) }
            ],
        })
    }

    fn complete(&self, context: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(context))
            .send()
            .with_context(|| format!("Request to '{}' failed", self.endpoint))?;

        let status = response.status();
        let body   = response.text().context("Cannot read response body")?;
        if !status.is_success() {
            bail!("Generation endpoint returned {}: {}", status, body);
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("Failed to parse chat completion response")?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

impl QaGenerator for OpenAiLikeGenerator {
    fn generate(&self, chunks: &[Chunk], output: &Path) -> Result<GenerationStatus> {
        let _span = tracing::info_span!("qa_service", model = %self.model_id, chunks = chunks.len())
            .entered();

        let mut unparsed = 0usize;
        for chunk in chunks {
            let reply = self.complete(&chunk.text)?;
            let Some(pairs) = parse_reply(&reply) else {
                tracing::warn!("Could not parse generated QA for chunk {}", chunk.id());
                unparsed += 1;
                continue;
            };

            let records: Vec<QaRecord> = pairs
                .into_iter()
                .map(|p| QaRecord {
                    chunk_id: chunk.id(),
                    context:  chunk.text.clone(),
                    question: p.question,
                    answer:   p.answer,
                })
                .collect();
            tracing::debug!("Chunk {}: {} QA pairs", chunk.id(), records.len());
            append_jsonl(output, &records)?;
        }

        Ok(if unparsed == 0 {
            GenerationStatus::Success
        } else {
            GenerationStatus::Partial { unparsed_chunks: unparsed }
        })
    }
}

fn chat_endpoint(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    }
}

/// Extract the question/answer pairs from a model reply. Accepts
/// JSON or a python-style dictionary with single-quoted strings.
/// Returns `None` when nothing usable is found.
pub fn parse_reply(reply: &str) -> Option<Vec<QaPair>> {
    let start = reply.find('{')?;
    let end   = reply.rfind('}')?;
    if end < start {
        return None;
    }
    let body = &reply[start..=end];

    let fields = serde_json::from_str::<HashMap<String, String>>(body)
        .ok()
        .or_else(|| parse_python_dict(body))?;

    let pairs: Vec<QaPair> = QUESTION_TYPES
        .iter()
        .filter_map(|kind| {
            let question = fields.get(*kind)?.trim();
            let answer   = fields.get(&format!("{kind}_answer"))?.trim();
            (!question.is_empty() && !answer.is_empty()).then(|| QaPair::new(question, answer))
        })
        .collect();

    (!pairs.is_empty()).then_some(pairs)
}

fn parse_python_dict(body: &str) -> Option<HashMap<String, String>> {
    let entry = Regex::new(r#"['"](\w+)['"]\s*:\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#).ok()?;
    let fields: HashMap<String, String> = entry
        .captures_iter(body)
        .filter_map(|c| {
            let value = c.get(2).or_else(|| c.get(3))?.as_str();
            Some((c[1].to_string(), value.replace("\\'", "'").replace("\\\"", "\"")))
        })
        .collect();
    (!fields.is_empty()).then_some(fields)
}
