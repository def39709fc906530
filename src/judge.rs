//! Adjudication of questions and guesses against a puzzle's hidden solution.

use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::{GenerateRequest, LlmConfig, LlmManager};
use crate::types::{HistoryEntry, Verdict, SOLVED_MARKER};

/// Sampling temperature for every judge call
pub const JUDGE_TEMPERATURE: f32 = 1.0;

/// Decides a verdict for one question. Implementations must not fail:
/// anything that goes wrong is reported as [`Verdict::Irrelevant`].
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(
        &self,
        surface: &str,
        solution: &str,
        guess: &str,
        history: &[HistoryEntry],
    ) -> Verdict;
}

const JUDGE_SYSTEM_PROMPT: &str = "You are the referee of a lateral thinking puzzle game. \
You know the full story. You never give hints, explanations or extra information, \
and you never reveal any part of the solution the players have not guessed.";

/// Build the judge prompt. Output depends only on the arguments.
pub fn build_prompt(
    surface: &str,
    solution: &str,
    guess: &str,
    history: &[HistoryEntry],
) -> String {
    let mut transcript = String::new();
    if !history.is_empty() {
        transcript.push_str("Previous questions and answers:\n");
        for (i, entry) in history.iter().enumerate() {
            let _ = writeln!(
                transcript,
                "Player {} Q{}: {}\nA{}: {}",
                entry.asker,
                i + 1,
                entry.question,
                i + 1,
                entry.verdict.as_word()
            );
        }
    }

    format!(
        "[Surface]: {surface}\n\
         [Solution]: {solution}\n\n\
         The player's question or guess is: \"{guess}\"\n\n\
         {transcript}\n\
         Rules:\n\
         1. First decide whether the current guess, together with the history above, \
         reconstructs enough of the solution to explain the whole story. If it does, reply \"{marker}\".\n\
         2. Otherwise answer with exactly one of:\n\
         - \"YES\": the question or guess agrees with the solution\n\
         - \"NO\": the question or guess contradicts the solution\n\
         - \"IRRELEVANT\": it does not matter for solving the puzzle, or asks about details the story never mentions\n\n\
         Your reply must be exactly one word: \"{marker}\", \"YES\", \"NO\" or \"IRRELEVANT\".",
        marker = SOLVED_MARKER,
    )
}

/// Judge backed by the configured LLM providers
pub struct LlmJudge {
    llm: Option<Arc<LlmManager>>,
    timeout: Duration,
    max_tokens: u32,
}

impl LlmJudge {
    pub fn new(llm: Option<Arc<LlmManager>>, config: &LlmConfig) -> Self {
        Self {
            llm,
            timeout: config.default_timeout,
            max_tokens: config.default_max_tokens,
        }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn judge(
        &self,
        surface: &str,
        solution: &str,
        guess: &str,
        history: &[HistoryEntry],
    ) -> Verdict {
        let llm = match &self.llm {
            Some(llm) => llm,
            None => {
                tracing::warn!("No LLM provider available, judging as Irrelevant");
                return Verdict::Irrelevant;
            }
        };

        let request = GenerateRequest {
            system: Some(JUDGE_SYSTEM_PROMPT.to_string()),
            prompt: build_prompt(surface, solution, guess, history),
            max_tokens: Some(self.max_tokens),
            temperature: Some(JUDGE_TEMPERATURE),
            timeout: self.timeout,
        };

        match llm.generate(request).await {
            Ok(response) => {
                let verdict = Verdict::parse(&response.text);
                tracing::info!(
                    "Judge verdict {:?} ({}ms via {})",
                    verdict,
                    response.metadata.latency_ms,
                    response.metadata.provider
                );
                verdict
            }
            Err(e) => {
                tracing::warn!("Judge call failed: {}, using Irrelevant", e);
                Verdict::Irrelevant
            }
        }
    }
}
