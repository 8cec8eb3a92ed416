//! Chat-completion transport for the oracle, with status-code
//! classification and per-difficulty model fallback.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use futures::future::BoxFuture;

use super::error::{OracleError, OracleResult};
use super::{GuessVerdict, ModelRoster, PuzzleDraft, QuestionVerdict, prompts, repair,
    with_fallback};
use crate::config::OracleConfig;
use crate::state::case::{Difficulty, Puzzle};

/// Oracle implementation speaking the OpenAI-style chat-completions wire
/// format. Cheap to clone; the HTTP client pools connections internally.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: Client,
    base_url: String,
    api_key: String,
    roster: ModelRoster,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct HintWire {
    hint: String,
}

#[derive(Deserialize)]
struct QuestionWire {
    status: String,
}

#[derive(Deserialize)]
struct GuessWire {
    #[serde(rename = "isCorrect", alias = "is_correct")]
    is_correct: bool,
    #[serde(default)]
    feedback: String,
}

impl HttpOracle {
    /// Build the client from resolved configuration. The credential was
    /// validated at configuration time; this only constructs the transport.
    pub fn new(config: &OracleConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            roster: config.roster.clone(),
        })
    }

    /// One completion round-trip against a specific model. Returns the raw
    /// assistant text; parsing happens per intent.
    async fn complete(&self, model: &str, user_prompt: &str) -> OracleResult<String> {
        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: prompts::SYSTEM_ROLE,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| OracleError::from_transport(err, model))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::from_status(status, model));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|_| OracleError::malformed("unreadable completion envelope"))?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(OracleError::malformed("empty completion"));
        }
        Ok(content)
    }
}

impl super::Oracle for HttpOracle {
    fn generate_puzzle(
        &self,
        difficulty: Difficulty,
        exclusions: Vec<String>,
    ) -> BoxFuture<'static, OracleResult<PuzzleDraft>> {
        let oracle = self.clone();
        Box::pin(async move {
            let prompt = prompts::generate_puzzle(difficulty, &exclusions);
            let candidates = oracle.roster.candidates(difficulty);
            with_fallback(&candidates, |model| {
                let oracle = oracle.clone();
                let prompt = prompt.clone();
                async move {
                    let text = oracle.complete(&model, &prompt).await?;
                    let draft: PuzzleDraft = repair::parse_object(&text)?;
                    if draft.title.trim().is_empty()
                        || draft.surface.trim().is_empty()
                        || draft.bottom.trim().is_empty()
                    {
                        return Err(OracleError::malformed("puzzle has blank fields"));
                    }
                    Ok(draft)
                }
            })
            .await
        })
    }

    fn generate_hint(
        &self,
        puzzle: Puzzle,
        delivered: Vec<String>,
        hint_index: u8,
    ) -> BoxFuture<'static, OracleResult<String>> {
        let oracle = self.clone();
        Box::pin(async move {
            let refs: Vec<&str> = delivered.iter().map(String::as_str).collect();
            let prompt = prompts::generate_hint(&puzzle, &refs, hint_index);
            let candidates = oracle.roster.candidates(puzzle.difficulty);
            with_fallback(&candidates, |model| {
                let oracle = oracle.clone();
                let prompt = prompt.clone();
                async move {
                    let text = oracle.complete(&model, &prompt).await?;
                    let wire: HintWire = repair::parse_object(&text)?;
                    let hint = wire.hint.trim().to_string();
                    if hint.is_empty() {
                        return Err(OracleError::malformed("blank hint"));
                    }
                    Ok(hint)
                }
            })
            .await
        })
    }

    fn evaluate_question(
        &self,
        puzzle: Puzzle,
        question: String,
    ) -> BoxFuture<'static, OracleResult<QuestionVerdict>> {
        let oracle = self.clone();
        Box::pin(async move {
            let prompt = prompts::evaluate_question(&puzzle, &question);
            let candidates = oracle.roster.candidates(puzzle.difficulty);
            with_fallback(&candidates, |model| {
                let oracle = oracle.clone();
                let prompt = prompt.clone();
                async move {
                    let text = oracle.complete(&model, &prompt).await?;
                    let wire: QuestionWire = repair::parse_object(&text)?;
                    match wire.status.trim().to_ascii_lowercase().as_str() {
                        "yes" => Ok(QuestionVerdict::Yes),
                        "no" => Ok(QuestionVerdict::No),
                        "irrelevant" => Ok(QuestionVerdict::Irrelevant),
                        other => Err(OracleError::malformed(format!(
                            "unknown question status `{other}`"
                        ))),
                    }
                }
            })
            .await
        })
    }

    fn evaluate_guess(
        &self,
        puzzle: Puzzle,
        guess: String,
    ) -> BoxFuture<'static, OracleResult<GuessVerdict>> {
        let oracle = self.clone();
        Box::pin(async move {
            let prompt = prompts::evaluate_guess(&puzzle, &guess);
            let candidates = oracle.roster.candidates(puzzle.difficulty);
            with_fallback(&candidates, |model| {
                let oracle = oracle.clone();
                let prompt = prompt.clone();
                async move {
                    let text = oracle.complete(&model, &prompt).await?;
                    let wire: GuessWire = repair::parse_object(&text)?;
                    // The rejection line is canonical regardless of what the
                    // model wrote; confirmations keep the model's wording.
                    let feedback = if wire.is_correct {
                        let trimmed = wire.feedback.trim();
                        if trimmed.is_empty() {
                            "That is exactly it. Well solved.".to_string()
                        } else {
                            trimmed.to_string()
                        }
                    } else {
                        prompts::REJECTION_FEEDBACK.to_string()
                    };
                    Ok(GuessVerdict {
                        is_correct: wire.is_correct,
                        feedback,
                    })
                }
            })
            .await
        })
    }
}
