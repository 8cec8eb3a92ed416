//! Prompt construction for the three oracle intents. The contracts that the
//! game relies on, the grading leniency and the fixed rejection line, live
//! here as literals so they are applied identically on every request.

use crate::state::case::{Difficulty, Puzzle};

/// Canonical feedback for an incorrect guess. The client overwrites whatever
/// the model produced with this literal, so the UI can treat rejection text
/// as non-varying.
pub const REJECTION_FEEDBACK: &str =
    "Not quite. That is not the heart of this story. Keep probing with yes/no questions.";

/// Shared preamble for every request.
pub const SYSTEM_ROLE: &str = "You are the game master of a lateral-thinking riddle game. \
     You answer only with a single JSON object matching the requested shape, \
     with no surrounding prose, markdown or code fences.";

fn difficulty_brief(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => {
            "easy: an everyday setting, a single misdirection, solvable in a handful of questions"
        }
        Difficulty::Medium => {
            "medium: an unusual setting, one solid twist, a few supporting details to uncover"
        }
        Difficulty::Hard => {
            "hard: a layered scenario whose twist hides behind at least two misleading assumptions"
        }
    }
}

/// Prompt asking for a fresh puzzle, biased away from previously played
/// scenarios.
pub fn generate_puzzle(difficulty: Difficulty, exclusions: &[String]) -> String {
    let mut prompt = format!(
        "Invent a new lateral-thinking riddle at {} difficulty.\n\
         The surface is a short, strange but plausible scene shown to the player. \
         The bottom is the hidden truth that fully explains it through one \
         surprising causal twist.\n",
        difficulty_brief(difficulty)
    );

    if !exclusions.is_empty() {
        prompt.push_str(
            "\nDo not reuse or trivially rephrase any of these already-played scenarios:\n",
        );
        for snippet in exclusions {
            prompt.push_str("- ");
            prompt.push_str(snippet);
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "\nRespond with JSON: {\"title\": string, \"surface\": string, \"bottom\": string}",
    );
    prompt
}

/// Prompt asking for the next hint, given what has already been revealed.
pub fn generate_hint(puzzle: &Puzzle, delivered: &[&str], hint_index: u8) -> String {
    let mut prompt = format!(
        "The player is stuck on this riddle.\nSurface: {}\nHidden truth: {}\n",
        puzzle.surface, puzzle.bottom
    );

    if delivered.is_empty() {
        prompt.push_str("No hints have been given yet.\n");
    } else {
        prompt.push_str("Hints already given:\n");
        for hint in delivered {
            prompt.push_str("- ");
            prompt.push_str(hint);
            prompt.push('\n');
        }
    }

    prompt.push_str(&format!(
        "\nWrite hint number {hint_index}. Each hint should edge closer to the truth \
         than the last without giving it away. At most 15 words.\n\
         Respond with JSON: {{\"hint\": string}}"
    ));
    prompt
}

/// Prompt judging a yes/no question against the hidden truth.
pub fn evaluate_question(puzzle: &Puzzle, question: &str) -> String {
    format!(
        "A player investigates this riddle.\nSurface: {}\nHidden truth: {}\n\n\
         Their question: {question}\n\n\
         Judge the question against the hidden truth only. Answer \"yes\" when it \
         holds, \"no\" when it contradicts the truth, and \"irrelevant\" when the \
         truth does not determine the answer either way.\n\
         Respond with JSON: {{\"status\": \"yes\" | \"no\" | \"irrelevant\"}}",
        puzzle.surface, puzzle.bottom
    )
}

/// Prompt judging a full-solution guess against the hidden truth.
pub fn evaluate_guess(puzzle: &Puzzle, guess: &str) -> String {
    format!(
        "A player proposes a solution to this riddle.\nSurface: {}\nHidden truth: {}\n\n\
         Their guess: {guess}\n\n\
         Grade the guess as correct when it captures the core causal twist of the \
         hidden truth. Accept paraphrases and synonyms. Reject guesses that are \
         generically vague or that omit the specific identifying detail of the \
         twist. When correct, the feedback warmly confirms the solution in one or \
         two sentences. When incorrect, the feedback must be exactly: \
         \"{REJECTION_FEEDBACK}\"\n\
         Respond with JSON: {{\"isCorrect\": boolean, \"feedback\": string}}",
        puzzle.surface, puzzle.bottom
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::case::Difficulty;

    fn puzzle() -> Puzzle {
        Puzzle {
            title: "T".into(),
            surface: "S".into(),
            bottom: "B".into(),
            difficulty: Difficulty::Easy,
        }
    }

    #[test]
    fn puzzle_prompt_lists_exclusions() {
        let prompt = generate_puzzle(
            Difficulty::Hard,
            &["The Elevator: a man rides halfway".to_string()],
        );
        assert!(prompt.contains("hard"));
        assert!(prompt.contains("The Elevator"));
        assert!(prompt.contains("\"bottom\""));
    }

    #[test]
    fn hint_prompt_numbers_the_attempt_and_carries_prior_hints() {
        let prompt = generate_hint(&puzzle(), &["look closer"], 2);
        assert!(prompt.contains("hint number 2"));
        assert!(prompt.contains("- look closer"));
        assert!(prompt.contains("15 words"));
    }

    #[test]
    fn guess_prompt_embeds_the_fixed_rejection_literal() {
        let prompt = evaluate_guess(&puzzle(), "he did it");
        assert!(prompt.contains(REJECTION_FEEDBACK));
        assert!(prompt.contains("isCorrect"));
    }
}
