//! Heuristic intent classification.

use crate::types::Intent;

const RETRY_MARKERS: [&str; 3] = ["retry", "fix", "try again"];
const QUESTION_WORDS: [&str; 5] = ["what", "where", "how", "who", "why"];
const TASK_VERBS: [&str; 5] = ["create", "build", "write", "make", "setup"];

/// Classify one utterance given whether the previous command failed.
///
/// Rules are tried in priority order; the first match wins:
/// 1. retry markers, only when a previous error exists
/// 2. trailing `?` or a question word anywhere in the text
/// 3. a task verb plus more than two whitespace-separated tokens
/// 4. everything else is a single command
///
/// Pure function of its two inputs.
pub fn classify(utterance: &str, last_error: Option<&str>) -> Intent {
    let lowered = utterance.to_lowercase();
    let lowered = lowered.trim();

    if last_error.is_some() && RETRY_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Intent::ErrorRetry;
    }
    if lowered.ends_with('?') || QUESTION_WORDS.iter().any(|word| lowered.contains(word)) {
        return Intent::Question;
    }
    if TASK_VERBS.iter().any(|verb| lowered.contains(verb))
        && utterance.split_whitespace().count() > 2
    {
        return Intent::AutonomousTask;
    }
    Intent::SingleCommand
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_requires_last_error() {
        assert_eq!(
            classify("fix it", Some("No such file")),
            Intent::ErrorRetry
        );
        // Without an error the same words fall through to the other rules.
        assert_eq!(classify("fix it", None), Intent::SingleCommand);
    }

    #[test]
    fn test_retry_wins_over_task_verbs() {
        // "fix" plus an error beats the autonomous-task rule even though
        // "build" and the token count would match it.
        assert_eq!(
            classify("fix the build please", Some("compile error")),
            Intent::ErrorRetry
        );
    }

    #[test]
    fn test_try_again_marker() {
        assert_eq!(
            classify("try again with sudo", Some("permission denied")),
            Intent::ErrorRetry
        );
    }

    #[test]
    fn test_question_mark() {
        assert_eq!(classify("is the server up?", None), Intent::Question);
    }

    #[test]
    fn test_question_words() {
        assert_eq!(classify("how do I list files", None), Intent::Question);
        assert_eq!(classify("where is my config", None), Intent::Question);
    }

    #[test]
    fn test_question_beats_task() {
        // Trailing "?" wins even when a task verb and token count match.
        assert_eq!(
            classify("can you build a website?", None),
            Intent::Question
        );
    }

    #[test]
    fn test_autonomous_task() {
        assert_eq!(
            classify("create a python project", None),
            Intent::AutonomousTask
        );
        assert_eq!(
            classify("setup nginx with tls", None),
            Intent::AutonomousTask
        );
    }

    #[test]
    fn test_task_verb_needs_three_tokens() {
        assert_eq!(classify("build this", None), Intent::SingleCommand);
        assert_eq!(classify("build this now", None), Intent::AutonomousTask);
    }

    #[test]
    fn test_default_single_command() {
        assert_eq!(classify("list files in /tmp", None), Intent::SingleCommand);
        assert_eq!(classify("ls", None), Intent::SingleCommand);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("FIX it", Some("boom")), Intent::ErrorRetry);
        assert_eq!(classify("WHAT is this", None), Intent::Question);
    }
}
