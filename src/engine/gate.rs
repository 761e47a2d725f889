//! Request-volume confirmation.
//!
//! The [`ConfirmationGate`] counts fetch requests across scheduling rounds.
//! Once the running total exceeds the threshold, continuing requires
//! authorization: either a policy fixed up front (`--assume-yes` /
//! `--assume-no`) or an interactive answer. An interactive answer becomes the
//! policy for the rest of the run, so the user is asked at most once.
//!
//! The gate is consulted only at round boundaries, never in the middle of
//! dispatching a round.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::utils::console;

const PROMPT: &str = "Continue requests? [y/N] ";

/// Authorizes batches of fetch requests.
pub struct ConfirmationGate {
    threshold: usize,
    total: usize,
    policy: Option<bool>,
    prompts: usize,
    input: Box<dyn AsyncBufRead + Unpin + Send>,
}

impl std::fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGate")
            .field("threshold", &self.threshold)
            .field("total", &self.total)
            .field("policy", &self.policy)
            .field("prompts", &self.prompts)
            .finish_non_exhaustive()
    }
}

impl ConfirmationGate {
    /// Create a gate reading answers from stdin.
    ///
    /// `policy` is `Some(true)` for assume-yes, `Some(false)` for assume-no
    /// and `None` to ask.
    #[must_use]
    pub fn new(threshold: usize, policy: Option<bool>) -> Self {
        Self {
            threshold,
            total: 0,
            policy,
            prompts: 0,
            input: Box::new(BufReader::new(tokio::io::stdin())),
        }
    }

    /// Read answers from `input` instead of stdin.
    #[must_use]
    pub fn with_input(mut self, input: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    /// Requests counted so far.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// The standing answer, if one has been fixed.
    #[must_use]
    pub const fn policy(&self) -> Option<bool> {
        self.policy
    }

    /// How many times the user has been asked.
    #[must_use]
    pub const fn prompts(&self) -> usize {
        self.prompts
    }

    /// Count a batch of `requests` and decide whether it may proceed.
    ///
    /// # Errors
    ///
    /// Fails only if reading the answer fails; a closed input is a denial.
    pub async fn authorize(&mut self, requests: usize) -> Result<bool> {
        self.total += requests;
        if self.total <= self.threshold {
            return Ok(true);
        }

        if let Some(answer) = self.policy {
            return Ok(answer);
        }

        console::log(format!("Reached a total of {} requests.", self.total));
        let answer = self.ask().await?;
        self.policy = Some(answer);
        Ok(answer)
    }

    async fn ask(&mut self) -> Result<bool> {
        self.prompts += 1;

        loop {
            print!("{PROMPT}");
            std::io::stdout().flush()?;

            let mut response = String::new();
            if self.input.read_line(&mut response).await? == 0 {
                // closed input
                println!();
                return Ok(false);
            }

            match response.trim_end_matches(['\r', '\n']).to_lowercase().as_str() {
                "y" => return Ok(true),
                "" | "n" => return Ok(false),
                _ => console::warn("Invalid response."),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(policy: Option<bool>, input: &'static [u8]) -> ConfirmationGate {
        ConfirmationGate::new(25, policy).with_input(input)
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let mut gate = gate(None, b"");
        assert!(gate.authorize(20).await.unwrap());
        assert!(gate.authorize(5).await.unwrap());
        assert_eq!(gate.total(), 25);
        assert_eq!(gate.prompts(), 0);
    }

    #[tokio::test]
    async fn test_policy_applies_without_prompt() {
        let mut yes = gate(Some(true), b"");
        assert!(yes.authorize(30).await.unwrap());
        assert_eq!(yes.prompts(), 0);

        let mut no = gate(Some(false), b"");
        assert!(!no.authorize(30).await.unwrap());
        assert_eq!(no.prompts(), 0);
    }

    #[tokio::test]
    async fn test_answer_is_sticky() {
        let mut gate = gate(None, b"y\n");
        assert!(gate.authorize(26).await.unwrap());
        assert!(gate.authorize(10).await.unwrap());
        assert_eq!(gate.prompts(), 1);
        assert_eq!(gate.policy(), Some(true));
    }

    #[tokio::test]
    async fn test_default_answer_denies() {
        let mut gate = gate(None, b"\n");
        assert!(!gate.authorize(26).await.unwrap());
        assert_eq!(gate.policy(), Some(false));
    }

    #[tokio::test]
    async fn test_closed_input_denies() {
        let mut gate = gate(None, b"");
        assert!(!gate.authorize(26).await.unwrap());
        assert_eq!(gate.prompts(), 1);
    }

    #[tokio::test]
    async fn test_invalid_responses_reprompt() {
        let mut gate = gate(None, b"yes\nmaybe\r\nY\r\n");
        assert!(gate.authorize(40).await.unwrap());
        assert_eq!(gate.prompts(), 1);

        let mut gate = self::gate(None, b"what\nN\n");
        assert!(!gate.authorize(40).await.unwrap());
    }
}
