//! Turn lifecycle
//!
//! A turn is one user submission and the single bot message that answers it.
//! `TurnController` owns the transcript plus the two flags that describe a turn
//! in flight (input disabled, typing indicator visible) and is the only thing
//! allowed to change them.
//!
//! Front ends that can simply await use [`TurnController::submit`]. A UI that
//! must keep drawing while the reply is pending calls
//! [`TurnController::begin_turn`], runs the fetch on its own task, and hands the
//! outcome to [`TurnController::complete_turn`].

use tracing::{debug, error, warn};

use crate::error::FetchError;
use crate::fetcher::{ChatReply, ReplyFetcher};
use crate::state::{ChatMessage, Transcript};

pub const WELCOME_MESSAGE: &str = "Hello! I'm IntelliChat, your smart assistant. I can help you with:

📊 Attendance records and tracking
📈 Business summaries and reports
📊 Startup analytics and metrics
🔬 Research papers and studies

Ask me anything about these topics!";

/// Shown in place of a reply when the fetch fails for any reason
pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Result of the fetch half of a turn
pub type TurnOutcome = Result<ChatReply, FetchError>;

/// A turn whose user message is already in the transcript and whose reply is
/// still owed.
#[derive(Debug)]
#[must_use = "a pending turn leaves input disabled until it is completed"]
pub struct PendingTurn {
    message: String,
}

impl PendingTurn {
    /// The trimmed text to send to the backend
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

#[derive(Debug)]
pub struct TurnController {
    transcript: Transcript,
    input_enabled: bool,
    typing: bool,
    initialized: bool,
}

impl Default for TurnController {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnController {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            input_enabled: true,
            typing: false,
            initialized: false,
        }
    }

    /// Append the welcome message. Returns false if already initialized.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            debug!("initialize called twice; ignoring");
            return false;
        }
        self.initialized = true;
        self.transcript.push(ChatMessage::bot(WELCOME_MESSAGE));
        true
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Start a turn: append the user message, disable input, show the typing
    /// indicator.
    ///
    /// Returns `None` without touching any state when `raw` trims to nothing or
    /// another turn is still in flight. On `Some`, the caller clears its input
    /// surface, fetches the reply for [`PendingTurn::message`], and must pass
    /// the outcome to [`complete_turn`](Self::complete_turn).
    pub fn begin_turn(&mut self, raw: &str) -> Option<PendingTurn> {
        if !self.input_enabled {
            debug!("submission ignored; a turn is already in flight");
            return None;
        }

        let message = raw.trim();
        if message.is_empty() {
            return None;
        }

        self.transcript.push(ChatMessage::user(message));
        self.input_enabled = false;
        self.typing = true;
        debug!(chars = message.chars().count(), "turn started");

        Some(PendingTurn {
            message: message.to_string(),
        })
    }

    /// Finish the in-flight turn with the fetch outcome.
    ///
    /// Appends exactly one bot message (the reply, the fallback text, or the
    /// apology) and re-enables input. Returns `None` if no turn was in flight.
    pub fn complete_turn(&mut self, outcome: TurnOutcome) -> Option<&ChatMessage> {
        if self.input_enabled {
            warn!("reply arrived with no turn in flight; dropping it");
            return None;
        }

        let content = match outcome {
            Ok(reply) => {
                if !reply.has_text() {
                    warn!("backend reply had no text; using fallback");
                }
                reply.into_text()
            }
            Err(err) => {
                error!(error = %err, "failed to fetch reply");
                APOLOGY_MESSAGE.to_string()
            }
        };

        self.typing = false;
        self.input_enabled = true;
        let message = self.transcript.push(ChatMessage::bot(content));
        debug!(role = message.role().as_str(), "turn completed");
        Some(message)
    }

    /// Run a whole turn, awaiting the fetcher inline.
    ///
    /// Returns the bot message that closed the turn, or `None` if the input was
    /// rejected by [`begin_turn`](Self::begin_turn).
    pub async fn submit<F>(&mut self, raw: &str, fetcher: &F) -> Option<&ChatMessage>
    where
        F: ReplyFetcher + ?Sized,
    {
        let pending = self.begin_turn(raw)?;
        let outcome = fetcher.fetch_reply(pending.message()).await;
        self.complete_turn(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FALLBACK_REPLY;
    use crate::state::ChatRole;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Script {
        Reply(ChatReply),
        Unavailable,
        Malformed,
    }

    struct ScriptedFetcher {
        script: Script,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(script: Script) -> Self {
            Self {
                script,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReplyFetcher for ScriptedFetcher {
        async fn fetch_reply(&self, message: &str) -> Result<ChatReply, FetchError> {
            self.seen.lock().unwrap().push(message.to_string());
            match &self.script {
                Script::Reply(reply) => Ok(reply.clone()),
                Script::Unavailable => Err(FetchError::Status(
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                )),
                Script::Malformed => Err(FetchError::Malformed(
                    serde_json::from_str::<ChatReply>("<html>").unwrap_err(),
                )),
            }
        }
    }

    fn contents(controller: &TurnController) -> Vec<(ChatRole, String)> {
        controller
            .transcript()
            .iter()
            .map(|m| (m.role(), m.content().to_string()))
            .collect()
    }

    fn ready() -> TurnController {
        let mut controller = TurnController::new();
        assert!(controller.initialize());
        controller
    }

    #[test]
    fn test_initialize_appends_welcome_once() {
        let mut controller = TurnController::new();
        assert!(controller.initialize());
        assert!(!controller.initialize());
        assert_eq!(
            contents(&controller),
            vec![(ChatRole::Bot, WELCOME_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_whitespace_input_is_noop() {
        let mut controller = ready();
        let fetcher = ScriptedFetcher::new(Script::Reply(ChatReply::new("unused")));

        for raw in ["", "   ", "\t\n  "] {
            assert!(controller.submit(raw, &fetcher).await.is_none());
        }

        assert_eq!(controller.transcript().len(), 1);
        assert!(controller.input_enabled());
        assert!(!controller.is_typing());
        assert!(fetcher.seen().is_empty());
    }

    #[tokio::test]
    async fn test_successful_turn() {
        let mut controller = ready();
        let fetcher = ScriptedFetcher::new(Script::Reply(ChatReply::new("Q2 attendance was 92%.")));

        let reply = controller
            .submit("What is our Q2 attendance?", &fetcher)
            .await
            .map(|m| m.content().to_string());
        assert_eq!(reply.as_deref(), Some("Q2 attendance was 92%."));

        assert_eq!(
            contents(&controller),
            vec![
                (ChatRole::Bot, WELCOME_MESSAGE.to_string()),
                (ChatRole::User, "What is our Q2 attendance?".to_string()),
                (ChatRole::Bot, "Q2 attendance was 92%.".to_string()),
            ]
        );
        assert!(controller.input_enabled());
        assert!(!controller.is_typing());
    }

    #[tokio::test]
    async fn test_input_is_trimmed_before_send() {
        let mut controller = ready();
        let fetcher = ScriptedFetcher::new(Script::Reply(ChatReply::new("hi")));

        controller.submit("  hello there \n", &fetcher).await;

        assert_eq!(fetcher.seen(), vec!["hello there".to_string()]);
        assert_eq!(controller.transcript().messages()[1].content(), "hello there");
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback() {
        for reply in [ChatReply::default(), ChatReply::new("")] {
            let mut controller = ready();
            let fetcher = ScriptedFetcher::new(Script::Reply(reply));

            controller.submit("anything", &fetcher).await;

            assert_eq!(controller.transcript().len(), 3);
            assert_eq!(
                controller.transcript().last().map(|m| m.content()),
                Some(FALLBACK_REPLY)
            );
        }
    }

    #[tokio::test]
    async fn test_failures_look_identical() {
        let mut outcomes = Vec::new();

        for script in [Script::Unavailable, Script::Malformed] {
            let mut controller = ready();
            let fetcher = ScriptedFetcher::new(script);

            controller.submit("hello", &fetcher).await;

            assert!(controller.input_enabled());
            assert!(!controller.is_typing());
            outcomes.push(contents(&controller));
        }

        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(
            &outcomes[0][1..],
            &[
                (ChatRole::User, "hello".to_string()),
                (ChatRole::Bot, APOLOGY_MESSAGE.to_string()),
            ]
        );
    }

    #[test]
    fn test_begin_turn_sets_flags() {
        let mut controller = ready();

        let pending = controller.begin_turn("status?").expect("turn should start");
        assert_eq!(pending.message(), "status?");
        assert!(!controller.input_enabled());
        assert!(controller.is_typing());
        assert_eq!(controller.transcript().len(), 2);
    }

    #[test]
    fn test_second_submission_while_in_flight_is_ignored() {
        let mut controller = ready();

        let _pending = controller.begin_turn("first").unwrap();
        assert!(controller.begin_turn("second").is_none());
        assert_eq!(controller.transcript().len(), 2);

        controller.complete_turn(Ok(ChatReply::new("answer")));
        assert_eq!(
            contents(&controller)[1..],
            [
                (ChatRole::User, "first".to_string()),
                (ChatRole::Bot, "answer".to_string()),
            ]
        );

        // Input is usable again once the turn has closed
        assert!(controller.begin_turn("second").is_some());
    }

    #[test]
    fn test_complete_without_turn_is_dropped() {
        let mut controller = ready();
        assert!(controller
            .complete_turn(Ok(ChatReply::new("stray")))
            .is_none());
        assert_eq!(controller.transcript().len(), 1);
    }

    #[test]
    fn test_task_failure_still_closes_turn() {
        let mut controller = ready();
        let _pending = controller.begin_turn("hello").unwrap();

        let message = controller
            .complete_turn(Err(FetchError::TaskFailed("task panicked".into())))
            .map(|m| m.content().to_string());

        assert_eq!(message.as_deref(), Some(APOLOGY_MESSAGE));
        assert!(controller.input_enabled());
        assert!(!controller.is_typing());
    }
}
