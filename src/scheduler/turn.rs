//! Turn execution: whose turn it is, where their line comes from, and what
//! happens to it afterwards.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::content::ContentProvider;
use crate::error::{Error, Result};
use crate::generator::{ContextLine, ExternalGenerator};
use crate::ledger::{SharedLedger, UsageLedger};
use crate::persona::{BehaviorMode, Persona};

use super::transcript::{format_elapsed, Transcript, TranscriptEntry};

/// Speaker of the session-start announcement
pub const SESSION_SOURCE: &str = "System Log";

/// First line of every session
pub const SESSION_START_TEXT: &str =
    "Connection established to backrooms server. AI model conversation initialized.";

/// Longest text preview written to turn logs
const LOG_PREVIEW_CHARS: usize = 60;

// ─────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────

/// Pacing and limits for the turn loop
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub daily_limit: u32,
    pub first_turn_delay: Duration,
    pub min_turn_delay_ms: u64,
    pub max_turn_delay_ms: u64,
    pub retry_delay: Duration,
    pub transcript_limit: usize,
    pub transcript_keep: usize,
    pub context_window: usize,
    pub anomaly_rate: f64,
}

impl TurnSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        let conv = &config.conversation;
        Self {
            daily_limit: config.budget.daily_limit,
            first_turn_delay: conv.first_turn_delay(),
            min_turn_delay_ms: conv.min_turn_delay_ms,
            max_turn_delay_ms: conv.max_turn_delay_ms,
            retry_delay: conv.retry_delay(),
            transcript_limit: conv.transcript_limit,
            transcript_keep: conv.transcript_keep,
            context_window: conv.context_window,
            anomaly_rate: conv.anomaly_rate,
        }
    }
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

// ─────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────

/// Owns the rotation, the transcript and the session clock.
///
/// A turn either commits completely (append, publish, advance) or leaves
/// the state untouched, so a failed turn can simply be run again.
pub struct TurnScheduler {
    rotation: Vec<Persona>,
    position: usize,
    transcript: Transcript,
    session_start: Instant,
    settings: TurnSettings,
    ledger: SharedLedger,
    content: Arc<dyn ContentProvider>,
    generator: Arc<dyn ExternalGenerator>,
    broadcaster: Broadcaster,
    rng: Box<dyn RngCore + Send>,
}

impl TurnScheduler {
    pub fn new(
        rotation: Vec<Persona>,
        settings: TurnSettings,
        ledger: SharedLedger,
        content: Arc<dyn ContentProvider>,
        generator: Arc<dyn ExternalGenerator>,
        broadcaster: Broadcaster,
    ) -> Result<Self> {
        if rotation.is_empty() {
            return Err(Error::config_field_invalid(
                "conversation.rotation",
                "Rotation must name at least one persona",
            ));
        }

        Ok(Self {
            rotation,
            position: 0,
            transcript: Transcript::new(settings.transcript_limit, settings.transcript_keep),
            session_start: Instant::now(),
            settings,
            ledger,
            content,
            generator,
            broadcaster,
            rng: Box::new(StdRng::from_entropy()),
        })
    }

    /// Replace the random source (tests use a seeded one)
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Restart the session clock and announce the session.
    pub fn begin_session(&mut self) -> TranscriptEntry {
        self.session_start = Instant::now();
        let entry = self.entry(SESSION_SOURCE, SESSION_START_TEXT.to_string());
        self.commit(entry.clone());
        info!(personas = self.rotation.len(), "Conversation session started");
        entry
    }

    /// Run one turn for the persona at the current position.
    pub async fn execute_turn(&mut self) -> Result<TranscriptEntry> {
        let persona = self.rotation[self.position].clone();

        let text = match persona.mode {
            BehaviorMode::SystemLog => self.system_line()?,
            BehaviorMode::CannedOnly => choose(
                self.rng.as_mut(),
                self.content.canned_messages(&persona.name),
                || format!("canned.\"{}\"", persona.name),
            )?,
            BehaviorMode::ExternalGenerated => self.generated_line(&persona).await?,
        };

        let entry = self.entry(&persona.name, text);
        let position = self.position;
        self.commit(entry.clone());
        self.position = (self.position + 1) % self.rotation.len();

        info!(
            persona = %persona.name,
            mode = %persona.mode,
            position,
            timestamp = %entry.timestamp,
            preview = %preview(&entry.text),
            "Turn completed"
        );

        Ok(entry)
    }

    /// Uniform delay in `[min_turn_delay_ms, max_turn_delay_ms)`
    pub fn next_delay(&mut self) -> Duration {
        let min = self.settings.min_turn_delay_ms;
        let max = self.settings.max_turn_delay_ms.max(min + 1);
        Duration::from_millis(self.rng.gen_range(min..max))
    }

    fn system_line(&mut self) -> Result<String> {
        let anomalies = self.content.anomaly_messages();
        if !anomalies.is_empty() && self.rng.gen_bool(self.settings.anomaly_rate) {
            return choose(self.rng.as_mut(), anomalies, || "anomaly_messages".to_string());
        }
        choose(self.rng.as_mut(), self.content.system_messages(), || {
            "system_messages".to_string()
        })
    }

    async fn generated_line(&mut self, persona: &Persona) -> Result<String> {
        let limit = self.settings.daily_limit;
        let remaining = with_ledger(&self.ledger, move |ledger| ledger.remaining(limit)).await?;
        if remaining == 0 {
            debug!(persona = %persona.name, "Daily budget exhausted, using fallback line");
            return choose(
                self.rng.as_mut(),
                self.content.fallback_messages(&persona.name),
                || format!("fallback.\"{}\"", persona.name),
            );
        }

        let context: Vec<ContextLine> = self
            .transcript
            .recent(self.settings.context_window)
            .iter()
            .map(ContextLine::from)
            .collect();

        match self.generator.generate(&persona.name, &context).await {
            Ok(text) => {
                // The line is already paid for, so a bookkeeping failure must not drop it
                match with_ledger(&self.ledger, UsageLedger::record_call).await {
                    Ok(count) => debug!(
                        persona = %persona.name,
                        generator = self.generator.name(),
                        count,
                        limit = self.settings.daily_limit,
                        "Generator call recorded"
                    ),
                    Err(e) => warn!(
                        persona = %persona.name,
                        error = %e.format_for_log(),
                        "Generator call not recorded"
                    ),
                }
                Ok(text)
            }
            Err(e) => {
                warn!(
                    persona = %persona.name,
                    error = %Error::from(e).format_for_log(),
                    "Generation failed, publishing placeholder"
                );
                Ok(format!("[Error generating response from {}]", persona.name))
            }
        }
    }

    fn entry(&self, source: &str, text: String) -> TranscriptEntry {
        TranscriptEntry {
            source: source.to_string(),
            text,
            timestamp: format_elapsed(self.session_start.elapsed()),
        }
    }

    fn commit(&mut self, entry: TranscriptEntry) {
        if self.transcript.push(entry.clone()) {
            debug!(kept = self.transcript.len(), "Transcript truncated");
        }
        self.broadcaster.publish(&entry, self.transcript.entries());
    }
}

/// Run `op` against the ledger on the blocking pool; it may write the
/// ledger file.
async fn with_ledger<T, F>(ledger: &SharedLedger, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut UsageLedger) -> T + Send + 'static,
{
    let ledger = ledger.clone();
    tokio::task::spawn_blocking(move || op(&mut ledger.lock()))
        .await
        .map_err(|e| Error::Internal(format!("Usage ledger task failed: {}", e)))
}

fn choose(
    rng: &mut dyn RngCore,
    lines: &[String],
    catalog: impl FnOnce() -> String,
) -> Result<String> {
    lines
        .choose(rng)
        .cloned()
        .ok_or_else(|| Error::empty_catalog(catalog()))
}

fn preview(text: &str) -> String {
    if text.chars().count() <= LOG_PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    format!("{}...", cut)
}
