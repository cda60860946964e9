// Language detection via a lightweight LLM call
//
// Detection runs at most once per session: the caller caches the tag in the
// session document and only invokes the detector when no tag is cached.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::warn;

use crate::llm::{LlmClient, LlmMessage, LlmRequest};

/// Safe fallback when detection is impossible or produces garbage
pub const DEFAULT_LANGUAGE: &str = "en-US";

const DETECTOR_DIRECTIVE: &str = "You are a strict language detector. \
Return ONLY the primary BCP-47 language code of the provided text. \
Examples: 'en-US', 'pl-PL', 'de-DE'. Do not add explanations.";

fn bcp47_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2,3}(-[A-Z]{2})?$").unwrap())
}

/// Check a candidate tag against the accepted BCP-47 subset
pub fn is_valid_tag(tag: &str) -> bool {
    bcp47_re().is_match(tag)
}

/// One-shot language detector over the cheap model
pub struct LanguageDetector {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl LanguageDetector {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Detect the dominant language of `text` as a BCP-47 tag
    ///
    /// Never fails: LLM errors and malformed responses degrade to
    /// `DEFAULT_LANGUAGE` with a logged warning.
    pub async fn detect(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return DEFAULT_LANGUAGE.to_string();
        }

        let request = LlmRequest {
            model: self.model.clone(),
            system: DETECTOR_DIRECTIVE.to_string(),
            messages: vec![LlmMessage::user(text)],
            tools: Vec::new(),
            temperature: Some(0.0),
        };

        match self.llm.chat(request).await {
            Ok(reply) => {
                let tag = reply.text.trim().to_string();
                if is_valid_tag(&tag) {
                    tag
                } else {
                    warn!(candidate = %tag, "Language detector returned an invalid tag");
                    DEFAULT_LANGUAGE.to_string()
                }
            }
            Err(e) => {
                warn!(error = %e, "Language detection failed");
                DEFAULT_LANGUAGE.to_string()
            }
        }
    }
}

/// Constant apology used when a turn aborts (round bound or deadline),
/// picked by the session's cached language.
pub fn apology(language: &str) -> &'static str {
    let primary = language.split('-').next().unwrap_or("en");
    match primary {
        "pl" => "Przepraszam, nie udało mi się teraz przygotować odpowiedzi. Spróbuj ponownie.",
        "de" => "Entschuldigung, ich konnte gerade keine Antwort erstellen. Bitte versuchen Sie es erneut.",
        "es" => "Lo siento, no he podido preparar una respuesta ahora mismo. Inténtalo de nuevo.",
        "fr" => "Désolé, je n'ai pas pu préparer de réponse pour le moment. Veuillez réessayer.",
        "it" => "Mi dispiace, non sono riuscito a preparare una risposta. Riprova.",
        _ => "Sorry, I could not put together an answer right now. Please try again.",
    }
}
