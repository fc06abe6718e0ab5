use std::path::Path;

use nadia_core::config::MIN_STABLE_PREFIX_TOKENS;

use crate::provider::{Message, Role};

/// 3-tier system prompt for provider-side prompt caching.
///
/// Tier 1 (static): the persona prefix — identical for every user, every
/// call. Tier 2 (per-user): a short "current user" line. Tier 3 (volatile):
/// left empty here — the pipeline has no per-turn session metadata worth
/// caching separately, but the slot exists so a future caller can add one
/// without touching the cache-breakpoint placement below.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    pub static_tier: String,
    pub user_tier: String,
    pub volatile_tier: String,
}

impl SystemPrompt {
    pub fn to_plain_text(&self) -> String {
        let mut out = self.static_tier.clone();
        if !self.user_tier.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.user_tier);
        }
        if !self.volatile_tier.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.volatile_tier);
        }
        out
    }

    /// Anthropic content blocks with cache breakpoints on tiers 1 and 2 only;
    /// the volatile tier is placed last, uncached, so it never busts the
    /// cached prefix.
    pub fn to_anthropic_blocks(&self) -> Vec<serde_json::Value> {
        let mut blocks = Vec::with_capacity(3);

        blocks.push(serde_json::json!({
            "type": "text",
            "text": self.static_tier,
            "cache_control": { "type": "ephemeral" }
        }));

        if !self.user_tier.is_empty() {
            blocks.push(serde_json::json!({
                "type": "text",
                "text": self.user_tier,
                "cache_control": { "type": "ephemeral" }
            }));
        }

        if !self.volatile_tier.is_empty() {
            blocks.push(serde_json::json!({
                "type": "text",
                "text": self.volatile_tier,
            }));
        }

        blocks
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PrefixError {
    #[error("persona file not found: {0}")]
    NotFound(String),

    #[error("persona file has only {tokens} tokens, need >= {min}")]
    TooShort { tokens: usize, min: usize },

    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads the immutable persona text at boot and builds message arrays that
/// keep the first system message byte-identical across calls, so provider
/// prompt caching hits on every turn. Loading fails fast (fatal config
/// error) if the persona is too short to be worth caching.
pub struct StablePrefixManager {
    stable_prefix: String,
    stable_tokens: usize,
}

impl StablePrefixManager {
    pub fn load(persona_path: &Path) -> Result<Self, PrefixError> {
        if !persona_path.exists() {
            return Err(PrefixError::NotFound(persona_path.display().to_string()));
        }
        let stable_prefix = std::fs::read_to_string(persona_path)?.trim().to_string();

        let bpe = tiktoken_rs::cl100k_base().map_err(|e| PrefixError::Tokenizer(e.to_string()))?;
        let stable_tokens = bpe.encode_with_special_tokens(&stable_prefix).len();

        if stable_tokens < MIN_STABLE_PREFIX_TOKENS {
            return Err(PrefixError::TooShort {
                tokens: stable_tokens,
                min: MIN_STABLE_PREFIX_TOKENS,
            });
        }

        tracing::info!(tokens = stable_tokens, path = %persona_path.display(), "loaded stable prefix");

        Ok(Self { stable_prefix, stable_tokens })
    }

    pub fn stable_tokens(&self) -> usize {
        self.stable_tokens
    }

    /// Builds the message array for the creative draft pass (LLM-1): just
    /// the user's text verbatim — no refinement instruction, since this
    /// pass is conversational. The persona and per-user context live in
    /// `system_prompt`, not here; the Anthropic/OpenAI messages array only
    /// ever carries user/assistant turns.
    pub fn build_draft_messages(&self, user_message: &str) -> Vec<Message> {
        vec![Message { role: Role::User, content: user_message.to_string() }]
    }

    /// Builds the message array for the refinement pass (LLM-2): an
    /// editor-framed instruction that asks the model to reformat the draft
    /// into bubbles separated by `bubble_separator`, never to continue the
    /// conversation.
    pub fn build_refine_messages(&self, draft: &str, bubble_separator: &str) -> Vec<Message> {
        let instruction = format!(
            "ORIGINAL DRAFT:\n\"{draft}\"\n\nREFORMAT TASK: Take the exact same message \
             content and rewrite it in casual bubbles using {bubble_separator} separators. \
             You are an EDITOR, not a conversational partner. Keep the same meaning but \
             make it more humanized and casual."
        );
        vec![Message { role: Role::User, content: instruction }]
    }

    /// Builds the 3-tier system prompt sent via `ChatRequest::system`/
    /// `system_prompt` rather than as messages: tier 1 is the immutable
    /// persona, tier 2 is the per-user line, tier 3 is the per-turn
    /// conversation summary, which changes every call and so is placed
    /// last, after the cache breakpoints, where it can't bust the cache.
    pub fn system_prompt(&self, user_name: Option<&str>, conversation_summary: Option<&str>) -> SystemPrompt {
        SystemPrompt {
            static_tier: self.stable_prefix.clone(),
            user_tier: user_name.map(|n| format!("Current user: {n}")).unwrap_or_default(),
            volatile_tier: conversation_summary
                .map(|s| format!("Conversation context: {s}"))
                .unwrap_or_default(),
        }
    }
}

/// Splits LLM-2's raw response into bubbles on the configured separator,
/// discarding empty fragments left by leading/trailing/doubled separators.
pub fn split_bubbles(raw: &str, separator: &str) -> Vec<String> {
    raw.split(separator)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn long_persona(word_count: usize) -> String {
        std::iter::repeat("testword").take(word_count).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn rejects_short_persona() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.md");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", long_persona(10)).unwrap();

        let result = StablePrefixManager::load(&path);
        assert!(matches!(result, Err(PrefixError::TooShort { .. })));
    }

    #[test]
    fn accepts_long_persona_and_counts_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.md");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", long_persona(2000)).unwrap();

        let manager = StablePrefixManager::load(&path).unwrap();
        assert!(manager.stable_tokens() >= nadia_core::config::MIN_STABLE_PREFIX_TOKENS);
    }

    #[test]
    fn draft_messages_carry_only_the_user_turn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.md");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", long_persona(2000)).unwrap();
        let manager = StablePrefixManager::load(&path).unwrap();

        let messages = manager.build_draft_messages("hi");
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0].role, Role::User));
        assert_eq!(messages[0].content, "hi");
    }

    #[test]
    fn refine_messages_embed_draft_and_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.md");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", long_persona(2000)).unwrap();
        let manager = StablePrefixManager::load(&path).unwrap();

        let messages = manager.build_refine_messages("hello there", "[GLOBO]");
        let last = messages.last().unwrap();
        assert!(matches!(last.role, Role::User));
        assert!(last.content.contains("hello there"));
        assert!(last.content.contains("[GLOBO]"));
    }

    #[test]
    fn system_prompt_places_summary_in_volatile_tier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.md");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", long_persona(2000)).unwrap();
        let manager = StablePrefixManager::load(&path).unwrap();

        let prompt = manager.system_prompt(Some("Alice"), Some("likes cats"));
        assert_eq!(prompt.static_tier, manager.stable_prefix);
        assert!(prompt.user_tier.contains("Alice"));
        assert!(prompt.volatile_tier.contains("likes cats"));
    }

    #[test]
    fn split_bubbles_drops_empty_fragments() {
        let bubbles = split_bubbles("hi there[GLOBO]  [GLOBO]how are you?", "[GLOBO]");
        assert_eq!(bubbles, vec!["hi there".to_string(), "how are you?".to_string()]);
    }
}
