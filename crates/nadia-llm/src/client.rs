use std::path::Path;
use std::sync::Arc;

use nadia_core::config::{LlmConfig, ProviderEntry, ProviderKind};

use crate::anthropic::AnthropicProvider;
use crate::cost::estimate_tokens;
use crate::openai::OpenAiProvider;
use crate::prefix::StablePrefixManager;
use crate::provider::{ChatRequest, LlmProvider, ProviderError};
use crate::router::{ProviderRouter, ProviderSlot};

/// One pipeline stage's result: text, tokens, and USD cost, with tokens/cost
/// estimated from word count when the provider response carried no usage data.
pub struct StageResult {
    pub text: String,
    pub model: String,
    pub tokens_used: u32,
    pub cost_usd: f64,
}

/// Ties the stable-prefix manager and the two per-stage provider routers
/// together into the single surface the orchestrator calls.
pub struct LlmClient {
    prefix: StablePrefixManager,
    draft_router: Arc<ProviderRouter>,
    draft_model: String,
    refine_router: Arc<ProviderRouter>,
    refine_model: String,
    bubble_separator: String,
    request_timeout_secs: u64,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, crate::prefix::PrefixError> {
        let prefix = StablePrefixManager::load(Path::new(&config.persona_path))?;
        let draft_entry = config
            .providers
            .get(&config.draft_provider)
            .unwrap_or_else(|| panic!("unknown provider id in config: {}", config.draft_provider));
        let refine_entry = config
            .providers
            .get(&config.refine_provider)
            .unwrap_or_else(|| panic!("unknown provider id in config: {}", config.refine_provider));
        let draft_router = Arc::new(build_router(config, &config.draft_provider));
        let refine_router = Arc::new(build_router(config, &config.refine_provider));
        Ok(Self {
            prefix,
            draft_router,
            draft_model: draft_entry.model.clone(),
            refine_router,
            refine_model: refine_entry.model.clone(),
            bubble_separator: config.bubble_separator.clone(),
            request_timeout_secs: config.request_timeout_secs,
        })
    }

    /// LLM-1: a creative draft from the raw user message.
    pub async fn draft(
        &self,
        user_name: Option<&str>,
        summary: Option<&str>,
        user_message: &str,
    ) -> Result<StageResult, ProviderError> {
        let messages = self.prefix.build_draft_messages(user_message);
        let system = self.prefix.system_prompt(user_name, summary);
        self.call(&self.draft_router, &self.draft_model, system, messages, "draft").await
    }

    /// LLM-2: refine the draft into bubbles, returning the raw text (the
    /// orchestrator splits it with `split_bubbles` once persisted).
    pub async fn refine(
        &self,
        user_name: Option<&str>,
        summary: Option<&str>,
        draft: &str,
    ) -> Result<StageResult, ProviderError> {
        let messages = self.prefix.build_refine_messages(draft, &self.bubble_separator);
        let system = self.prefix.system_prompt(user_name, summary);
        self.call(&self.refine_router, &self.refine_model, system, messages, "refine").await
    }

    /// One throwaway draft-shaped call issued at boot to prime provider-side
    /// prompt caching before real traffic arrives.
    pub async fn warm_up(&self) -> Result<(), ProviderError> {
        self.draft(Some("TestUser"), None, "Hello!").await?;
        Ok(())
    }

    pub fn bubble_separator(&self) -> &str {
        &self.bubble_separator
    }

    async fn call(
        &self,
        router: &ProviderRouter,
        model: &str,
        system: crate::prefix::SystemPrompt,
        messages: Vec<crate::provider::Message>,
        stage: &str,
    ) -> Result<StageResult, ProviderError> {
        // The Anthropic/OpenAI messages array only accepts user/assistant
        // roles; any System entry here would be a provider-side 400.
        let messages: Vec<crate::provider::Message> = messages
            .into_iter()
            .filter(|m| !matches!(m.role, crate::provider::Role::System))
            .collect();

        let req = ChatRequest {
            model: model.to_string(),
            system: system.to_plain_text(),
            system_prompt: Some(system),
            messages,
            max_tokens: 1024,
            temperature: 0.7,
        };

        let timeout = tokio::time::Duration::from_secs(self.request_timeout_secs);
        let resp = tokio::time::timeout(timeout, router.send(&req))
            .await
            .map_err(|_| ProviderError::Timeout)??;

        let tokens_in = if resp.tokens_in > 0 { resp.tokens_in } else { estimate_tokens(&req.system) };
        let tokens_out =
            if resp.tokens_out > 0 { resp.tokens_out } else { estimate_tokens(&resp.content) };
        let cost_usd = router.cost_usd(tokens_in, tokens_out);

        tracing::info!(stage, tokens_in, tokens_out, cost_usd, "llm call completed");

        Ok(StageResult {
            text: resp.content,
            model: resp.model,
            tokens_used: tokens_in + tokens_out,
            cost_usd,
        })
    }
}

fn build_router(config: &LlmConfig, provider_id: &str) -> ProviderRouter {
    let entry = config
        .providers
        .get(provider_id)
        .unwrap_or_else(|| panic!("unknown provider id in config: {provider_id}"));
    let provider = build_provider(entry);
    ProviderRouter::new(vec![ProviderSlot::new(provider, config.max_retries)])
}

fn build_provider(entry: &ProviderEntry) -> Box<dyn LlmProvider> {
    match entry.kind {
        ProviderKind::Anthropic => {
            Box::new(AnthropicProvider::new(entry.api_key.clone(), entry.base_url.clone()))
        }
        ProviderKind::OpenAi => {
            Box::new(OpenAiProvider::new(entry.api_key.clone(), entry.base_url.clone()))
        }
    }
}
