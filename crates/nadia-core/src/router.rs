use regex::Regex;

/// Where an inbound message should go: straight to a canned command handler,
/// or through the full LLM pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Fast,
    Slow,
}

/// Default command patterns, mirroring the reference cognitive controller's
/// fast-path set. Deployment-specific commands are added via config, not by
/// editing this list.
pub fn default_fast_patterns() -> Vec<String> {
    ["/help", "/start", "/stop", "/status", "/version", "/commands"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Pure case-insensitive, whole-string command classifier. Holds compiled
/// patterns so `route` never touches the filesystem or does I/O.
pub struct CognitiveRouter {
    patterns: Vec<Regex>,
}

impl CognitiveRouter {
    /// Builds anchored, case-insensitive regexes from the given literal
    /// command patterns. Patterns that fail to compile as regex are escaped
    /// and matched literally instead of rejected, since the config is meant
    /// to hold plain command words like `/help`.
    pub fn new(patterns: &[String]) -> Self {
        let compiled = patterns
            .iter()
            .map(|p| {
                let anchored = format!("(?i)^{}$", regex::escape(p));
                Regex::new(&anchored).expect("escaped pattern always compiles")
            })
            .collect();
        Self { patterns: compiled }
    }

    /// Routes `text`: empty or whitespace-only input always routes slow, so
    /// the activity tracker still sees it rather than the message vanishing.
    pub fn route(&self, text: &str) -> Route {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Route::Slow;
        }
        if self.patterns.iter().any(|re| re.is_match(trimmed)) {
            Route::Fast
        } else {
            Route::Slow
        }
    }
}

impl Default for CognitiveRouter {
    fn default() -> Self {
        Self::new(&default_fast_patterns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_commands_case_insensitively() {
        let router = CognitiveRouter::default();
        assert_eq!(router.route("/Help"), Route::Fast);
        assert_eq!(router.route("/STOP"), Route::Fast);
    }

    #[test]
    fn conversational_text_routes_slow() {
        let router = CognitiveRouter::default();
        assert_eq!(router.route("hey, how are you?"), Route::Slow);
    }

    #[test]
    fn command_embedded_in_a_sentence_does_not_match() {
        let router = CognitiveRouter::default();
        assert_eq!(router.route("can you /help me out"), Route::Slow);
    }

    #[test]
    fn empty_and_whitespace_route_slow() {
        let router = CognitiveRouter::default();
        assert_eq!(router.route(""), Route::Slow);
        assert_eq!(router.route("   "), Route::Slow);
    }

    #[test]
    fn custom_pattern_list_overrides_defaults() {
        let router = CognitiveRouter::new(&["/ping".to_string()]);
        assert_eq!(router.route("/ping"), Route::Fast);
        assert_eq!(router.route("/help"), Route::Slow);
    }
}
