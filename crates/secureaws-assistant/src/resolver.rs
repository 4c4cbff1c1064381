use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use secureaws_types::models::{Source, SourceCategory};

use crate::error::{GenerationError, ResolveError};
use crate::knowledge::KnowledgeMatcher;
use crate::provider::{GenerationProvider, GenerationRequest, HistoryTurn};

/// How many prior turns the provider gets to see.
pub const MAX_HISTORY_TURNS: usize = 5;

/// Upper bound on one live generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

pub const SYSTEM_INSTRUCTION: &str = r#"You are SecureAWS, an expert AWS security assistant. You help users with AWS security best practices, configurations, and policies.

Your knowledge sources include:
1. AWS Well-Architected Framework (source: "AWS WAF", color: "blue", type: "aws_waf")
2. Internal Confluence documentation (source: "Confluence", color: "purple", type: "confluence")
3. General AWS security knowledge (source: "General", color: "gray", type: "general")

Guidelines:
- Provide specific, actionable security advice
- Include code examples when relevant
- Cite your sources using only the three sources above
- Format responses with HTML for rich text display
- Use <ul>, <li>, <p>, <h4>, <strong> tags for structure
- Include code blocks with <div class="code-block font-code text-sm"><pre class="text-green-400">code here</pre></div>
- For internal policies, use: <div class="bg-blue-50 p-3 rounded-lg border-l-4 border-blue-400"><p class="text-sm"><strong>Internal Policy:</strong> policy text</p></div>
- For warnings, use: <div class="bg-yellow-50 p-3 rounded-lg border-l-4 border-yellow-400"><p class="text-sm"><strong>Note:</strong> warning text</p></div>

Respond with JSON in this format:
{
  "content": "HTML formatted response",
  "sources": [{"name": "AWS WAF", "color": "blue", "type": "aws_waf"}]
}"#;

const CAPABILITY_MENU: &str = r#"<p>I can help you with AWS security best practices covering:</p>
<ul class="list-disc ml-4 space-y-1 text-sm mt-2">
  <li><strong>Identity &amp; Access Management (IAM)</strong> - Policies, roles, and permissions</li>
  <li><strong>Network Security</strong> - VPC, Security Groups, and NACLs</li>
  <li><strong>Data Protection</strong> - S3 encryption, KMS, and access controls</li>
  <li><strong>Monitoring &amp; Logging</strong> - CloudTrail, CloudWatch, and VPC Flow Logs</li>
  <li><strong>Compliance</strong> - Well-Architected Framework security pillar</li>
</ul>
<p class="mt-3">Please ask me a specific question about any of these AWS security topics, and I'll provide detailed guidance with examples.</p>
<div class="bg-blue-50 p-3 rounded-lg border-l-4 border-blue-400 mt-3">
  <p class="text-sm"><strong>Demo Mode:</strong> This is a demonstration response. For AI-powered responses, please ensure a generation provider is configured and has available quota.</p>
</div>"#;

const APOLOGY: &str = r#"<p>I apologize, but I'm experiencing technical difficulties at the moment. Please try your question again.</p>
<p class="mt-2 text-sm">If the issue persists, please contact your system administrator.</p>"#;

/// A bot answer ready to persist: HTML content plus provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAnswer {
    pub content: String,
    pub sources: Vec<Source>,
}

/// Picks between live generation, canned knowledge and an apology.
pub struct ResponseResolver {
    provider: Option<Arc<dyn GenerationProvider>>,
    matcher: KnowledgeMatcher,
    timeout: Duration,
}

impl ResponseResolver {
    /// `None` runs in demo mode: every answer comes from the knowledge base.
    pub fn new(provider: Option<Arc<dyn GenerationProvider>>) -> Self {
        Self {
            provider,
            matcher: KnowledgeMatcher::default(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_live_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Resolve one utterance. Provider failures never surface as errors; they
    /// degrade to canned knowledge (quota, unreachable) or to an apology.
    pub async fn resolve(
        &self,
        utterance: &str,
        history: &[HistoryTurn],
    ) -> Result<ResolvedAnswer, ResolveError> {
        if utterance.trim().is_empty() {
            return Err(ResolveError::EmptyUtterance);
        }

        let Some(provider) = &self.provider else {
            return Ok(self.canned_answer(utterance));
        };

        let history = &history[history.len().saturating_sub(MAX_HISTORY_TURNS)..];
        let request = GenerationRequest {
            system_instruction: SYSTEM_INSTRUCTION,
            history,
            utterance,
        };

        let outcome = match tokio::time::timeout(self.timeout, provider.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout.as_secs())),
        };

        match outcome {
            Ok(answer) => {
                info!("{} answered ({} history turns)", provider.name(), history.len());
                Ok(ResolvedAnswer {
                    content: answer.content,
                    sources: answer
                        .sources
                        .filter(|sources| !sources.is_empty())
                        .unwrap_or_else(|| vec![Source::general()]),
                })
            }
            Err(e) if e.degrades_to_knowledge() => {
                warn!("{} degraded, answering from knowledge base: {}", provider.name(), e);
                Ok(self.canned_answer(utterance))
            }
            Err(e) => {
                error!("{} failed: {}", provider.name(), e);
                Ok(apology())
            }
        }
    }

    /// Knowledge-base answer, or the capability menu when nothing matches.
    pub fn canned_answer(&self, utterance: &str) -> ResolvedAnswer {
        match self.matcher.match_query(utterance) {
            Some(doc) => {
                debug!("canned answer: {}", doc.title);
                ResolvedAnswer {
                    content: doc.content.clone(),
                    sources: doc.sources.clone(),
                }
            }
            None => ResolvedAnswer {
                content: CAPABILITY_MENU.to_string(),
                sources: vec![Source::new("Demo Mode", "blue", SourceCategory::General)],
            },
        }
    }
}

fn apology() -> ResolvedAnswer {
    ResolvedAnswer {
        content: APOLOGY.to_string(),
        sources: vec![Source::new("System", "red", SourceCategory::General)],
    }
}
