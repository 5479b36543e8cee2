use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use voyage_core::{CallPolicy, OfferKind, TextGenerator, Warning};
use voyage_offer::{PreferenceProfile, ScoredOffer, Shortlist};

use crate::prompt::recommendation_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Generated,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub text: String,
    pub source: RecommendationSource,
}

/// Turns a shortlist into explanatory text, falling back to a fixed template
pub struct RecommendationSynthesizer {
    generator: Arc<dyn TextGenerator>,
    policy: CallPolicy,
    max_chars: usize,
}

impl RecommendationSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: CallPolicy, max_chars: usize) -> Self {
        Self { generator, policy, max_chars }
    }

    pub async fn synthesize(
        &self,
        kind: OfferKind,
        search_summary: &str,
        profile: &PreferenceProfile,
        shortlist: &Shortlist,
    ) -> (Recommendation, Option<Warning>) {
        let prompt = recommendation_prompt(kind, search_summary, profile, shortlist, self.max_chars);

        let outcome = self
            .policy
            .call("recommendation generation", || self.generator.generate(&prompt))
            .await
            .map_err(|e| e.to_string())
            .and_then(|text| self.validate(text));

        match outcome {
            Ok(text) => {
                info!("Generated {} recommendation ({} chars)", kind, text.chars().count());
                (Recommendation { text, source: RecommendationSource::Generated }, None)
            }
            Err(reason) => {
                warn!("Falling back to template {} recommendation: {}", kind, reason);
                let warning = Warning::GenerationFailure {
                    stage: format!("{} recommendation", kind),
                    reason,
                };
                (Recommendation { text: template(shortlist), source: RecommendationSource::Template }, Some(warning))
            }
        }
    }

    fn validate(&self, text: String) -> Result<String, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err("empty response".to_string());
        }
        let chars = trimmed.chars().count();
        if chars > self.max_chars {
            return Err(format!("response of {} characters exceeds the {} limit", chars, self.max_chars));
        }
        Ok(trimmed.to_string())
    }
}

fn summary_line(scored: &ScoredOffer) -> String {
    format!("{} at {} (score {:.2})", scored.offer().label(), scored.offer().price(), scored.score())
}

/// Deterministic text built only from the shortlist
pub fn template(shortlist: &Shortlist) -> String {
    let Some(top) = shortlist.top() else {
        return "No offers matched the search.".to_string();
    };

    let mut text = format!("Top pick: {}", summary_line(top));
    let runners_up: Vec<String> = shortlist.iter().skip(1).map(|s| format!("- {}", summary_line(s))).collect();
    if !runners_up.is_empty() {
        text.push_str("\nAlso consider:\n");
        text.push_str(&runners_up.join("\n"));
    }
    text
}
