//! Static per-provider cost estimation and the fixed usage footer appended
//! to a turn's accumulated assistant text.

use crate::llm::ModelUsage;
use crate::team::ProviderTag;

/// Per-million-token rates in USD. Baked in, not configurable — a known
/// staleness hazard callers should expect to update as providers reprice.
fn rate_per_million(provider: ProviderTag) -> (f64, f64) {
    match provider {
        ProviderTag::Grok => (3.00, 15.00),
        ProviderTag::Groq => (0.59, 0.79),
        ProviderTag::Gemini => (0.075, 0.30),
        ProviderTag::Claude => (3.00, 15.00),
        ProviderTag::Ollama => (0.0, 0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
}

pub fn estimate_cost(provider: ProviderTag, usage: ModelUsage) -> CostEstimate {
    let (input_rate, output_rate) = rate_per_million(provider);
    let cost_usd = (usage.input_tokens as f64 / 1_000_000.0) * input_rate
        + (usage.output_tokens as f64 / 1_000_000.0) * output_rate;

    CostEstimate {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        total_tokens: usage.input_tokens + usage.output_tokens,
        cost_usd,
    }
}

/// Renders the fixed footer format: `\n\n---\nTokens: T (I in, O out)\nCost: $X.XXXXXX`.
/// Downstream components parse `Cost: $([\d.]+)` out of this, so the format
/// is load-bearing and must not change.
pub fn format_usage_footer(estimate: CostEstimate) -> String {
    format!(
        "\n\n---\nTokens: {} ({} in, {} out)\nCost: ${:.6}",
        estimate.total_tokens, estimate.input_tokens, estimate.output_tokens, estimate.cost_usd
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_cost_applies_provider_rate() {
        let usage = ModelUsage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
        };
        let estimate = estimate_cost(ProviderTag::Claude, usage);
        assert_eq!(estimate.total_tokens, 2_000_000);
        assert!((estimate.cost_usd - 18.0).abs() < 1e-9);
    }

    #[test]
    fn ollama_is_free() {
        let usage = ModelUsage {
            input_tokens: 5_000,
            output_tokens: 5_000,
        };
        let estimate = estimate_cost(ProviderTag::Ollama, usage);
        assert_eq!(estimate.cost_usd, 0.0);
    }

    #[test]
    fn footer_matches_fixed_format() {
        let estimate = CostEstimate {
            input_tokens: 120,
            output_tokens: 45,
            total_tokens: 165,
            cost_usd: 0.000531,
        };
        let footer = format_usage_footer(estimate);
        assert_eq!(footer, "\n\n---\nTokens: 165 (120 in, 45 out)\nCost: $0.000531");
    }

    #[test]
    fn cost_regex_extracts_dollar_amount() {
        let estimate = CostEstimate {
            input_tokens: 10,
            output_tokens: 10,
            total_tokens: 20,
            cost_usd: 1.234567,
        };
        let footer = format_usage_footer(estimate);
        let re = regex::Regex::new(r"Cost: \$([\d.]+)").unwrap();
        let captured = re.captures(&footer).unwrap();
        assert_eq!(&captured[1], "1.234567");
    }
}
