//! Cost estimates for the usage ledger.
//!
//! Rates are list prices in US cents and only need to be close enough for
//! per-project budgeting; the provider invoice stays authoritative.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Sora,
    Veo3,
    Replicate,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Sora => "sora",
            Provider::Veo3 => "veo3",
            Provider::Replicate => "replicate",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Provider::OpenAi),
            "sora" => Ok(Provider::Sora),
            "veo3" => Ok(Provider::Veo3),
            "replicate" => Ok(Provider::Replicate),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    ScriptTokens,
    ImageGeneration,
    VideoSeconds,
    Export,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::ScriptTokens => "script_tokens",
            UsageKind::ImageGeneration => "image_generation",
            UsageKind::VideoSeconds => "video_seconds",
            UsageKind::Export => "export",
        }
    }
}

impl FromStr for UsageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "script_tokens" => Ok(UsageKind::ScriptTokens),
            "image_generation" => Ok(UsageKind::ImageGeneration),
            "video_seconds" => Ok(UsageKind::VideoSeconds),
            "export" => Ok(UsageKind::Export),
            other => Err(format!("unknown usage kind: {}", other)),
        }
    }
}

pub const SORA_CENTS_PER_SECOND: i64 = 10;
pub const VEO3_CENTS_PER_SECOND: i64 = 40;
pub const REPLICATE_CENTS_PER_IMAGE: i64 = 4;
pub const OPENAI_CENTS_PER_1K_TOKENS: i64 = 1;

/// Estimated cost of `units` of `kind` on `provider`.
///
/// Combinations a provider does not bill for cost nothing.
pub fn estimate_cost_cents(provider: Provider, kind: UsageKind, units: f64) -> i64 {
    if !units.is_finite() || units <= 0.0 {
        return 0;
    }
    match (provider, kind) {
        (Provider::Sora, UsageKind::VideoSeconds) => (units * SORA_CENTS_PER_SECOND as f64).ceil() as i64,
        (Provider::Veo3, UsageKind::VideoSeconds) => (units * VEO3_CENTS_PER_SECOND as f64).ceil() as i64,
        (Provider::Replicate, UsageKind::ImageGeneration) => {
            (units * REPLICATE_CENTS_PER_IMAGE as f64).ceil() as i64
        }
        (Provider::OpenAi, UsageKind::ScriptTokens) => {
            (units / 1000.0 * OPENAI_CENTS_PER_1K_TOKENS as f64).ceil() as i64
        }
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLine {
    pub provider: Provider,
    pub kind: UsageKind,
    pub units: f64,
    pub cost_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderTotals {
    pub events: usize,
    pub units: f64,
    pub cost_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_cents: i64,
    pub by_provider: BTreeMap<Provider, ProviderTotals>,
}

pub fn summarize(lines: &[UsageLine]) -> UsageSummary {
    let mut summary = UsageSummary::default();
    for line in lines {
        summary.total_cents += line.cost_cents;
        let totals = summary.by_provider.entry(line.provider).or_default();
        totals.events += 1;
        totals.units += line.units;
        totals.cost_cents += line.cost_cents;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_is_billed_per_second() {
        assert_eq!(estimate_cost_cents(Provider::Sora, UsageKind::VideoSeconds, 8.0), 80);
        assert_eq!(estimate_cost_cents(Provider::Veo3, UsageKind::VideoSeconds, 8.0), 320);
        assert_eq!(estimate_cost_cents(Provider::Sora, UsageKind::VideoSeconds, 0.25), 3);
    }

    #[test]
    fn tokens_round_up_to_the_next_thousand() {
        assert_eq!(estimate_cost_cents(Provider::OpenAi, UsageKind::ScriptTokens, 1.0), 1);
        assert_eq!(estimate_cost_cents(Provider::OpenAi, UsageKind::ScriptTokens, 2500.0), 3);
    }

    #[test]
    fn unbilled_combinations_and_bad_units_are_free() {
        assert_eq!(estimate_cost_cents(Provider::Replicate, UsageKind::VideoSeconds, 5.0), 0);
        assert_eq!(estimate_cost_cents(Provider::Sora, UsageKind::VideoSeconds, -1.0), 0);
        assert_eq!(estimate_cost_cents(Provider::Sora, UsageKind::VideoSeconds, f64::NAN), 0);
    }

    #[test]
    fn provider_names_round_trip() {
        for provider in [Provider::OpenAi, Provider::Sora, Provider::Veo3, Provider::Replicate] {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
            assert_eq!(
                serde_json::to_string(&provider).unwrap(),
                format!("\"{}\"", provider.as_str())
            );
        }
        assert!("midjourney".parse::<Provider>().is_err());
    }

    #[test]
    fn summary_groups_by_provider() {
        let lines = vec![
            UsageLine { provider: Provider::Sora, kind: UsageKind::VideoSeconds, units: 4.0, cost_cents: 40 },
            UsageLine { provider: Provider::Sora, kind: UsageKind::VideoSeconds, units: 8.0, cost_cents: 80 },
            UsageLine { provider: Provider::Replicate, kind: UsageKind::ImageGeneration, units: 1.0, cost_cents: 4 },
        ];
        let summary = summarize(&lines);
        assert_eq!(summary.total_cents, 124);
        let sora = &summary.by_provider[&Provider::Sora];
        assert_eq!(sora.events, 2);
        assert_eq!(sora.units, 12.0);
        assert_eq!(summary.by_provider[&Provider::Replicate].cost_cents, 4);
    }
}
