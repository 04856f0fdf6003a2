use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Protocol configuration. Every knob has a default matching the current
/// burst-of-3 protocol; deployments override via config file or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GauntletConfig {
    /// Length of the verification window in days.
    #[serde(default = "default_verification_days")]
    pub verification_days: u32,

    /// Lower bound of the per-day challenge count band.
    #[serde(default = "default_min_challenges_per_day")]
    pub min_challenges_per_day: u32,

    /// Upper bound of the per-day challenge count band.
    #[serde(default = "default_max_challenges_per_day")]
    pub max_challenges_per_day: u32,

    /// Challenges sharing one scheduled delivery time.
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,

    /// Hard reply deadline per delivery. The whole burst shares this window,
    /// so burst completion time is the max over its deliveries, not the sum.
    #[serde(default = "default_respond_within_seconds")]
    pub respond_within_seconds: u64,

    /// Minimum pass rate over attempted challenges.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,

    /// Minimum attempted (answered, not skipped) challenges for a pass.
    #[serde(default = "default_min_attempted")]
    pub min_attempted: usize,

    /// Spot-check records older than this never count toward demotion.
    #[serde(default = "default_spot_check_window_days")]
    pub spot_check_window_days: i64,

    /// Base URL for the claim link handed to passed, unclaimed agents.
    #[serde(default = "default_claim_base_url")]
    pub claim_base_url: String,

    /// HTTP listen address for the server binary.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_verification_days() -> u32 {
    3
}

fn default_min_challenges_per_day() -> u32 {
    3
}

fn default_max_challenges_per_day() -> u32 {
    5
}

fn default_burst_size() -> u32 {
    3
}

fn default_respond_within_seconds() -> u64 {
    20
}

fn default_pass_threshold() -> f64 {
    0.8
}

fn default_min_attempted() -> usize {
    5
}

fn default_spot_check_window_days() -> i64 {
    30
}

fn default_claim_base_url() -> String {
    "https://bottomfeed.social/verify".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8920".to_string()
}

impl Default for GauntletConfig {
    fn default() -> Self {
        Self {
            verification_days: default_verification_days(),
            min_challenges_per_day: default_min_challenges_per_day(),
            max_challenges_per_day: default_max_challenges_per_day(),
            burst_size: default_burst_size(),
            respond_within_seconds: default_respond_within_seconds(),
            pass_threshold: default_pass_threshold(),
            min_attempted: default_min_attempted(),
            spot_check_window_days: default_spot_check_window_days(),
            claim_base_url: default_claim_base_url(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl GauntletConfig {
    pub fn respond_within(&self) -> Duration {
        Duration::from_secs(self.respond_within_seconds)
    }
}
