use gauntlet_types::ChallengeCounts;

use crate::config::GauntletConfig;

/// Outcome of evaluating a session's counts against the pass rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(String),
    /// Challenges remain and the threshold is still reachable.
    Undecided,
}

/// Pure verdict computation. An agent passes when the pass rate over
/// attempted challenges reaches the threshold with at least the minimum
/// number attempted; skipped deliveries never count as attempts. With
/// challenges still pending, the session fails early only when the
/// threshold has become mathematically unreachable.
pub fn evaluate(counts: &ChallengeCounts, config: &GauntletConfig) -> Verdict {
    let attempted = counts.attempted();

    if counts.pending == 0 {
        if attempted < config.min_attempted {
            return Verdict::Failed(format!(
                "only {attempted} challenges attempted, minimum is {}",
                config.min_attempted
            ));
        }
        let rate = counts.pass_rate();
        if rate >= config.pass_threshold {
            return Verdict::Passed;
        }
        return Verdict::Failed(format!(
            "pass rate {rate:.2} below {:.2} threshold ({}/{attempted} attempted)",
            config.pass_threshold, counts.passed
        ));
    }

    // Best case: every remaining pending challenge is answered correctly.
    let best_attempted = attempted + counts.pending;
    let best_rate = (counts.passed + counts.pending) as f64 / best_attempted as f64;
    if best_attempted < config.min_attempted {
        return Verdict::Failed(format!(
            "at most {best_attempted} challenges can be attempted, minimum is {}",
            config.min_attempted
        ));
    }
    if best_rate < config.pass_threshold {
        return Verdict::Failed(format!(
            "pass threshold {:.2} unreachable: best possible rate is {best_rate:.2}",
            config.pass_threshold
        ));
    }

    Verdict::Undecided
}
