//! Maps an already-obtained credit score to the applicable guarantee fee
//! rate. Score generation (the bureau call) happens elsewhere; this module
//! is pure and leaves persistence and auditing to its callers.

/// Lowest score the bureaus emit.
pub const MIN_SCORE: u16 = 300;
/// Highest score the bureaus emit.
pub const MAX_SCORE: u16 = 900;

/// Error for scores outside the bureau range.
#[derive(Debug, thiserror::Error)]
#[error("credit score {score} is outside the accepted range [{MIN_SCORE}, {MAX_SCORE}]")]
pub struct ScoreOutOfRange {
    pub score: u16,
}

/// Resolve the fee rate (percent) for a credit score. Brackets are evaluated
/// from the highest score downward, first match wins; everything below 600
/// lands on the 15% floor.
pub fn rate_for(score: u16) -> Result<f32, ScoreOutOfRange> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(ScoreOutOfRange { score });
    }

    let rate = if score >= 800 {
        8.0
    } else if score >= 700 {
        10.0
    } else if score >= 600 {
        12.0
    } else {
        15.0
    };
    Ok(rate)
}
