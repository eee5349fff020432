//! Rule-based study advice derived from the inputs and the predicted score.
//!
//! Feature rules are independent and may all fire; exactly one band rule
//! fires and it is always emitted last.

use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// Cut-offs used by the rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RecommendationThresholds {
    /// Attendance (0-100) below this fires the attendance rule
    #[serde(default = "default_attendance")]
    pub attendance: f64,

    /// Score below this, together with a part-time job, fires the job rule
    #[serde(default = "default_part_time_score")]
    pub part_time_score: f64,

    /// Motivation (1-10) below this fires the motivation rule
    #[serde(default = "default_motivation")]
    pub motivation: f64,

    /// Friends' academic level below this fires the friends rule
    #[serde(default = "default_friends")]
    pub friends: f64,

    /// Lower edge of the high-performance band
    #[serde(default = "default_high_performance")]
    pub high_performance: f64,

    /// Lower edge of the improve band
    #[serde(default = "default_improve")]
    pub improve: f64,

    /// Lower edge of the at-risk band
    #[serde(default = "default_risk")]
    pub risk: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            attendance: default_attendance(),
            part_time_score: default_part_time_score(),
            motivation: default_motivation(),
            friends: default_friends(),
            high_performance: default_high_performance(),
            improve: default_improve(),
            risk: default_risk(),
        }
    }
}

fn default_attendance() -> f64 {
    70.0
}

fn default_part_time_score() -> f64 {
    2.5
}

fn default_motivation() -> f64 {
    5.0
}

// Sub-integer cut-off on a 1-10 scale; kept as the product defined it.
fn default_friends() -> f64 {
    2.5
}

fn default_high_performance() -> f64 {
    3.5
}

fn default_improve() -> f64 {
    2.75
}

fn default_risk() -> f64 {
    2.5
}

/// Feature rules, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Rule {
    Attendance,
    RepeatedCourse,
    PartTimeJob,
    Motivation,
    Friends,
}

impl Rule {
    pub fn fires(&self, features: &FeatureVector, score: f64, t: &RecommendationThresholds) -> bool {
        match self {
            Rule::Attendance => features.attendance_level < t.attendance,
            Rule::RepeatedCourse => features.has_repeated_course(),
            Rule::PartTimeJob => features.has_part_time_job() && score < t.part_time_score,
            Rule::Motivation => features.motivation_level < t.motivation,
            Rule::Friends => features.friend_academic_level < t.friends,
        }
    }

    pub fn advisory(&self) -> &'static str {
        match self {
            Rule::Attendance => "Try to attend more classes to stay on track academically.",
            Rule::RepeatedCourse => {
                "Focus on understanding the subjects you've repeated for better mastery."
            }
            Rule::PartTimeJob => {
                "Consider adjusting your part-time work hours to reduce academic stress."
            }
            Rule::Motivation => {
                "Boost your motivation by setting short-term goals and tracking your progress."
            }
            Rule::Friends => "Engage with peers who are academically focused to stay motivated.",
        }
    }

    pub fn quote(&self) -> &'static str {
        match self {
            Rule::Attendance => "80% of success is showing up. – Woody Allen",
            Rule::RepeatedCourse => {
                "Failure is simply the opportunity to begin again, this time more intelligently. – Henry Ford"
            }
            Rule::PartTimeJob => {
                "Balance is not something you find, it’s something you create. – Jana Kingsford"
            }
            Rule::Motivation => {
                "Start where you are. Use what you have. Do what you can. – Arthur Ashe"
            }
            Rule::Friends => {
                "Surround yourself with those who lift you higher. – Oprah Winfrey"
            }
        }
    }
}

/// Overall score band; exactly one applies to any score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Band {
    HighPerformance,
    Improve,
    Risk,
    Critical,
}

impl Band {
    /// Descending thresholds, first match wins
    pub fn from_score(score: f64, t: &RecommendationThresholds) -> Self {
        if score >= t.high_performance {
            Band::HighPerformance
        } else if score >= t.improve {
            Band::Improve
        } else if score >= t.risk {
            Band::Risk
        } else {
            Band::Critical
        }
    }

    pub fn advisory(&self) -> &'static str {
        match self {
            Band::HighPerformance => "Great work! Keep up the consistent performance.",
            Band::Improve => "You're passing, but there’s room to improve further.",
            Band::Risk => {
                "You're at risk. Focus on key habits to improve your academic standing."
            }
            Band::Critical => {
                "Critical risk of not graduating. Seek support and take active steps toward improvement."
            }
        }
    }

    pub fn quote(&self) -> &'static str {
        match self {
            Band::HighPerformance => "Excellence is not a skill, it’s an attitude. – Ralph Marston",
            Band::Improve => "Progress, not perfection. – Unknown",
            Band::Risk => "Small steps every day lead to big results. – Unknown",
            Band::Critical => "Every setback is a setup for a comeback. – Willie Jolley",
        }
    }
}

/// What produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum RecommendationSource {
    Rule(Rule),
    Band(Band),
}

impl std::fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationSource::Rule(rule) => write!(f, "{}", rule),
            RecommendationSource::Band(band) => write!(f, "{}", band),
        }
    }
}

/// One advisory sentence paired with its quote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub source: RecommendationSource,
    pub advisory: &'static str,
    pub quote: &'static str,
}

/// Pure function of `(features, score)` to ordered advice
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    thresholds: RecommendationThresholds,
}

impl RecommendationEngine {
    pub fn new(thresholds: RecommendationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn band(&self, score: f64) -> Band {
        Band::from_score(score, &self.thresholds)
    }

    /// Fired rules in declared order, band last
    pub fn evaluate(&self, features: &FeatureVector, score: f64) -> Vec<Recommendation> {
        let mut fired: Vec<Recommendation> = Rule::iter()
            .filter(|rule| rule.fires(features, score, &self.thresholds))
            .map(|rule| Recommendation {
                source: RecommendationSource::Rule(rule),
                advisory: rule.advisory(),
                quote: rule.quote(),
            })
            .collect();

        let band = self.band(score);
        fired.push(Recommendation {
            source: RecommendationSource::Band(band),
            advisory: band.advisory(),
            quote: band.quote(),
        });

        fired
    }

    /// Flattened `[advisory, quote, ...]` strings
    ///
    /// Duplicates across rules are preserved.
    pub fn generate(&self, features: &FeatureVector, score: f64) -> Vec<String> {
        flatten(&self.evaluate(features, score))
    }
}

/// `[advisory, quote, ...]` in recommendation order
pub fn flatten(recommendations: &[Recommendation]) -> Vec<String> {
    recommendations
        .iter()
        .flat_map(|rec| [rec.advisory.to_string(), rec.quote.to_string()])
        .collect()
}
