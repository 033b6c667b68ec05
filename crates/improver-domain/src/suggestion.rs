//! Suggestion module - one structured improvement item for a protocol

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue category of a suggestion
///
/// The review prompt fixes five categories. Anything else the model returns
/// is kept verbatim in `Other` so that nothing is lost on the way to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Missing warnings, hazard information, PPE requirements
    Safety,

    /// Ambiguous instructions, unclear measurements, vague timing
    Clarity,

    /// Missing materials, equipment, concentrations, temperatures
    Completeness,

    /// Poor structure, inconsistent numbering
    Formatting,

    /// Industry standards, optimization opportunities, quality controls
    BestPractices,

    /// A category outside the fixed set
    Other(String),
}

impl Category {
    /// All categories the review prompt asks for, in prompt order
    pub const KNOWN: [Category; 5] = [
        Category::Safety,
        Category::Clarity,
        Category::Completeness,
        Category::Formatting,
        Category::BestPractices,
    ];

    /// Get the category name as it appears on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Category::Safety => "safety",
            Category::Clarity => "clarity",
            Category::Completeness => "completeness",
            Category::Formatting => "formatting",
            Category::BestPractices => "best_practices",
            Category::Other(raw) => raw,
        }
    }

    /// Parse a category, keeping unknown values verbatim
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "safety" => Category::Safety,
            "clarity" => Category::Clarity,
            "completeness" => Category::Completeness,
            "formatting" => Category::Formatting,
            "best_practices" => Category::BestPractices,
            _ => Category::Other(s.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::parse(&s)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of a suggestion
///
/// Suggestion lists are ordered by [`Priority::rank`]: HIGH first, then
/// MEDIUM, then LOW, then anything unrecognised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    /// Must be addressed
    High,

    /// Should be addressed
    Medium,

    /// Nice to have
    Low,

    /// A priority outside the fixed set
    Other(String),
}

impl Priority {
    /// Get the priority name as it appears on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
            Priority::Other(raw) => raw,
        }
    }

    /// Parse a priority, keeping unknown values verbatim
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "HIGH" => Priority::High,
            "MEDIUM" => Priority::Medium,
            "LOW" => Priority::Low,
            _ => Priority::Other(s.to_string()),
        }
    }

    /// Sort rank: HIGH=0, MEDIUM=1, LOW=2, anything else=3
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
            Priority::Other(_) => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::parse(&s)
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        priority.as_str().to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One improvement item returned by the review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Issue category
    pub category: Category,

    /// Priority level
    pub priority: Priority,

    /// Where in the protocol the issue is ("Step 3", "Materials section")
    pub location: String,

    /// What is wrong
    pub issue: String,

    /// How to fix it
    pub suggestion: String,

    /// How the fixed text could look
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// Stable-sort suggestions by priority rank
///
/// Suggestions with equal rank keep their relative input order.
pub fn sort_by_priority(suggestions: &mut [Suggestion]) {
    suggestions.sort_by_key(|s| s.priority.rank());
}
