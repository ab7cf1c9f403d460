//! One row of PMD's CSV report.

use csv::StringRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationRecord {
    pub problem: String,
    pub package: String,
    pub file: String,
    pub priority: i64,
    /// 1-based, as reported by PMD.
    pub line: usize,
    pub description: String,
    pub rule_set: String,
    pub rule: String,
}

impl ViolationRecord {
    /// Build a record from a CSV row, positionally.
    ///
    /// Rows with a differing column count are attempted; `None` when the
    /// file, priority, or line column is missing or not an integer.
    pub fn from_record(record: &StringRecord) -> Option<Self> {
        let field = |i: usize| record.get(i).map(str::trim).unwrap_or_default();
        let file = field(2);
        if file.is_empty() {
            return None;
        }
        let priority = field(3).parse::<i64>().ok()?;
        let line = field(4).parse::<usize>().ok()?;
        Some(ViolationRecord {
            problem: field(0).to_string(),
            package: field(1).to_string(),
            file: file.to_string(),
            priority,
            line,
            description: field(5).to_string(),
            rule_set: field(6).to_string(),
            rule: field(7).to_string(),
        })
    }

    pub fn message(&self) -> String {
        format!("{} (rule: {})", self.description, self.rule)
    }

    /// Link to the rule's page in the PMD Apex rule reference.
    pub fn documentation_url(&self) -> String {
        let category: String = self
            .rule_set
            .split(' ')
            .collect::<String>()
            .to_lowercase();
        format!(
            "https://pmd.github.io/latest/pmd_rules_apex_{}.html#{}",
            category,
            self.rule.to_lowercase()
        )
    }
}
