use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Implements `ALL`, `as_str`, `Display`, strict `FromStr` and lenient
/// `from_stored` for a snake_case enum persisted as text.
///
/// `from_stored` is for the store boundary: an unexpected value falls back to
/// `$fallback` with a warning instead of failing the whole fetch.
macro_rules! stored_enum {
    ($name:ident, $label:literal, fallback = $fallback:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn from_stored(value: &str) -> Self {
                value.parse().unwrap_or_else(|_| {
                    tracing::warn!(
                        value,
                        fallback = $name::$fallback.as_str(),
                        kind = $label,
                        "unknown value in store"
                    );
                    $name::$fallback
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "Invalid {} '{}'. Must be one of: {}",
                        $label,
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

stored_enum!(Priority, "priority", fallback = Medium, {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl Priority {
    pub const fn icon(self) -> &'static str {
        match self {
            Priority::Low => "·",
            Priority::Medium => "•",
            Priority::High => "▲",
            Priority::Critical => "‼",
        }
    }
}

/// Status of a service call.
///
/// ```text
/// assigned → in_progress → closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Assigned,
    InProgress,
    Closed,
}

stored_enum!(CallStatus, "status", fallback = Assigned, {
    Assigned => "assigned",
    InProgress => "in_progress",
    Closed => "closed",
});

impl CallStatus {
    /// Valid next states from the current state. `Closed` is terminal.
    pub const fn allowed_next_states(self) -> &'static [CallStatus] {
        match self {
            CallStatus::Assigned => &[CallStatus::InProgress],
            CallStatus::InProgress => &[CallStatus::Closed],
            CallStatus::Closed => &[],
        }
    }

    pub fn can_transition_to(self, next: CallStatus) -> bool {
        self.allowed_next_states().contains(&next)
    }

    pub const fn icon(self) -> &'static str {
        match self {
            CallStatus::Assigned => "○",
            CallStatus::InProgress => "◐",
            CallStatus::Closed => "●",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallCategory {
    Installation,
    Repair,
    Maintenance,
    Inspection,
    Other,
}

stored_enum!(CallCategory, "category", fallback = Other, {
    Installation => "installation",
    Repair => "repair",
    Maintenance => "maintenance",
    Inspection => "inspection",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Travel,
    Meals,
    Materials,
    Fuel,
    Accommodation,
    Other,
}

stored_enum!(ExpenseCategory, "expense category", fallback = Other, {
    Travel => "travel",
    Meals => "meals",
    Materials => "materials",
    Fuel => "fuel",
    Accommodation => "accommodation",
    Other => "other",
});

impl ExpenseCategory {
    pub const fn icon(self) -> &'static str {
        match self {
            ExpenseCategory::Travel => "✈",
            ExpenseCategory::Meals => "🍽",
            ExpenseCategory::Materials => "🔧",
            ExpenseCategory::Fuel => "⛽",
            ExpenseCategory::Accommodation => "🏨",
            ExpenseCategory::Other => "📄",
        }
    }
}

/// Approval lifecycle of an expense submission.
///
/// ```text
/// draft → submitted → under_review → approved → paid
///                                  → rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Paid,
}

stored_enum!(ExpenseStatus, "expense status", fallback = Draft, {
    Draft => "draft",
    Submitted => "submitted",
    UnderReview => "under_review",
    Approved => "approved",
    Rejected => "rejected",
    Paid => "paid",
});

impl ExpenseStatus {
    /// Counted towards the approved total.
    pub const fn is_approved(self) -> bool {
        matches!(self, ExpenseStatus::Approved | ExpenseStatus::Paid)
    }

    /// Counted towards the pending total.
    pub const fn is_pending(self) -> bool {
        matches!(self, ExpenseStatus::Submitted | ExpenseStatus::UnderReview)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engineer {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub id: i64,
    pub ticket_number: String,
    pub customer_id: i64,
    pub engineer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: CallStatus,
    pub category: CallCategory,
    pub location: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer: Option<Customer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSubmission {
    pub id: i64,
    pub engineer_id: i64,
    pub expense_date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub receipt_url: Option<String>,
    pub service_call_id: Option<i64>,
    pub status: ExpenseStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i64>,
    pub review_notes: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub engineer_id: i64,
    pub email: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}
