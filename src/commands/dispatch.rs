//! Dispatcher-side record creation. The portal itself never creates calls
//! or expenses; these exist to populate a local store.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use fieldservice::db::{Database, NewExpense, NewServiceCall};
use fieldservice::models::{CallCategory, ExpenseCategory, ExpenseStatus, Priority};

pub fn engineer(db: &Database, name: &str, email: &str) -> Result<()> {
    if db.get_engineer_by_email(email)?.is_some() {
        bail!("An engineer with email '{}' already exists", email);
    }
    let id = db.create_engineer(name, email)?;
    println!("Registered engineer #{}: {} <{}>", id, name, email);
    Ok(())
}

pub fn customer(
    db: &Database,
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    company: Option<&str>,
    address: Option<&str>,
) -> Result<()> {
    let id = db.create_customer(name, email, phone, company, address)?;
    println!("Created customer #{}: {}", id, name);
    Ok(())
}

pub struct CallArgs<'a> {
    pub ticket: &'a str,
    pub customer_id: i64,
    pub engineer_email: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: &'a str,
    pub category: &'a str,
    pub location: Option<&'a str>,
    pub scheduled: Option<&'a str>,
}

pub fn call(db: &Database, args: &CallArgs<'_>) -> Result<()> {
    let priority = Priority::from_str(args.priority).map_err(anyhow::Error::msg)?;
    let category = CallCategory::from_str(args.category).map_err(anyhow::Error::msg)?;
    let engineer = match db.get_engineer_by_email(args.engineer_email)? {
        Some(e) => e,
        None => bail!("No engineer registered with email '{}'", args.engineer_email),
    };
    let scheduled_at = args.scheduled.map(parse_schedule).transpose()?;

    let id = db.create_service_call(&NewServiceCall {
        ticket_number: args.ticket,
        customer_id: args.customer_id,
        engineer_id: engineer.id,
        title: args.title,
        description: args.description,
        priority,
        category,
        location: args.location,
        scheduled_at,
    })?;
    println!(
        "Created service call #{} [{}] for {}",
        id, args.ticket, engineer.email
    );
    Ok(())
}

pub struct ExpenseArgs<'a> {
    pub engineer_email: &'a str,
    pub date: &'a str,
    pub category: &'a str,
    pub amount: &'a str,
    pub currency: &'a str,
    pub description: &'a str,
    pub service_call_id: Option<i64>,
    pub status: &'a str,
}

pub fn expense(db: &Database, args: &ExpenseArgs<'_>) -> Result<()> {
    let category = ExpenseCategory::from_str(args.category).map_err(anyhow::Error::msg)?;
    let status = ExpenseStatus::from_str(args.status).map_err(anyhow::Error::msg)?;
    let amount = Decimal::from_str(args.amount.trim())
        .with_context(|| format!("Invalid amount '{}'", args.amount))?;
    let expense_date = NaiveDate::parse_from_str(args.date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", args.date))?;
    let engineer = match db.get_engineer_by_email(args.engineer_email)? {
        Some(e) => e,
        None => bail!("No engineer registered with email '{}'", args.engineer_email),
    };

    let id = db.create_expense(&NewExpense {
        engineer_id: engineer.id,
        expense_date,
        category,
        amount,
        currency: args.currency,
        description: args.description,
        service_call_id: args.service_call_id,
        status,
    })?;
    println!(
        "Recorded expense #{}: {} {} ({})",
        id, amount, args.currency, status
    );
    Ok(())
}

/// Accepts RFC 3339 or "YYYY-MM-DD HH:MM" (taken as UTC).
fn parse_schedule(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .with_context(|| format!("Invalid schedule '{}'. Use \"YYYY-MM-DD HH:MM\"", s))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{setup_test_db, signed_in};
    use fieldservice::models::CallStatus;
    use fieldservice::store::FieldStore;
    use proptest::prelude::*;

    fn call_args<'a>(customer_id: i64, priority: &'a str) -> CallArgs<'a> {
        CallArgs {
            ticket: "SC-3001",
            customer_id,
            engineer_email: "dana@example.com",
            title: "Install heat pump",
            description: None,
            priority,
            category: "installation",
            location: Some("Garden"),
            scheduled: Some("2025-11-20 09:30"),
        }
    }

    fn expense_args(amount: &str) -> ExpenseArgs<'_> {
        ExpenseArgs {
            engineer_email: "dana@example.com",
            date: "2025-11-03",
            category: "meals",
            amount,
            currency: "USD",
            description: "Lunch on site",
            service_call_id: None,
            status: "submitted",
        }
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_duplicate_engineer_rejected() {
        let (db, _dir) = setup_test_db();
        signed_in(&db);
        let err = engineer(&db, "Dana Again", "dana@example.com").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_call_created_assigned() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = signed_in(&db);
        call(&db, &call_args(customer, "critical")).unwrap();

        let calls = db.fetch_service_calls(eng).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status, CallStatus::Assigned);
        assert_eq!(calls[0].priority, Priority::Critical);
        assert_eq!(
            calls[0].scheduled_at.unwrap().to_rfc3339(),
            "2025-11-20T09:30:00+00:00"
        );
    }

    #[test]
    fn test_call_invalid_priority() {
        let (db, _dir) = setup_test_db();
        let (_, customer) = signed_in(&db);
        let err = call(&db, &call_args(customer, "urgent")).unwrap_err();
        assert!(err.to_string().contains("Invalid priority"));
    }

    #[test]
    fn test_call_unknown_engineer() {
        let (db, _dir) = setup_test_db();
        let (_, customer) = signed_in(&db);
        let mut args = call_args(customer, "low");
        args.engineer_email = "ghost@example.com";
        assert!(call(&db, &args).is_err());
    }

    #[test]
    fn test_expense_recorded_exactly() {
        let (db, _dir) = setup_test_db();
        let (eng, _) = signed_in(&db);
        expense(&db, &expense_args("156.75")).unwrap();

        let expenses = db.fetch_expenses(eng).unwrap();
        assert_eq!(expenses[0].amount, Decimal::new(15675, 2));
        assert_eq!(expenses[0].status, ExpenseStatus::Submitted);
    }

    #[test]
    fn test_expense_rejects_negative_and_garbage() {
        let (db, _dir) = setup_test_db();
        signed_in(&db);
        assert!(expense(&db, &expense_args("-5")).is_err());
        assert!(expense(&db, &expense_args("twelve")).is_err());
    }

    #[test]
    fn test_expense_rejects_amount_above_maximum() {
        let (db, _dir) = setup_test_db();
        let (eng, _) = signed_in(&db);
        let err = expense(&db, &expense_args("79228162514264337593543950335")).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));
        assert!(db.fetch_expenses(eng).unwrap().is_empty());
    }

    #[test]
    fn test_parse_schedule_formats() {
        assert!(parse_schedule("2025-11-20T09:30:00+01:00").is_ok());
        assert!(parse_schedule("2025-11-20 09:30").is_ok());
        assert!(parse_schedule("next tuesday").is_err());
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_expense_category_invalid(
            category in "[a-z]{1,12}"
                .prop_filter("Exclude valid categories", |s| {
                    !["travel", "meals", "materials", "fuel", "accommodation", "other"].contains(&s.as_str())
                })
        ) {
            let (db, _dir) = setup_test_db();
            signed_in(&db);
            let mut args = expense_args("10.00");
            args.category = &category;
            prop_assert!(expense(&db, &args).is_err());
        }
    }
}
