use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::lifecycle::StatusPatch;
use crate::models::{
    CallCategory, CallStatus, Customer, Engineer, ExpenseCategory, ExpenseStatus,
    ExpenseSubmission, Priority, ServiceCall, Session,
};
use crate::store::{FieldStore, Table};

const SCHEMA_VERSION: i32 = 1;

/// Largest expense amount accepted on insert (NUMERIC(12,2) range).
const MAX_EXPENSE_CENTS: i64 = 999_999_999_999;

const CALL_COLUMNS: &str = "sc.id, sc.ticket_number, sc.customer_id, sc.engineer_id, sc.title, sc.description, sc.priority, sc.status, sc.category, sc.location, sc.scheduled_at, sc.started_at, sc.completed_at, sc.notes, sc.created_at, sc.updated_at, c.id, c.name, c.email, c.phone, c.company, c.address, c.created_at, c.updated_at";

const EXPENSE_COLUMNS: &str = "id, engineer_id, expense_date, category, amount, currency, description, receipt_url, service_call_id, status, submitted_at, reviewed_at, reviewed_by, review_notes, payment_date, created_at, updated_at";

pub struct Database {
    conn: Connection,
}

/// Fields a dispatcher supplies when creating a service call.
#[derive(Debug, Clone)]
pub struct NewServiceCall<'a> {
    pub ticket_number: &'a str,
    pub customer_id: i64,
    pub engineer_id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: Priority,
    pub category: CallCategory,
    pub location: Option<&'a str>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Fields supplied when recording an expense submission.
#[derive(Debug, Clone)]
pub struct NewExpense<'a> {
    pub engineer_id: i64,
    pub expense_date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub currency: &'a str,
    pub description: &'a str,
    pub service_call_id: Option<i64>,
    pub status: ExpenseStatus,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap_or(0);

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS engineers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE
                );

                CREATE TABLE IF NOT EXISTS customers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    email TEXT,
                    phone TEXT,
                    company TEXT,
                    address TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS service_calls (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_number TEXT NOT NULL UNIQUE,
                    customer_id INTEGER NOT NULL,
                    engineer_id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT,
                    priority TEXT NOT NULL DEFAULT 'medium',
                    status TEXT NOT NULL DEFAULT 'assigned',
                    category TEXT NOT NULL DEFAULT 'other',
                    location TEXT,
                    scheduled_at TEXT,
                    started_at TEXT,
                    completed_at TEXT,
                    notes TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (customer_id) REFERENCES customers(id),
                    FOREIGN KEY (engineer_id) REFERENCES engineers(id)
                );

                CREATE TABLE IF NOT EXISTS expense_submissions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    engineer_id INTEGER NOT NULL,
                    expense_date TEXT NOT NULL,
                    category TEXT NOT NULL DEFAULT 'other',
                    amount TEXT NOT NULL,
                    currency TEXT NOT NULL DEFAULT 'USD',
                    description TEXT NOT NULL,
                    receipt_url TEXT,
                    service_call_id INTEGER,
                    status TEXT NOT NULL DEFAULT 'draft',
                    submitted_at TEXT,
                    reviewed_at TEXT,
                    reviewed_by INTEGER,
                    review_notes TEXT,
                    payment_date TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (engineer_id) REFERENCES engineers(id),
                    FOREIGN KEY (service_call_id) REFERENCES service_calls(id) ON DELETE SET NULL
                );

                -- Sign-in sessions (one open at a time)
                CREATE TABLE IF NOT EXISTS sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    engineer_id INTEGER NOT NULL,
                    started_at TEXT NOT NULL,
                    ended_at TEXT,
                    FOREIGN KEY (engineer_id) REFERENCES engineers(id)
                );

                CREATE INDEX IF NOT EXISTS idx_calls_engineer ON service_calls(engineer_id);
                CREATE INDEX IF NOT EXISTS idx_calls_scheduled ON service_calls(scheduled_at);
                CREATE INDEX IF NOT EXISTS idx_expenses_engineer ON expense_submissions(engineer_id);
                CREATE INDEX IF NOT EXISTS idx_expenses_date ON expense_submissions(expense_date);
                "#,
            )?;

            self.conn
                .execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        }

        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    // Engineers
    pub fn create_engineer(&self, name: &str, email: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO engineers (name, email) VALUES (?1, ?2)",
                params![name, email],
            )
            .with_context(|| format!("Failed to create engineer {}", email))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_engineer_by_email(&self, email: &str) -> Result<Option<Engineer>> {
        let engineer = self
            .conn
            .query_row(
                "SELECT id, name, email FROM engineers WHERE email = ?1",
                [email],
                |row| {
                    Ok(Engineer {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(engineer)
    }

    pub fn get_engineer(&self, id: i64) -> Result<Option<Engineer>> {
        let engineer = self
            .conn
            .query_row(
                "SELECT id, name, email FROM engineers WHERE id = ?1",
                [id],
                |row| {
                    Ok(Engineer {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(engineer)
    }

    // Customers
    pub fn create_customer(
        &self,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        company: Option<&str>,
        address: Option<&str>,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO customers (name, email, phone, company, address, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![name, email, phone, company, address, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // Service calls
    pub fn create_service_call(&self, call: &NewServiceCall<'_>) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO service_calls (ticket_number, customer_id, engineer_id, title, description, priority, status, category, location, scheduled_at, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'assigned', ?7, ?8, ?9, ?10, ?10)",
                params![
                    call.ticket_number,
                    call.customer_id,
                    call.engineer_id,
                    call.title,
                    call.description,
                    call.priority.as_str(),
                    call.category.as_str(),
                    call.location,
                    call.scheduled_at.map(|dt| dt.to_rfc3339()),
                    now
                ],
            )
            .with_context(|| format!("Failed to create service call {}", call.ticket_number))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_service_call(&self, id: i64) -> Result<Option<ServiceCall>> {
        let sql = format!(
            "SELECT {} FROM service_calls sc LEFT JOIN customers c ON c.id = sc.customer_id WHERE sc.id = ?1",
            CALL_COLUMNS
        );
        let call = self
            .conn
            .query_row(&sql, [id], service_call_from_row)
            .optional()?;
        Ok(call)
    }

    /// Reassign a call to another engineer. Dispatcher-side only.
    pub fn reassign_service_call(&self, id: i64, engineer_id: i64) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE service_calls SET engineer_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![engineer_id, now, id],
        )?;
        Ok(rows > 0)
    }

    // Expenses
    pub fn create_expense(&self, expense: &NewExpense<'_>) -> Result<i64> {
        if expense.amount <= Decimal::ZERO {
            bail!("Expense amount must be positive, got {}", expense.amount);
        }
        let max = Decimal::new(MAX_EXPENSE_CENTS, 2);
        if expense.amount > max {
            bail!("Expense amount {} exceeds the maximum of {}", expense.amount, max);
        }

        let now = Utc::now().to_rfc3339();
        let submitted_at = (expense.status != ExpenseStatus::Draft).then(|| now.clone());
        self.conn.execute(
            "INSERT INTO expense_submissions (engineer_id, expense_date, category, amount, currency, description, service_call_id, status, submitted_at, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                expense.engineer_id,
                expense.expense_date.format("%Y-%m-%d").to_string(),
                expense.category.as_str(),
                expense.amount.to_string(),
                expense.currency,
                expense.description,
                expense.service_call_id,
                expense.status.as_str(),
                submitted_at,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // Sessions
    pub fn start_session(&self, engineer_id: i64) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sessions SET ended_at = ?1 WHERE ended_at IS NULL",
            params![now],
        )?;
        self.conn.execute(
            "INSERT INTO sessions (engineer_id, started_at) VALUES (?1, ?2)",
            params![engineer_id, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn end_session(&self, id: i64) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE sessions SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
            params![now, id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_current_session(&self) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                "SELECT s.id, s.engineer_id, e.email, s.started_at, s.ended_at FROM sessions s JOIN engineers e ON e.id = s.engineer_id WHERE s.ended_at IS NULL ORDER BY s.id DESC LIMIT 1",
                [],
                |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        engineer_id: row.get(1)?,
                        email: row.get(2)?,
                        started_at: parse_datetime(row.get::<_, String>(3)?),
                        ended_at: row.get::<_, Option<String>>(4)?.map(parse_datetime),
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<usize> {
        Ok(self.conn.execute(sql, [])?)
    }
}

impl FieldStore for Database {
    fn fetch_service_calls(&self, engineer_id: i64) -> Result<Vec<ServiceCall>> {
        // Unscheduled calls sort after scheduled ones.
        let sql = format!(
            "SELECT {} FROM service_calls sc LEFT JOIN customers c ON c.id = sc.customer_id WHERE sc.engineer_id = ?1 ORDER BY sc.scheduled_at IS NULL, sc.scheduled_at ASC, sc.id ASC",
            CALL_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let calls = stmt
            .query_map([engineer_id], service_call_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to fetch service calls")?;

        tracing::debug!(engineer_id, count = calls.len(), "fetched service calls");
        Ok(calls)
    }

    fn update_service_call(
        &self,
        id: i64,
        engineer_id: i64,
        expected: CallStatus,
        patch: &StatusPatch,
    ) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let mut updates = vec!["status = ?1".to_string(), "updated_at = ?2".to_string()];
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(patch.status.as_str()), Box::new(now)];

        if let Some(started) = patch.started_at {
            updates.push(format!("started_at = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(started.to_rfc3339()));
        }

        if let Some(completed) = patch.completed_at {
            updates.push(format!("completed_at = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(completed.to_rfc3339()));
        }

        let sql = format!(
            "UPDATE service_calls SET {} WHERE id = ?{} AND engineer_id = ?{} AND status = ?{}",
            updates.join(", "),
            params_vec.len() + 1,
            params_vec.len() + 2,
            params_vec.len() + 3
        );
        params_vec.push(Box::new(id));
        params_vec.push(Box::new(engineer_id));
        params_vec.push(Box::new(expected.as_str()));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = self
            .conn
            .execute(&sql, params_refs.as_slice())
            .with_context(|| format!("Failed to update service call #{}", id))?;
        Ok(rows > 0)
    }

    fn fetch_expenses(&self, engineer_id: i64) -> Result<Vec<ExpenseSubmission>> {
        let sql = format!(
            "SELECT {} FROM expense_submissions WHERE engineer_id = ?1 ORDER BY expense_date DESC, id DESC",
            EXPENSE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let expenses = stmt
            .query_map([engineer_id], expense_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to fetch expenses")?;

        tracing::debug!(engineer_id, count = expenses.len(), "fetched expenses");
        Ok(expenses)
    }

    fn change_marker(&self, table: Table, engineer_id: i64) -> Result<String> {
        let sql = format!(
            "SELECT COUNT(*), COALESCE(MAX(updated_at), ''), COALESCE(MAX(id), 0) FROM {} WHERE engineer_id = ?1",
            table
        );
        let (count, latest, max_id): (i64, String, i64) = self
            .conn
            .query_row(&sql, [engineer_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
        Ok(format!("{}:{}:{}", count, max_id, latest))
    }
}

fn service_call_from_row(row: &Row<'_>) -> rusqlite::Result<ServiceCall> {
    let customer = match row.get::<_, Option<i64>>(16)? {
        Some(customer_id) => Some(Customer {
            id: customer_id,
            name: row.get(17)?,
            email: row.get(18)?,
            phone: row.get(19)?,
            company: row.get(20)?,
            address: row.get(21)?,
            created_at: parse_datetime(row.get::<_, String>(22)?),
            updated_at: parse_datetime(row.get::<_, String>(23)?),
        }),
        None => None,
    };

    Ok(ServiceCall {
        id: row.get(0)?,
        ticket_number: row.get(1)?,
        customer_id: row.get(2)?,
        engineer_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        priority: Priority::from_stored(&row.get::<_, String>(6)?),
        status: CallStatus::from_stored(&row.get::<_, String>(7)?),
        category: CallCategory::from_stored(&row.get::<_, String>(8)?),
        location: row.get(9)?,
        scheduled_at: row.get::<_, Option<String>>(10)?.map(parse_datetime),
        started_at: row.get::<_, Option<String>>(11)?.map(parse_datetime),
        completed_at: row.get::<_, Option<String>>(12)?.map(parse_datetime),
        notes: row.get(13)?,
        created_at: parse_datetime(row.get::<_, String>(14)?),
        updated_at: parse_datetime(row.get::<_, String>(15)?),
        customer,
    })
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<ExpenseSubmission> {
    let date_text: String = row.get(2)?;
    let expense_date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let amount_text: String = row.get(4)?;
    let amount = Decimal::from_str(amount_text.trim())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(ExpenseSubmission {
        id: row.get(0)?,
        engineer_id: row.get(1)?,
        expense_date,
        category: ExpenseCategory::from_stored(&row.get::<_, String>(3)?),
        amount,
        currency: row.get(5)?,
        description: row.get(6)?,
        receipt_url: row.get(7)?,
        service_call_id: row.get(8)?,
        status: ExpenseStatus::from_stored(&row.get::<_, String>(9)?),
        submitted_at: row.get::<_, Option<String>>(10)?.map(parse_datetime),
        reviewed_at: row.get::<_, Option<String>>(11)?.map(parse_datetime),
        reviewed_by: row.get(12)?,
        review_notes: row.get(13)?,
        payment_date: row.get::<_, Option<String>>(14)?.map(parse_datetime),
        created_at: parse_datetime(row.get::<_, String>(15)?),
        updated_at: parse_datetime(row.get::<_, String>(16)?),
    })
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    pub(crate) fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    /// One engineer, one customer. Returns (engineer_id, customer_id).
    pub(crate) fn seed_engineer(db: &Database, email: &str) -> (i64, i64) {
        let engineer_id = db.create_engineer("Test Engineer", email).unwrap();
        let customer_id = db
            .create_customer("Acme Ltd", None, None, Some("Acme"), Some("1 Main St"))
            .unwrap();
        (engineer_id, customer_id)
    }

    pub(crate) fn new_call<'a>(
        ticket: &'a str,
        customer_id: i64,
        engineer_id: i64,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> NewServiceCall<'a> {
        NewServiceCall {
            ticket_number: ticket,
            customer_id,
            engineer_id,
            title: "Boiler service",
            description: None,
            priority: Priority::Medium,
            category: CallCategory::Maintenance,
            location: Some("Plant room"),
            scheduled_at,
        }
    }

    pub(crate) fn new_expense(
        engineer_id: i64,
        date: &str,
        amount: &str,
        status: ExpenseStatus,
    ) -> NewExpense<'static> {
        NewExpense {
            engineer_id,
            expense_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category: ExpenseCategory::Travel,
            amount: Decimal::from_str(amount).unwrap(),
            currency: "USD",
            description: "Expense",
            service_call_id: None,
            status,
        }
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_open_twice_keeps_data() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        {
            let db = Database::open(&db_path).unwrap();
            db.create_engineer("A", "a@example.com").unwrap();
        }
        let db = Database::open(&db_path).unwrap();
        assert!(db.get_engineer_by_email("a@example.com").unwrap().is_some());
    }

    #[test]
    fn test_fetch_calls_filters_by_engineer() {
        let (db, _dir) = setup_test_db();
        let (eng_a, customer) = seed_engineer(&db, "a@example.com");
        let eng_b = db.create_engineer("B", "b@example.com").unwrap();
        db.create_service_call(&new_call("SC-1", customer, eng_a, None)).unwrap();
        db.create_service_call(&new_call("SC-2", customer, eng_b, None)).unwrap();

        let calls = db.fetch_service_calls(eng_a).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].ticket_number, "SC-1");
        assert_eq!(calls[0].status, CallStatus::Assigned);
        assert_eq!(calls[0].customer.as_ref().unwrap().name, "Acme Ltd");
    }

    #[test]
    fn test_fetch_calls_ordered_by_schedule() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = seed_engineer(&db, "a@example.com");
        let late = Utc.with_ymd_and_hms(2025, 11, 20, 9, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 11, 2, 9, 0, 0).unwrap();
        db.create_service_call(&new_call("SC-UNSCHEDULED", customer, eng, None)).unwrap();
        db.create_service_call(&new_call("SC-LATE", customer, eng, Some(late))).unwrap();
        db.create_service_call(&new_call("SC-EARLY", customer, eng, Some(early))).unwrap();

        let tickets: Vec<String> = db
            .fetch_service_calls(eng)
            .unwrap()
            .into_iter()
            .map(|c| c.ticket_number)
            .collect();
        assert_eq!(tickets, vec!["SC-EARLY", "SC-LATE", "SC-UNSCHEDULED"]);
    }

    #[test]
    fn test_update_requires_expected_status() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = seed_engineer(&db, "a@example.com");
        let id = db.create_service_call(&new_call("SC-1", customer, eng, None)).unwrap();
        let patch = StatusPatch {
            status: CallStatus::Closed,
            started_at: None,
            completed_at: Some(Utc::now()),
        };

        assert!(!db.update_service_call(id, eng, CallStatus::InProgress, &patch).unwrap());
        assert_eq!(db.get_service_call(id).unwrap().unwrap().status, CallStatus::Assigned);
    }

    #[test]
    fn test_update_scoped_to_owner() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = seed_engineer(&db, "a@example.com");
        let other = db.create_engineer("B", "b@example.com").unwrap();
        let id = db.create_service_call(&new_call("SC-1", customer, eng, None)).unwrap();
        let patch = StatusPatch {
            status: CallStatus::InProgress,
            started_at: Some(Utc::now()),
            completed_at: None,
        };

        assert!(!db.update_service_call(id, other, CallStatus::Assigned, &patch).unwrap());
        assert!(db.update_service_call(id, eng, CallStatus::Assigned, &patch).unwrap());

        let call = db.get_service_call(id).unwrap().unwrap();
        assert_eq!(call.status, CallStatus::InProgress);
        assert!(call.started_at.is_some());
        assert!(call.completed_at.is_none());
    }

    #[test]
    fn test_expense_amount_roundtrips_exactly() {
        let (db, _dir) = setup_test_db();
        let (eng, _) = seed_engineer(&db, "a@example.com");
        db.create_expense(&new_expense(eng, "2025-11-04", "85.50", ExpenseStatus::Submitted))
            .unwrap();

        let expenses = db.fetch_expenses(eng).unwrap();
        assert_eq!(expenses[0].amount, Decimal::new(8550, 2));
        assert_eq!(expenses[0].currency, "USD");
        assert!(expenses[0].submitted_at.is_some());
    }

    #[test]
    fn test_expense_rejects_non_positive_amount() {
        let (db, _dir) = setup_test_db();
        let (eng, _) = seed_engineer(&db, "a@example.com");
        let result = db.create_expense(&new_expense(eng, "2025-11-04", "0", ExpenseStatus::Draft));
        assert!(result.unwrap_err().to_string().contains("must be positive"));
    }

    #[test]
    fn test_expense_rejects_amount_above_maximum() {
        let (db, _dir) = setup_test_db();
        let (eng, _) = seed_engineer(&db, "a@example.com");
        let result = db.create_expense(&new_expense(
            eng,
            "2025-11-04",
            "79228162514264337593543950335",
            ExpenseStatus::Submitted,
        ));
        assert!(result.unwrap_err().to_string().contains("exceeds the maximum"));

        db.create_expense(&new_expense(eng, "2025-11-04", "9999999999.99", ExpenseStatus::Submitted))
            .unwrap();
        assert_eq!(db.fetch_expenses(eng).unwrap().len(), 1);
    }

    #[test]
    fn test_fetch_expenses_newest_first() {
        let (db, _dir) = setup_test_db();
        let (eng, _) = seed_engineer(&db, "a@example.com");
        db.create_expense(&new_expense(eng, "2025-10-01", "10", ExpenseStatus::Draft)).unwrap();
        db.create_expense(&new_expense(eng, "2025-11-15", "20", ExpenseStatus::Draft)).unwrap();

        let dates: Vec<String> = db
            .fetch_expenses(eng)
            .unwrap()
            .iter()
            .map(|e| e.expense_date.to_string())
            .collect();
        assert_eq!(dates, vec!["2025-11-15", "2025-10-01"]);
    }

    #[test]
    fn test_unknown_stored_values_tolerated() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = seed_engineer(&db, "a@example.com");
        let id = db.create_service_call(&new_call("SC-1", customer, eng, None)).unwrap();
        db.create_expense(&new_expense(eng, "2025-11-04", "12.00", ExpenseStatus::Draft)).unwrap();
        db.execute_raw(&format!(
            "UPDATE service_calls SET status = 'on_hold', category = 'calibration' WHERE id = {}",
            id
        ))
        .unwrap();
        db.execute_raw("UPDATE expense_submissions SET status = 'void', category = 'parking'")
            .unwrap();

        let call = &db.fetch_service_calls(eng).unwrap()[0];
        assert_eq!(call.status, CallStatus::Assigned);
        assert_eq!(call.category, CallCategory::Other);

        let expense = &db.fetch_expenses(eng).unwrap()[0];
        assert_eq!(expense.status, ExpenseStatus::Draft);
        assert_eq!(expense.category, ExpenseCategory::Other);
    }

    #[test]
    fn test_change_marker_tracks_inserts_and_updates() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = seed_engineer(&db, "a@example.com");
        let before = db.change_marker(Table::ServiceCalls, eng).unwrap();

        let id = db.create_service_call(&new_call("SC-1", customer, eng, None)).unwrap();
        let after_insert = db.change_marker(Table::ServiceCalls, eng).unwrap();
        assert_ne!(before, after_insert);

        // Unrelated table is unaffected
        let expenses_before = db.change_marker(Table::Expenses, eng).unwrap();
        db.execute_raw(&format!(
            "UPDATE service_calls SET updated_at = '2099-01-01T00:00:00+00:00' WHERE id = {}",
            id
        ))
        .unwrap();
        assert_ne!(after_insert, db.change_marker(Table::ServiceCalls, eng).unwrap());
        assert_eq!(expenses_before, db.change_marker(Table::Expenses, eng).unwrap());
    }

    #[test]
    fn test_sessions_single_active() {
        let (db, _dir) = setup_test_db();
        let (eng_a, _) = seed_engineer(&db, "a@example.com");
        let eng_b = db.create_engineer("B", "b@example.com").unwrap();

        db.start_session(eng_a).unwrap();
        let second = db.start_session(eng_b).unwrap();

        let current = db.get_current_session().unwrap().unwrap();
        assert_eq!(current.id, second);
        assert_eq!(current.email, "b@example.com");

        assert!(db.end_session(second).unwrap());
        assert!(db.get_current_session().unwrap().is_none());
        assert!(!db.end_session(second).unwrap());
    }

    #[test]
    fn test_sql_injection_in_title() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = seed_engineer(&db, "a@example.com");
        let mut call = new_call("SC-1", customer, eng, None);
        call.title = "'; DROP TABLE service_calls; --";
        db.create_service_call(&call).unwrap();

        let calls = db.fetch_service_calls(eng).unwrap();
        assert_eq!(calls[0].title, "'; DROP TABLE service_calls; --");
    }
}
