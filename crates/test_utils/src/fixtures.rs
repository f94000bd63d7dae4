//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for common entities. Fixtures are deterministic so
//! that failures reproduce exactly.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{Currency, Money, UserId};
use domain_expense::{NewExpense, NewUser, Role, UserAccount};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// The canonical travel claim amount
    pub fn usd_150() -> Money {
        Money::new(dec!(150.00), Currency::USD)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }

    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    /// JPY has no minor unit
    pub fn jpy_10000() -> Money {
        Money::new(dec!(10000), Currency::JPY)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Date printed on the standard receipt
    pub fn bill_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    pub fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    pub fn admin_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("7b1e7c52-0000-4000-8000-000000000001").unwrap())
    }

    pub fn manager_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("7b1e7c52-0000-4000-8000-000000000002").unwrap())
    }

    pub fn employee_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("7b1e7c52-0000-4000-8000-000000000003").unwrap())
    }
}

/// Fixture for user accounts
pub struct UserFixtures;

impl UserFixtures {
    fn account(id: UserId, name: &str, email: &str, role: Role, manager_id: Option<UserId>) -> UserAccount {
        UserAccount {
            id,
            name: name.to_string(),
            email: email.to_string(),
            role,
            manager_id,
            country: Some("India".to_string()),
            created_at: TemporalFixtures::created_at(),
        }
    }

    pub fn admin() -> UserAccount {
        Self::account(IdFixtures::admin_id(), "Asha Admin", "admin@example.com", Role::Admin, None)
    }

    pub fn manager() -> UserAccount {
        Self::account(
            IdFixtures::manager_id(),
            "Manoj Manager",
            "manager@example.com",
            Role::Manager,
            Some(IdFixtures::admin_id()),
        )
    }

    pub fn employee() -> UserAccount {
        Self::account(
            IdFixtures::employee_id(),
            "Esha Employee",
            "employee@example.com",
            Role::Employee,
            Some(IdFixtures::manager_id()),
        )
    }

    /// The three standard accounts
    pub fn all() -> Vec<UserAccount> {
        vec![Self::admin(), Self::manager(), Self::employee()]
    }

    /// Registration input for a fresh user
    pub fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "New User".to_string(),
            email: email.to_string(),
            role,
            manager_id: None,
            country: None,
        }
    }
}

/// Fixture for expense creation input
pub struct ExpenseFixtures;

impl ExpenseFixtures {
    /// 150.00 USD taxi fare, category Travel
    pub fn travel_150() -> NewExpense {
        NewExpense {
            name: Some("Client visit".to_string()),
            description: Some("Taxi to the client office".to_string()),
            bill_date: Some(TemporalFixtures::bill_date()),
            category: Some("Travel".to_string()),
            paid_by: Some("Card".to_string()),
            remarks: None,
            amount: Some(dec!(150.00)),
            currency: None,
            receipt: Some("receipts/taxi-0314.pdf".to_string()),
            approval_rule_id: None,
        }
    }
}
