use std::fmt::{self, Display};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Months, NaiveDate, TimeDelta, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A subscription plan.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// The entry plan.
    Basic,
    /// The paid plan.
    Premium,
}

impl Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Basic => write!(f, "basic"),
            Plan::Premium => write!(f, "premium"),
        }
    }
}

/// Whether a subscription is still running.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Running until the expiry date.
    Active,
    /// Lapsed or cancelled.
    Expired,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Active => write!(f, "active"),
            Status::Expired => write!(f, "expired"),
        }
    }
}

/// A subscription attached to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    /// The current plan.
    pub plan: Plan,
    /// The current status.
    pub status: Status,
    /// When the subscription ends (or ended).
    pub expires: DateTime<Utc>,
}

/// A customer account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Numeric id, also used to derive the creation date.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Email address, the lookup key.
    pub email: String,
    /// The subscription.
    pub subscription: Subscription,
    /// Last time the user logged in.
    pub last_login: DateTime<Utc>,
}

impl User {
    /// Returns the date the account was created.
    pub fn created_on(&self) -> NaiveDate {
        // Accounts were opened every 15 days starting from 2024.
        let start = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default();
        start + TimeDelta::days(i64::from(self.id) * 15)
    }

    /// Formats the user as an entry of a numbered search listing.
    pub fn format_summary(
        &self,
        position: usize,
        now: DateTime<Utc>,
    ) -> String {
        let plan = match self.subscription.plan {
            Plan::Basic => "Basic",
            Plan::Premium => "Premium",
        };
        let status = match self.subscription.status {
            Status::Active => format!(
                "active until {}",
                format_date(self.subscription.expires)
            ),
            Status::Expired => "expired".to_owned(),
        };
        format!(
            "{position}. {} ({})\n   - {plan} subscriber ({status})\n   \
             - Last seen: {}",
            self.name,
            self.email,
            format_relative(self.last_login, now),
        )
    }

    /// Formats the full account details.
    pub fn format_details(&self) -> String {
        let expiry_label = match self.subscription.status {
            Status::Active => "Expires",
            Status::Expired => "Expired",
        };
        format!(
            "User Details for {name}:

Email: {email}
User ID: {id}

Subscription:
- Plan: {plan}
- Status: {status}
- {expiry_label}: {expires}

Activity:
- Last login: {last_login}
- Account created: {created}",
            name = self.name,
            email = self.email,
            id = self.id,
            plan = self.subscription.plan,
            status = self.subscription.status,
            expires = format_date(self.subscription.expires),
            last_login = self.last_login.format("%b %-d, %Y %-I:%M %p"),
            created = self.created_on().format("%b %-d, %Y"),
        )
    }
}

/// Filters for [`UserStore::search`]. Empty filters match everyone.
#[derive(Clone, Debug, Default)]
pub struct SearchCriteria {
    /// Case-insensitive substring of the name or the email.
    pub query: Option<String>,
    /// Exact plan.
    pub plan: Option<Plan>,
    /// Exact status.
    pub status: Option<Status>,
}

impl SearchCriteria {
    fn matches(&self, user: &User) -> bool {
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            if !user.name.to_lowercase().contains(&query)
                && !user.email.to_lowercase().contains(&query)
            {
                return false;
            }
        }
        self.plan.is_none_or(|plan| plan == user.subscription.plan)
            && self
                .status
                .is_none_or(|status| status == user.subscription.status)
    }
}

/// A change requested on a subscription.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    /// Reactivates for one year from now.
    Renew,
    /// Marks the subscription as expired.
    Cancel,
}

/// An in-memory user database shared by the tools.
///
/// Clones share the same data. Tools may run concurrently, every access
/// goes through one lock.
#[derive(Clone, Debug)]
pub struct UserStore {
    users: Arc<Mutex<Vec<User>>>,
}

impl UserStore {
    /// Creates a store with the given users.
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    /// Creates a store with the three demo accounts.
    pub fn seeded() -> Self {
        Self::new(vec![
            User {
                id: 1,
                name: "John Smith".to_owned(),
                email: "john@co.com".to_owned(),
                subscription: Subscription {
                    plan: Plan::Premium,
                    status: Status::Active,
                    expires: utc(2025, 1, 15, 8, 30),
                },
                last_login: utc(2024, 3, 20, 14, 22),
            },
            User {
                id: 2,
                name: "Jane Doe".to_owned(),
                email: "jane@co.com".to_owned(),
                subscription: Subscription {
                    plan: Plan::Basic,
                    status: Status::Active,
                    expires: utc(2024, 8, 20, 10, 15),
                },
                last_login: utc(2024, 3, 19, 9, 45),
            },
            User {
                id: 3,
                name: "Bob Wilson".to_owned(),
                email: "bob@co.com".to_owned(),
                subscription: Subscription {
                    plan: Plan::Premium,
                    status: Status::Expired,
                    expires: utc(2024, 2, 1, 12, 0),
                },
                last_login: utc(2024, 1, 30, 16, 0),
            },
        ])
    }

    /// Returns the users matching the criteria, in insertion order.
    pub fn search(&self, criteria: &SearchCriteria) -> Vec<User> {
        self.lock()
            .iter()
            .filter(|user| criteria.matches(user))
            .cloned()
            .collect()
    }

    /// Looks up a user by exact email.
    pub fn find(&self, email: &str) -> Option<User> {
        self.lock().iter().find(|user| user.email == email).cloned()
    }

    /// Applies a plan change and/or an action to a subscription.
    ///
    /// Returns the applied changes in a human-readable form, or `None` if
    /// no user has this email.
    pub fn update_subscription(
        &self,
        email: &str,
        plan: Option<Plan>,
        action: Option<SubscriptionAction>,
        now: DateTime<Utc>,
    ) -> Option<(User, Vec<String>)> {
        let mut users = self.lock();
        let user = users.iter_mut().find(|user| user.email == email)?;

        let mut changes = vec![];
        if let Some(plan) = plan.filter(|&plan| plan != user.subscription.plan)
        {
            user.subscription.plan = plan;
            changes.push(format!("plan changed to {plan}"));
        }
        match action {
            Some(SubscriptionAction::Renew) => {
                user.subscription.status = Status::Active;
                user.subscription.expires =
                    now.checked_add_months(Months::new(12)).unwrap_or(now);
                changes.push("subscription renewed for 1 year".to_owned());
            }
            Some(SubscriptionAction::Cancel) => {
                user.subscription.status = Status::Expired;
                changes.push("subscription cancelled".to_owned());
            }
            None => {}
        }
        Some((user.clone(), changes))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
        // The data stays consistent even if a holder panicked.
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for UserStore {
    #[inline]
    fn default() -> Self {
        Self::seeded()
    }
}

fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0)
        .single()
        .unwrap_or_default()
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Formats a past instant like "today", "yesterday" or "3 days ago".
///
/// Anything a week old or more is printed as a date.
pub fn format_relative(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match (now - date).num_days() {
        ..=0 => "today".to_owned(),
        1 => "yesterday".to_owned(),
        days @ 2..7 => format!("{days} days ago"),
        _ => format_date(date),
    }
}
