//! This file implements the recurring-bill engine: it collapses a user's
//! recurring transactions into one logical series per bill, classifies every
//! series against today's date into paid/unpaid/upcoming/due-soon buckets,
//! and serves the sorted, paginated `/api/recurring` view with aggregate
//! totals.
//!
//! Everything here is pure Rust over in-memory rows; only the initial load of
//! recurring transactions touches SQL. `today` is always passed in explicitly
//! so the classification is deterministic and testable.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    AppState, Error, Principal, SortKey,
    database_id::UserId,
    pagination::PageInfo,
    responses::ok,
    timezone::today_in,
    transaction::{Transaction, recurring_transactions},
};

/// A bill is "due soon" when its next occurrence is within this many days.
const DUE_SOON_WINDOW_DAYS: i64 = 5;

/// One logical recurring bill: the most recent transaction of a
/// `(name, category, day-of-month)` group, with its bucket classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSeries {
    /// The most recent transaction of the series.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// The day of the month the bill falls due, taken from the transaction
    /// date.
    pub day_of_month: u8,
    /// Which buckets the series falls into relative to today.
    pub buckets: BucketFlags,
}

/// The bucket membership of one series. A series can sit in more than one
/// bucket: a bill paid months ago that falls due again within days of the
/// month rollover is both unpaid and due soon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketFlags {
    /// The bill was already paid this calendar month.
    pub paid: bool,
    /// The bill's day has passed this month without a payment.
    pub unpaid: bool,
    /// The bill falls due later this month.
    pub upcoming: bool,
    /// The bill's next occurrence is within the next five days.
    pub due_soon: bool,
}

/// The count and summed amount of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketTotals {
    /// How many series fall in the bucket.
    pub count: u64,
    /// The sum of the series amounts in minor units (cents).
    pub total: i64,
}

/// Aggregate totals over every deduplicated series, bucketed and overall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSummary {
    /// Bills already paid this month.
    pub paid: BucketTotals,
    /// Bills past due this month.
    pub unpaid: BucketTotals,
    /// Bills due later this month.
    pub upcoming: BucketTotals,
    /// Bills due within the next five days.
    pub due_soon: BucketTotals,
    /// The sum of all series amounts, regardless of bucket.
    pub total_to_pay: i64,
    /// The number of deduplicated series.
    pub total_count: u64,
}

/// One page of the recurring-bills view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPage {
    /// The requested page of series.
    pub transactions: Vec<RecurringSeries>,
    /// Totals over every matching series, not just this page.
    pub summary: RecurringSummary,
    /// The pagination block.
    pub pagination: PageInfo,
}

/// Collapse recurring transactions into one series per
/// `(name, category, day-of-month)` group, keeping the most recent
/// transaction of each group (ties broken by the highest row ID).
pub fn dedup_series(transactions: Vec<Transaction>) -> Vec<Transaction> {
    let mut latest: Vec<Transaction> = Vec::new();

    for transaction in transactions {
        let existing = latest.iter_mut().find(|kept| {
            kept.name == transaction.name
                && kept.category_id == transaction.category_id
                && kept.date.day() == transaction.date.day()
        });

        match existing {
            Some(kept)
                if (transaction.date, transaction.id) > (kept.date, kept.id) =>
            {
                *kept = transaction;
            }
            Some(_) => {}
            None => latest.push(transaction),
        }
    }

    latest
}

/// The next date a bill due on `day_of_month` falls: later this month if the
/// day is still ahead, otherwise next month. Days beyond the month's length
/// clamp to its last day.
pub fn next_occurrence(day_of_month: u8, today: Date) -> Date {
    let (year, month) = if day_of_month > today.day() {
        (today.year(), today.month())
    } else {
        let next_month = today.month().next();
        let year = if next_month == Month::January {
            today.year() + 1
        } else {
            today.year()
        };
        (year, next_month)
    };

    let day = day_of_month.min(time::util::days_in_year_month(year, month));

    // The day is clamped to the month length, so this cannot fail.
    Date::from_calendar_date(year, month, day).unwrap_or(today)
}

/// Classify one series against `today`.
///
/// - paid: the last transaction falls in today's calendar month and year.
/// - unpaid: the bill's day has already passed this month and the last
///   transaction predates this month.
/// - due soon: not paid this month, and the next occurrence is strictly in
///   the future and at most five days away.
/// - upcoming: the bill's day is still ahead this month and it is not due
///   soon.
pub fn classify(transaction: &Transaction, today: Date) -> BucketFlags {
    let last = transaction.date;
    let day_of_month = last.day();

    let paid = last.year() == today.year() && last.month() == today.month();
    let predates_this_month =
        (last.year(), last.month() as u8) < (today.year(), today.month() as u8);

    let unpaid = day_of_month <= today.day() && predates_this_month;

    let next = next_occurrence(day_of_month, today);
    let days_until = (next - today).whole_days();
    let due_soon = !paid && days_until >= 1 && days_until <= DUE_SOON_WINDOW_DAYS;

    let upcoming = day_of_month > today.day() && !due_soon;

    BucketFlags {
        paid,
        unpaid,
        upcoming,
        due_soon,
    }
}

/// Compute bucket totals over every classified series. A series counts
/// towards every bucket it matches.
pub fn summarize(series: &[RecurringSeries]) -> RecurringSummary {
    let mut summary = RecurringSummary::default();

    for entry in series {
        let amount = entry.transaction.amount;

        let tally = |include: bool, bucket: &mut BucketTotals| {
            if include {
                bucket.count += 1;
                bucket.total += amount;
            }
        };

        tally(entry.buckets.paid, &mut summary.paid);
        tally(entry.buckets.unpaid, &mut summary.unpaid);
        tally(entry.buckets.upcoming, &mut summary.upcoming);
        tally(entry.buckets.due_soon, &mut summary.due_soon);

        summary.total_to_pay += amount;
        summary.total_count += 1;
    }

    summary
}

/// Sort series by the caller's sort key. Every ordering falls back to the
/// series name and then the row ID so pagination stays stable across requests.
fn sort_series(series: &mut [RecurringSeries], sort: SortKey) {
    series.sort_by(|a, b| {
        let primary = match sort {
            SortKey::Latest | SortKey::Newest => a.day_of_month.cmp(&b.day_of_month),
            SortKey::Oldest => b.day_of_month.cmp(&a.day_of_month),
            SortKey::Az => a
                .transaction
                .name
                .to_lowercase()
                .cmp(&b.transaction.name.to_lowercase()),
            SortKey::Za => b
                .transaction
                .name
                .to_lowercase()
                .cmp(&a.transaction.name.to_lowercase()),
            SortKey::Highest => b.transaction.amount.cmp(&a.transaction.amount),
            SortKey::Lowest => a.transaction.amount.cmp(&b.transaction.amount),
        };

        primary
            .then_with(|| {
                a.transaction
                    .name
                    .to_lowercase()
                    .cmp(&b.transaction.name.to_lowercase())
            })
            .then(a.transaction.id.cmp(&b.transaction.id))
    });
}

/// Build one page of the recurring-bills view for `owner`.
///
/// The pipeline order matters: deduplicate, filter by the search term, then
/// classify and summarize over everything that matched, and only then sort
/// and cut the requested page. The summary always covers every matching
/// series, not just the visible page.
///
/// # Errors
/// Returns [Error::SqlError] if loading the recurring transactions fails.
pub fn recurring_bills(
    owner: UserId,
    sort: SortKey,
    search: Option<&str>,
    page: u64,
    page_size: u64,
    today: Date,
    connection: &rusqlite::Connection,
) -> Result<RecurringPage, Error> {
    let transactions = recurring_transactions(owner, connection)?;

    let mut deduplicated = dedup_series(transactions);

    if let Some(term) = search {
        let term = term.to_lowercase();
        deduplicated.retain(|transaction| transaction.name.to_lowercase().contains(&term));
    }

    let mut series: Vec<RecurringSeries> = deduplicated
        .into_iter()
        .map(|transaction| {
            let buckets = classify(&transaction, today);
            RecurringSeries {
                day_of_month: transaction.date.day(),
                buckets,
                transaction,
            }
        })
        .collect();

    let summary = summarize(&series);

    sort_series(&mut series, sort);

    let total = series.len() as u64;
    let pagination = PageInfo::new(page, page_size, total);

    let start = ((page - 1) * page_size) as usize;
    let transactions = series
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();

    Ok(RecurringPage {
        transactions,
        summary,
        pagination,
    })
}

// ============================================================================
// ROUTE HANDLER
// ============================================================================

/// The query string for the recurring-bills view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringParams {
    /// A case-insensitive substring to match against bill names.
    pub search: Option<String>,
    /// The sort key; defaults to soonest day-of-month first.
    pub sort: Option<SortKey>,
    /// The 1-based page number.
    pub page: Option<u64>,
    /// The number of series per page.
    pub page_size: Option<u64>,
}

/// A route handler that serves the recurring-bills view for the caller.
pub async fn recurring_bills_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Query(params): Query<RecurringParams>,
) -> Result<Response, Error> {
    let today = today_in(&state.local_timezone)?;
    let (page, page_size) = state.pagination_config.resolve(params.page, params.page_size);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let page = recurring_bills(
        owner,
        params.sort.unwrap_or_default(),
        params.search.as_deref(),
        page,
        page_size,
        today,
        &connection,
    )?;

    Ok(ok(StatusCode::OK, page))
}
