//! # Repository Layer
//!
//! Repositories encapsulate SeaORM operations for the vendor, catalog and
//! ledger tables. Ledger mutations that read-then-write are guarded by
//! compare-and-set filters so concurrent requests cannot both apply.

use sea_orm::sea_query::{Alias, Expr, Func, IntoColumnRef, SimpleExpr};

pub mod analytics;
pub mod bundle;
pub mod network;
pub mod order;
pub mod vendor;
pub mod withdrawal;

pub use analytics::{AnalyticsRepository, AnalyticsSummary, TopVendor, VendorDashboard};
pub use bundle::{BundleRepository, NewBundle};
pub use network::NetworkRepository;
pub use order::{NewOrder, OrderRepository, commission};
pub use vendor::{NewVendor, VendorRepository, normalize_email};
pub use withdrawal::{Balance, WithdrawalRepository, vendor_balance};

/// `CAST(COALESCE(SUM(col), 0) AS BIGINT)`: zero for empty sets and an `i64` on both
/// Postgres (where `SUM(bigint)` is numeric) and SQLite.
pub(crate) fn sum_as_bigint<C: IntoColumnRef>(column: C) -> SimpleExpr {
    Func::cast_as(
        Func::coalesce([
            SimpleExpr::from(Func::sum(Expr::col(column))),
            Expr::val(0).into(),
        ]),
        Alias::new("BIGINT"),
    )
    .into()
}
