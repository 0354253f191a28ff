// Accounts and profiles
pub mod users;

// Catalog and curriculum
pub mod courses;

// Purchases, progress and money
pub mod discounts;
pub mod enrollments;
pub mod payments;

// Moderation and dashboards
pub mod admin;

use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{EntityTrait, PaginatorTrait, QuerySelect, Select};

/// Rounds a money amount to cents, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One page of rows plus the unpaged total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Runs `select` for a 1-based page, counting the full result set first.
pub(crate) async fn fetch_page<E, C>(
    db: &C,
    select: Select<E>,
    page: u64,
    limit: u64,
) -> Result<Page<E::Model>, sea_orm::DbErr>
where
    E: EntityTrait,
    E::Model: Send + Sync,
    C: sea_orm::ConnectionTrait,
{
    let page = page.max(1);
    let total = select.clone().count(db).await?;
    let items = select
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db)
        .await?;

    Ok(Page {
        items,
        total,
        page,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
        assert_eq!(round_money(dec!(10)), dec!(10));
    }

    #[test]
    fn page_count_rounds_up() {
        let page = Page {
            items: vec![1, 2],
            total: 25,
            page: 1,
            limit: 12,
        };
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.map(|n| n * 2).items, vec![2, 4]);
    }
}
