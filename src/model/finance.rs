use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

use super::{impl_entity, ExtraFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub description: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub amount: f64,
    #[serde(rename = "type")]
    #[serde_as(as = "DefaultOnNull")]
    pub kind: TransactionKind,
    #[serde_as(as = "DefaultOnNull")]
    pub category: String,
    /// `YYYY-MM-DD`
    #[serde_as(as = "DefaultOnNull")]
    pub date: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Transaction {
    /// Amount with the sign of its kind: income positive, expense negative.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

fn newest_date_first(items: &mut [Transaction]) {
    items.sort_by(|a, b| b.date.cmp(&a.date));
}

impl_entity!(Transaction, Budget, transactions, sort = newest_date_first);
