use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Ledger-wide knobs, loaded from the `ledger` section of the configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Display name of the other party.
    pub counterparty_name: String,
    /// Account that receives settlement payments and counterparty deposits.
    pub settlement_account: AccountId,
    /// Constant subtracted from the aggregated debt.
    pub base_fee: i64,
    /// Amount of a counterparty fund deposit.
    pub deposit_amount: i64,
    /// Balance of the earmarked account when it is first created.
    pub earmarked_opening_balance: i64,
    /// Timezone used to bucket transactions into days and months.
    pub timezone: Tz,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            counterparty_name: "Counterparty".to_string(),
            settlement_account: AccountId::PrimaryBank,
            base_fee: 0,
            deposit_amount: 300_000,
            earmarked_opening_balance: 295_000,
            timezone: chrono_tz::Asia::Ho_Chi_Minh,
        }
    }
}
