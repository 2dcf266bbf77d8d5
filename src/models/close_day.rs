use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ScannedClosing;

/// 录入方式 (键盘录入不在本模块范围内)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryMethod {
    Scan,
    Manual,
}

/// 日结请求中的单条收盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingLine {
    pub pack_id: String,
    pub closing_serial: String,
}

impl From<&ScannedClosing> for ClosingLine {
    fn from(c: &ScannedClosing) -> Self {
        Self {
            pack_id: c.pack_id.clone(),
            closing_serial: c.closing_serial.clone(),
        }
    }
}

/// 请求体: POST /stores/{storeId}/lottery/day-close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseDayRequest {
    pub closings: Vec<ClosingLine>,
    pub entry_method: EntryMethod,
    pub current_shift_id: Option<String>,
}

/// 单箱结算明细 (后端计算)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinClosed {
    pub bin_number: u32,
    pub pack_number: String,
    pub game_name: String,
    pub closing_serial: String,
    pub starting_serial: String,
    pub game_price: BigDecimal,
    pub tickets_sold: i64,
    pub sales_amount: BigDecimal,
}

/// 日结汇总 (响应体)，由后端拥有，这里只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub closings_created: i64,
    pub business_day: NaiveDate,
    pub day_closed: bool,
    pub bins_closed: Vec<BinClosed>,
    pub lottery_total: BigDecimal,
}

impl ReconciliationSummary {
    /// 售出票数合计
    pub fn total_tickets_sold(&self) -> i64 {
        self.bins_closed.iter().map(|b| b.tickets_sold).sum()
    }
}
