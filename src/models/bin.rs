use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// 票箱 (Bin) - 会话开始时的快照，会话期间不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bin {
    pub bin_id: String,
    pub bin_number: u32,
    pub is_active: bool,
    #[serde(default)]
    pub pack: Option<Pack>,
}

impl Bin {
    /// 是否参与"必须全部扫描"检查: 启用且装有票本
    pub fn is_scannable(&self) -> bool {
        self.is_active && self.pack.is_some()
    }
}

/// 票本 (Pack) - 箱内当前在售的一本彩票
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pack {
    pub pack_id: String,
    pub pack_number: String,
    pub game_code: String,
    pub game_name: String,
    pub game_price: BigDecimal,
    pub starting_serial: String,
    #[serde(default)]
    pub ending_serial: Option<String>,
    pub serial_end: String,
}
