use serde::{Deserialize, Serialize};

/// 扫描码解析结果: 游戏代码(4) + 票本号(7) + 收盘序号(3)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedSerial {
    pub game_code: String,
    pub pack_number: String,
    pub closing_serial: String,
}

/// 一条已校验通过的收盘记录，按 bin_id 唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedClosing {
    pub bin_id: String,
    pub pack_id: String,
    pub closing_serial: String,
}
