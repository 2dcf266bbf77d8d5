use crate::error::{ScanError, ScanResult};
use crate::models::ParsedSerial;

/// 完整扫描码长度
pub const SERIAL_CODE_LEN: usize = 24;

const GAME_CODE: std::ops::Range<usize> = 0..4;
const PACK_NUMBER: std::ops::Range<usize> = 4..11;
const CLOSING_SERIAL: std::ops::Range<usize> = 11..14;

/// 解析 24 位数字扫描码 (定长切片, 第 14 位之后的字符忽略)
///
/// 调用方负责过滤非数字字符; 这里只接受恰好 24 个 ASCII 数字。
pub fn parse_serial(input: &str) -> ScanResult<ParsedSerial> {
    if input.len() != SERIAL_CODE_LEN || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::InvalidLength {
            expected: SERIAL_CODE_LEN,
            actual: input.chars().count(),
        });
    }

    Ok(ParsedSerial {
        game_code: input[GAME_CODE].to_string(),
        pack_number: input[PACK_NUMBER].to_string(),
        closing_serial: input[CLOSING_SERIAL].to_string(),
    })
}

/// 组装扫描码 (测试与模拟扫描枪使用)
pub fn encode_serial(game_code: &str, pack_number: &str, closing_serial: &str) -> String {
    let mut code = format!("{:0>4}{:0>7}{:0>3}", game_code, pack_number, closing_serial);
    while code.len() < SERIAL_CODE_LEN {
        code.push('0');
    }
    code
}
