//! SBC 帧校验和计算.
//!
//! SBC 使用 CRC-8 (多项式 x^8 + x^4 + x^3 + x^2 + 1, 即 0x1D, 初始值 0x0F),
//! 按 MSB 优先逐位计算. 校验范围可以在字节中间结束
//! (4 子带联合立体声帧的 join 标志只占半个字节), 所以接口以位为单位.

/// SBC CRC-8 多项式
pub const SBC_CRC_POLY: u8 = 0x1D;

/// SBC CRC-8 初始值
pub const SBC_CRC_INIT: u8 = 0x0F;

/// CRC-8 查找表 (多项式 0x1D)
const CRC8_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0u16;
    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;
        while j < 8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ SBC_CRC_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// 计算 SBC CRC-8
///
/// 对 `data` 的前 `bit_len` 位计算校验和. 整字节部分查表, 末尾不足 8 位的部分逐位处理.
///
/// # 示例
/// ```
/// use lanya_core::crc::crc8_sbc;
///
/// assert_eq!(crc8_sbc(b"123456789", 72), 0x1E);
/// assert_eq!(crc8_sbc(&[], 0), 0x0F);
/// ```
pub fn crc8_sbc(data: &[u8], bit_len: usize) -> u8 {
    debug_assert!(bit_len <= data.len() * 8, "crc8_sbc: bit_len 超出数据范围");

    let full_bytes = bit_len / 8;
    let mut crc = SBC_CRC_INIT;
    for &byte in &data[..full_bytes] {
        crc = CRC8_TABLE[(crc ^ byte) as usize];
    }

    let tail_bits = bit_len % 8;
    if tail_bits > 0 {
        let byte = data[full_bytes];
        for k in 0..tail_bits {
            let bit = (byte >> (7 - k)) & 1;
            let top = (crc >> 7) ^ bit;
            crc <<= 1;
            if top != 0 {
                crc ^= SBC_CRC_POLY;
            }
        }
    }
    crc
}
