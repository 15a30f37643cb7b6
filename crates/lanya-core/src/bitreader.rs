//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从字节缓冲区读取字段, 与 [`BitWriter`](crate::bitwriter::BitWriter)
//! 对应. 用于解析 SBC 帧头、联合立体声标志和比例因子, 以便校验编码结果.

use crate::{LanyaError, LanyaResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use lanya_core::bitreader::BitReader;
///
/// let data = [0x9C, 0b1011_0001];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(8).unwrap(), 0x9C);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.bits_read(), 12);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 剩余可读位数
    fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bits_read())
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> LanyaResult<u32> {
        self.read_bits(1)
    }

    /// 读取 N 个位 (最多 32 位)
    pub fn read_bits(&mut self, n: u32) -> LanyaResult<u32> {
        if n > 32 {
            return Err(LanyaError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if (n as usize) > self.bits_left() {
            return Err(LanyaError::Eof);
        }

        let mut result: u32 = 0;
        let mut remaining = n;

        while remaining > 0 {
            let available = 8 - u32::from(self.bit_pos);
            let to_read = remaining.min(available);

            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);

            self.bit_pos += to_read as u8;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
            remaining -= to_read;
        }

        Ok(result)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> LanyaResult<()> {
        if n > self.bits_left() {
            return Err(LanyaError::Eof);
        }
        let target = self.bits_read() + n;
        self.byte_pos = target / 8;
        self.bit_pos = (target % 8) as u8;
        Ok(())
    }
}
