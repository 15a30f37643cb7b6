//! SBC 帧头解析.
//!
//! 只解析帧头、联合立体声标志和比例因子, 用于检查编码输出 (CRC 校验、
//! 帧切分、比特分配复算), 不做解码.

use lanya_core::bitreader::BitReader;
use lanya_core::{LanyaError, LanyaResult};

use super::bit_alloc::{BitAllocation, allocate};
use super::config::{
    AllocationMethod, BlockCount, ChannelMode, FrameParams, MAX_CHANNELS, MAX_SUBBANDS,
    MSBC_SYNC_WORD, SBC_SYNC_WORD, SamplingFrequency, SbcMode,
};
use super::packer::frame_crc;
use super::scale_factor::ScaleFactors;

/// 解析得到的帧信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbcFrameInfo {
    /// 帧参数
    pub params: FrameParams,
    /// 帧中记录的 CRC
    pub crc: u8,
    /// 重新计算的 CRC 是否与记录一致
    pub crc_ok: bool,
    /// 联合立体声标志
    pub join: [bool; MAX_SUBBANDS],
    /// 比例因子
    pub scale_factors: ScaleFactors,
}

impl SbcFrameInfo {
    /// 从帧起始处解析
    pub fn parse(data: &[u8]) -> LanyaResult<Self> {
        let mut br = BitReader::new(data);
        let sync = read_u8(&mut br)?;
        let params = match sync {
            SBC_SYNC_WORD => {
                let header = read_u8(&mut br)?;
                let bitpool = read_u8(&mut br)?;
                let params = FrameParams {
                    mode: SbcMode::Standard,
                    frequency: SamplingFrequency::from_header_code(header >> 6),
                    blocks: BlockCount::from_header_code(header >> 4).count(),
                    channel_mode: ChannelMode::from_header_code(header >> 2),
                    allocation: if header & 0x02 != 0 {
                        AllocationMethod::Snr
                    } else {
                        AllocationMethod::Loudness
                    },
                    subbands: if header & 0x01 != 0 { 8 } else { 4 },
                    bitpool,
                };
                if bitpool > params.max_bitpool() {
                    return Err(LanyaError::InvalidData(format!(
                        "比特池 {} 超出上限 {}",
                        bitpool,
                        params.max_bitpool(),
                    )));
                }
                params
            }
            MSBC_SYNC_WORD => {
                // 两个保留字节
                read_u8(&mut br)?;
                read_u8(&mut br)?;
                FrameParams::msbc()
            }
            other => {
                return Err(LanyaError::InvalidData(format!(
                    "无效的 SBC 同步字: 0x{:02X}",
                    other,
                )));
            }
        };

        let crc = read_u8(&mut br)?;
        let header_len =
            4 + (params.join_bits() + 4 * params.subbands * params.channels()).div_ceil(8);
        if data.len() < header_len {
            return Err(LanyaError::InvalidData(format!(
                "SBC 帧头不完整: 需要 {} 字节, 实际 {} 字节",
                header_len,
                data.len(),
            )));
        }

        let mut join = [false; MAX_SUBBANDS];
        for flag in join.iter_mut().take(params.join_bits()) {
            *flag = br.read_bit()? == 1;
        }
        let mut scale_factors = [[0u8; MAX_SUBBANDS]; MAX_CHANNELS];
        for channel in scale_factors.iter_mut().take(params.channels()) {
            for sf in channel.iter_mut().take(params.subbands) {
                *sf = br.read_bits(4)? as u8;
            }
        }

        let protected_bits = br.bits_read() - 32;
        let crc_ok = frame_crc(data, protected_bits) == crc;

        Ok(Self {
            params,
            crc,
            crc_ok,
            join,
            scale_factors,
        })
    }

    /// 帧长度 (字节)
    pub fn frame_length(&self) -> usize {
        self.params.frame_length()
    }

    /// 按帧头与比例因子复算比特分配
    pub fn bit_allocation(&self) -> BitAllocation {
        allocate(&self.params, &self.scale_factors)
    }
}

fn read_u8(br: &mut BitReader<'_>) -> LanyaResult<u8> {
    match br.read_bits(8) {
        Ok(v) => Ok(v as u8),
        Err(LanyaError::Eof) => Err(LanyaError::InvalidData("SBC 帧头不完整".into())),
        Err(e) => Err(e),
    }
}

/// 把连续的 SBC 帧流切分为帧
///
/// 末尾不完整的帧返回 `InvalidData`.
pub fn split_frames(stream: &[u8]) -> LanyaResult<Vec<(SbcFrameInfo, &[u8])>> {
    let mut frames = Vec::new();
    let mut pos = 0;
    while pos < stream.len() {
        let info = SbcFrameInfo::parse(&stream[pos..])?;
        let len = info.frame_length();
        if pos + len > stream.len() {
            return Err(LanyaError::InvalidData(format!(
                "偏移 {} 处的帧被截断: 需要 {} 字节, 剩余 {} 字节",
                pos,
                len,
                stream.len() - pos,
            )));
        }
        frames.push((info, &stream[pos..pos + len]));
        pos += len;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_解析标准帧头() {
        // 44.1 kHz, 16 块, 联合立体声, 响度, 8 子带, 比特池 53
        let mut frame = vec![0x9C, 0xBD, 53, 0x00, 0b1000_0000];
        frame.extend_from_slice(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
        frame.resize(119, 0);
        frame[3] = frame_crc(&frame, 72);

        let info = SbcFrameInfo::parse(&frame).unwrap();
        assert_eq!(info.params.frequency, SamplingFrequency::F44100);
        assert_eq!(info.params.blocks, 16);
        assert_eq!(info.params.channel_mode, ChannelMode::JointStereo);
        assert_eq!(info.params.allocation, AllocationMethod::Loudness);
        assert_eq!(info.params.subbands, 8);
        assert_eq!(info.params.bitpool, 53);
        assert!(info.crc_ok);
        assert!(info.join[0]);
        assert!(!info.join[1]);
        assert_eq!(info.scale_factors[0], [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(info.scale_factors[1], [9, 10, 11, 12, 13, 14, 15, 0]);
        assert_eq!(info.frame_length(), 119);
    }

    #[test]
    fn test_crc错误被检测() {
        let mut frame = vec![0x9C, 0x30, 10, 0x00, 0x55, 0x66];
        frame[3] = frame_crc(&frame, 16);
        assert!(SbcFrameInfo::parse(&frame).unwrap().crc_ok);
        frame[4] ^= 0x10;
        assert!(!SbcFrameInfo::parse(&frame).unwrap().crc_ok);
    }

    #[test]
    fn test_解析msbc帧头() {
        let mut frame = vec![0xAD, 0x00, 0x00, 0x00];
        frame.resize(57, 0);
        frame[3] = frame_crc(&frame, 32);
        let info = SbcFrameInfo::parse(&frame).unwrap();
        assert_eq!(info.params, FrameParams::msbc());
        assert!(info.crc_ok);
        assert_eq!(info.frame_length(), 57);
    }

    #[test]
    fn test_无效同步字() {
        assert!(matches!(
            SbcFrameInfo::parse(&[0x9D, 0, 0, 0, 0]),
            Err(LanyaError::InvalidData(_))
        ));
        assert!(matches!(
            SbcFrameInfo::parse(&[0x9C]),
            Err(LanyaError::InvalidData(_))
        ));
    }

    #[test]
    fn test_比特池超限() {
        // 单声道 4 子带上限 64
        assert!(matches!(
            SbcFrameInfo::parse(&[0x9C, 0x00, 65, 0, 0, 0]),
            Err(LanyaError::InvalidData(_))
        ));
    }

    #[test]
    fn test_切分帧流() {
        let mut one = vec![0xAD, 0x00, 0x00, 0x00];
        one.resize(57, 0);
        one[3] = frame_crc(&one, 32);
        let mut stream = one.repeat(3);
        let frames = split_frames(&stream).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|(info, bytes)| info.crc_ok && bytes.len() == 57));

        stream.truncate(57 * 2 + 10);
        assert!(matches!(
            split_frames(&stream),
            Err(LanyaError::InvalidData(_))
        ));
    }
}
