//! PCM 输入读取.
//!
//! 支持 16 位 PCM 的 RIFF/WAVE 文件与原始 S16LE 数据.
//!
//! WAV 文件结构:
//! ```text
//! RIFF header:  "RIFF" + file_size-8 + "WAVE"
//! fmt  chunk:   "fmt " + chunk_size + audio_format + channels + sample_rate
//!              + byte_rate + block_align + bits_per_sample
//! data chunk:   "data" + data_size + PCM samples...
//! ```

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use lanya_core::{LanyaError, LanyaResult};
use log::{debug, warn};

/// WAV PCM 格式码
const WAV_FORMAT_PCM: u16 = 0x0001;
/// WAVE_FORMAT_EXTENSIBLE
const WAV_FORMAT_EXTENSIBLE: u16 = 0xFFFE;
/// 扩展 fmt 块的最小长度 (含 cbSize, 有效位数, 声道掩码与子格式 GUID)
const EXTENSIBLE_FMT_LEN: u32 = 40;
/// KSDATAFORMAT_SUBTYPE_PCM (GUID 按文件中的字节序)
const SUBTYPE_PCM: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// 读取到内存的 PCM 音频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
    /// 交错 S16 采样
    pub samples: Vec<i16>,
}

impl PcmAudio {
    /// 每声道采样数
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// 读取 16 位 PCM WAV
pub fn read_wav<R: Read>(mut reader: R) -> LanyaResult<PcmAudio> {
    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag)?;
    if &tag != b"RIFF" {
        return Err(LanyaError::InvalidData("不是有效的 RIFF 文件".into()));
    }
    let _file_size = reader.read_u32::<LittleEndian>()?;
    reader.read_exact(&mut tag)?;
    if &tag != b"WAVE" {
        return Err(LanyaError::InvalidData("不是有效的 WAVE 文件".into()));
    }

    let mut format: Option<(u32, u32)> = None;
    loop {
        let mut chunk_id = [0u8; 4];
        match reader.read_exact(&mut chunk_id) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(LanyaError::InvalidData("未找到 data 块".into()));
            }
            Err(e) => return Err(e.into()),
        }
        let chunk_size = reader.read_u32::<LittleEndian>()?;

        match &chunk_id {
            b"fmt " => {
                if chunk_size < 16 {
                    return Err(LanyaError::InvalidData("fmt 块大小不足 16 字节".into()));
                }
                let audio_format = reader.read_u16::<LittleEndian>()?;
                let channels = reader.read_u16::<LittleEndian>()?;
                let sample_rate = reader.read_u32::<LittleEndian>()?;
                let _byte_rate = reader.read_u32::<LittleEndian>()?;
                let block_align = reader.read_u16::<LittleEndian>()?;
                let bits_per_sample = reader.read_u16::<LittleEndian>()?;
                debug!(
                    "fmt: format=0x{:04X}, channels={}, rate={}, block_align={}, bits={}",
                    audio_format, channels, sample_rate, block_align, bits_per_sample,
                );

                if !matches!(audio_format, WAV_FORMAT_PCM | WAV_FORMAT_EXTENSIBLE) {
                    return Err(LanyaError::Unsupported(format!(
                        "不支持的 WAV 格式码: 0x{:04X}",
                        audio_format,
                    )));
                }
                if bits_per_sample != 16 {
                    return Err(LanyaError::Unsupported(format!(
                        "只支持 16 位 PCM, 实际 {} 位",
                        bits_per_sample,
                    )));
                }
                if channels == 0 {
                    return Err(LanyaError::InvalidData("声道数为 0".into()));
                }
                let mut consumed = 16;
                if audio_format == WAV_FORMAT_EXTENSIBLE {
                    read_extensible(&mut reader, chunk_size)?;
                    consumed = EXTENSIBLE_FMT_LEN;
                }
                skip(
                    &mut reader,
                    u64::from(chunk_size - consumed) + u64::from(chunk_size % 2),
                )?;
                format = Some((sample_rate, u32::from(channels)));
            }
            b"data" => {
                let Some((sample_rate, channels)) = format else {
                    return Err(LanyaError::InvalidData("data 块出现在 fmt 块之前".into()));
                };
                let mut bytes = Vec::new();
                reader
                    .by_ref()
                    .take(u64::from(chunk_size))
                    .read_to_end(&mut bytes)?;
                if bytes.len() < chunk_size as usize {
                    warn!(
                        "data 块被截断: 声明 {} 字节, 实际 {} 字节",
                        chunk_size,
                        bytes.len(),
                    );
                }
                let samples = decode_s16le(&bytes, channels as usize);
                debug!("data: {} 字节, {} 个采样", bytes.len(), samples.len());
                return Ok(PcmAudio {
                    sample_rate,
                    channels,
                    samples,
                });
            }
            _ => {
                warn!(
                    "跳过未知块: '{}', 大小={}",
                    String::from_utf8_lossy(&chunk_id),
                    chunk_size,
                );
                skip(&mut reader, u64::from(chunk_size) + u64::from(chunk_size % 2))?;
            }
        }
    }
}

/// 读取 WAVE_FORMAT_EXTENSIBLE 的扩展字段, 只接受 PCM 子格式
fn read_extensible<R: Read>(reader: &mut R, chunk_size: u32) -> LanyaResult<()> {
    if chunk_size < EXTENSIBLE_FMT_LEN {
        return Err(LanyaError::InvalidData(format!(
            "扩展 fmt 块大小不足 {EXTENSIBLE_FMT_LEN} 字节: {chunk_size}",
        )));
    }
    let _cb_size = reader.read_u16::<LittleEndian>()?;
    let valid_bits = reader.read_u16::<LittleEndian>()?;
    let channel_mask = reader.read_u32::<LittleEndian>()?;
    let mut sub_format = [0u8; 16];
    reader.read_exact(&mut sub_format)?;
    debug!("扩展 fmt: valid_bits={valid_bits}, channel_mask=0x{channel_mask:08X}");

    if sub_format != SUBTYPE_PCM {
        return Err(LanyaError::Unsupported(format!(
            "不支持的 WAV 子格式: 0x{:04X}",
            LittleEndian::read_u16(&sub_format),
        )));
    }
    Ok(())
}

/// 读取原始 S16LE 交错数据
pub fn read_raw<R: Read>(
    mut reader: R,
    sample_rate: u32,
    channels: u32,
) -> LanyaResult<PcmAudio> {
    if channels == 0 {
        return Err(LanyaError::InvalidArgument("声道数为 0".into()));
    }
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(PcmAudio {
        sample_rate,
        channels,
        samples: decode_s16le(&bytes, channels as usize),
    })
}

/// 小端字节转为采样, 末尾不完整的声道组被丢弃
fn decode_s16le(bytes: &[u8], channels: usize) -> Vec<i16> {
    let group = 2 * channels;
    let usable = bytes.len() / group * group;
    if usable != bytes.len() {
        warn!("丢弃末尾 {} 个不完整字节", bytes.len() - usable);
    }
    let mut samples = vec![0i16; usable / 2];
    LittleEndian::read_i16_into(&bytes[..usable], &mut samples);
    samples
}

fn skip<R: Read>(reader: &mut R, len: u64) -> LanyaResult<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped < len {
        return Err(LanyaError::InvalidData("WAV 块被截断".into()));
    }
    Ok(())
}
