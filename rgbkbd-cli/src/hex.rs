//! Intel HEX reader for firmware images.
//!
//! The AT90USB1286 has 128KB of flash, so images above 64KB carry extended
//! linear address records (type 04) besides plain data records.

use anyhow::{bail, ensure, Context, Result};

/// One decoded line of an Intel HEX file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Record {
    Data { offset: u16, bytes: Vec<u8> },
    EndOfFile,
    /// Type 02: base = value << 4
    SegmentBase(u32),
    /// Type 04: base = value << 16
    LinearBase(u32),
    /// Types 03 and 05: entry point, irrelevant for flashing
    StartAddress,
}

impl Record {
    fn parse(line: &str) -> Result<Self> {
        let Some(hex) = line.strip_prefix(':') else {
            bail!("missing start code ':'");
        };
        let bytes = decode_hex_bytes(hex)?;
        ensure!(bytes.len() >= 5, "record too short");

        let count = bytes[0] as usize;
        ensure!(
            bytes.len() == count + 5,
            "expected {} data bytes, got {}",
            count,
            bytes.len() - 5
        );
        // Sum of all bytes including the checksum is 0 mod 256
        let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        ensure!(sum == 0, "checksum mismatch");

        let offset = u16::from_be_bytes([bytes[1], bytes[2]]);
        let data = &bytes[4..4 + count];
        let word = || -> Result<u32> {
            ensure!(count == 2, "address record must carry 2 bytes");
            Ok(u16::from_be_bytes([data[0], data[1]]) as u32)
        };

        Ok(match bytes[3] {
            0x00 => Record::Data {
                offset,
                bytes: data.to_vec(),
            },
            0x01 => Record::EndOfFile,
            0x02 => Record::SegmentBase(word()? << 4),
            0x03 | 0x05 => Record::StartAddress,
            0x04 => Record::LinearBase(word()? << 16),
            other => bail!("unsupported record type 0x{:02X}", other),
        })
    }
}

/// A flat firmware image. Bytes not covered by the HEX file are 0xFF, the
/// value of erased flash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    pub base: u32,
    pub data: Vec<u8>,
}

impl FirmwareImage {
    /// Parse and flatten an Intel HEX file.
    pub fn parse(input: &str) -> Result<Self> {
        let mut chunks: Vec<(u32, Vec<u8>)> = Vec::new();
        let mut base = 0u32;

        for (line_num, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = Record::parse(line).with_context(|| format!("line {}", line_num + 1))?;
            match record {
                Record::Data { offset, bytes } => {
                    let address = base + offset as u32;
                    // Extend the previous chunk if contiguous
                    match chunks.last_mut() {
                        Some((start, data)) if *start + data.len() as u32 == address => {
                            data.extend_from_slice(&bytes)
                        }
                        _ => chunks.push((address, bytes)),
                    }
                }
                Record::EndOfFile => break,
                Record::SegmentBase(b) | Record::LinearBase(b) => base = b,
                Record::StartAddress => {}
            }
        }

        let start = chunks.iter().map(|(a, _)| *a).min();
        let end = chunks.iter().map(|(a, d)| a + d.len() as u32).max();
        let (Some(start), Some(end)) = (start, end) else {
            bail!("no data records in HEX file");
        };

        let mut data = vec![0xFF; (end - start) as usize];
        for (address, bytes) in &chunks {
            let offset = (address - start) as usize;
            data[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        Ok(Self { base: start, data })
    }

    /// End address (exclusive).
    pub fn end(&self) -> u32 {
        self.base + self.data.len() as u32
    }

    /// `size`-byte blocks aligned to `size`, skipping blocks that are
    /// entirely erased. The last block is padded with 0xFF.
    pub fn blocks(&self, size: usize) -> Vec<(u32, Vec<u8>)> {
        let first = self.base as usize / size * size;
        let last = self.end() as usize;
        (first..last)
            .step_by(size)
            .filter_map(|address| {
                let block: Vec<u8> = (address..address + size).map(|a| self.byte(a as u32)).collect();
                (!block.iter().all(|&b| b == 0xFF)).then_some((address as u32, block))
            })
            .collect()
    }

    fn byte(&self, address: u32) -> u8 {
        address
            .checked_sub(self.base)
            .and_then(|offset| self.data.get(offset as usize))
            .copied()
            .unwrap_or(0xFF)
    }
}

fn decode_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    ensure!(hex.len() % 2 == 0, "odd number of hex characters");
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .with_context(|| format!("invalid hex at position {}", i))
        })
        .collect()
}
