use crate::core::error::{Error, Result};

/// Variable byte encoding for integers (best for small integers)
pub struct VByteEncoder;

impl VByteEncoder {
    /// Values < 128 use 1 byte, < 16384 use 2 bytes, etc.
    pub fn encode_u64(output: &mut Vec<u8>, mut value: u64) {
        while value >= 128 {
            output.push((value & 127) as u8 | 128);  // Set continuation bit
            value >>= 7;
        }
        output.push(value as u8);
    }

    pub fn encode_u32(output: &mut Vec<u8>, value: u32) {
        Self::encode_u64(output, value as u64)
    }

    /// Returns (value, bytes_consumed)
    pub fn decode_u64(input: &[u8]) -> Result<(u64, usize)> {
        let mut value = 0u64;
        let mut shift = 0;

        for (i, &byte) in input.iter().enumerate() {
            if shift == 63 && byte > 1 {
                return Err(Error::corrupt("vbyte value overflows 64 bits"));
            }
            value |= ((byte & 127) as u64) << shift;

            if byte & 128 == 0 {  // No continuation bit
                return Ok((value, i + 1));
            }

            shift += 7;
            if shift > 63 {
                return Err(Error::corrupt("vbyte value overflows 64 bits"));
            }
        }

        Err(Error::corrupt("incomplete vbyte value"))
    }

    pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
        let (value, consumed) = Self::decode_u64(input)?;
        let value = u32::try_from(value).map_err(|_| Error::corrupt("vbyte value overflows 32 bits"))?;
        Ok((value, consumed))
    }

    /// Signed values via zigzag mapping: 0, -1, 1, -2, ... -> 0, 1, 2, 3, ...
    pub fn encode_i32(output: &mut Vec<u8>, value: i32) {
        Self::encode_u32(output, zigzag_encode(value))
    }

    pub fn decode_i32(input: &[u8]) -> Result<(i32, usize)> {
        let (raw, consumed) = Self::decode_u32(input)?;
        Ok((zigzag_decode(raw), consumed))
    }

    pub fn encode_i32_list(nums: &[i32]) -> Vec<u8> {
        let mut output = Vec::with_capacity(nums.len());
        for &num in nums {
            Self::encode_i32(&mut output, num);
        }
        output
    }

    /// Decodes exactly `count` values, returning them and the bytes consumed
    pub fn decode_i32_list(data: &[u8], count: usize) -> Result<(Vec<i32>, usize)> {
        let mut nums = Vec::with_capacity(count);
        let mut pos = 0;
        while nums.len() < count {
            let (value, consumed) = Self::decode_i32(&data[pos..])?;
            nums.push(value);
            pos += consumed;
        }
        Ok((nums, pos))
    }
}

fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
